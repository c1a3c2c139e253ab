// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Theta sketch: bounded-memory cardinality estimation with set-theoretic
//! composition.
//!
//! A Theta sketch retains the `2^lg_k` smallest hashes below a shrinking
//! threshold `theta`, turning an unbounded input stream into a
//! fixed-memory structure that supports cardinality estimation with
//! confidence bounds, a bit-exact binary wire format, and set operations
//! (union, intersection, A-not-B) that compose without re-reading the
//! original inputs.
//!
//! ```
//! use theta_sketch::theta::ThetaSketch;
//!
//! let mut sketch = ThetaSketch::builder().lg_k(12).build().unwrap();
//! for i in 0..10_000u64 {
//!     sketch.update_u64(i);
//! }
//! assert!(sketch.estimate() > 0.0);
//! ```

pub mod common;
pub(crate) mod codec;
pub mod error;
pub mod hash;
pub mod theta;
