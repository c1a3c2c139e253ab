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

//! Theta sketch: cardinality estimation with set-operation support.

mod anotb;
mod builder;
mod compact;
mod family;
mod hash_table;
mod intersection;
mod serialization;
mod sketch;
mod union;

pub use anotb::ThetaAnotB;
pub use anotb::a_not_b;
pub use builder::SetOperationBuilder;
pub use compact::CompactThetaSketch;
pub use family::Family;
pub use hash_table::UpdateStatus;
pub use intersection::ThetaIntersection;
pub use sketch::ThetaSketch;
pub use sketch::ThetaSketchBuilder;
pub use union::ThetaUnion;

/// Read-only capability set shared by every Theta sketch representation:
/// the pieces set operators need regardless of whether the source is a
/// mutable [`ThetaSketch`] or an immutable [`CompactThetaSketch`].
pub trait ThetaSketchView {
    /// Whether the logical source set is empty.
    fn is_empty(&self) -> bool;
    /// Current theta as a raw 64-bit value (`i64::MAX` at exact mode).
    fn theta64(&self) -> u64;
    /// Number of retained hashes.
    fn num_retained(&self) -> usize;
    /// 16-bit seed-hash compatibility tag.
    fn seed_hash(&self) -> u16;
    /// Whether [`iter`](Self::iter) yields hashes in strictly ascending order.
    fn is_ordered(&self) -> bool;
    /// Iterates retained hashes; order is only guaranteed when
    /// [`is_ordered`](Self::is_ordered) is `true`.
    fn iter(&self) -> Box<dyn Iterator<Item = u64> + '_>;
}
