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

//! A-not-B set operator (C8): the set difference `A \ B`.
//!
//! Unlike [`crate::theta::ThetaUnion`]/[`crate::theta::ThetaIntersection`],
//! A-not-B's running state is not itself a hash table that needs resize or
//! rebuild machinery — it only ever shrinks by removing matched entries, so
//! it is kept as a plain `Vec<u64>` plus a `HashSet<u64>` built fresh for
//! each `not_b` call to test membership.

use std::collections::HashSet;

use crate::error::Error;
use crate::theta::ThetaSketchView;
use crate::theta::compact::CompactThetaSketch;

/// Stateful A-not-B operator: call [`set_a`](Self::set_a) once, then zero or
/// more [`not_b`](Self::not_b), then [`get_result`](Self::get_result).
#[derive(Debug, Default)]
pub struct ThetaAnotB {
    state: Option<State>,
}

#[derive(Debug)]
struct State {
    theta: u64,
    seed_hash: u16,
    is_empty: bool,
    entries: Vec<u64>,
}

impl ThetaAnotB {
    /// Creates a fresh, unset operator.
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Sets the minuend `A`. Replaces any previously set state.
    pub fn set_a<A: ThetaSketchView>(&mut self, a: &A) {
        self.state = Some(State {
            theta: a.theta64(),
            seed_hash: a.seed_hash(),
            is_empty: a.is_empty(),
            entries: a.iter().collect(),
        });
    }

    /// Subtracts `b`'s elements from the running result.
    ///
    /// An empty `b` is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with kind `IllegalState` if [`set_a`](Self::set_a)
    /// has not been called yet, or `InvalidArgument` if `b`'s seed hash
    /// doesn't match `A`'s.
    pub fn not_b<B: ThetaSketchView>(&mut self, b: &B) -> Result<(), Error> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| Error::illegal_state("ThetaAnotB::not_b() called before set_a()"))?;

        if b.is_empty() {
            return Ok(());
        }

        if b.seed_hash() != state.seed_hash {
            return Err(Error::invalid_argument(format!(
                "incompatible seed hash: expected {}, got {}",
                state.seed_hash,
                b.seed_hash()
            )));
        }

        let new_theta = state.theta.min(b.theta64());
        let b_hashes: HashSet<u64> = b.iter().collect();

        state.entries.retain(|hash| *hash < new_theta && !b_hashes.contains(hash));
        state.theta = new_theta;

        Ok(())
    }

    /// Returns the result, ordered ascending.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with kind `IllegalState` if
    /// [`set_a`](Self::set_a) has not been called yet.
    pub fn get_result(&self) -> Result<CompactThetaSketch, Error> {
        self.get_result_with_ordered(true)
    }

    /// Returns the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with kind `IllegalState` if
    /// [`set_a`](Self::set_a) has not been called yet.
    pub fn get_result_with_ordered(&self, ordered: bool) -> Result<CompactThetaSketch, Error> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| Error::illegal_state("ThetaAnotB::get_result() called before set_a()"))?;

        Ok(CompactThetaSketch::from_parts(
            state.entries.clone(),
            state.theta,
            state.seed_hash,
            ordered,
            state.is_empty,
        ))
    }
}

/// Stateless convenience wrapper: computes `a \ b` in one call.
pub fn a_not_b<A: ThetaSketchView, B: ThetaSketchView>(
    a: &A,
    b: &B,
    ordered: bool,
) -> Result<CompactThetaSketch, Error> {
    let mut op = ThetaAnotB::new();
    op.set_a(a);
    op.not_b(b)?;
    op.get_result_with_ordered(ordered)
}
