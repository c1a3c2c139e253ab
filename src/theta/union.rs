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

//! Union set operator (C6): an ordinary update-sketch gadget plus a
//! separately tracked minimum theta across every operand seen so far.

use crate::common::ResizeFactor;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::theta::ThetaSketchView;
use crate::theta::compact::CompactThetaSketch;
use crate::theta::hash_table::MAX_LG_K;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::hash_table::MIN_LG_K;
use crate::theta::hash_table::ThetaHashTable;

/// Stateful union operator for Theta sketches.
///
/// Every [`update`](Self::update) inserts the operand's retained hashes into
/// an ordinary gadget table (the θ-min rule: the overall result theta is the
/// minimum theta across every operand seen, not just the gadget's own
/// load-driven theta) and lowers [`union_theta`](Self::union_theta)
/// accordingly; [`result`](Self::result) reconciles the two at read time.
#[derive(Debug)]
pub struct ThetaUnion {
    table: ThetaHashTable,
    union_theta: u64,
}

impl ThetaUnion {
    /// Creates a union operator sized for `2^lg_k` nominal entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with kind `InvalidArgument` if `lg_k` is outside
    /// `[4, 26]`.
    pub fn new(lg_k: u8, resize_factor: ResizeFactor, seed: u64) -> Result<Self, Error> {
        if !(MIN_LG_K..=MAX_LG_K).contains(&lg_k) {
            return Err(Error::invalid_argument(format!(
                "lg_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_k}"
            ))
            .with_context("lg_k", lg_k));
        }
        Ok(Self {
            table: ThetaHashTable::new(lg_k, resize_factor, 1.0, seed),
            union_theta: MAX_THETA,
        })
    }

    /// Creates a union operator with the default `lg_k`, resize factor, and
    /// hash seed.
    pub fn new_with_defaults() -> Self {
        Self::new(
            crate::theta::hash_table::DEFAULT_LG_K,
            ResizeFactor::default(),
            DEFAULT_UPDATE_SEED,
        )
        .expect("default lg_k is always in range")
    }

    /// Folds `sketch` into the running union.
    ///
    /// An empty `sketch` is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with kind `InvalidArgument` if `sketch`'s seed hash
    /// doesn't match this operator's.
    pub fn update<S: ThetaSketchView>(&mut self, sketch: &S) -> Result<(), Error> {
        if sketch.is_empty() {
            return Ok(());
        }

        if sketch.seed_hash() != self.table.seed_hash() {
            return Err(Error::invalid_argument(format!(
                "incompatible seed hash: expected {}, got {}",
                self.table.seed_hash(),
                sketch.seed_hash()
            )));
        }

        self.table.set_empty(false);
        self.union_theta = self.union_theta.min(sketch.theta64());

        for hash in sketch.iter() {
            self.table.try_insert_hash(hash);
        }

        // A rebuild triggered mid-loop can drop the gadget's own theta below
        // what the operand reported, so re-sync after inserting.
        self.union_theta = self.union_theta.min(self.table.theta());

        Ok(())
    }

    /// The minimum theta across every operand presented so far (`MAX_THETA`
    /// if none has been).
    pub fn union_theta(&self) -> u64 {
        self.union_theta
    }

    /// Rebuilds the gadget now to shrink back to nominal size, if over.
    pub fn trim(&mut self) {
        self.table.trim();
    }

    /// Resets the operator back to its freshly-constructed empty state.
    pub fn reset(&mut self) {
        self.table.reset();
        self.union_theta = MAX_THETA;
    }

    /// Returns the union result, ordered ascending.
    pub fn result(&self) -> CompactThetaSketch {
        self.result_with_ordered(true)
    }

    /// Returns the union result.
    ///
    /// The result theta is `min(gadget theta, union_theta)`; any gadget
    /// entry at or above that value is screened out, since the gadget's own
    /// theta only shrinks from its own load factor and may still be higher
    /// than an operand's lower theta.
    pub fn result_with_ordered(&self, ordered: bool) -> CompactThetaSketch {
        let final_theta = self.table.theta().min(self.union_theta);
        let hashes: Vec<u64> = self
            .table
            .iter()
            .filter(|&hash| hash < final_theta)
            .collect();
        CompactThetaSketch::from_parts(
            hashes,
            final_theta,
            self.table.seed_hash(),
            ordered,
            self.table.is_empty(),
        )
    }
}
