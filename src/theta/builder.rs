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

//! Shared configuration surface for the three set operators (C9).

use crate::common::ResizeFactor;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::theta::ThetaAnotB;
use crate::theta::ThetaIntersection;
use crate::theta::ThetaUnion;
use crate::theta::hash_table::DEFAULT_LG_K;

/// Builds [`ThetaUnion`], [`ThetaIntersection`], or [`ThetaAnotB`] from one
/// shared configuration surface.
///
/// `lg_k`/`resize_factor` only affect [`build_union`](Self::build_union): an
/// intersection or A-not-B operator's working table is sized from its first
/// operand instead, so those two methods only consume `seed`.
#[derive(Debug, Clone)]
pub struct SetOperationBuilder {
    lg_k: u8,
    resize_factor: ResizeFactor,
    seed: u64,
}

impl Default for SetOperationBuilder {
    fn default() -> Self {
        Self {
            lg_k: DEFAULT_LG_K,
            resize_factor: ResizeFactor::default(),
            seed: DEFAULT_UPDATE_SEED,
        }
    }
}

impl SetOperationBuilder {
    /// Sets `lg_k` (log2 of the nominal entry count), used only by
    /// [`build_union`](Self::build_union).
    pub fn lg_k(mut self, lg_k: u8) -> Self {
        self.lg_k = lg_k;
        self
    }

    /// Sets the backing array's growth factor, used only by
    /// [`build_union`](Self::build_union).
    pub fn resize_factor(mut self, factor: ResizeFactor) -> Self {
        self.resize_factor = factor;
        self
    }

    /// Sets the 64-bit hash seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builds a [`ThetaUnion`].
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with kind `InvalidArgument` if `lg_k` is outside
    /// `[4, 26]`.
    pub fn build_union(self) -> Result<ThetaUnion, Error> {
        ThetaUnion::new(self.lg_k, self.resize_factor, self.seed)
    }

    /// Builds a [`ThetaIntersection`].
    pub fn build_intersection(self) -> ThetaIntersection {
        ThetaIntersection::new(self.seed)
    }

    /// Builds a [`ThetaAnotB`].
    pub fn build_anotb(self) -> ThetaAnotB {
        ThetaAnotB::new()
    }
}
