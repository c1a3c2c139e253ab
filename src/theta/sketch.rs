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

//! Mutable Theta sketch: the update engine (C5).

use std::hash::Hash;

use crate::common::NumStdDev;
use crate::common::ResizeFactor;
use crate::common::binomial_bounds;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::MurmurHash3X64128;
use crate::hash::hash_bytes;
use crate::hash::hash_char_array;
use crate::hash::hash_f32;
use crate::hash::hash_f64;
use crate::hash::hash_i64;
use crate::hash::hash_int_array;
use crate::hash::hash_long_array;
use crate::hash::hash_str;
use crate::hash::hash_u64;
use crate::theta::ThetaSketchView;
use crate::theta::compact::CompactThetaSketch;
use crate::theta::hash_table::DEFAULT_LG_K;
use crate::theta::hash_table::MAX_LG_K;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::hash_table::MIN_LG_K;
use crate::theta::hash_table::ThetaHashTable;
use crate::theta::hash_table::UpdateStatus;

/// A mutable Theta sketch built by repeatedly presenting values via `update`.
///
/// Retains the `2^lg_k` smallest hashes it has seen below a shrinking theta
/// threshold. Call [`compact`](Self::compact) to obtain the immutable,
/// serializable form; `ThetaSketch` itself is never serialized directly —
/// the wire format is owned by [`CompactThetaSketch`].
#[derive(Debug)]
pub struct ThetaSketch {
    table: ThetaHashTable,
}

impl ThetaSketch {
    /// Starts a [`ThetaSketchBuilder`] with the default configuration.
    pub fn builder() -> ThetaSketchBuilder {
        ThetaSketchBuilder::default()
    }

    /// Presents an arbitrary `Hash` value to the sketch.
    ///
    /// For cross-language-compatible hashing of primitives, prefer the typed
    /// `update_*` methods below; this generic entry point hashes via
    /// [`std::hash::Hash`]'s own byte sequence, which need not match the
    /// canonical encodings those methods use.
    pub fn update<T: Hash>(&mut self, value: &T) -> UpdateStatus {
        let mut hasher = MurmurHash3X64128::with_seed(self.table.hash_seed());
        value.hash(&mut hasher);
        let (h1, _h2) = hasher.finish128();
        self.table.insert_with_status(h1 >> 1)
    }

    /// Presents a `u64`, widened-and-little-endian per the canonical
    /// encoding.
    pub fn update_u64(&mut self, value: u64) -> UpdateStatus {
        let hash = hash_u64(value, self.table.hash_seed());
        self.table.insert_with_status(hash)
    }

    /// Presents a signed 64-bit integer via its bit pattern.
    pub fn update_i64(&mut self, value: i64) -> UpdateStatus {
        let hash = hash_i64(value, self.table.hash_seed());
        self.table.insert_with_status(hash)
    }

    /// Presents a `f64`, canonicalizing `-0.0`/NaN first.
    pub fn update_f64(&mut self, value: f64) -> UpdateStatus {
        let hash = hash_f64(value, self.table.hash_seed());
        self.table.insert_with_status(hash)
    }

    /// Presents a `f32` by widening to `f64` and canonicalizing.
    pub fn update_f32(&mut self, value: f32) -> UpdateStatus {
        let hash = hash_f32(value, self.table.hash_seed());
        self.table.insert_with_status(hash)
    }

    /// Presents a UTF-8 string.
    ///
    /// A zero-length string is screened out before hashing and reported as
    /// [`UpdateStatus::RejectedEmpty`] rather than counted as a distinct
    /// empty-string element.
    pub fn update_str(&mut self, value: &str) -> UpdateStatus {
        if value.is_empty() {
            return UpdateStatus::RejectedEmpty;
        }
        let hash = hash_str(value, self.table.hash_seed());
        self.table.insert_with_status(hash)
    }

    /// Presents a raw byte slice.
    ///
    /// A zero-length slice is screened out before hashing and reported as
    /// [`UpdateStatus::RejectedEmpty`].
    pub fn update_bytes(&mut self, value: &[u8]) -> UpdateStatus {
        if value.is_empty() {
            return UpdateStatus::RejectedEmpty;
        }
        let hash = hash_bytes(value, self.table.hash_seed());
        self.table.insert_with_status(hash)
    }

    /// Presents a `char` array (UTF-16 code units), two bytes per element.
    ///
    /// A zero-length array is screened out before hashing and reported as
    /// [`UpdateStatus::RejectedEmpty`].
    pub fn update_char_array(&mut self, value: &[u16]) -> UpdateStatus {
        if value.is_empty() {
            return UpdateStatus::RejectedEmpty;
        }
        let hash = hash_char_array(value, self.table.hash_seed());
        self.table.insert_with_status(hash)
    }

    /// Presents an `int` array, four bytes per element.
    ///
    /// A zero-length array is screened out before hashing and reported as
    /// [`UpdateStatus::RejectedEmpty`].
    pub fn update_int_array(&mut self, value: &[i32]) -> UpdateStatus {
        if value.is_empty() {
            return UpdateStatus::RejectedEmpty;
        }
        let hash = hash_int_array(value, self.table.hash_seed());
        self.table.insert_with_status(hash)
    }

    /// Presents a `long` array, eight bytes per element.
    ///
    /// A zero-length array is screened out before hashing and reported as
    /// [`UpdateStatus::RejectedEmpty`].
    pub fn update_long_array(&mut self, value: &[i64]) -> UpdateStatus {
        if value.is_empty() {
            return UpdateStatus::RejectedEmpty;
        }
        let hash = hash_long_array(value, self.table.hash_seed());
        self.table.insert_with_status(hash)
    }

    /// Cardinality estimate: `retained / theta` when estimating, else
    /// `retained` exactly.
    pub fn estimate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        if !self.is_estimation_mode() {
            return self.num_retained() as f64;
        }
        self.num_retained() as f64 / self.theta()
    }

    /// Theta as a fraction in `(0, 1]`.
    pub fn theta(&self) -> f64 {
        self.table.theta() as f64 / MAX_THETA as f64
    }

    /// Theta as the raw 64-bit wire value.
    pub fn theta64(&self) -> u64 {
        self.table.theta()
    }

    /// Whether the sketch has ever had a value presented to it.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Whether `theta < MAX_THETA`, i.e. the estimate is sampled rather than
    /// exact.
    pub fn is_estimation_mode(&self) -> bool {
        self.table.theta() < MAX_THETA
    }

    /// Number of currently retained hash entries.
    pub fn num_retained(&self) -> usize {
        self.table.num_retained()
    }

    /// Configured `lg_k` (log2 of the nominal entry count).
    pub fn lg_k(&self) -> u8 {
        self.table.lg_nom_size()
    }

    /// Rebuilds now to shrink back down to nominal size, if currently over.
    pub fn trim(&mut self) {
        self.table.trim();
    }

    /// Resets the sketch back to its freshly-built empty state.
    pub fn reset(&mut self) {
        self.table.reset();
    }

    /// Iterates retained hashes in table-storage order (not sorted).
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.table.iter()
    }

    /// Approximate lower confidence bound on cardinality.
    pub fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        if !self.is_estimation_mode() {
            return self.num_retained() as f64;
        }
        binomial_bounds::lower_bound(self.num_retained() as u64, self.theta(), num_std_dev)
            .expect("sampling_probability > 0 guarantees theta is always in (0, 1]")
    }

    /// Approximate upper confidence bound on cardinality.
    pub fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        if !self.is_estimation_mode() {
            return self.num_retained() as f64;
        }
        binomial_bounds::upper_bound(
            self.num_retained() as u64,
            self.theta(),
            num_std_dev,
            self.is_empty(),
        )
        .expect("sampling_probability > 0 guarantees theta is always in (0, 1]")
    }

    /// Produces the immutable, serializable [`CompactThetaSketch`] form.
    ///
    /// When `ordered` is `true`, the retained hashes are sorted ascending,
    /// which both set operators rely on for their early-stop optimization
    /// and is required for deserialization to report `is_ordered`.
    pub fn compact(&self, ordered: bool) -> CompactThetaSketch {
        CompactThetaSketch::from_parts(
            self.table.iter().collect(),
            self.table.theta(),
            self.table.seed_hash(),
            ordered,
            self.is_empty(),
        )
    }
}

impl ThetaSketchView for ThetaSketch {
    fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn theta64(&self) -> u64 {
        self.table.theta()
    }

    fn num_retained(&self) -> usize {
        self.table.num_retained()
    }

    fn seed_hash(&self) -> u16 {
        self.table.seed_hash()
    }

    fn is_ordered(&self) -> bool {
        false
    }

    fn iter(&self) -> Box<dyn Iterator<Item = u64> + '_> {
        Box::new(self.table.iter())
    }
}

/// Builder for [`ThetaSketch`].
///
/// Setters are infallible and chainable; validation happens once, in
/// [`build`](Self::build), which returns `Err(InvalidArgument)` rather than
/// panicking on an out-of-range `lg_k`/`sampling_probability`.
#[derive(Debug, Clone)]
pub struct ThetaSketchBuilder {
    lg_k: u8,
    resize_factor: ResizeFactor,
    sampling_probability: f32,
    seed: u64,
}

impl Default for ThetaSketchBuilder {
    fn default() -> Self {
        Self {
            lg_k: DEFAULT_LG_K,
            resize_factor: ResizeFactor::default(),
            sampling_probability: 1.0,
            seed: DEFAULT_UPDATE_SEED,
        }
    }
}

impl ThetaSketchBuilder {
    /// Sets `lg_k` (log2 of the nominal entry count `k`).
    pub fn lg_k(mut self, lg_k: u8) -> Self {
        self.lg_k = lg_k;
        self
    }

    /// Sets the backing array's growth factor.
    pub fn resize_factor(mut self, factor: ResizeFactor) -> Self {
        self.resize_factor = factor;
        self
    }

    /// Sets the sampling probability `p`, the fraction of hashed values
    /// retained even ignoring theta-driven eviction.
    pub fn sampling_probability(mut self, probability: f32) -> Self {
        self.sampling_probability = probability;
        self
    }

    /// Sets the 64-bit hash seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the configuration and builds the sketch.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with kind `InvalidArgument` if `lg_k` is outside
    /// `[4, 26]` or `sampling_probability` is outside `(0.0, 1.0]`.
    pub fn build(self) -> Result<ThetaSketch, Error> {
        if !(MIN_LG_K..=MAX_LG_K).contains(&self.lg_k) {
            return Err(Error::invalid_argument(format!(
                "lg_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {}",
                self.lg_k
            ))
            .with_context("lg_k", self.lg_k));
        }
        if !(self.sampling_probability > 0.0 && self.sampling_probability <= 1.0) {
            return Err(Error::invalid_argument(format!(
                "sampling_probability must be in (0.0, 1.0], got {}",
                self.sampling_probability
            ))
            .with_context("sampling_probability", self.sampling_probability));
        }

        let table = ThetaHashTable::new(
            self.lg_k,
            self.resize_factor,
            self.sampling_probability,
            self.seed,
        );
        Ok(ThetaSketch { table })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_sketch_is_empty() {
        let sketch = ThetaSketch::builder().build().unwrap();
        assert!(sketch.is_empty());
        assert_eq!(sketch.estimate(), 0.0);
        assert_eq!(sketch.num_retained(), 0);
    }

    #[test]
    fn test_update_increases_estimate() {
        let mut sketch = ThetaSketch::builder().lg_k(10).build().unwrap();
        for i in 0..500u64 {
            sketch.update_u64(i);
        }
        assert!(!sketch.is_empty());
        let estimate = sketch.estimate();
        assert!((estimate - 500.0).abs() / 500.0 < 0.2);
    }

    #[test]
    fn test_duplicate_update_does_not_grow_retained() {
        let mut sketch = ThetaSketch::builder().build().unwrap();
        assert_eq!(sketch.update_str("apple"), UpdateStatus::Inserted);
        assert_eq!(sketch.update_str("apple"), UpdateStatus::Duplicate);
        assert_eq!(sketch.num_retained(), 1);
    }

    #[test]
    fn test_empty_string_is_rejected_without_affecting_emptiness() {
        let mut sketch = ThetaSketch::builder().build().unwrap();
        assert_eq!(sketch.update_str(""), UpdateStatus::RejectedEmpty);
        assert!(sketch.is_empty());
        assert_eq!(sketch.num_retained(), 0);
    }

    #[test]
    fn test_builder_rejects_out_of_range_lg_k() {
        let err = ThetaSketch::builder().lg_k(2).build().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_builder_rejects_out_of_range_probability() {
        let err = ThetaSketch::builder()
            .sampling_probability(0.0)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_builder_rejects_probability_above_one() {
        let err = ThetaSketch::builder()
            .sampling_probability(1.5)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_estimate_is_within_bounds() {
        let mut sketch = ThetaSketch::builder().lg_k(12).build().unwrap();
        for i in 0..10_000u64 {
            sketch.update_u64(i);
        }
        let estimate = sketch.estimate();
        let lower = sketch.lower_bound(NumStdDev::Three);
        let upper = sketch.upper_bound(NumStdDev::Three);
        assert!(lower <= estimate);
        assert!(estimate <= upper);
    }

    #[test]
    fn test_exact_mode_bounds_equal_retained() {
        let mut sketch = ThetaSketch::builder().lg_k(12).build().unwrap();
        sketch.update_u64(1);
        sketch.update_u64(2);
        assert!(!sketch.is_estimation_mode());
        assert_eq!(sketch.lower_bound(NumStdDev::Two), 2.0);
        assert_eq!(sketch.upper_bound(NumStdDev::Two), 2.0);
    }

    #[test]
    fn test_compact_preserves_cardinality_info() {
        let mut sketch = ThetaSketch::builder().lg_k(10).build().unwrap();
        for i in 0..50u64 {
            sketch.update_u64(i);
        }
        let compact = sketch.compact(true);
        assert_eq!(compact.num_retained(), sketch.num_retained());
        assert_eq!(compact.theta64(), sketch.theta64());
        assert!(compact.is_ordered());
        let sorted: Vec<u64> = compact.iter().collect();
        let mut expected: Vec<u64> = sorted.clone();
        expected.sort_unstable();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_compact_roundtrips_through_wire_format() {
        let mut sketch = ThetaSketch::builder().lg_k(8).build().unwrap();
        for i in 0..20u64 {
            sketch.update_u64(i);
        }
        let bytes = sketch.compact(true).serialize();
        let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
        assert_eq!(restored.num_retained(), sketch.num_retained());
        assert!((restored.estimate() - sketch.estimate()).abs() < 1e-9);
    }

    #[test]
    fn test_trim_lowers_retained_to_nominal_size() {
        let mut sketch = ThetaSketch::builder()
            .lg_k(5)
            .resize_factor(ResizeFactor::X8)
            .build()
            .unwrap();
        for i in 0..500u64 {
            sketch.update_u64(i);
        }
        sketch.trim();
        assert!(sketch.num_retained() <= 32);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut sketch = ThetaSketch::builder().build().unwrap();
        sketch.update_str("apple");
        sketch.reset();
        assert!(sketch.is_empty());
        assert_eq!(sketch.num_retained(), 0);
    }

    #[test]
    fn test_update_char_int_long_arrays() {
        let mut sketch = ThetaSketch::builder().build().unwrap();
        sketch.update_char_array(&[1, 2, 3]);
        sketch.update_int_array(&[1, 2, 3]);
        sketch.update_long_array(&[1, 2, 3]);
        assert_eq!(sketch.num_retained(), 3);
    }

    #[test]
    fn test_empty_arrays_are_rejected_without_affecting_emptiness() {
        let mut sketch = ThetaSketch::builder().build().unwrap();
        assert_eq!(sketch.update_char_array(&[]), UpdateStatus::RejectedEmpty);
        assert_eq!(sketch.update_int_array(&[]), UpdateStatus::RejectedEmpty);
        assert_eq!(sketch.update_long_array(&[]), UpdateStatus::RejectedEmpty);
        assert!(sketch.is_empty());
        assert_eq!(sketch.num_retained(), 0);
    }

    #[test]
    fn test_generic_update_accepts_hashable_types() {
        let mut sketch = ThetaSketch::builder().build().unwrap();
        sketch.update(&42i32);
        sketch.update(&"hello".to_string());
        assert_eq!(sketch.num_retained(), 2);
    }
}
