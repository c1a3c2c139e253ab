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

//! Compact Theta sketch: the immutable, serializable form produced by
//! [`crate::theta::ThetaSketch::compact`], by any set operator's
//! `get_result`, or by deserializing a wire buffer.
//!
//! Collapses the source hierarchy's `Empty | Single | Estimating` variants
//! into one struct: `is_empty` and `entries.len()` together determine which
//! canonical wire form [`serialize`](Self::serialize) emits.

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::common::NumStdDev;
use crate::common::binomial_bounds;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;
use crate::theta::Family;
use crate::theta::ThetaSketchView;
use crate::theta::hash_table::MAX_THETA;
use crate::theta::serialization::FAMILY_COMPACT;
use crate::theta::serialization::FLAG_HAS_SINGLE_ITEM;
use crate::theta::serialization::FLAG_IS_COMPACT;
use crate::theta::serialization::FLAG_IS_EMPTY;
use crate::theta::serialization::FLAG_IS_ORDERED;
use crate::theta::serialization::FLAG_IS_READ_ONLY;
use crate::theta::serialization::HASH_SIZE_BYTES;
use crate::theta::serialization::PREAMBLE_LONGS_EMPTY;
use crate::theta::serialization::PREAMBLE_LONGS_ESTIMATION;
use crate::theta::serialization::SERIAL_VERSION;

/// An immutable Theta sketch: sorted-or-unsorted retained hashes, theta, and
/// a seed-hash compatibility tag.
///
/// Produced by [`ThetaSketch::compact`](crate::theta::ThetaSketch::compact),
/// by a set operator's `get_result`, or by [`deserialize`](Self::deserialize)
/// / [`deserialize_with_seed`](Self::deserialize_with_seed). Never mutated
/// after construction: a second call to `compact` on the same source always
/// produces an equal sketch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactThetaSketch {
    theta: u64,
    entries: Vec<u64>,
    seed_hash: u16,
    is_empty: bool,
    is_ordered: bool,
}

impl CompactThetaSketch {
    /// Builds a canonical compact sketch from its logical parts.
    ///
    /// Canonicalizes per the data-model invariants: an empty sketch always
    /// carries `theta == MAX_THETA` and no entries; empty and single-entry
    /// sketches are always reported as ordered, matching the wire format's
    /// canonical forms.
    pub(crate) fn from_parts(
        hashes: Vec<u64>,
        theta: u64,
        seed_hash: u16,
        ordered: bool,
        is_empty: bool,
    ) -> Self {
        if is_empty {
            return Self {
                theta: MAX_THETA,
                entries: Vec::new(),
                seed_hash,
                is_empty: true,
                is_ordered: true,
            };
        }

        let mut entries = hashes;
        let canonical_ordered = ordered || entries.len() <= 1;
        if ordered && entries.len() > 1 {
            entries.sort_unstable();
        }

        Self {
            theta,
            entries,
            seed_hash,
            is_empty: false,
            is_ordered: canonical_ordered,
        }
    }

    /// Whether this sketch is logically empty (no item was ever presented
    /// to the source, as opposed to every item having been screened out by
    /// sampling).
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Returns the cardinality estimate: `retained / theta` when estimating,
    /// else `retained` exactly.
    pub fn estimate(&self) -> f64 {
        if self.is_empty {
            return 0.0;
        }
        if !self.is_estimation_mode() {
            return self.entries.len() as f64;
        }
        self.entries.len() as f64 / self.theta()
    }

    /// Theta as a fraction in `(0, 1]`.
    pub fn theta(&self) -> f64 {
        self.theta as f64 / MAX_THETA as f64
    }

    /// Theta as the raw 64-bit wire value.
    pub fn theta64(&self) -> u64 {
        self.theta
    }

    /// Whether `theta < MAX_THETA`, i.e. the estimate is sampled rather than
    /// exact.
    pub fn is_estimation_mode(&self) -> bool {
        self.theta < MAX_THETA
    }

    /// Number of retained hash entries.
    pub fn num_retained(&self) -> usize {
        self.entries.len()
    }

    /// Whether [`iter`](Self::iter) yields hashes in strictly ascending
    /// order.
    pub fn is_ordered(&self) -> bool {
        self.is_ordered
    }

    /// Iterates retained hashes in storage order (ascending, iff
    /// [`is_ordered`](Self::is_ordered)).
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().copied()
    }

    /// 16-bit seed-hash compatibility tag.
    pub fn seed_hash(&self) -> u16 {
        self.seed_hash
    }

    /// Approximate lower confidence bound on cardinality.
    pub fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        if self.is_empty {
            return 0.0;
        }
        if !self.is_estimation_mode() {
            return self.num_retained() as f64;
        }
        binomial_bounds::lower_bound(self.num_retained() as u64, self.theta(), num_std_dev)
            .expect("theta is always in (0, 1] for a non-empty sketch")
    }

    /// Approximate upper confidence bound on cardinality.
    pub fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        if !self.is_estimation_mode() {
            return if self.is_empty {
                0.0
            } else {
                self.num_retained() as f64
            };
        }
        binomial_bounds::upper_bound(
            self.num_retained() as u64,
            self.theta(),
            num_std_dev,
            self.is_empty,
        )
        .expect("theta is always in (0, 1] for a non-empty sketch")
    }

    fn is_single_item(&self) -> bool {
        !self.is_empty && self.entries.len() == 1 && self.theta == MAX_THETA
    }

    /// Serializes this sketch to the compact wire format.
    ///
    /// The empty form is exactly 8 bytes, the single-item form 16 bytes, and
    /// every other non-empty form a 24-byte preamble followed by
    /// `retained * 8` bytes of hashes.
    pub fn serialize(&self) -> Vec<u8> {
        let is_single_item = self.is_single_item();

        let preamble_longs = if self.is_empty || is_single_item {
            PREAMBLE_LONGS_EMPTY
        } else {
            PREAMBLE_LONGS_ESTIMATION
        };

        let preamble_bytes = (preamble_longs as usize) * HASH_SIZE_BYTES;
        let data_bytes = if self.is_empty {
            0
        } else {
            self.entries.len() * HASH_SIZE_BYTES
        };
        let mut bytes = SketchBytes::with_capacity(preamble_bytes + data_bytes);

        let mut flags = FLAG_IS_COMPACT | FLAG_IS_READ_ONLY;
        if self.is_empty {
            flags |= FLAG_IS_EMPTY | FLAG_IS_ORDERED;
        } else if is_single_item {
            flags |= FLAG_IS_ORDERED | FLAG_HAS_SINGLE_ITEM;
        } else if self.is_ordered {
            flags |= FLAG_IS_ORDERED;
        }

        bytes.write_u8(preamble_longs);
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(FAMILY_COMPACT);
        bytes.write_u8(0); // lg_nom_longs: unused on compact sketches
        bytes.write_u8(0); // lg_arr_longs: unused on compact sketches
        bytes.write_u8(flags);
        bytes.write_u16_le(self.seed_hash);

        if self.is_empty {
            return bytes.into_bytes();
        }

        if is_single_item {
            bytes.write_u64_le(self.entries[0]);
            return bytes.into_bytes();
        }

        bytes.write_u32_le(self.entries.len() as u32);
        bytes.write_f32_le(1.0); // sampling p: always 1.0 for a compact sketch's own value
        bytes.write_i64_le(self.theta as i64);
        for hash in &self.entries {
            bytes.write_u64_le(*hash);
        }

        bytes.into_bytes()
    }

    /// Deserializes a compact sketch using the default update seed.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::deserialize_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    /// Deserializes a compact sketch, validating its seed hash against
    /// `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with kind `Corruption` if the buffer is truncated,
    /// names an unknown family or unsupported serial version, or carries a
    /// seed hash that doesn't match `seed`.
    pub fn deserialize_with_seed(bytes: &[u8], seed: u64) -> Result<Self, Error> {
        fn tagged(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = SketchSlice::new(bytes);

        let preamble_longs = cursor.read_u8().map_err(tagged("preamble_longs"))?;
        let serial_version = cursor.read_u8().map_err(tagged("serial_version"))?;
        let family_id = cursor.read_u8().map_err(tagged("family_id"))?;
        let _lg_nom = cursor.read_u8().map_err(tagged("lg_nom_longs"))?;
        let _lg_arr = cursor.read_u8().map_err(tagged("lg_arr_longs"))?;
        let flags = cursor.read_u8().map_err(tagged("flags"))?;
        let stored_seed_hash = cursor.read_u16_le().map_err(tagged("seed_hash"))?;

        if family_id != FAMILY_COMPACT {
            return Err(Error::invalid_family(FAMILY_COMPACT, family_id, "Compact"));
        }
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }

        let family = Family::from_id(family_id)
            .expect("family_id already checked equal to FAMILY_COMPACT above");
        let (min_preamble_longs, max_preamble_longs) = family.preamble_longs_range();
        if !(min_preamble_longs..=max_preamble_longs).contains(&preamble_longs) {
            return Err(Error::corruption(format!(
                "preamble_longs {preamble_longs} out of range [{min_preamble_longs}, {max_preamble_longs}] for family Compact"
            )));
        }

        let expected_seed_hash = compute_seed_hash(seed);
        if stored_seed_hash != expected_seed_hash {
            return Err(Error::seed_hash_mismatch(
                expected_seed_hash,
                stored_seed_hash,
            ));
        }

        let is_empty = flags & FLAG_IS_EMPTY != 0;
        let is_single_item = flags & FLAG_HAS_SINGLE_ITEM != 0;
        let is_ordered = flags & FLAG_IS_ORDERED != 0;

        if is_empty {
            return Ok(Self {
                theta: MAX_THETA,
                entries: Vec::new(),
                seed_hash: stored_seed_hash,
                is_empty: true,
                is_ordered: true,
            });
        }

        if preamble_longs == PREAMBLE_LONGS_EMPTY && is_single_item {
            let hash = cursor.read_u64_le().map_err(tagged("single_item_hash"))?;
            return Ok(Self {
                theta: MAX_THETA,
                entries: vec![hash],
                seed_hash: stored_seed_hash,
                is_empty: false,
                is_ordered: true,
            });
        }

        if preamble_longs < PREAMBLE_LONGS_ESTIMATION {
            return Err(Error::corruption(format!(
                "non-empty, non-single-item compact sketch requires preamble_longs >= {PREAMBLE_LONGS_ESTIMATION}, got {preamble_longs}"
            )));
        }

        let num_entries = cursor.read_u32_le().map_err(tagged("num_entries"))? as usize;
        let _p = cursor.read_f32_le().map_err(tagged("p"))?;
        let theta = cursor.read_i64_le().map_err(tagged("theta"))? as u64;

        let mut entries = Vec::with_capacity(num_entries);
        for i in 0..num_entries {
            let hash = cursor.read_u64_le().map_err(|_| {
                Error::insufficient_data(format!(
                    "expected {num_entries} hash entries, failed at index {i}"
                ))
            })?;
            entries.push(hash);
        }

        Ok(Self {
            theta,
            entries,
            seed_hash: stored_seed_hash,
            is_empty: false,
            is_ordered,
        })
    }
}

impl ThetaSketchView for CompactThetaSketch {
    fn is_empty(&self) -> bool {
        self.is_empty
    }

    fn theta64(&self) -> u64 {
        self.theta
    }

    fn num_retained(&self) -> usize {
        self.entries.len()
    }

    fn seed_hash(&self) -> u16 {
        self.seed_hash
    }

    fn is_ordered(&self) -> bool {
        self.is_ordered
    }

    fn iter(&self) -> Box<dyn Iterator<Item = u64> + '_> {
        Box::new(self.entries.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_hash() -> u16 {
        compute_seed_hash(DEFAULT_UPDATE_SEED)
    }

    #[test]
    fn test_empty_sketch() {
        let sketch = CompactThetaSketch::from_parts(vec![], MAX_THETA, seed_hash(), true, true);
        assert!(sketch.is_empty());
        assert_eq!(sketch.estimate(), 0.0);
        assert_eq!(sketch.num_retained(), 0);
        assert!(!sketch.is_estimation_mode());
        assert!(sketch.is_ordered());
    }

    #[test]
    fn test_empty_serializes_to_exact_eight_bytes() {
        let sketch = CompactThetaSketch::from_parts(vec![], MAX_THETA, seed_hash(), true, true);
        let bytes = sketch.serialize();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[0..6], &[0x01, 0x03, 0x03, 0x00, 0x00, 0x1E]);
        assert_eq!(&bytes[6..8], &seed_hash().to_le_bytes());
    }

    #[test]
    fn test_single_item_serializes_to_sixteen_bytes() {
        let sketch =
            CompactThetaSketch::from_parts(vec![42], MAX_THETA, seed_hash(), true, false);
        let bytes = sketch.serialize();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0], 0x01);
        assert_ne!(bytes[5] & 0x20, 0, "single-item flag must be set");
        assert_eq!(sketch.estimate(), 1.0);
        assert_eq!(sketch.lower_bound(NumStdDev::Two), 1.0);
        assert_eq!(sketch.upper_bound(NumStdDev::Two), 1.0);
    }

    #[test]
    fn test_multi_item_exact_serializes_with_three_preamble_longs() {
        let entries = vec![10, 20, 30];
        let sketch =
            CompactThetaSketch::from_parts(entries.clone(), MAX_THETA, seed_hash(), true, false);
        let bytes = sketch.serialize();
        assert_eq!(bytes[0], 3);
        assert_eq!(bytes.len(), 24 + 3 * 8);
    }

    #[test]
    fn test_from_parts_sorts_when_ordered() {
        let sketch =
            CompactThetaSketch::from_parts(vec![30, 10, 20], MAX_THETA, seed_hash(), true, false);
        let collected: Vec<u64> = sketch.iter().collect();
        assert_eq!(collected, vec![10, 20, 30]);
    }

    #[test]
    fn test_from_parts_preserves_order_when_unordered() {
        let sketch = CompactThetaSketch::from_parts(
            vec![30, 10, 20],
            MAX_THETA,
            seed_hash(),
            false,
            false,
        );
        assert!(!sketch.is_ordered());
        let collected: Vec<u64> = sketch.iter().collect();
        assert_eq!(collected, vec![30, 10, 20]);
    }

    #[test]
    fn test_estimation_mode_estimate() {
        let entries = vec![100u64, 200, 300];
        let theta = MAX_THETA / 2;
        let sketch = CompactThetaSketch::from_parts(entries, theta, seed_hash(), true, false);
        assert!(sketch.is_estimation_mode());
        assert!((sketch.estimate() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_roundtrip_empty() {
        let sketch = CompactThetaSketch::from_parts(vec![], MAX_THETA, seed_hash(), true, true);
        let bytes = sketch.serialize();
        let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
        assert_eq!(sketch, restored);
    }

    #[test]
    fn test_roundtrip_single_item() {
        let sketch =
            CompactThetaSketch::from_parts(vec![123456], MAX_THETA, seed_hash(), true, false);
        let bytes = sketch.serialize();
        let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
        assert_eq!(sketch, restored);
    }

    #[test]
    fn test_roundtrip_estimating() {
        let entries = vec![5u64, 15, 25, 35, 45];
        let theta = MAX_THETA / 3;
        let sketch =
            CompactThetaSketch::from_parts(entries, theta, seed_hash(), true, false);
        let bytes = sketch.serialize();
        let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
        assert_eq!(sketch, restored);
    }

    #[test]
    fn test_roundtrip_unordered() {
        let entries = vec![300u64, 100, 200];
        let sketch =
            CompactThetaSketch::from_parts(entries.clone(), MAX_THETA, seed_hash(), false, false);
        let bytes = sketch.serialize();
        let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
        assert_eq!(restored.iter().collect::<Vec<_>>(), entries);
        assert!(!restored.is_ordered());
    }

    #[test]
    fn test_deserialize_rejects_wrong_family() {
        let mut bytes = vec![1u8, SERIAL_VERSION, 99, 0, 0, FLAG_IS_EMPTY | FLAG_IS_COMPACT];
        bytes.extend_from_slice(&seed_hash().to_le_bytes());
        assert!(CompactThetaSketch::deserialize(&bytes).is_err());
    }

    #[test]
    fn test_deserialize_rejects_bad_seed_hash() {
        let mut bytes = vec![
            1u8,
            SERIAL_VERSION,
            FAMILY_COMPACT,
            0,
            0,
            FLAG_IS_EMPTY | FLAG_IS_COMPACT,
        ];
        bytes.extend_from_slice(&0xDEADu16.to_le_bytes());
        assert!(CompactThetaSketch::deserialize(&bytes).is_err());
    }

    #[test]
    fn test_deserialize_rejects_truncated_buffer() {
        let bytes = vec![0u8; 3];
        assert!(CompactThetaSketch::deserialize(&bytes).is_err());
    }

    #[test]
    fn test_compact_is_idempotent_under_repeated_calls() {
        let sketch = CompactThetaSketch::from_parts(vec![1, 2, 3], MAX_THETA, seed_hash(), true, false);
        let again = CompactThetaSketch::from_parts(
            sketch.iter().collect(),
            sketch.theta64(),
            sketch.seed_hash(),
            sketch.is_ordered(),
            sketch.is_empty(),
        );
        assert_eq!(sketch, again);
    }
}
