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

use crate::common::ResizeFactor;
use crate::hash::compute_seed_hash;

/// Maximum theta value (signed max for compatibility with Java).
pub const MAX_THETA: u64 = i64::MAX as u64;

/// Minimum log2 of K.
pub const MIN_LG_K: u8 = 4;

/// Maximum log2 of K.
pub const MAX_LG_K: u8 = 26;

/// Default log2 of K.
pub const DEFAULT_LG_K: u8 = 12;

/// Resize threshold (50% load factor).
const RESIZE_THRESHOLD: f64 = 0.5;

/// Rebuild threshold (93.75% load factor).
pub(crate) const REBUILD_THRESHOLD: f64 = 15.0 / 16.0;

/// Stride hash bits used for double-hashing probe strides.
const STRIDE_HASH_BITS: u8 = 7;

/// Stride mask.
const STRIDE_MASK: u64 = (1 << STRIDE_HASH_BITS) - 1;

/// Outcome of presenting one hash to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Newly inserted, no resize or rebuild triggered.
    Inserted,
    /// Newly inserted; the insert pushed the table past its resize threshold.
    InsertedResized,
    /// Newly inserted; the insert pushed the table past its rebuild threshold.
    InsertedRebuilt,
    /// The hash was already present.
    Duplicate,
    /// The hash was `0` or `>= theta` and was screened out.
    RejectedOverTheta,
    /// The input that produced this hash was empty/null and was never hashed.
    RejectedEmpty,
}

/// Open-addressed hash table retaining the smallest hashes below `theta`.
///
/// Maintains an array capped at `2^lg_max_size`: below that cap, exceeding the
/// 50% load threshold grows the array by `resize_factor`; once at the cap,
/// exceeding the 93.75% threshold instead rebuilds, keeping only the
/// `2^lg_nom_size` smallest entries and lowering theta to the evicted
/// boundary.
#[derive(Debug, Clone)]
pub(crate) struct ThetaHashTable {
    lg_cur_size: u8,
    lg_nom_size: u8,
    lg_max_size: u8,
    resize_factor: ResizeFactor,
    sampling_probability: f32,
    hash_seed: u64,

    // Logical emptiness of the source set. Can be false even when
    // `num_retained` is 0 (e.g. every update screened out by theta).
    is_empty: bool,

    theta: u64,

    entries: Vec<u64>,
    num_retained: usize,
}

impl ThetaHashTable {
    /// Creates a fresh table sized for `lg_nom_size` nominal entries.
    pub fn new(
        lg_nom_size: u8,
        resize_factor: ResizeFactor,
        sampling_probability: f32,
        hash_seed: u64,
    ) -> Self {
        let lg_max_size = lg_nom_size + 1;
        let lg_cur_size = starting_sub_multiple(lg_max_size, MIN_LG_K, resize_factor.lg_value());
        Self::from_raw_parts(
            lg_cur_size,
            lg_nom_size,
            resize_factor,
            sampling_probability,
            starting_theta_from_sampling_probability(sampling_probability),
            hash_seed,
            true,
        )
    }

    /// Creates a table with fully explicit state, used to reconstruct set
    /// operator gadgets mid-computation.
    ///
    /// # Panics
    ///
    /// Panics if `lg_cur_size > lg_nom_size + 1`.
    pub fn from_raw_parts(
        lg_cur_size: u8,
        lg_nom_size: u8,
        resize_factor: ResizeFactor,
        sampling_probability: f32,
        theta: u64,
        hash_seed: u64,
        is_empty: bool,
    ) -> Self {
        let lg_max_size = lg_nom_size + 1;
        assert!(
            lg_cur_size <= lg_max_size,
            "lg_cur_size must be <= lg_nom_size + 1, got lg_cur_size={lg_cur_size}, lg_nom_size={lg_nom_size}"
        );
        let size = if lg_cur_size > 0 { 1 << lg_cur_size } else { 0 };
        Self {
            lg_cur_size,
            lg_nom_size,
            lg_max_size,
            resize_factor,
            sampling_probability,
            hash_seed,
            is_empty,
            theta,
            entries: vec![0u64; size],
            num_retained: 0,
        }
    }

    fn find_in_curr_entries(&self, key: u64) -> Option<usize> {
        Self::find_in_entries(&self.entries, key, self.lg_cur_size)
    }

    /// Finds the slot `key` belongs in: an existing match, or the first empty
    /// slot on its probe sequence. Returns `None` only if the table is full
    /// and the whole probe sequence was walked without finding either.
    fn find_in_entries(entries: &[u64], key: u64, lg_size: u8) -> Option<usize> {
        if entries.is_empty() {
            return None;
        }

        let size = entries.len();
        let mask = size - 1;
        let stride = Self::get_stride(key, lg_size);
        let mut index = (key as usize) & mask;
        let loop_index = index;

        loop {
            let probe = entries[index];
            if probe == 0 || probe == key {
                return Some(index);
            }
            index = (index + stride) & mask;
            if index == loop_index {
                return None;
            }
        }
    }

    /// Inserts a pre-hashed, pre-screened value. Returns `true` if it was
    /// newly inserted. Used by set operators driving hashes through the
    /// back door, which only care whether the slot was claimed.
    pub fn try_insert_hash(&mut self, hash: u64) -> bool {
        matches!(
            self.insert_with_status(hash),
            UpdateStatus::Inserted | UpdateStatus::InsertedResized | UpdateStatus::InsertedRebuilt
        )
    }

    /// Inserts a pre-hashed value and reports the full outcome, including
    /// whether the insert triggered a resize or rebuild.
    pub fn insert_with_status(&mut self, hash: u64) -> UpdateStatus {
        self.is_empty = false;

        if hash == 0 || hash >= self.theta {
            return UpdateStatus::RejectedOverTheta;
        }

        let Some(index) = self.find_in_curr_entries(hash) else {
            unreachable!(
                "resize or rebuild keeps the table below full, so a slot always exists"
            );
        };

        if self.entries[index] == hash {
            return UpdateStatus::Duplicate;
        }

        debug_assert_eq!(
            self.entries[index], 0,
            "slot returned by find_in_entries must be empty or matching"
        );
        self.entries[index] = hash;
        self.num_retained += 1;

        let capacity = self.get_capacity();
        if self.num_retained > capacity {
            if self.lg_cur_size <= self.lg_nom_size {
                self.resize();
                UpdateStatus::InsertedResized
            } else {
                self.rebuild();
                UpdateStatus::InsertedRebuilt
            }
        } else {
            UpdateStatus::Inserted
        }
    }

    fn get_capacity(&self) -> usize {
        let fraction = if self.lg_cur_size <= self.lg_nom_size {
            RESIZE_THRESHOLD
        } else {
            REBUILD_THRESHOLD
        };
        (fraction * self.entries.len() as f64) as usize
    }

    fn resize(&mut self) {
        let new_lg_size = std::cmp::min(
            self.lg_cur_size + self.resize_factor.lg_value(),
            self.lg_max_size,
        );
        let new_size = 1usize << new_lg_size;

        let mut new_entries = vec![0u64; new_size];
        for &entry in &self.entries {
            if entry != 0 {
                let idx = Self::find_in_entries(&new_entries, entry, new_lg_size)
                    .expect("a non-empty target array always has room for every source entry");
                new_entries[idx] = entry;
            }
        }

        self.entries = new_entries;
        self.lg_cur_size = new_lg_size;
    }

    /// Keeps only the `2^lg_nom_size` smallest entries, setting theta to the
    /// boundary value evicted at the cut.
    fn rebuild(&mut self) {
        self.entries.retain(|&e| e != 0);
        let k = 1u64 << self.lg_nom_size;
        let (lesser, kth, _) = self.entries.select_nth_unstable(k as usize);
        self.theta = *kth;

        let size = 1usize << self.lg_cur_size;
        let mut new_entries = vec![0u64; size];
        let mut num_inserted = 0;
        for entry in lesser {
            let idx = Self::find_in_entries(&new_entries, *entry, self.lg_cur_size)
                .expect("a freshly zeroed array always has room");
            new_entries[idx] = *entry;
            num_inserted += 1;
        }

        debug_assert_eq!(num_inserted, k as usize);
        self.num_retained = num_inserted;
        self.entries = new_entries;
    }

    /// Rebuilds now if currently over nominal size, otherwise a no-op.
    pub fn trim(&mut self) {
        if self.num_retained > (1 << self.lg_nom_size) {
            self.rebuild();
        }
    }

    /// Resets the table back to its freshly-constructed empty state.
    pub fn reset(&mut self) {
        let init_theta = starting_theta_from_sampling_probability(self.sampling_probability);
        let init_lg_cur = starting_sub_multiple(
            self.lg_nom_size + 1,
            MIN_LG_K,
            self.resize_factor.lg_value(),
        );

        if self.entries.len() != 1 << init_lg_cur {
            self.entries.resize(1 << init_lg_cur, 0);
        }
        self.entries.fill(0);
        self.num_retained = 0;
        self.theta = init_theta;
        self.is_empty = true;
        self.lg_cur_size = init_lg_cur;
    }

    pub fn num_retained(&self) -> usize {
        self.num_retained
    }

    pub fn theta(&self) -> u64 {
        self.theta
    }

    pub fn set_theta(&mut self, theta: u64) {
        self.theta = theta;
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn set_empty(&mut self, is_empty: bool) {
        self.is_empty = is_empty;
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().copied().filter(|&e| e != 0)
    }

    /// Returns whether `hash` is currently retained (ignores theta screening).
    pub fn contains_hash(&self, hash: u64) -> bool {
        match self.find_in_curr_entries(hash) {
            Some(idx) => self.entries[idx] == hash,
            None => false,
        }
    }

    pub fn lg_nom_size(&self) -> u8 {
        self.lg_nom_size
    }

    pub fn hash_seed(&self) -> u64 {
        self.hash_seed
    }

    pub fn seed_hash(&self) -> u16 {
        compute_seed_hash(self.hash_seed)
    }

    fn get_stride(key: u64, lg_size: u8) -> usize {
        (2 * ((key >> lg_size) & STRIDE_MASK) + 1) as usize
    }

    /// Smallest `lg_size` such that `count` entries fit under `load_factor`,
    /// used to size a fresh gadget table around an incoming sketch's entries
    /// (e.g. an intersection's first operand).
    pub fn lg_size_from_count_for_rebuild(count: usize, load_factor: f64) -> u8 {
        let mut lg_size: u8 = 1;
        while (load_factor * (1u64 << lg_size) as f64) < count as f64 {
            lg_size += 1;
        }
        lg_size + 1
    }
}

/// Computes the initial `lg_size` so that `lg_target = lg_init + n *
/// lg_resize_factor` for an integer `n`, with `lg_init >= lg_min`.
fn starting_sub_multiple(lg_target: u8, lg_min: u8, lg_resize_factor: u8) -> u8 {
    if lg_target <= lg_min {
        lg_min
    } else if lg_resize_factor == 0 {
        lg_target
    } else {
        ((lg_target - lg_min) % lg_resize_factor) + lg_min
    }
}

/// Computes the initial theta from a sampling probability.
fn starting_theta_from_sampling_probability(sampling_probability: f32) -> u64 {
    if sampling_probability < 1.0 {
        (MAX_THETA as f64 * sampling_probability as f64) as u64
    } else {
        MAX_THETA
    }
}
