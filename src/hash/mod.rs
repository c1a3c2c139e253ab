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

//! MurmurHash3-x64-128 over canonicalized byte encodings of update values.
//!
//! The sketch only ever consumes `h1` of the `(h1, h2)` pair produced by
//! [`mur3::murmurhash3_x64_128`], shifted right by one bit so the result fits
//! in 63 bits and is compatible with the Java/C++ implementations' signed
//! `long` theta representation. Typed entry points below canonicalize each
//! primitive into the exact byte layout the reference implementations hash,
//! so the same logical value produces the same hash across languages.

use crate::common::canonical_double;

/// Default seed used when a sketch builder is not given an explicit one.
pub const DEFAULT_UPDATE_SEED: u64 = 9001;

/// A thin `std::hash::Hasher` adapter around MurmurHash3-x64-128, kept for
/// callers that already have a `Hash` value and want the full 128-bit state.
/// Buffers everything written and defers the actual MurmurHash3 computation
/// to [`finish128`](Self::finish128), since `Hasher` delivers input through a
/// sequence of `write_*` calls rather than one contiguous buffer.
#[derive(Debug, Clone)]
pub struct MurmurHash3X64128 {
    seed: u64,
    buf: Vec<u8>,
}

impl MurmurHash3X64128 {
    /// Creates a hasher that will hash with the given 64-bit seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            buf: Vec::new(),
        }
    }

    /// Computes the full 128-bit `(h1, h2)` MurmurHash3 state over everything
    /// written so far.
    pub fn finish128(&self) -> (u64, u64) {
        mur3::murmurhash3_x64_128(&self.buf, self.seed)
    }
}

impl std::hash::Hasher for MurmurHash3X64128 {
    fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn finish(&self) -> u64 {
        self.finish128().0
    }
}

/// Hashes a byte slice directly with the given 64-bit seed and returns the
/// 63-bit non-negative hash field the sketch retains (`h1 >> 1`).
pub fn hash_bytes(bytes: &[u8], seed: u64) -> u64 {
    let (h1, _h2) = mur3::murmurhash3_x64_128(bytes, seed);
    h1 >> 1
}

/// Hashes a 64-bit integer, widened-and-little-endian per spec.
pub fn hash_u64(value: u64, seed: u64) -> u64 {
    hash_bytes(&value.to_le_bytes(), seed)
}

/// Hashes a signed 64-bit integer via its bit pattern.
pub fn hash_i64(value: i64, seed: u64) -> u64 {
    hash_u64(value as u64, seed)
}

/// Hashes a `f64`, canonicalizing `-0.0` and NaN bit-patterns first so that
/// numerically-equal doubles always hash identically.
pub fn hash_f64(value: f64, seed: u64) -> u64 {
    hash_u64(canonical_double(value).to_bits(), seed)
}

/// Hashes a `f32` by widening to `f64` and canonicalizing.
pub fn hash_f32(value: f32, seed: u64) -> u64 {
    hash_f64(value as f64, seed)
}

/// Hashes a UTF-8 string as its raw bytes.
pub fn hash_str(value: &str, seed: u64) -> u64 {
    hash_bytes(value.as_bytes(), seed)
}

/// Hashes a `char` array, two little-endian bytes per element (UTF-16 code
/// unit width, matching the reference implementations' `char[]` encoding).
pub fn hash_char_array(value: &[u16], seed: u64) -> u64 {
    let mut bytes = Vec::with_capacity(value.len() * 2);
    for c in value {
        bytes.extend_from_slice(&c.to_le_bytes());
    }
    hash_bytes(&bytes, seed)
}

/// Hashes an `int` array, four little-endian bytes per element, by direct
/// analogy to [`hash_char_array`]'s element-width rule.
pub fn hash_int_array(value: &[i32], seed: u64) -> u64 {
    let mut bytes = Vec::with_capacity(value.len() * 4);
    for i in value {
        bytes.extend_from_slice(&i.to_le_bytes());
    }
    hash_bytes(&bytes, seed)
}

/// Hashes a `long` array, eight little-endian bytes per element, by direct
/// analogy to [`hash_char_array`]'s element-width rule.
pub fn hash_long_array(value: &[i64], seed: u64) -> u64 {
    let mut bytes = Vec::with_capacity(value.len() * 8);
    for l in value {
        bytes.extend_from_slice(&l.to_le_bytes());
    }
    hash_bytes(&bytes, seed)
}

/// Computes the 16-bit seed-hash compatibility tag: the low 16 bits of
/// MurmurHash3-x64-128 over the seed's 8 little-endian bytes, hashed with
/// seed `0`.
pub fn compute_seed_hash(seed: u64) -> u16 {
    let (h1, _h2) = mur3::murmurhash3_x64_128(&seed.to_le_bytes(), 0);
    (h1 & 0xffff) as u16
}
