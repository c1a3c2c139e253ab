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

//! Binary serialization format constants for Theta sketches and their set
//! operators.

/// Family identifier for the (non-compact) alpha-variant update sketch.
pub const FAMILY_ALPHA: u8 = 1;
/// Family identifier for the quick-select update sketch.
pub const FAMILY_QUICKSELECT: u8 = 2;
/// Family identifier for the compact (immutable, serialized) sketch.
pub const FAMILY_COMPACT: u8 = 3;
/// Family identifier for the Union set operator.
pub const FAMILY_UNION: u8 = 4;
/// Family identifier for the Intersection set operator.
pub const FAMILY_INTERSECTION: u8 = 5;
/// Family identifier for the A-not-B set operator.
pub const FAMILY_ANOTB: u8 = 6;

/// Current serialization version.
pub const SERIAL_VERSION: u8 = 3;

/// Preamble size for an empty sketch (8 bytes = 1 long), also used for the
/// single-item compact form (1 header long + 1 hash long = 16 bytes total).
pub const PREAMBLE_LONGS_EMPTY: u8 = 1;
/// Preamble size for an estimation-mode sketch, and for any non-empty,
/// non-single-item compact sketch regardless of its theta (24 bytes).
pub const PREAMBLE_LONGS_ESTIMATION: u8 = 3;
/// Preamble size for a union's internal gadget (32 bytes).
pub const PREAMBLE_LONGS_UNION: u8 = 4;

/// Minimum/maximum valid preamble_longs per family, used to validate a
/// deserialized header before trusting the rest of the buffer.
pub fn preamble_longs_range(family_id: u8) -> Option<(u8, u8)> {
    match family_id {
        FAMILY_COMPACT => Some((PREAMBLE_LONGS_EMPTY, PREAMBLE_LONGS_ESTIMATION)),
        FAMILY_ALPHA | FAMILY_QUICKSELECT => {
            Some((PREAMBLE_LONGS_ESTIMATION, PREAMBLE_LONGS_ESTIMATION))
        }
        FAMILY_UNION => Some((PREAMBLE_LONGS_UNION, PREAMBLE_LONGS_UNION)),
        FAMILY_INTERSECTION | FAMILY_ANOTB => {
            Some((PREAMBLE_LONGS_ESTIMATION, PREAMBLE_LONGS_ESTIMATION))
        }
        _ => None,
    }
}

// Flags (byte 5) - bit masks.
/// Flag: data is in big-endian format (this crate always writes little-endian).
#[allow(dead_code)]
pub const FLAG_IS_BIG_ENDIAN: u8 = 1 << 0;
/// Flag: sketch is read-only (compact sketches are always read-only).
pub const FLAG_IS_READ_ONLY: u8 = 1 << 1;
/// Flag: sketch is empty.
pub const FLAG_IS_EMPTY: u8 = 1 << 2;
/// Flag: sketch is in compact format.
pub const FLAG_IS_COMPACT: u8 = 1 << 3;
/// Flag: hash values are ordered (sorted ascending).
pub const FLAG_IS_ORDERED: u8 = 1 << 4;
/// Flag: sketch contains exactly one item (special two-long encoding).
pub const FLAG_HAS_SINGLE_ITEM: u8 = 1 << 5;

/// Size of a single hash entry in bytes.
pub const HASH_SIZE_BYTES: usize = 8;

/// Smallest permitted `lg_nom_size`.
pub const MIN_LG_NOM_SIZE: u8 = 4;
/// Largest permitted `lg_nom_size`.
pub const MAX_LG_NOM_SIZE: u8 = 26;
