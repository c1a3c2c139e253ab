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

//! Concrete Theta sketch variants that appear in byte 2 of the wire
//! preamble, plus the `preamble_longs` range each one is allowed to use.

use crate::theta::serialization::FAMILY_ALPHA;
use crate::theta::serialization::FAMILY_ANOTB;
use crate::theta::serialization::FAMILY_COMPACT;
use crate::theta::serialization::FAMILY_INTERSECTION;
use crate::theta::serialization::FAMILY_QUICKSELECT;
use crate::theta::serialization::FAMILY_UNION;
use crate::theta::serialization::preamble_longs_range;

/// A concrete Theta sketch or set-operator variant, as tagged by byte 2 of
/// the wire preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// The legacy alpha-variant update sketch (read-only forward
    /// compatibility concern; this crate never writes it).
    Alpha,
    /// The quick-select update sketch — what [`crate::theta::ThetaSketch`]
    /// serializes as.
    QuickSelect,
    /// The immutable compact sketch.
    Compact,
    /// The [`crate::theta::ThetaUnion`] operator's internal gadget.
    Union,
    /// The [`crate::theta::ThetaIntersection`] operator's internal gadget.
    Intersection,
    /// The [`crate::theta::ThetaAnotB`] operator.
    AnotB,
}

impl Family {
    /// Returns the raw wire byte for this family.
    pub const fn id(self) -> u8 {
        match self {
            Family::Alpha => FAMILY_ALPHA,
            Family::QuickSelect => FAMILY_QUICKSELECT,
            Family::Compact => FAMILY_COMPACT,
            Family::Union => FAMILY_UNION,
            Family::Intersection => FAMILY_INTERSECTION,
            Family::AnotB => FAMILY_ANOTB,
        }
    }

    /// Reconstructs a `Family` from a raw wire byte, or `None` if the byte
    /// doesn't name a known family.
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            FAMILY_ALPHA => Some(Family::Alpha),
            FAMILY_QUICKSELECT => Some(Family::QuickSelect),
            FAMILY_COMPACT => Some(Family::Compact),
            FAMILY_UNION => Some(Family::Union),
            FAMILY_INTERSECTION => Some(Family::Intersection),
            FAMILY_ANOTB => Some(Family::AnotB),
            _ => None,
        }
    }

    /// Returns the inclusive `(min, max)` valid `preamble_longs` for this
    /// family, used to validate a deserialized header before trusting the
    /// rest of the buffer.
    pub fn preamble_longs_range(self) -> (u8, u8) {
        preamble_longs_range(self.id()).expect("every Family variant has a known id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        for family in [
            Family::Alpha,
            Family::QuickSelect,
            Family::Compact,
            Family::Union,
            Family::Intersection,
            Family::AnotB,
        ] {
            assert_eq!(Family::from_id(family.id()), Some(family));
        }
    }

    #[test]
    fn test_unknown_id_is_none() {
        assert_eq!(Family::from_id(99), None);
    }

    #[test]
    fn test_preamble_longs_ranges() {
        assert_eq!(Family::Compact.preamble_longs_range(), (1, 3));
        assert_eq!(Family::QuickSelect.preamble_longs_range(), (3, 3));
        assert_eq!(Family::Union.preamble_longs_range(), (4, 4));
        assert_eq!(Family::Intersection.preamble_longs_range(), (3, 3));
        assert_eq!(Family::AnotB.preamble_longs_range(), (3, 3));
    }
}
