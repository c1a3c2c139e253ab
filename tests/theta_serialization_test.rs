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

//! Wire-format round-trip tests for `CompactThetaSketch`.

use theta_sketch::theta::CompactThetaSketch;
use theta_sketch::theta::ThetaSketch;

#[test]
fn test_serialize_empty() {
    let sketch = ThetaSketch::builder().lg_k(12).build().unwrap();
    let bytes = sketch.compact(true).serialize();

    assert_eq!(bytes.len(), 8, "empty sketch should be 8 bytes");
    assert_eq!(bytes[0], 1, "preamble_longs should be 1 for empty");
    assert_eq!(bytes[1], 3, "serial version should be 3");
    assert_eq!(bytes[2], 3, "family id should be 3 (Compact)");

    let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
    assert!(restored.is_empty());
    assert_eq!(restored.estimate(), 0.0);
}

#[test]
fn test_serialize_single_item() {
    let mut sketch = ThetaSketch::builder().lg_k(12).build().unwrap();
    sketch.update_str("apple");

    let bytes = sketch.compact(true).serialize();

    assert_eq!(bytes.len(), 16, "single item sketch should be 16 bytes");
    assert_eq!(bytes[0], 1, "preamble_longs should be 1 for single item");

    let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
    assert!(!restored.is_empty());
    assert_eq!(restored.estimate(), 1.0);
    assert_eq!(restored.num_retained(), 1);
}

#[test]
fn test_serialize_exact_mode_multi_item() {
    let mut sketch = ThetaSketch::builder().lg_k(12).build().unwrap();
    for i in 0..100u64 {
        sketch.update_u64(i);
    }

    assert!(!sketch.is_estimation_mode());

    let bytes = sketch.compact(true).serialize();

    let expected_size = 24 + 100 * 8;
    assert_eq!(bytes.len(), expected_size);
    assert_eq!(bytes[0], 3, "preamble_longs should be 3");

    let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
    assert_eq!(restored.estimate(), sketch.estimate());
    assert_eq!(restored.num_retained(), sketch.num_retained());
    assert!(!restored.is_estimation_mode());
}

#[test]
fn test_serialize_estimation_mode() {
    let mut sketch = ThetaSketch::builder()
        .lg_k(10)
        .resize_factor(theta_sketch::common::ResizeFactor::X8)
        .build()
        .unwrap();
    for i in 0..10_000u64 {
        sketch.update_u64(i);
    }

    assert!(sketch.is_estimation_mode());

    let compact = sketch.compact(true);
    let bytes = compact.serialize();

    let expected_size = 24 + compact.num_retained() * 8;
    assert_eq!(bytes.len(), expected_size);
    assert_eq!(bytes[0], 3, "preamble_longs should be 3 for estimation mode");

    let restored = CompactThetaSketch::deserialize(&bytes).unwrap();
    let diff = (restored.estimate() - compact.estimate()).abs();
    assert!(diff < 1e-9);
    assert_eq!(restored.num_retained(), compact.num_retained());
    assert!(restored.is_estimation_mode());
    assert!(restored.theta() < 1.0);
}

#[test]
fn test_round_trip_various_lg_k() {
    for lg_k in [5u8, 8, 10, 12, 14, 16] {
        let mut sketch = ThetaSketch::builder().lg_k(lg_k).build().unwrap();
        for i in 0..500u64 {
            sketch.update_u64(i);
        }

        let compact = sketch.compact(true);
        let bytes = compact.serialize();
        let restored = CompactThetaSketch::deserialize(&bytes).unwrap();

        assert_eq!(
            restored.estimate(),
            compact.estimate(),
            "estimate mismatch for lg_k={lg_k}"
        );
        assert_eq!(
            restored.num_retained(),
            compact.num_retained(),
            "retained count mismatch for lg_k={lg_k}"
        );
    }
}

#[test]
fn test_deserialize_invalid_data() {
    let result = CompactThetaSketch::deserialize(&[1, 2, 3]);
    assert!(result.is_err());

    let mut bad_family = vec![1u8, 3, 99, 0, 0, 0x1E];
    bad_family.extend_from_slice(&0u16.to_le_bytes());
    let result = CompactThetaSketch::deserialize(&bad_family);
    assert!(result.is_err());
}

#[test]
fn test_serialize_with_custom_seed() {
    let custom_seed = 12345u64;
    let mut sketch = ThetaSketch::builder()
        .lg_k(10)
        .seed(custom_seed)
        .build()
        .unwrap();
    sketch.update_str("test");

    let bytes = sketch.compact(true).serialize();

    let result = CompactThetaSketch::deserialize(&bytes);
    assert!(result.is_err(), "should fail with the default seed");

    let restored = CompactThetaSketch::deserialize_with_seed(&bytes, custom_seed).unwrap();
    assert_eq!(restored.estimate(), sketch.estimate());
}

#[test]
fn test_serialized_entries_are_sorted_when_ordered() {
    let mut sketch = ThetaSketch::builder().lg_k(12).build().unwrap();
    for i in 0..10u64 {
        sketch.update_u64(i);
    }

    let bytes = sketch.compact(true).serialize();

    let data_start = 24;
    let mut entries: Vec<u64> = Vec::new();
    let mut offset = data_start;
    while offset + 8 <= bytes.len() {
        let entry = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
        entries.push(entry);
        offset += 8;
    }

    let mut sorted = entries.clone();
    sorted.sort_unstable();
    assert_eq!(entries, sorted, "serialized entries should be sorted");
}
