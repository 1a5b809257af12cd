// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Property tests for the three codecs: Elias-Fano lists, partitioned
//! Elias-Fano lists, and frequency-rank codeword tables. Random inputs
//! are decoded element by element and cross-checked against the source
//! sequence, including the pair and search entry points.

use proptest::prelude::*;

use trigrams::{elias_fano, freqs, partitioned};

fn sorted_values() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..2_000_000, 1..400).prop_map(|mut v| {
        v.sort_unstable();
        v
    })
}

proptest! {
    #[test]
    fn elias_fano_round_trip(values in sorted_values(), quantum in prop_oneof![Just(4u32), Just(16), Just(128)]) {
        let buf = elias_fano::encode(&values, quantum);
        prop_assert_eq!(elias_fano::len(&buf), values.len() as u64);
        for (i, &v) in values.iter().enumerate() {
            prop_assert_eq!(elias_fano::lookup(&buf, quantum, i as u64), v);
        }
    }

    #[test]
    fn elias_fano_pair_matches_lookup(values in sorted_values(), quantum in prop_oneof![Just(4u32), Just(64)]) {
        let buf = elias_fano::encode(&values, quantum);
        for i in 0..values.len().saturating_sub(1) {
            let (a, b) = elias_fano::lookup_pair(&buf, quantum, i as u64);
            prop_assert_eq!(a, values[i]);
            prop_assert_eq!(b, values[i + 1]);
        }
    }

    #[test]
    fn elias_fano_search_finds_members(values in sorted_values()) {
        let quantum = 16u32;
        let buf = elias_fano::encode(&values, quantum);
        let n = values.len() as u64;
        for &v in values.iter() {
            let ix = elias_fano::search(&buf, quantum, 0, n, v);
            prop_assert!(ix.is_some());
            prop_assert_eq!(elias_fano::lookup(&buf, quantum, ix.unwrap()), v);
        }
        // A value past the maximum can never be present.
        let absent = values.last().unwrap() + 1;
        prop_assert_eq!(elias_fano::search(&buf, quantum, 0, n, absent), None);
    }

    #[test]
    fn elias_fano_search_prefix_resolves_relative_targets(values in sorted_values()) {
        let quantum = 16u32;
        let buf = elias_fano::encode(&values, quantum);
        let n = values.len();
        // Pick an interior range and search for each member relative to
        // the element before the range.
        let lo = n / 3;
        let hi = n;
        let base = if lo > 0 { values[lo - 1] } else { 0 };
        for i in lo..hi {
            let found = elias_fano::search_prefix(
                &buf,
                quantum,
                lo as u64,
                hi as u64,
                values[i] - base,
            );
            prop_assert!(found.is_some());
            prop_assert_eq!(values[found.unwrap() as usize], values[i]);
        }
    }

    #[test]
    fn partitioned_round_trip(values in sorted_values()) {
        let (oq, iq) = (16u32, 8u32);
        let buf = partitioned::encode(&values, oq, iq);
        for (i, &v) in values.iter().enumerate() {
            prop_assert_eq!(partitioned::lookup(&buf, oq, iq, i as u64), v);
        }
        for i in 0..values.len().saturating_sub(1) {
            let (a, b) = partitioned::lookup_pair(&buf, oq, iq, i as u64);
            prop_assert_eq!(a, values[i]);
            prop_assert_eq!(b, values[i + 1]);
        }
    }

    #[test]
    fn partitioned_search_finds_members(values in sorted_values()) {
        let (oq, iq) = (16u32, 8u32);
        let buf = partitioned::encode(&values, oq, iq);
        let n = values.len() as u64;
        for &v in values.iter() {
            let ix = partitioned::search(&buf, oq, iq, 0, n, v);
            prop_assert!(ix.is_some());
            prop_assert_eq!(partitioned::lookup(&buf, oq, iq, ix.unwrap()), v);
        }
        prop_assert_eq!(
            partitioned::search(&buf, oq, iq, 0, n, values.last().unwrap() + 1),
            None
        );
    }

    #[test]
    fn freq_ranks_round_trip(
        ranks in prop::collection::vec(0u16..48, 1..600),
        quantum in prop_oneof![Just(8u32), Just(32), Just(1024)],
    ) {
        let buf = freqs::encode(&ranks, quantum);
        for (i, &r) in ranks.iter().enumerate() {
            prop_assert_eq!(freqs::lookup_rank(&buf, quantum, i as u64), r);
        }
    }
}

#[test]
fn elias_fano_monotone_pairs_hold_everywhere() {
    // Deterministic check of the monotonicity invariant over a list that
    // mixes dense runs, plateaus, and jumps.
    let mut values: Vec<u64> = Vec::new();
    for i in 0..600u64 {
        values.push(match i % 3 {
            0 => i,
            1 => i * 500,
            _ => i * 500 + (i % 7),
        });
    }
    values.sort_unstable();
    let quantum = 16u32;
    let buf = elias_fano::encode(&values, quantum);
    for i in 0..values.len() - 1 {
        let a = elias_fano::lookup(&buf, quantum, i as u64);
        let b = elias_fano::lookup(&buf, quantum, (i + 1) as u64);
        assert!(a <= b, "monotonicity violated at {i}");
        assert_eq!(elias_fano::lookup_pair(&buf, quantum, i as u64), (a, b));
    }
}
