// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
use delta_core::{
    DeltaWidth, DeltaWord, DispatchMode, EngineConfig, LoadPolicy, MergeStrategy,
    ParallelAccumulator,
};
use delta_dry_tests::{reference_fold, ALTERNATING_A, ALTERNATING_5, SCENARIO_B_DELTAS};

fn engine(n: usize, mode: DispatchMode) -> ParallelAccumulator {
    ParallelAccumulator::new(DeltaWidth::W64, n, mode).expect("engine")
}

#[test]
fn scenario_a_round_robin_one_through_four() {
    let mut e = engine(4, DispatchMode::RoundRobin);
    let initial = DeltaWord::from(0x0123_4567_89AB_CDEFu64);
    e.load_initial(initial);
    for d in [1u64, 2, 3, 4] {
        e.accumulate(DeltaWord::from(d));
    }
    assert_eq!(e.merge(), DeltaWord::from(4u64));
    assert_eq!(e.read(), initial ^ DeltaWord::from(4u64));
}

#[test]
fn scenario_b_wide_parallel_single_step() {
    let mut e = engine(4, DispatchMode::WideParallel);
    let lanes = SCENARIO_B_DELTAS.map(DeltaWord::from);
    e.accumulate_parallel(&lanes, &[true; 4]).expect("lanes");
    assert_eq!(e.merge(), reference_fold(&lanes));
    assert_eq!(e.stats().wide_steps, 1);
}

#[test]
fn alternating_pattern_twice_is_zero() {
    let mut e = engine(4, DispatchMode::RoundRobin);
    let initial = DeltaWord::from(ALTERNATING_5);
    e.load_initial(initial);
    e.accumulate(DeltaWord::from(ALTERNATING_A));
    assert!(!e.is_zero());
    e.accumulate(DeltaWord::from(ALTERNATING_A));
    assert!(e.is_zero());
    assert_eq!(e.read(), e.initial_state());
}

#[test]
fn zero_delta_is_identity() {
    let mut e = engine(2, DispatchMode::RoundRobin);
    e.load_initial(DeltaWord::from(0xDEADu64));
    e.accumulate(DeltaWord::from(0xBEEFu64));
    let before = e.read();
    e.accumulate(DeltaWord::ZERO);
    assert_eq!(e.read(), before);
}

#[test]
fn load_never_touches_banks_under_default_policy() {
    let mut e = engine(4, DispatchMode::RoundRobin);
    for d in [0x10u64, 0x20, 0x40] {
        e.accumulate(DeltaWord::from(d));
    }
    let banks = e.bank_values();
    e.load_initial(DeltaWord::from(u64::MAX));
    e.load_initial(DeltaWord::from(7u64));
    assert_eq!(e.bank_values(), banks);
    assert_eq!(e.initial_state(), DeltaWord::from(7u64));
}

#[test]
fn engines_are_independent() {
    let mut a = engine(2, DispatchMode::RoundRobin);
    let b = engine(2, DispatchMode::RoundRobin);
    a.accumulate(DeltaWord::from(1u64));
    assert!(!a.is_zero());
    assert!(b.is_zero());
}

#[test]
fn merge_strategy_does_not_change_results() {
    let deltas: Vec<DeltaWord> = (1..=37u64).map(|i| DeltaWord::from(i * 0x1111)).collect();
    let mut results = Vec::new();
    for merge in [MergeStrategy::Sequential, MergeStrategy::Tree] {
        for banks in [1, 2, 3, 4, 8] {
            let cfg = EngineConfig {
                banks,
                merge,
                ..EngineConfig::default()
            };
            let mut e = cfg.build().expect("engine");
            e.submit(&deltas).expect("submit");
            results.push(e.merge());
        }
    }
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(results[0], reference_fold(&deltas));
}

#[test]
fn clear_banks_policy_matches_simulator_semantics() {
    let cfg = EngineConfig {
        load_policy: LoadPolicy::ClearBanks,
        ..EngineConfig::default()
    };
    let mut e = cfg.build().expect("engine");
    e.accumulate(DeltaWord::from(0xFFu64));
    e.load_initial(DeltaWord::from(0x100u64));
    assert!(e.is_zero());
    assert_eq!(e.read(), DeltaWord::from(0x100u64));
}

#[test]
fn wide_width_engine_round_trips_128_bit_words() {
    let width = DeltaWidth::new(128).expect("width");
    let mut e = ParallelAccumulator::new(width, 2, DispatchMode::RoundRobin).expect("engine");
    let big = DeltaWord(0xFFEE_DDCC_BBAA_9988_7766_5544_3322_1100);
    e.accumulate(big);
    assert_eq!(e.read(), big);
    assert_eq!(width.to_be_bytes(e.read()).len(), 16);
}
