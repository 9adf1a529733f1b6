// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Order Independence Tests
//!
//! The same multiset of contributions, deposited in any permutation and
//! from any number of threads, must reduce to bit-identical statistics.
//! This is the property the integer fixed-point protocol exists for.

use kwta_engine::{run_cycle, Contribution, InhibKind, Pool, PoolInhib, PoolVariant};
use kwta_neural::SpikeParams;

fn contributions(n: usize) -> Vec<Contribution> {
    (0..n)
        .map(|i| {
            Contribution::new(
                i % 7 == 0,
                0.05 + 0.003 * (i % 13) as f32,
                if i % 11 == 0 { 0.08 } else { 0.0 },
            )
        })
        .collect()
}

/// Accumulate one cycle's worth of contributions serially in the given
/// order and return the reduced (ffs, fbs, ge_exts) bit patterns.
fn reduce_bits(inputs: &[Contribution], nn: u32) -> (u32, u32, u32) {
    let mut inh = PoolInhib::new();
    inh.init();
    for c in inputs {
        inh.raw_incr_atomic(c.spike, c.ge_raw, c.ge_ext, nn);
    }
    inh.int_to_raw();
    inh.spikes_from_raw(nn);
    (
        inh.state.ffs.to_bits(),
        inh.state.fbs.to_bits(),
        inh.state.ge_exts.to_bits(),
    )
}

#[test]
fn test_permutations_reduce_identically() {
    let n = 256;
    let base = contributions(n);
    let expected = reduce_bits(&base, n as u32);

    let mut reversed = base.clone();
    reversed.reverse();
    assert_eq!(reduce_bits(&reversed, n as u32), expected);

    let mut rotated = base.clone();
    rotated.rotate_left(97);
    assert_eq!(reduce_bits(&rotated, n as u32), expected);

    // stride interleave: a permutation a naive float sum would not survive
    let strided: Vec<_> = (0..n).map(|i| base[(i * 17) % n]).collect();
    assert_eq!(reduce_bits(&strided, n as u32), expected);
}

#[test]
fn test_thread_counts_reduce_identically() {
    let n = 512;
    let inputs = contributions(n);

    let mut results = Vec::new();
    for threads in [1usize, 2, 4, 8] {
        let rayon_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap();
        let gi_bits = rayon_pool.install(|| {
            let mut pool = Pool::new(n as u32, InhibKind::Spike(SpikeParams::default()));
            pool.init();
            // run several cycles so filter state also depends on the inputs
            for _ in 0..10 {
                run_cycle(&mut pool, &inputs).unwrap();
            }
            pool.gi().to_bits()
        });
        results.push((threads, gi_bits));
    }
    let (_, first) = results[0];
    for (threads, bits) in results {
        assert_eq!(bits, first, "gi diverged at {} threads", threads);
    }
}

#[test]
fn test_parallel_matches_serial_accumulation() {
    let n = 300;
    let inputs = contributions(n);
    let expected = reduce_bits(&inputs, n as u32);

    let mut pool = Pool::new(n as u32, InhibKind::Spike(SpikeParams::default()));
    pool.init();
    run_cycle(&mut pool, &inputs).unwrap();
    let (ffs, fbs, ge) = match &pool.variant {
        PoolVariant::Spike { inhib, .. } => (
            inhib.state.ffs.to_bits(),
            inhib.state.fbs.to_bits(),
            inhib.state.ge_exts.to_bits(),
        ),
        _ => unreachable!(),
    };
    assert_eq!((ffs, fbs, ge), expected);
}
