// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Per-pool inhibition state with concurrency-safe raw accumulation.
//!
//! Each cycle is a strict 4-stage pipeline:
//! 1. `init_raw` - zero the raw accumulators (single caller, cycle start)
//! 2. `raw_incr_atomic` - every neuron update deposits its contribution
//!    (many concurrent callers; the three atomic counters are the only
//!    concurrently-mutated memory in the engine)
//! 3. `int_to_raw` + `spikes_from_raw` - single caller after the barrier,
//!    converting and normalizing into the filter inputs
//! 4. filter derivation reads the normalized values and writes `gi`
//!
//! Violating the ordering yields stale or partial statistics, not a crash;
//! debug builds assert the init/reduce handshake.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use kwta_neural::SpikeState;

use crate::fixed::{float_from_int, float_to_int};

/// Spike-pool inhibition state plus raw accumulators.
///
/// Exclusively owned by its pool. During the accumulate phase, concurrent
/// writers touch only the int32 accumulators via atomic add; every other
/// field is written by exactly one serial pass per cycle.
#[derive(Debug)]
pub struct PoolInhib {
    /// Filter state and derived conductances
    pub state: SpikeState,

    /// Raw feedforward spike drive, summed then normalized by pool size
    pub ffs_raw: f32,
    /// Raw feedback spike count
    pub fbs_raw: f32,
    /// Raw external clamp conductance, summed then normalized by pool size
    pub ge_ext_raw: f32,

    // int32 fixed-point twins, the atomic-add accumulation targets
    ffs_raw_int: AtomicI32,
    fbs_raw_int: AtomicI32,
    ge_ext_raw_int: AtomicI32,

    // barrier-discipline handshake, asserted in debug builds only
    accumulating: AtomicBool,
}

impl Default for PoolInhib {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolInhib {
    /// A zeroed pool, armed for its first accumulate phase: contributions
    /// may be deposited immediately, with no separate init call
    pub fn new() -> Self {
        Self {
            state: SpikeState::default(),
            ffs_raw: 0.0,
            fbs_raw: 0.0,
            ge_ext_raw: 0.0,
            ffs_raw_int: AtomicI32::new(0),
            fbs_raw_int: AtomicI32::new(0),
            ge_ext_raw_int: AtomicI32::new(0),
            accumulating: AtomicBool::new(true),
        }
    }

    /// Zero everything, once at network build time
    pub fn init(&mut self) {
        self.state.init();
        self.init_raw();
    }

    /// Zero the raw accumulators. Called once per cycle before any neuron
    /// contributes.
    pub fn init_raw(&mut self) {
        self.ffs_raw = 0.0;
        self.fbs_raw = 0.0;
        self.ge_ext_raw = 0.0;
        self.ffs_raw_int.store(0, Ordering::Relaxed);
        self.fbs_raw_int.store(0, Ordering::Relaxed);
        self.ge_ext_raw_int.store(0, Ordering::Relaxed);
        self.accumulating.store(true, Ordering::Relaxed);
    }

    /// Deposit one neuron's contribution via integer atomic add.
    ///
    /// Safe for any number of concurrent callers; the result after the
    /// cycle barrier is bit-identical regardless of call order or thread
    /// count. Spike counts accumulate directly as integers.
    #[inline]
    pub fn raw_incr_atomic(&self, spike: bool, ge_raw: f32, ge_ext: f32, nneurons: u32) {
        debug_assert!(
            self.accumulating.load(Ordering::Relaxed),
            "raw_incr before init_raw for this cycle"
        );
        self.ffs_raw_int
            .fetch_add(float_to_int(ge_raw, nneurons), Ordering::Relaxed);
        if spike {
            self.fbs_raw_int.fetch_add(1, Ordering::Relaxed);
        }
        if ge_ext > 0.0 {
            self.ge_ext_raw_int
                .fetch_add(float_to_int(ge_ext, nneurons), Ordering::Relaxed);
        }
    }

    /// Serial float-path twin of `raw_incr_atomic`, for single-threaded
    /// callers. Produces the same normalized statistics up to fixed-point
    /// quantization.
    #[inline]
    pub fn raw_incr(&mut self, spike: bool, ge_raw: f32, ge_ext: f32, nneurons: u32) {
        let nn = nneurons as f32;
        self.ffs_raw += ge_raw / nn;
        if spike {
            self.fbs_raw += 1.0;
        }
        self.ge_ext_raw += ge_ext / nn;
    }

    /// Convert the atomic int accumulators into the float raw fields.
    ///
    /// Single caller, strictly after the cycle's accumulate barrier and
    /// strictly before `spikes_from_raw`. A wrapped counter is logged and
    /// clamped by the codec rather than propagated.
    pub fn int_to_raw(&mut self) {
        self.ffs_raw = float_from_int(self.ffs_raw_int.load(Ordering::Relaxed), "ffs_raw");
        self.ge_ext_raw = float_from_int(self.ge_ext_raw_int.load(Ordering::Relaxed), "ge_ext_raw");
        // spike counts are plain integers, no fixed-point scaling
        self.fbs_raw = self.fbs_raw_int.load(Ordering::Relaxed) as f32;
    }

    /// Normalize raw values into the filter inputs and re-zero the raw
    /// accumulators for the next cycle. The single reduction point; must
    /// not run concurrently with accumulation.
    pub fn spikes_from_raw(&mut self, nneurons: u32) {
        debug_assert!(nneurons > 0, "pool size must be set before reduction");
        debug_assert!(
            self.accumulating.load(Ordering::Relaxed),
            "spikes_from_raw without a preceding init_raw"
        );
        self.state.fbs = self.fbs_raw / nneurons as f32;
        // feedforward and external drive were pre-divided by pool size
        self.state.ffs = self.ffs_raw;
        self.state.ge_exts = self.ge_ext_raw;
        self.init_raw();
    }

    /// Trial-boundary decay, delegated to the filter state
    pub fn decay(&mut self, decay: f32) {
        self.state.decay(decay);
    }

    /// Overall inhibitory conductance for the current cycle
    #[inline]
    pub fn gi(&self) -> f32 {
        self.state.gi
    }
}
