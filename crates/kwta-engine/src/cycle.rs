// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! The per-cycle scatter/reduce pipeline.
//!
//! Accumulate in parallel, reduce serially: neuron contributions are
//! deposited concurrently via integer atomics, the end of the parallel
//! phase is the barrier, and one serial pass per pool converts, normalizes,
//! and runs the filter math. Given identical contributions, the reduced
//! `gi` is bit-identical for any thread count and any arrival order.
//!
//! The rate variant predates the atomic protocol and is reduced from a
//! serial fold over the contributions (its avg/max statistics are cheap and
//! its callers are single-threaded).

use rayon::prelude::*;
use tracing::debug;

use crate::pool::{Pool, PoolVariant};

/// One neuron's per-cycle contribution to its pool's statistics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Contribution {
    /// Did this neuron spike this cycle
    pub spike: bool,
    /// Feedforward excitatory conductance contribution (>= 0)
    pub ge_raw: f32,
    /// External/clamp conductance (>= 0)
    pub ge_ext: f32,
    /// Rate-coded activation in [0, 1]; consumed by rate pools only
    pub act: f32,
}

impl Contribution {
    pub fn new(spike: bool, ge_raw: f32, ge_ext: f32) -> Self {
        Self {
            spike,
            ge_raw,
            ge_ext,
            act: 0.0,
        }
    }

    /// Attach a rate-coded activation for rate-variant pools
    pub fn with_act(mut self, act: f32) -> Self {
        self.act = act;
        self
    }
}

/// Errors raised by the cycle driver
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("contribution count {got} does not match pool size {expected}")]
    SizeMismatch { got: usize, expected: usize },
}

/// Run one full cycle for one pool: parallel accumulate, barrier, serial
/// reduce and filter derivation. After this returns, [`Pool::gi`] is the
/// conductance every pool member applies in its next membrane sub-step.
pub fn run_cycle(pool: &mut Pool, inputs: &[Contribution]) -> Result<(), EngineError> {
    if inputs.len() != pool.nneurons() as usize {
        return Err(EngineError::SizeMismatch {
            got: inputs.len(),
            expected: pool.nneurons() as usize,
        });
    }
    accumulate(pool, inputs);
    reduce(pool);
    Ok(())
}

/// Parallel accumulate phase. The rayon scope end is the cycle barrier: all
/// deposits for this cycle complete before this function returns.
fn accumulate(pool: &mut Pool, inputs: &[Contribution]) {
    let nn = pool.nneurons();
    match &mut pool.variant {
        PoolVariant::Spike { inhib, .. } => {
            let inhib = &*inhib;
            inputs
                .par_iter()
                .for_each(|c| inhib.raw_incr_atomic(c.spike, c.ge_raw, c.ge_ext, nn));
        }
        PoolVariant::Rate { state, .. } => {
            state.ge.init();
            state.act.init();
            for c in inputs {
                state.ge.update(c.ge_raw);
                state.act.update(c.act);
            }
        }
    }
}

/// Serial reduce phase: convert and normalize raw statistics, then derive
/// this cycle's inhibitory conductance. Runs exactly once per pool per
/// cycle, strictly after `accumulate`.
fn reduce(pool: &mut Pool) {
    let nn = pool.nneurons();
    let gi_mult = pool.gi_mult;
    match &mut pool.variant {
        PoolVariant::Spike { params, inhib } => {
            inhib.int_to_raw();
            inhib.spikes_from_raw(nn);
            params.inhib(&mut inhib.state, gi_mult);
        }
        PoolVariant::Rate { cfg, state } => {
            state.ge.calc_avg();
            state.act.calc_avg();
            cfg.fffb.inhib(state, gi_mult);
            cfg.bg.bg_update(&mut state.gi_bg, state.gi);
        }
    }
}

/// A layer with both a layer-wide inhibitory scope and per-sub-pool scopes.
///
/// Every neuron contributes to its sub-pool and to the layer scope; after
/// reduction the stronger scope wins via max combination in both
/// directions, never summed.
#[derive(Debug)]
pub struct Layer {
    /// Layer-wide scope covering all neurons
    pub layer: Pool,
    /// Per-sub-pool scopes, partitioning the layer contiguously
    pub pools: Vec<Pool>,
    offsets: Vec<usize>,
}

impl Layer {
    /// Build a layer from contiguous sub-pool sizes. The layer scope and
    /// every sub-pool run the same variant configuration.
    pub fn new(kind: crate::pool::InhibKind, pool_sizes: &[u32]) -> Self {
        assert!(!pool_sizes.is_empty(), "a layer needs at least one pool");
        let total: u32 = pool_sizes.iter().sum();
        let mut offsets = Vec::with_capacity(pool_sizes.len() + 1);
        let mut off = 0usize;
        offsets.push(0);
        for &sz in pool_sizes {
            off += sz as usize;
            offsets.push(off);
        }
        Self {
            layer: Pool::new(total, kind),
            pools: pool_sizes.iter().map(|&sz| Pool::new(sz, kind)).collect(),
            offsets,
        }
    }

    /// Total neurons across all sub-pools
    pub fn nneurons(&self) -> u32 {
        self.layer.nneurons()
    }

    /// Run one cycle for the whole layer: accumulate and reduce each scope,
    /// then cross-combine layer and sub-pool inhibition by max.
    pub fn run_cycle(&mut self, inputs: &[Contribution]) -> Result<(), EngineError> {
        if inputs.len() != self.nneurons() as usize {
            return Err(EngineError::SizeMismatch {
                got: inputs.len(),
                expected: self.nneurons() as usize,
            });
        }
        accumulate(&mut self.layer, inputs);
        for (i, pool) in self.pools.iter_mut().enumerate() {
            accumulate(pool, &inputs[self.offsets[i]..self.offsets[i + 1]]);
        }

        reduce(&mut self.layer);
        for pool in &mut self.pools {
            reduce(pool);
        }

        // the stronger scope always wins: the layer absorbs the max of its
        // sub-pools first, then every sub-pool imports the settled layer
        // value, so no scope ends below any other
        let pool_max = self.pools.iter().map(Pool::gi).fold(0.0f32, f32::max);
        self.layer.pool_max(pool_max);
        let lay_gi = self.layer.gi();
        for pool in &mut self.pools {
            pool.layer_max(lay_gi);
        }
        debug!(lay_gi, "layer cycle reduced");
        Ok(())
    }

    /// Trial-boundary decay across every scope
    pub fn decay(&mut self, decay: f32) {
        self.layer.decay(decay);
        for pool in &mut self.pools {
            pool.decay(decay);
        }
    }
}
