// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Pool construction and per-trial lifecycle.
//!
//! The inhibition variant is a tagged enum resolved once at pool build
//! time, so the per-cycle hot path never re-dispatches on an `On` flag.

use kwta_neural::{AdaptParams, BgParams, RateParams, RateState, SpikeParams};

use crate::inhib::PoolInhib;

/// Rate-variant configuration bundle: the FFFB controller plus its slow
/// background inhibition channel.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RateConfig {
    pub fffb: RateParams,
    pub bg: BgParams,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            fffb: RateParams::default(),
            bg: BgParams::default(),
        }
    }
}

impl RateConfig {
    /// Refresh all derived rates after any tau change
    pub fn update(&mut self) {
        self.fffb.update();
        self.bg.update();
    }

    pub fn validate(&self) -> kwta_neural::Result<()> {
        self.fffb.validate()?;
        self.bg.validate()
    }
}

/// Which inhibition variant a pool runs, chosen at build time
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum InhibKind {
    /// Average/max-conductance driven FFFB controller
    Rate(RateConfig),
    /// Spike-count driven fast/slow controller
    Spike(SpikeParams),
}

/// Variant-specific parameters and state, paired so an invalid combination
/// cannot be constructed
#[derive(Debug)]
pub enum PoolVariant {
    Rate {
        cfg: RateConfig,
        state: RateState,
    },
    Spike {
        params: SpikeParams,
        inhib: PoolInhib,
    },
}

/// One inhibitory scope: a sub-region of a layer, or a whole layer.
///
/// Owns its inhibition state exclusively; the pool size is fixed at
/// construction and every normalized statistic is a per-neuron average
/// over it.
#[derive(Debug)]
pub struct Pool {
    nneurons: u32,
    pub variant: PoolVariant,
    /// Slow adaptive gain multiplier applied to the overall inhibition gain
    pub gi_mult: f32,
    /// Adaptive gain schedule (off by default)
    pub adapt: AdaptParams,
    trials_since_adapt: u32,
}

impl Pool {
    /// Build a pool of `nneurons` members running the given variant
    pub fn new(nneurons: u32, kind: InhibKind) -> Self {
        assert!(nneurons > 0, "a pool must have at least one neuron");
        let variant = match kind {
            InhibKind::Rate(cfg) => PoolVariant::Rate {
                cfg,
                state: RateState::new(),
            },
            InhibKind::Spike(params) => PoolVariant::Spike {
                params,
                inhib: PoolInhib::new(),
            },
        };
        Self {
            nneurons,
            variant,
            gi_mult: 1.0,
            adapt: AdaptParams::default(),
            trials_since_adapt: 0,
        }
    }

    /// Enable adaptive gain with the given schedule
    pub fn with_adapt(mut self, adapt: AdaptParams) -> Self {
        self.adapt = adapt;
        self
    }

    pub fn nneurons(&self) -> u32 {
        self.nneurons
    }

    /// Overall inhibitory conductance from the last reduction. For rate
    /// pools this includes the slow background floor, which rides on top of
    /// the per-cycle value and outlives partial trial-boundary decay.
    pub fn gi(&self) -> f32 {
        match &self.variant {
            PoolVariant::Rate { state, .. } => state.gi + state.gi_bg,
            PoolVariant::Spike { inhib, .. } => inhib.state.gi,
        }
    }

    /// Mark this pool hard-clamped (externally driven) for subsequent cycles
    pub fn set_clamped(&mut self, clamped: bool) {
        if let PoolVariant::Spike { inhib, .. } = &mut self.variant {
            inhib.state.clamped = clamped;
        }
    }

    /// Zero all state, once at network build time
    pub fn init(&mut self) {
        match &mut self.variant {
            PoolVariant::Rate { state, .. } => state.init(),
            PoolVariant::Spike { inhib, .. } => inhib.init(),
        }
        self.gi_mult = 1.0;
        self.trials_since_adapt = 0;
    }

    /// Trial-boundary decay by the given proportion (1.0 = full reset)
    pub fn decay(&mut self, decay: f32) {
        match &mut self.variant {
            PoolVariant::Rate { state, .. } => state.decay(decay),
            PoolVariant::Spike { inhib, .. } => inhib.decay(decay),
        }
    }

    /// Pool-level max combination with an imported layer-level `gi`
    pub fn layer_max(&mut self, lay_gi: f32) {
        match &mut self.variant {
            PoolVariant::Rate { state, .. } => state.layer_max(lay_gi),
            PoolVariant::Spike { inhib, .. } => inhib.state.layer_max(lay_gi),
        }
    }

    /// Layer-level max combination absorbing a sub-pool's `gi`
    pub fn pool_max(&mut self, pool_gi: f32) {
        match &mut self.variant {
            PoolVariant::Rate { state, .. } => state.pool_max(pool_gi),
            PoolVariant::Spike { inhib, .. } => inhib.state.pool_max(pool_gi),
        }
    }

    /// Per-trial adaptive gain update, rate-limited to the configured
    /// interval. `avg_act` is the trial-level average activity observed in
    /// the pool. Returns whether the gain was adjusted.
    pub fn adapt_gi(&mut self, avg_act: f32) -> bool {
        if !self.adapt.on {
            return false;
        }
        self.trials_since_adapt += 1;
        if self.trials_since_adapt < self.adapt.interval {
            return false;
        }
        self.trials_since_adapt = 0;
        self.adapt.adapt(&mut self.gi_mult, avg_act)
    }
}
