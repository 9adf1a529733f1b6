// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Rate-coded FFFB pooled inhibition.
//!
//! First-order controller driven by average/max excitatory conductance
//! (feedforward) and average activation (feedback), with a leaky-integrated
//! feedback term to prevent oscillation. Companion mechanisms:
//! - [`AdaptParams`]: slow re-tuning of the overall gain multiplier toward a
//!   target average activity, checked every `interval` trials.
//! - [`BgParams`]: slow low-pass of the computed inhibition added back as a
//!   constant floor, decoupled from per-cycle reset.

use crate::avgmax::AvgMax;
use crate::error::{check_gain, check_tau, ConfigError, Result};

/// Parameters for rate-coded feedforward/feedback inhibition.
///
/// Call [`update`](RateParams::update) after mutating `fb_tau`; treat as
/// read-only once configured.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RateParams {
    /// Enable this level of inhibition
    pub on: bool,

    /// Overall inhibition gain (typical 0.8-1.5); scales both the
    /// feedforward and feedback factors uniformly
    pub gi: f32,

    /// Feedforward weight, multiplying the thresholded average Ge.
    /// Anticipates upcoming excitation.
    pub ff: f32,

    /// Feedback weight, multiplying average activation. Reacts to current
    /// activity like a thermostat.
    pub fb: f32,

    /// Time constant (cycles) for integrating the feedback term;
    /// prevents oscillation under rapidly changing input
    pub fb_tau: f32,

    /// Proportion of max vs. average Ge in the feedforward drive:
    /// 0 = all average, 1 = all max
    pub max_vs_avg: f32,

    /// Feedforward zero point: below this average Ge no feedforward
    /// inhibition is computed, and it is subtracted above
    pub ff0: f32,

    /// Extra feedforward gain applied once the drive exceeds `ff_ex0`,
    /// producing a nonlinear "popout" response
    pub ff_ex: f32,

    /// Threshold at which the extra feedforward term starts
    pub ff_ex0: f32,

    /// Rate = 1 / fb_tau
    #[cfg_attr(feature = "serde", serde(skip))]
    pub fb_dt: f32,
}

impl Default for RateParams {
    fn default() -> Self {
        let mut p = Self {
            on: true,
            gi: 1.1,
            ff: 1.0,
            fb: 1.0,
            fb_tau: 1.4,
            max_vs_avg: 0.0,
            ff0: 0.1,
            ff_ex: 0.0,
            ff_ex0: 0.18,
            fb_dt: 0.0,
        };
        p.update();
        p
    }
}

impl RateParams {
    /// Recompute derived rates; required after any `fb_tau` change
    pub fn update(&mut self) {
        self.fb_dt = 1.0 / self.fb_tau;
    }

    /// Validate configuration before `update` derives rates
    pub fn validate(&self) -> Result<()> {
        check_tau("fb_tau", self.fb_tau)?;
        check_gain("gi", self.gi)?;
        check_gain("ff", self.ff)?;
        check_gain("fb", self.fb)?;
        Ok(())
    }

    /// Feedforward inhibition from average and max Ge in the pool.
    ///
    /// Blends `avg_ge` toward `max_ge` by `max_vs_avg`, thresholds at `ff0`,
    /// and adds the extra convexity term above `ff_ex0`.
    #[inline]
    pub fn ff_inhib(&self, avg_ge: f32, max_ge: f32) -> f32 {
        let ff_netin = avg_ge + self.max_vs_avg * (max_ge - avg_ge);
        let mut ffi = 0.0;
        if ff_netin > self.ff0 {
            ffi = self.ff * (ff_netin - self.ff0);
            if ff_netin > self.ff_ex0 {
                ffi += self.ff_ex * (ff_netin - self.ff_ex0);
            }
        }
        ffi
    }

    /// Feedback inhibition as a pure proportional function of average
    /// activation
    #[inline]
    pub fn fb_inhib(&self, avg_act: f32) -> f32 {
        self.fb * avg_act
    }

    /// Leaky integration of the feedback term at rate `1/fb_tau`
    #[inline]
    pub fn fb_update(&self, fbi: &mut f32, new_fbi: f32) {
        *fbi += self.fb_dt * (new_fbi - *fbi);
    }

    /// Full per-cycle inhibition update for one pool's rate state.
    ///
    /// Requires `ge` and `act` statistics finalized (`calc_avg`) for this
    /// cycle. `gi_mult` is supplied by the adapt mechanism (1.0 unadapted).
    pub fn inhib(&self, st: &mut RateState, gi_mult: f32) {
        if !self.on {
            st.zero();
            return;
        }
        let ffi = self.ff_inhib(st.ge.avg, st.ge.max);
        let fbi = self.fb_inhib(st.act.avg);

        st.ffi = ffi;
        self.fb_update(&mut st.fbi, fbi);

        st.gi = gi_mult * self.gi * (ffi + st.fbi);
        st.gi_orig = st.gi;
    }
}

/// Slow adaptation of the inhibitory gain multiplier toward a target
/// average activity, evaluated once every `interval` trials.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdaptParams {
    /// Enable adaptive gain
    pub on: bool,

    /// Target average activity for the pool
    pub targ: f32,

    /// Tolerance below target, as a proportion of target, before adapting
    pub lo_tol: f32,

    /// Tolerance above target, as a proportion of target, before adapting
    pub hi_tol: f32,

    /// Trials between adaptation checks
    pub interval: u32,

    /// Time constant, in interval periods, for the gain update rate
    pub tau: f32,

    /// Rate = 1 / tau
    #[cfg_attr(feature = "serde", serde(skip))]
    pub dt: f32,
}

impl Default for AdaptParams {
    fn default() -> Self {
        let mut p = Self {
            on: false,
            targ: 0.1,
            lo_tol: 0.5,
            hi_tol: 0.1,
            interval: 100,
            tau: 200.0,
            dt: 0.0,
        };
        p.update();
        p
    }
}

impl AdaptParams {
    pub fn update(&mut self) {
        self.dt = 1.0 / self.tau;
    }

    pub fn validate(&self) -> Result<()> {
        check_tau("adapt tau", self.tau)?;
        if self.targ <= 0.0 {
            return Err(ConfigError::NonPositiveTarget { value: self.targ });
        }
        if self.interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }

    /// Nudge `gi_mult` when observed activity leaves the tolerance band
    /// around the target. Returns whether an adjustment was made.
    pub fn adapt(&self, gi_mult: &mut f32, act: f32) -> bool {
        let del = (act - self.targ) / self.targ;
        if del < -self.lo_tol || del > self.hi_tol {
            *gi_mult += self.dt * del;
            return true;
        }
        false
    }
}

/// Slow background inhibition: a low-pass of the computed `gi` scaled by
/// `gi_frac`, applied as a constant floor. Survives partial trial-boundary
/// decay; only a full reset clears it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BgParams {
    /// Enable background inhibition
    pub on: bool,

    /// Fraction of the computed inhibition fed into the background level
    pub gi_frac: f32,

    /// Time constant (cycles) of the low-pass
    pub tau: f32,

    /// Rate = 1 / tau
    #[cfg_attr(feature = "serde", serde(skip))]
    pub dt: f32,
}

impl Default for BgParams {
    fn default() -> Self {
        let mut p = Self {
            on: false,
            gi_frac: 0.5,
            tau: 10.0,
            dt: 0.0,
        };
        p.update();
        p
    }
}

impl BgParams {
    pub fn update(&mut self) {
        self.dt = 1.0 / self.tau;
    }

    pub fn validate(&self) -> Result<()> {
        check_tau("bg tau", self.tau)?;
        check_gain("bg gi_frac", self.gi_frac)?;
        Ok(())
    }

    /// Low-pass the background level toward `gi * gi_frac`
    #[inline]
    pub fn bg_update(&self, gi_bg: &mut f32, gi: f32) {
        if self.on {
            *gi_bg += self.dt * (gi * self.gi_frac - *gi_bg);
        }
    }
}

/// Per-pool rate-inhibition state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateState {
    /// Computed feedforward inhibition
    pub ffi: f32,
    /// Time-integrated feedback inhibition
    pub fbi: f32,
    /// Overall inhibitory conductance for the pool
    pub gi: f32,
    /// Snapshot of `gi` before pool/layer combination
    pub gi_orig: f32,
    /// Layer-level inhibition imported for max combination
    pub lay_gi: f32,
    /// Slow background inhibition floor
    pub gi_bg: f32,
    /// Average and max excitatory conductance driving feedforward inhibition
    pub ge: AvgMax,
    /// Average and max activation driving feedback inhibition
    pub act: AvgMax,
}

impl RateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero everything, once at network build time
    pub fn init(&mut self) {
        *self = Self::default();
    }

    /// Clear computed inhibition without touching the Ge/Act statistics
    pub fn zero(&mut self) {
        self.ffi = 0.0;
        self.fbi = 0.0;
        self.gi = 0.0;
        self.gi_orig = 0.0;
        self.lay_gi = 0.0;
        self.gi_bg = 0.0;
    }

    /// Pool-level `gi` becomes the max of itself and the layer-level value
    #[inline]
    pub fn layer_max(&mut self, lay_gi: f32) {
        self.lay_gi = lay_gi;
        self.gi = self.gi.max(lay_gi);
    }

    /// Layer-level `gi` absorbs the max of its sub-pools
    #[inline]
    pub fn pool_max(&mut self, pool_gi: f32) {
        self.gi = self.gi.max(pool_gi);
    }

    /// Reduce state by the given proportion at a trial boundary.
    /// Background inhibition stays on through partial decay and clears only
    /// on a full reset.
    pub fn decay(&mut self, decay: f32) {
        self.ge.decay(decay);
        self.act.decay(decay);
        self.ffi -= decay * self.ffi;
        self.fbi -= decay * self.fbi;
        self.gi -= decay * self.gi;
        if decay == 1.0 {
            self.gi_bg = 0.0;
        }
    }
}
