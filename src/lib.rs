// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # KWTA - Pooled k-Winners-Take-All Inhibition
//!
//! Per-pool inhibitory conductance control for simulated spiking networks.
//! Every simulated millisecond (one "cycle"), locally aggregated feedforward
//! drive and feedback spiking are reduced into one inhibitory conductance
//! that keeps roughly k out of N neurons active, with no global normalizer.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! kwta = "0.1"
//! ```
//!
//! ```rust
//! use kwta::prelude::*;
//!
//! // Build a 100-neuron pool with spike-driven (fast/slow) inhibition
//! let mut pool = Pool::new(100, InhibKind::Spike(SpikeParams::default()));
//!
//! // One cycle: every neuron deposits its contribution, then one reduction
//! let inputs: Vec<Contribution> = (0..100)
//!     .map(|i| Contribution::new(i % 10 == 0, 0.2, 0.0))
//!     .collect();
//! run_cycle(&mut pool, &inputs).unwrap();
//!
//! let gi = pool.gi(); // inhibitory conductance, same for every pool member
//! assert!(gi >= 0.0);
//! ```
//!
//! ## Crates
//!
//! - [`kwta_neural`]: platform-agnostic filter math (rate and spike variants,
//!   adaptive gain, background inhibition). `no_std`-compatible.
//! - [`kwta_engine`]: per-pool state, atomic fixed-point accumulation, the
//!   scatter/reduce cycle pipeline, layer/pool scope combination.

pub use kwta_engine;
pub use kwta_neural;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use kwta_engine::{
        run_cycle, Contribution, InhibKind, Layer, Pool, PoolInhib,
    };
    pub use kwta_neural::{
        AdaptParams, AvgMax, BgParams, RateParams, RateState, SpikeParams, SpikeState,
    };
}
