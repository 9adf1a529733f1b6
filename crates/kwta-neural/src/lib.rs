// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # KWTA Neural Math (Platform-Agnostic)
//!
//! Pure per-cycle update rules for pooled inhibitory control:
//! - **Spike variant**: dual-timescale fast (PV+-like) / slow (SST+-like)
//!   inhibition driven by aggregated spike counts.
//! - **Rate variant**: average/max-conductance driven FFFB controller with
//!   adaptive gain and slow background inhibition.
//!
//! Both variants produce a robust, graded k-winners-take-all dynamic:
//! roughly k out of N neurons stay active without any global normalizer.
//!
//! All code here is pure, deterministic, and allocation-free. The
//! concurrency-safe accumulation that feeds these rules lives in
//! `kwta-engine`.
//!
//! ## Target Platforms
//! - Desktop (Linux, macOS, Windows)
//! - Embedded / RTOS
//! - GPU compute (the math maps 1:1 onto shader lanes)

#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod avgmax;
pub mod error;
pub mod rate;
pub mod spike;

pub use avgmax::AvgMax;
pub use error::{ConfigError, Result};
pub use rate::{AdaptParams, BgParams, RateParams, RateState};
pub use spike::{SpikeParams, SpikeState};
