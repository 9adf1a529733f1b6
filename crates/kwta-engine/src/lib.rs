// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # KWTA Engine
//!
//! Concurrency-safe pooled inhibition: many neuron updates deposit spike
//! and conductance contributions into their pool's accumulator, one
//! reduction per pool per cycle turns them into an inhibitory conductance.
//!
//! ## Determinism Contract
//! Contributions are converted to fixed-point int32 and accumulated with
//! integer atomic add. Integer addition is commutative and associative, so
//! the reduced result is bit-identical regardless of thread/lane count or
//! arrival order. Floating-point atomics are never used: they have no
//! portable order-independence guarantee across CPU and GPU backends.
//!
//! ## Pipeline
//! Every cycle: parallel accumulate -> barrier -> serial reduce -> filter
//! derivation -> `gi` broadcast. No operation blocks on another pool; the
//! barrier between accumulate and reduce is the only synchronization.

pub mod cycle;
pub mod fixed;
pub mod inhib;
pub mod pool;

pub use cycle::{run_cycle, Contribution, EngineError, Layer};
pub use fixed::{float_from_int, float_to_int, FRAC_BITS};
pub use inhib::PoolInhib;
pub use pool::{InhibKind, Pool, PoolVariant, RateConfig};
