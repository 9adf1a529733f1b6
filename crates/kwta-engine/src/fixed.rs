// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Fixed-point int32 codec for order-independent accumulation.
//!
//! Floating-point atomic add has no portable, order-independent guarantee
//! across CPU and GPU backends, so per-neuron float contributions are
//! converted to fixed-point int32 and accumulated with integer atomic add,
//! which is commutative and associative. The single-threaded reduction step
//! converts back after the cycle barrier.
//!
//! Scale policy: 24 fractional bits. Contributions are divided by pool size
//! up front, keeping post-normalization magnitudes in the expected 0-1
//! range, which leaves 7 bits of integer headroom (sums up to ~128) before
//! the accumulator wraps. Callers must keep per-neuron `ge_raw`/`ge_ext`
//! within that range; a wrapped (negative) accumulator is clamped, not
//! propagated.

use tracing::warn;

/// Fractional bits in the fixed-point representation
pub const FRAC_BITS: u32 = 24;

/// Multiplier from float to fixed-point int32
pub const FLOAT_TO_INT_FACTOR: f32 = (1u32 << FRAC_BITS) as f32;

/// Multiplier from fixed-point int32 back to float (1 / factor, so the
/// reduction multiplies instead of dividing)
pub const FLOAT_FROM_INT_FACTOR: f32 = 1.0 / FLOAT_TO_INT_FACTOR;

/// Convert one per-neuron contribution to fixed point, pre-dividing by pool
/// size so the accumulated sum lands in the per-neuron-average range
#[inline]
pub fn float_to_int(val: f32, nneurons: u32) -> i32 {
    ((val / nneurons as f32) * FLOAT_TO_INT_FACTOR) as i32
}

/// Convert an accumulated fixed-point value back to float.
///
/// A negative value means the atomic counter wrapped during accumulation.
/// That is a recoverable condition: log it and clamp to 1.0 so a transient
/// inhibition spike replaces a corrupted negative conductance, and the
/// enclosing simulation keeps running.
#[inline]
pub fn float_from_int(ival: i32, field: &'static str) -> f32 {
    if ival < 0 {
        warn!(
            field,
            ival, "fixed-point accumulator overflowed; clamping to 1.0"
        );
        return 1.0;
    }
    ival as f32 * FLOAT_FROM_INT_FACTOR
}
