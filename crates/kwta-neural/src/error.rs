// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Configuration validation errors.
//!
//! The per-cycle math never fails; only parameter loading can. A zero or
//! negative time constant would derive an infinite integration rate, so it
//! must be rejected here, before `update()` runs, never at cycle time.

/// Result type for parameter validation
pub type Result<T> = core::result::Result<T, ConfigError>;

/// Errors raised when validating inhibition parameters
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("time constant {name} must be positive, got {value}")]
    NonPositiveTau { name: &'static str, value: f32 },

    #[error("gain {name} must be non-negative, got {value}")]
    NegativeGain { name: &'static str, value: f32 },

    #[error("adapt target activity must be positive, got {value}")]
    NonPositiveTarget { value: f32 },

    #[error("adapt interval must be at least 1 trial")]
    ZeroInterval,
}

pub(crate) fn check_tau(name: &'static str, value: f32) -> Result<()> {
    if value <= 0.0 {
        return Err(ConfigError::NonPositiveTau { name, value });
    }
    Ok(())
}

pub(crate) fn check_gain(name: &'static str, value: f32) -> Result<()> {
    if value < 0.0 {
        return Err(ConfigError::NegativeGain { name, value });
    }
    Ok(())
}
