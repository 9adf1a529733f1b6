// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Running average and max statistics over one pool, one cycle.
//!
//! Feeds the rate-coded controller: average/max Ge drives feedforward
//! inhibition, average activation drives feedback inhibition.

/// Incremental average and max over a set of values.
///
/// `update` once per value, then `calc_avg` exactly once before reading
/// `avg`. `max` is valid at any point during accumulation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AvgMax {
    /// Computed average, valid after `calc_avg`
    pub avg: f32,
    /// Maximum value seen since `init`
    pub max: f32,
    sum: f32,
    n: u32,
}

impl AvgMax {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all statistics to zero
    pub fn init(&mut self) {
        *self = Self::default();
    }

    /// Fold one value into the running statistics
    #[inline]
    pub fn update(&mut self, val: f32) {
        self.sum += val;
        self.n += 1;
        if val > self.max {
            self.max = val;
        }
    }

    /// Finalize the average from the accumulated sum and count
    #[inline]
    pub fn calc_avg(&mut self) {
        if self.n > 0 {
            self.avg = self.sum / self.n as f32;
        } else {
            self.avg = 0.0;
        }
    }

    /// Number of values folded in since `init`
    pub fn count(&self) -> u32 {
        self.n
    }

    /// Reduce avg and max by the given proportion (trial-boundary decay)
    pub fn decay(&mut self, decay: f32) {
        self.avg -= decay * self.avg;
        self.max -= decay * self.max;
    }
}
