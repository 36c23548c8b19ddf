// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Tuning parameters for the engine controller
//!
//! The controller has no timer, so every wait is bounded by a retry count
//! rather than wall-clock time. These budgets are fixed at build time.

use crate::log::LogLevel;

/// Retry budgets and log verbosity for one controller instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTuning {
    /// Polls allowed while waiting for the engine to drain before a context save
    pub drain_budget: u32,
    /// Polls allowed for the decryption key-preparation pass
    pub key_prep_budget: u32,
    /// Polls allowed per word while waiting on a FIFO flow predicate
    pub fifo_budget: u32,
    /// Minimum level recorded by the controller's event log
    pub log_level: LogLevel,
}

impl EngineTuning {
    /// Production defaults
    pub const DEFAULT: Self = Self {
        drain_budget: 0xFFFF,
        key_prep_budget: 0xFFFF,
        fifo_budget: 0x1_0000,
        log_level: LogLevel::Info,
    };

    /// Development defaults: tighter budgets and verbose logging
    pub const DEVELOPMENT: Self = Self {
        drain_budget: 0x0400,
        key_prep_budget: 0x0400,
        fifo_budget: 0x0400,
        log_level: LogLevel::Debug,
    };

    /// Replace the drain budget
    #[must_use]
    pub const fn with_drain_budget(mut self, budget: u32) -> Self {
        self.drain_budget = budget;
        self
    }

    /// Replace the log level
    #[must_use]
    pub const fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Check that every budget allows at least one poll
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.drain_budget > 0 && self.key_prep_budget > 0 && self.fifo_budget > 0
    }
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self::DEFAULT
    }
}
