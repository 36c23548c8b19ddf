// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Controller error types
//!
//! The engine itself never signals errors. Everything reported here is
//! either a caller precondition the controller refused to break, or a
//! bounded wait that ran out of budget.

use core::fmt;

use crate::phase::Phase;

/// Precondition that a caller tried to break
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Engine was processing a block or preparing a key
    EngineBusy,
    /// No configuration has been written in this session
    NotConfigured,
    /// No key has been loaded in this session
    NoKey,
    /// Key kind does not fit the configured algorithm
    KeyMismatch,
    /// AES ECB/CBC decryption without a completed key preparation pass
    KeyNotPrepared,
    /// Phase moved backward, skipped ahead, or left Final
    PhaseOrder {
        /// Phase the engine was in
        from: Phase,
        /// Phase that was requested
        to: Phase,
    },
    /// Header requested before the engine finished its Init pass
    InitIncomplete,
    /// Enable in the Init phase after the Init pass already ran
    InitRepeated,
    /// FIFOs not drained and engine not disabled
    FifosNotDrained,
    /// Push while the input FIFO was full
    InputFifoFull,
    /// Pop while the output FIFO was empty
    OutputFifoEmpty,
    /// Operation only exists for GCM/CCM
    NotAead,
    /// Mode cannot be run by this operation
    UnsupportedMode,
    /// Buffer, nonce, tag or padding length out of range
    InvalidLength,
    /// A retry budget in the tuning was zero
    InvalidTuning,
}

impl Violation {
    const fn index(&self) -> u16 {
        match self {
            Self::EngineBusy => 0x01,
            Self::NotConfigured => 0x02,
            Self::NoKey => 0x03,
            Self::KeyMismatch => 0x04,
            Self::KeyNotPrepared => 0x05,
            Self::PhaseOrder { .. } => 0x06,
            Self::FifosNotDrained => 0x07,
            Self::InputFifoFull => 0x08,
            Self::OutputFifoEmpty => 0x09,
            Self::NotAead => 0x0A,
            Self::UnsupportedMode => 0x0B,
            Self::InvalidLength => 0x0C,
            Self::InitIncomplete => 0x0D,
            Self::InitRepeated => 0x0E,
            Self::InvalidTuning => 0x0F,
        }
    }

    /// Get violation description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::EngineBusy => "engine busy",
            Self::NotConfigured => "engine not configured",
            Self::NoKey => "no key loaded",
            Self::KeyMismatch => "key does not fit algorithm",
            Self::KeyNotPrepared => "decryption key not prepared",
            Self::PhaseOrder { .. } => "phase out of order",
            Self::FifosNotDrained => "FIFOs not drained",
            Self::InputFifoFull => "input FIFO full",
            Self::OutputFifoEmpty => "output FIFO empty",
            Self::NotAead => "not an authenticated mode",
            Self::UnsupportedMode => "mode not supported by operation",
            Self::InvalidLength => "invalid length",
            Self::InitIncomplete => "init pass not complete",
            Self::InitRepeated => "init pass already ran",
            Self::InvalidTuning => "zero retry budget",
        }
    }
}

/// Controller error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrypError {
    /// Caller precondition violated; no register was written
    Contract(Violation),
    /// Engine did not drain within the save budget; state left untouched
    DrainTimeout,
    /// Bounded wait exhausted outside of a context save
    Timeout,
    /// Authentication tag did not verify
    AuthenticationFailed,
}

impl CrypError {
    /// Get error code
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Contract(v) => 0x0C10 + v.index(),
            Self::DrainTimeout => 0x0C20,
            Self::Timeout => 0x0C21,
            Self::AuthenticationFailed => 0x0C30,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Contract(v) => v.description(),
            Self::DrainTimeout => "engine did not drain",
            Self::Timeout => "timeout",
            Self::AuthenticationFailed => "authentication failed",
        }
    }

    /// Check if the caller may retry the same operation later
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::DrainTimeout)
    }
}

impl From<Violation> for CrypError {
    fn from(v: Violation) -> Self {
        Self::Contract(v)
    }
}

impl fmt::Display for CrypError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contract(Violation::PhaseOrder { from, to }) => write!(
                f,
                "[0x{:04X}] {} ({:?} -> {:?})",
                self.code(),
                self.description(),
                from,
                to
            ),
            _ => write!(f, "[0x{:04X}] {}", self.code(), self.description()),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CrypError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}

impl From<CrypError> for cryp_common::Error {
    fn from(e: CrypError) -> Self {
        match e {
            CrypError::Contract(Violation::PhaseOrder { .. }) => Self::PhaseOrder,
            CrypError::Contract(Violation::NoKey | Violation::KeyMismatch) => Self::InvalidKey,
            CrypError::Contract(Violation::InvalidLength | Violation::InvalidTuning) => {
                Self::InvalidParameter
            }
            CrypError::Contract(Violation::UnsupportedMode) => Self::UnsupportedAlgorithm,
            CrypError::Contract(Violation::EngineBusy) => Self::Busy,
            CrypError::Contract(_) => Self::ContractViolation,
            CrypError::DrainTimeout => Self::ContextSwitchFailed,
            CrypError::Timeout => Self::Timeout,
            CrypError::AuthenticationFailed => Self::AuthenticationFailed,
        }
    }
}

/// Controller result type
pub type CrypResult<T> = Result<T, CrypError>;
