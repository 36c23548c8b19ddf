// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Error types shared across the cipher engine stack
//!
//! This module defines the aggregate error type that subsystem errors
//! convert into. All errors are `no_std` compatible, `Copy`, and carry a
//! stable 16-bit code so they can be reported over narrow channels.

use core::fmt;

/// Result type alias for operations returning the aggregate error
pub type Result<T> = core::result::Result<T, Error>;

/// Aggregate error type
///
/// Codes are grouped by category in the high byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Cryptographic Errors (0x01xx)
    // =========================================================================
    /// Key material does not fit the selected algorithm
    InvalidKey,
    /// Algorithm/mode combination not supported by the engine
    UnsupportedAlgorithm,
    /// Authentication tag did not verify
    AuthenticationFailed,

    // =========================================================================
    // Engine Control Errors (0x0Cxx)
    // =========================================================================
    /// Caller broke an engine precondition
    ContractViolation,
    /// Phase sequencing was driven out of order
    PhaseOrder,
    /// Context could not be captured because the engine did not drain
    ContextSwitchFailed,

    // =========================================================================
    // General Errors (0xFFxx)
    // =========================================================================
    /// Invalid parameter
    InvalidParameter,
    /// Bounded wait exhausted its budget
    Timeout,
    /// Resource busy
    Busy,
}

impl Error {
    /// Get the numeric error code
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InvalidKey => 0x0101,
            Self::UnsupportedAlgorithm => 0x0102,
            Self::AuthenticationFailed => 0x0104,

            Self::ContractViolation => 0x0C01,
            Self::PhaseOrder => 0x0C02,
            Self::ContextSwitchFailed => 0x0C03,

            Self::InvalidParameter => 0xFF02,
            Self::Timeout => 0xFF03,
            Self::Busy => 0xFF04,
        }
    }

    /// Get the error category (high byte of the code)
    #[must_use]
    pub const fn category(&self) -> u8 {
        (self.code() >> 8) as u8
    }

    /// Check if this error means cryptographic output must not be trusted
    #[must_use]
    pub const fn is_security_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidKey
                | Self::AuthenticationFailed
                | Self::ContractViolation
                | Self::PhaseOrder
        )
    }

    /// Check if the operation may simply be retried later
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::ContextSwitchFailed | Self::Busy | Self::Timeout)
    }

    /// Get a short description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidKey => "invalid cryptographic key",
            Self::UnsupportedAlgorithm => "unsupported algorithm",
            Self::AuthenticationFailed => "authentication failed",
            Self::ContractViolation => "engine contract violation",
            Self::PhaseOrder => "phase out of order",
            Self::ContextSwitchFailed => "context switch failed",
            Self::InvalidParameter => "invalid parameter",
            Self::Timeout => "timeout",
            Self::Busy => "busy",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
