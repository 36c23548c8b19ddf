// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Controller for a shared symmetric cipher engine
//!
//! Drives a hardware block that runs DES, TDES and AES (ECB, CBC, CTR, GCM,
//! CCM) through word-wide input and output FIFOs. The controller owns the
//! engine exclusively and checks every precondition the hardware leaves to
//! software:
//!
//! - **Lifecycle**: configuration, key/IV loading, enable, busy tracking
//!   and the AES decryption key preparation pass (`cryp`)
//! - **FIFO flow**: word push/pop, flow predicates, DMA toggles and
//!   interrupt forwarding (`fifo`)
//! - **Phases**: the strictly forward GCM/CCM phase sequence (`phase`)
//! - **Preemption**: draining save and keyed restore of a session
//!   (`context`)
//!
//! # Backends
//!
//! All register traffic goes through [`CrypRegisters`]:
//!
//! - `sim` (default): [`sim::SimEngine`], a software model for host testing
//! - `stm32`: `stm32::Mmio`, volatile access to the CRYP register block
//!
//! # Security
//!
//! - Keys are never read back from the engine and never logged
//! - Key material, IVs and context snapshots are zeroized on drop
//! - Tags are compared in constant time

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(test)]
extern crate std;

pub mod traits;
pub mod regs;
pub mod error;
pub mod config;
pub mod key;
pub mod phase;
pub mod wait;
pub mod cryp;
pub mod fifo;
pub mod context;
pub mod ops;

#[cfg(feature = "sim")]
pub mod sim;

#[cfg(feature = "stm32")]
pub mod stm32;

pub use config::{AesMode, Algorithm, Chaining, DataType, Direction, EngineConfig, KeySize};
pub use context::{ContextSnapshot, RestoreError};
pub use cryp::Cryp;
pub use error::{CrypError, CrypResult, Violation};
pub use fifo::CrypEvent;
pub use key::{IvMaterial, KeyKind, KeyMaterial};
pub use phase::Phase;
pub use regs::{DmaRequests, Interrupts, Status};
pub use traits::{CrypRegisters, Reg};

/// Register backend compiled into this build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Memory-mapped STM32 CRYP block
    Mmio,
    /// Software engine model
    Sim,
    /// Caller-provided [`CrypRegisters`] implementation only
    External,
}

impl Backend {
    /// Get the backend selected by crate features
    ///
    /// Hardware takes precedence when both backends are enabled.
    #[must_use]
    pub const fn current() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(feature = "stm32")] {
                Self::Mmio
            } else if #[cfg(feature = "sim")] {
                Self::Sim
            } else {
                Self::External
            }
        }
    }

    /// Check if register accesses reach real hardware
    #[must_use]
    pub const fn is_hardware(&self) -> bool {
        matches!(self, Self::Mmio)
    }
}
