// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Memory-mapped register backend for STM32 CRYP
//!
//! Every access is a volatile 32-bit load or store at `base + offset`.
//! Peripheral clocking and reset are the caller's job; the block must be
//! clocked before [`Mmio`] is handed to [`crate::Cryp::new`].

use core::ptr::{read_volatile, write_volatile};

use crate::traits::{CrypRegisters, Reg};

/// CRYP base address on STM32F4 (AHB2)
pub const STM32F4_CRYP_BASE: u32 = 0x5006_0000;

/// CRYP base address on STM32H7 (AHB2)
pub const STM32H7_CRYP_BASE: u32 = 0x4802_1000;

/// CRYP register block at a fixed address
#[derive(Debug)]
pub struct Mmio {
    base: u32,
}

impl Mmio {
    /// Bind to the register block at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the address of a clocked CRYP register block, and no
    /// other `Mmio` (or any other code) may access that block while this
    /// one is alive.
    #[must_use]
    pub const unsafe fn new(base: u32) -> Self {
        Self { base }
    }

    /// Base address of the register block
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    const fn addr(&self, reg: Reg) -> u32 {
        self.base + reg.offset()
    }
}

impl CrypRegisters for Mmio {
    #[inline]
    fn read(&mut self, reg: Reg) -> u32 {
        // SAFETY: `Mmio::new` requires `base` to be a live CRYP block owned by
        // this handle, and `Reg::offset` only yields offsets inside it.
        unsafe { read_volatile(self.addr(reg) as *const u32) }
    }

    #[inline]
    fn write(&mut self, reg: Reg, value: u32) {
        // SAFETY: as for `read`.
        unsafe { write_volatile(self.addr(reg) as *mut u32, value) }
    }
}
