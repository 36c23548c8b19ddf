// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Register-level boundary of the cipher engine
//!
//! The controller never touches memory directly. Every access goes through
//! [`CrypRegisters`], which is implemented by the memory-mapped backend on
//! silicon and by the software engine on a host.

/// Engine register selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    /// Control register
    Cr,
    /// Status register
    Sr,
    /// Data input register
    Din,
    /// Data output register
    Dout,
    /// DMA control register
    Dmacr,
    /// Interrupt mask set/clear register
    Imscr,
    /// Raw interrupt status register
    Risr,
    /// Masked interrupt status register
    Misr,
    /// Key register, `0..8` = K0LR, K0RR, .., K3RR
    Key(u8),
    /// Initialization vector register, `0..4` = IV0LR, IV0RR, IV1LR, IV1RR
    Iv(u8),
    /// GCM/CCM context swap register, `0..8`
    CsGcmCcm(u8),
    /// GCM context swap register, `0..8`
    CsGcm(u8),
}

impl Reg {
    /// Byte offset of the register from the peripheral base
    ///
    /// Indexed registers wrap within their bank.
    #[must_use]
    pub const fn offset(self) -> u32 {
        match self {
            Self::Cr => 0x00,
            Self::Sr => 0x04,
            Self::Din => 0x08,
            Self::Dout => 0x0C,
            Self::Dmacr => 0x10,
            Self::Imscr => 0x14,
            Self::Risr => 0x18,
            Self::Misr => 0x1C,
            Self::Key(i) => 0x20 + 4 * (i as u32 & 0x7),
            Self::Iv(i) => 0x40 + 4 * (i as u32 & 0x3),
            Self::CsGcmCcm(i) => 0x50 + 4 * (i as u32 & 0x7),
            Self::CsGcm(i) => 0x70 + 4 * (i as u32 & 0x7),
        }
    }
}

/// Raw access to the engine's registers
///
/// Implementations must perform each access exactly once and in program
/// order: a status read is a fresh observation of the engine, and a data
/// port access moves one FIFO word.
pub trait CrypRegisters {
    /// Read a register
    fn read(&mut self, reg: Reg) -> u32;

    /// Write a register
    fn write(&mut self, reg: Reg, value: u32);

    /// Read-modify-write a register
    fn modify<F>(&mut self, reg: Reg, f: F)
    where
        F: FnOnce(u32) -> u32,
        Self: Sized,
    {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// Set bits in a register
    fn set_bits(&mut self, reg: Reg, bits: u32)
    where
        Self: Sized,
    {
        self.modify(reg, |v| v | bits);
    }

    /// Clear bits in a register
    fn clear_bits(&mut self, reg: Reg, bits: u32)
    where
        Self: Sized,
    {
        self.modify(reg, |v| v & !bits);
    }
}

impl<T: CrypRegisters> CrypRegisters for &mut T {
    fn read(&mut self, reg: Reg) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Reg, value: u32) {
        (**self).write(reg, value);
    }
}
