// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! CRYP register bit definitions
//!
//! Field layout of the control, status, interrupt and DMA registers.
//! Typed views of the status, interrupt and DMA words are provided as
//! `bitflags` so callers never handle raw masks.

use bitflags::bitflags;

// CR bit definitions
/// Algorithm direction: 0=encrypt, 1=decrypt
pub const CR_ALGODIR: u32 = 1 << 2;
/// Algorithm mode bits [5:3]
pub const CR_ALGOMODE_MASK: u32 = 0x7 << 3;
/// TDES ECB
pub const CR_ALGOMODE_TDES_ECB: u32 = 0x0 << 3;
/// TDES CBC
pub const CR_ALGOMODE_TDES_CBC: u32 = 0x1 << 3;
/// DES ECB
pub const CR_ALGOMODE_DES_ECB: u32 = 0x2 << 3;
/// DES CBC
pub const CR_ALGOMODE_DES_CBC: u32 = 0x3 << 3;
/// AES ECB
pub const CR_ALGOMODE_AES_ECB: u32 = 0x4 << 3;
/// AES CBC
pub const CR_ALGOMODE_AES_CBC: u32 = 0x5 << 3;
/// AES CTR
pub const CR_ALGOMODE_AES_CTR: u32 = 0x6 << 3;
/// AES key preparation for ECB/CBC decryption
pub const CR_ALGOMODE_AES_KEY: u32 = 0x7 << 3;
/// AES GCM (with `CR_ALGOMODE3` set)
pub const CR_ALGOMODE_AES_GCM: u32 = 0x0 << 3;
/// AES CCM (with `CR_ALGOMODE3` set)
pub const CR_ALGOMODE_AES_CCM: u32 = 0x1 << 3;
/// Data type bits [7:6]
pub const CR_DATATYPE_MASK: u32 = 0x3 << 6;
/// 32-bit data, no swap
pub const CR_DATATYPE_32B: u32 = 0x0 << 6;
/// 16-bit data, half-word swap
pub const CR_DATATYPE_16B: u32 = 0x1 << 6;
/// 8-bit data, byte swap
pub const CR_DATATYPE_8B: u32 = 0x2 << 6;
/// 1-bit data, bit swap
pub const CR_DATATYPE_1B: u32 = 0x3 << 6;
/// Key size bits [9:8]
pub const CR_KEYSIZE_MASK: u32 = 0x3 << 8;
/// 128-bit AES key
pub const CR_KEYSIZE_128: u32 = 0x0 << 8;
/// 192-bit AES key
pub const CR_KEYSIZE_192: u32 = 0x1 << 8;
/// 256-bit AES key
pub const CR_KEYSIZE_256: u32 = 0x2 << 8;
/// FIFO flush (self-clearing)
pub const CR_FFLUSH: u32 = 1 << 14;
/// Crypto processor enable
pub const CR_CRYPEN: u32 = 1 << 15;
/// GCM/CCM phase bits [17:16]
pub const CR_GCM_CCMPH_MASK: u32 = 0x3 << 16;
/// GCM/CCM phase shift
pub const CR_GCM_CCMPH_SHIFT: u32 = 16;
/// Algorithm mode bit 3 (GCM/CCM)
pub const CR_ALGOMODE3: u32 = 1 << 19;
/// Number of padding bytes in the last payload block, bits [23:20]
pub const CR_NPBLB_MASK: u32 = 0xF << 20;
/// NPBLB shift
pub const CR_NPBLB_SHIFT: u32 = 20;

/// Every CR bit that [`crate::EngineConfig`] owns
pub const CR_CONFIG_MASK: u32 =
    CR_ALGODIR | CR_ALGOMODE_MASK | CR_ALGOMODE3 | CR_DATATYPE_MASK | CR_KEYSIZE_MASK;

/// CR bits captured by a context snapshot
pub const CR_CONTEXT_MASK: u32 = CR_CONFIG_MASK | CR_GCM_CCMPH_MASK | CR_NPBLB_MASK;

bitflags! {
    /// Status register (SR) flags
    ///
    /// Always read fresh from hardware; never cached.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u32 {
        /// Input FIFO empty
        const IN_EMPTY = 1 << 0;
        /// Input FIFO not full
        const IN_NOT_FULL = 1 << 1;
        /// Output FIFO not empty
        const OUT_NOT_EMPTY = 1 << 2;
        /// Output FIFO full
        const OUT_FULL = 1 << 3;
        /// Engine is processing a block or preparing a key
        const BUSY = 1 << 4;
    }
}

bitflags! {
    /// Interrupt sources (IMSCR, RISR and MISR share this layout)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Interrupts: u32 {
        /// Input FIFO needs service
        const INPUT = 1 << 0;
        /// Output FIFO needs service
        const OUTPUT = 1 << 1;
    }
}

bitflags! {
    /// DMA request enables (DMACR)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DmaRequests: u32 {
        /// Input FIFO fed by DMA
        const INPUT = 1 << 0;
        /// Output FIFO drained by DMA
        const OUTPUT = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_mask_excludes_control_bits() {
        assert_eq!(CR_CONTEXT_MASK & CR_CRYPEN, 0);
        assert_eq!(CR_CONTEXT_MASK & CR_FFLUSH, 0);
        assert_ne!(CR_CONTEXT_MASK & CR_GCM_CCMPH_MASK, 0);
    }

    #[test]
    fn test_status_truncates_reserved_bits() {
        let sr = Status::from_bits_truncate(0xFFFF_FFE3);
        assert_eq!(sr, Status::IN_EMPTY | Status::IN_NOT_FULL);
    }
}
