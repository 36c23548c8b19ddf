// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Engine configuration model
//!
//! Algorithm, chaining mode, key size, data width and direction are
//! expressed as enums so that combinations the engine cannot run are not
//! representable. [`EngineConfig::control_bits`] and
//! [`EngineConfig::from_control`] are the only places where these types
//! meet the raw control-register encoding.

use crate::regs::{
    CR_ALGODIR, CR_ALGOMODE3, CR_ALGOMODE_AES_CBC, CR_ALGOMODE_AES_CCM, CR_ALGOMODE_AES_CTR,
    CR_ALGOMODE_AES_ECB, CR_ALGOMODE_AES_GCM, CR_ALGOMODE_AES_KEY, CR_ALGOMODE_DES_CBC,
    CR_ALGOMODE_DES_ECB, CR_ALGOMODE_MASK, CR_ALGOMODE_TDES_CBC, CR_ALGOMODE_TDES_ECB,
    CR_DATATYPE_16B, CR_DATATYPE_1B, CR_DATATYPE_32B, CR_DATATYPE_8B, CR_DATATYPE_MASK,
    CR_KEYSIZE_128, CR_KEYSIZE_192, CR_KEYSIZE_256, CR_KEYSIZE_MASK,
};
use cryp_common::constants::{AES_BLOCK_WORDS, DES_BLOCK_WORDS};

/// AES key size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySize {
    /// 128-bit key (16 bytes)
    Aes128,
    /// 192-bit key (24 bytes)
    Aes192,
    /// 256-bit key (32 bytes)
    Aes256,
}

impl KeySize {
    /// Get key size in bytes
    #[must_use]
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    /// Get register value for CR register
    #[must_use]
    pub const fn to_cr_bits(&self) -> u32 {
        match self {
            Self::Aes128 => CR_KEYSIZE_128,
            Self::Aes192 => CR_KEYSIZE_192,
            Self::Aes256 => CR_KEYSIZE_256,
        }
    }

    /// Decode the KEYSIZE field
    #[must_use]
    pub const fn from_cr_bits(cr: u32) -> Option<Self> {
        match cr & CR_KEYSIZE_MASK {
            CR_KEYSIZE_128 => Some(Self::Aes128),
            CR_KEYSIZE_192 => Some(Self::Aes192),
            CR_KEYSIZE_256 => Some(Self::Aes256),
            _ => None,
        }
    }
}

/// Chaining mode of the DES family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chaining {
    /// Electronic Codebook mode
    Ecb,
    /// Cipher Block Chaining mode
    Cbc,
}

/// AES operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AesMode {
    /// Electronic Codebook mode
    Ecb,
    /// Cipher Block Chaining mode
    Cbc,
    /// Counter mode
    Ctr,
    /// Galois/Counter Mode (authenticated encryption)
    Gcm,
    /// Counter with CBC-MAC (authenticated encryption)
    Ccm,
    /// Decryption key schedule preparation for ECB/CBC
    KeyPrep,
}

/// Algorithm family, mode and (for AES) key size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Single DES
    Des(Chaining),
    /// Triple DES (EDE, three keys)
    Tdes(Chaining),
    /// AES
    Aes(AesMode, KeySize),
}

impl Algorithm {
    /// Check if this is an authenticated mode driven through phases
    #[must_use]
    pub const fn is_aead(&self) -> bool {
        matches!(self, Self::Aes(AesMode::Gcm | AesMode::Ccm, _))
    }

    /// Check if mode uses the IV registers
    #[must_use]
    pub const fn requires_iv(&self) -> bool {
        match self {
            Self::Des(c) | Self::Tdes(c) => matches!(c, Chaining::Cbc),
            Self::Aes(mode, _) => !matches!(mode, AesMode::Ecb | AesMode::KeyPrep),
        }
    }

    /// Block size in 32-bit words
    #[must_use]
    pub const fn block_words(&self) -> usize {
        match self {
            Self::Des(_) | Self::Tdes(_) => DES_BLOCK_WORDS,
            Self::Aes(..) => AES_BLOCK_WORDS,
        }
    }

    /// Block size in bytes
    #[must_use]
    pub const fn block_bytes(&self) -> usize {
        self.block_words() * 4
    }

    /// AES key size, if this is an AES mode
    #[must_use]
    pub const fn key_size(&self) -> Option<KeySize> {
        match self {
            Self::Aes(_, size) => Some(*size),
            _ => None,
        }
    }

    /// Get register value for CR register (ALGOMODE and KEYSIZE fields)
    #[must_use]
    pub const fn to_cr_bits(&self) -> u32 {
        match self {
            Self::Tdes(Chaining::Ecb) => CR_ALGOMODE_TDES_ECB,
            Self::Tdes(Chaining::Cbc) => CR_ALGOMODE_TDES_CBC,
            Self::Des(Chaining::Ecb) => CR_ALGOMODE_DES_ECB,
            Self::Des(Chaining::Cbc) => CR_ALGOMODE_DES_CBC,
            Self::Aes(mode, size) => {
                let mode = match mode {
                    AesMode::Ecb => CR_ALGOMODE_AES_ECB,
                    AesMode::Cbc => CR_ALGOMODE_AES_CBC,
                    AesMode::Ctr => CR_ALGOMODE_AES_CTR,
                    AesMode::KeyPrep => CR_ALGOMODE_AES_KEY,
                    AesMode::Gcm => CR_ALGOMODE_AES_GCM | CR_ALGOMODE3,
                    AesMode::Ccm => CR_ALGOMODE_AES_CCM | CR_ALGOMODE3,
                };
                mode | size.to_cr_bits()
            }
        }
    }

    /// Decode the ALGOMODE and KEYSIZE fields
    ///
    /// KEYSIZE is ignored for the DES family. Returns `None` for encodings
    /// the engine does not define.
    #[must_use]
    pub const fn from_cr_bits(cr: u32) -> Option<Self> {
        let mode = cr & CR_ALGOMODE_MASK;
        if cr & CR_ALGOMODE3 != 0 {
            let Some(size) = KeySize::from_cr_bits(cr) else {
                return None;
            };
            return match mode {
                CR_ALGOMODE_AES_GCM => Some(Self::Aes(AesMode::Gcm, size)),
                CR_ALGOMODE_AES_CCM => Some(Self::Aes(AesMode::Ccm, size)),
                _ => None,
            };
        }
        match mode {
            CR_ALGOMODE_TDES_ECB => Some(Self::Tdes(Chaining::Ecb)),
            CR_ALGOMODE_TDES_CBC => Some(Self::Tdes(Chaining::Cbc)),
            CR_ALGOMODE_DES_ECB => Some(Self::Des(Chaining::Ecb)),
            CR_ALGOMODE_DES_CBC => Some(Self::Des(Chaining::Cbc)),
            _ => {
                let Some(size) = KeySize::from_cr_bits(cr) else {
                    return None;
                };
                let aes = match mode {
                    CR_ALGOMODE_AES_ECB => AesMode::Ecb,
                    CR_ALGOMODE_AES_CBC => AesMode::Cbc,
                    CR_ALGOMODE_AES_CTR => AesMode::Ctr,
                    _ => AesMode::KeyPrep,
                };
                Some(Self::Aes(aes, size))
            }
        }
    }
}

/// Data element width, which selects the swap applied to each FIFO word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit words, no swap
    Bits32,
    /// 16-bit half-words, half-word swap
    Bits16,
    /// Bytes, byte swap
    Bits8,
    /// Bit string, bit swap
    Bits1,
}

impl DataType {
    /// Get register value for CR register
    #[must_use]
    pub const fn to_cr_bits(&self) -> u32 {
        match self {
            Self::Bits32 => CR_DATATYPE_32B,
            Self::Bits16 => CR_DATATYPE_16B,
            Self::Bits8 => CR_DATATYPE_8B,
            Self::Bits1 => CR_DATATYPE_1B,
        }
    }

    /// Decode the DATATYPE field
    #[must_use]
    pub const fn from_cr_bits(cr: u32) -> Self {
        match cr & CR_DATATYPE_MASK {
            CR_DATATYPE_32B => Self::Bits32,
            CR_DATATYPE_16B => Self::Bits16,
            CR_DATATYPE_8B => Self::Bits8,
            _ => Self::Bits1,
        }
    }

    /// Swap applied between a FIFO word and the engine's internal word
    ///
    /// The swap is its own inverse.
    #[must_use]
    pub const fn swap(&self, word: u32) -> u32 {
        match self {
            Self::Bits32 => word,
            Self::Bits16 => word.rotate_left(16),
            Self::Bits8 => word.swap_bytes(),
            Self::Bits1 => word.reverse_bits(),
        }
    }

    /// Pack four message bytes into the FIFO word the engine expects
    #[must_use]
    pub const fn pack(&self, bytes: [u8; 4]) -> u32 {
        self.swap(u32::from_be_bytes(bytes))
    }

    /// Unpack a FIFO word back into four message bytes
    #[must_use]
    pub const fn unpack(&self, word: u32) -> [u8; 4] {
        self.swap(word).to_be_bytes()
    }
}

/// Cipher direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Encryption
    Encrypt,
    /// Decryption
    Decrypt,
}

/// Complete engine configuration
///
/// Key size lives inside [`Algorithm::Aes`], so a key size can only be
/// given where it means something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineConfig {
    /// Algorithm, mode and key size
    pub algorithm: Algorithm,
    /// Data element width
    pub data_type: DataType,
    /// Encrypt or decrypt
    pub direction: Direction,
}

impl EngineConfig {
    /// Reset configuration: TDES-ECB, 32-bit data, encrypt
    pub const DEFAULT: Self = Self {
        algorithm: Algorithm::Tdes(Chaining::Ecb),
        data_type: DataType::Bits32,
        direction: Direction::Encrypt,
    };

    /// Create a configuration
    #[must_use]
    pub const fn new(algorithm: Algorithm, data_type: DataType, direction: Direction) -> Self {
        Self {
            algorithm,
            data_type,
            direction,
        }
    }

    /// Configuration for the key preparation pass of the given key size
    #[must_use]
    pub const fn key_prep(size: KeySize, data_type: DataType) -> Self {
        Self::new(Algorithm::Aes(AesMode::KeyPrep, size), data_type, Direction::Decrypt)
    }

    /// Check if this is an authenticated mode
    #[must_use]
    pub const fn is_aead(&self) -> bool {
        self.algorithm.is_aead()
    }

    /// Check if this is the key preparation pass
    #[must_use]
    pub const fn is_key_prep(&self) -> bool {
        matches!(self.algorithm, Algorithm::Aes(AesMode::KeyPrep, _))
    }

    /// Check if a key preparation pass must precede this configuration
    ///
    /// Only AES ECB and CBC decryption need the inverse key schedule.
    #[must_use]
    pub const fn requires_key_prep(&self) -> bool {
        matches!(self.direction, Direction::Decrypt)
            && matches!(self.algorithm, Algorithm::Aes(AesMode::Ecb | AesMode::Cbc, _))
    }

    /// Encode into the CR configuration fields
    ///
    /// Phase, enable and flush bits are left clear.
    #[must_use]
    pub const fn control_bits(&self) -> u32 {
        let dir = match self.direction {
            Direction::Encrypt => 0,
            Direction::Decrypt => CR_ALGODIR,
        };
        self.algorithm.to_cr_bits() | self.data_type.to_cr_bits() | dir
    }

    /// Decode the CR configuration fields
    #[must_use]
    pub const fn from_control(cr: u32) -> Option<Self> {
        let Some(algorithm) = Algorithm::from_cr_bits(cr) else {
            return None;
        };
        let direction = if cr & CR_ALGODIR == 0 {
            Direction::Encrypt
        } else {
            Direction::Decrypt
        };
        Some(Self::new(algorithm, DataType::from_cr_bits(cr), direction))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ALGORITHMS: [Algorithm; 10] = [
        Algorithm::Des(Chaining::Ecb),
        Algorithm::Des(Chaining::Cbc),
        Algorithm::Tdes(Chaining::Ecb),
        Algorithm::Tdes(Chaining::Cbc),
        Algorithm::Aes(AesMode::Ecb, KeySize::Aes128),
        Algorithm::Aes(AesMode::Cbc, KeySize::Aes192),
        Algorithm::Aes(AesMode::Ctr, KeySize::Aes256),
        Algorithm::Aes(AesMode::Gcm, KeySize::Aes128),
        Algorithm::Aes(AesMode::Ccm, KeySize::Aes256),
        Algorithm::Aes(AesMode::KeyPrep, KeySize::Aes192),
    ];

    #[test]
    fn test_key_size_bytes() {
        assert_eq!(KeySize::Aes128.bytes(), 16);
        assert_eq!(KeySize::Aes192.bytes(), 24);
        assert_eq!(KeySize::Aes256.bytes(), 32);
    }

    #[test]
    fn test_control_word_decodes_back() {
        for algorithm in ALL_ALGORITHMS {
            for data_type in [DataType::Bits32, DataType::Bits16, DataType::Bits8, DataType::Bits1] {
                let cfg = EngineConfig::new(algorithm, data_type, Direction::Decrypt);
                assert_eq!(EngineConfig::from_control(cfg.control_bits()), Some(cfg));
            }
        }
    }

    #[test]
    fn test_des_ignores_key_size_bits() {
        let cr = Algorithm::Des(Chaining::Cbc).to_cr_bits() | CR_KEYSIZE_256;
        assert_eq!(Algorithm::from_cr_bits(cr), Some(Algorithm::Des(Chaining::Cbc)));
    }

    #[test]
    fn test_reserved_encodings_rejected() {
        // KEYSIZE = 0b11 is reserved
        assert_eq!(Algorithm::from_cr_bits(CR_ALGOMODE_AES_ECB | CR_KEYSIZE_MASK), None);
        // ALGOMODE3 with a mode other than GCM/CCM
        assert_eq!(Algorithm::from_cr_bits(CR_ALGOMODE3 | CR_ALGOMODE_AES_CTR), None);
    }

    #[test]
    fn test_default_is_tdes_ecb_encrypt() {
        assert_eq!(EngineConfig::default().control_bits(), 0);
    }

    #[test]
    fn test_key_prep_required_only_for_aes_ecb_cbc_decrypt() {
        let ecb = EngineConfig::new(
            Algorithm::Aes(AesMode::Ecb, KeySize::Aes128),
            DataType::Bits32,
            Direction::Decrypt,
        );
        assert!(ecb.requires_key_prep());
        let ctr = EngineConfig {
            algorithm: Algorithm::Aes(AesMode::Ctr, KeySize::Aes128),
            ..ecb
        };
        assert!(!ctr.requires_key_prep());
        let tdes = EngineConfig {
            algorithm: Algorithm::Tdes(Chaining::Cbc),
            ..ecb
        };
        assert!(!tdes.requires_key_prep());
        let enc = EngineConfig {
            direction: Direction::Encrypt,
            ..ecb
        };
        assert!(!enc.requires_key_prep());
    }

    #[test]
    fn test_swap_is_involution() {
        let w = 0x0123_4567;
        for dt in [DataType::Bits32, DataType::Bits16, DataType::Bits8, DataType::Bits1] {
            assert_eq!(dt.swap(dt.swap(w)), w);
        }
        assert_eq!(DataType::Bits8.pack([0x01, 0x23, 0x45, 0x67]), 0x6745_2301);
        assert_eq!(DataType::Bits16.swap(w), 0x4567_0123);
    }

    #[test]
    fn test_requires_iv() {
        assert!(!Algorithm::Aes(AesMode::Ecb, KeySize::Aes128).requires_iv());
        assert!(Algorithm::Aes(AesMode::Gcm, KeySize::Aes128).requires_iv());
        assert!(Algorithm::Des(Chaining::Cbc).requires_iv());
        assert!(!Algorithm::Tdes(Chaining::Ecb).requires_iv());
    }
}
