// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Key and IV material
//!
//! Both types hold the exact register image the engine expects, so loading
//! is a straight copy. Key words are wiped when the owner drops them.

use core::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::{Algorithm, KeySize};
use crate::error::{CrypError, CrypResult, Violation};
use cryp_common::constants::{IV_REGISTERS, KEY_REGISTERS};

/// Which algorithm family a key was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// 64-bit DES key in K1
    Des,
    /// 192-bit TDES key in K1..K3
    Tdes,
    /// AES key, right-aligned in K0..K3
    Aes(KeySize),
}

impl KeyKind {
    /// Register slots (`Reg::Key` indices) occupied by this key
    #[must_use]
    pub const fn slots(&self) -> core::ops::Range<usize> {
        match self {
            Self::Des => 2..4,
            Self::Tdes => 2..8,
            Self::Aes(KeySize::Aes128) => 4..8,
            Self::Aes(KeySize::Aes192) => 2..8,
            Self::Aes(KeySize::Aes256) => 0..8,
        }
    }

    /// Check if a key of this kind can drive the given algorithm
    #[must_use]
    pub fn fits(&self, algorithm: &Algorithm) -> bool {
        match (self, algorithm) {
            (Self::Des, Algorithm::Des(_)) | (Self::Tdes, Algorithm::Tdes(_)) => true,
            (Self::Aes(k), Algorithm::Aes(_, a)) => k == a,
            _ => false,
        }
    }
}

/// Symmetric key as four 64-bit left/right quadrant pairs
///
/// Owned by the caller and copied into the key registers on load. The
/// engine never exposes keys back, so the caller keeps this value to
/// restore a suspended session.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    words: [u32; KEY_REGISTERS],
    #[zeroize(skip)]
    kind: KeyKind,
}

fn be_words(bytes: &[u8], out: &mut [u32]) {
    for (word, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

impl KeyMaterial {
    fn place(kind: KeyKind, bytes: &[u8]) -> Self {
        let mut words = [0u32; KEY_REGISTERS];
        let slots = kind.slots();
        be_words(bytes, &mut words[slots]);
        Self { words, kind }
    }

    /// AES-128 key
    #[must_use]
    pub fn aes128(key: &[u8; 16]) -> Self {
        Self::place(KeyKind::Aes(KeySize::Aes128), key)
    }

    /// AES-192 key
    #[must_use]
    pub fn aes192(key: &[u8; 24]) -> Self {
        Self::place(KeyKind::Aes(KeySize::Aes192), key)
    }

    /// AES-256 key
    #[must_use]
    pub fn aes256(key: &[u8; 32]) -> Self {
        Self::place(KeyKind::Aes(KeySize::Aes256), key)
    }

    /// AES key of any supported length
    pub fn aes(key: &[u8]) -> CrypResult<Self> {
        let size = match key.len() {
            16 => KeySize::Aes128,
            24 => KeySize::Aes192,
            32 => KeySize::Aes256,
            _ => return Err(CrypError::Contract(Violation::InvalidLength)),
        };
        Ok(Self::place(KeyKind::Aes(size), key))
    }

    /// Single DES key (parity bits are ignored by the engine)
    #[must_use]
    pub fn des(key: &[u8; 8]) -> Self {
        Self::place(KeyKind::Des, key)
    }

    /// Triple DES key, K1 || K2 || K3
    #[must_use]
    pub fn tdes(key: &[u8; 24]) -> Self {
        Self::place(KeyKind::Tdes, key)
    }

    /// Key from quadrant pairs `(left, right)` for K0..K3
    ///
    /// Quadrants outside the slots of `kind` are ignored.
    #[must_use]
    pub fn from_quadrants(kind: KeyKind, quadrants: &[(u32, u32); 4]) -> Self {
        let mut words = [0u32; KEY_REGISTERS];
        for i in kind.slots() {
            let (left, right) = quadrants[i / 2];
            words[i] = if i % 2 == 0 { left } else { right };
        }
        Self { words, kind }
    }

    /// Algorithm family of this key
    #[must_use]
    pub const fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Check if this key can drive the given algorithm
    #[must_use]
    pub fn fits(&self, algorithm: &Algorithm) -> bool {
        self.kind.fits(algorithm)
    }

    /// Register writes needed to load this key, as `(slot, value)` pairs
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn register_image(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.kind.slots().map(move |i| (i as u8, self.words[i]))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Initialization vector as two 64-bit left/right pairs (IV0, IV1)
///
/// DES-family modes use IV0 only.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct IvMaterial {
    words: [u32; IV_REGISTERS],
}

impl IvMaterial {
    /// IV from raw register words IV0L, IV0R, IV1L, IV1R
    #[must_use]
    pub const fn from_words(words: [u32; IV_REGISTERS]) -> Self {
        Self { words }
    }

    /// 128-bit IV for AES modes
    #[must_use]
    pub fn from_bytes(iv: &[u8; 16]) -> Self {
        let mut words = [0u32; IV_REGISTERS];
        be_words(iv, &mut words);
        Self { words }
    }

    /// 64-bit IV for DES/TDES CBC
    #[must_use]
    pub fn des(iv: &[u8; 8]) -> Self {
        let mut words = [0u32; IV_REGISTERS];
        be_words(iv, &mut words[..2]);
        Self { words }
    }

    /// GCM pre-counter block for a 96-bit nonce: nonce || 0x00000001
    #[must_use]
    pub fn gcm_j0(nonce: &[u8; 12]) -> Self {
        let mut words = [0u32; IV_REGISTERS];
        be_words(nonce, &mut words[..3]);
        words[3] = 1;
        Self { words }
    }

    /// Register words IV0L, IV0R, IV1L, IV1R
    #[must_use]
    pub const fn words(&self) -> &[u32; IV_REGISTERS] {
        &self.words
    }

    /// Big-endian byte image
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        for (chunk, w) in out.chunks_exact_mut(4).zip(self.words.iter()) {
            chunk.copy_from_slice(&w.to_be_bytes());
        }
        out
    }
}

impl fmt::Debug for IvMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IvMaterial").finish_non_exhaustive()
    }
}
