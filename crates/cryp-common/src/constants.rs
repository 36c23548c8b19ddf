// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Fixed geometry of the cipher engine
//!
//! These values describe the peripheral itself and do not change between
//! parts that carry it.

// =============================================================================
// FIFO Geometry
// =============================================================================

/// Input FIFO depth in 32-bit words
pub const IN_FIFO_WORDS: usize = 8;

/// Output FIFO depth in 32-bit words
pub const OUT_FIFO_WORDS: usize = 8;

/// The input-service interrupt is raised while fewer words than this are queued
pub const IN_SERVICE_THRESHOLD: usize = 4;

// =============================================================================
// Block Geometry
// =============================================================================

/// AES block size in bytes
pub const AES_BLOCK_SIZE: usize = 16;

/// DES/TDES block size in bytes
pub const DES_BLOCK_SIZE: usize = 8;

/// AES block size in 32-bit words
pub const AES_BLOCK_WORDS: usize = AES_BLOCK_SIZE / 4;

/// DES/TDES block size in 32-bit words
pub const DES_BLOCK_WORDS: usize = DES_BLOCK_SIZE / 4;

// =============================================================================
// Register Banks
// =============================================================================

/// Key registers (four left/right quadrant pairs)
pub const KEY_REGISTERS: usize = 8;

/// IV registers (two left/right pairs)
pub const IV_REGISTERS: usize = 4;

/// GCM/CCM working-state context registers
pub const CONTEXT_WORKING_REGISTERS: usize = 8;

/// GCM final-state context registers
pub const CONTEXT_FINAL_REGISTERS: usize = 8;

// =============================================================================
// AEAD Limits
// =============================================================================

/// GCM nonce size handled by the helper operations
pub const GCM_NONCE_SIZE: usize = 12;

/// Full authentication tag size
pub const AEAD_TAG_SIZE: usize = 16;

/// Shortest CCM nonce
pub const CCM_MIN_NONCE_SIZE: usize = 7;

/// Longest CCM nonce
pub const CCM_MAX_NONCE_SIZE: usize = 13;

/// Shortest CCM tag
pub const CCM_MIN_TAG_SIZE: usize = 4;

/// CCM associated data must be shorter than this (two-byte length prefix)
pub const CCM_MAX_SHORT_AAD: usize = 0xFF00;

/// Largest value of the last-block padding field
pub const MAX_PADDING_BYTES: u8 = 15;
