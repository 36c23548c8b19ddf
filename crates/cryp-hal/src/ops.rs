// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Message-level operations
//!
//! One-shot ECB/CBC/CTR, GCM and CCM built only on the public controller
//! API. Every wait is bounded by [`cryp_common::EngineTuning::fifo_budget`]
//! polls per word and fails with [`CrypError::Timeout`].
//!
//! # Example
//!
//! ```ignore
//! use cryp_hal::{ops, Cryp, KeyMaterial};
//!
//! let mut cryp = Cryp::new(backend, EngineTuning::DEFAULT)?;
//! let key = KeyMaterial::aes128(&key_bytes);
//! let mut ciphertext = [0u8; 64];
//! let tag = ops::gcm_seal(&mut cryp, &key, &nonce, aad, plaintext, &mut ciphertext)?;
//! ```

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use cryp_common::constants::{
    AEAD_TAG_SIZE, AES_BLOCK_SIZE, CCM_MAX_NONCE_SIZE, CCM_MAX_SHORT_AAD, CCM_MIN_NONCE_SIZE,
    CCM_MIN_TAG_SIZE, GCM_NONCE_SIZE,
};
use cryp_common::log_warn;

use crate::config::{AesMode, Algorithm, DataType, Direction, EngineConfig, KeySize};
use crate::cryp::{Cryp, LOG_SOURCE};
use crate::error::{CrypError, CrypResult, Violation};
use crate::key::{IvMaterial, KeyKind, KeyMaterial};
use crate::phase::Phase;
use crate::regs::Status;
use crate::traits::CrypRegisters;
use crate::wait;

/// Data type used for byte-oriented AEAD messages
const AEAD_DATA_TYPE: DataType = DataType::Bits8;

/// Push words into the input FIFO, waiting for room before each one
pub fn write_block<R: CrypRegisters>(cryp: &mut Cryp<R>, words: &[u32]) -> CrypResult<()> {
    let budget = cryp.tuning().fifo_budget;
    for word in words {
        wait::spin_until(budget, || cryp.input_not_full()).map_err(|_| CrypError::Timeout)?;
        cryp.push_word(*word)?;
    }
    Ok(())
}

/// Fill `out` from the output FIFO, waiting for each word
pub fn read_block<R: CrypRegisters>(cryp: &mut Cryp<R>, out: &mut [u32]) -> CrypResult<()> {
    let budget = cryp.tuning().fifo_budget;
    for slot in out.iter_mut() {
        wait::spin_until(budget, || cryp.output_not_empty()).map_err(|_| CrypError::Timeout)?;
        *slot = cryp.pop_word()?;
    }
    Ok(())
}

fn wait_drained<R: CrypRegisters>(cryp: &mut Cryp<R>) -> CrypResult<()> {
    let budget = cryp.tuning().fifo_budget;
    wait::spin_until(budget, || {
        let status = cryp.status();
        status.contains(Status::IN_EMPTY) && !status.contains(Status::BUSY)
    })
    .map(|_| ())
    .map_err(|_| CrypError::Timeout)
}

fn wait_disabled<R: CrypRegisters>(cryp: &mut Cryp<R>) -> CrypResult<()> {
    let budget = cryp.tuning().fifo_budget;
    wait::spin_until(budget, || !cryp.is_enabled())
        .map(|_| ())
        .map_err(|_| CrypError::Timeout)
}

fn pack_words(data_type: DataType, bytes: &[u8], words: &mut [u32]) {
    for (word, c) in words.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = data_type.pack([c[0], c[1], c[2], c[3]]);
    }
}

fn unpack_words(data_type: DataType, words: &[u32], bytes: &mut [u8]) {
    for (c, word) in bytes.chunks_exact_mut(4).zip(words.iter()) {
        c.copy_from_slice(&data_type.unpack(*word));
    }
}

/// Run one full block (8 or 16 bytes) through the engine
fn transfer<R: CrypRegisters>(
    cryp: &mut Cryp<R>,
    data_type: DataType,
    block: &[u8],
    out: &mut [u8],
) -> CrypResult<()> {
    let n = block.len() / 4;
    let mut words = [0u32; 4];
    pack_words(data_type, block, &mut words[..n]);
    write_block(cryp, &words[..n])?;
    read_block(cryp, &mut words[..n])?;
    unpack_words(data_type, &words[..n], out);
    words.zeroize();
    Ok(())
}

/// Feed a byte stream as zero-padded AES blocks, reading nothing back
fn push_stream<R, I>(cryp: &mut Cryp<R>, bytes: I) -> CrypResult<()>
where
    R: CrypRegisters,
    I: Iterator<Item = u8>,
{
    let mut block = [0u8; AES_BLOCK_SIZE];
    let mut filled = 0;
    let mut words = [0u32; 4];
    for byte in bytes {
        block[filled] = byte;
        filled += 1;
        if filled == AES_BLOCK_SIZE {
            pack_words(AEAD_DATA_TYPE, &block, &mut words);
            write_block(cryp, &words)?;
            block = [0u8; AES_BLOCK_SIZE];
            filled = 0;
        }
    }
    if filled > 0 {
        pack_words(AEAD_DATA_TYPE, &block, &mut words);
        write_block(cryp, &words)?;
    }
    Ok(())
}

/// Run a whole-block message through the current (non-AEAD) session
///
/// The engine must be configured, keyed and enabled. `input` must be a
/// multiple of the block size and `output` at least as long.
pub fn process_blocks<R: CrypRegisters>(
    cryp: &mut Cryp<R>,
    input: &[u8],
    output: &mut [u8],
) -> CrypResult<()> {
    let Some(config) = cryp.config() else {
        return Err(cryp.violation(Violation::NotConfigured));
    };
    if config.is_aead() {
        return Err(cryp.violation(Violation::UnsupportedMode));
    }
    let block = config.algorithm.block_bytes();
    if input.len() % block != 0 || output.len() < input.len() {
        return Err(cryp.violation(Violation::InvalidLength));
    }
    for (chunk, out) in input.chunks_exact(block).zip(output.chunks_exact_mut(block)) {
        transfer(cryp, config.data_type, chunk, out)?;
    }
    Ok(())
}

/// One-shot ECB, CBC or CTR over DES, TDES or AES
///
/// Loads `key` (and `iv` for chained modes), runs the key preparation pass
/// for AES ECB/CBC decryption, and leaves the engine disabled. CTR accepts
/// a partial last block; the other modes need whole blocks.
pub fn cipher<R: CrypRegisters>(
    cryp: &mut Cryp<R>,
    config: EngineConfig,
    key: &KeyMaterial,
    iv: &IvMaterial,
    input: &[u8],
    output: &mut [u8],
) -> CrypResult<()> {
    if config.is_aead() || config.is_key_prep() {
        return Err(cryp.violation(Violation::UnsupportedMode));
    }
    if !key.fits(&config.algorithm) {
        return Err(cryp.violation(Violation::KeyMismatch));
    }
    let block = config.algorithm.block_bytes();
    let is_ctr = matches!(config.algorithm, Algorithm::Aes(AesMode::Ctr, _));
    if (!is_ctr && input.len() % block != 0) || output.len() < input.len() {
        return Err(cryp.violation(Violation::InvalidLength));
    }

    cryp.load_key(key)?;
    if config.requires_key_prep() {
        cryp.prepare_decrypt_key()?;
    }
    if config.algorithm.requires_iv() {
        cryp.load_iv(iv)?;
    }
    cryp.configure(config)?;
    cryp.enable()?;

    let result = run_cipher(cryp, config, block, input, output);
    cryp.disable();
    result
}

fn run_cipher<R: CrypRegisters>(
    cryp: &mut Cryp<R>,
    config: EngineConfig,
    block: usize,
    input: &[u8],
    output: &mut [u8],
) -> CrypResult<()> {
    let whole = input.len() - input.len() % block;
    process_blocks(cryp, &input[..whole], &mut output[..whole])?;

    let tail = &input[whole..];
    if !tail.is_empty() {
        let mut padded = [0u8; AES_BLOCK_SIZE];
        let mut out = [0u8; AES_BLOCK_SIZE];
        padded[..tail.len()].copy_from_slice(tail);
        transfer(cryp, config.data_type, &padded[..block], &mut out[..block])?;
        output[whole..input.len()].copy_from_slice(&out[..tail.len()]);
        out.zeroize();
        padded.zeroize();
    }
    Ok(())
}

/// Payload phase: full blocks, then a padded last block with NPBLB set
#[allow(clippy::cast_possible_truncation)]
fn run_payload<R: CrypRegisters>(
    cryp: &mut Cryp<R>,
    input: &[u8],
    output: &mut [u8],
) -> CrypResult<()> {
    for (chunk, out) in input.chunks(AES_BLOCK_SIZE).zip(output.chunks_mut(AES_BLOCK_SIZE)) {
        let mut block = [0u8; AES_BLOCK_SIZE];
        let mut result = [0u8; AES_BLOCK_SIZE];
        if chunk.len() < AES_BLOCK_SIZE {
            wait_drained(cryp)?;
            cryp.set_last_block_padding((AES_BLOCK_SIZE - chunk.len()) as u8)?;
        }
        block[..chunk.len()].copy_from_slice(chunk);
        transfer(cryp, AEAD_DATA_TYPE, &block, &mut result)?;
        out[..chunk.len()].copy_from_slice(&result[..chunk.len()]);
        block.zeroize();
        result.zeroize();
    }
    Ok(())
}

fn aes_key_size<R: CrypRegisters>(cryp: &mut Cryp<R>, key: &KeyMaterial) -> CrypResult<KeySize> {
    match key.kind() {
        KeyKind::Aes(size) => Ok(size),
        _ => Err(cryp.violation(Violation::KeyMismatch)),
    }
}

/// Drive one GCM message; returns the full tag
fn run_gcm<R: CrypRegisters>(
    cryp: &mut Cryp<R>,
    key: &KeyMaterial,
    direction: Direction,
    nonce: &[u8; GCM_NONCE_SIZE],
    aad: &[u8],
    input: &[u8],
    output: &mut [u8],
) -> CrypResult<[u8; AEAD_TAG_SIZE]> {
    let size = aes_key_size(cryp, key)?;
    if output.len() < input.len() {
        return Err(cryp.violation(Violation::InvalidLength));
    }
    let config = EngineConfig::new(Algorithm::Aes(AesMode::Gcm, size), AEAD_DATA_TYPE, direction);

    cryp.load_key(key)?;
    cryp.load_iv(&IvMaterial::gcm_j0(nonce))?;
    cryp.configure(config)?;

    // Init: the engine derives its hash subkey, then disables itself
    cryp.enable()?;
    wait_disabled(cryp)?;

    cryp.set_phase(Phase::Header)?;
    cryp.enable()?;
    push_stream(cryp, aad.iter().copied())?;
    wait_drained(cryp)?;

    cryp.set_phase(Phase::Payload)?;
    run_payload(cryp, input, &mut output[..input.len()])?;

    cryp.set_phase(Phase::Final)?;
    let aad_bits = (aad.len() as u64) * 8;
    let text_bits = (input.len() as u64) * 8;
    let mut lengths = [0u8; AES_BLOCK_SIZE];
    lengths[..8].copy_from_slice(&aad_bits.to_be_bytes());
    lengths[8..].copy_from_slice(&text_bits.to_be_bytes());
    let mut tag = [0u8; AEAD_TAG_SIZE];
    transfer(cryp, AEAD_DATA_TYPE, &lengths, &mut tag)?;
    Ok(tag)
}

/// GCM authenticated encryption with a 96-bit nonce
///
/// Writes `plaintext.len()` bytes of ciphertext and returns the 16-byte tag.
/// The engine is left disabled.
pub fn gcm_seal<R: CrypRegisters>(
    cryp: &mut Cryp<R>,
    key: &KeyMaterial,
    nonce: &[u8; GCM_NONCE_SIZE],
    aad: &[u8],
    plaintext: &[u8],
    ciphertext: &mut [u8],
) -> CrypResult<[u8; AEAD_TAG_SIZE]> {
    let result = run_gcm(cryp, key, Direction::Encrypt, nonce, aad, plaintext, ciphertext);
    cryp.disable();
    result
}

/// GCM authenticated decryption with a 96-bit nonce
///
/// On tag mismatch the plaintext buffer is wiped and
/// [`CrypError::AuthenticationFailed`] is returned.
pub fn gcm_open<R: CrypRegisters>(
    cryp: &mut Cryp<R>,
    key: &KeyMaterial,
    nonce: &[u8; GCM_NONCE_SIZE],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8; AEAD_TAG_SIZE],
    plaintext: &mut [u8],
) -> CrypResult<()> {
    let result = run_gcm(cryp, key, Direction::Decrypt, nonce, aad, ciphertext, plaintext);
    cryp.disable();
    let computed = result?;
    verify_tag(cryp, &computed, tag, &mut plaintext[..ciphertext.len()])
}

fn verify_tag<R: CrypRegisters>(
    cryp: &mut Cryp<R>,
    computed: &[u8],
    expected: &[u8],
    plaintext: &mut [u8],
) -> CrypResult<()> {
    if bool::from(computed.ct_eq(expected)) {
        Ok(())
    } else {
        plaintext.zeroize();
        log_warn!(cryp.log_mut(), LOG_SOURCE, "authentication tag mismatch");
        Err(CrypError::AuthenticationFailed)
    }
}

/// CCM message parameters checked up front
struct CcmParams {
    b0: [u8; AES_BLOCK_SIZE],
    ctr0: [u8; AES_BLOCK_SIZE],
    ctr1: [u8; AES_BLOCK_SIZE],
}

#[allow(clippy::cast_possible_truncation)]
fn ccm_params(nonce: &[u8], aad_len: usize, text_len: usize, tag_len: usize) -> Option<CcmParams> {
    let n = nonce.len();
    if !(CCM_MIN_NONCE_SIZE..=CCM_MAX_NONCE_SIZE).contains(&n) {
        return None;
    }
    if !(CCM_MIN_TAG_SIZE..=AEAD_TAG_SIZE).contains(&tag_len) || tag_len % 2 != 0 {
        return None;
    }
    if aad_len >= CCM_MAX_SHORT_AAD {
        return None;
    }
    // Length field width
    let q = 15 - n;
    let len = text_len as u64;
    if q < 8 && len >> (8 * q) != 0 {
        return None;
    }

    let adata = if aad_len > 0 { 0x40 } else { 0 };
    let mut b0 = [0u8; AES_BLOCK_SIZE];
    b0[0] = adata | ((((tag_len - 2) / 2) as u8) << 3) | (q as u8 - 1);
    b0[1..=n].copy_from_slice(nonce);
    let len_bytes = len.to_be_bytes();
    b0[1 + n..].copy_from_slice(&len_bytes[8 - q..]);

    let mut ctr0 = [0u8; AES_BLOCK_SIZE];
    ctr0[0] = q as u8 - 1;
    ctr0[1..=n].copy_from_slice(nonce);
    let mut ctr1 = ctr0;
    ctr1[AES_BLOCK_SIZE - 1] = 1;

    Some(CcmParams { b0, ctr0, ctr1 })
}

/// Drive one CCM message; returns the full encrypted MAC
#[allow(clippy::cast_possible_truncation, clippy::too_many_arguments)]
fn run_ccm<R: CrypRegisters>(
    cryp: &mut Cryp<R>,
    key: &KeyMaterial,
    direction: Direction,
    nonce: &[u8],
    aad: &[u8],
    input: &[u8],
    output: &mut [u8],
    tag_len: usize,
) -> CrypResult<[u8; AEAD_TAG_SIZE]> {
    let size = aes_key_size(cryp, key)?;
    let Some(params) = ccm_params(nonce, aad.len(), input.len(), tag_len) else {
        return Err(cryp.violation(Violation::InvalidLength));
    };
    if output.len() < input.len() {
        return Err(cryp.violation(Violation::InvalidLength));
    }
    let config = EngineConfig::new(Algorithm::Aes(AesMode::Ccm, size), AEAD_DATA_TYPE, direction);

    cryp.load_key(key)?;
    cryp.load_iv(&IvMaterial::from_bytes(&params.ctr1))?;
    cryp.configure(config)?;

    // Init: the engine consumes B0, then disables itself
    cryp.enable()?;
    push_stream(cryp, params.b0.iter().copied())?;
    wait_disabled(cryp)?;

    cryp.set_phase(Phase::Header)?;
    cryp.enable()?;
    if !aad.is_empty() {
        let prefix = (aad.len() as u16).to_be_bytes();
        push_stream(cryp, prefix.iter().chain(aad.iter()).copied())?;
    }
    wait_drained(cryp)?;

    cryp.set_phase(Phase::Payload)?;
    run_payload(cryp, input, &mut output[..input.len()])?;

    cryp.set_phase(Phase::Final)?;
    let mut tag = [0u8; AEAD_TAG_SIZE];
    transfer(cryp, AEAD_DATA_TYPE, &params.ctr0, &mut tag)?;
    Ok(tag)
}

/// CCM authenticated encryption
///
/// `nonce` is 7 to 13 bytes, `tag` is 4 to 16 bytes (even) and receives the
/// truncated MAC, `aad` is shorter than 0xFF00 bytes.
pub fn ccm_seal<R: CrypRegisters>(
    cryp: &mut Cryp<R>,
    key: &KeyMaterial,
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
    ciphertext: &mut [u8],
    tag: &mut [u8],
) -> CrypResult<()> {
    let result = run_ccm(
        cryp,
        key,
        Direction::Encrypt,
        nonce,
        aad,
        plaintext,
        ciphertext,
        tag.len(),
    );
    cryp.disable();
    let full = result?;
    tag.copy_from_slice(&full[..tag.len()]);
    Ok(())
}

/// CCM authenticated decryption
///
/// On tag mismatch the plaintext buffer is wiped and
/// [`CrypError::AuthenticationFailed`] is returned.
pub fn ccm_open<R: CrypRegisters>(
    cryp: &mut Cryp<R>,
    key: &KeyMaterial,
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    plaintext: &mut [u8],
) -> CrypResult<()> {
    let result = run_ccm(
        cryp,
        key,
        Direction::Decrypt,
        nonce,
        aad,
        ciphertext,
        plaintext,
        tag.len(),
    );
    cryp.disable();
    let full = result?;
    verify_tag(cryp, &full[..tag.len()], tag, &mut plaintext[..ciphertext.len()])
}


#[cfg(all(test, feature = "sim"))]
mod sim_tests {
    use super::*;
    use crate::config::Chaining;
    use crate::sim::SimEngine;
    use cryp_common::EngineTuning;

    fn cryp() -> Cryp<SimEngine> {
        Cryp::new(SimEngine::new(), EngineTuning::DEVELOPMENT).unwrap()
    }

    #[test]
    fn test_aes_cbc_decrypt_inverts_encrypt() {
        let mut c = cryp();
        let key = KeyMaterial::aes256(&[0x42; 32]);
        let iv = IvMaterial::from_bytes(&[7; 16]);
        let msg = [0x5Au8; 48];
        let enc = EngineConfig::new(
            Algorithm::Aes(AesMode::Cbc, KeySize::Aes256),
            DataType::Bits8,
            Direction::Encrypt,
        );
        let mut ct = [0u8; 48];
        cipher(&mut c, enc, &key, &iv, &msg, &mut ct).unwrap();
        assert_ne!(ct, msg);

        let dec = EngineConfig {
            direction: Direction::Decrypt,
            ..enc
        };
        let mut pt = [0u8; 48];
        cipher(&mut c, dec, &key, &iv, &ct, &mut pt).unwrap();
        assert_eq!(pt, msg);
    }

    #[test]
    fn test_ctr_partial_block() {
        let mut c = cryp();
        let key = KeyMaterial::aes128(&[1; 16]);
        let iv = IvMaterial::from_bytes(&[0; 16]);
        let cfg = EngineConfig::new(
            Algorithm::Aes(AesMode::Ctr, KeySize::Aes128),
            DataType::Bits8,
            Direction::Encrypt,
        );
        let msg = *b"counter mode takes any length";
        let mut ct = [0u8; 29];
        cipher(&mut c, cfg, &key, &iv, &msg, &mut ct).unwrap();
        let mut back = [0u8; 29];
        cipher(&mut c, cfg, &key, &iv, &ct, &mut back).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_tdes_cbc_round_trip() {
        let mut c = cryp();
        let key = KeyMaterial::tdes(&[
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        ]);
        let iv = IvMaterial::des(&[0xA5; 8]);
        let enc = EngineConfig::new(Algorithm::Tdes(Chaining::Cbc), DataType::Bits32, Direction::Encrypt);
        let msg = [0x33u8; 24];
        let mut ct = [0u8; 24];
        cipher(&mut c, enc, &key, &iv, &msg, &mut ct).unwrap();
        let mut pt = [0u8; 24];
        let dec = EngineConfig {
            direction: Direction::Decrypt,
            ..enc
        };
        cipher(&mut c, dec, &key, &iv, &ct, &mut pt).unwrap();
        assert_eq!(pt, msg);
    }

    #[test]
    fn test_cipher_rejects_aead_and_partial_blocks() {
        let mut c = cryp();
        let key = KeyMaterial::aes128(&[0; 16]);
        let iv = IvMaterial::from_bytes(&[0; 16]);
        let gcm = EngineConfig::new(
            Algorithm::Aes(AesMode::Gcm, KeySize::Aes128),
            DataType::Bits8,
            Direction::Encrypt,
        );
        let mut out = [0u8; 16];
        assert_eq!(
            cipher(&mut c, gcm, &key, &iv, &[0; 16], &mut out),
            Err(CrypError::Contract(Violation::UnsupportedMode))
        );
        let ecb = EngineConfig {
            algorithm: Algorithm::Aes(AesMode::Ecb, KeySize::Aes128),
            ..gcm
        };
        assert_eq!(
            cipher(&mut c, ecb, &key, &iv, &[0; 15], &mut out),
            Err(CrypError::Contract(Violation::InvalidLength))
        );
    }

    #[test]
    fn test_gcm_open_detects_tamper() {
        let mut c = cryp();
        let key = KeyMaterial::aes128(&[3; 16]);
        let nonce = [9u8; 12];
        let mut ct = [0u8; 20];
        let tag = gcm_seal(&mut c, &key, &nonce, b"hdr", b"twenty bytes of text", &mut ct).unwrap();

        let mut pt = [0u8; 20];
        gcm_open(&mut c, &key, &nonce, b"hdr", &ct, &tag, &mut pt).unwrap();
        assert_eq!(&pt, b"twenty bytes of text");

        ct[0] ^= 1;
        assert_eq!(
            gcm_open(&mut c, &key, &nonce, b"hdr", &ct, &tag, &mut pt),
            Err(CrypError::AuthenticationFailed)
        );
        assert_eq!(pt, [0u8; 20]);
    }

    #[test]
    fn test_ccm_round_trip_with_long_aad() {
        let mut c = cryp();
        let key = KeyMaterial::aes192(&[0x11; 24]);
        let nonce = [0x22u8; 13];
        let aad = [0x33u8; 40];
        let msg = [0x44u8; 37];
        let mut ct = [0u8; 37];
        let mut tag = [0u8; 16];
        ccm_seal(&mut c, &key, &nonce, &aad, &msg, &mut ct, &mut tag).unwrap();
        let mut pt = [0u8; 37];
        ccm_open(&mut c, &key, &nonce, &aad, &ct, &tag, &mut pt).unwrap();
        assert_eq!(pt, msg);

        tag[15] ^= 0x80;
        assert_eq!(
            ccm_open(&mut c, &key, &nonce, &aad, &ct, &tag, &mut pt),
            Err(CrypError::AuthenticationFailed)
        );
    }
}
