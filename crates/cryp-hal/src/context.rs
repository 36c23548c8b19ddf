// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Context save and restore
//!
//! Lets a higher-priority session preempt the engine between blocks. The
//! snapshot carries the control word, IVs and (for GCM/CCM) the internal
//! working state. Keys are never read back; the caller supplies the same
//! key again on restore.
//!
//! # Security
//!
//! A snapshot holds mid-message MAC and counter state, so it is wiped on
//! drop and cannot be cloned.

use core::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use cryp_common::constants::{
    CONTEXT_FINAL_REGISTERS, CONTEXT_WORKING_REGISTERS, IV_REGISTERS,
};
use cryp_common::{log_info, log_warn};

use crate::config::{Algorithm, EngineConfig};
use crate::cryp::{Cryp, LOG_SOURCE};
use crate::error::{CrypError, CrypResult, Violation};
use crate::key::KeyMaterial;
use crate::phase::{InitPass, Phase};
use crate::regs::{DmaRequests, Status, CR_CONTEXT_MASK, CR_CRYPEN, CR_FFLUSH};
use crate::traits::{CrypRegisters, Reg};
use crate::wait;

/// Suspended session state
///
/// Produced by [`Cryp::save`] and consumed by a successful
/// [`Cryp::restore`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ContextSnapshot {
    #[zeroize(skip)]
    config: EngineConfig,
    #[zeroize(skip)]
    phase: Option<Phase>,
    #[zeroize(skip)]
    init: InitPass,
    #[zeroize(skip)]
    enabled: bool,
    control: u32,
    iv: [u32; IV_REGISTERS],
    working: [u32; CONTEXT_WORKING_REGISTERS],
    final_state: [u32; CONTEXT_FINAL_REGISTERS],
}

impl ContextSnapshot {
    /// Configuration of the suspended session
    #[must_use]
    pub const fn config(&self) -> EngineConfig {
        self.config
    }

    /// AEAD phase the session was suspended in
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Check if the engine was enabled when the session was suspended
    #[must_use]
    pub const fn was_enabled(&self) -> bool {
        self.enabled
    }

    /// Saved control word (configuration, phase and padding fields)
    #[must_use]
    pub const fn control(&self) -> u32 {
        self.control
    }

    /// Saved IV registers
    #[must_use]
    pub const fn iv(&self) -> &[u32; IV_REGISTERS] {
        &self.iv
    }
}

impl fmt::Debug for ContextSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextSnapshot")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// A refused or failed restore
///
/// Carries the snapshot back so the caller can retry, for example after
/// the engine goes idle or with the right key.
#[derive(Debug)]
pub struct RestoreError {
    error: CrypError,
    snapshot: ContextSnapshot,
}

impl RestoreError {
    /// Why the restore failed
    #[must_use]
    pub const fn error(&self) -> CrypError {
        self.error
    }

    /// Take the snapshot back
    #[must_use]
    pub fn into_snapshot(self) -> ContextSnapshot {
        self.snapshot
    }
}

impl From<RestoreError> for CrypError {
    fn from(e: RestoreError) -> Self {
        e.error
    }
}

impl From<RestoreError> for cryp_common::Error {
    fn from(e: RestoreError) -> Self {
        e.error.into()
    }
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "restore failed: {}", self.error)
    }
}

/// Status flags watched while draining before a save
///
/// The drain is complete when this masked status equals `IN_EMPTY`. TDES
/// sessions skip the output FIFO check.
const fn drain_mask(algorithm: &Algorithm) -> Status {
    match algorithm {
        Algorithm::Tdes(_) => Status::IN_EMPTY.union(Status::BUSY),
        _ => Status::IN_EMPTY
            .union(Status::BUSY)
            .union(Status::OUT_NOT_EMPTY),
    }
}

impl<R: CrypRegisters> Cryp<R> {
    /// Suspend the current session
    ///
    /// Stops DMA input, waits for the input FIFO to drain and the engine to
    /// go idle, then disables the engine and captures its state. The caller
    /// must have read the output FIFO empty (by polling or DMA) for the
    /// drain to complete.
    ///
    /// On [`CrypError::DrainTimeout`] nothing is captured, DMA input is
    /// re-armed if it was on, and the session continues; retry later.
    #[allow(clippy::cast_possible_truncation)]
    pub fn save(&mut self) -> CrypResult<ContextSnapshot> {
        let Some(config) = self.config else {
            return Err(self.violation(Violation::NotConfigured));
        };

        let dma = self.dma_requests();
        self.set_dma(DmaRequests::INPUT, false);

        let mask = drain_mask(&config.algorithm);
        let budget = self.tuning.drain_budget;
        let drained = wait::spin_until(budget, || self.status().intersection(mask) == Status::IN_EMPTY);

        if drained.is_err() {
            if dma.contains(DmaRequests::INPUT) {
                self.set_dma(DmaRequests::INPUT, true);
            }
            log_warn!(self.log, LOG_SOURCE, "save: engine not drained after {} polls", budget);
            return Err(CrypError::DrainTimeout);
        }

        self.set_dma(DmaRequests::OUTPUT, false);
        let enabled = self.regs.read(Reg::Cr) & CR_CRYPEN != 0;
        let init = match self.init {
            InitPass::Running if !enabled => InitPass::Done,
            other => other,
        };
        self.regs.clear_bits(Reg::Cr, CR_CRYPEN);

        let control = self.regs.read(Reg::Cr) & CR_CONTEXT_MASK;
        let mut iv = [0u32; IV_REGISTERS];
        for (i, word) in iv.iter_mut().enumerate() {
            *word = self.regs.read(Reg::Iv(i as u8));
        }

        let mut working = [0u32; CONTEXT_WORKING_REGISTERS];
        let mut final_state = [0u32; CONTEXT_FINAL_REGISTERS];
        if config.is_aead() {
            for (i, word) in working.iter_mut().enumerate() {
                *word = self.regs.read(Reg::CsGcmCcm(i as u8));
            }
            for (i, word) in final_state.iter_mut().enumerate() {
                *word = self.regs.read(Reg::CsGcm(i as u8));
            }
        }

        let phase = self.phase;
        self.config = None;
        self.phase = None;
        log_info!(self.log, LOG_SOURCE, "session saved ({:?}, {:?})", config.algorithm, phase);

        Ok(ContextSnapshot {
            config,
            phase,
            init,
            enabled,
            control,
            iv,
            working,
            final_state,
        })
    }

    /// Resume a suspended session
    ///
    /// `key` must be the key the session was running with. AES ECB/CBC
    /// decryption reruns the key preparation pass. The saved configuration,
    /// phase and padding setting are written back, and the engine is
    /// re-enabled if it was enabled when the session was saved. A GCM/CCM
    /// message saved after its Init pass therefore stays disabled, as it
    /// was.
    ///
    /// The snapshot is consumed only on success; on error it comes back
    /// inside [`RestoreError`].
    pub fn restore(
        &mut self,
        snapshot: ContextSnapshot,
        key: &KeyMaterial,
    ) -> Result<(), RestoreError> {
        match self.resume(&snapshot, key) {
            Ok(()) => Ok(()),
            Err(error) => Err(RestoreError { error, snapshot }),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn resume(&mut self, snapshot: &ContextSnapshot, key: &KeyMaterial) -> CrypResult<()> {
        let config = snapshot.config;
        if !key.fits(&config.algorithm) {
            return Err(self.violation(Violation::KeyMismatch));
        }
        self.ensure_idle()?;

        self.regs.clear_bits(Reg::Cr, CR_CRYPEN);
        self.regs.set_bits(Reg::Cr, CR_FFLUSH);
        self.write_key(key);

        if config.requires_key_prep() {
            if let Some(size) = config.algorithm.key_size() {
                self.run_key_prep(size, config.data_type)?;
            }
        }

        self.regs.write(Reg::Cr, snapshot.control);
        self.write_iv(&snapshot.iv);
        if config.is_aead() {
            for (i, word) in snapshot.working.iter().enumerate() {
                self.regs.write(Reg::CsGcmCcm(i as u8), *word);
            }
            for (i, word) in snapshot.final_state.iter().enumerate() {
                self.regs.write(Reg::CsGcm(i as u8), *word);
            }
        }
        if snapshot.enabled {
            self.regs.set_bits(Reg::Cr, CR_CRYPEN);
        }

        self.config = Some(config);
        self.phase = snapshot.phase;
        self.init = snapshot.init;
        log_info!(self.log, LOG_SOURCE, "session restored ({:?}, {:?})", config.algorithm, self.phase);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AesMode, Chaining, KeySize};

    #[test]
    fn test_tdes_drain_ignores_output() {
        let tdes = drain_mask(&Algorithm::Tdes(Chaining::Cbc));
        assert!(!tdes.contains(Status::OUT_NOT_EMPTY));
        let aes = drain_mask(&Algorithm::Aes(AesMode::Gcm, KeySize::Aes128));
        assert!(aes.contains(Status::OUT_NOT_EMPTY | Status::BUSY | Status::IN_EMPTY));
        let des = drain_mask(&Algorithm::Des(Chaining::Ecb));
        assert!(des.contains(Status::OUT_NOT_EMPTY));
    }
}

#[cfg(all(test, feature = "sim"))]
mod sim_tests {
    use super::*;
    use crate::config::{AesMode, Chaining, DataType, Direction, KeySize};
    use crate::key::IvMaterial;
    use crate::sim::SimEngine;
    use cryp_common::EngineTuning;

    fn aes_cbc_session(c: &mut Cryp<SimEngine>, key: &KeyMaterial) {
        c.load_key(key).unwrap();
        c.load_iv(&IvMaterial::from_bytes(&[9; 16])).unwrap();
        c.configure(EngineConfig::new(
            Algorithm::Aes(AesMode::Cbc, KeySize::Aes128),
            DataType::Bits32,
            Direction::Encrypt,
        ))
        .unwrap();
        c.enable().unwrap();
    }

    #[test]
    fn test_save_requires_session() {
        let mut c = Cryp::new(SimEngine::new(), EngineTuning::DEVELOPMENT).unwrap();
        assert_eq!(c.save().err(), Some(CrypError::Contract(Violation::NotConfigured)));
    }

    #[test]
    fn test_save_disables_and_clears_session() {
        let key = KeyMaterial::aes128(&[1; 16]);
        let mut c = Cryp::new(SimEngine::new(), EngineTuning::DEVELOPMENT).unwrap();
        aes_cbc_session(&mut c, &key);
        let snap = c.save().unwrap();
        assert!(!c.is_enabled());
        assert_eq!(c.config(), None);
        assert_eq!(snap.iv(), IvMaterial::from_bytes(&[9; 16]).words());
        assert_eq!(snap.control() & CR_CRYPEN, 0);
    }

    #[test]
    fn test_restore_rejects_wrong_key() {
        let key = KeyMaterial::aes128(&[1; 16]);
        let mut c = Cryp::new(SimEngine::new(), EngineTuning::DEVELOPMENT).unwrap();
        aes_cbc_session(&mut c, &key);
        let snap = c.save().unwrap();
        let cr = c.registers_mut().read(Reg::Cr);
        let tdes = KeyMaterial::tdes(&[0; 24]);
        let err = c.restore(snap, &tdes).unwrap_err();
        assert_eq!(err.error(), CrypError::Contract(Violation::KeyMismatch));
        assert_eq!(c.config(), None);
        assert_eq!(c.registers_mut().read(Reg::Cr), cr);

        // The snapshot survives for a retry with the right key
        c.restore(err.into_snapshot(), &key).unwrap();
        assert!(c.is_enabled());
    }

    #[test]
    fn test_restore_refused_while_busy_keeps_snapshot() {
        let key = KeyMaterial::aes128(&[1; 16]);
        let mut c = Cryp::new(SimEngine::new(), EngineTuning::DEVELOPMENT).unwrap();
        aes_cbc_session(&mut c, &key);
        let snap = c.save().unwrap();

        // Another session has a DES block in flight
        c.load_key(&KeyMaterial::des(&[3; 8])).unwrap();
        c.configure(EngineConfig::new(
            Algorithm::Des(Chaining::Ecb),
            DataType::Bits32,
            Direction::Encrypt,
        ))
        .unwrap();
        c.enable().unwrap();
        c.registers_mut().set_latency(1000);
        c.push_word(1).unwrap();
        c.push_word(2).unwrap();
        while !c.is_busy() {}

        let err = c.restore(snap, &key).unwrap_err();
        assert_eq!(err.error(), CrypError::Contract(Violation::EngineBusy));
        let snap = err.into_snapshot();
        assert_eq!(snap.config().algorithm, Algorithm::Aes(AesMode::Cbc, KeySize::Aes128));

        c.registers_mut().set_latency(1);
        while c.is_busy() {}
        c.restore(snap, &key).unwrap();
        assert_eq!(c.key_kind(), Some(key.kind()));
    }

    #[test]
    fn test_disabled_session_restores_disabled() {
        let key = KeyMaterial::aes128(&[1; 16]);
        let mut c = Cryp::new(SimEngine::new(), EngineTuning::DEVELOPMENT).unwrap();
        aes_cbc_session(&mut c, &key);
        c.disable();
        let snap = c.save().unwrap();
        assert!(!snap.was_enabled());
        c.restore(snap, &key).unwrap();
        assert!(!c.is_enabled());
        c.enable().unwrap();
    }

    #[test]
    fn test_restore_reenables_saved_config() {
        let key = KeyMaterial::aes128(&[1; 16]);
        let mut c = Cryp::new(SimEngine::new(), EngineTuning::DEVELOPMENT).unwrap();
        aes_cbc_session(&mut c, &key);
        let cr_before = c.registers_mut().read(Reg::Cr);
        let snap = c.save().unwrap();

        // Someone else runs DES in between
        c.load_key(&KeyMaterial::des(&[2; 8])).unwrap();
        c.configure(EngineConfig::new(
            Algorithm::Des(Chaining::Ecb),
            DataType::Bits8,
            Direction::Decrypt,
        ))
        .unwrap();

        c.restore(snap, &key).unwrap();
        assert!(c.is_enabled());
        assert_eq!(c.registers_mut().read(Reg::Cr), cr_before);
        assert_eq!(c.key_kind(), Some(key.kind()));
    }

    #[test]
    fn test_restore_reprepares_decrypt_key() {
        let key = KeyMaterial::aes128(&[5; 16]);
        let mut c = Cryp::new(SimEngine::new(), EngineTuning::DEVELOPMENT).unwrap();
        c.load_key(&key).unwrap();
        c.prepare_decrypt_key().unwrap();
        let dec = EngineConfig::new(
            Algorithm::Aes(AesMode::Ecb, KeySize::Aes128),
            DataType::Bits32,
            Direction::Decrypt,
        );
        c.configure(dec).unwrap();
        c.enable().unwrap();
        let snap = c.save().unwrap();

        c.load_key(&KeyMaterial::aes128(&[6; 16])).unwrap();
        c.restore(snap, &key).unwrap();
        assert_eq!(c.config(), Some(dec));
        assert!(c.is_enabled());
    }
}
