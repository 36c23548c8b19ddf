// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Engine lifecycle
//!
//! [`Cryp`] is the single owned handle to the engine. All configuration,
//! key and IV writes go through it, and every write is guarded by the
//! precondition the engine itself does not check.
//!
//! # Security
//!
//! - Key and IV contents are never logged
//! - [`Cryp::release`] wipes key and IV registers before handing the
//!   backend back

use cryp_common::{log_debug, log_warn, EngineTuning, LogBuffer};

use crate::config::{DataType, EngineConfig, KeySize};
use crate::error::{CrypError, CrypResult, Violation};
use crate::key::{IvMaterial, KeyKind, KeyMaterial};
use crate::phase::{InitPass, Phase};
use crate::regs::{
    Interrupts, Status, CR_CONFIG_MASK, CR_CRYPEN, CR_FFLUSH, CR_GCM_CCMPH_MASK, CR_NPBLB_MASK,
};
use crate::traits::{CrypRegisters, Reg};
use crate::wait;
use cryp_common::constants::{IV_REGISTERS, KEY_REGISTERS};

/// Log source for controller entries
pub(crate) const LOG_SOURCE: &str = "cryp";

/// Progress of the AES decryption key schedule for the loaded key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeySchedule {
    /// Key loaded as-is
    Raw,
    /// Key preparation pass running
    Preparing(KeySize),
    /// Inverse schedule ready for ECB/CBC decryption
    Prepared(KeySize),
}

/// Symmetric cipher engine controller
///
/// Owns the register backend `R`, so at most one logical session can drive
/// the engine at a time. Preempting that session goes through
/// [`Cryp::save`] and [`Cryp::restore`].
pub struct Cryp<R> {
    pub(crate) regs: R,
    pub(crate) config: Option<EngineConfig>,
    pub(crate) key: Option<KeyKind>,
    pub(crate) schedule: KeySchedule,
    pub(crate) phase: Option<Phase>,
    pub(crate) init: InitPass,
    pub(crate) asserted: Interrupts,
    pub(crate) tuning: EngineTuning,
    pub(crate) log: LogBuffer,
}

impl<R: CrypRegisters> Cryp<R> {
    /// Take ownership of the engine and reset it
    ///
    /// Disables the engine, DMA requests and interrupts, then flushes both
    /// FIFOs. A tuning with a zero retry budget is refused before the
    /// engine is touched.
    pub fn new(mut regs: R, tuning: EngineTuning) -> CrypResult<Self> {
        if !tuning.is_valid() {
            return Err(CrypError::Contract(Violation::InvalidTuning));
        }

        regs.write(Reg::Cr, 0);
        regs.write(Reg::Dmacr, 0);
        regs.write(Reg::Imscr, 0);
        regs.write(Reg::Cr, CR_FFLUSH);

        let mut log = LogBuffer::with_level(tuning.log_level);
        log_debug!(log, LOG_SOURCE, "engine reset");

        Ok(Self {
            regs,
            config: None,
            key: None,
            schedule: KeySchedule::Raw,
            phase: None,
            init: InitPass::Pending,
            asserted: Interrupts::empty(),
            tuning,
            log,
        })
    }

    /// Disable the engine, wipe key and IV registers, and return the backend
    #[allow(clippy::cast_possible_truncation)]
    pub fn release(mut self) -> R {
        self.regs.write(Reg::Cr, 0);
        self.regs.write(Reg::Dmacr, 0);
        self.regs.write(Reg::Imscr, 0);

        // Don't leave keys in hardware
        for i in 0..KEY_REGISTERS {
            self.regs.write(Reg::Key(i as u8), 0);
        }
        for i in 0..IV_REGISTERS {
            self.regs.write(Reg::Iv(i as u8), 0);
        }
        self.regs.write(Reg::Cr, CR_FFLUSH);

        self.regs
    }

    /// Tuning parameters this controller was built with
    #[must_use]
    pub const fn tuning(&self) -> &EngineTuning {
        &self.tuning
    }

    /// Controller event log
    #[must_use]
    pub const fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// Mutable access to the event log (to drain or re-level it)
    pub fn log_mut(&mut self) -> &mut LogBuffer {
        &mut self.log
    }

    /// Direct access to the register backend
    ///
    /// Writes made through this handle bypass every controller check.
    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Configuration of the current session, if any
    #[must_use]
    pub const fn config(&self) -> Option<EngineConfig> {
        self.config
    }

    /// Kind of the key loaded in the current session, if any
    #[must_use]
    pub const fn key_kind(&self) -> Option<KeyKind> {
        self.key
    }

    pub(crate) fn violation(&mut self, v: Violation) -> CrypError {
        log_warn!(self.log, LOG_SOURCE, "contract violation: {}", v.description());
        CrypError::Contract(v)
    }

    pub(crate) fn ensure_idle(&mut self) -> CrypResult<()> {
        if self.is_busy() {
            return Err(self.violation(Violation::EngineBusy));
        }
        Ok(())
    }

    fn key_prepared_for(&self, size: Option<KeySize>) -> bool {
        match (self.schedule, self.key) {
            (KeySchedule::Prepared(prepared), Some(KeyKind::Aes(loaded))) => {
                Some(prepared) == size && prepared == loaded
            }
            _ => false,
        }
    }

    /// Write a configuration
    ///
    /// Legal while the engine is disabled or idle. Keys and IVs are not
    /// touched. For GCM/CCM the phase restarts at [`Phase::Init`].
    ///
    /// AES ECB/CBC decryption is refused until a key preparation pass has
    /// completed for the loaded key.
    pub fn configure(&mut self, config: EngineConfig) -> CrypResult<()> {
        self.ensure_idle()?;
        if config.requires_key_prep() && !self.key_prepared_for(config.algorithm.key_size()) {
            return Err(self.violation(Violation::KeyNotPrepared));
        }

        let bits = config.control_bits();
        self.regs.modify(Reg::Cr, |cr| {
            (cr & !(CR_CONFIG_MASK | CR_GCM_CCMPH_MASK | CR_NPBLB_MASK)) | bits
        });

        self.config = Some(config);
        self.phase = if config.is_aead() {
            Some(Phase::Init)
        } else {
            None
        };
        self.init = InitPass::Pending;
        log_debug!(self.log, LOG_SOURCE, "configured {:?}", config.algorithm);
        Ok(())
    }

    /// Load key material into the key registers
    ///
    /// Any prepared decryption schedule is invalidated.
    pub fn load_key(&mut self, key: &KeyMaterial) -> CrypResult<()> {
        self.ensure_idle()?;
        self.write_key(key);
        Ok(())
    }

    pub(crate) fn write_key(&mut self, key: &KeyMaterial) {
        for (slot, word) in key.register_image() {
            self.regs.write(Reg::Key(slot), word);
        }
        self.key = Some(key.kind());
        self.schedule = KeySchedule::Raw;
    }

    /// Load the initialization vector registers
    pub fn load_iv(&mut self, iv: &IvMaterial) -> CrypResult<()> {
        self.ensure_idle()?;
        self.write_iv(iv.words());
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn write_iv(&mut self, words: &[u32; IV_REGISTERS]) {
        for (i, word) in words.iter().enumerate() {
            self.regs.write(Reg::Iv(i as u8), *word);
        }
    }

    /// Discard both FIFOs' contents
    ///
    /// Any buffered but unprocessed words are lost.
    pub fn flush_fifos(&mut self) -> CrypResult<()> {
        self.ensure_idle()?;
        self.regs.set_bits(Reg::Cr, CR_FFLUSH);
        Ok(())
    }

    /// Set the master enable bit
    ///
    /// Requires a configuration and a key that fits it. Enabling the key
    /// preparation mode starts the pass; poll [`Cryp::is_busy`] until it
    /// clears. Enabling a GCM/CCM message in the Init phase starts its Init
    /// pass, which may only happen once per message.
    pub fn enable(&mut self) -> CrypResult<()> {
        let Some(config) = self.config else {
            return Err(self.violation(Violation::NotConfigured));
        };
        let Some(kind) = self.key else {
            return Err(self.violation(Violation::NoKey));
        };
        if !kind.fits(&config.algorithm) {
            return Err(self.violation(Violation::KeyMismatch));
        }
        if config.requires_key_prep() && !self.key_prepared_for(config.algorithm.key_size()) {
            return Err(self.violation(Violation::KeyNotPrepared));
        }
        let in_init = self.phase == Some(Phase::Init);
        if in_init && self.poll_init() == InitPass::Done {
            return Err(self.violation(Violation::InitRepeated));
        }

        self.regs.set_bits(Reg::Cr, CR_CRYPEN);
        if in_init {
            self.init = InitPass::Running;
        }

        if let (true, Some(size)) = (config.is_key_prep(), config.algorithm.key_size()) {
            self.schedule = KeySchedule::Preparing(size);
            log_debug!(self.log, LOG_SOURCE, "key preparation started");
        }
        Ok(())
    }

    /// Clear the master enable bit
    ///
    /// Disabling while busy truncates the block in flight. Disabling before
    /// a GCM/CCM Init pass finishes aborts it; reload the IV before enabling
    /// again.
    pub fn disable(&mut self) {
        self.abort_init();
        if matches!(self.schedule, KeySchedule::Preparing(_)) && self.is_busy() {
            self.schedule = KeySchedule::Raw;
            log_warn!(self.log, LOG_SOURCE, "key preparation aborted");
        }
        self.regs.clear_bits(Reg::Cr, CR_CRYPEN);
    }

    /// Check the master enable bit (read fresh)
    pub fn is_enabled(&mut self) -> bool {
        self.regs.read(Reg::Cr) & CR_CRYPEN != 0
    }

    /// Check if the engine is processing a block or preparing a key
    ///
    /// Always a fresh read. Observing the engine idle after a key
    /// preparation pass marks the decryption schedule ready.
    pub fn is_busy(&mut self) -> bool {
        let busy = self.status().contains(Status::BUSY);
        if !busy {
            if let KeySchedule::Preparing(size) = self.schedule {
                self.schedule = KeySchedule::Prepared(size);
                log_debug!(self.log, LOG_SOURCE, "decryption key prepared");
            }
        }
        busy
    }

    /// Run the key preparation pass for the loaded AES key
    ///
    /// Leaves the engine disabled and configured for key preparation; the
    /// caller then configures ECB or CBC decryption.
    pub fn prepare_decrypt_key(&mut self) -> CrypResult<()> {
        let size = match self.key {
            Some(KeyKind::Aes(size)) => size,
            Some(_) => return Err(self.violation(Violation::KeyMismatch)),
            None => return Err(self.violation(Violation::NoKey)),
        };
        let data_type = self.config.map_or(DataType::Bits32, |c| c.data_type);
        self.run_key_prep(size, data_type)
    }

    pub(crate) fn run_key_prep(&mut self, size: KeySize, data_type: DataType) -> CrypResult<()> {
        self.configure(EngineConfig::key_prep(size, data_type))?;
        self.enable()?;

        let budget = self.tuning.key_prep_budget;
        let result = wait::spin_until(budget, || !self.is_busy());
        self.regs.clear_bits(Reg::Cr, CR_CRYPEN);

        if result.is_err() {
            self.schedule = KeySchedule::Raw;
            log_warn!(self.log, LOG_SOURCE, "key preparation exceeded {} polls", budget);
            return Err(CrypError::Timeout);
        }
        Ok(())
    }
}
