// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! AEAD phase controller
//!
//! GCM and CCM messages run through `Init -> Header -> Payload -> Final`,
//! strictly forward. The Header phase is entered even when there is no
//! associated data. For every other algorithm the phase calls are no-ops.
//!
//! The Init pass runs when the engine is enabled in the Init phase and ends
//! when the engine clears its own enable bit. Header is refused until that
//! has been observed, and the pass cannot be started a second time.

use cryp_common::constants::MAX_PADDING_BYTES;
use cryp_common::{log_debug, log_warn};

use crate::cryp::{Cryp, LOG_SOURCE};
use crate::error::{CrypResult, Violation};
use crate::regs::{Status, CR_CRYPEN, CR_GCM_CCMPH_MASK, CR_GCM_CCMPH_SHIFT, CR_NPBLB_MASK, CR_NPBLB_SHIFT};
use crate::traits::{CrypRegisters, Reg};

/// GCM/CCM processing phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// No data; the engine primes its counters from the IV (CCM: consumes B0)
    Init,
    /// Associated data in, nothing out
    Header,
    /// Plaintext/ciphertext in, ciphertext/plaintext out
    Payload,
    /// Length block (GCM) or counter block (CCM) in, tag out
    Final,
}

impl Phase {
    /// Get register value for the CR phase field
    #[must_use]
    pub const fn to_cr_bits(self) -> u32 {
        (self as u32) << CR_GCM_CCMPH_SHIFT
    }

    /// Decode the CR phase field
    #[must_use]
    pub const fn from_cr_bits(cr: u32) -> Self {
        match (cr & CR_GCM_CCMPH_MASK) >> CR_GCM_CCMPH_SHIFT {
            0 => Self::Init,
            1 => Self::Header,
            2 => Self::Payload,
            _ => Self::Final,
        }
    }

    /// The only phase that may follow this one
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Header),
            Self::Header => Some(Self::Payload),
            Self::Payload => Some(Self::Final),
            Self::Final => None,
        }
    }
}

/// Progress of the Init pass for the current GCM/CCM message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InitPass {
    /// Engine not yet enabled in the Init phase
    Pending,
    /// Enabled in the Init phase; the engine has not cleared CRYPEN yet
    Running,
    /// Hash subkey, tag mask and counters are primed
    Done,
}

impl<R: CrypRegisters> Cryp<R> {
    /// Phase of the current AEAD message, `None` for other algorithms
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Check if the Init pass of the current message has completed
    ///
    /// `false` for non-AEAD sessions.
    pub fn init_complete(&mut self) -> bool {
        self.poll_init() == InitPass::Done
    }

    /// Mark a running Init pass done once the engine has dropped CRYPEN
    pub(crate) fn poll_init(&mut self) -> InitPass {
        if self.init == InitPass::Running
            && self.phase == Some(Phase::Init)
            && self.regs.read(Reg::Cr) & CR_CRYPEN == 0
        {
            self.init = InitPass::Done;
            log_debug!(self.log, LOG_SOURCE, "init pass complete");
        }
        self.init
    }

    /// Account for a disable issued while the Init pass may still run
    pub(crate) fn abort_init(&mut self) {
        if self.phase == Some(Phase::Init) && self.poll_init() == InitPass::Running {
            self.init = InitPass::Pending;
            log_warn!(self.log, LOG_SOURCE, "init pass aborted");
        }
    }

    /// Check that the engine is disabled, or enabled with both FIFOs empty
    /// and no block in flight
    fn ensure_quiescent(&mut self) -> CrypResult<()> {
        if self.regs.read(Reg::Cr) & CR_CRYPEN == 0 {
            return Ok(());
        }
        let status = self.status();
        let drained = status.contains(Status::IN_EMPTY)
            && !status.intersects(Status::OUT_NOT_EMPTY | Status::BUSY);
        if drained {
            Ok(())
        } else {
            Err(self.violation(Violation::FifosNotDrained))
        }
    }

    /// Move the current GCM/CCM message to `to`
    ///
    /// Requesting the current phase is a no-op. Only the immediate successor
    /// is accepted otherwise; anything else is refused without touching the
    /// engine. The engine must be disabled or drained, and Header needs a
    /// completed Init pass.
    pub fn set_phase(&mut self, to: Phase) -> CrypResult<()> {
        let Some(config) = self.config else {
            return Err(self.violation(Violation::NotConfigured));
        };
        if !config.is_aead() {
            return Ok(());
        }

        let from = self.phase.unwrap_or(Phase::Init);
        if from == to {
            return Ok(());
        }
        if from.next() != Some(to) {
            return Err(self.violation(Violation::PhaseOrder { from, to }));
        }
        if from == Phase::Init && self.poll_init() != InitPass::Done {
            return Err(self.violation(Violation::InitIncomplete));
        }
        self.ensure_quiescent()?;

        self.regs
            .modify(Reg::Cr, |cr| (cr & !CR_GCM_CCMPH_MASK) | to.to_cr_bits());
        self.phase = Some(to);
        log_debug!(self.log, LOG_SOURCE, "phase {:?} -> {:?}", from, to);
        Ok(())
    }

    /// Declare how many bytes of the next payload block are padding
    ///
    /// The engine zeroes those bytes before authenticating the block. Legal
    /// in the Payload phase, with the input FIFO empty and the engine idle.
    pub fn set_last_block_padding(&mut self, bytes: u8) -> CrypResult<()> {
        let Some(config) = self.config else {
            return Err(self.violation(Violation::NotConfigured));
        };
        if !config.is_aead() {
            return Err(self.violation(Violation::NotAead));
        }
        let from = self.phase.unwrap_or(Phase::Init);
        if from != Phase::Payload {
            return Err(self.violation(Violation::PhaseOrder {
                from,
                to: Phase::Payload,
            }));
        }
        if bytes > MAX_PADDING_BYTES {
            return Err(self.violation(Violation::InvalidLength));
        }
        let status = self.status();
        if !status.contains(Status::IN_EMPTY) || status.contains(Status::BUSY) {
            return Err(self.violation(Violation::FifosNotDrained));
        }

        let bits = u32::from(bytes) << CR_NPBLB_SHIFT;
        self.regs
            .modify(Reg::Cr, |cr| (cr & !CR_NPBLB_MASK) | bits);
        Ok(())
    }
}


#[cfg(all(test, feature = "sim"))]
mod sim_tests {
    use super::*;
    use crate::config::{AesMode, Algorithm, DataType, Direction, EngineConfig, KeySize};
    use crate::error::CrypError;
    use crate::key::{IvMaterial, KeyMaterial};
    use crate::sim::SimEngine;
    use cryp_common::EngineTuning;

    fn gcm() -> Cryp<SimEngine> {
        let mut c = Cryp::new(SimEngine::new(), EngineTuning::DEVELOPMENT).unwrap();
        c.load_key(&KeyMaterial::aes128(&[0; 16])).unwrap();
        c.load_iv(&IvMaterial::gcm_j0(&[0; 12])).unwrap();
        c.configure(EngineConfig::new(
            Algorithm::Aes(AesMode::Gcm, KeySize::Aes128),
            DataType::Bits32,
            Direction::Encrypt,
        ))
        .unwrap();
        c
    }

    /// GCM message with its Init pass finished
    fn primed() -> Cryp<SimEngine> {
        let mut c = gcm();
        c.enable().unwrap();
        while c.is_enabled() {}
        c
    }

    #[test]
    fn test_non_aead_phase_calls_are_inert() {
        let mut c = Cryp::new(SimEngine::new(), EngineTuning::DEVELOPMENT).unwrap();
        c.configure(EngineConfig::default()).unwrap();
        let cr = c.registers_mut().read(Reg::Cr);
        c.set_phase(Phase::Final).unwrap();
        assert_eq!(c.phase(), None);
        assert_eq!(c.registers_mut().read(Reg::Cr), cr);
        assert!(!c.init_complete());
    }

    #[test]
    fn test_cannot_skip_header() {
        let mut c = primed();
        assert_eq!(
            c.set_phase(Phase::Payload),
            Err(CrypError::Contract(Violation::PhaseOrder {
                from: Phase::Init,
                to: Phase::Payload
            }))
        );
        assert_eq!(c.phase(), Some(Phase::Init));
    }

    #[test]
    fn test_header_needs_init_pass() {
        let mut c = gcm();
        let cr = c.registers_mut().read(Reg::Cr);
        assert_eq!(
            c.set_phase(Phase::Header),
            Err(CrypError::Contract(Violation::InitIncomplete))
        );
        assert_eq!(c.registers_mut().read(Reg::Cr), cr);
        assert_eq!(c.phase(), Some(Phase::Init));
    }

    #[test]
    fn test_header_waits_for_running_init() {
        let mut c = gcm();
        c.registers_mut().set_stalled(true);
        c.enable().unwrap();
        assert_eq!(
            c.set_phase(Phase::Header),
            Err(CrypError::Contract(Violation::InitIncomplete))
        );
        c.registers_mut().set_stalled(false);
        while c.is_enabled() {}
        assert!(c.init_complete());
        c.set_phase(Phase::Header).unwrap();
    }

    #[test]
    fn test_init_pass_runs_once() {
        let mut c = primed();
        let iv = c.registers_mut().read(Reg::Iv(3));
        assert_eq!(c.enable(), Err(CrypError::Contract(Violation::InitRepeated)));
        assert!(!c.is_enabled());
        assert_eq!(c.registers_mut().read(Reg::Iv(3)), iv);
    }

    #[test]
    fn test_disable_during_init_aborts_pass() {
        let mut c = gcm();
        c.registers_mut().set_stalled(true);
        c.enable().unwrap();
        c.disable();
        c.registers_mut().set_stalled(false);
        assert!(!c.init_complete());
        assert_eq!(
            c.set_phase(Phase::Header),
            Err(CrypError::Contract(Violation::InitIncomplete))
        );
    }

    #[test]
    fn test_same_phase_is_noop() {
        let mut c = primed();
        c.set_phase(Phase::Header).unwrap();
        c.set_phase(Phase::Header).unwrap();
        assert_eq!(c.phase(), Some(Phase::Header));
    }

    #[test]
    fn test_padding_only_in_payload() {
        let mut c = primed();
        assert!(c.set_last_block_padding(4).is_err());
        c.set_phase(Phase::Header).unwrap();
        c.set_phase(Phase::Payload).unwrap();
        assert_eq!(
            c.set_last_block_padding(16),
            Err(CrypError::Contract(Violation::InvalidLength))
        );
        c.set_last_block_padding(4).unwrap();
        assert_eq!(c.registers_mut().read(Reg::Cr) & CR_NPBLB_MASK, 4 << CR_NPBLB_SHIFT);
    }

    #[test]
    fn test_reconfigure_restarts_at_init() {
        let mut c = primed();
        c.set_phase(Phase::Header).unwrap();
        let config = c.config().unwrap();
        c.configure(config).unwrap();
        assert_eq!(c.phase(), Some(Phase::Init));
        assert!(!c.init_complete());
        assert_eq!(c.registers_mut().read(Reg::Cr) & CR_GCM_CCMPH_MASK, 0);
    }
}
