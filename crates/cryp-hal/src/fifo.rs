// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! FIFO flow control
//!
//! Word-granular access to the input and output FIFOs plus the flow
//! predicates that gate it. The controller knows nothing about blocks;
//! framing is the caller's job. Three disciplines sit on top of this:
//!
//! - polling the predicates before each push/pop
//! - interrupts, forwarded one notification per source assertion by
//!   [`Cryp::service_interrupt`]
//! - DMA, which moves words directly and only needs its per-direction
//!   request enables toggled here

use crate::cryp::Cryp;
use crate::error::{CrypResult, Violation};
use crate::regs::{DmaRequests, Interrupts, Status};
use crate::traits::{CrypRegisters, Reg};

/// Interrupt notification forwarded to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrypEvent {
    /// Input FIFO can take more words
    InputService,
    /// Output FIFO holds words to read
    OutputService,
}

impl<R: CrypRegisters> Cryp<R> {
    /// Read all status flags (fresh)
    pub fn status(&mut self) -> Status {
        Status::from_bits_truncate(self.regs.read(Reg::Sr))
    }

    /// Input FIFO can accept a word
    pub fn input_not_full(&mut self) -> bool {
        self.status().contains(Status::IN_NOT_FULL)
    }

    /// Input FIFO is empty
    pub fn input_empty(&mut self) -> bool {
        self.status().contains(Status::IN_EMPTY)
    }

    /// Output FIFO holds at least one word
    pub fn output_not_empty(&mut self) -> bool {
        self.status().contains(Status::OUT_NOT_EMPTY)
    }

    /// Output FIFO is full
    pub fn output_full(&mut self) -> bool {
        self.status().contains(Status::OUT_FULL)
    }

    /// Push one word into the input FIFO
    ///
    /// Checked against the input-not-full flag first; a full FIFO is
    /// refused instead of silently dropping the word.
    pub fn push_word(&mut self, word: u32) -> CrypResult<()> {
        if !self.input_not_full() {
            return Err(self.violation(Violation::InputFifoFull));
        }
        self.regs.write(Reg::Din, word);
        Ok(())
    }

    /// Pop one word from the output FIFO
    pub fn pop_word(&mut self) -> CrypResult<u32> {
        if !self.output_not_empty() {
            return Err(self.violation(Violation::OutputFifoEmpty));
        }
        Ok(self.regs.read(Reg::Dout))
    }

    /// Enable or disable DMA requests per direction
    pub fn set_dma(&mut self, requests: DmaRequests, enable: bool) {
        if enable {
            self.regs.set_bits(Reg::Dmacr, requests.bits());
        } else {
            self.regs.clear_bits(Reg::Dmacr, requests.bits());
        }
    }

    /// DMA requests currently enabled
    pub fn dma_requests(&mut self) -> DmaRequests {
        DmaRequests::from_bits_truncate(self.regs.read(Reg::Dmacr))
    }

    /// Unmask or mask interrupt sources
    pub fn set_interrupts(&mut self, sources: Interrupts, enable: bool) {
        if enable {
            self.regs.set_bits(Reg::Imscr, sources.bits());
        } else {
            self.regs.clear_bits(Reg::Imscr, sources.bits());
        }
    }

    /// Unmasked interrupt sources
    pub fn interrupt_mask(&mut self) -> Interrupts {
        Interrupts::from_bits_truncate(self.regs.read(Reg::Imscr))
    }

    /// Interrupt sources asserted before masking
    pub fn raw_interrupts(&mut self) -> Interrupts {
        Interrupts::from_bits_truncate(self.regs.read(Reg::Risr))
    }

    /// Interrupt sources asserted after masking
    pub fn pending_interrupts(&mut self) -> Interrupts {
        Interrupts::from_bits_truncate(self.regs.read(Reg::Misr))
    }

    /// Forward each masked source that became asserted since the last call
    ///
    /// A source that stays asserted is delivered once; it is delivered again
    /// only after it has been seen deasserted. Nothing is buffered or
    /// coalesced. Returns the number of notifications delivered.
    pub fn service_interrupt<F>(&mut self, mut handler: F) -> usize
    where
        F: FnMut(CrypEvent),
    {
        let pending = self.pending_interrupts();
        let rising = pending.difference(self.asserted);
        self.asserted = pending;

        let mut delivered = 0;
        if rising.contains(Interrupts::INPUT) {
            handler(CrypEvent::InputService);
            delivered += 1;
        }
        if rising.contains(Interrupts::OUTPUT) {
            handler(CrypEvent::OutputService);
            delivered += 1;
        }
        delivered
    }
}
