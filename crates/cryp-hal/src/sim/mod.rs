// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Register-level engine model
//!
//! [`SimEngine`] implements [`CrypRegisters`] over software AES and DES so
//! the controller can run on a host. It models what the controller relies
//! on: FIFO depth and flags, a busy window per block, self-clearing bits,
//! the GCM/CCM phase datapath, DMA streams and interrupt status. It is not
//! cycle accurate.
//!
//! Time only advances when a register is accessed. Each access is one tick:
//! DMA moves words, then a block in flight makes progress or a new block is
//! picked up from the input FIFO.
//!
//! Unlike the hardware, key registers read back so tests can check wiping.

mod ghash;

use aes_gcm::aes::cipher::{self, BlockDecrypt, BlockEncrypt, KeyInit};
use aes_gcm::aes::{Aes128, Aes192, Aes256, Block};
use des::{Des, TdesEde3};
use heapless::Deque;

use cryp_common::constants::{
    CONTEXT_FINAL_REGISTERS, CONTEXT_WORKING_REGISTERS, IN_FIFO_WORDS, IN_SERVICE_THRESHOLD,
    IV_REGISTERS, KEY_REGISTERS, OUT_FIFO_WORDS,
};

use crate::config::{AesMode, Algorithm, Chaining, Direction, EngineConfig, KeySize};
use crate::phase::Phase;
use crate::regs::{
    DmaRequests, Interrupts, Status, CR_CRYPEN, CR_FFLUSH, CR_NPBLB_MASK, CR_NPBLB_SHIFT,
};
use crate::traits::{CrypRegisters, Reg};

/// Words a DMA stream can hold on either side of the engine
pub const DMA_STREAM_WORDS: usize = 64;

/// Work the engine is doing
#[derive(Debug, Clone, Copy)]
enum Work {
    /// Decryption key schedule pass
    KeyPrep,
    /// GCM init: derive H and the tag mask from the key and J0
    GcmInit,
    /// One data block, already swapped into engine order
    Block([u32; 4]),
}

#[derive(Debug, Clone, Copy)]
struct Job {
    work: Work,
    remaining: u32,
}

/// Software model of the cipher engine
pub struct SimEngine {
    cr: u32,
    dmacr: u32,
    imscr: u32,
    key: [u32; KEY_REGISTERS],
    iv: [u32; IV_REGISTERS],
    /// GCM: GHASH accumulator in 0..4, H in 4..8. CCM: CBC-MAC in 0..4.
    working: [u32; CONTEXT_WORKING_REGISTERS],
    /// GCM: E(K, J0) in 0..4
    final_state: [u32; CONTEXT_FINAL_REGISTERS],
    input: Deque<u32, IN_FIFO_WORDS>,
    output: Deque<u32, OUT_FIFO_WORDS>,
    dma_in: Deque<u32, DMA_STREAM_WORDS>,
    dma_out: Deque<u32, DMA_STREAM_WORDS>,
    job: Option<Job>,
    latency: u32,
    stalled: bool,
    decrypt_ready: bool,
}

fn get128(words: &[u32]) -> u128 {
    words
        .iter()
        .take(4)
        .fold(0u128, |acc, w| (acc << 32) | u128::from(*w))
}

#[allow(clippy::cast_possible_truncation)]
fn put128(words: &mut [u32], value: u128) {
    for (i, w) in words.iter_mut().take(4).enumerate() {
        *w = (value >> (96 - 32 * i)) as u32;
    }
}

/// Mask that zeroes the last `padding` bytes of a block
const fn keep_mask(padding: u32) -> u128 {
    if padding == 0 {
        u128::MAX
    } else {
        u128::MAX << (padding * 8)
    }
}

fn crypt<C>(engine: &C, encrypt: bool, block: &mut cipher::Block<C>)
where
    C: BlockEncrypt + BlockDecrypt,
{
    if encrypt {
        engine.encrypt_block(block);
    } else {
        engine.decrypt_block(block);
    }
}

impl SimEngine {
    /// Engine in its reset state
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cr: 0,
            dmacr: 0,
            imscr: 0,
            key: [0; KEY_REGISTERS],
            iv: [0; IV_REGISTERS],
            working: [0; CONTEXT_WORKING_REGISTERS],
            final_state: [0; CONTEXT_FINAL_REGISTERS],
            input: Deque::new(),
            output: Deque::new(),
            dma_in: Deque::new(),
            dma_out: Deque::new(),
            job: None,
            latency: 1,
            stalled: false,
            decrypt_ready: false,
        }
    }

    /// Ticks a block (or key preparation) stays busy, minimum 1
    pub fn set_latency(&mut self, ticks: u32) {
        self.latency = ticks.max(1);
    }

    /// Freeze the datapath; DMA keeps moving words
    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Queue words on the input DMA stream
    ///
    /// They reach the input FIFO while input DMA requests are enabled.
    /// Returns how many words were accepted.
    pub fn dma_feed(&mut self, words: &[u32]) -> usize {
        let mut accepted = 0;
        for w in words {
            if self.dma_in.push_back(*w).is_err() {
                break;
            }
            accepted += 1;
        }
        accepted
    }

    /// Words still waiting on the input DMA stream
    #[must_use]
    pub fn dma_pending(&self) -> usize {
        self.dma_in.len()
    }

    /// Collect words the output DMA stream has moved out of the engine
    pub fn take_dma_output(&mut self, out: &mut [u32]) -> usize {
        let mut taken = 0;
        for slot in out.iter_mut() {
            match self.dma_out.pop_front() {
                Some(w) => {
                    *slot = w;
                    taken += 1;
                }
                None => break,
            }
        }
        taken
    }

    fn enabled(&self) -> bool {
        self.cr & CR_CRYPEN != 0
    }

    fn config(&self) -> Option<EngineConfig> {
        EngineConfig::from_control(self.cr)
    }

    fn padding(&self) -> u32 {
        (self.cr & CR_NPBLB_MASK) >> CR_NPBLB_SHIFT
    }

    fn status(&self) -> Status {
        let mut sr = Status::empty();
        sr.set(Status::IN_EMPTY, self.input.is_empty());
        sr.set(Status::IN_NOT_FULL, !self.input.is_full());
        sr.set(Status::OUT_NOT_EMPTY, !self.output.is_empty());
        sr.set(Status::OUT_FULL, self.output.is_full());
        sr.set(Status::BUSY, self.job.is_some());
        sr
    }

    fn raw_interrupts(&self) -> Interrupts {
        let mut ris = Interrupts::empty();
        ris.set(
            Interrupts::INPUT,
            self.enabled() && self.input.len() < IN_SERVICE_THRESHOLD,
        );
        ris.set(Interrupts::OUTPUT, !self.output.is_empty());
        ris
    }

    // Datapath

    fn key_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (chunk, w) in bytes.chunks_exact_mut(4).zip(self.key.iter()) {
            chunk.copy_from_slice(&w.to_be_bytes());
        }
        bytes
    }

    fn aes(&self, size: KeySize, encrypt: bool, data: u128) -> u128 {
        let key = self.key_bytes();
        let mut block = Block::clone_from_slice(&data.to_be_bytes());
        match size {
            KeySize::Aes128 => {
                if let Ok(c) = Aes128::new_from_slice(&key[16..]) {
                    crypt(&c, encrypt, &mut block);
                }
            }
            KeySize::Aes192 => {
                if let Ok(c) = Aes192::new_from_slice(&key[8..]) {
                    crypt(&c, encrypt, &mut block);
                }
            }
            KeySize::Aes256 => {
                if let Ok(c) = Aes256::new_from_slice(&key) {
                    crypt(&c, encrypt, &mut block);
                }
            }
        }
        let mut out = [0u8; 16];
        out.copy_from_slice(&block);
        u128::from_be_bytes(out)
    }

    /// ECB/CBC decryption only works after a key preparation pass; without
    /// it the engine runs the forward schedule and produces garbage
    fn aes_inverse(&self, size: KeySize, data: u128) -> u128 {
        self.aes(size, !self.decrypt_ready, data)
    }

    fn des(&self, triple: bool, encrypt: bool, data: u64) -> u64 {
        let key = self.key_bytes();
        let mut block = cipher::Block::<Des>::clone_from_slice(&data.to_be_bytes());
        if triple {
            if let Ok(c) = TdesEde3::new_from_slice(&key[8..]) {
                crypt(&c, encrypt, &mut block);
            }
        } else if let Ok(c) = Des::new_from_slice(&key[8..16]) {
            crypt(&c, encrypt, &mut block);
        }
        let mut out = [0u8; 8];
        out.copy_from_slice(&block);
        u64::from_be_bytes(out)
    }

    fn counter(&self) -> u128 {
        get128(&self.iv)
    }

    fn next_counter(&mut self) -> u128 {
        let ctr = self.counter();
        self.iv[3] = self.iv[3].wrapping_add(1);
        ctr
    }

    #[allow(clippy::cast_possible_truncation)]
    fn run_des(&mut self, triple: bool, chaining: Chaining, encrypt: bool, data: u64) -> u64 {
        match chaining {
            Chaining::Ecb => self.des(triple, encrypt, data),
            Chaining::Cbc => {
                let iv = (u64::from(self.iv[0]) << 32) | u64::from(self.iv[1]);
                let (out, next_iv) = if encrypt {
                    let c = self.des(triple, true, data ^ iv);
                    (c, c)
                } else {
                    (self.des(triple, false, data) ^ iv, data)
                };
                self.iv[0] = (next_iv >> 32) as u32;
                self.iv[1] = next_iv as u32;
                out
            }
        }
    }

    fn run_aes(&mut self, mode: AesMode, size: KeySize, encrypt: bool, data: u128) -> Option<u128> {
        let phase = Phase::from_cr_bits(self.cr);
        let keep = keep_mask(self.padding());
        match mode {
            AesMode::Ecb if encrypt => Some(self.aes(size, true, data)),
            AesMode::Ecb => Some(self.aes_inverse(size, data)),
            AesMode::Cbc => {
                let iv = self.counter();
                let (out, next_iv) = if encrypt {
                    let c = self.aes(size, true, data ^ iv);
                    (c, c)
                } else {
                    (self.aes_inverse(size, data) ^ iv, data)
                };
                put128(&mut self.iv, next_iv);
                Some(out)
            }
            AesMode::Ctr => {
                let ctr = self.next_counter();
                Some(data ^ self.aes(size, true, ctr))
            }
            AesMode::KeyPrep => None,
            AesMode::Gcm => {
                let h = get128(&self.working[4..]);
                let acc = get128(&self.working[..4]);
                match phase {
                    Phase::Init => None,
                    Phase::Header => {
                        put128(&mut self.working[..4], ghash::fold(acc, h, data));
                        None
                    }
                    Phase::Payload => {
                        let ctr = self.next_counter();
                        let out = data ^ self.aes(size, true, ctr);
                        let cipher_block = if encrypt { out } else { data };
                        put128(&mut self.working[..4], ghash::fold(acc, h, cipher_block & keep));
                        Some(out)
                    }
                    Phase::Final => {
                        let ghash = ghash::fold(acc, h, data);
                        put128(&mut self.working[..4], ghash);
                        Some(ghash ^ get128(&self.final_state[..4]))
                    }
                }
            }
            AesMode::Ccm => {
                let mac = get128(&self.working[..4]);
                match phase {
                    Phase::Init => {
                        // B0 opens the CBC-MAC, then the engine disables itself
                        let opened = self.aes(size, true, data);
                        put128(&mut self.working[..4], opened);
                        self.cr &= !CR_CRYPEN;
                        None
                    }
                    Phase::Header => {
                        let next = self.aes(size, true, mac ^ data);
                        put128(&mut self.working[..4], next);
                        None
                    }
                    Phase::Payload => {
                        let ctr = self.next_counter();
                        let out = data ^ self.aes(size, true, ctr);
                        let plain = if encrypt { data } else { out & keep };
                        let next = self.aes(size, true, mac ^ plain);
                        put128(&mut self.working[..4], next);
                        Some(out)
                    }
                    // The caller feeds CTR0
                    Phase::Final => Some(self.aes(size, true, data) ^ mac),
                }
            }
        }
    }

    fn gcm_init(&mut self) {
        let Some(EngineConfig {
            algorithm: Algorithm::Aes(AesMode::Gcm, size),
            ..
        }) = self.config()
        else {
            return;
        };
        let h = self.aes(size, true, 0);
        let j0 = self.next_counter();
        let mask = self.aes(size, true, j0);
        put128(&mut self.working[..4], 0);
        put128(&mut self.working[4..], h);
        put128(&mut self.final_state[..4], mask);
        self.cr &= !CR_CRYPEN;
    }

    #[allow(clippy::cast_possible_truncation)]
    fn process(&mut self, words: [u32; 4]) {
        let Some(config) = self.config() else {
            return;
        };
        let encrypt = config.direction == Direction::Encrypt;
        let mut out = [0u32; 4];
        let produced = match config.algorithm {
            Algorithm::Des(chaining) | Algorithm::Tdes(chaining) => {
                let triple = matches!(config.algorithm, Algorithm::Tdes(_));
                let data = (u64::from(words[0]) << 32) | u64::from(words[1]);
                let r = self.run_des(triple, chaining, encrypt, data);
                out[0] = (r >> 32) as u32;
                out[1] = r as u32;
                2
            }
            Algorithm::Aes(mode, size) => match self.run_aes(mode, size, encrypt, get128(&words)) {
                Some(r) => {
                    put128(&mut out, r);
                    4
                }
                None => 0,
            },
        };
        for w in out.iter().take(produced) {
            let _ = self.output.push_back(config.data_type.swap(*w));
        }
    }

    // Sequencing

    fn on_enable(&mut self) {
        let Some(config) = self.config() else {
            return;
        };
        let work = match config.algorithm {
            Algorithm::Aes(AesMode::KeyPrep, _) => Work::KeyPrep,
            Algorithm::Aes(AesMode::Gcm, _) if Phase::from_cr_bits(self.cr) == Phase::Init => {
                Work::GcmInit
            }
            _ => return,
        };
        self.job = Some(Job {
            work,
            remaining: self.latency,
        });
    }

    fn try_start(&mut self) {
        if !self.enabled() {
            return;
        }
        let Some(config) = self.config() else {
            return;
        };
        let phase = Phase::from_cr_bits(self.cr);
        let words = config.algorithm.block_words();
        let produces_output = match config.algorithm {
            Algorithm::Aes(AesMode::KeyPrep, _) => return,
            Algorithm::Aes(AesMode::Gcm, _) if phase == Phase::Init => return,
            Algorithm::Aes(AesMode::Gcm | AesMode::Ccm, _) => {
                matches!(phase, Phase::Payload | Phase::Final)
            }
            _ => true,
        };
        if self.input.len() < words {
            return;
        }
        if produces_output && self.output.len() + words > OUT_FIFO_WORDS {
            return;
        }

        let mut block = [0u32; 4];
        for slot in block.iter_mut().take(words) {
            if let Some(w) = self.input.pop_front() {
                *slot = config.data_type.swap(w);
            }
        }
        self.job = Some(Job {
            work: Work::Block(block),
            remaining: self.latency,
        });
    }

    fn complete(&mut self, work: Work) {
        match work {
            Work::KeyPrep => self.decrypt_ready = true,
            Work::GcmInit => self.gcm_init(),
            Work::Block(words) => self.process(words),
        }
    }

    fn service_dma(&mut self) {
        if !self.enabled() {
            return;
        }
        if self.dmacr & DmaRequests::INPUT.bits() != 0 {
            while !self.input.is_full() {
                let Some(w) = self.dma_in.pop_front() else {
                    break;
                };
                let _ = self.input.push_back(w);
            }
        }
        if self.dmacr & DmaRequests::OUTPUT.bits() != 0 {
            while !self.dma_out.is_full() {
                let Some(w) = self.output.pop_front() else {
                    break;
                };
                let _ = self.dma_out.push_back(w);
            }
        }
    }

    fn tick(&mut self) {
        self.service_dma();
        if self.stalled {
            return;
        }
        match self.job {
            Some(job) if job.remaining > 1 => {
                self.job = Some(Job {
                    remaining: job.remaining - 1,
                    ..job
                });
            }
            Some(job) => {
                self.job = None;
                self.complete(job.work);
                self.try_start();
            }
            None => self.try_start(),
        }
    }

    fn write_cr(&mut self, value: u32) {
        let was_enabled = self.enabled();
        if value & CR_FFLUSH != 0 {
            self.input.clear();
            self.output.clear();
        }
        self.cr = value & !CR_FFLUSH;
        match (was_enabled, self.enabled()) {
            (false, true) => self.on_enable(),
            (true, false) => self.job = None,
            _ => {}
        }
    }
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CrypRegisters for SimEngine {
    fn read(&mut self, reg: Reg) -> u32 {
        self.tick();
        match reg {
            Reg::Cr => self.cr,
            Reg::Sr => self.status().bits(),
            Reg::Din => 0,
            Reg::Dout => self.output.pop_front().unwrap_or(0),
            Reg::Dmacr => self.dmacr,
            Reg::Imscr => self.imscr,
            Reg::Risr => self.raw_interrupts().bits(),
            Reg::Misr => self.raw_interrupts().bits() & self.imscr,
            Reg::Key(i) => self.key[usize::from(i) % KEY_REGISTERS],
            Reg::Iv(i) => self.iv[usize::from(i) % IV_REGISTERS],
            Reg::CsGcmCcm(i) => self.working[usize::from(i) % CONTEXT_WORKING_REGISTERS],
            Reg::CsGcm(i) => self.final_state[usize::from(i) % CONTEXT_FINAL_REGISTERS],
        }
    }

    fn write(&mut self, reg: Reg, value: u32) {
        self.tick();
        match reg {
            Reg::Cr => self.write_cr(value),
            Reg::Din => {
                let _ = self.input.push_back(value);
            }
            Reg::Dmacr => self.dmacr = value & DmaRequests::all().bits(),
            Reg::Imscr => self.imscr = value & Interrupts::all().bits(),
            Reg::Key(i) => {
                self.key[usize::from(i) % KEY_REGISTERS] = value;
                self.decrypt_ready = false;
            }
            Reg::Iv(i) => self.iv[usize::from(i) % IV_REGISTERS] = value,
            Reg::CsGcmCcm(i) => self.working[usize::from(i) % CONTEXT_WORKING_REGISTERS] = value,
            Reg::CsGcm(i) => self.final_state[usize::from(i) % CONTEXT_FINAL_REGISTERS] = value,
            Reg::Sr | Reg::Dout | Reg::Risr | Reg::Misr => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataType;

    fn configure(sim: &mut SimEngine, config: EngineConfig) {
        sim.write(Reg::Cr, config.control_bits());
    }

    fn run_block(sim: &mut SimEngine, words: &[u32]) -> [u32; 4] {
        for w in words {
            sim.write(Reg::Din, *w);
        }
        while sim.read(Reg::Sr) & Status::OUT_NOT_EMPTY.bits() == 0 {}
        let mut out = [0u32; 4];
        for slot in out.iter_mut().take(words.len()) {
            *slot = sim.read(Reg::Dout);
        }
        out
    }

    #[test]
    fn test_fips197_aes128() {
        let mut sim = SimEngine::new();
        for (i, w) in [0x0001_0203, 0x0405_0607, 0x0809_0a0b, 0x0c0d_0e0f].iter().enumerate() {
            sim.write(Reg::Key(4 + i as u8), *w);
        }
        configure(
            &mut sim,
            EngineConfig::new(
                Algorithm::Aes(AesMode::Ecb, KeySize::Aes128),
                DataType::Bits32,
                Direction::Encrypt,
            ),
        );
        sim.write(Reg::Cr, sim.cr | CR_CRYPEN);
        let out = run_block(&mut sim, &[0x0011_2233, 0x4455_6677, 0x8899_aabb, 0xccdd_eeff]);
        assert_eq!(out, [0x69c4_e0d8, 0x6a7b_0430, 0xd8cd_b780, 0x70b4_c55a]);
    }

    #[test]
    fn test_des_known_answer() {
        let mut sim = SimEngine::new();
        sim.write(Reg::Key(2), 0x1334_5779);
        sim.write(Reg::Key(3), 0x9BBC_DFF1);
        configure(
            &mut sim,
            EngineConfig::new(Algorithm::Des(Chaining::Ecb), DataType::Bits32, Direction::Encrypt),
        );
        sim.write(Reg::Cr, sim.cr | CR_CRYPEN);
        let out = run_block(&mut sim, &[0x0123_4567, 0x89AB_CDEF]);
        assert_eq!(&out[..2], &[0x85E8_1354, 0x0F0A_B405]);
    }

    #[test]
    fn test_flush_is_self_clearing() {
        let mut sim = SimEngine::new();
        sim.write(Reg::Din, 1);
        sim.write(Reg::Cr, CR_FFLUSH);
        assert_eq!(sim.read(Reg::Cr) & CR_FFLUSH, 0);
        assert_ne!(sim.read(Reg::Sr) & Status::IN_EMPTY.bits(), 0);
    }

    #[test]
    fn test_full_output_stalls_input() {
        let mut sim = SimEngine::new();
        configure(
            &mut sim,
            EngineConfig::new(Algorithm::Des(Chaining::Ecb), DataType::Bits32, Direction::Encrypt),
        );
        sim.write(Reg::Cr, sim.cr | CR_CRYPEN);
        for w in 0..8 {
            sim.write(Reg::Din, w);
        }
        for _ in 0..32 {
            sim.read(Reg::Sr);
        }
        // Output holds four blocks; the rest waits
        let sr = Status::from_bits_truncate(sim.read(Reg::Sr));
        assert!(sr.contains(Status::OUT_FULL));
        for w in 8..16 {
            sim.write(Reg::Din, w);
        }
        assert!(Status::from_bits_truncate(sim.read(Reg::Sr)).contains(Status::OUT_FULL));
        assert!(!Status::from_bits_truncate(sim.read(Reg::Sr)).contains(Status::IN_NOT_FULL));
    }

    #[test]
    fn test_dma_needs_enable() {
        let mut sim = SimEngine::new();
        sim.write(Reg::Dmacr, DmaRequests::INPUT.bits());
        assert_eq!(sim.dma_feed(&[1, 2, 3]), 3);
        sim.read(Reg::Sr);
        assert_eq!(sim.dma_pending(), 3);
    }

    #[test]
    fn test_keep_mask() {
        assert_eq!(keep_mask(0), u128::MAX);
        assert_eq!(keep_mask(15), 0xFF << 120);
    }
}
