// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Common library for the symmetric cipher engine controller
//!
//! This crate holds the pieces shared by every layer that drives the
//! engine: the aggregate error type, a heap-free event log, tuning
//! parameters for the bounded waits, and the engine's fixed geometry.
//!
//! # Features
//!
//! - `std`: Enable standard library support (disabled by default for embedded)
//! - `defmt`: Enable defmt formatting for errors and log levels
//!
//! No heap allocations are performed. Buffers use fixed-size arrays or
//! heapless collections.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod errors;
pub mod config;
pub mod log;
pub mod constants;

pub use errors::{Error, Result};
pub use config::EngineTuning;
pub use log::{LogBuffer, LogEntry, LogLevel};
