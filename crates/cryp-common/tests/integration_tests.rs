// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Tests for cryp-common
//!
//! Tests for error codes, the event log, and tuning configuration.

#![cfg(test)]

mod error_tests {
    use cryp_common::Error;
    use std::collections::HashSet;

    const ALL: [Error; 9] = [
        Error::InvalidKey,
        Error::UnsupportedAlgorithm,
        Error::AuthenticationFailed,
        Error::ContractViolation,
        Error::PhaseOrder,
        Error::ContextSwitchFailed,
        Error::InvalidParameter,
        Error::Timeout,
        Error::Busy,
    ];

    #[test]
    fn test_error_codes_unique() {
        let codes: HashSet<u16> = ALL.iter().map(Error::code).collect();
        assert_eq!(codes.len(), ALL.len());
    }

    #[test]
    fn test_error_display() {
        let text = format!("{}", Error::PhaseOrder);
        assert_eq!(text, "[0x0C02] phase out of order");
    }

    #[test]
    fn test_security_errors() {
        assert!(Error::AuthenticationFailed.is_security_error());
        assert!(Error::ContractViolation.is_security_error());
        assert!(!Error::Timeout.is_security_error());
        assert!(!Error::ContextSwitchFailed.is_security_error());
    }

    #[test]
    fn test_descriptions_non_empty() {
        for e in ALL {
            assert!(!e.description().is_empty());
        }
    }
}

mod log_tests {
    use cryp_common::log::LOG_BUFFER_SIZE;
    use cryp_common::{log_debug, log_error, log_info, log_trace, LogBuffer, LogLevel};

    #[test]
    fn test_sequence_numbers_increase() {
        let mut log = LogBuffer::with_level(LogLevel::Trace);
        log_error!(log, "a", "one");
        log_trace!(log, "b", "two");
        log_info!(log, "c", "three");

        let seqs: Vec<u32> = log.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_filtered_entries_do_not_consume_sequence() {
        let mut log = LogBuffer::new();
        log_debug!(log, "a", "hidden");
        log_info!(log, "a", "shown");
        assert_eq!(log.last().map(|e| e.seq), Some(0));
    }

    #[test]
    fn test_oldest_first_after_wrap() {
        let mut log = LogBuffer::new();
        for i in 0..(LOG_BUFFER_SIZE * 2) {
            log_info!(log, "wrap", "{}", i);
        }
        let first = log.iter().next().map(|e| e.message.as_str().to_owned());
        assert_eq!(first.as_deref(), Some("32"));
        assert_eq!(log.len(), LOG_BUFFER_SIZE);
    }

    #[test]
    fn test_entry_display() {
        let mut log = LogBuffer::new();
        log_info!(log, "cryp", "saved {} words", 16);
        let text = log.last().map(ToString::to_string);
        assert_eq!(text.as_deref(), Some("[00000000] I [cryp] saved 16 words"));
    }

    #[test]
    fn test_clear_and_drain() {
        let mut log = LogBuffer::new();
        log_info!(log, "x", "a");
        log_info!(log, "x", "b");
        assert_eq!(log.drain_one().map(|e| e.message.as_str().to_owned()).as_deref(), Some("a"));
        log.clear();
        assert!(log.is_empty());
        log_info!(log, "x", "c");
        assert_eq!(log.last().map(|e| e.seq), Some(2));
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Debug < LogLevel::Trace);
        assert_eq!(LogLevel::Warn.as_str(), "WARN");
    }
}

mod config_tests {
    use cryp_common::{EngineTuning, LogLevel};

    #[test]
    fn test_default_tuning() {
        let t = EngineTuning::default();
        assert_eq!(t, EngineTuning::DEFAULT);
        assert_eq!(t.drain_budget, 0xFFFF);
        assert_eq!(t.log_level, LogLevel::Info);
        assert!(t.is_valid());
    }

    #[test]
    fn test_development_tuning() {
        let t = EngineTuning::DEVELOPMENT;
        assert!(t.drain_budget < EngineTuning::DEFAULT.drain_budget);
        assert_eq!(t.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_builders() {
        let t = EngineTuning::DEFAULT.with_drain_budget(0).with_log_level(LogLevel::Trace);
        assert!(!t.is_valid());
        assert_eq!(t.log_level, LogLevel::Trace);
    }
}

mod constants_tests {
    use cryp_common::constants::*;

    #[test]
    fn test_geometry() {
        assert_eq!(AES_BLOCK_WORDS, 4);
        assert_eq!(DES_BLOCK_WORDS, 2);
        assert_eq!(IN_SERVICE_THRESHOLD, IN_FIFO_WORDS / 2);
        assert_eq!(CONTEXT_WORKING_REGISTERS + CONTEXT_FINAL_REGISTERS, 16);
    }
}
