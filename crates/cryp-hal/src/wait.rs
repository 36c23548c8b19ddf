// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Bounded polling
//!
//! No timer is assumed on the control path, so every wait is a fixed number
//! of observations of the engine. The budget comes from
//! [`cryp_common::EngineTuning`].

/// A bounded wait ran out of polls before its condition held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exhausted;

/// Poll `ready` up to `budget` times
///
/// Returns the number of polls used when the condition held.
pub fn spin_until<F>(budget: u32, mut ready: F) -> Result<u32, Exhausted>
where
    F: FnMut() -> bool,
{
    for used in 1..=budget {
        if ready() {
            return Ok(used);
        }
        core::hint::spin_loop();
    }
    Err(Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_immediately() {
        assert_eq!(spin_until(3, || true), Ok(1));
    }

    #[test]
    fn test_ready_on_last_poll() {
        let mut n = 0;
        assert_eq!(
            spin_until(3, || {
                n += 1;
                n == 3
            }),
            Ok(3)
        );
    }

    #[test]
    fn test_exhausted() {
        let mut polls = 0;
        assert_eq!(
            spin_until(5, || {
                polls += 1;
                false
            }),
            Err(Exhausted)
        );
        assert_eq!(polls, 5);
    }

    #[test]
    fn test_zero_budget_never_polls() {
        assert_eq!(spin_until(0, || true), Err(Exhausted));
    }
}
