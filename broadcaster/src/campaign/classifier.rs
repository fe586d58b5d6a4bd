//! Failure classification: what to do after a failed send attempt.
//!
//! | Error             | Action | Backoff before retry        | Exhausted |
//! |-------------------|--------|-----------------------------|-----------|
//! | `RateLimited(s)`  | retry  | `s` + 1s                    | Failed    |
//! | `Transient`       | retry  | 1s × attempt                | Failed    |
//! | `PermanentReject` | skip   | none                        | -         |
//! | `Unknown(_)`      | retry  | 0.5s + 0.5s × attempt       | Failed    |
//! | `Internal(_)`     | fail   | none                        | -         |

use std::time::Duration;

use crate::transport::TransportError;

/// Margin added on top of the wait the channel asks for.
const RATE_LIMIT_MARGIN: Duration = Duration::from_secs(1);

/// Per-attempt step for transient network failures.
const TRANSIENT_STEP: Duration = Duration::from_secs(1);

/// Base and per-attempt step for unrecognised channel errors.
const UNKNOWN_BASE: Duration = Duration::from_millis(500);
const UNKNOWN_STEP: Duration = Duration::from_millis(500);

/// Decision taken after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Wait, then send again.
    Retry(Duration),
    /// Stop now; the recipient is unreachable.
    Skip,
    /// Stop now; terminal failure.
    Fail,
}

/// Classify the failure of attempt number `attempt` (1-based).
///
/// Returns [`Decision::Fail`] instead of a retry once `attempt` reaches
/// `max_attempts`, so no backoff is slept after the last permitted attempt.
/// A permanent rejection is a skip regardless of the attempt budget.
pub fn classify(error: &TransportError, attempt: u32, max_attempts: u32) -> Decision {
    let backoff = match error {
        TransportError::PermanentReject => return Decision::Skip,
        TransportError::Internal(_) => return Decision::Fail,
        _ if attempt >= max_attempts => return Decision::Fail,
        // retry_after comes straight from the channel, so saturate
        TransportError::RateLimited(retry_after) => {
            Duration::from_secs(*retry_after).saturating_add(RATE_LIMIT_MARGIN)
        }
        TransportError::Transient => TRANSIENT_STEP.saturating_mul(attempt),
        TransportError::Unknown(_) => {
            UNKNOWN_BASE.saturating_add(UNKNOWN_STEP.saturating_mul(attempt))
        }
    };

    Decision::Retry(backoff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_waits_server_delay_plus_margin() {
        assert_eq!(
            classify(&TransportError::RateLimited(7), 1, 3),
            Decision::Retry(Duration::from_secs(8))
        );
        assert_eq!(
            classify(&TransportError::RateLimited(0), 2, 3),
            Decision::Retry(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_transient_backoff_grows_with_attempt() {
        assert_eq!(
            classify(&TransportError::Transient, 1, 3),
            Decision::Retry(Duration::from_secs(1))
        );
        assert_eq!(
            classify(&TransportError::Transient, 2, 3),
            Decision::Retry(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_unknown_backoff() {
        let err = TransportError::Unknown("chat migrated".to_string());
        assert_eq!(classify(&err, 1, 3), Decision::Retry(Duration::from_millis(1000)));
        assert_eq!(classify(&err, 2, 3), Decision::Retry(Duration::from_millis(1500)));
    }

    #[test]
    fn test_exhausted_attempts_fail() {
        assert_eq!(classify(&TransportError::Transient, 3, 3), Decision::Fail);
        assert_eq!(classify(&TransportError::RateLimited(30), 1, 1), Decision::Fail);
        assert_eq!(
            classify(&TransportError::Unknown(String::new()), 5, 3),
            Decision::Fail
        );
    }

    #[test]
    fn test_huge_retry_after_saturates() {
        assert_eq!(
            classify(&TransportError::RateLimited(u64::MAX), 1, 3),
            Decision::Retry(Duration::MAX)
        );
        assert_eq!(classify(&TransportError::RateLimited(u64::MAX), 1, 1), Decision::Fail);
    }

    #[test]
    fn test_permanent_reject_always_skips() {
        for max_attempts in [0, 1, 3] {
            assert_eq!(
                classify(&TransportError::PermanentReject, 1, max_attempts),
                Decision::Skip
            );
        }
        assert_eq!(classify(&TransportError::PermanentReject, 9, 3), Decision::Skip);
    }

    #[test]
    fn test_internal_fails_fast() {
        assert_eq!(
            classify(&TransportError::Internal("bad request body".to_string()), 1, 3),
            Decision::Fail
        );
    }
}
