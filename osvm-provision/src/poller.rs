//! Generic bounded polling primitive.
//!
//! Every "wait until resource reaches state X" in the orchestrator goes
//! through [`wait_for`]. The interval is fixed; the backend's own operations
//! are the bottleneck, not client load, so backoff buys nothing here.

use std::thread;
use std::time::Duration;

use osvm_core::{Error, Result};

/// Interval and attempt bound for one wait.
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// Classification of one observed resource snapshot.
pub enum Classified {
    /// Keep polling.
    Pending,
    /// Terminal success; return the snapshot.
    Ready,
    /// Terminal failure reported by the backend; stop immediately.
    Failed(String),
}

/// How a wait ended without reaching the desired state.
#[derive(Debug)]
pub enum WaitError<R> {
    /// `max_attempts` consecutive Pending observations.
    Timeout { attempts: u32, last: Option<R> },
    /// The backend reported an explicit error status. Never retried.
    Failed { last: R, reason: String },
    /// Fetching the resource itself failed.
    Fetch(Error),
}

impl<R> WaitError<R> {
    /// Collapse into the shared error taxonomy, describing the wait as
    /// `what` and extracting a status label from the last snapshot.
    pub fn into_error(self, what: &str, status_of: impl Fn(&R) -> String) -> Error {
        match self {
            WaitError::Timeout { last, .. } => Error::Timeout {
                what: what.to_string(),
                last_status: last
                    .map(|r| status_of(&r))
                    .unwrap_or_else(|| "unknown".to_string()),
            },
            WaitError::Failed { reason, .. } => Error::ResourceError {
                resource: what.to_string(),
                detail: reason,
            },
            WaitError::Fetch(e) => e,
        }
    }
}

/// Poll `fetch` until `classify` reports a terminal outcome.
///
/// Blocks the calling thread for `interval` between attempts. Returns
/// [`WaitError::Timeout`] after exactly `max_attempts` Pending observations,
/// carrying the last snapshot for diagnostics.
pub fn wait_for<R, F, C>(
    opts: &PollOptions,
    mut fetch: F,
    classify: C,
) -> std::result::Result<R, WaitError<R>>
where
    F: FnMut() -> Result<R>,
    C: Fn(&R) -> Classified,
{
    let mut last: Option<R> = None;
    for attempt in 1..=opts.max_attempts {
        let resource = fetch().map_err(WaitError::Fetch)?;
        match classify(&resource) {
            Classified::Ready => return Ok(resource),
            Classified::Failed(reason) => {
                return Err(WaitError::Failed {
                    last: resource,
                    reason,
                })
            }
            Classified::Pending => {
                last = Some(resource);
                if attempt < opts.max_attempts && !opts.interval.is_zero() {
                    thread::sleep(opts.interval);
                }
            }
        }
    }
    Err(WaitError::Timeout {
        attempts: opts.max_attempts,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn immediate(max_attempts: u32) -> PollOptions {
        PollOptions {
            interval: Duration::ZERO,
            max_attempts,
        }
    }

    fn classify_status(status: &&'static str) -> Classified {
        match *status {
            "ACTIVE" => Classified::Ready,
            "ERROR" => Classified::Failed("status ERROR".into()),
            _ => Classified::Pending,
        }
    }

    #[test]
    fn returns_resource_on_ready() {
        let calls = Cell::new(0u32);
        let result = wait_for(
            &immediate(30),
            || {
                calls.set(calls.get() + 1);
                Ok(if calls.get() < 3 { "BUILD" } else { "ACTIVE" })
            },
            classify_status,
        );
        assert_eq!(result.unwrap(), "ACTIVE");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn times_out_after_exactly_max_attempts() {
        let calls = Cell::new(0u32);
        let result = wait_for(
            &immediate(30),
            || {
                calls.set(calls.get() + 1);
                Ok("BUILD")
            },
            classify_status,
        );
        match result {
            Err(WaitError::Timeout { attempts, last }) => {
                assert_eq!(attempts, 30);
                assert_eq!(last, Some("BUILD"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(calls.get(), 30);
    }

    #[test]
    fn succeeds_on_the_final_attempt_boundary() {
        // Ready on attempt 30 of 30 must still succeed, not time out.
        let calls = Cell::new(0u32);
        let result = wait_for(
            &immediate(30),
            || {
                calls.set(calls.get() + 1);
                Ok(if calls.get() < 30 { "BUILD" } else { "ACTIVE" })
            },
            classify_status,
        );
        assert!(result.is_ok());
        assert_eq!(calls.get(), 30);
    }

    #[test]
    fn failed_state_returns_immediately() {
        let calls = Cell::new(0u32);
        let result = wait_for(
            &immediate(30),
            || {
                calls.set(calls.get() + 1);
                Ok("ERROR")
            },
            classify_status,
        );
        match result {
            Err(WaitError::Failed { last, reason }) => {
                assert_eq!(last, "ERROR");
                assert_eq!(reason, "status ERROR");
            }
            other => panic!("expected failed, got {other:?}"),
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn fetch_error_propagates() {
        let result: std::result::Result<&str, _> = wait_for(
            &immediate(30),
            || {
                Err(Error::Api {
                    status: 500,
                    message: "boom".into(),
                })
            },
            classify_status,
        );
        assert!(matches!(result, Err(WaitError::Fetch(Error::Api { .. }))));
    }

    #[test]
    fn timeout_converts_with_last_status() {
        let err: WaitError<&str> = WaitError::Timeout {
            attempts: 30,
            last: Some("BUILD"),
        };
        match err.into_error("server web1 to reach ACTIVE", |s| s.to_string()) {
            Error::Timeout { what, last_status } => {
                assert_eq!(what, "server web1 to reach ACTIVE");
                assert_eq!(last_status, "BUILD");
            }
            other => panic!("unexpected: {other}"),
        }
    }
}
