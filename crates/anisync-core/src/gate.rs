//! Ordered setup gate.
//!
//! Checks run one at a time in the order given. The first check that
//! answers `false` decides the redirect; checks after it are never invoked.
//! A check that cannot answer (transport error or timeout) makes the whole
//! resolution indeterminate rather than passing the user through.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::api::{ApiError, ApiResult};

/// Async predicate future.
pub type CheckFuture = Pin<Box<dyn Future<Output = ApiResult<bool>> + Send>>;
pub type CheckPredicate = Arc<dyn Fn() -> CheckFuture + Send + Sync>;

/// One ordered step of the gate.
#[derive(Clone)]
pub struct GateCheck<T> {
    name: String,
    predicate: CheckPredicate,
    failure_target: T,
}

impl<T: fmt::Debug> fmt::Debug for GateCheck<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateCheck")
            .field("name", &self.name)
            .field("failure_target", &self.failure_target)
            .finish_non_exhaustive()
    }
}

impl<T> GateCheck<T> {
    pub fn new<F, Fut>(name: impl Into<String>, failure_target: T, predicate: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<bool>> + Send + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(move || Box::pin(predicate()) as CheckFuture),
            failure_target,
        }
    }
}

/// Why a check could not produce an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndeterminateReason {
    Failed(ApiError),
    TimedOut(Duration),
}

impl fmt::Display for IndeterminateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndeterminateReason::Failed(err) => write!(f, "{err}"),
            IndeterminateReason::TimedOut(after) => {
                write!(f, "no answer after {}s", after.as_secs_f32())
            }
        }
    }
}

/// Outcome of one gate resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome<T> {
    /// Every check was satisfied.
    Pass,
    /// The named target belongs to the first unsatisfied check.
    Redirect(T),
    /// A check could not be evaluated; no access should be granted.
    Indeterminate {
        check: String,
        reason: IndeterminateReason,
    },
}

impl<T> GateOutcome<T> {
    pub fn is_pass(&self) -> bool {
        matches!(self, GateOutcome::Pass)
    }
}

/// Evaluates gate checks in order with an optional per-check timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateResolver {
    check_timeout: Option<Duration>,
}

impl GateResolver {
    /// `None` lets each check run as long as it takes.
    pub fn new(check_timeout: Option<Duration>) -> Self {
        Self { check_timeout }
    }

    pub async fn resolve<T: Clone>(&self, checks: &[GateCheck<T>]) -> GateOutcome<T> {
        for check in checks {
            let pending = (check.predicate)();
            let answer = match self.check_timeout {
                Some(limit) => match tokio::time::timeout(limit, pending).await {
                    Ok(answer) => answer,
                    Err(_) => {
                        warn!(check = %check.name, "gate check timed out");
                        return GateOutcome::Indeterminate {
                            check: check.name.clone(),
                            reason: IndeterminateReason::TimedOut(limit),
                        };
                    }
                },
                None => pending.await,
            };

            match answer {
                Ok(true) => debug!(check = %check.name, "gate check satisfied"),
                Ok(false) => {
                    debug!(check = %check.name, "gate check failed; redirecting");
                    return GateOutcome::Redirect(check.failure_target.clone());
                }
                Err(err) => {
                    warn!(check = %check.name, error = %err, "gate check could not run");
                    return GateOutcome::Indeterminate {
                        check: check.name.clone(),
                        reason: IndeterminateReason::Failed(err),
                    };
                }
            }
        }

        GateOutcome::Pass
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    fn check(
        log: &CallLog,
        name: &'static str,
        answer: ApiResult<bool>,
    ) -> GateCheck<&'static str> {
        let log = Arc::clone(log);
        GateCheck::new(name, name, move || {
            log.lock().unwrap().push(name);
            let answer = answer.clone();
            async move { answer }
        })
    }

    fn new_log() -> CallLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_first_failure_redirects_and_short_circuits() {
        let log = new_log();
        let checks = vec![
            check(&log, "server-url", Ok(false)),
            check(&log, "token", Ok(true)),
            check(&log, "anilist", Ok(true)),
        ];

        let outcome = GateResolver::default().resolve(&checks).await;

        assert_eq!(outcome, GateOutcome::Redirect("server-url"));
        assert_eq!(*log.lock().unwrap(), vec!["server-url"]);
    }

    #[tokio::test]
    async fn test_middle_failure_skips_later_checks() {
        let log = new_log();
        let checks = vec![
            check(&log, "server-url", Ok(true)),
            check(&log, "token", Ok(false)),
            check(&log, "anilist", Ok(false)),
        ];

        let outcome = GateResolver::default().resolve(&checks).await;

        assert_eq!(outcome, GateOutcome::Redirect("token"));
        assert_eq!(*log.lock().unwrap(), vec!["server-url", "token"]);
    }

    #[tokio::test]
    async fn test_all_pass() {
        let log = new_log();
        let checks = vec![
            check(&log, "server-url", Ok(true)),
            check(&log, "token", Ok(true)),
            check(&log, "anilist", Ok(true)),
        ];

        let outcome = GateResolver::default().resolve(&checks).await;

        assert!(outcome.is_pass());
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_no_checks_pass() {
        let outcome = GateResolver::default().resolve::<&'static str>(&[]).await;
        assert_eq!(outcome, GateOutcome::Pass);
    }

    #[tokio::test]
    async fn test_error_is_indeterminate_not_pass() {
        let log = new_log();
        let checks = vec![
            check(&log, "server-url", Ok(true)),
            check(&log, "token", Err(ApiError::transport("connection refused"))),
            check(&log, "anilist", Ok(false)),
        ];

        let outcome = GateResolver::default().resolve(&checks).await;

        match outcome {
            GateOutcome::Indeterminate { check, reason } => {
                assert_eq!(check, "token");
                assert!(matches!(reason, IndeterminateReason::Failed(_)));
            }
            other => panic!("expected indeterminate, got {other:?}"),
        }
        assert_eq!(*log.lock().unwrap(), vec!["server-url", "token"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_check_times_out() {
        let log = new_log();
        let hung = GateCheck::new("token", "token", || async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(true)
        });
        let checks = vec![
            check(&log, "server-url", Ok(true)),
            hung,
            check(&log, "anilist", Ok(true)),
        ];

        let outcome = GateResolver::new(Some(Duration::from_secs(10)))
            .resolve(&checks)
            .await;

        assert_eq!(
            outcome,
            GateOutcome::Indeterminate {
                check: "token".to_string(),
                reason: IndeterminateReason::TimedOut(Duration::from_secs(10)),
            }
        );
        assert_eq!(*log.lock().unwrap(), vec!["server-url"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_checks_run_sequentially() {
        let in_flight = Arc::new(Mutex::new(0_u32));
        let max_seen = Arc::new(Mutex::new(0_u32));

        let make = |name: &'static str| {
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            GateCheck::new(name, name, move || {
                let in_flight = Arc::clone(&in_flight);
                let max_seen = Arc::clone(&max_seen);
                async move {
                    {
                        let mut n = in_flight.lock().unwrap();
                        *n += 1;
                        let mut max = max_seen.lock().unwrap();
                        *max = (*max).max(*n);
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    *in_flight.lock().unwrap() -= 1;
                    Ok(true)
                }
            })
        };
        let checks = vec![make("a"), make("b"), make("c")];

        assert!(GateResolver::default().resolve(&checks).await.is_pass());
        assert_eq!(*max_seen.lock().unwrap(), 1);
    }
}
