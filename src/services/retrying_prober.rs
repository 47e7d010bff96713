//! Retry decorator for probers
//!
//! Wraps any [`Prober`] and re-issues probes that failed with a transient
//! error (connection failure or timeout), backing off between attempts. A
//! stream that answered, even negatively, is never retried.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::errors::{ProbeError, ProbeOutcome};
use crate::services::stream_prober::{ProbeHeaders, ProbeResult, Prober};
use crate::utils::UrlUtils;
use crate::utils::retry::{RetryConfig, calculate_delay};

/// Prober wrapper that retries transient failures
///
/// The timeout handed to [`Prober::probe`] is the budget for all attempts
/// together, backoff delays included. Each attempt is limited to an equal
/// share of the time still left, so a timed-out first attempt leaves room
/// for the next one inside the verifier's per-probe deadline.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use m3u_checker::config::{ProberConfig, VerifierConfig};
/// use m3u_checker::services::{HttpProber, RetryingProber, StreamVerifier};
/// use m3u_checker::utils::retry::RetryConfig;
///
/// # fn build() -> m3u_checker::errors::AppResult<StreamVerifier> {
/// let prober = HttpProber::new(ProberConfig::default())?;
/// let prober = RetryingProber::new(prober, RetryConfig::default());
/// Ok(StreamVerifier::new(Arc::new(prober), VerifierConfig::default())?)
/// # }
/// ```
pub struct RetryingProber<P> {
    inner: P,
    retry_config: RetryConfig,
}

impl<P: Prober> RetryingProber<P> {
    pub fn new(inner: P, retry_config: RetryConfig) -> Self {
        Self {
            inner,
            retry_config,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: Prober> Prober for RetryingProber<P> {
    async fn probe(
        &self,
        url: &str,
        headers: &ProbeHeaders,
        timeout: Duration,
    ) -> ProbeOutcome<ProbeResult> {
        let max_attempts = self.retry_config.max_attempts.max(1);
        let deadline = Instant::now() + timeout;
        let mut attempt = 1;

        loop {
            // Each attempt gets an equal share of what is left of the budget
            let remaining = deadline.saturating_duration_since(Instant::now());
            let attempt_timeout = remaining / (max_attempts - attempt + 1);

            let outcome = match time::timeout(
                attempt_timeout,
                self.inner.probe(url, headers, attempt_timeout),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ProbeError::timeout(format!(
                    "attempt did not complete within {}",
                    humantime::format_duration(attempt_timeout)
                ))),
            };

            let err = match outcome {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(
                            "Probe of {} succeeded on attempt {}/{}",
                            UrlUtils::obfuscate_credentials(url),
                            attempt,
                            max_attempts
                        );
                    }
                    return Ok(result);
                }
                Err(err) => err,
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            let delay = calculate_delay(&self.retry_config, attempt);
            if !err.is_transient() || attempt >= max_attempts || delay >= remaining {
                return Err(err);
            }

            warn!(
                "Probe of {} failed on attempt {}/{}, retrying in {:?}: {}",
                UrlUtils::obfuscate_credentials(url),
                attempt,
                max_attempts,
                delay,
                err
            );
            time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerifierConfig;
    use crate::errors::ProbeErrorKind;
    use crate::models::{StreamEntry, VerificationStatus};
    use crate::services::StreamVerifier;
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Replays a fixed sequence of answers, repeating the last one
    struct ScriptedProber {
        script: Mutex<Vec<ProbeOutcome<ProbeResult>>>,
        calls: AtomicU32,
    }

    impl ScriptedProber {
        fn new(mut script: Vec<ProbeOutcome<ProbeResult>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(
            &self,
            _url: &str,
            _headers: &ProbeHeaders,
            _timeout: Duration,
        ) -> ProbeOutcome<ProbeResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop().unwrap()
            } else {
                script[0].clone()
            }
        }
    }

    fn fast_retries(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    async fn probe(prober: &RetryingProber<ScriptedProber>) -> ProbeOutcome<ProbeResult> {
        prober
            .probe(
                "http://example.com/live.ts",
                &ProbeHeaders::default(),
                Duration::from_secs(1),
            )
            .await
    }

    #[tokio::test]
    async fn test_retries_transient_failures_until_success() {
        let prober = RetryingProber::new(
            ScriptedProber::new(vec![
                Err(ProbeError::connect_failed("refused")),
                Err(ProbeError::timeout("slow")),
                Ok(ProbeResult::ok("HTTP 200 OK")),
            ]),
            fast_retries(3),
        );

        let result = probe(&prober).await.unwrap();
        assert!(result.ok);
        assert_eq!(prober.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let prober = RetryingProber::new(
            ScriptedProber::new(vec![Err(ProbeError::connect_failed("refused"))]),
            fast_retries(3),
        );

        let err = probe(&prober).await.unwrap_err();
        assert_eq!(err.kind, ProbeErrorKind::ConnectFailed);
        assert_eq!(prober.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_protocol_errors_are_not_retried() {
        let prober = RetryingProber::new(
            ScriptedProber::new(vec![Err(ProbeError::protocol("garbage"))]),
            fast_retries(5),
        );

        let err = probe(&prober).await.unwrap_err();
        assert_eq!(err.kind, ProbeErrorKind::ProtocolError);
        assert_eq!(prober.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_negative_answers_are_not_retried() {
        let prober = RetryingProber::new(
            ScriptedProber::new(vec![Ok(ProbeResult::failed("HTTP 404 Not Found"))]),
            fast_retries(5),
        );

        let result = probe(&prober).await.unwrap();
        assert!(!result.ok);
        assert_eq!(prober.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_policy_makes_single_attempt() {
        let prober = RetryingProber::new(
            ScriptedProber::new(vec![Err(ProbeError::timeout("slow"))]),
            RetryConfig::disabled(),
        );

        assert!(probe(&prober).await.is_err());
        assert_eq!(prober.inner().calls.load(Ordering::SeqCst), 1);
    }

    /// Stalls for the whole timeout it is given on the first call, then answers
    struct StallsOnceProber {
        calls: AtomicU32,
        timeouts_seen: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Prober for StallsOnceProber {
        async fn probe(
            &self,
            _url: &str,
            _headers: &ProbeHeaders,
            timeout: Duration,
        ) -> ProbeOutcome<ProbeResult> {
            self.timeouts_seen.lock().unwrap().push(timeout);
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                time::sleep(timeout).await;
                Err(ProbeError::timeout("no data received"))
            } else {
                Ok(ProbeResult::ok("HTTP 200 OK"))
            }
        }
    }

    #[tokio::test]
    async fn test_attempts_share_the_timeout_budget() {
        let inner = StallsOnceProber {
            calls: AtomicU32::new(0),
            timeouts_seen: Mutex::new(Vec::new()),
        };
        let prober = RetryingProber::new(inner, fast_retries(3));

        let result = prober
            .probe(
                "http://example.com/live.ts",
                &ProbeHeaders::default(),
                Duration::from_millis(300),
            )
            .await
            .unwrap();

        assert!(result.ok);
        let seen = prober.inner().timeouts_seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0] <= Duration::from_millis(100));
        assert!(seen.iter().sum::<Duration>() <= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_timed_out_attempt_is_retried_under_verifier_deadline() {
        let inner = StallsOnceProber {
            calls: AtomicU32::new(0),
            timeouts_seen: Mutex::new(Vec::new()),
        };
        let prober = Arc::new(RetryingProber::new(inner, fast_retries(3)));
        let verifier = StreamVerifier::new(
            prober.clone(),
            VerifierConfig {
                concurrency: 1,
                probe_timeout: Duration::from_millis(300),
                run_deadline: None,
            },
        )
        .unwrap();

        let report = verifier
            .run(&[StreamEntry::new("Flaky", "http://example.com/flaky.ts")])
            .await;

        assert_eq!(report.outcomes[0].status, VerificationStatus::Ok);
        assert_eq!(prober.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_budget_stops_retrying() {
        let prober = RetryingProber::new(
            ScriptedProber::new(vec![Err(ProbeError::connect_failed("refused"))]),
            RetryConfig {
                max_attempts: 50,
                initial_delay: Duration::from_millis(20),
                max_delay: Duration::from_millis(20),
                backoff_multiplier: 1.0,
                jitter: false,
            },
        );

        let started = Instant::now();
        let err = prober
            .probe(
                "http://example.com/live.ts",
                &ProbeHeaders::default(),
                Duration::from_millis(100),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind, ProbeErrorKind::ConnectFailed);
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(prober.inner().calls.load(Ordering::SeqCst) < 50);
    }
}
