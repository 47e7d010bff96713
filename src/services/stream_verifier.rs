//! Stream Verification Service
//!
//! Probes a batch of stream entries concurrently and produces one
//! [`VerificationOutcome`] per entry.
//!
//! Probes are drained from a lazy dispatch queue with at most
//! `concurrency` in flight. Each probe is wrapped in its own deadline, so a
//! stream that never answers costs one slot for `probe_timeout` and nothing
//! more. The run itself can be cancelled, either by the caller's token or by
//! the configured run deadline; in-flight probes are then dropped and every
//! entry still waiting is reported as `TIMEOUT`.

use std::future::pending;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::VerifierConfig;
use crate::errors::{ProbeErrorKind, ProbeOutcome, VerifierError, VerifierResult};
use crate::models::{
    RunCompletion, StreamEntry, VerificationOutcome, VerificationReport, VerificationStatus,
};
use crate::services::stream_prober::{ProbeHeaders, ProbeResult, Prober};
use crate::utils::UrlUtils;

/// Orchestrates probing of a collection of stream entries
///
/// Holds nothing but its prober and configuration; separate runs share no
/// state.
pub struct StreamVerifier {
    prober: Arc<dyn Prober>,
    config: VerifierConfig,
}

/// Why a run stopped dispatching before draining the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interruption {
    Cancelled,
    DeadlineElapsed,
}

impl StreamVerifier {
    /// Create a verifier, rejecting unusable configuration up front
    pub fn new(prober: Arc<dyn Prober>, config: VerifierConfig) -> VerifierResult<Self> {
        if config.concurrency == 0 {
            return Err(VerifierError::invalid_config(
                "concurrency",
                "must be greater than zero",
            ));
        }

        if config.probe_timeout.is_zero() {
            return Err(VerifierError::invalid_config(
                "probe_timeout",
                "must be greater than zero",
            ));
        }

        if config.run_deadline.is_some_and(|deadline| deadline.is_zero()) {
            return Err(VerifierError::invalid_config(
                "run_deadline",
                "must be greater than zero when set",
            ));
        }

        Ok(Self { prober, config })
    }

    /// Verify every entry, stopping early only if the run deadline elapses
    pub async fn run(&self, entries: &[StreamEntry]) -> VerificationReport {
        self.run_with_cancellation(entries, CancellationToken::new())
            .await
    }

    /// Verify every entry until done or until `cancellation` fires
    ///
    /// The returned report always holds exactly `entries.len()` outcomes,
    /// ordered by input position.
    pub async fn run_with_cancellation(
        &self,
        entries: &[StreamEntry],
        cancellation: CancellationToken,
    ) -> VerificationReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let run_started = Instant::now();

        info!(
            "Verification run {} started: {} streams, concurrency {}, probe timeout {}",
            run_id,
            entries.len(),
            self.config.concurrency,
            humantime::format_duration(self.config.probe_timeout)
        );

        let mut slots: Vec<Option<VerificationOutcome>> = vec![None; entries.len()];

        let run_deadline = async {
            match self.config.run_deadline {
                Some(deadline) => sleep(deadline).await,
                None => pending::<()>().await,
            }
        };
        tokio::pin!(run_deadline);

        let mut probes = stream::iter(entries.iter().enumerate())
            .map(|(index, entry)| self.probe_entry(index, entry))
            .buffer_unordered(self.config.concurrency);

        let mut interruption = None;
        loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    interruption = Some(Interruption::Cancelled);
                    break;
                }
                _ = &mut run_deadline => {
                    interruption = Some(Interruption::DeadlineElapsed);
                    break;
                }
                next = probes.next() => match next {
                    Some(outcome) => {
                        debug!(
                            "Stream #{} {} -> {}",
                            outcome.entry_index,
                            UrlUtils::obfuscate_credentials(&outcome.url),
                            outcome.status
                        );
                        let index = outcome.entry_index;
                        slots[index] = Some(outcome);
                    }
                    None => break,
                },
            }
        }

        // Abandon whatever is still in flight or queued.
        drop(probes);

        let pending_count = slots.iter().filter(|slot| slot.is_none()).count();
        let completion = if pending_count > 0 {
            RunCompletion::Aborted
        } else {
            RunCompletion::Completed
        };

        if completion == RunCompletion::Aborted {
            let reason = match interruption {
                Some(Interruption::DeadlineElapsed) => "run deadline elapsed before probe completed",
                _ => "run cancelled before probe completed",
            };
            warn!(
                "Verification run {} aborted with {}/{} streams unverified: {}",
                run_id,
                pending_count,
                entries.len(),
                reason
            );

            let aborted_at = Utc::now();
            let elapsed_ms = run_started.elapsed().as_millis() as u64;
            for (index, slot) in slots.iter_mut().enumerate() {
                if slot.is_none() {
                    *slot = Some(VerificationOutcome {
                        entry_index: index,
                        url: entries[index].url.clone(),
                        status: VerificationStatus::Timeout,
                        detail: Some(reason.to_string()),
                        probed_at: aborted_at,
                        elapsed_ms,
                    });
                }
            }
        }

        let outcomes: Vec<VerificationOutcome> = slots.into_iter().flatten().collect();
        let report = VerificationReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            completion,
            outcomes,
        };

        let summary = report.summary();
        info!(
            "Verification run {} finished in {:?}: {} ok, {} unreachable, {} timeout, {} error",
            run_id,
            run_started.elapsed(),
            summary.ok,
            summary.unreachable,
            summary.timeout,
            summary.error
        );

        report
    }

    async fn probe_entry(&self, index: usize, entry: &StreamEntry) -> VerificationOutcome {
        let headers = ProbeHeaders::from_entry(entry);
        let probe_timeout = self.config.probe_timeout;
        let probed_at = Utc::now();
        let started = Instant::now();

        let (status, detail) = match timeout(
            probe_timeout,
            self.prober.probe(&entry.url, &headers, probe_timeout),
        )
        .await
        {
            Ok(result) => classify(result),
            Err(_) => (
                VerificationStatus::Timeout,
                Some(format!(
                    "probe did not complete within {}",
                    humantime::format_duration(probe_timeout)
                )),
            ),
        };

        VerificationOutcome {
            entry_index: index,
            url: entry.url.clone(),
            status,
            detail,
            probed_at,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Map a prober answer onto a verification status
fn classify(result: ProbeOutcome<ProbeResult>) -> (VerificationStatus, Option<String>) {
    match result {
        Ok(ProbeResult {
            ok: true,
            status_detail,
        }) => (
            VerificationStatus::Ok,
            Some(status_detail).filter(|d| !d.is_empty()),
        ),
        Ok(ProbeResult {
            ok: false,
            status_detail,
        }) => (VerificationStatus::Error, Some(status_detail)),
        Err(err) => {
            let status = match err.kind {
                ProbeErrorKind::ConnectFailed => VerificationStatus::Unreachable,
                ProbeErrorKind::Timeout => VerificationStatus::Timeout,
                ProbeErrorKind::ProtocolError => VerificationStatus::Error,
            };
            (status, Some(err.message))
        }
    }
}
