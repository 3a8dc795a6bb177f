//! Sequential verification of a batch job with checkpoints and per-record retry.
//!
//! Records are processed one at a time, in input order. The deliverability
//! provider and DNS are throttle-sensitive, so latency is traded for
//! predictable load. The record list is treated as copy-on-write: updates
//! replace an element of a working copy by index, and every checkpoint hands
//! the observer its own snapshot.

use crate::core::config::{get_random_sleep_duration, Config};
use crate::core::error::{AppError, Result};
use crate::core::models::{BatchJob, BatchRecord, VerificationResult, VerificationState};
use crate::core::verifier::EmailVerifier;
use crate::services::discovery::DiscoveryService;

use chrono::Utc;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

/// Verifies a single address on behalf of the batch loop.
pub trait AddressVerifier: Send + Sync {
    fn verify_address<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<VerificationResult>>;
}

impl AddressVerifier for EmailVerifier {
    fn verify_address<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<VerificationResult>> {
        Box::pin(self.verify(email))
    }
}

/// Intermediate batch state handed to an observer. Not a persistence commit.
#[derive(Debug, Clone)]
pub struct BatchCheckpoint {
    pub processed: usize,
    pub eligible: usize,
    pub records: Vec<BatchRecord>,
    pub is_final: bool,
}

/// Receives checkpoints while a batch runs.
pub trait CheckpointSink: Send + Sync {
    fn publish(&self, checkpoint: &BatchCheckpoint);
}

impl<F> CheckpointSink for F
where
    F: Fn(&BatchCheckpoint) + Send + Sync,
{
    fn publish(&self, checkpoint: &BatchCheckpoint) {
        self(checkpoint)
    }
}

/// Forwards checkpoints into a tokio channel.
pub struct ChannelSink(pub UnboundedSender<BatchCheckpoint>);

impl CheckpointSink for ChannelSink {
    fn publish(&self, checkpoint: &BatchCheckpoint) {
        if self.0.send(checkpoint.clone()).is_err() {
            tracing::debug!(target: "batch_task", "Checkpoint receiver dropped; discarding checkpoint.");
        }
    }
}

/// Cooperative cancellation, checked between records.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one attempted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub index: usize,
    pub email: String,
    pub result: std::result::Result<VerificationState, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total_records: usize,
    pub eligible: usize,
    pub processed: usize,
    pub verified: usize,
    pub rejected: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    fn from_outcomes(
        total_records: usize,
        eligible: usize,
        outcomes: &[RecordOutcome],
        cancelled: bool,
    ) -> Self {
        let mut summary = BatchSummary {
            total_records,
            eligible,
            processed: outcomes.len(),
            skipped: total_records - eligible,
            cancelled,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome.result {
                Ok(VerificationState::Verified) => summary.verified += 1,
                Ok(_) => summary.rejected += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Turns any record failure into [`AppError::PartialBatchFailure`].
    pub fn ensure_complete(&self) -> Result<()> {
        if self.failed > 0 {
            return Err(AppError::PartialBatchFailure {
                failed: self.failed,
                attempted: self.processed,
            });
        }
        Ok(())
    }
}

/// Result of a `verify_all` run: the updated job plus per-record bookkeeping.
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub job: BatchJob,
    pub outcomes: Vec<RecordOutcome>,
    pub summary: BatchSummary,
}

pub struct BatchOrchestrator {
    config: Arc<Config>,
    verifier: Arc<dyn AddressVerifier>,
    discovery: Arc<dyn DiscoveryService>,
}

impl BatchOrchestrator {
    pub fn new(
        config: Arc<Config>,
        verifier: Arc<dyn AddressVerifier>,
        discovery: Arc<dyn DiscoveryService>,
    ) -> Self {
        Self {
            config,
            verifier,
            discovery,
        }
    }

    /// Verifies every record that has a `found_email` and no verdict yet.
    ///
    /// A checkpoint is published after every `checkpoint_interval` records and
    /// once more after the loop, whatever happened inside it. A failing record
    /// is recorded and the loop moves on.
    pub async fn verify_all(
        &self,
        job: &BatchJob,
        sink: &dyn CheckpointSink,
        cancel: &CancelFlag,
    ) -> BatchRun {
        let start_time = Instant::now();
        let mut working = job.records.clone();
        let work: Vec<usize> = working
            .iter()
            .enumerate()
            .filter(|(_, r)| r.needs_verification())
            .map(|(i, _)| i)
            .collect();
        let eligible = work.len();
        let interval = self.config.checkpoint_interval.max(1);

        tracing::info!(target: "batch_task",
            "[{}] Verifying {} of {} records (checkpoint every {}).",
            job.file_name, eligible, working.len(), interval);

        let mut outcomes = Vec::with_capacity(eligible);
        let mut cancelled = false;

        for (position, &index) in work.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(target: "batch_task",
                    "[{}] Cancelled after {} of {} records.", job.file_name, position, eligible);
                cancelled = true;
                break;
            }

            let Some(email) = working[index].found_email.clone() else {
                continue;
            };
            let record_label = format!("[{} #{}: {}]", job.file_name, index, email);

            let result = match self.verifier.verify_address(&email).await {
                Ok(verification) => {
                    let state = if verification.valid {
                        VerificationState::Verified
                    } else {
                        VerificationState::Rejected
                    };
                    let mut updated = working[index].clone();
                    updated.is_verified = state;
                    updated.email_quality = verification.email_quality;
                    working[index] = updated;
                    tracing::debug!(target: "batch_task", "{} -> {:?} ({})", record_label, state, verification.message);
                    Ok(state)
                }
                Err(e) => {
                    tracing::error!(target: "batch_task", "{} Verification failed: {}", record_label, e);
                    Err(e.to_string())
                }
            };
            outcomes.push(RecordOutcome {
                index,
                email,
                result,
            });

            let processed = position + 1;
            if processed < eligible {
                if processed % interval == 0 {
                    sink.publish(&BatchCheckpoint {
                        processed,
                        eligible,
                        records: working.clone(),
                        is_final: false,
                    });
                }
                let sleep_duration = get_random_sleep_duration(&self.config);
                if !sleep_duration.is_zero() {
                    tracing::trace!(target: "batch_task", "Sleeping {:?} before next record.", sleep_duration);
                    tokio::time::sleep(sleep_duration).await;
                }
            }
        }

        sink.publish(&BatchCheckpoint {
            processed: outcomes.len(),
            eligible,
            records: working.clone(),
            is_final: true,
        });

        let summary = BatchSummary::from_outcomes(working.len(), eligible, &outcomes, cancelled);
        tracing::info!(target: "batch_task",
            "[{}] Batch finished in {:.2?}: {} verified, {} rejected, {} failed, {} skipped{}.",
            job.file_name, start_time.elapsed(), summary.verified, summary.rejected,
            summary.failed, summary.skipped, if cancelled { " (cancelled)" } else { "" });

        BatchRun {
            job: job.with_records(working),
            outcomes,
            summary,
        }
    }

    /// Re-runs discovery for one record and returns a new job with that record replaced.
    ///
    /// The verdict and quality go back to unknown, `retry_count` grows by one
    /// and `last_retry` is stamped. On error the input job is left as it was.
    pub async fn retry(&self, job: &BatchJob, index: usize) -> Result<BatchJob> {
        let record = job.records.get(index).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "record index {} is out of range ({} records)",
                index,
                job.records.len()
            ))
        })?;

        let label = record.identity.label();
        tracing::info!(target: "batch_task", "[{} #{}] Retrying discovery for {}", job.file_name, index, label);
        let found = self.discovery.discover(&record.identity).await.map_err(|e| {
            tracing::error!(target: "batch_task", "[{} #{}] Retry failed: {}", job.file_name, index, e);
            e
        })?;

        let mut updated = record.clone();
        updated.found_email = found.email;
        updated.personal_emails = found.personal_emails;
        updated.is_verified = VerificationState::Unchecked;
        updated.email_quality = None;
        updated.retry_count = updated.retry_count.saturating_add(1);
        updated.last_retry = Some(Utc::now());
        tracing::info!(target: "batch_task", "[{} #{}] Retry #{} found {:?}",
            job.file_name, index, updated.retry_count, updated.found_email);

        let mut records = job.records.clone();
        records[index] = updated;
        Ok(job.with_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::UpstreamKind;
    use crate::core::models::{EmailQuality, Identity};
    use crate::core::test_support::{test_config, FakeMx, FakeProvider};
    use crate::services::discovery::DiscoveredEmails;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;

    /// Fails for listed addresses and tracks how many calls overlap.
    #[derive(Default)]
    struct ScriptedVerifier {
        fail_on: HashSet<String>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl AddressVerifier for ScriptedVerifier {
        fn verify_address<'a>(
            &'a self,
            email: &'a str,
        ) -> BoxFuture<'a, Result<VerificationResult>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                self.seen.lock().push(email.to_string());
                tokio::task::yield_now().await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                if self.fail_on.contains(email) {
                    return Err(AppError::upstream(UpstreamKind::Network, "dns", "boom"));
                }
                let valid = email.starts_with("good");
                Ok(VerificationResult {
                    valid,
                    message: String::new(),
                    email: email.to_string(),
                    is_verified: Some(valid),
                    email_quality: Some(EmailQuality::Business),
                    suggestion: None,
                    details: Default::default(),
                    verified_at: None,
                    confidence: None,
                })
            })
        }
    }

    struct FixedDiscovery(Option<DiscoveredEmails>);

    impl DiscoveryService for FixedDiscovery {
        fn discover<'a>(
            &'a self,
            _identity: &'a Identity,
        ) -> BoxFuture<'a, Result<DiscoveredEmails>> {
            let answer = self.0.clone().ok_or_else(|| {
                AppError::upstream(UpstreamKind::Throttling, "discovery", "slow down")
            });
            Box::pin(async move { answer })
        }
    }

    fn record(email: Option<&str>, state: VerificationState) -> BatchRecord {
        BatchRecord {
            found_email: email.map(str::to_string),
            is_verified: state,
            ..BatchRecord::default()
        }
    }

    fn orchestrator_with(
        config: Config,
        verifier: Arc<dyn AddressVerifier>,
        discovery: Option<DiscoveredEmails>,
    ) -> BatchOrchestrator {
        BatchOrchestrator::new(
            Arc::new(config),
            verifier,
            Arc::new(FixedDiscovery(discovery)),
        )
    }

    fn ignore(_: &BatchCheckpoint) {}

    #[tokio::test]
    async fn ten_records_seven_addresses_make_seven_remote_calls() {
        let domains: Vec<String> = (0..7).map(|i| format!("co{}.io", i)).collect();
        let domain_refs: Vec<&str> = domains.iter().map(String::as_str).collect();
        let mx = Arc::new(FakeMx::with(&domain_refs));
        let provider = Arc::new(FakeProvider::confirming(&["p0@co0.io"]));
        let config = Arc::new(test_config());
        let verifier = EmailVerifier::with_components(config.clone(), mx.clone(), provider.clone());

        let mut records: Vec<BatchRecord> = (0..7)
            .map(|i| {
                let email = format!("p{}@co{}.io", i, i);
                record(Some(&email), VerificationState::Unchecked)
            })
            .collect();
        records.extend((0..3).map(|_| record(None, VerificationState::Unchecked)));
        let job = BatchJob::new("leads.json", records);

        let orchestrator = BatchOrchestrator::new(
            config,
            Arc::new(verifier),
            Arc::new(FixedDiscovery(None)),
        );
        let run = orchestrator.verify_all(&job, &ignore, &CancelFlag::new()).await;

        assert_eq!(provider.calls(), 7);
        assert_eq!(mx.calls(), 7);
        assert_eq!(run.summary.processed, 7);
        assert_eq!(run.summary.verified, 1);
        assert_eq!(run.summary.rejected, 6);
        assert_eq!(run.summary.skipped, 3);
        assert_eq!(run.job.records[0].is_verified, VerificationState::Verified);
        assert_eq!(run.job.records[1].is_verified, VerificationState::Rejected);
        assert_eq!(run.job.records[8].is_verified, VerificationState::Unchecked);
    }

    #[tokio::test]
    async fn already_checked_records_are_left_alone() {
        let verifier = Arc::new(ScriptedVerifier::default());
        let records = vec![
            record(Some("good1@a.io"), VerificationState::Unchecked),
            record(Some("bad@a.io"), VerificationState::Verified),
            record(Some("good2@a.io"), VerificationState::Rejected),
            record(Some("bad2@a.io"), VerificationState::Unchecked),
        ];
        let job = BatchJob::new("x.json", records);
        let orchestrator = orchestrator_with(test_config(), verifier.clone(), None);

        let run = orchestrator.verify_all(&job, &ignore, &CancelFlag::new()).await;

        assert_eq!(verifier.calls.load(Ordering::SeqCst), 2);
        assert_eq!(run.job.records[1], job.records[1]);
        assert_eq!(run.job.records[2], job.records[2]);
        assert_eq!(run.job.records[0].is_verified, VerificationState::Verified);
        assert_eq!(run.job.records[3].is_verified, VerificationState::Rejected);
        assert_eq!(run.job.records[0].email_quality, Some(EmailQuality::Business));
        // The input job is never mutated.
        assert_eq!(job.records[0].is_verified, VerificationState::Unchecked);
    }

    #[tokio::test]
    async fn failures_are_counted_and_do_not_abort() {
        let verifier = Arc::new(ScriptedVerifier {
            fail_on: ["good2@a.io".to_string(), "good4@a.io".to_string()].into(),
            ..Default::default()
        });
        let records = (1..=5)
            .map(|i| record(Some(&format!("good{}@a.io", i)), VerificationState::Unchecked))
            .collect();
        let job = BatchJob::new("x.json", records);
        let orchestrator = orchestrator_with(test_config(), verifier.clone(), None);

        let run = orchestrator.verify_all(&job, &ignore, &CancelFlag::new()).await;

        assert_eq!(run.summary.processed, 5);
        assert_eq!(run.summary.failed, 2);
        assert_eq!(run.summary.verified, 3);
        assert_eq!(run.job.records[1].is_verified, VerificationState::Unchecked);
        assert_eq!(run.job.records[4].is_verified, VerificationState::Verified);
        let failed: Vec<usize> = run
            .outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.index)
            .collect();
        assert_eq!(failed, vec![1, 3]);
        assert!(matches!(
            run.summary.ensure_complete(),
            Err(AppError::PartialBatchFailure {
                failed: 2,
                attempted: 5
            })
        ));
    }

    #[tokio::test]
    async fn processes_in_order_one_at_a_time() {
        let verifier = Arc::new(ScriptedVerifier::default());
        let records = (0..6)
            .map(|i| record(Some(&format!("good{}@a.io", i)), VerificationState::Unchecked))
            .collect();
        let job = BatchJob::new("x.json", records);
        let orchestrator = orchestrator_with(test_config(), verifier.clone(), None);

        let run = orchestrator.verify_all(&job, &ignore, &CancelFlag::new()).await;

        assert_eq!(verifier.max_in_flight.load(Ordering::SeqCst), 1);
        let expected: Vec<String> = (0..6).map(|i| format!("good{}@a.io", i)).collect();
        assert_eq!(*verifier.seen.lock(), expected);
        let indices: Vec<usize> = run.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn checkpoints_every_interval_and_at_the_end() {
        let verifier = Arc::new(ScriptedVerifier::default());
        let records = (0..12)
            .map(|i| record(Some(&format!("good{}@a.io", i)), VerificationState::Unchecked))
            .collect();
        let job = BatchJob::new("x.json", records);
        let orchestrator = orchestrator_with(test_config(), verifier, None);

        let seen = Mutex::new(Vec::new());
        let sink = |cp: &BatchCheckpoint| {
            let verified = cp
                .records
                .iter()
                .filter(|r| r.is_verified == VerificationState::Verified)
                .count();
            seen.lock().push((cp.processed, verified, cp.is_final));
        };
        orchestrator.verify_all(&job, &sink, &CancelFlag::new()).await;

        assert_eq!(
            *seen.lock(),
            vec![(5, 5, false), (10, 10, false), (12, 12, true)]
        );
    }

    #[tokio::test]
    async fn final_checkpoint_published_for_empty_work() {
        let orchestrator = orchestrator_with(test_config(), Arc::new(ScriptedVerifier::default()), None);
        let job = BatchJob::new("x.json", vec![record(None, VerificationState::Unchecked)]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let run = orchestrator
            .verify_all(&job, &ChannelSink(tx), &CancelFlag::new())
            .await;

        let checkpoint = rx.recv().await.expect("final checkpoint");
        assert!(checkpoint.is_final);
        assert_eq!(checkpoint.processed, 0);
        assert_eq!(run.summary.eligible, 0);
        assert_eq!(run.summary.skipped, 1);
    }

    #[tokio::test]
    async fn cancellation_stops_between_records() {
        let verifier = Arc::new(ScriptedVerifier::default());
        let records = (0..6)
            .map(|i| record(Some(&format!("good{}@a.io", i)), VerificationState::Unchecked))
            .collect();
        let job = BatchJob::new("x.json", records);
        let mut config = test_config();
        config.checkpoint_interval = 2;
        let orchestrator = orchestrator_with(config, verifier.clone(), None);

        let cancel = CancelFlag::new();
        let finals = Mutex::new(Vec::new());
        let sink = |cp: &BatchCheckpoint| {
            cancel.cancel();
            finals.lock().push((cp.processed, cp.is_final));
        };
        let run = orchestrator.verify_all(&job, &sink, &cancel).await;

        assert!(run.summary.cancelled);
        assert_eq!(run.summary.processed, 2);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*finals.lock(), vec![(2, false), (2, true)]);
    }

    #[tokio::test]
    async fn retry_resets_verdict_and_counts_up() {
        let found = DiscoveredEmails {
            email: Some("ada@engines.io".into()),
            personal_emails: vec!["ada@gmail.com".into()],
        };
        let orchestrator = orchestrator_with(
            test_config(),
            Arc::new(ScriptedVerifier::default()),
            Some(found),
        );
        let mut original = record(Some("old@engines.io"), VerificationState::Rejected);
        original.email_quality = Some(EmailQuality::Business);
        original.retry_count = 1;
        let job = BatchJob::new(
            "x.json",
            vec![original, record(None, VerificationState::Unchecked)],
        );

        let once = orchestrator.retry(&job, 0).await.unwrap();
        let updated = &once.records[0];
        assert_eq!(updated.found_email.as_deref(), Some("ada@engines.io"));
        assert_eq!(updated.personal_emails, vec!["ada@gmail.com".to_string()]);
        assert_eq!(updated.is_verified, VerificationState::Unchecked);
        assert_eq!(updated.email_quality, None);
        assert_eq!(updated.retry_count, 2);
        assert!(updated.last_retry.is_some());
        assert_eq!(once.records[1], job.records[1]);
        assert_eq!(job.records[0].retry_count, 1);

        let twice = orchestrator.retry(&once, 1).await.unwrap();
        assert_eq!(twice.records[1].retry_count, 1);
        assert_eq!(twice.success_count, 2);
        assert_eq!(twice.records[0], once.records[0]);
    }

    #[tokio::test]
    async fn retry_errors_leave_job_untouched() {
        let orchestrator =
            orchestrator_with(test_config(), Arc::new(ScriptedVerifier::default()), None);
        let job = BatchJob::new(
            "x.json",
            vec![record(Some("a@b.io"), VerificationState::Verified)],
        );

        let err = orchestrator.retry(&job, 0).await.unwrap_err();
        assert_eq!(err.error_type(), "upstream_throttling");
        let err = orchestrator.retry(&job, 5).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(job.records[0].retry_count, 0);
    }

    #[tokio::test]
    async fn retried_record_is_picked_up_by_next_run() {
        let found = DiscoveredEmails {
            email: Some("good-new@a.io".into()),
            personal_emails: vec![],
        };
        let verifier = Arc::new(ScriptedVerifier::default());
        let orchestrator = orchestrator_with(test_config(), verifier.clone(), Some(found));
        let job = BatchJob::new(
            "x.json",
            vec![record(Some("bad@a.io"), VerificationState::Rejected)],
        );

        let retried = orchestrator.retry(&job, 0).await.unwrap();
        let run = orchestrator
            .verify_all(&retried, &ignore, &CancelFlag::new())
            .await;
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(run.job.records[0].is_verified, VerificationState::Verified);
        assert_eq!(run.job.records[0].retry_count, 1);
    }
}
