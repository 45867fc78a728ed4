//! Audit Engine
//!
//! Sampler → MetadataProvider → KeyClassifier → StatsAggregator, one key at
//! a time:
//!
//! ```text
//! ┌─────────┐  key   ┌──────────────────┐ KeyRecord ┌───────────────┐
//! │ Sampler │───────>│ MetadataProvider │──────────>│ KeyClassifier │
//! └─────────┘        └──────────────────┘           └───────┬───────┘
//!                                                           │ GroupId
//!                                                           ▼
//!                                                  ┌─────────────────┐
//!                                                  │ StatsAggregator │
//!                                                  └─────────────────┘
//! ```
//!
//! A key whose metadata cannot be fetched is logged and skipped. Only a
//! connection failure ends the run early.

pub mod classifier;
pub mod sampler;
pub mod stats;

#[cfg(test)]
mod testing;

pub use classifier::{ClassifierConfig, GroupId, GroupRule, KeyClassifier, MatchThreshold};
pub use sampler::{Progress, ProgressTracker, SampleMode, SamplePlan, Sampler};
pub use stats::{KeyStats, StatsAggregator, MAX_SAMPLE_KEYS};

use crate::metadata::{KeyRecord, MetadataProvider, ProviderError};
use tracing::{debug, info, warn};

/// Outcome of a completed run, handed to the report generator.
#[derive(Debug, Clone)]
pub struct AuditReport {
    /// Key count reported by the store at the start
    pub db_size: u64,
    pub plan: SamplePlan,
    pub groups: StatsAggregator,
    /// Keys folded into a group
    pub sampled: u64,
    /// Keys whose metadata could not be fetched
    pub skipped: u64,
}

/// Drives one audit run against a provider.
pub struct Auditor<P> {
    provider: P,
    classifier: KeyClassifier,
    groups: StatsAggregator,
    sampled: u64,
    skipped: u64,
}

impl<P: MetadataProvider> Auditor<P> {
    pub fn new(provider: P, classifier: KeyClassifier) -> Self {
        Self {
            provider,
            classifier,
            groups: StatsAggregator::new(),
            sampled: 0,
            skipped: 0,
        }
    }

    /// Samples keys per `requested` (None or 0 means the default share)
    /// and returns the aggregated statistics together with the provider.
    pub async fn run(mut self, requested: Option<u64>) -> Result<(AuditReport, P), ProviderError> {
        let db_size = self.provider.total_key_count().await?;
        let plan = SamplePlan::new(requested, db_size);

        match plan.mode {
            SampleMode::Sample { size } => info!(size, db_size, "Sampling keys"),
            SampleMode::Exhaustive => info!(db_size, "Auditing every key"),
        }

        let mut sampler = Sampler::new(plan);
        let mut progress = ProgressTracker::new(plan.planned());

        while let Some(key) = sampler.next_key(&mut self.provider).await? {
            self.audit_key(&key).await?;
            if let Some(checkpoint) = progress.advance() {
                info!(
                    completed = checkpoint.completed,
                    planned = checkpoint.planned,
                    "{}",
                    checkpoint
                );
            }
        }

        info!(
            sampled = self.sampled,
            skipped = self.skipped,
            groups = self.groups.len(),
            "Audit complete"
        );

        let report = AuditReport {
            db_size,
            plan,
            groups: self.groups,
            sampled: self.sampled,
            skipped: self.skipped,
        };
        Ok((report, self.provider))
    }

    /// Fetches one key's metadata and folds it into its group.
    ///
    /// Per-key failures are logged and counted; only fatal provider errors
    /// are returned.
    pub async fn audit_key(&mut self, key: &[u8]) -> Result<(), ProviderError> {
        match self.provider.fetch_metadata(key).await {
            Ok(record) => {
                self.record(&record);
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(key = %String::from_utf8_lossy(key), error = %e, "Skipping key");
                self.skipped += 1;
                Ok(())
            }
        }
    }

    /// Classifies `record` against the groups seen so far and folds it in.
    fn record(&mut self, record: &KeyRecord) {
        let group = self
            .classifier
            .classify(&record.key, &record.key_type, self.groups.group_ids());
        debug!(key = %record.key, group = %group, "Classified key");
        self.groups.fold(group, record);
        self.sampled += 1;
    }
}
