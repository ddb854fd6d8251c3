//! Runs each health check end to end: fetch, normalize, reconcile and, for
//! backups, probe the branches that are behind.

use branchwatch_core::{
    reconcile, BranchId, BusinessClock, PolicyError, RegistryError, RegistryLoader,
    SharedRegistry, ThresholdPolicy,
};
use branchwatch_ingest::{
    BackupAdapter, Checklist, IdPattern, LoadOutcome, LogSizeAdapter, QueryKind, QuerySource,
    RecordAdapter, SpreadsheetSource, UploadSessionAdapter, DEFAULT_SERVER_PREFIX,
};
use branchwatch_probe::ConnectivityProbe;
use chrono::{DateTime, Utc};

use crate::error::CheckError;
use crate::progress::{ProgressReporter, ProgressSink};
use crate::report::{CheckKind, ChecklistReport, HealthReport, ReportStatus};

// ──────────────────────────────────────────────
// Thresholds
// ──────────────────────────────────────────────

/// One policy per monitored dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub upload: ThresholdPolicy,
    pub backup: ThresholdPolicy,
    pub log_size: ThresholdPolicy,
}

impl Thresholds {
    pub fn new(
        upload_staleness_minutes: i64,
        backup_staleness_hours: i64,
        log_size_gb: u64,
    ) -> Result<Self, PolicyError> {
        Ok(Thresholds {
            upload: ThresholdPolicy::staleness_minutes(upload_staleness_minutes)?,
            backup: ThresholdPolicy::staleness_hours(backup_staleness_hours)?,
            log_size: ThresholdPolicy::max_size_gib(log_size_gb)?,
        })
    }
}

// ──────────────────────────────────────────────
// Monitor
// ──────────────────────────────────────────────

pub struct Monitor {
    registry: SharedRegistry,
    clock: BusinessClock,
    thresholds: Thresholds,
    channel_pattern: IdPattern,
    server_pattern: IdPattern,
}

impl Monitor {
    pub fn new(registry: SharedRegistry, clock: BusinessClock, thresholds: Thresholds) -> Self {
        Monitor {
            registry,
            clock,
            thresholds,
            channel_pattern: IdPattern::Digits,
            server_pattern: IdPattern::server_name(DEFAULT_SERVER_PREFIX),
        }
    }

    /// Prefix stripped from server names before reading the branch number.
    pub fn with_server_prefix(mut self, prefix: &str) -> Self {
        self.server_pattern = IdPattern::server_name(prefix);
        self
    }

    pub fn clock(&self) -> &BusinessClock {
        &self.clock
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Swap in a freshly loaded registry. Returns the number of branches.
    pub fn reload_registry(&self, loader: &dyn RegistryLoader) -> Result<usize, RegistryError> {
        self.registry.reload(loader)?;
        Ok(self.registry.snapshot().len())
    }

    /// English display name of a branch, `"Unknown Branch"` if unregistered.
    pub fn branch_name(&self, branch_id: &BranchId) -> String {
        self.registry.snapshot().display_name(branch_id).to_string()
    }

    /// Sales upload freshness, from an uploaded "Upload Sessions" export.
    pub fn check_uploads(
        &self,
        bytes: &[u8],
        spreadsheet: &dyn SpreadsheetSource,
        now: DateTime<Utc>,
        progress: &mut dyn ProgressSink,
    ) -> Result<HealthReport, CheckError> {
        let mut progress = ProgressReporter::new(progress);
        progress.report(10, "Reading upload sessions");
        let table = spreadsheet.parse(bytes)?;

        progress.report(40, "Normalizing upload records");
        let adapter =
            UploadSessionAdapter::new(self.clock).with_id_pattern(self.channel_pattern.clone());
        let outcome = adapter.load(&table)?;

        progress.report(70, "Classifying branches");
        let report = self.classify(CheckKind::Uploads, outcome, self.thresholds.upload, now)?;
        progress.report(100, "Upload check complete");
        Ok(report)
    }

    /// Backup recency from the staging server. When a probe is given, the
    /// servers of branches with missed backups are checked for liveness.
    pub async fn check_backups(
        &self,
        source: &dyn QuerySource,
        probe: Option<&ConnectivityProbe>,
        now: DateTime<Utc>,
        progress: &mut dyn ProgressSink,
    ) -> Result<HealthReport, CheckError> {
        let mut progress = ProgressReporter::new(progress);
        progress.report(10, "Fetching last backup dates");
        tracing::info!(source = %source.describe(), "checking backups");
        let table = source.fetch(QueryKind::AllBackups).await?;

        progress.report(30, "Normalizing backup records");
        let adapter = BackupAdapter::new(self.clock).with_id_pattern(self.server_pattern.clone());
        let outcome = adapter.load(&table)?;

        progress.report(50, "Got last backup date for all branches");
        let mut report = self.classify(CheckKind::Backups, outcome, self.thresholds.backup, now)?;

        if let Some(probe) = probe {
            let late: Vec<BranchId> = report
                .classification
                .unhealthy
                .iter()
                .map(|a| a.branch_id().clone())
                .collect();
            if !late.is_empty() {
                let results = probe
                    .probe_all_with(late, |done, total, outcome| {
                        let label = format!("Pinging branch {}", outcome.branch_id);
                        progress.report_step(50, 99, done, total, &label);
                    })
                    .await;
                report.connectivity = results.into_values().collect();
            }
        }

        progress.report(100, "Backup check complete");
        Ok(report)
    }

    /// Transaction-log sizes from the staging server.
    pub async fn check_log_sizes(
        &self,
        source: &dyn QuerySource,
        now: DateTime<Utc>,
        progress: &mut dyn ProgressSink,
    ) -> Result<HealthReport, CheckError> {
        let mut progress = ProgressReporter::new(progress);
        progress.report(10, "Fetching log file sizes");
        tracing::info!(source = %source.describe(), "checking log sizes");
        let table = source.fetch(QueryKind::AllLogSizes).await?;

        progress.report(50, "Normalizing log size records");
        let adapter = LogSizeAdapter::new().with_id_pattern(self.server_pattern.clone());
        let outcome = adapter.load(&table)?;

        progress.report(80, "Classifying branches");
        let report = self.classify(CheckKind::LogSizes, outcome, self.thresholds.log_size, now)?;
        progress.report(100, "Log size check complete");
        Ok(report)
    }

    /// The new-branch opening checklist.
    pub async fn load_checklist(
        &self,
        source: &dyn QuerySource,
    ) -> Result<ChecklistReport, CheckError> {
        let table = source.fetch(QueryKind::ChecklistSteps).await?;
        let (checklist, diagnostics) = Checklist::from_table(&table)?;
        let completion = checklist.completion();
        tracing::info!(
            categories = checklist.categories.len(),
            done = completion.done,
            total = completion.total,
            "loaded opening checklist"
        );
        Ok(ChecklistReport {
            checklist,
            diagnostics,
        })
    }

    fn classify(
        &self,
        check: CheckKind,
        outcome: LoadOutcome,
        policy: ThresholdPolicy,
        now: DateTime<Utc>,
    ) -> Result<HealthReport, CheckError> {
        let registry = self.registry.snapshot();
        let rows_retained = outcome.rows_retained();
        let classification = reconcile(outcome.records, &registry, &policy, now)?;
        let status = if classification.is_no_data() {
            ReportStatus::NoData
        } else {
            ReportStatus::Complete
        };

        tracing::info!(
            check = %check,
            healthy = classification.healthy.len(),
            unhealthy = classification.unhealthy.len(),
            missing = classification.missing.len(),
            dropped = outcome.diagnostics.len(),
            "classified branches"
        );

        Ok(HealthReport {
            check,
            generated_at: now,
            status,
            policy,
            classification,
            connectivity: Vec::new(),
            diagnostics: outcome.diagnostics,
            rows_read: outcome.rows_read,
            rows_retained,
        })
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
