use crate::arbiter::{Arbiter, ScoreOutcome};
use crate::config::EngineConfig;
use crate::db::ReportStore;
use crate::error::Result;
use crate::heatmap::{build_heatmap, find_hotspots, Heatmap, Hotspot};
use crate::schema::{Report, ReportSubmission, ScoredReport, VerificationStatus};
use crate::scoring::{compute_authenticity, ScoreInput, ScoreResult};
use crate::snapshot::ActiveSet;
use crate::summary::{summarize, DashboardSummary};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, warn};

/// Submission workflow and dashboard queries over one report store.
///
/// Store calls run on the blocking pool and are awaited one after another;
/// scoring and aggregation are pure functions over the snapshot each call
/// loads for itself.
pub struct HazardEngine<S> {
    store: Arc<S>,
    arbiter: Arc<Arbiter>,
    config: EngineConfig,
}

impl<S: ReportStore + 'static> HazardEngine<S> {
    pub fn new(store: Arc<S>, arbiter: Arc<Arbiter>, config: EngineConfig) -> Self {
        Self {
            store,
            arbiter,
            config,
        }
    }

    pub fn arbiter(&self) -> &Arc<Arbiter> {
        &self.arbiter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn active_set(&self, now: OffsetDateTime) -> Result<ActiveSet> {
        let store = Arc::clone(&self.store);
        let retention = self.config.refresh.retention();
        let reports = tokio::task::spawn_blocking(move || store.active_reports(now, retention))
            .await?
            .inspect_err(|err| warn!("Failed to load active reports: {}", err))?;
        Ok(ActiveSet::within_window(reports, now, retention))
    }

    /// Validate, score once, persist. The score is computed against the
    /// active set as it stood before this report was added.
    pub async fn submit(&self, submission: ReportSubmission, now: OffsetDateTime) -> Result<ScoredReport> {
        let mut report = submission.into_report(uuid::Uuid::new_v4().to_string(), now)?;
        let active = self.active_set(now).await?;
        let scored = self.arbiter.score_report(&mut report, &active).await?;

        let store = Arc::clone(&self.store);
        let id = tokio::task::spawn_blocking(move || store.submit(&report))
            .await?
            .inspect_err(|err| warn!("Failed to store report: {}", err))?;

        info!(
            "Report {} accepted: score {} ({}, {})",
            id,
            scored.authenticity_score,
            scored.score_source.as_str(),
            scored.classification
        );
        Ok(scored)
    }

    /// Arbiter outcome without persisting anything.
    pub async fn preview(&self, submission: ReportSubmission, now: OffsetDateTime) -> Result<ScoreOutcome> {
        let report = submission.into_report("preview", now)?;
        let active = self.active_set(now).await?;
        Ok(self.arbiter.score(ScoreInput::from(&report), &active).await)
    }

    /// Local score with its audit explanation; never calls the remote analyzer.
    pub async fn explain(&self, submission: ReportSubmission, now: OffsetDateTime) -> Result<ScoreResult> {
        let report = submission.into_report("preview", now)?;
        let active = self.active_set(now).await?;
        Ok(compute_authenticity(
            ScoreInput::from(&report),
            &active,
            &self.config.scoring,
        ))
    }

    /// Explicit rescore of a stored report against the current active set.
    pub async fn rescore(&self, id: &str, now: OffsetDateTime) -> Result<ScoredReport> {
        let store = Arc::clone(&self.store);
        let lookup = id.to_string();
        let mut report = tokio::task::spawn_blocking(move || store.get(&lookup)).await??;
        let active = self.active_set(now).await?;
        let scored = self.arbiter.rescore_report(&mut report, &active).await;

        let store = Arc::clone(&self.store);
        let (id, score, source) = (report.id.clone(), scored.authenticity_score, scored.score_source);
        tokio::task::spawn_blocking(move || store.rescore(&id, score, source))
            .await?
            .inspect_err(|err| warn!("Failed to store rescore: {}", err))?;
        Ok(scored)
    }

    pub async fn verify(&self, id: &str) -> Result<Report> {
        self.set_status(id, VerificationStatus::Verified).await
    }

    pub async fn reject(&self, id: &str) -> Result<Report> {
        self.set_status(id, VerificationStatus::Rejected).await
    }

    async fn set_status(&self, id: &str, status: VerificationStatus) -> Result<Report> {
        let store = Arc::clone(&self.store);
        let id = id.to_string();
        tokio::task::spawn_blocking(move || store.set_status(&id, status)).await?
    }

    pub async fn heatmap(&self, now: OffsetDateTime) -> Result<Heatmap> {
        let active = self.active_set(now).await?;
        Ok(build_heatmap(&active, &self.config.heatmap))
    }

    pub async fn hotspots(&self, now: OffsetDateTime) -> Result<Vec<Hotspot>> {
        let active = self.active_set(now).await?;
        Ok(find_hotspots(&active, &self.config.heatmap))
    }

    pub async fn summary(&self, now: OffsetDateTime) -> Result<DashboardSummary> {
        let active = self.active_set(now).await?;
        Ok(summarize(&active))
    }
}
