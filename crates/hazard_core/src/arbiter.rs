//! Chooses between the remote analyzer and the local fallback scorer.
//!
//! Every request ends in exactly one of two terminal states: scored remotely,
//! or scored by the fallback. The remote attempt is bounded by a timeout and
//! never retried.
//!
//! The reachability flag is advisory. Probes and scoring calls race on it
//! without coordination; a stale `true` costs one timeout, a stale `false`
//! skips one remote attempt. Neither affects correctness.

use crate::config::ScoringConfig;
use crate::error::{EngineError, Result};
use crate::remote::{AnalysisRequest, Analyzer, RemoteAnalysis};
use crate::schema::{Classification, Report, ScoreSource, ScoredReport, Urgency};
use crate::scoring::{compute_authenticity, priority_score, ScoreBreakdown, ScoreInput};
use crate::similarity::{corroborating, Candidate};
use crate::snapshot::ActiveSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreOutcome {
    pub authenticity_score: u8,
    pub source: ScoreSource,
    pub classification: Classification,
    pub urgency: Urgency,
    /// Analyzer summary, remote results only.
    pub summary: Option<String>,
    /// Audit explanation, fallback results only.
    pub breakdown: Option<ScoreBreakdown>,
    /// Why the remote path was not used.
    pub fallback_reason: Option<String>,
}

pub struct Arbiter {
    analyzer: Option<Arc<dyn Analyzer>>,
    reachable: AtomicBool,
    timeout: Duration,
    scoring: ScoringConfig,
}

impl Arbiter {
    pub fn new(analyzer: Arc<dyn Analyzer>, timeout: Duration, scoring: ScoringConfig) -> Self {
        Self {
            analyzer: Some(analyzer),
            reachable: AtomicBool::new(true),
            timeout,
            scoring,
        }
    }

    /// Arbiter with no remote analyzer; every request takes the fallback path.
    pub fn fallback_only(scoring: ScoringConfig) -> Self {
        Self {
            analyzer: None,
            reachable: AtomicBool::new(false),
            timeout: Duration::ZERO,
            scoring,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn scoring_config(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Relaxed);
    }

    /// Runs the health probe and refreshes the advisory flag.
    pub async fn probe(&self) -> bool {
        let Some(analyzer) = &self.analyzer else {
            return false;
        };
        let healthy = matches!(
            tokio::time::timeout(self.timeout, analyzer.health()).await,
            Ok(Ok(()))
        );
        let previous = self.reachable.swap(healthy, Ordering::Relaxed);
        if previous != healthy {
            info!("Remote analyzer reachability changed: {} -> {}", previous, healthy);
        }
        healthy
    }

    /// One scoring event. Never fails: remote errors end in the fallback.
    pub async fn score(&self, input: ScoreInput<'_>, active: &ActiveSet) -> ScoreOutcome {
        let analyzer = match &self.analyzer {
            Some(analyzer) if self.is_reachable() => analyzer,
            Some(_) => {
                debug!("Skipping remote analyzer for {}: marked unreachable", input.id);
                return self.fallback(input, active, "marked unreachable".to_string());
            }
            None => {
                return self.fallback(input, active, "no analyzer configured".to_string());
            }
        };

        match self.try_remote(analyzer.as_ref(), input).await {
            Ok(outcome) => {
                debug!("Report {} scored remotely: {}", input.id, outcome.authenticity_score);
                outcome
            }
            Err(err) => {
                warn!("Remote scoring failed for {}, using fallback: {}", input.id, err);
                self.fallback(input, active, err.to_string())
            }
        }
    }

    /// Scores a fresh report and records the result on it.
    pub async fn score_report(&self, report: &mut Report, active: &ActiveSet) -> Result<ScoredReport> {
        if report.is_scored() {
            return Err(EngineError::AlreadyScored(report.id.clone()));
        }
        let outcome = self.score(ScoreInput::from(&*report), active).await;
        report.record_score(outcome.authenticity_score, outcome.source)?;
        Ok(self.scored_view(report, active, outcome))
    }

    /// Explicit rescore; replaces whatever score the report carried.
    pub async fn rescore_report(&self, report: &mut Report, active: &ActiveSet) -> ScoredReport {
        let outcome = self.score(ScoreInput::from(&*report), active).await;
        report.rescore(outcome.authenticity_score, outcome.source);
        self.scored_view(report, active, outcome)
    }

    fn scored_view(&self, report: &Report, active: &ActiveSet, outcome: ScoreOutcome) -> ScoredReport {
        let nearby = corroborating(
            Candidate::from(report),
            active,
            self.scoring.similarity_box_deg,
            self.scoring.distinct_reporters,
        );
        ScoredReport {
            report: report.clone(),
            authenticity_score: outcome.authenticity_score,
            score_source: outcome.source,
            classification: outcome.classification,
            urgency: outcome.urgency,
            summary: outcome.summary,
            priority_score: priority_score(report.hazard_type, report.severity, nearby.len()),
        }
    }

    async fn try_remote(&self, analyzer: &dyn Analyzer, input: ScoreInput<'_>) -> Result<ScoreOutcome> {
        let request = AnalysisRequest {
            description: input.description.to_string(),
            location: input.location_name.to_string(),
        };
        let analysis = tokio::time::timeout(self.timeout, analyzer.analyze(&request))
            .await
            .map_err(|_| {
                EngineError::RemoteUnavailable(format!("timed out after {:?}", self.timeout))
            })??;
        remote_outcome(&analysis)
    }

    fn fallback(&self, input: ScoreInput<'_>, active: &ActiveSet, reason: String) -> ScoreOutcome {
        let result = compute_authenticity(input, active, &self.scoring);
        ScoreOutcome {
            authenticity_score: result.authenticity_score,
            source: ScoreSource::Fallback,
            classification: result.classification,
            urgency: result.urgency,
            summary: None,
            breakdown: Some(result.breakdown),
            fallback_reason: Some(reason),
        }
    }
}

fn remote_outcome(analysis: &RemoteAnalysis) -> Result<ScoreOutcome> {
    let score = analysis.checked_score()?;
    let classification = match analysis.classification.as_str() {
        "Authentic" => Classification::Authentic,
        "Needs Verification" => Classification::NeedsVerification,
        other => {
            return Err(EngineError::MalformedResponse(format!(
                "unknown classification: {other}"
            )));
        }
    };
    let urgency = match analysis.urgency.as_str() {
        "High" => Urgency::High,
        "Medium" => Urgency::Medium,
        "Low" => Urgency::Low,
        _ => Urgency::from_score(score),
    };
    Ok(ScoreOutcome {
        authenticity_score: score,
        source: ScoreSource::Remote,
        classification,
        urgency,
        summary: Some(analysis.summary.clone()),
        breakdown: None,
        fallback_reason: None,
    })
}
