use crate::error::{EngineError, Result};
use crate::hazards::HazardType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(VerificationStatus::Pending),
            "verified" => Ok(VerificationStatus::Verified),
            "rejected" => Ok(VerificationStatus::Rejected),
            _ => Err(EngineError::ReportStore(format!(
                "unknown verification status: {value}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Remote,
    Fallback,
}

impl ScoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreSource::Remote => "remote",
            ScoreSource::Fallback => "fallback",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "remote" => Ok(ScoreSource::Remote),
            "fallback" => Ok(ScoreSource::Fallback),
            _ => Err(EngineError::ReportStore(format!("unknown score source: {value}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Classification {
    Authentic,
    #[serde(rename = "Needs Verification")]
    NeedsVerification,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Authentic => "Authentic",
            Classification::NeedsVerification => "Needs Verification",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Submission-time urgency derived from the authenticity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            Urgency::High
        } else if score >= 50 {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

/// Unscored report as it arrives from a field agent or citizen.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportSubmission {
    pub coordinates: Coordinates,
    pub hazard_type: HazardType,
    pub severity: u8,
    pub description: String,
    pub location_name: String,
    pub reporter_id: Option<String>,
}

impl ReportSubmission {
    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.severity) {
            return Err(EngineError::InvalidReport(format!(
                "severity must be 1-5, got {}",
                self.severity
            )));
        }
        let Coordinates { lat, lng } = self.coordinates;
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(EngineError::InvalidReport(format!("latitude out of range: {lat}")));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(EngineError::InvalidReport(format!("longitude out of range: {lng}")));
        }
        if self.description.trim().is_empty() {
            return Err(EngineError::InvalidReport("description is empty".to_string()));
        }
        Ok(())
    }

    /// Validates and stamps the submission into a pending, unscored report.
    pub fn into_report(self, id: impl Into<String>, timestamp: OffsetDateTime) -> Result<Report> {
        self.validate()?;
        Ok(Report {
            id: id.into(),
            coordinates: self.coordinates,
            hazard_type: self.hazard_type,
            severity: self.severity,
            description: self.description,
            location_name: self.location_name,
            reporter_id: self.reporter_id,
            timestamp,
            verification_status: VerificationStatus::Pending,
            authenticity_score: None,
            score_source: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Report {
    pub id: String,
    pub coordinates: Coordinates,
    pub hazard_type: HazardType,
    pub severity: u8,
    pub description: String,
    pub location_name: String,
    pub reporter_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    #[schemars(with = "String")]
    pub timestamp: OffsetDateTime,
    pub verification_status: VerificationStatus,
    pub authenticity_score: Option<u8>,
    pub score_source: Option<ScoreSource>,
}

impl Report {
    pub fn is_scored(&self) -> bool {
        self.score_source.is_some()
    }

    /// Records the result of the one scoring event a report gets.
    pub fn record_score(&mut self, score: u8, source: ScoreSource) -> Result<()> {
        if self.is_scored() {
            return Err(EngineError::AlreadyScored(self.id.clone()));
        }
        self.apply_score(score, source);
        Ok(())
    }

    /// Explicit overwrite of an earlier score.
    pub fn rescore(&mut self, score: u8, source: ScoreSource) {
        self.apply_score(score, source);
    }

    fn apply_score(&mut self, score: u8, source: ScoreSource) {
        self.authenticity_score = Some(score.min(100));
        self.score_source = Some(source);
    }

    /// Only pending reports may be verified or rejected.
    pub fn transition(&mut self, to: VerificationStatus) -> Result<()> {
        if self.verification_status != VerificationStatus::Pending
            || to == VerificationStatus::Pending
        {
            return Err(EngineError::InvalidTransition {
                id: self.id.clone(),
                from: self.verification_status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        self.verification_status = to;
        Ok(())
    }
}

/// Scored view handed to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoredReport {
    pub report: Report,
    pub authenticity_score: u8,
    pub score_source: ScoreSource,
    pub classification: Classification,
    pub urgency: Urgency,
    pub summary: Option<String>,
    /// Triage rank among reports; see `scoring::priority_score`.
    pub priority_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HeatmapPoint {
    pub lat: f64,
    pub lng: f64,
    pub intensity: f64,
}
