use crate::hazards::HazardType;
use crate::schema::VerificationStatus;
use crate::snapshot::ActiveSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const HIGH_PRIORITY_SEVERITY: u8 = 4;

/// Operator dashboard counters over one active-set snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DashboardSummary {
    pub total_active: usize,
    pub pending: usize,
    pub verified: usize,
    pub rejected: usize,
    pub by_hazard_type: BTreeMap<HazardType, usize>,
    pub high_priority: usize,
    pub average_authenticity: Option<f64>,
}

pub fn summarize(active: &ActiveSet) -> DashboardSummary {
    let mut summary = DashboardSummary {
        total_active: active.len(),
        pending: 0,
        verified: 0,
        rejected: 0,
        by_hazard_type: BTreeMap::new(),
        high_priority: 0,
        average_authenticity: None,
    };

    let mut score_total = 0u32;
    let mut scored = 0u32;

    for report in active {
        match report.verification_status {
            VerificationStatus::Pending => summary.pending += 1,
            VerificationStatus::Verified => summary.verified += 1,
            VerificationStatus::Rejected => summary.rejected += 1,
        }
        *summary.by_hazard_type.entry(report.hazard_type).or_insert(0) += 1;
        if report.severity >= HIGH_PRIORITY_SEVERITY {
            summary.high_priority += 1;
        }
        if let Some(score) = report.authenticity_score {
            score_total += u32::from(score);
            scored += 1;
        }
    }

    if scored > 0 {
        let average = f64::from(score_total) / f64::from(scored);
        summary.average_authenticity = Some((average * 100.0).round() / 100.0);
    }

    summary
}
