//! Corroboration lookup over the active set.
//!
//! Proximity is a ±`box_deg` latitude/longitude window around the candidate,
//! not a great-circle distance. Counting raw rows lets one source flood a
//! location; `distinct_reporters` collapses rows sharing a reporter id and
//! drops rows from the candidate's own reporter.

use crate::hazards::HazardType;
use crate::schema::{Coordinates, Report};
use crate::snapshot::ActiveSet;
use std::collections::HashSet;

/// Identity of the report being scored. It need not be in the active set yet.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub id: &'a str,
    pub hazard_type: HazardType,
    pub coordinates: Coordinates,
    pub reporter_id: Option<&'a str>,
}

impl<'a> From<&'a Report> for Candidate<'a> {
    fn from(report: &'a Report) -> Self {
        Self {
            id: &report.id,
            hazard_type: report.hazard_type,
            coordinates: report.coordinates,
            reporter_id: report.reporter_id.as_deref(),
        }
    }
}

pub fn within_box(a: Coordinates, b: Coordinates, box_deg: f64) -> bool {
    (a.lat - b.lat).abs() <= box_deg && (a.lng - b.lng).abs() <= box_deg
}

/// Other same-type reports inside the box, in snapshot order.
pub fn corroborating<'s>(
    candidate: Candidate<'_>,
    active: &'s ActiveSet,
    box_deg: f64,
    distinct_reporters: bool,
) -> Vec<&'s Report> {
    // The candidate's own reporter counts as already seen.
    let mut seen_reporters: HashSet<String> =
        candidate.reporter_id.map(str::to_string).into_iter().collect();
    active
        .iter()
        .filter(|report| report.id != candidate.id)
        .filter(|report| report.hazard_type == candidate.hazard_type)
        .filter(|report| within_box(candidate.coordinates, report.coordinates, box_deg))
        .filter(|report| {
            if !distinct_reporters {
                return true;
            }
            match report.reporter_id.as_deref() {
                Some(reporter) => seen_reporters.insert(reporter.to_string()),
                None => true,
            }
        })
        .collect()
}

/// Saturating step table: 0 → 0, 1 → 15, 2 → 20, 3 or more → 30.
pub fn similarity_contribution(count: usize) -> f64 {
    match count {
        0 => 0.0,
        1 => 15.0,
        2 => 20.0,
        _ => 30.0,
    }
}
