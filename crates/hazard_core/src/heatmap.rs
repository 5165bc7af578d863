//! Heatmap and hotspot aggregation over the active set.
//!
//! Both are recomputed from scratch on every call; nothing is cached between
//! requests.

use crate::config::HeatmapConfig;
use crate::hazards::HazardType;
use crate::schema::{HeatmapPoint, Report};
use crate::snapshot::ActiveSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Point list plus the pass-through parameters the map renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Heatmap {
    pub points: Vec<HeatmapPoint>,
    pub radius: u32,
    pub blur: u32,
    /// Individual markers are only drawn at or above this zoom. The point list
    /// always carries the full active set regardless.
    pub marker_min_zoom: u8,
}

/// Severity is 1..=5 on every report that reaches an active set.
pub fn intensity(report: &Report, intensity_scale: f64) -> f64 {
    let severity = f64::from(report.severity);
    (severity / 5.0) * report.hazard_type.heatmap_multiplier() * intensity_scale
}

pub fn build_heatmap(active: &ActiveSet, config: &HeatmapConfig) -> Heatmap {
    let points = active
        .iter()
        .map(|report| HeatmapPoint {
            lat: report.coordinates.lat,
            lng: report.coordinates.lng,
            intensity: intensity(report, config.intensity_scale),
        })
        .collect();

    Heatmap {
        points,
        radius: config.radius,
        blur: config.blur,
        marker_min_zoom: config.marker_min_zoom,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Hotspot {
    pub latitude: f64,
    pub longitude: f64,
    pub report_count: usize,
    pub average_severity: f64,
    pub hazard_types: Vec<HazardType>,
    pub threat_level: ThreatLevel,
}

#[derive(Default)]
struct Cell {
    count: usize,
    total_severity: u32,
    hazard_types: BTreeSet<HazardType>,
}

/// Grid-bucketed clusters of at least `hotspot_min_reports` reports, busiest
/// and most severe first.
pub fn find_hotspots(active: &ActiveSet, config: &HeatmapConfig) -> Vec<Hotspot> {
    let grid = config.hotspot_grid_deg;
    let mut cells: BTreeMap<(i64, i64), Cell> = BTreeMap::new();

    for report in active {
        let key = (
            (report.coordinates.lat / grid).round() as i64,
            (report.coordinates.lng / grid).round() as i64,
        );
        let cell = cells.entry(key).or_default();
        cell.count += 1;
        cell.total_severity += u32::from(report.severity);
        cell.hazard_types.insert(report.hazard_type);
    }

    let mut hotspots: Vec<((i64, i64), Hotspot)> = cells
        .into_iter()
        .filter(|(_, cell)| cell.count >= config.hotspot_min_reports.max(1))
        .map(|(key, cell)| {
            let average = f64::from(cell.total_severity) / cell.count as f64;
            let hotspot = Hotspot {
                latitude: key.0 as f64 * grid,
                longitude: key.1 as f64 * grid,
                report_count: cell.count,
                average_severity: round_to(average, 2),
                hazard_types: cell.hazard_types.into_iter().collect(),
                threat_level: if average >= 3.5 {
                    ThreatLevel::High
                } else {
                    ThreatLevel::Medium
                },
            };
            (key, hotspot)
        })
        .collect();

    hotspots.sort_by(|(key_a, a), (key_b, b)| {
        let weight_a = a.report_count as f64 * a.average_severity;
        let weight_b = b.report_count as f64 * b.average_severity;
        weight_b.total_cmp(&weight_a).then_with(|| key_a.cmp(key_b))
    });

    hotspots.into_iter().map(|(_, hotspot)| hotspot).collect()
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
