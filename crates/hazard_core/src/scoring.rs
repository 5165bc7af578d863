use crate::config::ScoringConfig;
use crate::hazards::HazardType;
use crate::keywords::match_keywords;
use crate::location::check_location;
use crate::schema::{Classification, Coordinates, Report, Urgency};
use crate::similarity::{corroborating, similarity_contribution, Candidate};
use crate::snapshot::ActiveSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Everything the fallback scorer reads from the report under review.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub id: &'a str,
    pub description: &'a str,
    pub location_name: &'a str,
    pub hazard_type: HazardType,
    pub coordinates: Coordinates,
    pub reporter_id: Option<&'a str>,
}

impl<'a> From<&'a Report> for ScoreInput<'a> {
    fn from(report: &'a Report) -> Self {
        Self {
            id: &report.id,
            description: &report.description,
            location_name: &report.location_name,
            hazard_type: report.hazard_type,
            coordinates: report.coordinates,
            reporter_id: report.reporter_id.as_deref(),
        }
    }
}

/// Per-report audit explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreBreakdown {
    pub keyword_matches: Vec<String>,
    pub keyword_contribution: f64,
    pub region: Option<String>,
    pub location_compatible: bool,
    pub location_contribution: f64,
    pub corroborating_ids: Vec<String>,
    pub similarity_contribution: f64,
    pub length_adjustment: f64,
}

impl ScoreBreakdown {
    pub fn keyword_match_count(&self) -> usize {
        self.keyword_matches.len()
    }

    pub fn corroborating_count(&self) -> usize {
        self.corroborating_ids.len()
    }

    fn raw_total(&self) -> f64 {
        self.keyword_contribution
            + self.location_contribution
            + self.similarity_contribution
            + self.length_adjustment
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreResult {
    pub authenticity_score: u8,
    pub classification: Classification,
    pub urgency: Urgency,
    pub breakdown: ScoreBreakdown,
}

/// Local authenticity score. Deterministic in its arguments: no clock, no
/// randomness, no shared state.
pub fn compute_authenticity(
    input: ScoreInput<'_>,
    active: &ActiveSet,
    config: &ScoringConfig,
) -> ScoreResult {
    let keywords = match_keywords(
        input.description,
        input.hazard_type,
        config.keyword_points,
        config.keyword_weight,
    );

    let location = check_location(input.location_name, input.hazard_type);
    let location_contribution = if location.compatible {
        config.location_weight
    } else {
        0.0
    };

    let candidate = Candidate {
        id: input.id,
        hazard_type: input.hazard_type,
        coordinates: input.coordinates,
        reporter_id: input.reporter_id,
    };
    let nearby = corroborating(
        candidate,
        active,
        config.similarity_box_deg,
        config.distinct_reporters,
    );

    let breakdown = ScoreBreakdown {
        keyword_matches: keywords.matched.iter().map(|k| k.to_string()).collect(),
        keyword_contribution: keywords.contribution,
        region: location.region.map(str::to_string),
        location_compatible: location.compatible,
        location_contribution,
        similarity_contribution: similarity_contribution(nearby.len()),
        corroborating_ids: nearby.iter().map(|r| r.id.clone()).collect(),
        length_adjustment: length_adjustment(input.description, config),
    };

    let authenticity_score = finalize_score(breakdown.raw_total());

    ScoreResult {
        authenticity_score,
        classification: classify(authenticity_score, config.authentic_threshold),
        urgency: Urgency::from_score(authenticity_score),
        breakdown,
    }
}

/// Dispatch ranking: type weight × severity/5 × (1 + cluster bonus), where
/// each corroborating report adds 0.2 to the bonus up to 2.0. Two decimals.
pub fn priority_score(hazard_type: HazardType, severity: u8, corroborating: usize) -> f64 {
    let severity_factor = f64::from(severity) / 5.0;
    let cluster_bonus = (corroborating as f64 * 0.2).min(2.0);
    let raw = hazard_type.heatmap_multiplier() * severity_factor * (1.0 + cluster_bonus);
    (raw * 100.0).round() / 100.0
}

pub fn length_adjustment(description: &str, config: &ScoringConfig) -> f64 {
    let length = description.chars().count();
    if length > config.long_text_threshold {
        config.long_text_bonus
    } else if length < config.short_text_threshold {
        -config.short_text_penalty
    } else {
        0.0
    }
}

pub fn classify(score: u8, authentic_threshold: u8) -> Classification {
    if score >= authentic_threshold {
        Classification::Authentic
    } else {
        Classification::NeedsVerification
    }
}

fn finalize_score(raw: f64) -> u8 {
    let clamped = clamp_score(raw, 0.0, 100.0);
    clamped.round() as u8
}

fn clamp_score(value: f64, floor: f64, ceiling: f64) -> f64 {
    if value.is_nan() {
        return floor;
    }
    value.max(floor).min(ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fixtures::report;

    fn input<'a>(description: &'a str, location: &'a str, hazard_type: HazardType) -> ScoreInput<'a> {
        ScoreInput {
            id: "candidate",
            description,
            location_name: location,
            hazard_type,
            coordinates: Coordinates { lat: 9.97, lng: 76.28 },
            reporter_id: None,
        }
    }

    #[test]
    fn priority_grows_with_cluster_and_caps() {
        assert_eq!(priority_score(HazardType::LineBreak, 5, 0), 1.0);
        assert_eq!(priority_score(HazardType::PowerSurge, 1, 0), 0.12);
        assert_eq!(priority_score(HazardType::PoleDamage, 3, 2), 0.76);
        assert_eq!(priority_score(HazardType::LineBreak, 5, 10), 3.0);
        assert_eq!(priority_score(HazardType::LineBreak, 5, 25), 3.0);
    }

    #[test]
    fn length_adjustment_bands() {
        let config = ScoringConfig::default();
        assert_eq!(length_adjustment(&"x".repeat(51), &config), 5.0);
        assert_eq!(length_adjustment(&"x".repeat(50), &config), 0.0);
        assert_eq!(length_adjustment(&"x".repeat(20), &config), 0.0);
        assert_eq!(length_adjustment(&"x".repeat(19), &config), -10.0);
    }

    #[test]
    fn classification_boundary() {
        assert_eq!(classify(70, 70), Classification::Authentic);
        assert_eq!(classify(69, 70), Classification::NeedsVerification);
    }

    #[test]
    fn clamps_to_score_range() {
        assert_eq!(finalize_score(-12.0), 0);
        assert_eq!(finalize_score(140.0), 100);
        assert_eq!(finalize_score(69.5), 70);
        assert_eq!(finalize_score(f64::NAN), 0);
    }

    #[test]
    fn short_unmatched_text_in_incompatible_region_floors_at_zero() {
        let result = compute_authenticity(
            input("meh", "Munnar", HazardType::PowerSurge),
            &ActiveSet::default(),
            &ScoringConfig::default(),
        );
        assert_eq!(result.authenticity_score, 0);
        assert_eq!(result.breakdown.length_adjustment, -10.0);
        assert!(!result.breakdown.location_compatible);
        assert_eq!(result.urgency, Urgency::Low);
    }

    #[test]
    fn all_signals_reach_authentic_high() {
        let active = ActiveSet::new(vec![
            report("a", HazardType::TransformerFault, 9.9, 76.2),
            report("b", HazardType::TransformerFault, 10.1, 76.3),
            report("c", HazardType::TransformerFault, 9.8, 76.5),
        ]);
        let description = "transformer near the junction is humming loudly and pouring smoke";
        let result = compute_authenticity(
            input(description, "Kochi", HazardType::TransformerFault),
            &active,
            &ScoringConfig::default(),
        );
        // 40 (capped) + 30 + 30 + 5
        assert_eq!(result.authenticity_score, 100);
        assert_eq!(result.classification, Classification::Authentic);
        assert_eq!(result.urgency, Urgency::High);
        assert_eq!(result.breakdown.corroborating_count(), 3);
        assert_eq!(result.breakdown.keyword_match_count(), 3);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let active = ActiveSet::new(vec![report("a", HazardType::LineBreak, 9.9, 76.2)]);
        let config = ScoringConfig::default();
        let first = compute_authenticity(input("line break", "Kochi", HazardType::LineBreak), &active, &config);
        for _ in 0..10 {
            let again = compute_authenticity(input("line break", "Kochi", HazardType::LineBreak), &active, &config);
            assert_eq!(again, first);
        }
    }
}
