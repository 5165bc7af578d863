use crate::hazards::HazardType;

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMatch {
    pub matched: Vec<&'static str>,
    pub contribution: f64,
}

impl KeywordMatch {
    pub fn count(&self) -> usize {
        self.matched.len()
    }
}

/// Case-insensitive exact substring match against the hazard's dictionary.
/// Each hit adds `points`, the total is capped at `cap`.
pub fn match_keywords(description: &str, hazard_type: HazardType, points: f64, cap: f64) -> KeywordMatch {
    let lowered = description.to_lowercase();
    let matched: Vec<&'static str> = hazard_type
        .keywords()
        .iter()
        .copied()
        .filter(|keyword| lowered.contains(keyword))
        .collect();
    let contribution = (matched.len() as f64 * points).min(cap);
    KeywordMatch {
        matched,
        contribution,
    }
}
