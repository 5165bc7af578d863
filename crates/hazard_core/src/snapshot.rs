use crate::schema::Report;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

pub const DEFAULT_RETENTION: Duration = Duration::hours(48);

/// Immutable snapshot of the active report set.
///
/// Scoring and aggregation only ever read from a snapshot the caller owns,
/// so concurrent submissions each see a stable view.
#[derive(Debug, Clone, Default)]
pub struct ActiveSet {
    reports: Arc<[Report]>,
}

impl ActiveSet {
    pub fn new(reports: Vec<Report>) -> Self {
        Self {
            reports: reports.into(),
        }
    }

    /// Keeps reports no older than `retention` relative to `now`.
    pub fn within_window(reports: Vec<Report>, now: OffsetDateTime, retention: Duration) -> Self {
        let cutoff = now - retention;
        Self::new(
            reports
                .into_iter()
                .filter(|report| report.timestamp >= cutoff)
                .collect(),
        )
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Report> {
        self.reports.iter()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Report> {
        self.reports.iter().find(|report| report.id == id)
    }

    /// New snapshot with `report` appended; `self` is left untouched.
    pub fn with_report(&self, report: Report) -> Self {
        let mut reports = self.reports.to_vec();
        reports.push(report);
        Self::new(reports)
    }
}

impl<'a> IntoIterator for &'a ActiveSet {
    type Item = &'a Report;
    type IntoIter = std::slice::Iter<'a, Report>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazards::HazardType;
    use crate::schema::fixtures::{report, NOW};

    #[test]
    fn window_drops_expired_reports() {
        let fresh = report("fresh", HazardType::LineBreak, 0.0, 0.0);
        let mut edge = report("edge", HazardType::LineBreak, 0.0, 0.0);
        edge.timestamp = NOW - DEFAULT_RETENTION;
        let mut stale = report("stale", HazardType::LineBreak, 0.0, 0.0);
        stale.timestamp = NOW - DEFAULT_RETENTION - Duration::seconds(1);

        let set = ActiveSet::within_window(vec![fresh, edge, stale], NOW, DEFAULT_RETENTION);
        let ids: Vec<&str> = set.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["fresh", "edge"]);
    }

    #[test]
    fn with_report_leaves_source_set_unchanged() {
        let set = ActiveSet::new(vec![report("a", HazardType::Sparking, 0.0, 0.0)]);
        let grown = set.with_report(report("b", HazardType::Sparking, 0.0, 0.0));
        assert_eq!(set.len(), 1);
        assert_eq!(grown.len(), 2);
        assert!(grown.get("b").is_some());
    }
}
