//! Submission, verification and dashboard queries against an on-disk store.

use hazard_core::arbiter::Arbiter;
use hazard_core::config::EngineConfig;
use hazard_core::db::{ReportStore, SqliteReportStore};
use hazard_core::engine::HazardEngine;
use hazard_core::hazards::HazardType;
use hazard_core::refresh;
use hazard_core::schema::{
    Classification, Coordinates, ReportSubmission, ScoreSource, VerificationStatus,
};
use hazard_core::schema::Report;
use hazard_core::EngineError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use time::OffsetDateTime;

fn create_engine() -> (HazardEngine<SqliteReportStore>, Arc<SqliteReportStore>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(
        SqliteReportStore::open(&temp_dir.path().join("reports.db")).expect("Failed to open store"),
    );
    let config = EngineConfig::default();
    let arbiter = Arc::new(Arbiter::fallback_only(config.scoring.clone()));
    let engine = HazardEngine::new(Arc::clone(&store), arbiter, config);
    (engine, store, temp_dir)
}

fn line_break(lat: f64, lng: f64) -> ReportSubmission {
    ReportSubmission {
        coordinates: Coordinates { lat, lng },
        hazard_type: HazardType::LineBreak,
        severity: 5,
        description: "line break wire down".to_string(),
        location_name: "Kochi".to_string(),
        reporter_id: None,
    }
}

#[tokio::test]
async fn submissions_corroborate_each_other() {
    let (engine, store, _temp_dir) = create_engine();
    let now = OffsetDateTime::now_utc();

    let mut scores = Vec::new();
    let mut priorities = Vec::new();
    for i in 0..4 {
        let offset = 0.05 * i as f64;
        let scored = engine.submit(line_break(9.93 + offset, 76.27), now).await.unwrap();
        assert_eq!(scored.score_source, ScoreSource::Fallback);
        scores.push(scored.authenticity_score);
        priorities.push(scored.priority_score);
    }

    assert_eq!(scores, vec![45, 60, 65, 75]);
    assert_eq!(priorities, vec![1.0, 1.2, 1.4, 1.6]);
    let active = store.active_reports(now, time::Duration::hours(48)).unwrap();
    assert_eq!(active.len(), 4);
    assert!(active.iter().all(|r| r.score_source == Some(ScoreSource::Fallback)));
}

#[tokio::test]
async fn invalid_submission_is_not_stored() {
    let (engine, store, _temp_dir) = create_engine();
    let now = OffsetDateTime::now_utc();
    let mut bad = line_break(9.93, 76.27);
    bad.severity = 9;

    let err = engine.submit(bad, now).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidReport(_)));
    assert!(store.active_reports(now, time::Duration::hours(48)).unwrap().is_empty());
}

#[tokio::test]
async fn verify_and_reject_flow() {
    let (engine, _store, _temp_dir) = create_engine();
    let now = OffsetDateTime::now_utc();
    let first = engine.submit(line_break(9.93, 76.27), now).await.unwrap();
    let second = engine.submit(line_break(9.94, 76.28), now).await.unwrap();

    let verified = engine.verify(&first.report.id).await.unwrap();
    assert_eq!(verified.verification_status, VerificationStatus::Verified);
    let rejected = engine.reject(&second.report.id).await.unwrap();
    assert_eq!(rejected.verification_status, VerificationStatus::Rejected);

    assert!(matches!(
        engine.reject(&first.report.id).await,
        Err(EngineError::InvalidTransition { .. })
    ));
    assert!(matches!(engine.verify("missing").await, Err(EngineError::ReportNotFound(_))));

    let summary = engine.summary(now).await.unwrap();
    assert_eq!(summary.total_active, 2);
    assert_eq!(summary.verified, 1);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.high_priority, 2);
}

#[tokio::test]
async fn explain_reports_audit_counts_without_storing() {
    let (engine, store, _temp_dir) = create_engine();
    let now = OffsetDateTime::now_utc();
    for i in 0..3 {
        engine.submit(line_break(9.9 + 0.01 * i as f64, 76.27), now).await.unwrap();
    }

    let result = engine.explain(line_break(9.93, 76.27), now).await.unwrap();
    assert_eq!(result.breakdown.keyword_match_count(), 1);
    assert!(result.breakdown.location_compatible);
    assert_eq!(result.breakdown.corroborating_count(), 3);
    assert_eq!(result.authenticity_score, 75);
    assert_eq!(result.classification, Classification::Authentic);

    let preview = engine.preview(line_break(9.93, 76.27), now).await.unwrap();
    assert_eq!(preview.source, ScoreSource::Fallback);
    assert_eq!(preview.authenticity_score, 75);
    assert_eq!(store.active_reports(now, time::Duration::hours(48)).unwrap().len(), 3);
}

#[tokio::test]
async fn heatmap_and_hotspots_track_the_window() {
    let (engine, _store, _temp_dir) = create_engine();
    let now = OffsetDateTime::now_utc();
    let old = now - time::Duration::hours(72);

    engine.submit(line_break(9.93, 76.27), old).await.unwrap();
    for _ in 0..3 {
        engine.submit(line_break(10.0, 76.3), now).await.unwrap();
    }

    let heatmap = engine.heatmap(now).await.unwrap();
    assert_eq!(heatmap.points.len(), 3);
    assert!(heatmap.points.iter().all(|p| (p.intensity - 1.0).abs() < 1e-9));

    let hotspots = engine.hotspots(now).await.unwrap();
    assert_eq!(hotspots.len(), 1);
    assert_eq!(hotspots[0].report_count, 3);
}

#[tokio::test]
async fn refresh_publishes_frames_until_stopped() {
    let (engine, _store, _temp_dir) = create_engine();
    engine
        .submit(line_break(9.93, 76.27), OffsetDateTime::now_utc())
        .await
        .unwrap();

    let handle = refresh::spawn(Arc::new(engine), Duration::from_millis(20));
    let mut frames = handle.subscribe();
    frames.changed().await.unwrap();
    let frame = frames.borrow_and_update().clone().expect("frame");
    assert_eq!(frame.active_reports, 1);
    assert_eq!(frame.heatmap.points.len(), 1);
    assert!(!frame.analyzer_reachable);

    handle.stop().await;
}

#[tokio::test]
async fn rescore_uses_current_active_set() {
    let (engine, store, _temp_dir) = create_engine();
    let now = OffsetDateTime::now_utc();
    let first = engine.submit(line_break(9.93, 76.27), now).await.unwrap();
    assert_eq!(first.authenticity_score, 45);
    for i in 1..=3 {
        engine.submit(line_break(9.93 + 0.05 * i as f64, 76.27), now).await.unwrap();
    }

    let rescored = engine.rescore(&first.report.id, now).await.unwrap();
    assert_eq!(rescored.authenticity_score, 75);
    assert_eq!(rescored.classification, Classification::Authentic);
    assert_eq!(store.get(&first.report.id).unwrap().authenticity_score, Some(75));
    assert!(matches!(engine.rescore("missing", now).await, Err(EngineError::ReportNotFound(_))));
}

/// Store whose window query fails while `failing` is set.
#[derive(Default)]
struct FlakyStore {
    failing: AtomicBool,
    window_queries: AtomicUsize,
}

impl ReportStore for FlakyStore {
    fn submit(&self, report: &Report) -> hazard_core::Result<String> {
        Err(EngineError::ReportStore(format!("read-only store: {}", report.id)))
    }

    fn rescore(&self, id: &str, _score: u8, _source: ScoreSource) -> hazard_core::Result<Report> {
        Err(EngineError::ReportNotFound(id.to_string()))
    }

    fn active_reports(
        &self,
        _now: OffsetDateTime,
        _window: time::Duration,
    ) -> hazard_core::Result<Vec<Report>> {
        self.window_queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(EngineError::ReportStore("database is locked".to_string()))
        } else {
            Ok(Vec::new())
        }
    }

    fn get(&self, id: &str) -> hazard_core::Result<Report> {
        Err(EngineError::ReportNotFound(id.to_string()))
    }

    fn set_status(&self, id: &str, _status: VerificationStatus) -> hazard_core::Result<Report> {
        Err(EngineError::ReportNotFound(id.to_string()))
    }
}

#[tokio::test]
async fn refresh_skips_ticks_when_store_fails() {
    let store = Arc::new(FlakyStore::default());
    store.failing.store(true, Ordering::SeqCst);
    let config = EngineConfig::default();
    let arbiter = Arc::new(Arbiter::fallback_only(config.scoring.clone()));
    let engine = HazardEngine::new(Arc::clone(&store), arbiter, config);

    let handle = refresh::spawn(Arc::new(engine), Duration::from_millis(10));
    let mut frames = handle.subscribe();

    tokio::time::timeout(Duration::from_secs(5), async {
        while store.window_queries.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("refresh loop kept ticking");
    assert!(frames.borrow().is_none());

    store.failing.store(false, Ordering::SeqCst);
    tokio::time::timeout(Duration::from_secs(5), frames.changed())
        .await
        .expect("frame after recovery")
        .unwrap();
    let frame = frames.borrow_and_update().clone().expect("frame");
    assert_eq!(frame.active_reports, 0);

    tokio::time::timeout(Duration::from_secs(5), handle.stop())
        .await
        .expect("loop stops");
}
