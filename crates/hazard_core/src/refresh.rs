//! Periodic dashboard refresh.
//!
//! Each tick re-probes the analyzer, re-pulls the active set and recomputes
//! the heatmap and hotspots from scratch. Stopping only prevents future
//! ticks; a run already in progress completes and publishes.

use crate::db::ReportStore;
use crate::engine::HazardEngine;
use crate::error::Result;
use crate::heatmap::{build_heatmap, find_hotspots, Heatmap, Hotspot};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct RefreshFrame {
    #[serde(with = "time::serde::rfc3339")]
    pub computed_at: OffsetDateTime,
    pub active_reports: usize,
    pub analyzer_reachable: bool,
    pub heatmap: Heatmap,
    pub hotspots: Vec<Hotspot>,
}

pub struct RefreshHandle {
    stop_tx: watch::Sender<bool>,
    frames: watch::Receiver<Option<RefreshFrame>>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Latest published frame, if any tick has completed.
    pub fn subscribe(&self) -> watch::Receiver<Option<RefreshFrame>> {
        self.frames.clone()
    }

    /// Stops scheduling further ticks and waits for the loop to exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(err) = self.task.await {
            warn!("Refresh task ended abnormally: {}", err);
        }
    }
}

/// One refresh pass at `now`.
pub async fn refresh_once<S: ReportStore + 'static>(
    engine: &HazardEngine<S>,
    now: OffsetDateTime,
) -> Result<RefreshFrame> {
    let analyzer_reachable = engine.arbiter().probe().await;
    let active = engine.active_set(now).await?;
    let config = &engine.config().heatmap;
    Ok(RefreshFrame {
        computed_at: now,
        active_reports: active.len(),
        analyzer_reachable,
        heatmap: build_heatmap(&active, config),
        hotspots: find_hotspots(&active, config),
    })
}

pub fn spawn<S: ReportStore + 'static>(engine: Arc<HazardEngine<S>>, interval: Duration) -> RefreshHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let (frame_tx, frames) = watch::channel(None);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop_rx.changed() => break,
            }
            if *stop_rx.borrow() {
                break;
            }

            match refresh_once(&engine, OffsetDateTime::now_utc()).await {
                Ok(frame) => {
                    debug!(
                        "Refreshed dashboard: {} active reports, {} hotspots",
                        frame.active_reports,
                        frame.hotspots.len()
                    );
                    let _ = frame_tx.send(Some(frame));
                }
                Err(err) => warn!("Dashboard refresh skipped: {}", err),
            }
        }
        debug!("Refresh loop stopped");
    });

    RefreshHandle {
        stop_tx,
        frames,
        task,
    }
}
