use crate::error::{EngineError, Result};
use crate::schema::{Coordinates, Report, ScoreSource, VerificationStatus};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

/// Read/write surface of the report store the engine consumes.
pub trait ReportStore: Send + Sync {
    /// Persists a newly scored report and returns its id. An id that is
    /// already stored is rejected, never overwritten.
    fn submit(&self, report: &Report) -> Result<String>;

    /// Replaces the stored score after an explicit rescore.
    fn rescore(&self, id: &str, score: u8, source: ScoreSource) -> Result<Report>;

    /// Reports submitted within `window` of `now`.
    fn active_reports(&self, now: OffsetDateTime, window: Duration) -> Result<Vec<Report>>;

    fn get(&self, id: &str) -> Result<Report>;

    /// pending → verified | rejected.
    fn set_status(&self, id: &str, status: VerificationStatus) -> Result<Report>;
}

pub struct SqliteReportStore {
    conn: Mutex<Connection>,
}

impl SqliteReportStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        init(&conn)?;
        info!("Report store opened at {}", db_path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| EngineError::ReportStore("connection lock poisoned".to_string()))
    }
}

fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
          id TEXT PRIMARY KEY,
          lat REAL NOT NULL,
          lng REAL NOT NULL,
          hazard_type TEXT NOT NULL,
          severity INTEGER NOT NULL,
          description TEXT NOT NULL,
          location_name TEXT NOT NULL,
          reporter_id TEXT,
          submitted_at TEXT NOT NULL,
          submitted_unix INTEGER NOT NULL,
          verification_status TEXT NOT NULL,
          authenticity_score INTEGER,
          score_source TEXT,
          inserted_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
        );

        CREATE INDEX IF NOT EXISTS idx_reports_submitted_unix ON reports(submitted_unix);
        "#,
    )?;
    Ok(())
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, lat, lng, hazard_type, severity, description, location_name,
           reporter_id, submitted_at, verification_status, authenticity_score, score_source
    FROM reports
"#;

struct ReportRow {
    id: String,
    lat: f64,
    lng: f64,
    hazard_type: String,
    severity: u8,
    description: String,
    location_name: String,
    reporter_id: Option<String>,
    submitted_at: String,
    verification_status: String,
    authenticity_score: Option<u8>,
    score_source: Option<String>,
}

impl ReportRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            lat: row.get(1)?,
            lng: row.get(2)?,
            hazard_type: row.get(3)?,
            severity: row.get(4)?,
            description: row.get(5)?,
            location_name: row.get(6)?,
            reporter_id: row.get(7)?,
            submitted_at: row.get(8)?,
            verification_status: row.get(9)?,
            authenticity_score: row.get(10)?,
            score_source: row.get(11)?,
        })
    }

    fn into_report(self) -> Result<Report> {
        if !(1..=5).contains(&self.severity) {
            return Err(EngineError::ReportStore(format!(
                "severity {} out of range on {}",
                self.severity, self.id
            )));
        }
        if let Some(score) = self.authenticity_score.filter(|score| *score > 100) {
            return Err(EngineError::ReportStore(format!(
                "authenticity score {} out of range on {}",
                score, self.id
            )));
        }
        let timestamp = OffsetDateTime::parse(&self.submitted_at, &Rfc3339)
            .map_err(|e| EngineError::ReportStore(format!("bad timestamp on {}: {e}", self.id)))?;
        Ok(Report {
            hazard_type: self
                .hazard_type
                .parse()
                .map_err(|_| EngineError::ReportStore(format!("bad hazard type on {}", self.id)))?,
            verification_status: VerificationStatus::parse(&self.verification_status)?,
            score_source: self.score_source.as_deref().map(ScoreSource::parse).transpose()?,
            coordinates: Coordinates {
                lat: self.lat,
                lng: self.lng,
            },
            severity: self.severity,
            description: self.description,
            location_name: self.location_name,
            reporter_id: self.reporter_id,
            authenticity_score: self.authenticity_score,
            timestamp,
            id: self.id,
        })
    }
}

fn fetch(conn: &Connection, id: &str) -> Result<Report> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
    conn.query_row(&sql, params![id], ReportRow::from_row)
        .optional()?
        .ok_or_else(|| EngineError::ReportNotFound(id.to_string()))?
        .into_report()
}

impl ReportStore for SqliteReportStore {
    fn submit(&self, report: &Report) -> Result<String> {
        let submitted_at = report
            .timestamp
            .format(&Rfc3339)
            .map_err(|e| EngineError::ReportStore(e.to_string()))?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO reports (
              id, lat, lng, hazard_type, severity, description, location_name,
              reporter_id, submitted_at, submitted_unix, verification_status,
              authenticity_score, score_source
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                report.id,
                report.coordinates.lat,
                report.coordinates.lng,
                report.hazard_type.as_str(),
                report.severity,
                report.description,
                report.location_name,
                report.reporter_id,
                submitted_at,
                report.timestamp.unix_timestamp(),
                report.verification_status.as_str(),
                report.authenticity_score,
                report.score_source.map(|source| source.as_str()),
            ],
        )
        .map_err(|err| match err {
            rusqlite::Error::SqliteFailure(code, _) if code.code == ErrorCode::ConstraintViolation => {
                EngineError::AlreadyScored(report.id.clone())
            }
            other => EngineError::from(other),
        })?;
        debug!("Stored report {}", report.id);
        Ok(report.id.clone())
    }

    fn active_reports(&self, now: OffsetDateTime, window: Duration) -> Result<Vec<Report>> {
        let cutoff = (now - window).unix_timestamp();
        let conn = self.lock()?;
        let sql = format!("{SELECT_COLUMNS} WHERE submitted_unix >= ?1 ORDER BY submitted_unix, id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![cutoff], ReportRow::from_row)?;

        let mut reports = Vec::new();
        for row in rows {
            reports.push(row?.into_report()?);
        }
        Ok(reports)
    }

    fn get(&self, id: &str) -> Result<Report> {
        let conn = self.lock()?;
        fetch(&conn, id)
    }

    fn rescore(&self, id: &str, score: u8, source: ScoreSource) -> Result<Report> {
        let conn = self.lock()?;
        let mut report = fetch(&conn, id)?;
        report.rescore(score, source);
        conn.execute(
            "UPDATE reports SET authenticity_score = ?1, score_source = ?2 WHERE id = ?3",
            params![report.authenticity_score, source.as_str(), id],
        )?;
        info!("Report {} rescored: {} ({})", id, score, source.as_str());
        Ok(report)
    }

    fn set_status(&self, id: &str, status: VerificationStatus) -> Result<Report> {
        let conn = self.lock()?;
        let mut report = fetch(&conn, id)?;
        report.transition(status)?;
        conn.execute(
            "UPDATE reports SET verification_status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        info!("Report {} marked {}", id, status.as_str());
        Ok(report)
    }
}
