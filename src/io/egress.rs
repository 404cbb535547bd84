//! Decision egress - appends alert decisions and clearance reports to file
//!
//! Records are written in JSONL format (one JSON object per line)
//! to the file specified in config.

use crate::domain::types::{AlertDecision, ClearanceReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Alert,
    Clearance,
}

/// One egressed line
#[derive(Debug, Serialize)]
pub struct DecisionRecord<'a, T: Serialize> {
    pub id: String,
    pub recorded_at: DateTime<Utc>,
    pub site_id: &'a str,
    pub kind: RecordKind,
    pub payload: &'a T,
}

impl<'a, T: Serialize> DecisionRecord<'a, T> {
    pub fn new(site_id: &'a str, kind: RecordKind, payload: &'a T) -> Self {
        Self { id: Uuid::now_v7().to_string(), recorded_at: Utc::now(), site_id, kind, payload }
    }
}

/// Egress writer for decisions
pub struct Egress {
    file_path: String,
    site_id: String,
}

impl Egress {
    pub fn new(file_path: &str, site_id: &str) -> Self {
        info!(file_path = %file_path, "egress_initialized");
        Self { file_path: file_path.to_string(), site_id: site_id.to_string() }
    }

    /// Write an alert decision; returns true if successful
    pub fn write_alert(&self, decision: &AlertDecision) -> bool {
        let ok = self.write_record(RecordKind::Alert, decision);
        if ok {
            debug!(fired = %decision.fired, urgency = %decision.urgency, "alert_egressed");
        }
        ok
    }

    /// Write a clearance report; returns true if successful
    pub fn write_clearance(&self, report: &ClearanceReport) -> bool {
        let ok = self.write_record(RecordKind::Clearance, report);
        if ok {
            debug!(recommendations = %report.recommendations.len(), "clearance_egressed");
        }
        ok
    }

    fn write_record<T: Serialize>(&self, kind: RecordKind, payload: &T) -> bool {
        let record = DecisionRecord::new(&self.site_id, kind, payload);
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                error!(kind = ?kind, error = %e, "egress_serialize_failed");
                return false;
            }
        };

        match self.append_line(&line) {
            Ok(()) => true,
            Err(e) => {
                error!(kind = ?kind, file = %self.file_path, error = %e, "egress_write_failed");
                false
            }
        }
    }

    /// Append a line to the egress file
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "egress_written");

        Ok(())
    }
}
