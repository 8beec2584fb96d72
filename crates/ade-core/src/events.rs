//! Append-only NDJSON event log of a run.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ade_model::{EngineError, ErrorInfo, NoteLevel, PipelineStage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::phase::RunPhase;

/// One line of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunEvent {
    pub event_id: String,
    pub engine_run_id: String,
    pub timestamp: DateTime<Utc>,
    pub level: NoteLevel,
    pub event: String,
    pub message: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Events of one run, kept in memory until the run ends.
#[derive(Debug, Clone)]
pub struct EventLog {
    run_id: String,
    events: Vec<RunEvent>,
}

impl EventLog {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    pub fn record(
        &mut self,
        level: NoteLevel,
        event: impl Into<String>,
        message: impl Into<String>,
        data: Value,
    ) {
        self.push(level, event.into(), message.into(), data, None);
    }

    /// Records entry into `phase`. `data` carries the phase payload; the
    /// phase name is added to it.
    pub fn phase(&mut self, phase: RunPhase, mut data: Value, error: Option<&EngineError>) {
        if let Value::Object(map) = &mut data {
            map.insert("phase".to_string(), json!(phase.as_str()));
        } else {
            data = json!({ "phase": phase.as_str() });
        }
        let level = if error.is_some() {
            NoteLevel::Error
        } else {
            NoteLevel::Info
        };
        let message = match error {
            Some(error) => format!("run failed: {error}"),
            None => format!("run entered {phase}"),
        };
        self.push(
            level,
            format!("run.{phase}"),
            message,
            data,
            error.map(EngineError::to_info),
        );
    }

    fn push(
        &mut self,
        level: NoteLevel,
        event: String,
        message: String,
        data: Value,
        error: Option<ErrorInfo>,
    ) {
        self.events.push(RunEvent {
            event_id: Uuid::new_v4().to_string(),
            engine_run_id: self.run_id.clone(),
            timestamp: Utc::now(),
            level,
            event,
            message,
            data,
            error,
        });
    }

    /// Appends every recorded event to `path`, one JSON object per line.
    pub fn persist(&self, path: &Path) -> Result<(), EngineError> {
        let write_error = |error: &dyn std::fmt::Display| {
            EngineError::unknown(
                PipelineStage::Output,
                format!("write event log {}: {error}", path.display()),
            )
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| write_error(&error))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|error| write_error(&error))?;
        let mut writer = BufWriter::new(file);
        for event in &self.events {
            serde_json::to_writer(&mut writer, event).map_err(|error| write_error(&error))?;
            writer.write_all(b"\n").map_err(|error| write_error(&error))?;
        }
        writer.flush().map_err(|error| write_error(&error))
    }
}

/// Reads an event log written by [`EventLog::persist`].
pub fn read_events(path: &Path) -> Result<Vec<RunEvent>, EngineError> {
    let file = File::open(path).map_err(|error| {
        EngineError::input_path(path, format!("read event log {}: {error}", path.display()))
    })?;
    let mut events = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|error| {
            EngineError::input_path(path, format!("read event log {}: {error}", path.display()))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|error| {
            EngineError::input_path(
                path,
                format!("event log {} line {}: {error}", path.display(), index + 1),
            )
        })?;
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_events_carry_payload_and_phase() {
        let mut log = EventLog::new("run-1");
        log.phase(RunPhase::Extracting, json!({ "sheet_count": 2 }), None);
        let event = &log.events()[0];
        assert_eq!(event.event, "run.extracting");
        assert_eq!(event.engine_run_id, "run-1");
        assert_eq!(event.data["sheet_count"], 2);
        assert_eq!(event.data["phase"], "extracting");
        assert!(event.error.is_none());
    }

    #[test]
    fn failure_event_carries_error() {
        let mut log = EventLog::new("run-1");
        let error = EngineError::input("missing");
        log.phase(RunPhase::Failed, Value::Null, Some(&error));
        let event = &log.events()[0];
        assert_eq!(event.level, NoteLevel::Error);
        assert_eq!(event.data, json!({ "phase": "failed" }));
        assert_eq!(event.error.as_ref().map(|info| info.code.as_str()), Some("input_error"));
    }

    #[test]
    fn persist_appends_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs").join("events.ndjson");
        let mut log = EventLog::new("run-1");
        log.record(NoteLevel::Info, "table.normalized", "done", json!({ "rows": 3 }));
        log.persist(&path).expect("first");
        log.persist(&path).expect("second");

        let events = read_events(&path).expect("read");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], log.events()[0]);
        let raw = fs::read_to_string(&path).expect("raw");
        assert_eq!(raw.lines().count(), 2);
    }
}
