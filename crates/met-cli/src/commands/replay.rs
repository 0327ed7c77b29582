//! Replay command: drive the engine over a recorded event log.
//!
//! Event logs are JSONL, one [`TimedEvent`] per line, ordered by
//! timestamp. Replay is virtual-time: the engine's deadline machinery
//! runs off event timestamps, so a multi-minute session replays
//! instantly and deterministically.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use uuid::Uuid;

use met_core::{Engine, EngineConfig, Report, SessionId, TimedEvent, VisitorId};

use crate::Config;

/// Reads an event log from a file, or stdin when the path is `-`.
pub fn read_log(path: &Path) -> Result<Vec<TimedEvent>> {
    if path == Path::new("-") {
        parse_events(io::stdin().lock())
    } else {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        parse_events(BufReader::new(file))
    }
}

/// Parses JSONL events, reporting the line number of any malformed entry.
pub fn parse_events(reader: impl BufRead) -> Result<Vec<TimedEvent>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("failed to read event log")?;
        if line.trim().is_empty() {
            continue;
        }
        let event: TimedEvent = serde_json::from_str(&line)
            .with_context(|| format!("invalid event on line {}", index + 1))?;
        events.push(event);
    }
    Ok(events)
}

/// Drives a fresh engine over the events.
///
/// If the log contains no explicit teardown the session is ended at the
/// last event's timestamp, so every replay flushes its open visits.
pub fn drive(
    events: &[TimedEvent],
    visitor: VisitorId,
    session: SessionId,
    config: EngineConfig,
) -> Vec<Report> {
    let Some(first) = events.first() else {
        return Vec::new();
    };
    let mut engine = Engine::new(visitor, session, config, first.at);
    let mut reports = Vec::new();
    let mut last_at = first.at;
    for event in events {
        last_at = last_at.max(event.at);
        reports.extend(engine.handle(event.clone()));
    }
    if !engine.is_ended() {
        reports.extend(engine.end_session(last_at));
    }
    reports
}

/// Picks the visitor ID: flag, then config, then a generated one.
pub fn resolve_visitor(flag: Option<&str>, config: &Config) -> Result<VisitorId> {
    let id = flag
        .map(String::from)
        .or_else(|| config.visitor_id.clone())
        .unwrap_or_else(|| format!("visitor-{}", Uuid::new_v4()));
    VisitorId::new(id).context("invalid visitor ID")
}

/// Picks the session ID: flag, then a generated offline one.
pub fn resolve_session(flag: Option<&str>) -> Result<SessionId> {
    let id = flag
        .map(String::from)
        .unwrap_or_else(|| format!("offline-{}", Uuid::new_v4()));
    SessionId::new(id).context("invalid session ID")
}

pub fn run(
    log: &Path,
    visitor: Option<&str>,
    session: Option<&str>,
    pretty: bool,
    config: &Config,
) -> Result<()> {
    let events = read_log(log)?;
    let visitor = resolve_visitor(visitor, config)?;
    let session = resolve_session(session)?;
    let reports = drive(&events, visitor, session, config.engine.clone());

    tracing::debug!(events = events.len(), reports = reports.len(), "replay complete");
    for report in &reports {
        let line = if pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        println!("{line}");
    }
    Ok(())
}
