//! Outbound reports generated by the engine.
//!
//! Each variant maps to one backend call. Field names serialize in the
//! backend's camelCase wire format; the `kind` tag only appears in local
//! JSONL output and is not part of any request body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interaction::InteractionKind;
use crate::types::{ModuleName, ScrollDepth, SessionId, VisitorId};

/// A single fire-and-forget report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    /// A visit survived the minimum dwell time. Sent exactly once per visit.
    #[serde(rename_all = "camelCase")]
    VisitCommitted {
        visitor_id: VisitorId,
        module_name: ModuleName,
        session_id: SessionId,
        visit_number: u32,
        dwell_seconds: f64,
        scroll_depth: ScrollDepth,
    },

    /// Progress for an open visit (heartbeat) or its closing snapshot.
    #[serde(rename_all = "camelCase")]
    VisitActivity {
        visitor_id: VisitorId,
        module_name: ModuleName,
        session_id: SessionId,
        visit_number: u32,
        dwell_seconds: f64,
        scroll_depth: ScrollDepth,
        /// True for the report emitted when the visit closes.
        is_final: bool,
    },

    /// A classified click inside a module with an open visit.
    #[serde(rename_all = "camelCase")]
    Interaction {
        visitor_id: VisitorId,
        session_id: SessionId,
        module_name: ModuleName,
        interaction_kind: InteractionKind,
        detail: String,
        at: DateTime<Utc>,
    },

    /// The session ended (page teardown or explicit end).
    #[serde(rename_all = "camelCase")]
    SessionEnd { session_id: SessionId },
}

impl Report {
    /// The module this report concerns, if any.
    #[must_use]
    pub const fn module_name(&self) -> Option<&ModuleName> {
        match self {
            Self::VisitCommitted { module_name, .. }
            | Self::VisitActivity { module_name, .. }
            | Self::Interaction { module_name, .. } => Some(module_name),
            Self::SessionEnd { .. } => None,
        }
    }
}

/// Converts a millisecond dwell to the wire's fractional seconds.
#[must_use]
pub fn dwell_seconds(dwell_ms: i64) -> f64 {
    #[expect(
        clippy::cast_precision_loss,
        reason = "dwell times are far below 2^52 ms"
    )]
    let ms = dwell_ms.max(0) as f64;
    ms / 1_000.0
}
