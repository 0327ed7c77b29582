//! Input events consumed by the engine.
//!
//! Every platform callback the tracker reacts to — intersection callbacks,
//! scroll and input listeners, page visibility changes, mount notifications
//! from the module loader, timer ticks — is expressed as one of these
//! variants. The engine consumes them strictly in timestamp order, which is
//! what makes the interleaving of the dual detection signals replayable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interaction::Control;
use crate::types::ModuleName;

/// A page-level signal observed at some instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    /// The module loader mounted (or re-laid-out) a named content region.
    ModuleMounted {
        module: ModuleName,
        /// Top edge in page coordinates.
        top: f64,
        /// Total content height.
        height: f64,
    },
    /// A module was removed from the page. Treated as an implicit leave.
    ModuleRemoved { module: ModuleName },
    /// Primary visibility signal: the intersection ratio of a module's
    /// region with the viewport crossed a breakpoint.
    Intersection { module: ModuleName, ratio: f64 },
    /// The viewport scrolled or resized.
    ViewportChanged {
        scroll_top: f64,
        viewport_height: f64,
    },
    /// A discrete user input (resets the idle timer).
    Input { kind: InputKind },
    /// The page went to the background (tab hidden).
    PageHidden,
    /// The page returned to the foreground.
    PageVisible,
    /// A click on a tracked control inside a module.
    Click { module: ModuleName, control: Control },
    /// Empty timer tick; forces due deadlines to run.
    Tick,
    /// Page teardown: flush everything and end the session.
    PageUnload,
}

/// The kind of raw user input observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Pointer,
    Key,
    Touch,
    Wheel,
}

/// A [`PageEvent`] stamped with when it occurred.
///
/// This is the unit of the JSONL event log format consumed by `met replay`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimedEvent {
    /// When the event occurred.
    pub at: DateTime<Utc>,
    /// The event itself.
    #[serde(flatten)]
    pub event: PageEvent,
}

impl TimedEvent {
    /// Convenience constructor.
    #[must_use]
    pub const fn new(at: DateTime<Utc>, event: PageEvent) -> Self {
        Self { at, event }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_roundtrip() {
        let event = TimedEvent::new(
            Utc::now(),
            PageEvent::Intersection {
                module: ModuleName::new("hero").unwrap(),
                ratio: 0.6,
            },
        );

        let json = serde_json::to_string(&event).unwrap();
        let parsed: TimedEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, event);
    }

    #[test]
    fn event_log_line_format_is_flat() {
        let event = TimedEvent::new(
            "2026-03-01T10:00:00Z".parse().unwrap(),
            PageEvent::ViewportChanged {
                scroll_top: 120.0,
                viewport_height: 800.0,
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "viewport_changed");
        assert_eq!(json["scroll_top"], 120.0);
        assert!(json.get("event").is_none(), "type tag must be flattened");
    }

    #[test]
    fn event_rejects_empty_module_name() {
        let json = r#"{
            "at": "2026-03-01T10:00:00Z",
            "type": "intersection",
            "module": "",
            "ratio": 0.5
        }"#;
        let result: Result<TimedEvent, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
