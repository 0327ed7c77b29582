//! Core engagement tracking engine.
//!
//! This crate contains the fundamental types and logic for:
//! - Visit lifecycle: per-module viewing episodes with dwell and commit rules
//! - Visibility detection: a primary intersection signal plus geometry scans
//! - Activity monitoring: idle detection and report suppression
//! - Interaction classification: mapping clicks to semantic events
//!
//! The engine is pure and deterministic: it consumes timestamped
//! [`TimedEvent`]s and returns the [`Report`]s to transmit. Transport
//! lives elsewhere.

pub mod config;
pub mod engine;
pub mod event;
pub mod geometry;
pub mod interaction;
pub mod report;
pub mod types;
pub mod visit;

pub use config::EngineConfig;
pub use engine::Engine;
pub use event::{InputKind, PageEvent, TimedEvent};
pub use geometry::{ModuleRegion, PageGeometry, Viewport};
pub use interaction::{Control, InteractionKind, UnknownInteractionKind, classify};
pub use report::{Report, dwell_seconds};
pub use types::{ModuleName, ScrollDepth, SessionId, ValidationError, VisitorId};
pub use visit::{ClosedVisit, Visit, VisitLedger};
