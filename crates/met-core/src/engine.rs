//! The engagement engine: one dispatcher over all page events.
//!
//! # Interleaving model
//!
//! The engine consumes [`TimedEvent`]s strictly in timestamp order. All
//! timer-driven work — idle onset, visit commits, heartbeats, backup
//! visibility scans, scroll depth samples — is expressed as internal
//! deadlines. Before an incoming event is applied, every deadline due at
//! or before its timestamp runs, in global chronological order. There is
//! no other concurrency: the interleaving of the dual detection signals
//! is exactly the order of the events fed in, which makes every scenario
//! replayable without a rendering surface.
//!
//! # Signal idempotency
//!
//! The primary intersection signal and the backup geometry scans feed one
//! entry/exit path, [`Engine::apply_ratio`]-style: opening a module that
//! already has an open visit is a silent no-op, so it never matters which
//! signal wins a race.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::event::{PageEvent, TimedEvent};
use crate::geometry::{ModuleRegion, PageGeometry, Viewport};
use crate::interaction::{Control, classify};
use crate::report::{Report, dwell_seconds};
use crate::types::{ModuleName, ScrollDepth, SessionId, VisitorId};
use crate::visit::VisitLedger;

/// Internal timer work, ordered by (due instant, priority).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Deadline {
    /// The idle timeout expires.
    IdleOnset,
    /// An open visit satisfies the minimum-dwell rule.
    Commit(ModuleName),
    /// Heartbeat reports for all open visits.
    Heartbeat,
    /// Recompute every module's visibility from geometry.
    BackupScan,
    /// Sample scroll depth for all open visits.
    ScrollSample,
}

impl Deadline {
    /// Tie-break order for deadlines due at the same instant. Idle onset
    /// runs first so a commit due at the same instant sees the idle flag.
    const fn priority(&self) -> u8 {
        match self {
            Self::IdleOnset => 0,
            Self::Commit(_) => 1,
            Self::Heartbeat => 2,
            Self::BackupScan => 3,
            Self::ScrollSample => 4,
        }
    }
}

/// Per-session engagement tracking engine.
///
/// Owns the module visit tables, page geometry and idle state for one
/// session. Multiple engines are fully isolated; nothing is process-wide.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    visitor: VisitorId,
    session: SessionId,
    /// Engine clock: the latest instant processed.
    now: DateTime<Utc>,
    idle: bool,
    hidden: bool,
    last_input_at: DateTime<Utc>,
    next_heartbeat_at: DateTime<Utc>,
    next_backup_scan_at: DateTime<Utc>,
    next_scroll_sample_at: DateTime<Utc>,
    geometry: PageGeometry,
    ledger: VisitLedger,
    ended: bool,
}

impl Engine {
    /// Creates an engine for a freshly started session.
    #[must_use]
    pub fn new(
        visitor: VisitorId,
        session: SessionId,
        config: EngineConfig,
        started_at: DateTime<Utc>,
    ) -> Self {
        let next_heartbeat_at = started_at + Duration::milliseconds(config.heartbeat_interval_ms);
        let next_backup_scan_at =
            started_at + Duration::milliseconds(config.backup_scan_interval_ms);
        let next_scroll_sample_at =
            started_at + Duration::milliseconds(config.scroll_sample_interval_ms);
        Self {
            config,
            visitor,
            session,
            now: started_at,
            idle: false,
            hidden: false,
            last_input_at: started_at,
            next_heartbeat_at,
            next_backup_scan_at,
            next_scroll_sample_at,
            geometry: PageGeometry::default(),
            ledger: VisitLedger::default(),
            ended: false,
        }
    }

    /// Processes one event and returns the reports it generated, in the
    /// order they must reach the backend.
    pub fn handle(&mut self, event: TimedEvent) -> Vec<Report> {
        let mut out = Vec::new();
        if self.ended {
            warn!(event = ?event.event, "event after session end ignored");
            return out;
        }

        let at = if event.at < self.now {
            warn!(
                event_at = %event.at,
                engine_at = %self.now,
                "event timestamp regressed, clamping to engine clock"
            );
            self.now
        } else {
            event.at
        };

        self.catch_up(at, &mut out);
        self.apply(event.event, at, &mut out);
        out
    }

    /// Ends the session: closes every open visit with a final activity
    /// report, then emits the session-end report. Idempotent.
    pub fn end_session(&mut self, at: DateTime<Utc>) -> Vec<Report> {
        let mut out = Vec::new();
        if self.ended {
            return out;
        }
        let at = at.max(self.now);
        self.catch_up(at, &mut out);
        self.teardown(at, &mut out);
        out
    }

    /// True once the session has ended.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    /// True while the visitor is considered idle.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.idle
    }

    /// The session's visit tables (read-only).
    #[must_use]
    pub const fn ledger(&self) -> &VisitLedger {
        &self.ledger
    }

    /// The visitor this engine tracks.
    #[must_use]
    pub const fn visitor(&self) -> &VisitorId {
        &self.visitor
    }

    /// The backend-assigned session ID.
    #[must_use]
    pub const fn session(&self) -> &SessionId {
        &self.session
    }

    // ------------------------------------------------------------------
    // Deadline machinery
    // ------------------------------------------------------------------

    fn next_deadline(&self) -> Option<(DateTime<Utc>, Deadline)> {
        let mut candidates: Vec<(DateTime<Utc>, Deadline)> = Vec::new();

        if !self.idle {
            candidates.push((
                self.last_input_at + Duration::milliseconds(self.config.idle_timeout_ms),
                Deadline::IdleOnset,
            ));
        }
        for (module, visit) in self.ledger.open_visits() {
            if let Some(due) = visit.commit_due_at(self.config.min_view_time_ms, self.idle) {
                candidates.push((due, Deadline::Commit(module.clone())));
            }
        }
        candidates.push((self.next_heartbeat_at, Deadline::Heartbeat));
        candidates.push((self.next_backup_scan_at, Deadline::BackupScan));
        candidates.push((self.next_scroll_sample_at, Deadline::ScrollSample));

        candidates
            .into_iter()
            .min_by(|a, b| (a.0, a.1.priority()).cmp(&(b.0, b.1.priority())))
    }

    /// Runs every deadline due at or before `until`, in order.
    fn catch_up(&mut self, until: DateTime<Utc>, out: &mut Vec<Report>) {
        while let Some((due, deadline)) = self.next_deadline() {
            if due > until {
                break;
            }
            self.now = self.now.max(due);
            match deadline {
                Deadline::IdleOnset => self.enter_idle(due),
                Deadline::Commit(module) => self.fire_commit(&module, due, out),
                Deadline::Heartbeat => self.fire_heartbeat(due, out),
                Deadline::BackupScan => {
                    self.next_backup_scan_at =
                        due + Duration::milliseconds(self.config.backup_scan_interval_ms);
                    self.scan_geometry(due, out);
                }
                Deadline::ScrollSample => {
                    self.next_scroll_sample_at =
                        due + Duration::milliseconds(self.config.scroll_sample_interval_ms);
                    self.sample_depths();
                }
            }
        }
        self.now = self.now.max(until);
    }

    fn enter_idle(&mut self, at: DateTime<Utc>) {
        if self.idle {
            return;
        }
        self.idle = true;
        for (_, visit) in self.ledger.open_visits_mut() {
            visit.pause_active(at);
        }
        debug!(at = %at, "session idle");
    }

    /// Records qualifying user input: resets the idle timer, stamps the
    /// open visits and wakes the session unless the page is hidden.
    fn mark_input(&mut self, at: DateTime<Utc>) {
        self.last_input_at = at;
        for (_, visit) in self.ledger.open_visits_mut() {
            visit.last_activity_at = at;
        }
        if self.idle && !self.hidden {
            self.idle = false;
            for (_, visit) in self.ledger.open_visits_mut() {
                visit.resume_active(at);
            }
            debug!(at = %at, "session active");
        }
    }

    fn fire_commit(&mut self, module: &ModuleName, at: DateTime<Utc>, out: &mut Vec<Report>) {
        let Some(visit) = self.ledger.get_open_mut(module) else {
            return;
        };
        if visit.committed || visit.reported {
            return;
        }
        visit.committed = true;
        visit.reported = true;
        debug!(module = %module, visit = visit.number, "visit committed");
        out.push(Report::VisitCommitted {
            visitor_id: self.visitor.clone(),
            module_name: module.clone(),
            session_id: self.session.clone(),
            visit_number: visit.number,
            dwell_seconds: dwell_seconds(visit.wall_dwell_ms(at)),
            scroll_depth: visit.scroll_depth,
        });
    }

    fn fire_heartbeat(&mut self, at: DateTime<Utc>, out: &mut Vec<Report>) {
        self.next_heartbeat_at = at + Duration::milliseconds(self.config.heartbeat_interval_ms);
        if self.idle || self.hidden {
            debug!(at = %at, "heartbeat suppressed");
            return;
        }
        for (module, visit) in self.ledger.open_visits() {
            out.push(Report::VisitActivity {
                visitor_id: self.visitor.clone(),
                module_name: module.clone(),
                session_id: self.session.clone(),
                visit_number: visit.number,
                dwell_seconds: dwell_seconds(visit.wall_dwell_ms(at)),
                scroll_depth: visit.scroll_depth,
                is_final: false,
            });
        }
    }

    /// Backup detection: recompute every known module's ratio from
    /// geometry and feed it through the same entry/exit path the primary
    /// signal uses.
    fn scan_geometry(&mut self, at: DateTime<Utc>, out: &mut Vec<Report>) {
        let modules: Vec<ModuleName> = self.geometry.modules().cloned().collect();
        for module in modules {
            if let Some(ratio) = self.geometry.intersection_ratio(&module) {
                self.apply_ratio(&module, ratio, at, out);
            }
        }
    }

    fn sample_depths(&mut self) {
        let geometry = &self.geometry;
        for (module, visit) in self.ledger.open_visits_mut() {
            if let Some(depth) = geometry.scroll_depth(module) {
                visit.record_depth(depth);
            }
        }
    }

    // ------------------------------------------------------------------
    // Entry / exit
    // ------------------------------------------------------------------

    /// Routes a visibility ratio for one module, from either detection
    /// signal. Entry is idempotent; exit closes the open visit.
    fn apply_ratio(&mut self, module: &ModuleName, ratio: f64, at: DateTime<Utc>, out: &mut Vec<Report>) {
        if self.ledger.is_open(module) {
            if ratio < self.config.reentry_threshold {
                self.leave(module, at, out);
            }
            return;
        }

        let reentry = self.ledger.has_history(module);
        let threshold = if reentry {
            self.config.reentry_threshold
        } else {
            self.config.visibility_threshold
        };
        if ratio < threshold {
            return;
        }

        if reentry {
            if let Some(closed_at) = self.ledger.last_closed_at(module) {
                let away_ms = (at - closed_at).num_milliseconds();
                if away_ms < self.config.min_away_time_ms {
                    debug!(
                        module = %module,
                        away_ms,
                        "re-entry inside debounce window discarded"
                    );
                    return;
                }
            }
        }

        let visit = self.ledger.open_visit(module.clone(), at);
        debug!(module = %module, visit = visit.number, ratio, "visit opened");
        if let Some(depth) = self.geometry.scroll_depth(module) {
            if let Some(open) = self.ledger.get_open_mut(module) {
                open.record_depth(depth);
            }
        }
    }

    /// Closes a module's open visit and emits its final activity report.
    fn leave(&mut self, module: &ModuleName, at: DateTime<Utc>, out: &mut Vec<Report>) {
        let Some(visit) = self.ledger.close_visit(module, at) else {
            return;
        };
        debug!(module = %module, visit = visit.number, "visit closed");
        out.push(Report::VisitActivity {
            visitor_id: self.visitor.clone(),
            module_name: module.clone(),
            session_id: self.session.clone(),
            visit_number: visit.number,
            dwell_seconds: dwell_seconds(visit.wall_dwell_ms(at)),
            scroll_depth: visit.scroll_depth,
            is_final: true,
        });
    }

    // ------------------------------------------------------------------
    // Event application
    // ------------------------------------------------------------------

    fn apply(&mut self, event: PageEvent, at: DateTime<Utc>, out: &mut Vec<Report>) {
        match event {
            PageEvent::ModuleMounted {
                module,
                top,
                height,
            } => {
                self.geometry
                    .upsert_region(module.clone(), ModuleRegion { top, height });
                debug!(module = %module, top, height, "module mounted");
                if let Some(ratio) = self.geometry.intersection_ratio(&module) {
                    self.apply_ratio(&module, ratio, at, out);
                }
            }
            PageEvent::ModuleRemoved { module } => {
                self.geometry.remove_region(&module);
                self.leave(&module, at, out);
            }
            PageEvent::Intersection { module, ratio } => {
                self.apply_ratio(&module, ratio, at, out);
                if let Some(visit) = self.ledger.get_open_mut(&module) {
                    visit.record_depth(ScrollDepth::from_fraction(ratio));
                }
            }
            PageEvent::ViewportChanged {
                scroll_top,
                viewport_height,
            } => {
                self.geometry.set_viewport(Viewport {
                    scroll_top,
                    height: viewport_height,
                });
                self.mark_input(at);
                self.scan_geometry(at, out);
                self.sample_depths();
            }
            PageEvent::Input { kind } => {
                debug!(?kind, "input");
                self.mark_input(at);
            }
            PageEvent::PageHidden => {
                self.hidden = true;
                self.enter_idle(at);
            }
            PageEvent::PageVisible => {
                self.hidden = false;
                self.mark_input(at);
            }
            PageEvent::Click { module, control } => {
                self.handle_click(&module, &control, at, out);
            }
            PageEvent::Tick => {}
            PageEvent::PageUnload => {
                self.teardown(at, out);
            }
        }
    }

    fn handle_click(
        &mut self,
        module: &ModuleName,
        control: &Control,
        at: DateTime<Utc>,
        out: &mut Vec<Report>,
    ) {
        // The click wakes the session, but an interaction arriving while
        // idle is still swallowed: classification uses the pre-click state.
        let was_idle = self.idle;
        self.mark_input(at);
        if was_idle {
            debug!(module = %module, "interaction while idle dropped");
            return;
        }
        if !self.ledger.is_open(module) {
            debug!(module = %module, "interaction without open visit dropped");
            return;
        }
        let (kind, detail) = classify(control);
        out.push(Report::Interaction {
            visitor_id: self.visitor.clone(),
            session_id: self.session.clone(),
            module_name: module.clone(),
            interaction_kind: kind,
            detail,
            at,
        });
    }

    fn teardown(&mut self, at: DateTime<Utc>, out: &mut Vec<Report>) {
        if self.ended {
            return;
        }
        for module in self.ledger.open_modules() {
            self.leave(&module, at, out);
        }
        out.push(Report::SessionEnd {
            session_id: self.session.clone(),
        });
        self.ended = true;
        debug!(at = %at, "session ended");
    }
}
