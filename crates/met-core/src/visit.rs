//! Per-module visit state and the session's visit ledger.
//!
//! A visit is one continuous viewing episode of a module. The ledger owns
//! both tables the engine works from: the currently open visit per module
//! and the closed-visit history per module. No other component touches the
//! tables directly; samplers receive a mutable reference to a single open
//! visit and nothing else.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::types::{ModuleName, ScrollDepth};

/// An open viewing episode of a module.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    /// 1-based position of this visit in the module's session history.
    pub number: u32,
    /// When the visit opened.
    pub started_at: DateTime<Utc>,
    /// Last user activity observed while this visit was open.
    pub last_activity_at: DateTime<Utc>,
    /// Running maximum scroll depth.
    pub scroll_depth: ScrollDepth,
    /// True once the minimum-dwell rule has been satisfied.
    pub committed: bool,
    /// True once the committed report has been emitted.
    pub reported: bool,
    /// Non-idle open time accumulated up to `active_anchor`.
    active_accum: Duration,
    /// Instant from which active time is currently accruing. Only advances
    /// the accumulator while the session is not idle.
    active_anchor: DateTime<Utc>,
}

impl Visit {
    fn open(number: u32, at: DateTime<Utc>) -> Self {
        Self {
            number,
            started_at: at,
            last_activity_at: at,
            scroll_depth: ScrollDepth::default(),
            committed: false,
            reported: false,
            active_accum: Duration::zero(),
            active_anchor: at,
        }
    }

    /// Wall-clock time since the visit opened. Keeps running through idle
    /// periods so post-idle reports reflect true dwell.
    #[must_use]
    pub fn wall_dwell_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_milliseconds().max(0)
    }

    /// Non-idle open time accumulated so far.
    #[must_use]
    pub fn active_dwell_ms(&self, now: DateTime<Utc>, idle: bool) -> i64 {
        let mut total = self.active_accum;
        if !idle {
            total += now - self.active_anchor;
        }
        total.num_milliseconds().max(0)
    }

    /// Freezes active-time accrual at `at`. Called when the session goes
    /// idle; the accumulator keeps what was earned.
    pub fn pause_active(&mut self, at: DateTime<Utc>) {
        self.active_accum += (at - self.active_anchor).max(Duration::zero());
        self.active_anchor = at;
    }

    /// Restarts active-time accrual at `at`. Called when the session wakes.
    pub fn resume_active(&mut self, at: DateTime<Utc>) {
        self.active_anchor = at;
    }

    /// The instant the commit rule will be satisfied, given the session is
    /// not idle. None once committed or while idle (no deadline accrues).
    #[must_use]
    pub fn commit_due_at(
        &self,
        min_view_time_ms: i64,
        idle: bool,
    ) -> Option<DateTime<Utc>> {
        if self.committed || idle {
            return None;
        }
        let remaining = Duration::milliseconds(min_view_time_ms) - self.active_accum;
        Some(self.active_anchor + remaining.max(Duration::zero()))
    }

    /// Merges a scroll depth sample into the running maximum.
    pub fn record_depth(&mut self, sample: ScrollDepth) {
        self.scroll_depth.observe(sample);
    }
}

/// A frozen, completed visit.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedVisit {
    pub number: u32,
    pub started_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub scroll_depth: ScrollDepth,
    pub committed: bool,
}

/// Closed-visit history for one module.
#[derive(Debug, Clone, Default)]
struct ModuleHistory {
    closed: Vec<ClosedVisit>,
}

/// The session's visit tables.
#[derive(Debug, Clone, Default)]
pub struct VisitLedger {
    open: BTreeMap<ModuleName, Visit>,
    history: BTreeMap<ModuleName, ModuleHistory>,
}

impl VisitLedger {
    /// Returns true if the module has an open visit.
    #[must_use]
    pub fn is_open(&self, module: &ModuleName) -> bool {
        self.open.contains_key(module)
    }

    /// Returns true if the module has closed visits this session.
    #[must_use]
    pub fn has_history(&self, module: &ModuleName) -> bool {
        self.history
            .get(module)
            .is_some_and(|h| !h.closed.is_empty())
    }

    /// When the module's last visit closed, if any.
    #[must_use]
    pub fn last_closed_at(&self, module: &ModuleName) -> Option<DateTime<Utc>> {
        self.history
            .get(module)?
            .closed
            .last()
            .map(|visit| visit.closed_at)
    }

    /// Opens a new visit for the module with the next sequence number.
    ///
    /// The caller must have checked [`Self::is_open`] first; opening over
    /// an existing visit is a programming error and panics in debug builds.
    pub fn open_visit(&mut self, module: ModuleName, at: DateTime<Utc>) -> &Visit {
        debug_assert!(
            !self.open.contains_key(&module),
            "visit already open for {module}"
        );
        let prior = self.history.get(&module).map_or(0, |h| h.closed.len());
        let number = u32::try_from(prior).unwrap_or(u32::MAX).saturating_add(1);
        self.open.entry(module).or_insert_with(|| Visit::open(number, at))
    }

    /// Closes the module's open visit, moving it into history.
    pub fn close_visit(&mut self, module: &ModuleName, at: DateTime<Utc>) -> Option<Visit> {
        let visit = self.open.remove(module)?;
        self.history
            .entry(module.clone())
            .or_default()
            .closed
            .push(ClosedVisit {
                number: visit.number,
                started_at: visit.started_at,
                closed_at: at,
                scroll_depth: visit.scroll_depth,
                committed: visit.committed,
            });
        Some(visit)
    }

    /// The open visit for a module, if any.
    #[must_use]
    pub fn get_open(&self, module: &ModuleName) -> Option<&Visit> {
        self.open.get(module)
    }

    /// Mutable access to a module's open visit.
    pub fn get_open_mut(&mut self, module: &ModuleName) -> Option<&mut Visit> {
        self.open.get_mut(module)
    }

    /// Iterates open visits in module-name order.
    pub fn open_visits(&self) -> impl Iterator<Item = (&ModuleName, &Visit)> {
        self.open.iter()
    }

    /// Iterates open visits mutably in module-name order.
    pub fn open_visits_mut(&mut self) -> impl Iterator<Item = (&ModuleName, &mut Visit)> {
        self.open.iter_mut()
    }

    /// Module names with an open visit, in name order.
    #[must_use]
    pub fn open_modules(&self) -> Vec<ModuleName> {
        self.open.keys().cloned().collect()
    }

    /// Number of open visits.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Closed visits for a module, oldest first.
    #[must_use]
    pub fn closed_visits(&self, module: &ModuleName) -> &[ClosedVisit] {
        self.history
            .get(module)
            .map_or(&[], |h| h.closed.as_slice())
    }
}
