//! Summary command: per-module engagement totals for a replayed log.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use met_core::{Report, SessionId, VisitorId};

use crate::Config;
use crate::commands::replay;

/// Aggregated engagement for one module.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleSummary {
    /// Completed visits.
    pub visits: u32,
    /// Visits that passed the minimum-dwell rule.
    pub committed: u32,
    /// Total dwell across completed visits, in seconds.
    pub dwell_seconds: f64,
    /// Deepest scroll observed in any report.
    pub max_scroll_depth: u8,
    /// Classified interactions.
    pub interactions: u32,
}

/// Folds a report stream into per-module totals.
#[must_use]
pub fn summarize(reports: &[Report]) -> BTreeMap<String, ModuleSummary> {
    let mut summary: BTreeMap<String, ModuleSummary> = BTreeMap::new();
    for report in reports {
        let Some(module) = report.module_name() else {
            continue;
        };
        let entry = summary.entry(module.as_str().to_string()).or_default();
        match report {
            Report::VisitCommitted { scroll_depth, .. } => {
                entry.committed += 1;
                entry.max_scroll_depth = entry.max_scroll_depth.max(scroll_depth.percent());
            }
            Report::VisitActivity {
                dwell_seconds,
                scroll_depth,
                is_final,
                ..
            } => {
                entry.max_scroll_depth = entry.max_scroll_depth.max(scroll_depth.percent());
                if *is_final {
                    entry.visits += 1;
                    entry.dwell_seconds += dwell_seconds;
                }
            }
            Report::Interaction { .. } => entry.interactions += 1,
            Report::SessionEnd { .. } => {}
        }
    }
    summary
}

pub fn run(log: &Path, json: bool, config: &Config) -> Result<()> {
    let events = replay::read_log(log)?;
    // Offline aggregation: the IDs never leave the process.
    let reports = replay::drive(
        &events,
        VisitorId::new("offline")?,
        SessionId::new("offline")?,
        config.engine.clone(),
    );
    let summary = summarize(&reports);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{:<20} {:>7} {:>10} {:>10} {:>11} {:>13}",
        "MODULE", "VISITS", "COMMITTED", "DWELL(S)", "MAX SCROLL", "INTERACTIONS"
    );
    for (module, totals) in &summary {
        println!(
            "{:<20} {:>7} {:>10} {:>10.1} {:>10}% {:>13}",
            module,
            totals.visits,
            totals.committed,
            totals.dwell_seconds,
            totals.max_scroll_depth,
            totals.interactions
        );
    }
    Ok(())
}
