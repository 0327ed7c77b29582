//! Send command: replay a log and transmit its reports to the backend.

use std::path::Path;

use anyhow::{Context, Result};

use met_api::{BootstrapConfig, Client, IdentityProvider};
use met_core::{SessionId, VisitorId};

use crate::Config;
use crate::commands::replay;

/// Identity provider backed by flag/config values.
///
/// A missing value never resolves, so the bootstrap's bounded retry
/// exhausts its attempts and tracking stays disabled, same as a live
/// page whose identity never arrives.
struct ConfigIdentity {
    visitor: Option<VisitorId>,
}

impl IdentityProvider for ConfigIdentity {
    fn current_identity(&self) -> Option<VisitorId> {
        self.visitor.clone()
    }
}

/// Outcome of a transmission run.
#[derive(Debug)]
pub struct SendReport {
    pub session: SessionId,
    pub transmitted: usize,
}

pub fn run(
    log: &Path,
    endpoint: Option<String>,
    visitor: Option<String>,
    config: &Config,
) -> Result<SendReport> {
    let endpoint = endpoint
        .or_else(|| config.endpoint.clone())
        .context("no backend endpoint; pass --endpoint or set `endpoint` in config")?;
    let events = replay::read_log(log)?;

    let visitor = visitor
        .or_else(|| config.visitor_id.clone())
        .map(VisitorId::new)
        .transpose()
        .context("invalid visitor ID")?;
    let provider = ConfigIdentity { visitor };

    let client = Client::new(endpoint)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async {
        let (visitor, session) =
            met_api::start_session(&client, &provider, &BootstrapConfig::default()).await?;

        let reports = replay::drive(&events, visitor, session.clone(), config.engine.clone());
        for report in &reports {
            client.submit_best_effort(report).await;
        }

        Ok(SendReport {
            session,
            transmitted: reports.len(),
        })
    })
}
