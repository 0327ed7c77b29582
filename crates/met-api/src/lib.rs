//! Backend API client for the engagement tracker.
//!
//! Every call is a fire-and-forget JSON post: the engine never blocks on
//! transport, a failed request is logged and dropped, and in-memory visit
//! state is never touched by a transport outcome.

mod bootstrap;

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use met_core::{Report, SessionId, VisitorId};

pub use bootstrap::{BootstrapConfig, IdentityProvider, resolve_identity, start_session};

/// Default request timeout for report calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The provided base URL was unusable.
    #[error("invalid base URL: {reason}")]
    InvalidBaseUrl { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Backend returned an error response.
    #[error("backend error: {message}")]
    Api { message: String },
    /// Failed to parse a response body.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The visitor identity never became available.
    #[error("visitor identity unavailable after {attempts} attempts")]
    IdentityUnavailable { attempts: u32 },
}

/// Engagement backend client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across tasks. Each clone shares
/// the underlying HTTP connection pool.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct StartSessionResponse {
    #[serde(rename = "sessionId")]
    session_id: String,
}

impl Client {
    /// Creates a new client for the given backend base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or the HTTP client fails to
    /// build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(ApiError::InvalidBaseUrl {
                reason: "base URL cannot be empty",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Starts a tracking session for a visitor, returning the
    /// backend-assigned session ID.
    pub async fn start_session(&self, visitor: &VisitorId) -> Result<SessionId, ApiError> {
        let body = serde_json::json!({ "visitorId": visitor });
        let response = self
            .http
            .post(format!("{}/sessions/start", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Api {
                message: format!("status {status}: {text}"),
            });
        }

        let payload: StartSessionResponse = serde_json::from_str(&text)
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;
        SessionId::new(payload.session_id)
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }

    /// Submits one report to its endpoint.
    pub async fn submit(&self, report: &Report) -> Result<(), ApiError> {
        let path = report_path(report);
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(&wire_body(report))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                message: format!("status {status}: {text}"),
            });
        }
        Ok(())
    }

    /// Submits a report, logging and swallowing any failure. The engine's
    /// delivery contract is at-least-once via heartbeats, so a lost
    /// report is only logged.
    pub async fn submit_best_effort(&self, report: &Report) {
        if let Err(err) = self.submit(report).await {
            warn!(error = %err, report = ?report.module_name(), "report dropped");
        }
    }
}

/// Endpoint path for a report.
fn report_path(report: &Report) -> &'static str {
    match report {
        Report::VisitCommitted { .. } => "/reports/visit",
        Report::VisitActivity { .. } => "/reports/activity",
        Report::Interaction { .. } => "/reports/interaction",
        Report::SessionEnd { .. } => "/sessions/end",
    }
}

/// Request body for a report. The `kind` tag is local log framing, not
/// part of the wire contract, so it is stripped here.
fn wire_body(report: &Report) -> serde_json::Value {
    let mut value = serde_json::to_value(report).unwrap_or_default();
    if let Some(map) = value.as_object_mut() {
        map.remove("kind");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use met_core::{InteractionKind, ModuleName, ScrollDepth};

    fn sample_activity() -> Report {
        Report::VisitActivity {
            visitor_id: VisitorId::new("v-1").unwrap(),
            module_name: ModuleName::new("hero").unwrap(),
            session_id: SessionId::new("s-1").unwrap(),
            visit_number: 2,
            dwell_seconds: 12.5,
            scroll_depth: ScrollDepth::from_fraction(0.4),
            is_final: false,
        }
    }

    #[test]
    fn rejects_empty_base_url() {
        assert!(matches!(
            Client::new(""),
            Err(ApiError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            Client::new("   "),
            Err(ApiError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn trims_trailing_slash() {
        let client = Client::new("https://api.example.com/").unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
    }

    #[test]
    fn report_paths_cover_every_kind() {
        assert_eq!(report_path(&sample_activity()), "/reports/activity");
        assert_eq!(
            report_path(&Report::SessionEnd {
                session_id: SessionId::new("s-1").unwrap()
            }),
            "/sessions/end"
        );
        assert_eq!(
            report_path(&Report::Interaction {
                visitor_id: VisitorId::new("v-1").unwrap(),
                session_id: SessionId::new("s-1").unwrap(),
                module_name: ModuleName::new("video").unwrap(),
                interaction_kind: InteractionKind::VideoMute,
                detail: "player".to_string(),
                at: "2026-03-01T10:00:00Z".parse().unwrap(),
            }),
            "/reports/interaction"
        );
    }

    #[test]
    fn wire_body_strips_local_framing() {
        let body = wire_body(&sample_activity());
        assert!(body.get("kind").is_none());
        assert_eq!(body["visitorId"], "v-1");
        assert_eq!(body["moduleName"], "hero");
        assert_eq!(body["visitNumber"], 2);
    }
}
