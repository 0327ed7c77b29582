//! Session bootstrap: identity polling and session start.
//!
//! The visitor identity is populated by the host asynchronously, so it is
//! polled with a bounded attempt cap. If it never resolves, the whole
//! tracker stays off: no engine is constructed and nothing is reported.

use std::time::Duration;

use tracing::{debug, warn};

use met_core::{SessionId, VisitorId};

use crate::{ApiError, Client};

/// Supplies the externally-populated visitor identity, if it has arrived.
pub trait IdentityProvider {
    /// The current identity, or None if it has not resolved yet.
    fn current_identity(&self) -> Option<VisitorId>;
}

/// Identity polling parameters.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// How many times to poll before giving up.
    pub max_attempts: u32,
    /// Delay between polls.
    pub poll_interval: Duration,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Polls the provider until the identity resolves or attempts run out.
pub async fn resolve_identity(
    provider: &dyn IdentityProvider,
    config: &BootstrapConfig,
) -> Result<VisitorId, ApiError> {
    for attempt in 1..=config.max_attempts {
        if let Some(identity) = provider.current_identity() {
            debug!(attempt, visitor = %identity, "visitor identity resolved");
            return Ok(identity);
        }
        if attempt < config.max_attempts {
            tokio::time::sleep(config.poll_interval).await;
        }
    }
    warn!(
        attempts = config.max_attempts,
        "visitor identity never resolved, tracking disabled"
    );
    Err(ApiError::IdentityUnavailable {
        attempts: config.max_attempts,
    })
}

/// Resolves the visitor identity and starts a backend session.
///
/// This is the only gate into tracking: when it fails, the caller has no
/// session ID and therefore cannot construct an engine.
pub async fn start_session(
    client: &Client,
    provider: &dyn IdentityProvider,
    config: &BootstrapConfig,
) -> Result<(VisitorId, SessionId), ApiError> {
    let visitor = resolve_identity(provider, config).await?;
    let session = client.start_session(&visitor).await?;
    debug!(visitor = %visitor, session = %session, "session started");
    Ok((visitor, session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Provider that resolves after a fixed number of polls.
    struct SlowProvider {
        polls_needed: u32,
        polls_seen: Cell<u32>,
    }

    impl SlowProvider {
        fn new(polls_needed: u32) -> Self {
            Self {
                polls_needed,
                polls_seen: Cell::new(0),
            }
        }
    }

    impl IdentityProvider for SlowProvider {
        fn current_identity(&self) -> Option<VisitorId> {
            let seen = self.polls_seen.get() + 1;
            self.polls_seen.set(seen);
            (seen >= self.polls_needed).then(|| VisitorId::new("v-42").unwrap())
        }
    }

    fn fast_config(max_attempts: u32) -> BootstrapConfig {
        BootstrapConfig {
            max_attempts,
            poll_interval: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn resolves_immediately_available_identity() {
        let provider = SlowProvider::new(1);
        let identity = resolve_identity(&provider, &fast_config(3)).await.unwrap();
        assert_eq!(identity.as_str(), "v-42");
        assert_eq!(provider.polls_seen.get(), 1);
    }

    #[tokio::test]
    async fn retries_until_identity_arrives() {
        let provider = SlowProvider::new(4);
        let identity = resolve_identity(&provider, &fast_config(10)).await.unwrap();
        assert_eq!(identity.as_str(), "v-42");
        assert_eq!(provider.polls_seen.get(), 4);
    }

    #[tokio::test]
    async fn gives_up_after_attempt_cap() {
        let provider = SlowProvider::new(100);
        let result = resolve_identity(&provider, &fast_config(5)).await;
        assert!(matches!(
            result,
            Err(ApiError::IdentityUnavailable { attempts: 5 })
        ));
        assert_eq!(provider.polls_seen.get(), 5);
    }
}
