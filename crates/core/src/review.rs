//! Forwarding captures to a hosted visual review service
//!
//! The service keeps its own human-in-the-loop accept/reject workflow; a
//! check's pass/fail is never affected by it.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::{CheckError, CheckResult};
use crate::scenario::Viewport;

/// Env var holding the review service token. Forwarding is disabled when
/// it is unset.
pub const REVIEW_TOKEN_ENV: &str = "VISREG_REVIEW_TOKEN";

#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Snapshot ingestion endpoint
    pub endpoint: String,

    /// Project slug the snapshots are filed under
    pub project: String,
}

pub struct ReviewClient {
    client: reqwest::Client,
    endpoint: String,
    project: String,
    token: String,
}

impl ReviewClient {
    /// Build a client with the token from the environment. Returns `None`
    /// when no token is set.
    pub fn from_env(config: ReviewConfig) -> CheckResult<Option<Self>> {
        let token = match std::env::var(REVIEW_TOKEN_ENV) {
            Ok(token) if !token.is_empty() => token,
            _ => {
                debug!("{} not set, review forwarding disabled", REVIEW_TOKEN_ENV);
                return Ok(None);
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Some(Self {
            client,
            endpoint: config.endpoint,
            project: config.project,
            token,
        }))
    }

    /// Upload a capture under the given label.
    pub async fn forward(
        &self,
        label: &str,
        viewport: Viewport,
        capture_path: &Path,
    ) -> CheckResult<()> {
        let body = tokio::fs::read(capture_path).await?;

        debug!(label, capture = %capture_path.display(), "forwarding capture for review");

        let width = viewport.width.to_string();
        let height = viewport.height.to_string();
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("project", self.project.as_str()),
                ("label", label),
                ("width", width.as_str()),
                ("height", height.as_str()),
            ])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "image/png")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CheckError::Review(format!(
                "{} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        Ok(())
    }
}
