//! CAS reputation lookups.
//!
//! CAS (Combot Anti-Spam) is an external service; Herald only consumes a
//! boolean verdict per user. A lookup failure is never fatal: every error
//! collapses to "not flagged".

use std::time::Duration;

use serde::Deserialize;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the CAS check endpoint.
#[derive(Clone)]
pub struct CasClient {
    http: reqwest::Client,
    base_url: String,
}

/// CAS answers `{"ok": true, "result": {...}}` for flagged users and
/// `{"ok": false, "description": "..."}` for clean ones.
#[derive(Debug, Deserialize)]
struct CasVerdict {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

impl CasVerdict {
    fn flagged(&self) -> bool {
        self.ok && self.result.is_some()
    }
}

impl CasClient {
    pub fn new(base_url: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base_url })
    }

    /// Whether CAS lists this user as a spammer.
    pub async fn check(&self, user_id: i64) -> bool {
        let url = format!("{}/check?user_id={}", self.base_url, user_id);

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(user_id, %error, "CAS lookup failed");
                return false;
            }
        };
        if !response.status().is_success() {
            tracing::debug!(user_id, status = %response.status(), "CAS lookup rejected");
            return false;
        }

        match response.json::<CasVerdict>().await {
            Ok(verdict) => verdict.flagged(),
            Err(error) => {
                tracing::debug!(user_id, %error, "CAS verdict unreadable");
                false
            }
        }
    }
}
