//! Upload credential management.
//!
//! The upload credential is a short-lived JWT. It is either supplied by the
//! caller or issued lazily by the API, cached, and replaced wholesale when
//! it expires or the API answers 401.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use tracing::{debug, info, warn};

use crate::api::PagesApi;
use crate::error::PublishError;

/// Supplies the bearer credential for asset endpoints.
pub struct TokenProvider {
    api: Arc<dyn PagesApi>,
    project: String,
    current: RwLock<Option<String>>,
    issue_lock: tokio::sync::Mutex<()>,
    refreshes: AtomicUsize,
}

impl TokenProvider {
    /// Creates a provider. An empty `supplied` credential counts as absent.
    pub fn new(api: Arc<dyn PagesApi>, project: &str, supplied: Option<String>) -> Self {
        Self {
            api,
            project: project.to_string(),
            current: RwLock::new(supplied.filter(|t| !t.is_empty())),
            issue_lock: tokio::sync::Mutex::new(()),
            refreshes: AtomicUsize::new(0),
        }
    }

    /// Returns the current credential, issuing one on first use.
    pub async fn token(&self) -> Result<String, PublishError> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        // Concurrent first callers wait for a single issuance.
        let _guard = self.issue_lock.lock().await;
        if let Some(token) = self.cached() {
            return Ok(token);
        }
        self.issue().await
    }

    /// Issues a new credential and replaces the cached one.
    pub async fn refresh(&self) -> Result<String, PublishError> {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        let token = self.issue().await?;
        info!(project = %self.project, "upload token refreshed");
        Ok(token)
    }

    /// Number of refreshes performed so far.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Refreshes the credential after a failed call when `err` is a 401 or
    /// the cached credential has expired.
    ///
    /// A refresh failure is logged and the stale credential is kept for the
    /// next attempt. Returns whether a new credential was installed.
    pub async fn recover(&self, err: &PublishError) -> bool {
        if !err.is_unauthorized() && !self.cached_is_expired() {
            return false;
        }
        match self.refresh().await {
            Ok(_) => true,
            Err(e) => {
                warn!(project = %self.project, error = %e, "token refresh failed, keeping stale token");
                false
            }
        }
    }

    async fn issue(&self) -> Result<String, PublishError> {
        let token = self
            .api
            .upload_token(&self.project)
            .await
            .map_err(|e| PublishError::UploadToken(Box::new(e)))?;

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(token.clone());
        Ok(token)
    }

    fn cached(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn cached_is_expired(&self) -> bool {
        let Some(token) = self.cached() else {
            return false;
        };
        match is_expired(&token) {
            Ok(expired) => expired,
            Err(e) => {
                debug!(error = %e, "cannot read token expiry");
                false
            }
        }
    }
}

/// Returns true if the JWT's `exp` claim is at or before the current time.
///
/// A missing or malformed claim is an error, never "not expired".
pub fn is_expired(token: &str) -> Result<bool, PublishError> {
    is_expired_at(token, chrono::Utc::now().timestamp())
}

/// [`is_expired`] against an explicit Unix time.
pub fn is_expired_at(token: &str, now: i64) -> Result<bool, PublishError> {
    let exp = expiry_claim(token)?;
    Ok(exp <= now as f64)
}

fn expiry_claim(token: &str) -> Result<f64, PublishError> {
    let mut parts = token.split('.');
    let claims = match (parts.next(), parts.next()) {
        (Some(_), Some(claims)) if !claims.is_empty() => claims,
        _ => return Err(PublishError::InvalidToken("missing claims segment".into())),
    };

    let decoded = [URL_SAFE_NO_PAD, URL_SAFE, STANDARD_NO_PAD, STANDARD]
        .iter()
        .find_map(|engine| engine.decode(claims).ok())
        .ok_or_else(|| PublishError::InvalidToken("claims are not base64".into()))?;

    let value: serde_json::Value = serde_json::from_slice(&decoded)
        .map_err(|e| PublishError::InvalidToken(format!("claims are not JSON: {e}")))?;

    value
        .get("exp")
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| PublishError::InvalidToken("missing exp claim".into()))
}
