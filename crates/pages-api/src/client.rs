//! Pages API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use sitedrop_protocol::{
    ApiEnvelope, CLIENT_IDENTITY, DEFAULT_API_BASE_URL, DeploymentForm, DeploymentResponse,
    HashesRequest, ProjectResponse, UploadPayloadFile, UploadResponse, UploadTokenResponse,
};
use tracing::{debug, warn};

/// Timeout for establishing a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for a whole request, body included.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors from the Pages client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("response has no result")]
    EmptyResult,

    #[error("invalid API token")]
    InvalidKey,
}

impl Error {
    /// HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Pages API client.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    account_id: String,
    api_token: String,
}

impl Client {
    /// Creates a new client for the given account.
    pub fn new(account_id: &str, api_token: &str) -> Result<Self, Error> {
        Self::with_timeout(account_id, api_token, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a new client with a custom per-request timeout.
    pub fn with_timeout(
        account_id: &str,
        api_token: &str,
        timeout: Duration,
    ) -> Result<Self, Error> {
        if api_token.trim().is_empty() {
            return Err(Error::InvalidKey);
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_IDENTITY));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            account_id: account_id.to_string(),
            api_token: api_token.to_string(),
        })
    }

    /// Sets a custom base URL (self-hosted gateways and tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn project_url(&self, project: &str) -> String {
        format!(
            "{}/accounts/{}/pages/projects/{}",
            self.base_url, self.account_id, project
        )
    }

    fn assets_url(&self, endpoint: &str) -> String {
        format!("{}/pages/assets/{endpoint}", self.base_url)
    }

    /// Sends a request and unwraps the response envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        bearer: &str,
    ) -> Result<ApiEnvelope<T>, Error> {
        let resp = req.bearer_auth(bearer).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        let envelope: ApiEnvelope<T> = serde_json::from_slice(&body)?;
        if !envelope.success {
            let summary = envelope.error_summary();
            warn!(status = status.as_u16(), errors = %summary, "API reported failure");
            return Err(Error::Rejected(summary));
        }
        Ok(envelope)
    }

    async fn send_result<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        bearer: &str,
    ) -> Result<T, Error> {
        self.send::<T>(req, bearer)
            .await?
            .result
            .ok_or(Error::EmptyResult)
    }

    /// Issues a short-lived upload JWT for the project.
    pub async fn upload_token(&self, project: &str) -> Result<String, Error> {
        let url = format!("{}/upload-token", self.project_url(project));
        let resp: UploadTokenResponse = self
            .send_result(self.http.get(&url), &self.api_token)
            .await?;
        Ok(resp.jwt)
    }

    /// Returns the subset of `hashes` the asset store does not have.
    pub async fn check_missing(&self, jwt: &str, hashes: &[String]) -> Result<Vec<String>, Error> {
        let body = HashesRequest {
            hashes: hashes.to_vec(),
        };
        let req = self.http.post(self.assets_url("check-missing")).json(&body);
        self.send_result(req, jwt).await
    }

    /// Uploads one batch of assets.
    pub async fn upload(
        &self,
        jwt: &str,
        files: &[UploadPayloadFile],
    ) -> Result<UploadResponse, Error> {
        let req = self.http.post(self.assets_url("upload")).json(files);
        let envelope = self.send::<UploadResponse>(req, jwt).await?;
        Ok(envelope.result.unwrap_or_default())
    }

    /// Records `hashes` as known so later runs can skip them.
    pub async fn upsert_hashes(&self, jwt: &str, hashes: &[String]) -> Result<(), Error> {
        let body = HashesRequest {
            hashes: hashes.to_vec(),
        };
        let req = self.http.post(self.assets_url("upsert-hashes")).json(&body);
        self.send::<serde_json::Value>(req, jwt).await?;
        Ok(())
    }

    /// Looks up a project.
    pub async fn project(&self, project: &str) -> Result<ProjectResponse, Error> {
        let url = self.project_url(project);
        self.send_result(self.http.get(&url), &self.api_token).await
    }

    /// Submits a deployment.
    pub async fn create_deployment(
        &self,
        project: &str,
        form: &DeploymentForm,
    ) -> Result<DeploymentResponse, Error> {
        let url = format!("{}/deployments", self.project_url(project));
        let multipart = build_multipart(form)?;
        debug!(
            project,
            manifest_entries = form.manifest.len(),
            "submitting deployment"
        );
        self.send_result(self.http.post(&url).multipart(multipart), &self.api_token)
            .await
    }
}

/// Builds the multipart body for a deployment.
fn build_multipart(form: &DeploymentForm) -> Result<Form, Error> {
    let mut multipart = Form::new().text("manifest", form.manifest_json()?);

    if let Some(branch) = form.branch.as_deref().filter(|b| !b.is_empty()) {
        multipart = multipart.text("branch", branch.to_string());
    }

    for (name, data) in form.file_parts() {
        multipart = multipart.part(name, Part::bytes(data.to_vec()).file_name(name));
    }

    Ok(multipart)
}
