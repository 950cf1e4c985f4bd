use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project descriptor returned by the project lookup endpoint.
///
/// Only used as an existence/authorization probe, so every field is
/// optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subdomain: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub production_branch: String,
}

/// A deployment pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub started_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: String,
}

/// Deployment descriptor returned by the deployment endpoint.
///
/// Fields this client does not model are kept in `extra` so the descriptor
/// can be handed back to callers verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub short_id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub latest_stage: Option<Stage>,
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub aliases: Option<Vec<String>>,
    #[serde(default)]
    pub is_skipped: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Contents of a multipart deployment submission.
///
/// Kept transport-agnostic so it can be rebuilt into a fresh multipart body
/// on every retry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentForm {
    /// `"/" + relative path` → content hash.
    pub manifest: BTreeMap<String, String>,
    pub branch: Option<String>,
    pub headers: Option<Vec<u8>>,
    pub redirects: Option<Vec<u8>>,
    pub routes: Option<Vec<u8>>,
    pub worker_bundle: Option<Vec<u8>>,
}

impl DeploymentForm {
    /// Serializes the manifest field.
    pub fn manifest_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.manifest)
    }

    /// Returns the present sidecar parts as `(part name, bytes)`.
    pub fn file_parts(&self) -> Vec<(&'static str, &[u8])> {
        [
            ("_headers", &self.headers),
            ("_redirects", &self.redirects),
            ("_routes.json", &self.routes),
            ("_worker.bundle", &self.worker_bundle),
        ]
        .into_iter()
        .filter_map(|(name, data)| data.as_deref().map(|d| (name, d)))
        .collect()
    }
}
