use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Body for `check-missing` and `upsert-hashes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashesRequest {
    pub hashes: Vec<String>,
}

/// Per-asset metadata attached to an upload entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    #[serde(rename = "contentType")]
    pub content_type: String,
}

/// One asset in an upload batch.
///
/// `value` holds the base64-encoded file content; `base64` is always `true`
/// for payloads built by this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadPayloadFile {
    pub key: String,
    pub value: String,
    pub metadata: AssetMetadata,
    pub base64: bool,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Response from the upload-token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadTokenResponse {
    pub jwt: String,
}

/// Response from the asset upload endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub successful_key_count: u64,
    #[serde(default)]
    pub unsuccessful_keys: Vec<String>,
}
