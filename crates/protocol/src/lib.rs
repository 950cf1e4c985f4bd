//! Wire types for the Pages direct-upload and deployment API.
//!
//! Every response from the API is wrapped in an [`envelope::ApiEnvelope`];
//! the asset endpoints exchange the payloads in [`messages`], and the
//! project/deployment endpoints use the descriptors in [`types`].

pub mod envelope;
pub mod messages;
pub mod types;

pub use envelope::{ApiEnvelope, ApiMessage};
pub use messages::{
    AssetMetadata, HashesRequest, UploadPayloadFile, UploadResponse, UploadTokenResponse,
};
pub use types::{DeploymentForm, DeploymentResponse, ProjectResponse, Stage};

/// Client identity sent as `User-Agent` on every request.
pub const CLIENT_IDENTITY: &str = concat!("sitedrop/", env!("CARGO_PKG_VERSION"));

/// Default API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
