//! Publish error types.

/// Errors produced while publishing a site.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("file {path} is {size} bytes, limit is {limit}")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    #[error("found {count} files, limit is {limit}")]
    TooManyFiles { count: usize, limit: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("failed to issue upload token: {0}")]
    UploadToken(#[source] Box<PublishError>),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("check-missing failed after {attempts} attempts: {source}")]
    CheckMissingFailed {
        attempts: u32,
        source: Box<PublishError>,
    },

    #[error("upload failed after {attempts} attempts: {source}")]
    UploadFailed {
        attempts: u32,
        source: Box<PublishError>,
    },

    #[error("deployment failed after {attempts} attempts: {source}")]
    DeployFailed {
        attempts: u32,
        source: Box<PublishError>,
    },

    #[error("project lookup failed: {0}")]
    ProjectLookup(#[source] Box<PublishError>),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl PublishError {
    /// True for an authorization failure that warrants a credential refresh.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, PublishError::Api { status: 401, .. })
    }

    /// True for a gateway failure (502, 503, 504).
    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            PublishError::Api {
                status: 502..=504,
                ..
            }
        )
    }
}

impl From<sitedrop_pages_api::Error> for PublishError {
    fn from(e: sitedrop_pages_api::Error) -> Self {
        use sitedrop_pages_api::Error;
        match (e.status(), e) {
            (_, Error::Api { status, body }) => PublishError::Api { status, body },
            (Some(status), other) => PublishError::Api {
                status,
                body: other.to_string(),
            },
            (None, Error::InvalidKey) => PublishError::InvalidConfig("API token is empty".into()),
            (None, other) => PublishError::Transport(other.to_string()),
        }
    }
}
