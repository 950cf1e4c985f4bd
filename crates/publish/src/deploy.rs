//! Publish orchestrator.
//!
//! Runs the whole pipeline for one site directory: sidecars, project
//! lookup, scan, missing-asset resolution, bucketing, upload and
//! deployment.

use std::sync::Arc;

use tracing::{error, info};

use crate::api::PagesApi;
use crate::bucketer::bucket_files;
use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::manifest::{SidecarFiles, build_form, build_manifest, submit_deployment};
use crate::resolver::resolve_missing;
use crate::scanner::scan_directory;
use crate::token::TokenProvider;
use crate::types::{PublishOptions, PublishOutcome};
use crate::upload::UploadExecutor;

/// Publishes site directories to a Pages project.
pub struct Publisher {
    api: Arc<dyn PagesApi>,
    config: PublishConfig,
    upload_token: Option<String>,
}

impl Publisher {
    /// Creates a publisher. The config is validated up front.
    pub fn new(api: Arc<dyn PagesApi>, config: PublishConfig) -> Result<Self, PublishError> {
        config.validate()?;
        Ok(Self {
            api,
            config,
            upload_token: None,
        })
    }

    /// Uses a pre-issued upload token instead of requesting one.
    pub fn with_upload_token(mut self, token: Option<String>) -> Self {
        self.upload_token = token;
        self
    }

    /// Publishes `options.directory` and returns the created deployment.
    pub async fn publish(&self, options: &PublishOptions) -> Result<PublishOutcome, PublishError> {
        let project = options.project.as_str();
        info!(project, dir = %options.directory.display(), "publishing site");

        match self.run(options).await {
            Ok(outcome) => {
                info!(
                    project,
                    deployment = %outcome.deployment.id,
                    uploaded = outcome.report.uploaded,
                    skipped = outcome.report.skipped,
                    "publish completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(project, error = %e, "publish failed");
                Err(e)
            }
        }
    }

    async fn run(&self, options: &PublishOptions) -> Result<PublishOutcome, PublishError> {
        let project = options.project.as_str();
        let upload = &self.config.upload;

        // 1. Sidecars
        let mut sidecars = tokio::task::spawn_blocking({
            let root = options.directory.clone();
            move || SidecarFiles::read(&root)
        })
        .await??;
        if let Some(headers) = &options.headers_override {
            sidecars.headers = Some(headers.clone());
        }

        // 2. Project lookup
        self.api
            .project(project)
            .await
            .map_err(|e| PublishError::ProjectLookup(Box::new(e)))?;

        // 3. Scan
        let files = tokio::task::spawn_blocking({
            let root = options.directory.clone();
            let limits = self.config.limits.clone();
            let workers = upload.hash_workers;
            move || scan_directory(&root, &limits, workers)
        })
        .await??;
        info!(project, files = files.len(), "scan complete");

        // 4. Missing assets
        let tokens = Arc::new(TokenProvider::new(
            self.api.clone(),
            project,
            self.upload_token.clone(),
        ));
        let resolution = resolve_missing(
            self.api.as_ref(),
            &tokens,
            &self.config.retry,
            &files,
            options.skip_caching,
        )
        .await?;

        // 5. Buckets
        let buckets = bucket_files(
            resolution.missing,
            upload.concurrency,
            upload.max_bucket_bytes,
            upload.max_files_per_bucket,
        )?;

        // 6. Upload
        let hashes: Vec<String> = files.iter().map(|f| f.content_hash.clone()).collect();
        let report = UploadExecutor::new(self.api.clone(), tokens, upload, &self.config.retry)
            .run(buckets, &hashes, resolution.present, options.progress.clone())
            .await?;

        // 7. Deploy
        let manifest = build_manifest(&files);
        let form = build_form(manifest.clone(), options.branch.clone(), sidecars);
        let deployment =
            submit_deployment(self.api.as_ref(), &self.config.retry, project, &form).await?;

        Ok(PublishOutcome {
            deployment,
            manifest,
            report,
        })
    }
}
