//! Deployment manifest and submission.

use std::collections::BTreeMap;
use std::path::Path;

use sitedrop_protocol::{DeploymentForm, DeploymentResponse};
use tracing::{debug, info, warn};

use crate::api::PagesApi;
use crate::config::RetryPolicy;
use crate::error::PublishError;
use crate::types::FileEntry;

/// Optional configuration files read from the site root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidecarFiles {
    pub headers: Option<Vec<u8>>,
    pub redirects: Option<Vec<u8>>,
    pub routes: Option<Vec<u8>>,
    pub worker: Option<Vec<u8>>,
}

impl SidecarFiles {
    /// Reads `_headers`, `_redirects`, `_routes.json` and `_worker.js` from
    /// `root`. A `_worker.js` directory contributes its `index.js`. Missing
    /// and empty files are omitted.
    pub fn read(root: &Path) -> Result<Self, PublishError> {
        let worker_path = root.join("_worker.js");
        let worker = if worker_path.is_dir() {
            read_optional(&worker_path.join("index.js"))?
        } else {
            read_optional(&worker_path)?
        };

        let sidecars = Self {
            headers: read_optional(&root.join("_headers"))?,
            redirects: read_optional(&root.join("_redirects"))?,
            routes: read_optional(&root.join("_routes.json"))?,
            worker,
        };
        debug!(
            headers = sidecars.headers.is_some(),
            redirects = sidecars.redirects.is_some(),
            routes = sidecars.routes.is_some(),
            worker = sidecars.worker.is_some(),
            "sidecars read"
        );
        Ok(sidecars)
    }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, PublishError> {
    match std::fs::read(path) {
        Ok(data) if data.is_empty() => Ok(None),
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Maps `"/" + relative path` to content hash for every file.
pub fn build_manifest(files: &[FileEntry]) -> BTreeMap<String, String> {
    files
        .iter()
        .map(|f| (f.manifest_key(), f.content_hash.clone()))
        .collect()
}

/// Assembles the deployment form.
pub fn build_form(
    manifest: BTreeMap<String, String>,
    branch: Option<String>,
    sidecars: SidecarFiles,
) -> DeploymentForm {
    DeploymentForm {
        manifest,
        branch: branch.filter(|b| !b.is_empty()),
        headers: sidecars.headers,
        redirects: sidecars.redirects,
        routes: sidecars.routes,
        worker_bundle: sidecars.worker,
    }
}

/// Submits the deployment, retrying with exponential backoff.
pub async fn submit_deployment(
    api: &dyn PagesApi,
    retry: &RetryPolicy,
    project: &str,
    form: &DeploymentForm,
) -> Result<DeploymentResponse, PublishError> {
    let budget = retry.deploy_attempts;
    let mut attempt: u32 = 0;

    loop {
        let err = match api.create_deployment(project, form).await {
            Ok(deployment) => {
                info!(
                    project,
                    deployment = %deployment.id,
                    url = %deployment.url,
                    files = form.manifest.len(),
                    "deployment created"
                );
                return Ok(deployment);
            }
            Err(e) => e,
        };

        attempt += 1;
        if attempt >= budget {
            return Err(PublishError::DeployFailed {
                attempts: attempt,
                source: Box::new(err),
            });
        }
        warn!(project, attempt, budget, error = %err, "deployment failed, retrying");
        tokio::time::sleep(retry.delay_for_attempt(attempt - 1)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockApi, api_error};
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn entry(path: &str, hash: &str) -> FileEntry {
        FileEntry {
            relative_path: path.into(),
            absolute_path: PathBuf::from(path),
            size: 1,
            content_type: "text/html".into(),
            content_hash: hash.into(),
        }
    }

    #[test]
    fn manifest_roots_every_path() {
        let manifest = build_manifest(&[entry("index.html", "h1"), entry("a/b.css", "h2")]);
        let keys: Vec<&str> = manifest.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["/a/b.css", "/index.html"]);
        assert_eq!(manifest["/index.html"], "h1");
    }

    #[test]
    fn reads_present_sidecars() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("_redirects"), b"/old /new 301").unwrap();
        std::fs::write(dir.path().join("_headers"), b"").unwrap();
        std::fs::write(dir.path().join("_worker.js"), b"export default {}").unwrap();

        let sidecars = SidecarFiles::read(dir.path()).unwrap();
        assert_eq!(sidecars.redirects.as_deref(), Some(&b"/old /new 301"[..]));
        assert_eq!(sidecars.headers, None);
        assert_eq!(sidecars.routes, None);
        assert_eq!(sidecars.worker.as_deref(), Some(&b"export default {}"[..]));
    }

    #[test]
    fn worker_directory_uses_index() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("_worker.js")).unwrap();
        std::fs::write(dir.path().join("_worker.js").join("index.js"), b"worker()").unwrap();

        let sidecars = SidecarFiles::read(dir.path()).unwrap();
        assert_eq!(sidecars.worker.as_deref(), Some(&b"worker()"[..]));
    }

    #[test]
    fn worker_directory_without_index_is_absent() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("_worker.js")).unwrap();
        assert_eq!(SidecarFiles::read(dir.path()).unwrap(), SidecarFiles::default());
    }

    #[test]
    fn form_drops_empty_branch() {
        let form = build_form(BTreeMap::new(), Some(String::new()), SidecarFiles::default());
        assert_eq!(form.branch, None);
        let form = build_form(BTreeMap::new(), Some("main".into()), SidecarFiles::default());
        assert_eq!(form.branch.as_deref(), Some("main"));
    }

    #[tokio::test(start_paused = true)]
    async fn deployment_retries_then_succeeds() {
        let api = MockApi::new();
        api.push_deployment(Err(api_error(500)));

        let start = tokio::time::Instant::now();
        let form = DeploymentForm::default();
        let dep = submit_deployment(&api, &RetryPolicy::default(), "site", &form)
            .await
            .unwrap();

        assert_eq!(dep.id, "dep-1");
        assert_eq!(api.deploy_calls(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn deployment_gives_up_after_budget() {
        let api = MockApi::new();
        for _ in 0..5 {
            api.push_deployment(Err(api_error(502)));
        }

        let err = submit_deployment(&api, &RetryPolicy::default(), "site", &DeploymentForm::default())
            .await
            .unwrap_err();

        assert_eq!(api.deploy_calls(), 3);
        assert!(err.to_string().starts_with("deployment failed after 3 attempts"));
    }
}
