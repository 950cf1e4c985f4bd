//! Scripted in-memory `PagesApi` used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sitedrop_protocol::{
    DeploymentForm, DeploymentResponse, ProjectResponse, UploadPayloadFile, UploadResponse,
};

use crate::api::{ApiFuture, PagesApi};
use crate::error::PublishError;

/// Builds a JWT-shaped token with the given `exp` claim.
pub fn jwt_with_exp(exp: i64) -> String {
    let claims = format!(r#"{{"exp":{exp}}}"#);
    format!("header.{}.sig", URL_SAFE_NO_PAD.encode(claims))
}

pub fn api_error(status: u16) -> PublishError {
    PublishError::Api {
        status,
        body: format!("status {status}"),
    }
}

type Script<T> = Mutex<VecDeque<Result<T, PublishError>>>;

/// Fixed behaviour for every upload batch that contains a given key.
#[derive(Debug, Clone, Copy)]
struct KeyedUpload {
    status: Option<u16>,
    delay: Duration,
}

/// Mock API. Each endpoint pops a scripted result; when the script is empty
/// it answers with a default success.
#[derive(Default)]
pub struct MockApi {
    tokens: Script<String>,
    missing: Script<Vec<String>>,
    uploads: Script<UploadResponse>,
    upserts: Script<()>,
    projects: Script<ProjectResponse>,
    deployments: Script<DeploymentResponse>,
    keyed_uploads: Mutex<HashMap<String, KeyedUpload>>,

    token_calls: AtomicUsize,
    check_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    deploy_calls: AtomicUsize,

    /// Credentials seen by asset endpoints, in call order.
    pub jwts: Mutex<Vec<String>>,
    /// Upload batches received, in call order.
    pub batches: Mutex<Vec<Vec<UploadPayloadFile>>>,
    pub forms: Mutex<Vec<DeploymentForm>>,
}

fn pop<T>(script: &Script<T>, default: impl FnOnce() -> T) -> Result<T, PublishError> {
    script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Ok(default()))
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_token(&self, r: Result<String, PublishError>) {
        self.tokens.lock().unwrap().push_back(r);
    }

    pub fn push_missing(&self, r: Result<Vec<String>, PublishError>) {
        self.missing.lock().unwrap().push_back(r);
    }

    pub fn push_upload(&self, r: Result<UploadResponse, PublishError>) {
        self.uploads.lock().unwrap().push_back(r);
    }

    /// Every batch containing `key` waits `delay`, then fails with
    /// `status` or succeeds when it is `None`. Overrides the upload script.
    pub fn on_upload_key(&self, key: &str, status: Option<u16>, delay: Duration) {
        self.keyed_uploads
            .lock()
            .unwrap()
            .insert(key.to_string(), KeyedUpload { status, delay });
    }

    pub fn push_upsert(&self, r: Result<(), PublishError>) {
        self.upserts.lock().unwrap().push_back(r);
    }

    pub fn push_project(&self, r: Result<ProjectResponse, PublishError>) {
        self.projects.lock().unwrap().push_back(r);
    }

    pub fn push_deployment(&self, r: Result<DeploymentResponse, PublishError>) {
        self.deployments.lock().unwrap().push_back(r);
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn deploy_calls(&self) -> usize {
        self.deploy_calls.load(Ordering::SeqCst)
    }
}

impl PagesApi for MockApi {
    fn upload_token<'a>(&'a self, _project: &'a str) -> ApiFuture<'a, String> {
        let n = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Box::pin(async move {
            pop(&self.tokens, || {
                let claims = format!(r#"{{"exp":4102444800,"n":{n}}}"#);
                format!("header.{}.sig", URL_SAFE_NO_PAD.encode(claims))
            })
        })
    }

    fn check_missing<'a>(
        &'a self,
        jwt: &'a str,
        hashes: &'a [String],
    ) -> ApiFuture<'a, Vec<String>> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        self.jwts.lock().unwrap().push(jwt.to_string());
        Box::pin(async move { pop(&self.missing, || hashes.to_vec()) })
    }

    fn upload<'a>(
        &'a self,
        jwt: &'a str,
        files: &'a [UploadPayloadFile],
    ) -> ApiFuture<'a, UploadResponse> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.jwts.lock().unwrap().push(jwt.to_string());
        self.batches.lock().unwrap().push(files.to_vec());
        let keyed = {
            let keyed = self.keyed_uploads.lock().unwrap();
            files.iter().find_map(|f| keyed.get(&f.key).copied())
        };
        Box::pin(async move {
            if let Some(rule) = keyed {
                tokio::time::sleep(rule.delay).await;
                return match rule.status {
                    Some(status) => Err(api_error(status)),
                    None => Ok(UploadResponse {
                        successful_key_count: files.len() as u64,
                        unsuccessful_keys: Vec::new(),
                    }),
                };
            }
            pop(&self.uploads, || UploadResponse {
                successful_key_count: files.len() as u64,
                unsuccessful_keys: Vec::new(),
            })
        })
    }

    fn upsert_hashes<'a>(&'a self, jwt: &'a str, _hashes: &'a [String]) -> ApiFuture<'a, ()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.jwts.lock().unwrap().push(jwt.to_string());
        Box::pin(async move { pop(&self.upserts, || ()) })
    }

    fn project<'a>(&'a self, project: &'a str) -> ApiFuture<'a, ProjectResponse> {
        Box::pin(async move {
            pop(&self.projects, || ProjectResponse {
                name: project.to_string(),
                ..Default::default()
            })
        })
    }

    fn create_deployment<'a>(
        &'a self,
        project: &'a str,
        form: &'a DeploymentForm,
    ) -> ApiFuture<'a, DeploymentResponse> {
        self.deploy_calls.fetch_add(1, Ordering::SeqCst);
        self.forms.lock().unwrap().push(form.clone());
        Box::pin(async move {
            pop(&self.deployments, || DeploymentResponse {
                id: "dep-1".into(),
                project_name: project.to_string(),
                url: format!("https://dep-1.{project}.pages.dev"),
                ..Default::default()
            })
        })
    }
}
