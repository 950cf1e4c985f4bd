//! Remote API trait.
//!
//! `PagesApi` is implemented for the HTTP client in `sitedrop-pages-api`.
//! Using a trait keeps the publish flow decoupled from transport and
//! testable with in-memory mocks.

use std::future::Future;
use std::pin::Pin;

use sitedrop_pages_api::Client;
use sitedrop_protocol::{
    DeploymentForm, DeploymentResponse, ProjectResponse, UploadPayloadFile, UploadResponse,
};

use crate::error::PublishError;

/// Boxed future returned by [`PagesApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PublishError>> + Send + 'a>>;

/// Abstract connection to the Pages API.
pub trait PagesApi: Send + Sync {
    /// Issues a short-lived upload credential for `project`.
    fn upload_token<'a>(&'a self, project: &'a str) -> ApiFuture<'a, String>;

    /// Returns the hashes the asset store does not have.
    fn check_missing<'a>(&'a self, jwt: &'a str, hashes: &'a [String])
    -> ApiFuture<'a, Vec<String>>;

    /// Uploads one batch of assets.
    fn upload<'a>(
        &'a self,
        jwt: &'a str,
        files: &'a [UploadPayloadFile],
    ) -> ApiFuture<'a, UploadResponse>;

    /// Marks hashes as known.
    fn upsert_hashes<'a>(&'a self, jwt: &'a str, hashes: &'a [String]) -> ApiFuture<'a, ()>;

    /// Looks up a project.
    fn project<'a>(&'a self, project: &'a str) -> ApiFuture<'a, ProjectResponse>;

    /// Submits a deployment.
    fn create_deployment<'a>(
        &'a self,
        project: &'a str,
        form: &'a DeploymentForm,
    ) -> ApiFuture<'a, DeploymentResponse>;
}

impl PagesApi for Client {
    fn upload_token<'a>(&'a self, project: &'a str) -> ApiFuture<'a, String> {
        Box::pin(async move { Ok(Client::upload_token(self, project).await?) })
    }

    fn check_missing<'a>(
        &'a self,
        jwt: &'a str,
        hashes: &'a [String],
    ) -> ApiFuture<'a, Vec<String>> {
        Box::pin(async move { Ok(Client::check_missing(self, jwt, hashes).await?) })
    }

    fn upload<'a>(
        &'a self,
        jwt: &'a str,
        files: &'a [UploadPayloadFile],
    ) -> ApiFuture<'a, UploadResponse> {
        Box::pin(async move { Ok(Client::upload(self, jwt, files).await?) })
    }

    fn upsert_hashes<'a>(&'a self, jwt: &'a str, hashes: &'a [String]) -> ApiFuture<'a, ()> {
        Box::pin(async move { Ok(Client::upsert_hashes(self, jwt, hashes).await?) })
    }

    fn project<'a>(&'a self, project: &'a str) -> ApiFuture<'a, ProjectResponse> {
        Box::pin(async move { Ok(Client::project(self, project).await?) })
    }

    fn create_deployment<'a>(
        &'a self,
        project: &'a str,
        form: &'a DeploymentForm,
    ) -> ApiFuture<'a, DeploymentResponse> {
        Box::pin(async move { Ok(Client::create_deployment(self, project, form).await?) })
    }
}
