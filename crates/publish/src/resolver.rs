//! Missing-asset resolution.
//!
//! Asks the asset store which content hashes it lacks so only those files
//! are uploaded.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::api::PagesApi;
use crate::config::RetryPolicy;
use crate::error::PublishError;
use crate::token::TokenProvider;
use crate::types::FileEntry;

/// Files split by whether the asset store already has them.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Files to upload.
    pub missing: Vec<FileEntry>,
    /// Files the store already has.
    pub present: usize,
}

/// Resolves which of `files` must be uploaded.
///
/// With `skip_caching` every file is missing and no call is made.
pub async fn resolve_missing(
    api: &dyn PagesApi,
    tokens: &TokenProvider,
    retry: &RetryPolicy,
    files: &[FileEntry],
    skip_caching: bool,
) -> Result<Resolution, PublishError> {
    if skip_caching {
        debug!(files = files.len(), "caching skipped, uploading every file");
        return Ok(Resolution {
            missing: files.to_vec(),
            present: 0,
        });
    }

    let hashes: Vec<String> = files.iter().map(|f| f.content_hash.clone()).collect();
    let missing = check_missing_with_retry(api, tokens, retry, &hashes).await?;
    let missing: HashSet<String> = missing.into_iter().collect();

    let (missing, present): (Vec<FileEntry>, Vec<FileEntry>) = files
        .iter()
        .cloned()
        .partition(|f| missing.contains(&f.content_hash));

    debug!(
        missing = missing.len(),
        present = present.len(),
        "resolved missing assets"
    );
    Ok(Resolution {
        missing,
        present: present.len(),
    })
}

async fn check_missing_with_retry(
    api: &dyn PagesApi,
    tokens: &TokenProvider,
    retry: &RetryPolicy,
    hashes: &[String],
) -> Result<Vec<String>, PublishError> {
    let budget = retry.check_missing_attempts;
    let mut attempt: u32 = 0;

    loop {
        let jwt = tokens.token().await?;
        let err = match api.check_missing(&jwt, hashes).await {
            Ok(missing) => return Ok(missing),
            Err(e) => e,
        };

        attempt += 1;
        if attempt >= budget {
            return Err(PublishError::CheckMissingFailed {
                attempts: attempt,
                source: Box::new(err),
            });
        }
        warn!(attempt, budget, error = %err, "check-missing failed, retrying");

        tokens.recover(&err).await;
        tokio::time::sleep(retry.delay_for_attempt(attempt - 1)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockApi, api_error};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    fn entry(path: &str, hash: &str) -> FileEntry {
        FileEntry {
            relative_path: path.into(),
            absolute_path: PathBuf::from(path),
            size: 1,
            content_type: "text/plain".into(),
            content_hash: hash.into(),
        }
    }

    fn files() -> Vec<FileEntry> {
        vec![entry("a", "h1"), entry("b", "h2"), entry("c", "h3")]
    }

    fn setup() -> (Arc<MockApi>, TokenProvider) {
        let api = Arc::new(MockApi::new());
        let tokens = TokenProvider::new(api.clone(), "site", None);
        (api, tokens)
    }

    #[tokio::test]
    async fn skip_caching_makes_no_calls() {
        let (api, tokens) = setup();
        let res = resolve_missing(&*api, &tokens, &RetryPolicy::default(), &files(), true)
            .await
            .unwrap();

        assert_eq!(res.missing.len(), 3);
        assert_eq!(res.present, 0);
        assert_eq!(api.check_calls(), 0);
        assert_eq!(api.token_calls(), 0);
    }

    #[tokio::test]
    async fn keeps_only_missing_files() {
        let (api, tokens) = setup();
        api.push_missing(Ok(vec!["h2".into()]));

        let res = resolve_missing(&*api, &tokens, &RetryPolicy::default(), &files(), false)
            .await
            .unwrap();

        assert_eq!(res.missing, vec![entry("b", "h2")]);
        assert_eq!(res.present, 2);
        assert_eq!(api.check_calls(), 1);
    }

    #[tokio::test]
    async fn empty_answer_means_nothing_to_upload() {
        let (api, tokens) = setup();
        api.push_missing(Ok(Vec::new()));

        let res = resolve_missing(&*api, &tokens, &RetryPolicy::default(), &files(), false)
            .await
            .unwrap();
        assert!(res.missing.is_empty());
        assert_eq!(res.present, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let (api, tokens) = setup();
        api.push_missing(Err(api_error(500)));
        api.push_missing(Err(PublishError::Transport("reset".into())));
        api.push_missing(Ok(vec!["h1".into()]));

        let start = tokio::time::Instant::now();
        let res = resolve_missing(&*api, &tokens, &RetryPolicy::default(), &files(), false)
            .await
            .unwrap();

        assert_eq!(res.missing.len(), 1);
        assert_eq!(api.check_calls(), 3);
        // 1s + 2s of backoff.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(tokens.refresh_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_budget() {
        let (api, tokens) = setup();
        for _ in 0..10 {
            api.push_missing(Err(api_error(500)));
        }

        let err = resolve_missing(&*api, &tokens, &RetryPolicy::default(), &files(), false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PublishError::CheckMissingFailed { attempts: 4, .. }
        ));
        assert_eq!(api.check_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_refreshes_once() {
        let (api, tokens) = setup();
        api.push_missing(Err(api_error(401)));
        api.push_missing(Ok(Vec::new()));

        resolve_missing(&*api, &tokens, &RetryPolicy::default(), &files(), false)
            .await
            .unwrap();

        assert_eq!(tokens.refresh_count(), 1);
        assert_eq!(api.token_calls(), 2);
        let jwts = api.jwts.lock().unwrap();
        assert_eq!(jwts.len(), 2);
        assert_ne!(jwts[0], jwts[1]);
    }
}
