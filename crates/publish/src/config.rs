//! Publish configuration: limits, upload shape and retry policy.
//!
//! Built once per run and passed by reference. Every field has a default
//! so a partial JSON file only overrides what it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PublishError;

const MIB: u64 = 1024 * 1024;

/// Per-file and aggregate scan limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Limits {
    pub max_file_size: u64,
    pub max_file_count: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_size: 25 * MIB,
            max_file_count: 20_000,
        }
    }
}

/// Upload batching and parallelism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadSettings {
    /// Maximum uploads in flight, also the number of pre-seeded buckets.
    pub concurrency: usize,
    pub max_files_per_bucket: usize,
    pub max_bucket_bytes: u64,
    /// Hashing pool size. `None` uses the host's available parallelism.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_workers: Option<usize>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            concurrency: 6,
            max_files_per_bucket: 2_500,
            max_bucket_bytes: 72 * MIB,
            hash_workers: None,
        }
    }
}

/// Attempt budgets and backoff schedule.
///
/// Budgets count total calls, the first one included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
    pub check_missing_attempts: u32,
    pub upload_attempts: u32,
    /// Consecutive gateway failures after which one extra attempt is burned.
    pub gateway_threshold: u32,
    pub deploy_attempts: u32,
    pub backoff_unit_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            check_missing_attempts: 4,
            upload_attempts: 8,
            gateway_threshold: 4,
            deploy_attempts: 3,
            backoff_unit_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    /// Delay after the failed attempt `attempt` (0-based): `unit * 2^attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_unit() * 2u32.saturating_pow(attempt.min(20))
    }

    /// Extra delay after `gateway` consecutive gateway failures:
    /// `5 * unit * 2^gateway`.
    pub fn gateway_penalty(&self, gateway: u32) -> Duration {
        self.backoff_unit() * 5 * 2u32.saturating_pow(gateway.min(20))
    }
}

/// Complete publish configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub limits: Limits,
    pub upload: UploadSettings,
    pub retry: RetryPolicy,
}

impl PublishConfig {
    /// Rejects configurations the pipeline cannot honor.
    pub fn validate(&self) -> Result<(), PublishError> {
        let invalid = |msg: &str| Err(PublishError::InvalidConfig(msg.to_string()));

        if self.upload.concurrency == 0 {
            return invalid("concurrency must be at least 1");
        }
        if self.upload.max_files_per_bucket == 0 {
            return invalid("maxFilesPerBucket must be at least 1");
        }
        if self.limits.max_file_size > self.upload.max_bucket_bytes {
            return invalid("maxFileSize cannot exceed maxBucketBytes");
        }
        if self.upload.hash_workers == Some(0) {
            return invalid("hashWorkers must be at least 1");
        }
        let r = &self.retry;
        if r.check_missing_attempts == 0 || r.upload_attempts == 0 || r.deploy_attempts == 0 {
            return invalid("attempt budgets must be at least 1");
        }
        if r.gateway_threshold == 0 {
            return invalid("gatewayThreshold must be at least 1");
        }
        Ok(())
    }
}
