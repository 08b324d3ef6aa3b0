// LogKeeper - app/upload.rs
//
// Sequential multipart upload of log files to a remote HTTP endpoint.
//
// Files are sent one at a time, in the order given, each as its own POST
// with a single `file` form field carrying the base file name. The only
// suspension points are the file read and the network round trip. Any
// non-2xx response is a failure for that file.

use crate::core::cancel_requested;
use crate::core::model::{BatchReport, FileFailure};
use crate::util::constants;
use crate::util::error::{FileError, UploadError};
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// What to do with the remaining files after one upload fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPolicy {
    /// Stop at the first failure; later files are reported as not attempted.
    #[default]
    FailFast,
    /// Attempt every file regardless of earlier failures.
    Continue,
}

/// Settings for an upload run.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub policy: UploadPolicy,

    /// Per-request timeout covering connect, send and response.
    pub timeout: Duration,

    /// Checked before each file; a set flag ends the run with `cancelled`.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            policy: UploadPolicy::default(),
            timeout: Duration::from_secs(constants::DEFAULT_UPLOAD_TIMEOUT_SECS),
            cancel_flag: None,
        }
    }
}

/// Uploads files to one endpoint.
pub struct Uploader {
    client: reqwest::Client,
    endpoint: Url,
    config: UploadConfig,
}

impl Uploader {
    /// Validate `endpoint` (absolute http or https URL) and build the client.
    pub fn new(endpoint: &str, config: UploadConfig) -> Result<Self, UploadError> {
        let url = Url::parse(endpoint).map_err(|e| UploadError::InvalidUrl {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(UploadError::InvalidUrl {
                url: endpoint.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| UploadError::Client { source })?;

        Ok(Self {
            client,
            endpoint: url,
            config,
        })
    }

    /// Upload each of `files` in order, honouring the configured policy.
    pub async fn upload_all(&self, files: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::default();

        for (index, path) in files.iter().enumerate() {
            if cancel_requested(self.config.cancel_flag.as_ref()) {
                tracing::debug!("Upload cancelled by request");
                report.cancelled = true;
                break;
            }

            match self.upload_one(path).await {
                Ok(()) => report.completed.push(path.clone()),
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Upload failed");
                    report
                        .failures
                        .push(FileFailure::new(path.clone(), FileError::Upload(e)));

                    if self.config.policy == UploadPolicy::FailFast {
                        for rest in &files[index + 1..] {
                            report
                                .failures
                                .push(FileFailure::new(rest.clone(), FileError::NotAttempted));
                        }
                        break;
                    }
                }
            }
        }

        tracing::info!(
            endpoint = %self.endpoint,
            uploaded = report.completed.len(),
            failed = report.failures.len(),
            "Upload run finished"
        );
        report
    }

    /// Send one file as a multipart POST.
    pub async fn upload_one(&self, path: &Path) -> Result<(), UploadError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| UploadError::Read { source })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size = bytes.len();

        let form = Form::new().part(
            constants::UPLOAD_FIELD_NAME,
            Part::bytes(bytes).file_name(file_name),
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|source| UploadError::Request { source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Status {
                status: status.as_u16(),
                body: body.chars().take(constants::MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        tracing::debug!(file = %path.display(), bytes = size, status = status.as_u16(), "Uploaded");
        Ok(())
    }
}
