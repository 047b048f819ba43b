//! HTTP client for the processing service.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use retouch_core::{NamedOperation, RasterFormat};

use super::{parse_logs, parse_operation_response, LogEntry, OperationOutcome, RemoteService};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// [`RemoteService`] backed by the service's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base: Url,
    config: SessionConfig,
}

#[derive(Deserialize)]
struct UploadResponse {
    filename: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpRemote {
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let base = Url::parse(&config.base_url)
            .map_err(|e| SessionError::Config(format!("base_url: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(SessionError::Config(format!(
                "base_url '{}' cannot carry a path",
                config.base_url
            )));
        }
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SessionError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Base URL extended by the given path segments, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn operation_endpoint(&self, operation: &NamedOperation) -> Url {
        let segments: Vec<&str> = operation.endpoint().trim_start_matches('/').split('/').collect();
        self.endpoint(&segments)
    }

    /// Send a request, retrying transport failures and 5xx responses.
    ///
    /// `build` is called once per attempt since multipart bodies cannot be
    /// cloned.
    async fn send<F>(&self, what: &str, build: F) -> Result<Response>
    where
        F: Fn() -> Result<RequestBuilder> + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            let outcome = build()?.send().await;
            let retryable = match &outcome {
                Ok(response) => response.status().is_server_error(),
                Err(err) => !err.is_builder(),
            };
            if !retryable || attempt >= self.config.max_retries {
                return outcome.map_err(|e| SessionError::Network(format!("{what}: {e}")));
            }

            attempt += 1;
            match &outcome {
                Ok(response) => warn!(
                    request = what,
                    status = %response.status(),
                    attempt,
                    "Retrying after server error"
                ),
                Err(err) => warn!(
                    request = what,
                    error = %err,
                    attempt,
                    "Retrying after transport error"
                ),
            }
            tokio::time::sleep(self.config.backoff(attempt)).await;
        }
    }
}

fn file_part(bytes: Vec<u8>, file_name: String, mime: &str) -> Result<Part> {
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime)
        .map_err(|e| SessionError::Network(e.to_string()))
}

/// Guess a MIME type for an upload from its file name.
fn mime_for_name(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else {
        "application/octet-stream"
    }
}

/// The `message` field of an error body, if there is one.
fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .map(|b| b.message)
}

fn describe(status: StatusCode, body: &[u8]) -> String {
    match error_message(body) {
        Some(message) => format!("{status}: {message}"),
        None => status.to_string(),
    }
}

/// Map a download or commit status onto the session's error kinds.
fn check_asset_status(status: StatusCode, asset_id: &str, body: &[u8]) -> Result<()> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::BAD_REQUEST => Err(SessionError::NotYetProcessed(asset_id.to_string())),
        StatusCode::NOT_FOUND => Err(SessionError::NotFound(asset_id.to_string())),
        s => Err(SessionError::Network(describe(s, body))),
    }
}

impl RemoteService for HttpRemote {
    async fn upload(&self, bytes: Vec<u8>, name: &str) -> Result<String> {
        let url = self.endpoint(&["upload", ""]);
        let mime = mime_for_name(name);
        debug!(%url, name, size = bytes.len(), "Uploading original");

        let response = self
            .send("upload", || {
                let part = file_part(bytes.clone(), name.to_string(), mime)?;
                let form = Form::new().part("file", part);
                Ok(self.client.post(url.clone()).multipart(form))
            })
            .await
            .map_err(|e| SessionError::Upload(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SessionError::Upload(e.to_string()))?;
        if status != StatusCode::CREATED {
            return Err(SessionError::Upload(describe(status, &body)));
        }

        let parsed: UploadResponse = serde_json::from_slice(&body)
            .map_err(|e| SessionError::Upload(format!("malformed response: {e}")))?;
        match parsed.filename {
            Some(filename) if !filename.is_empty() => Ok(filename),
            _ => Err(SessionError::Upload(
                parsed
                    .message
                    .unwrap_or_else(|| "service did not return a filename".into()),
            )),
        }
    }

    async fn commit(
        &self,
        asset_id: &str,
        bytes: Vec<u8>,
        format: RasterFormat,
        processed: bool,
    ) -> Result<()> {
        let url = self.endpoint(&["upload", "update", asset_id]);
        debug!(%url, size = bytes.len(), processed, "Committing render");

        let response = self
            .send("commit", || {
                let file_name = format!("{asset_id}.{}", format.extension());
                let form = Form::new()
                    .part("file", file_part(bytes.clone(), file_name, format.mime_type())?)
                    .text("processed", if processed { "true" } else { "false" });
                Ok(self.client.post(url.clone()).multipart(form))
            })
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(SessionError::NotFound(asset_id.to_string())),
            s => Err(SessionError::Network(describe(s, &body))),
        }
    }

    async fn apply_operation(
        &self,
        asset_id: &str,
        operation: &NamedOperation,
    ) -> Result<OperationOutcome> {
        operation.validate()?;
        let url = self.operation_endpoint(operation);
        let request = operation.request(asset_id);
        debug!(%url, operation = operation.name(), "Applying named operation");

        let response = self
            .send(operation.name(), || Ok(self.client.post(url.clone()).json(&request)))
            .await?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;
        match status {
            s if s.is_success() => parse_operation_response(&body),
            StatusCode::NOT_FOUND => Err(SessionError::NotFound(asset_id.to_string())),
            s => Err(SessionError::Network(describe(s, &body))),
        }
    }

    async fn fetch_for_download(&self, asset_id: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(&["upload", "download", asset_id]);
        debug!(%url, "Fetching processed asset");

        let response = self.send("download", || Ok(self.client.get(url.clone()))).await?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;
        check_asset_status(status, asset_id, &body)?;
        Ok(body.to_vec())
    }

    async fn fetch_logs(&self) -> Result<Vec<LogEntry>> {
        let url = self.endpoint(&["upload", "logs"]);
        debug!(%url, "Fetching image logs");

        let response = self.send("logs", || Ok(self.client.get(url.clone()))).await?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;
        match status {
            s if s.is_success() => parse_logs(&body),
            StatusCode::NOT_FOUND => Err(SessionError::NotFound("image logs endpoint".into())),
            s => Err(SessionError::Network(describe(s, &body))),
        }
    }
}
