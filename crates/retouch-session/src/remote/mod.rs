//! Remote sync adapter.
//!
//! The processing service keeps one asset per uploaded image. The session
//! commits every published render to it, and named operations (filters,
//! noise, histograms) run against it server-side. [`RemoteService`] is the
//! seam: [`HttpRemote`] talks to the real service, [`MemoryRemote`] keeps
//! assets in process.

mod http;
mod memory;

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use retouch_core::{HistogramReport, NamedOperation, RasterFormat};

use crate::error::{Result, SessionError};

pub use http::HttpRemote;
pub use memory::{CommitRecord, MemoryRemote};

/// What a named operation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// A new processed asset, addressed by this id from now on.
    Asset(String),
    Histogram(HistogramReport),
}

/// One entry of the service's image activity log.
///
/// Only the common fields are named; anything else the service reports is
/// kept in `details`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl LogEntry {
    pub fn new(action: &str, filename: &str) -> Self {
        Self {
            action: Some(action.to_string()),
            filename: Some(filename.to_string()),
            ..Self::default()
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Backend holding the uploaded asset and its processed revisions.
pub trait RemoteService: Send + Sync + 'static {
    /// Upload an original; returns the asset id assigned by the service.
    fn upload(&self, bytes: Vec<u8>, name: &str) -> impl Future<Output = Result<String>> + Send;

    /// Replace the asset's content with an encoded render.
    ///
    /// `processed` tells the service whether the content differs from the
    /// upload; downloads are refused until it does.
    fn commit(
        &self,
        asset_id: &str,
        bytes: Vec<u8>,
        format: RasterFormat,
        processed: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    fn apply_operation(
        &self,
        asset_id: &str,
        operation: &NamedOperation,
    ) -> impl Future<Output = Result<OperationOutcome>> + Send;

    /// Fetch the processed asset.
    ///
    /// Fails with [`SessionError::NotYetProcessed`] when nothing was committed
    /// since upload and [`SessionError::NotFound`] for unknown ids.
    fn fetch_for_download(&self, asset_id: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// The service's activity log, oldest entry first.
    fn fetch_logs(&self) -> impl Future<Output = Result<Vec<LogEntry>>> + Send;
}

#[derive(Deserialize)]
struct AssetResponse {
    filename: String,
}

/// Interpret the JSON body of a named-operation response.
pub(crate) fn parse_operation_response(body: &[u8]) -> Result<OperationOutcome> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| SessionError::Protocol(e.to_string()))?;

    if value.get("histograms").is_some() {
        let report: HistogramReport =
            serde_json::from_value(value).map_err(|e| SessionError::Protocol(e.to_string()))?;
        report.validate()?;
        return Ok(OperationOutcome::Histogram(report));
    }

    let asset: AssetResponse = serde_json::from_value(value).map_err(|_| {
        SessionError::Protocol("response carries neither a filename nor histograms".into())
    })?;
    if asset.filename.is_empty() {
        return Err(SessionError::Protocol("empty filename in response".into()));
    }
    Ok(OperationOutcome::Asset(asset.filename))
}

/// Interpret the body of a log response: a bare array or `{ "logs": [...] }`.
pub(crate) fn parse_logs(body: &[u8]) -> Result<Vec<LogEntry>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LogsBody {
        Bare(Vec<LogEntry>),
        Wrapped { logs: Vec<LogEntry> },
    }

    match serde_json::from_slice(body) {
        Ok(LogsBody::Bare(logs) | LogsBody::Wrapped { logs }) => Ok(logs),
        Err(_) => Err(SessionError::Protocol(
            "log response is neither a list nor an object with logs".into(),
        )),
    }
}
