//! In-process backend with the service's status semantics.
//!
//! Used by tests and offline tooling. Assets live in a map; named operations
//! copy the asset under a new id (histograms are computed for real), and
//! uploads or commits can be made to fail on demand. Every accepted upload,
//! commit and operation is appended to an activity log.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use retouch_core::decode::decode_image_no_orientation;
use retouch_core::{HistogramReport, NamedOperation, RasterFormat};

use super::{LogEntry, OperationOutcome, RemoteService};
use crate::error::{Result, SessionError};

/// One commit as the backend received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub asset_id: String,
    pub processed: bool,
    pub format: RasterFormat,
    pub size: usize,
}

#[derive(Debug)]
struct StoredAsset {
    bytes: Vec<u8>,
    processed: bool,
}

#[derive(Debug, Default)]
struct Backend {
    assets: HashMap<String, StoredAsset>,
    next_id: u64,
    commits: Vec<CommitRecord>,
    log: Vec<LogEntry>,
    fail_uploads: bool,
    fail_commits: bool,
}

impl Backend {
    fn mint_id(&mut self, stem: &str) -> String {
        self.next_id += 1;
        format!("{}_{stem}", self.next_id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryRemote {
    backend: Mutex<Backend>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every following upload fail until switched off.
    pub fn fail_uploads(&self, fail: bool) {
        self.lock().fail_uploads = fail;
    }

    /// Make every following commit fail until switched off.
    pub fn fail_commits(&self, fail: bool) {
        self.lock().fail_commits = fail;
    }

    /// Successful commits, oldest first.
    pub fn commits(&self) -> Vec<CommitRecord> {
        self.lock().commits.clone()
    }

    pub fn is_processed(&self, asset_id: &str) -> Option<bool> {
        self.lock().assets.get(asset_id).map(|a| a.processed)
    }

    /// Current bytes of an asset, regardless of its processed flag.
    pub fn asset_bytes(&self, asset_id: &str) -> Option<Vec<u8>> {
        self.lock().assets.get(asset_id).map(|a| a.bytes.clone())
    }

    pub fn asset_count(&self) -> usize {
        self.lock().assets.len()
    }
}

impl RemoteService for MemoryRemote {
    async fn upload(&self, bytes: Vec<u8>, name: &str) -> Result<String> {
        let mut backend = self.lock();
        if backend.fail_uploads {
            return Err(SessionError::Upload("upload rejected".into()));
        }
        let id = backend.mint_id(name);
        backend
            .log
            .push(LogEntry::new("upload", &id).with_detail("original_name", name));
        backend.assets.insert(
            id.clone(),
            StoredAsset {
                bytes,
                processed: false,
            },
        );
        Ok(id)
    }

    async fn commit(
        &self,
        asset_id: &str,
        bytes: Vec<u8>,
        format: RasterFormat,
        processed: bool,
    ) -> Result<()> {
        let mut backend = self.lock();
        if backend.fail_commits {
            return Err(SessionError::Network("commit rejected".into()));
        }
        let size = bytes.len();
        let asset = backend
            .assets
            .get_mut(asset_id)
            .ok_or_else(|| SessionError::NotFound(asset_id.to_string()))?;
        asset.bytes = bytes;
        asset.processed = processed;
        backend.commits.push(CommitRecord {
            asset_id: asset_id.to_string(),
            processed,
            format,
            size,
        });
        backend
            .log
            .push(LogEntry::new("update", asset_id).with_detail("processed", processed));
        Ok(())
    }

    async fn apply_operation(
        &self,
        asset_id: &str,
        operation: &NamedOperation,
    ) -> Result<OperationOutcome> {
        operation.validate()?;
        let mut backend = self.lock();
        let source = backend
            .assets
            .get(asset_id)
            .ok_or_else(|| SessionError::NotFound(asset_id.to_string()))?;

        if !operation.modifies_image() {
            let raster = decode_image_no_orientation(&source.bytes)?;
            backend.log.push(LogEntry::new(operation.name(), asset_id));
            return Ok(OperationOutcome::Histogram(HistogramReport::from_raster(
                &raster,
            )));
        }

        let bytes = source.bytes.clone();
        let id = backend.mint_id(&format!("{}_{asset_id}", operation.name()));
        backend.assets.insert(
            id.clone(),
            StoredAsset {
                bytes,
                processed: true,
            },
        );
        backend
            .log
            .push(LogEntry::new(operation.name(), asset_id).with_detail("result", id.as_str()));
        Ok(OperationOutcome::Asset(id))
    }

    async fn fetch_for_download(&self, asset_id: &str) -> Result<Vec<u8>> {
        let backend = self.lock();
        match backend.assets.get(asset_id) {
            None => Err(SessionError::NotFound(asset_id.to_string())),
            Some(asset) if !asset.processed => {
                Err(SessionError::NotYetProcessed(asset_id.to_string()))
            }
            Some(asset) => Ok(asset.bytes.clone()),
        }
    }

    async fn fetch_logs(&self) -> Result<Vec<LogEntry>> {
        Ok(self.lock().log.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retouch_core::encode::encode_png;
    use retouch_core::operation::{NoiseKind, SobelDirection};
    use retouch_core::RgbRaster;

    #[tokio::test]
    async fn test_download_requires_processed_commit() {
        let remote = MemoryRemote::new();
        let id = remote.upload(vec![1, 2, 3], "a.png").await.unwrap();

        assert!(matches!(
            remote.fetch_for_download(&id).await,
            Err(SessionError::NotYetProcessed(_))
        ));

        remote
            .commit(&id, vec![4, 5], RasterFormat::Png, true)
            .await
            .unwrap();
        assert_eq!(remote.fetch_for_download(&id).await.unwrap(), vec![4, 5]);

        remote
            .commit(&id, vec![1, 2, 3], RasterFormat::Png, false)
            .await
            .unwrap();
        assert!(remote.fetch_for_download(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_asset_is_not_found() {
        let remote = MemoryRemote::new();
        assert!(matches!(
            remote.fetch_for_download("nope").await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            remote.commit("nope", vec![], RasterFormat::Png, true).await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let remote = MemoryRemote::new();
        remote.fail_uploads(true);
        assert!(matches!(
            remote.upload(vec![0], "a.png").await,
            Err(SessionError::Upload(_))
        ));
        remote.fail_uploads(false);
        let id = remote.upload(vec![0], "a.png").await.unwrap();

        remote.fail_commits(true);
        assert!(remote
            .commit(&id, vec![1], RasterFormat::Png, true)
            .await
            .is_err());
        assert!(remote.commits().is_empty());
        assert_eq!(remote.is_processed(&id), Some(false));
    }

    #[tokio::test]
    async fn test_operation_creates_processed_asset() {
        let remote = MemoryRemote::new();
        let id = remote.upload(vec![9], "a.png").await.unwrap();
        let op = NamedOperation::Filter {
            kind: retouch_core::operation::FilterKind::Sobel(SobelDirection::Y),
            kernel_size: 3,
        };
        let OperationOutcome::Asset(new_id) = remote.apply_operation(&id, &op).await.unwrap() else {
            panic!("expected a new asset");
        };
        assert_ne!(new_id, id);
        assert_eq!(remote.is_processed(&new_id), Some(true));
        assert_eq!(remote.fetch_for_download(&new_id).await.unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn test_histogram_of_stored_asset() {
        let remote = MemoryRemote::new();
        let png = encode_png(&RgbRaster::filled(4, 4, [10, 20, 30])).unwrap();
        let id = remote.upload(png, "a.png").await.unwrap();

        let outcome = remote
            .apply_operation(&id, &NamedOperation::HistogramGet)
            .await
            .unwrap();
        let OperationOutcome::Histogram(report) = outcome else {
            panic!("expected histogram");
        };
        assert_eq!(report.histograms.max_value(), 16);
        assert_eq!(remote.asset_count(), 1);
    }

    #[tokio::test]
    async fn test_activity_log_records_accepted_calls() {
        let remote = MemoryRemote::new();
        assert!(remote.fetch_logs().await.unwrap().is_empty());

        let png = encode_png(&RgbRaster::filled(4, 4, [10, 20, 30])).unwrap();
        let id = remote.upload(png.clone(), "a.png").await.unwrap();
        remote
            .commit(&id, png, RasterFormat::Png, true)
            .await
            .unwrap();
        remote.fail_commits(true);
        let _ = remote.commit(&id, vec![], RasterFormat::Png, false).await;
        remote
            .apply_operation(&id, &NamedOperation::HistogramGet)
            .await
            .unwrap();

        let logs = remote.fetch_logs().await.unwrap();
        let actions: Vec<_> = logs.iter().filter_map(|e| e.action.as_deref()).collect();
        assert_eq!(actions, ["upload", "update", "histogram"]);
        assert_eq!(logs[0].filename.as_deref(), Some(id.as_str()));
        assert_eq!(logs[0].details["original_name"], "a.png");
        assert_eq!(logs[1].details["processed"], true);
    }

    #[tokio::test]
    async fn test_invalid_operation_rejected() {
        let remote = MemoryRemote::new();
        let id = remote.upload(vec![0], "a.png").await.unwrap();
        let op = NamedOperation::AddNoise {
            kind: NoiseKind::Periodic,
            density: 0,
        };
        assert!(matches!(
            remote.apply_operation(&id, &op).await,
            Err(SessionError::Validation(_))
        ));
        assert_eq!(remote.asset_count(), 1);
    }
}
