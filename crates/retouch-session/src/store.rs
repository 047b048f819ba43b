//! The edit state store.
//!
//! An [`EditSession`] owns the decoded original, the current
//! [`EditParameters`], and the most recent derived image. Geometry and colour
//! mutators update the parameters synchronously and queue a render of the
//! *complete* parameter set against the original; the session's worker
//! publishes the result and commits it to the remote asset in the
//! background. Nothing is ever rendered from a previous render.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task;
use tracing::{debug, info, warn};

use retouch_core::compose::RenderPlan;
use retouch_core::geometry::{check_crop, validate_crop};
use retouch_core::{
    decode_image, ColorAdjustments, CropRect, EditParameters, NamedOperation, RgbRaster,
};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::remote::{LogEntry, OperationOutcome, RemoteService};
use crate::worker::{self, Job};

/// An immutable render result.
///
/// Cloning shares the pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedImage {
    raster: Arc<RgbRaster>,
    params: EditParameters,
    generation: u64,
}

impl DerivedImage {
    pub(crate) fn new(raster: Arc<RgbRaster>, params: EditParameters, generation: u64) -> Self {
        Self {
            raster,
            params,
            generation,
        }
    }

    pub fn raster(&self) -> &RgbRaster {
        &self.raster
    }

    pub(crate) fn raster_arc(&self) -> Arc<RgbRaster> {
        Arc::clone(&self.raster)
    }

    /// Parameters this image was rendered with.
    pub fn params(&self) -> &EditParameters {
        &self.params
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn width(&self) -> u32 {
        self.raster.width
    }

    pub fn height(&self) -> u32 {
        self.raster.height
    }
}

/// Result of one queued render.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Published(DerivedImage),
    /// A later edit was issued before this render could be shown.
    Superseded,
}

impl RenderOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RenderOutcome::Published(_))
    }
}

/// Awaitable handle returned by every geometry and colour mutator.
///
/// Dropping it does not cancel the render.
#[derive(Debug)]
pub struct RenderHandle {
    generation: u64,
    reply: oneshot::Receiver<Result<RenderOutcome>>,
}

impl RenderHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the render to be published or superseded.
    ///
    /// Parameters that cannot be rendered are refused by the mutator, so an
    /// error here means the render task itself broke down. The parameters
    /// stay as issued and the error is kept in the snapshot.
    pub async fn wait(self) -> Result<RenderOutcome> {
        self.reply.await.unwrap_or(Ok(RenderOutcome::Superseded))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    /// No original loaded.
    Empty,
    /// The derived image reflects the current parameters.
    Idle,
    /// Renders or commits are queued.
    Busy,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: ProcessingStatus,
    pub asset_id: Option<String>,
    pub original_name: Option<String>,
    pub params: EditParameters,
    pub derived: Option<DerivedImage>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct Original {
    raster: Arc<RgbRaster>,
    name: String,
}

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    original: Option<Original>,
    pub(crate) asset_id: Option<String>,
    pub(crate) params: EditParameters,
    pub(crate) derived: Option<DerivedImage>,
    pub(crate) last_error: Option<String>,
    pub(crate) generation: u64,
    pub(crate) in_flight: usize,
}

/// State shared between the session handle and its worker.
pub(crate) struct Shared<R> {
    pub(crate) remote: Arc<R>,
    pub(crate) config: SessionConfig,
    state: Mutex<SessionState>,
    derived_tx: watch::Sender<Option<DerivedImage>>,
}

impl<R> Shared<R> {
    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Replace the derived image and notify subscribers.
    ///
    /// Takes the locked state so the stored image and the broadcast one can
    /// never be observed out of step.
    pub(crate) fn publish(&self, state: &mut SessionState, derived: Option<DerivedImage>) {
        state.derived = derived.clone();
        self.derived_tx.send_replace(derived);
    }
}

/// One editing session over a single uploaded image.
pub struct EditSession<R: RemoteService> {
    shared: Arc<Shared<R>>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl<R: RemoteService> EditSession<R> {
    /// Create a session and start its render worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(remote: Arc<R>, config: SessionConfig) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| SessionError::Config(format!("no Tokio runtime: {e}")))?;

        let (derived_tx, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            remote,
            config,
            state: Mutex::new(SessionState::default()),
            derived_tx,
        });
        let (jobs, rx) = mpsc::unbounded_channel();
        handle.spawn(worker::run(Arc::clone(&shared), rx));

        Ok(Self { shared, jobs })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Decode and upload a new original, replacing the current one.
    ///
    /// The upload is awaited. On any failure the previous original, asset
    /// and parameters are left untouched.
    pub async fn set_original(&self, bytes: Vec<u8>, name: &str) -> Result<DerivedImage> {
        let (bytes, raster) = task::spawn_blocking(move || {
            decode_image(&bytes).map(|raster| (bytes, raster))
        })
        .await
        .map_err(|e| SessionError::Protocol(format!("decode task failed: {e}")))??;

        let (width, height) = raster.dimensions();
        let asset_id = self.shared.remote.upload(bytes, name).await?;
        info!(asset_id = %asset_id, width, height, "Original uploaded");

        let raster = Arc::new(raster);
        let mut state = self.shared.lock();
        state.generation += 1;
        let derived =
            DerivedImage::new(Arc::clone(&raster), EditParameters::default(), state.generation);
        state.original = Some(Original {
            raster,
            name: name.to_string(),
        });
        state.asset_id = Some(asset_id);
        state.params = EditParameters::default();
        state.last_error = None;
        self.shared.publish(&mut state, Some(derived.clone()));
        Ok(derived)
    }

    /// Rotate by `delta` degrees on top of the current rotation.
    pub fn rotate(&self, delta: f64) -> Result<RenderHandle> {
        self.submit(|params, _| {
            params.rotate_by(delta)?;
            Ok(())
        })
    }

    /// Set or remove the crop. The crop is validated against the original.
    pub fn set_crop(&self, crop: Option<CropRect>) -> Result<RenderHandle> {
        self.submit(|params, original| {
            if let Some(rect) = &crop {
                check_crop(rect, original.width, original.height)?;
            }
            params.crop = crop;
            Ok(())
        })
    }

    pub fn set_scale(&self, factor: f64) -> Result<RenderHandle> {
        self.submit(|params, _| {
            EditParameters::validate_scale(factor)?;
            params.scale = factor;
            Ok(())
        })
    }

    /// Replace all three colour adjustments, in percent.
    pub fn adjust_color(
        &self,
        brightness: f64,
        contrast: f64,
        saturation: f64,
    ) -> Result<RenderHandle> {
        let color = ColorAdjustments::new(brightness, contrast, saturation);
        self.submit(|params, _| {
            color.validate()?;
            params.color = color;
            Ok(())
        })
    }

    /// Validate a crop candidate without applying it, e.g. while dragging.
    pub fn preview_crop(&self, candidate: &CropRect) -> bool {
        let state = self.shared.lock();
        match &state.original {
            Some(original) => {
                validate_crop(candidate, original.raster.width, original.raster.height)
            }
            None => false,
        }
    }

    /// Drop every edit. The derived image becomes the original immediately
    /// and the backend is told the asset is unprocessed again.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.shared.lock();
        let raster = match &state.original {
            Some(original) => Arc::clone(&original.raster),
            None => return Err(SessionError::NoImage),
        };
        let generation = state.generation + 1;
        self.jobs
            .send(Job::Restore {
                generation,
                original: Arc::clone(&raster),
            })
            .map_err(|_| worker_stopped())?;

        state.generation = generation;
        state.in_flight += 1;
        state.params = EditParameters::default();
        state.last_error = None;
        let derived = DerivedImage::new(raster, EditParameters::default(), generation);
        self.shared.publish(&mut state, Some(derived));
        debug!(generation, "Edits reset");
        Ok(())
    }

    /// Forget the original and every edit. Queued renders become stale.
    pub fn clear(&self) {
        let mut state = self.shared.lock();
        state.generation += 1;
        state.original = None;
        state.asset_id = None;
        state.params = EditParameters::default();
        state.last_error = None;
        self.shared.publish(&mut state, None);
    }

    /// Run a named operation on the remote asset.
    ///
    /// Pending renders are flushed first so the service works on the latest
    /// local result. A returned asset id becomes the target of later commits;
    /// local parameters are kept.
    pub async fn apply_operation(&self, operation: NamedOperation) -> Result<OperationOutcome> {
        operation.validate()?;
        self.flush().await;

        let asset_id = self.asset_id().ok_or(SessionError::NoImage)?;
        let outcome = self.shared.remote.apply_operation(&asset_id, &operation).await?;

        if let OperationOutcome::Asset(new_id) = &outcome {
            let mut state = self.shared.lock();
            if state.asset_id.as_deref() == Some(asset_id.as_str()) {
                state.asset_id = Some(new_id.clone());
            } else {
                warn!(
                    operation = operation.name(),
                    asset_id = %new_id,
                    "Original replaced during operation, result not adopted"
                );
            }
        }
        info!(operation = operation.name(), asset_id = %asset_id, "Operation applied");
        Ok(outcome)
    }

    /// Fetch the processed asset once every queued commit has been sent.
    pub async fn download(&self) -> Result<Vec<u8>> {
        self.flush().await;
        let asset_id = self.asset_id().ok_or(SessionError::NoImage)?;
        self.shared.remote.fetch_for_download(&asset_id).await
    }

    /// The service's activity log. Needs no loaded image.
    pub async fn fetch_logs(&self) -> Result<Vec<LogEntry>> {
        self.shared.remote.fetch_logs().await
    }

    /// Wait until every job queued so far has been processed.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.jobs.send(Job::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn params(&self) -> EditParameters {
        self.shared.lock().params
    }

    pub fn derived(&self) -> Option<DerivedImage> {
        self.shared.lock().derived.clone()
    }

    pub fn asset_id(&self) -> Option<String> {
        self.shared.lock().asset_id.clone()
    }

    /// Receiver notified on every published derived image.
    pub fn subscribe(&self) -> watch::Receiver<Option<DerivedImage>> {
        self.shared.derived_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.shared.lock();
        let status = if state.original.is_none() {
            ProcessingStatus::Empty
        } else if state.in_flight > 0 {
            ProcessingStatus::Busy
        } else {
            ProcessingStatus::Idle
        };
        SessionSnapshot {
            status,
            asset_id: state.asset_id.clone(),
            original_name: state.original.as_ref().map(|o| o.name.clone()),
            params: state.params,
            derived: state.derived.clone(),
            last_error: state.last_error.clone(),
        }
    }

    /// Apply `mutate` to a copy of the parameters and queue a render of the
    /// result.
    ///
    /// The output geometry is planned here as well, so parameters the
    /// compositor would refuse never reach the session. Nothing changes if
    /// either step fails.
    fn submit<F>(&self, mutate: F) -> Result<RenderHandle>
    where
        F: FnOnce(&mut EditParameters, &RgbRaster) -> Result<()>,
    {
        let mut state = self.shared.lock();
        let original = match &state.original {
            Some(original) => Arc::clone(&original.raster),
            None => return Err(SessionError::NoImage),
        };

        let mut params = state.params;
        mutate(&mut params, &original)?;
        RenderPlan::new(original.width, original.height, &params)?;

        let generation = state.generation + 1;
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(Job::Render {
                generation,
                original,
                params,
                reply,
            })
            .map_err(|_| worker_stopped())?;

        state.generation = generation;
        state.in_flight += 1;
        state.params = params;
        debug!(generation, rotation = params.rotation, scale = params.scale, "Render queued");

        Ok(RenderHandle {
            generation,
            reply: rx,
        })
    }
}

fn worker_stopped() -> SessionError {
    SessionError::Protocol("render worker has stopped".into())
}
