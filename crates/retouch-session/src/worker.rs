//! The per-session render worker.
//!
//! Jobs are consumed strictly in submission order. A render job carries the
//! generation it was issued for; if the session has moved on by the time the
//! job is dequeued, or while it was being composed, the result is dropped
//! and the caller sees [`RenderOutcome::Superseded`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task;
use tracing::{debug, warn};

use retouch_core::{compose, encode, EditParameters, RasterFormat, RgbRaster};

use crate::error::{Result, SessionError};
use crate::remote::RemoteService;
use crate::store::{DerivedImage, RenderOutcome, Shared};

pub(crate) enum Job {
    Render {
        generation: u64,
        original: Arc<RgbRaster>,
        params: EditParameters,
        reply: oneshot::Sender<Result<RenderOutcome>>,
    },
    /// Tell the backend the asset is back to its uploaded content.
    Restore {
        generation: u64,
        original: Arc<RgbRaster>,
    },
    Flush(oneshot::Sender<()>),
}

pub(crate) async fn run<R: RemoteService>(
    shared: Arc<Shared<R>>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Render {
                generation,
                original,
                params,
                reply,
            } => {
                let outcome = render(&shared, generation, original, params).await;
                let published = match &outcome {
                    Ok(RenderOutcome::Published(derived)) => Some(derived.raster_arc()),
                    _ => None,
                };
                // The caller may have dropped its handle.
                let _ = reply.send(outcome);
                if let Some(raster) = published {
                    commit(&shared, generation, raster, true).await;
                }
                shared.lock().in_flight -= 1;
            }
            Job::Restore {
                generation,
                original,
            } => {
                commit(&shared, generation, original, false).await;
                shared.lock().in_flight -= 1;
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Render worker stopped");
}

async fn render<R: RemoteService>(
    shared: &Shared<R>,
    generation: u64,
    original: Arc<RgbRaster>,
    params: EditParameters,
) -> Result<RenderOutcome> {
    if !shared.is_current(generation) {
        debug!(generation, "Skipping stale render");
        return Ok(RenderOutcome::Superseded);
    }

    let composed = task::spawn_blocking(move || compose(&original, &params))
        .await
        .map_err(|e| SessionError::Protocol(format!("render task failed: {e}")))?;

    let mut state = shared.lock();
    if state.generation != generation {
        debug!(generation, current = state.generation, "Discarding overtaken render");
        return Ok(RenderOutcome::Superseded);
    }
    let derived = match composed {
        Ok(raster) => DerivedImage::new(Arc::new(raster), params, generation),
        Err(err) => {
            warn!(generation, error = %err, "Render failed, derived image kept");
            state.last_error = Some(err.to_string());
            return Err(err.into());
        }
    };
    state.last_error = None;
    shared.publish(&mut state, Some(derived.clone()));
    drop(state);

    debug!(
        generation,
        width = derived.width(),
        height = derived.height(),
        "Render published"
    );
    Ok(RenderOutcome::Published(derived))
}

/// Encode and push a raster to the backend. Failures are logged only.
async fn commit<R: RemoteService>(
    shared: &Shared<R>,
    generation: u64,
    raster: Arc<RgbRaster>,
    processed: bool,
) {
    let Some(asset_id) = shared.lock().asset_id.clone() else {
        return;
    };
    if !shared.is_current(generation) {
        debug!(generation, "Newer edit pending, skipping commit");
        return;
    }

    let format: RasterFormat = shared.config.commit_format;
    let bytes = match task::spawn_blocking(move || encode(&raster, format)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(err)) => {
            warn!(asset_id = %asset_id, error = %err, "Could not encode render for commit");
            return;
        }
        Err(err) => {
            warn!(asset_id = %asset_id, error = %err, "Encode task failed");
            return;
        }
    };

    let size = bytes.len();
    match shared.remote.commit(&asset_id, bytes, format, processed).await {
        Ok(()) => debug!(asset_id = %asset_id, size, processed, "Render committed"),
        Err(err) => warn!(asset_id = %asset_id, error = %err, "Commit failed, local state kept"),
    }
}
