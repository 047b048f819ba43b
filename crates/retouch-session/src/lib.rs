//! Retouch Session - edit state store and remote sync
//!
//! [`EditSession`] keeps the original, the current edit parameters and the
//! latest derived image for one uploaded photo. Renders run on a per-session
//! worker and are committed to the processing service through a
//! [`RemoteService`] implementation.
//!
//! ```ignore
//! let config = SessionConfig::load("retouch.toml")?;
//! let remote = Arc::new(HttpRemote::new(config.clone())?);
//! let session = EditSession::new(remote, config)?;
//! session.set_original(bytes, "holiday.jpg").await?;
//! session.rotate(90.0)?;
//! session.adjust_color(120.0, 100.0, 100.0)?.wait().await?;
//! let processed = session.download().await?;
//! ```

pub mod config;
pub mod error;
pub mod remote;
mod store;
mod worker;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use remote::{HttpRemote, LogEntry, MemoryRemote, OperationOutcome, RemoteService};
pub use store::{
    DerivedImage, EditSession, ProcessingStatus, RenderHandle, RenderOutcome, SessionSnapshot,
};

pub use retouch_core::{ColorAdjustments, CropRect, EditParameters, NamedOperation};
