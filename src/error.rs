//! Failure taxonomy for catalog, playback and track mutations.
//!
//! Every variant is recovered where it happens; `core` turns them into a
//! status alert and nothing is retried automatically.

use crate::model::TrackId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MuzicError {
    /// Storage or library access was declined.
    #[error("permission denied: storage access is required")]
    PermissionDenied,
    /// Enumeration failed. Callers treat this as an empty catalog.
    #[error("failed to load catalog: {reason}")]
    CatalogLoadFailure { reason: String },
    /// The audio player rejected a resource.
    #[error("failed to play {}: {reason}", uri.display())]
    PlaybackLoadError { uri: PathBuf, reason: String },
    #[error("seek failed: {reason}")]
    Seek { reason: String },
    #[error("failed to rename {}: {source}", from.display())]
    RenameIo {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not delete track {id}: {reason}")]
    DeleteFailure { id: TrackId, reason: String },
    #[error("title must be a non-empty file name")]
    InvalidTitle,
    #[error("track {0} is not in the catalog")]
    TrackNotFound(TrackId),
}

pub type Result<T> = std::result::Result<T, MuzicError>;
