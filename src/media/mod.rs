//! Platform collaborators: library access, enumeration and file moves.
//!
//! The core never touches the filesystem directly; it goes through these
//! traits so tests can swap in fakes.

mod folder;

pub use folder::{FolderMediaSource, FolderPermissions, FsMover};

use crate::model::{AudioAsset, PermissionStatus, TrackId};
use anyhow::Result;
use std::io;
use std::path::{Path, PathBuf};

pub trait PermissionService {
    fn request_audio_library_access(&mut self) -> PermissionStatus;
}

pub trait MediaCatalogSource {
    fn list_audio_assets(&mut self, limit: usize) -> Result<Vec<AudioAsset>>;
    /// Local path for an asset, preferred over the uri reported by enumeration.
    fn resolve_local_uri(&self, id: &TrackId) -> Option<PathBuf>;
    /// `Ok(false)` means the store refused without an underlying error.
    fn delete_assets(&mut self, ids: &[TrackId]) -> Result<bool>;
    /// Records that an asset now lives at `uri`.
    fn patch_asset_uri(&mut self, _id: &TrackId, _uri: &Path) {}
}

pub trait FileMover {
    fn move_file(&mut self, from: &Path, to: &Path) -> io::Result<()>;
}

/// The three platform services bundled together.
pub struct MediaServices {
    pub permissions: Box<dyn PermissionService>,
    pub source: Box<dyn MediaCatalogSource>,
    pub mover: Box<dyn FileMover>,
}

impl MediaServices {
    pub fn new(
        permissions: Box<dyn PermissionService>,
        source: Box<dyn MediaCatalogSource>,
        mover: Box<dyn FileMover>,
    ) -> Self {
        Self {
            permissions,
            source,
            mover,
        }
    }

    /// Folder-backed services rooted at `folders`.
    pub fn for_folders(folders: &[PathBuf]) -> Self {
        Self::new(
            Box::new(FolderPermissions::new(folders.to_vec())),
            Box::new(FolderMediaSource::new(folders.to_vec())),
            Box::new(FsMover),
        )
    }
}
