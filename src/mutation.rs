use crate::catalog::Catalog;
use crate::controller::PlaybackController;
use crate::error::{MuzicError, Result};
use crate::media::MediaServices;
use crate::model::{Track, TrackId};
use log::{info, warn};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Rename/delete with write-back into the catalog and session.
///
/// Built as a short-lived borrow over the pieces it touches, so a second
/// mutation cannot start while one is running.
pub struct TrackMutationService<'a> {
    media: &'a mut MediaServices,
    catalog: &'a mut Catalog,
    controller: &'a mut PlaybackController,
}

impl<'a> TrackMutationService<'a> {
    pub fn new(
        media: &'a mut MediaServices,
        catalog: &'a mut Catalog,
        controller: &'a mut PlaybackController,
    ) -> Self {
        Self {
            media,
            catalog,
            controller,
        }
    }

    /// Moves the file next to itself under `new_title`, keeping the
    /// extension. Playback of the track is left running.
    pub fn rename(&mut self, id: &TrackId, new_title: &str) -> Result<Track> {
        let title = new_title.trim();
        if !is_plain_file_name(title) {
            return Err(MuzicError::InvalidTitle);
        }

        let current = self
            .catalog
            .get(id)
            .cloned()
            .ok_or_else(|| MuzicError::TrackNotFound(id.clone()))?;

        if !self
            .media
            .permissions
            .request_audio_library_access()
            .is_granted()
        {
            return Err(MuzicError::PermissionDenied);
        }

        let destination = renamed_uri(&current.uri, title);
        if destination != current.uri {
            self.media
                .mover
                .move_file(&current.uri, &destination)
                .map_err(|source| MuzicError::RenameIo {
                    from: current.uri.clone(),
                    to: destination.clone(),
                    source,
                })?;
            self.media.source.patch_asset_uri(id, &destination);
        }

        let updated = current.renamed(title, destination);
        self.catalog.replace(updated.clone());
        info!(
            "renamed {} -> {}",
            current.uri.display(),
            updated.uri.display()
        );
        Ok(updated)
    }

    /// Deletes through the media store. Callers confirm with the user first.
    pub fn delete(&mut self, id: &TrackId) -> Result<()> {
        if !self.catalog.contains(id) {
            return Err(MuzicError::TrackNotFound(id.clone()));
        }

        match self.media.source.delete_assets(std::slice::from_ref(id)) {
            Ok(true) => {}
            Ok(false) => {
                return Err(MuzicError::DeleteFailure {
                    id: id.clone(),
                    reason: String::from("the media store refused the request"),
                });
            }
            Err(err) => {
                warn!("delete of {id} failed: {err:#}");
                return Err(MuzicError::DeleteFailure {
                    id: id.clone(),
                    reason: format!("{err:#}"),
                });
            }
        }

        self.catalog.remove(id);
        self.controller.forget_track(id);
        info!("deleted track {id}");
        Ok(())
    }
}

/// A title must name a file in the track's own folder: no separators and
/// no `.`/`..`.
fn is_plain_file_name(title: &str) -> bool {
    !title.is_empty()
        && !title.contains(['/', '\\'])
        && title != "."
        && title != ".."
}

/// `<dir>/<title>.<ext>`, or just `<dir>/<title>` when there is no extension.
pub fn renamed_uri(uri: &Path, title: &str) -> PathBuf {
    let file_name = match uri.extension().and_then(OsStr::to_str) {
        Some(ext) => format!("{title}.{ext}"),
        None => title.to_string(),
    };
    match uri.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}
