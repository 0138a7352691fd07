use crate::catalog::Catalog;
use crate::config::{self, Settings};
use crate::controller::{PlaybackController, PlaybackState};
use crate::error::MuzicError;
use crate::media::MediaServices;
use crate::model::{PermissionStatus, Track, TrackId};
use crate::mutation::TrackMutationService;
use log::{error, info};
use std::path::Path;
use std::time::Duration;

/// Application state behind the terminal front end. Every failure ends up
/// in `status` as a dismissable alert; nothing here returns an error.
pub struct MuzicCore {
    pub settings: Settings,
    pub catalog: Catalog,
    pub controller: PlaybackController,
    pub media: MediaServices,
    pub permission: Option<PermissionStatus>,
    pub selected: usize,
    pub search_query: Option<String>,
    pub status: String,
    pub dirty: bool,
}

impl MuzicCore {
    pub fn new(settings: Settings, media: MediaServices, controller: PlaybackController) -> Self {
        Self {
            settings,
            catalog: Catalog::default(),
            controller,
            media,
            permission: None,
            selected: 0,
            search_query: None,
            status: String::from("Ready"),
            dirty: true,
        }
    }

    /// Asks for library access and enumerates the catalog once granted.
    pub fn ensure_library_access(&mut self) {
        let status = self.media.permissions.request_audio_library_access();
        self.permission = Some(status);
        match status {
            PermissionStatus::Granted => self.reload_catalog(),
            PermissionStatus::Denied => {
                self.alert(&MuzicError::PermissionDenied);
            }
        }
    }

    pub fn has_library_access(&self) -> bool {
        self.permission.is_some_and(PermissionStatus::is_granted)
    }

    pub fn reload_catalog(&mut self) {
        if !self.has_library_access() {
            self.alert(&MuzicError::PermissionDenied);
            return;
        }
        self.controller.stop();
        self.catalog = Catalog::load(self.media.source.as_mut(), self.settings.asset_limit);
        if self.controller.is_shuffled() {
            self.controller.set_shuffle(true, &self.catalog);
        }
        self.clamp_selection();
        self.set_status(&format!("{} songs", self.catalog.len()));
    }

    /// Adds a media folder, saves settings and re-enumerates.
    pub fn add_folder(&mut self, folder: &Path) {
        if !folder.is_dir() {
            self.set_status(&format!("Not a folder: {}", folder.display()));
            return;
        }
        if !self.settings.add_folder(folder) {
            self.set_status("Folder already added");
            return;
        }
        if let Err(err) = config::save_settings(&self.settings) {
            error!("failed to save settings: {err:#}");
            self.set_status(&format!("save error: {err:#}"));
        }
        self.media = MediaServices::for_folders(&self.settings.folders);
        self.ensure_library_access();
    }

    pub fn visible_tracks(&self) -> Vec<&Track> {
        match &self.search_query {
            Some(query) => self.catalog.search(query),
            None => self.catalog.tracks().iter().collect(),
        }
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.visible_tracks().get(self.selected).copied()
    }

    pub fn active_track(&self) -> Option<&Track> {
        self.controller.active_track(&self.catalog)
    }

    pub fn is_active(&self, id: &TrackId) -> bool {
        self.controller.active_track_id() == Some(id)
    }

    pub fn select_next(&mut self) {
        let len = self.visible_tracks().len();
        if len == 0 {
            return;
        }
        self.selected = (self.selected + 1).min(len - 1);
        self.dirty = true;
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.dirty = true;
    }

    pub fn begin_search(&mut self) {
        self.search_query = Some(String::new());
        self.selected = 0;
        self.dirty = true;
    }

    pub fn update_search(&mut self, query: &str) {
        self.search_query = Some(query.to_string());
        self.selected = 0;
        self.dirty = true;
    }

    /// Leaves search with the cursor still on the track it was on.
    pub fn end_search(&mut self) {
        let selected_id = self.selected_track().map(|track| track.id.clone());
        self.search_query = None;
        if let Some(index) = selected_id.and_then(|id| {
            self.catalog
                .tracks()
                .iter()
                .position(|track| track.id == id)
        }) {
            self.selected = index;
        }
        self.clamp_selection();
        self.dirty = true;
    }

    pub fn play_selected(&mut self) {
        let Some(track) = self.selected_track().cloned() else {
            self.set_status("Nothing selected");
            return;
        };
        match self.controller.play(&track) {
            Ok(()) => self.set_status(&format!("Playing {}", track.title)),
            Err(err) => self.alert(&err),
        }
    }

    pub fn play_next(&mut self) {
        let result = self.controller.play_next(&self.catalog);
        self.report_transport(result);
    }

    pub fn play_previous(&mut self) {
        let result = self.controller.play_previous(&self.catalog);
        self.report_transport(result);
    }

    /// Resumes, pauses, or restarts a track that already ran to its end.
    pub fn toggle_play_pause(&mut self) {
        let ended = self.controller.state() == PlaybackState::Idle;
        match self.active_track().cloned() {
            Some(track) if ended => {
                if let Err(err) = self.controller.play(&track) {
                    self.alert(&err);
                    return;
                }
            }
            Some(_) => self.controller.toggle_play_pause(),
            None => {
                self.set_status("Nothing is playing");
                return;
            }
        }
        let label = if self.controller.is_playing() {
            "Playing"
        } else {
            "Paused"
        };
        self.set_status(label);
    }

    pub fn toggle_repeat(&mut self) {
        let mode = self.controller.toggle_repeat();
        self.set_status(&format!("Repeat: {}", mode.label()));
    }

    pub fn toggle_shuffle(&mut self) {
        let on = self.controller.toggle_shuffle(&self.catalog);
        self.set_status(if on { "Shuffle on" } else { "Shuffle off" });
    }

    pub fn seek_to(&mut self, position_millis: u64) {
        if let Err(err) = self.controller.seek(position_millis) {
            self.alert(&err);
        }
        self.dirty = true;
    }

    /// Relative seek by the configured step, in either direction.
    pub fn seek_by_step(&mut self, forward: bool) {
        let Some(position) = self.controller.position() else {
            return;
        };
        let step = Duration::from_secs(u64::from(self.settings.seek_step_seconds));
        let target = if forward {
            position.saturating_add(step)
        } else {
            position.saturating_sub(step)
        };
        self.seek_to(u64::try_from(target.as_millis()).unwrap_or(u64::MAX));
    }

    /// Polls the player for a finished track and advances.
    pub fn tick(&mut self) {
        match self.controller.poll_finished(&self.catalog) {
            Ok(Some(_)) => {
                if let Some(track) = self.active_track() {
                    let message = format!("Playing {}", track.title);
                    self.set_status(&message);
                }
            }
            Ok(None) => {}
            Err(err) => self.alert(&err),
        }
    }

    pub fn rename(&mut self, id: &TrackId, new_title: &str) {
        let result =
            TrackMutationService::new(&mut self.media, &mut self.catalog, &mut self.controller)
                .rename(id, new_title);
        match result {
            Ok(track) => {
                info!("renamed track {} to {}", track.id, track.title);
                self.set_status("Song renamed successfully");
            }
            Err(err) => self.alert(&err),
        }
    }

    pub fn delete(&mut self, id: &TrackId) {
        let result =
            TrackMutationService::new(&mut self.media, &mut self.catalog, &mut self.controller)
                .delete(id);
        match result {
            Ok(()) => {
                self.clamp_selection();
                self.set_status("Song deleted successfully");
            }
            Err(err) => self.alert(&err),
        }
    }

    pub fn alert(&mut self, err: &MuzicError) {
        let message = match err {
            MuzicError::PermissionDenied => {
                String::from("Permission denied: storage access is required")
            }
            MuzicError::PlaybackLoadError { .. } => {
                String::from("Failed to play the song. Please try again.")
            }
            MuzicError::RenameIo { .. } => String::from(
                "Failed to rename song. File system permissions might be restricted.",
            ),
            MuzicError::DeleteFailure { .. } => String::from("Could not delete the song"),
            other => other.to_string(),
        };
        error!("{err}");
        self.set_status(&message);
    }

    fn report_transport(&mut self, result: Result<Option<TrackId>, MuzicError>) {
        match result {
            Ok(Some(_)) => {
                if let Some(track) = self.active_track() {
                    let message = format!("Playing {}", track.title);
                    self.set_status(&message);
                }
            }
            Ok(None) => self.set_status("No songs to play"),
            Err(err) => self.alert(&err),
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_tracks().len();
        self.selected = self.selected.min(len.saturating_sub(1));
        self.dirty = true;
    }

    pub fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}
