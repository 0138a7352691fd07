use crate::audio::AudioPlayer;
use crate::catalog::Catalog;
use crate::error::{MuzicError, Result};
use crate::model::{RepeatMode, Track, TrackId};
use crate::navigator::Navigator;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Ephemeral per-run state. Only the active id is kept, so the pointer
/// always resolves to the catalog's current copy of the track.
#[derive(Debug, Default)]
pub struct PlaybackSession {
    active_track_id: Option<TrackId>,
    repeat_mode: RepeatMode,
    navigator: Navigator,
}

impl PlaybackSession {
    pub fn new(navigator: Navigator) -> Self {
        Self {
            active_track_id: None,
            repeat_mode: RepeatMode::Off,
            navigator,
        }
    }

    pub fn active_track_id(&self) -> Option<&TrackId> {
        self.active_track_id.as_ref()
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn is_shuffled(&self) -> bool {
        self.navigator.is_shuffled()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn current_order<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Track> {
        self.navigator.current_order(catalog)
    }
}

/// Rate-limited sampling of the player's "finished" flag. Armed while a
/// track is loaded and not yet reported finished.
#[derive(Debug)]
struct FinishWatch {
    armed: bool,
    interval: Duration,
    last_sample: Option<Instant>,
}

impl FinishWatch {
    fn new(interval: Duration) -> Self {
        Self {
            armed: false,
            interval,
            last_sample: None,
        }
    }

    fn arm(&mut self) {
        self.armed = true;
        self.last_sample = None;
    }

    fn cancel(&mut self) {
        self.armed = false;
        self.last_sample = None;
    }

    fn should_sample(&mut self, now: Instant) -> bool {
        if !self.armed {
            return false;
        }
        let due = self
            .last_sample
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last_sample = Some(now);
        }
        due
    }
}

/// Sole owner of the audio player handle.
pub struct PlaybackController {
    session: PlaybackSession,
    player: Box<dyn AudioPlayer>,
    watch: FinishWatch,
}

impl PlaybackController {
    pub fn new(player: Box<dyn AudioPlayer>, finish_poll_interval: Duration) -> Self {
        Self::with_navigator(player, finish_poll_interval, Navigator::new())
    }

    pub fn with_navigator(
        player: Box<dyn AudioPlayer>,
        finish_poll_interval: Duration,
        navigator: Navigator,
    ) -> Self {
        Self {
            session: PlaybackSession::new(navigator),
            player,
            watch: FinishWatch::new(finish_poll_interval),
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn active_track_id(&self) -> Option<&TrackId> {
        self.session.active_track_id.as_ref()
    }

    pub fn active_track<'a>(&self, catalog: &'a Catalog) -> Option<&'a Track> {
        catalog.get(self.session.active_track_id.as_ref()?)
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.session.repeat_mode
    }

    pub fn is_shuffled(&self) -> bool {
        self.session.is_shuffled()
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    pub fn position(&self) -> Option<Duration> {
        self.player.position()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.player.duration()
    }

    pub fn output_name(&self) -> Option<String> {
        self.player.output_name()
    }

    pub fn state(&self) -> PlaybackState {
        if self.session.active_track_id.is_none() || !self.watch.armed {
            PlaybackState::Idle
        } else if self.player.is_playing() {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    /// Loads and starts `track`, replacing whatever was loaded before.
    pub fn play(&mut self, track: &Track) -> Result<()> {
        if let Err(err) = self.player.load(&track.uri) {
            warn!("player rejected {}: {err:#}", track.uri.display());
            self.player.stop();
            self.session.active_track_id = None;
            self.watch.cancel();
            return Err(MuzicError::PlaybackLoadError {
                uri: track.uri.clone(),
                reason: format!("{err:#}"),
            });
        }

        self.player.play();
        self.session.active_track_id = Some(track.id.clone());
        self.watch.arm();
        debug!("playing {} ({})", track.title, track.id);
        Ok(())
    }

    pub fn toggle_play_pause(&mut self) {
        if self.session.active_track_id.is_none() {
            return;
        }
        if self.player.is_playing() {
            self.player.pause();
        } else {
            self.player.play();
        }
    }

    /// Advances according to the repeat mode. Returns the id that was
    /// started, or `None` when playback stops at the end of the order.
    pub fn on_track_finished(&mut self, catalog: &Catalog) -> Result<Option<TrackId>> {
        let Some(active) = self.session.active_track_id.clone() else {
            return Ok(None);
        };

        let navigator = &self.session.navigator;
        let target = match self.session.repeat_mode {
            RepeatMode::One => catalog.get(&active),
            RepeatMode::All => navigator.next(&active, catalog),
            RepeatMode::Off => {
                if navigator.is_last(&active, catalog) {
                    None
                } else {
                    navigator.next(&active, catalog)
                }
            }
        }
        .cloned();

        match target {
            Some(track) => {
                self.play(&track)?;
                Ok(Some(track.id))
            }
            None => {
                info!("reached end of playlist");
                self.watch.cancel();
                Ok(None)
            }
        }
    }

    /// Samples the player at most once per poll interval and dispatches a
    /// single finish per loaded track.
    pub fn poll_finished(&mut self, catalog: &Catalog) -> Result<Option<TrackId>> {
        self.poll_finished_at(catalog, Instant::now())
    }

    fn poll_finished_at(&mut self, catalog: &Catalog, now: Instant) -> Result<Option<TrackId>> {
        if !self.watch.should_sample(now) || !self.player.is_finished() {
            return Ok(None);
        }
        self.watch.cancel();
        self.on_track_finished(catalog)
    }

    /// Manual skip. Always wraps; starts at the top when nothing is active.
    pub fn play_next(&mut self, catalog: &Catalog) -> Result<Option<TrackId>> {
        let navigator = &self.session.navigator;
        let target = match &self.session.active_track_id {
            Some(active) => navigator.next(active, catalog),
            None => navigator.first(catalog),
        }
        .cloned();
        self.play_target(target)
    }

    /// Manual skip back. Always wraps; starts at the bottom when nothing is
    /// active.
    pub fn play_previous(&mut self, catalog: &Catalog) -> Result<Option<TrackId>> {
        let navigator = &self.session.navigator;
        let target = match &self.session.active_track_id {
            Some(active) => navigator.previous(active, catalog),
            None => navigator.last(catalog),
        }
        .cloned();
        self.play_target(target)
    }

    fn play_target(&mut self, target: Option<Track>) -> Result<Option<TrackId>> {
        match target {
            Some(track) => {
                self.play(&track)?;
                Ok(Some(track.id))
            }
            None => Ok(None),
        }
    }

    /// Forwarded as seconds; range checks are left to the player.
    pub fn seek(&mut self, position_millis: u64) -> Result<()> {
        if self.session.active_track_id.is_none() {
            return Ok(());
        }
        self.player
            .seek(Duration::from_millis(position_millis))
            .map_err(|err| MuzicError::Seek {
                reason: format!("{err:#}"),
            })
    }

    pub fn toggle_repeat(&mut self) -> RepeatMode {
        self.session.repeat_mode = self.session.repeat_mode.next();
        self.session.repeat_mode
    }

    pub fn toggle_shuffle(&mut self, catalog: &Catalog) -> bool {
        let on = !self.session.navigator.is_shuffled();
        self.set_shuffle(on, catalog);
        on
    }

    pub fn set_shuffle(&mut self, on: bool, catalog: &Catalog) {
        self.session.navigator.set_shuffle(on, catalog);
    }

    /// Stops the player and returns to `Idle`.
    pub fn stop(&mut self) {
        self.player.stop();
        self.session.active_track_id = None;
        self.watch.cancel();
    }

    pub(crate) fn forget_track(&mut self, id: &TrackId) {
        self.session.navigator.forget(id);
        if self.session.active_track_id.as_ref() == Some(id) {
            self.stop();
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.watch.cancel();
        self.player.stop();
    }
}
