use anyhow::{Context, Result, bail};
use rodio::Source;
use rodio::cpal::traits::HostTrait;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
#[cfg(unix)]
use std::ffi::CString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::time::Instant;

/// Handle to whatever actually produces sound. `load` replaces the current
/// source and leaves it paused; `play` starts it.
pub trait AudioPlayer {
    fn load(&mut self, uri: &Path) -> Result<()>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, position: Duration) -> Result<()>;
    fn is_playing(&self) -> bool;
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
    /// True once the loaded source has played through to its end.
    fn is_finished(&self) -> bool;
    fn output_name(&self) -> Option<String>;
}

pub struct RodioPlayer {
    stream: OutputStream,
    sink: Sink,
    current: Option<PathBuf>,
    track_duration: Option<Duration>,
}

impl RodioPlayer {
    pub fn new() -> Result<Self> {
        let (stream, sink) = Self::open_output_stream()?;
        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
        })
    }

    /// Default device first, then the first other output that starts.
    fn open_output_stream() -> Result<(OutputStream, Sink)> {
        let mut stream = with_silenced_stderr(|| {
            let default_err = match OutputStreamBuilder::from_default_device().and_then(|builder| {
                builder
                    .with_error_callback(|_| {})
                    .open_stream_or_fallback()
            }) {
                Ok(stream) => return Ok(stream),
                Err(err) => err,
            };

            let host = rodio::cpal::default_host();
            host.output_devices()
                .ok()
                .into_iter()
                .flatten()
                .find_map(|device| {
                    OutputStreamBuilder::from_device(device)
                        .and_then(|builder| {
                            builder.with_error_callback(|_| {}).open_stream_or_fallback()
                        })
                        .ok()
                })
                .ok_or_else(|| {
                    anyhow::Error::new(default_err)
                        .context("unable to start any audio output stream")
                })
        })?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        Ok((stream, sink))
    }
}

impl AudioPlayer for RodioPlayer {
    fn load(&mut self, uri: &Path) -> Result<()> {
        let file =
            File::open(uri).with_context(|| format!("failed to open track {}", uri.display()))?;
        let source =
            Decoder::try_from(file).with_context(|| format!("failed to decode {}", uri.display()))?;

        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.pause();
        self.track_duration = source.total_duration();
        self.sink.append(source);
        self.current = Some(uri.to_path_buf());
        Ok(())
    }

    fn play(&mut self) {
        if self.current.is_some() {
            self.sink.play();
        }
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            bail!("no active track");
        }

        self.sink
            .try_seek(position)
            .map_err(|err| anyhow::anyhow!("failed to seek current track: {err:?}"))
    }

    fn is_playing(&self) -> bool {
        self.current.is_some() && !self.sink.is_paused() && !self.sink.empty()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.sink.get_pos())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn is_finished(&self) -> bool {
        self.current.is_some() && !self.sink.is_paused() && self.sink.empty()
    }

    fn output_name(&self) -> Option<String> {
        Some(String::from("System default output (CPAL)"))
    }
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

/// Wall-clock stand-in used when no output device can be opened. It still
/// rejects files that are gone so load failures surface the same way.
pub struct NullPlayer {
    paused: bool,
    current: Option<PathBuf>,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
}

impl NullPlayer {
    pub fn new() -> Self {
        Self {
            paused: true,
            current: None,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
        }
    }

    fn estimate_duration(path: &Path) -> Option<Duration> {
        let file = File::open(path).ok()?;
        let source = Decoder::try_from(file).ok()?;
        source
            .total_duration()
            .filter(|duration| !duration.is_zero())
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }
}

impl Default for NullPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlayer for NullPlayer {
    fn load(&mut self, uri: &Path) -> Result<()> {
        if !uri.is_file() {
            bail!("track {} does not exist", uri.display());
        }
        self.paused = true;
        self.current = Some(uri.to_path_buf());
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = Self::estimate_duration(uri);
        Ok(())
    }

    fn play(&mut self) {
        if self.current.is_some() && self.paused {
            self.started_at = Some(Instant::now());
            self.paused = false;
        }
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn stop(&mut self) {
        self.current = None;
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = None;
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            bail!("no active track");
        }

        self.position_offset = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.current.is_some() && !self.paused && !self.is_finished()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.current_position())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.track_duration else {
            return false;
        };
        self.current.is_some() && !self.paused && self.current_position() >= duration
    }

    fn output_name(&self) -> Option<String> {
        Some(String::from("Null audio player"))
    }
}

#[cfg(test)]
mod tests {
    use super::{AudioPlayer, NullPlayer};
    use std::fs;
    use std::path::Path;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    fn write_test_wav(path: &Path, duration_ms: u32) {
        let sample_rate: u32 = 44_100;
        let channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let bytes_per_sample = u32::from(bits_per_sample / 8);
        let total_samples = (u64::from(sample_rate) * u64::from(duration_ms) / 1_000) as u32;
        let data_size = total_samples * u32::from(channels) * bytes_per_sample;
        let byte_rate = sample_rate * u32::from(channels) * bytes_per_sample;
        let block_align = channels * (bits_per_sample / 8);
        let riff_chunk_size = 36_u32.saturating_add(data_size);

        let mut bytes = Vec::with_capacity((44_u32 + data_size) as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&riff_chunk_size.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16_u32.to_le_bytes());
        bytes.extend_from_slice(&1_u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&bits_per_sample.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_size.to_le_bytes());
        bytes.resize((44_u32 + data_size) as usize, 0_u8);

        fs::write(path, bytes).expect("wav fixture should be written");
    }

    #[test]
    fn null_player_rejects_missing_files() {
        let mut player = NullPlayer::new();
        let err = player
            .load(Path::new("nonexistent-track.flac"))
            .expect_err("missing file should be rejected");
        assert!(err.to_string().contains("does not exist"));
        assert_eq!(player.position(), None);
    }

    #[test]
    fn null_player_load_waits_for_play() {
        let dir = tempdir().expect("tempdir");
        let track = dir.path().join("fixture.wav");
        write_test_wav(&track, 500);

        let mut player = NullPlayer::new();
        player.load(&track).expect("load");
        assert!(!player.is_playing());
        thread::sleep(Duration::from_millis(20));
        assert_eq!(player.position(), Some(Duration::ZERO));

        player.play();
        assert!(player.is_playing());
    }

    #[test]
    fn null_player_pause_and_resume_control_position_progression() {
        let dir = tempdir().expect("tempdir");
        let track = dir.path().join("fixture.wav");
        write_test_wav(&track, 2_000);

        let mut player = NullPlayer::new();
        player.load(&track).expect("load");
        player.play();
        thread::sleep(Duration::from_millis(20));

        player.pause();
        let paused = player.position().expect("position should be present");
        thread::sleep(Duration::from_millis(20));
        let paused_later = player.position().expect("position should be present");
        assert_eq!(paused_later, paused, "position should freeze while paused");

        player.play();
        thread::sleep(Duration::from_millis(20));
        let resumed = player.position().expect("position should be present");
        assert!(resumed > paused, "position should continue after resume");
    }

    #[test]
    fn null_player_seek_is_clamped_to_duration() {
        let dir = tempdir().expect("tempdir");
        let track = dir.path().join("fixture.wav");
        write_test_wav(&track, 1_000);

        let mut player = NullPlayer::new();
        player.load(&track).expect("load");
        player.seek(Duration::from_secs(12)).expect("seek");
        let position = player.position().expect("position should be present");
        let duration = player.duration().expect("duration should be detected");
        assert_eq!(position, duration);
    }

    #[test]
    fn null_player_finishes_when_known_duration_elapses() {
        let dir = tempdir().expect("tempdir");
        let track = dir.path().join("fixture.wav");
        write_test_wav(&track, 80);

        let mut player = NullPlayer::new();
        player.load(&track).expect("load");
        player.play();
        let duration = player.duration().expect("duration should be detected");
        assert!(duration >= Duration::from_millis(70));

        thread::sleep(Duration::from_millis(120));
        assert!(player.is_finished(), "known-duration playback should finish");
        assert!(!player.is_playing());
    }

    #[test]
    fn null_player_zero_length_duration_does_not_auto_finish() {
        let dir = tempdir().expect("tempdir");
        let track = dir.path().join("zero.wav");
        write_test_wav(&track, 0);

        let mut player = NullPlayer::new();
        player.load(&track).expect("load");
        player.play();

        thread::sleep(Duration::from_millis(20));
        assert!(player.position().expect("position") > Duration::ZERO);
        assert!(!player.is_finished());
    }

    #[test]
    fn seek_without_track_fails() {
        let mut player = NullPlayer::new();
        assert!(player.seek(Duration::from_secs(1)).is_err());
    }
}
