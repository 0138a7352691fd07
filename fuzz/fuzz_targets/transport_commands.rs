#![no_main]

use libfuzzer_sys::fuzz_target;
use muzic::audio::AudioPlayer;
use muzic::catalog::Catalog;
use muzic::controller::PlaybackController;
use muzic::model::{Track, TrackId};
use muzic::navigator::Navigator;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Default)]
struct Silent {
    current: Option<PathBuf>,
    playing: bool,
}

impl AudioPlayer for Silent {
    fn load(&mut self, uri: &Path) -> anyhow::Result<()> {
        self.current = Some(uri.to_path_buf());
        self.playing = false;
        Ok(())
    }
    fn play(&mut self) {
        self.playing = true;
    }
    fn pause(&mut self) {
        self.playing = false;
    }
    fn stop(&mut self) {
        self.current = None;
        self.playing = false;
    }
    fn seek(&mut self, _position: Duration) -> anyhow::Result<()> {
        Ok(())
    }
    fn is_playing(&self) -> bool {
        self.playing
    }
    fn position(&self) -> Option<Duration> {
        self.current.as_ref().map(|_| Duration::ZERO)
    }
    fn duration(&self) -> Option<Duration> {
        None
    }
    fn is_finished(&self) -> bool {
        false
    }
    fn output_name(&self) -> Option<String> {
        None
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&first, commands)) = data.split_first() else {
        return;
    };
    let len = usize::from(first % 16);
    let catalog = Catalog::new(
        (0..len)
            .map(|idx| Track {
                id: TrackId::new(format!("t{idx}")),
                title: format!("track {idx}"),
                uri: PathBuf::from(format!("track_{idx}.mp3")),
                duration_seconds: 1.0,
                artist: String::new(),
            })
            .collect(),
    );
    let mut controller = PlaybackController::with_navigator(
        Box::new(Silent::default()),
        Duration::from_millis(1),
        Navigator::with_seed(u64::from(first)),
    );

    for byte in commands {
        match byte % 6 {
            0 => {
                let _ = controller.play_next(&catalog);
            }
            1 => {
                let _ = controller.play_previous(&catalog);
            }
            2 => {
                controller.toggle_repeat();
            }
            3 => {
                controller.toggle_shuffle(&catalog);
            }
            4 => {
                let _ = controller.on_track_finished(&catalog);
            }
            _ => controller.toggle_play_pause(),
        }

        if let Some(id) = controller.active_track_id() {
            assert!(catalog.contains(id));
        }
        if let Some(order) = controller.session().navigator().shuffled_ids() {
            assert_eq!(order.len(), catalog.len());
        }
    }
});
