use crate::audio::{AudioPlayer, NullPlayer, RodioPlayer};
use crate::config::Settings;
use crate::controller::PlaybackController;
use crate::core::MuzicCore;
use crate::media::MediaServices;
use crate::model::TrackId;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::warn;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout, Write, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// What the keyboard is currently driving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Rename { id: TrackId, buffer: String },
    ConfirmDelete { id: TrackId, title: String },
    Command(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub fn build_core(settings: Settings) -> MuzicCore {
    let player: Box<dyn AudioPlayer> = match RodioPlayer::new() {
        Ok(player) => Box::new(player),
        Err(err) => {
            warn!("falling back to null audio player: {err:#}");
            Box::new(NullPlayer::new())
        }
    };
    let controller = PlaybackController::new(player, settings.finish_poll_interval());
    let media = MediaServices::for_folders(&settings.folders);
    MuzicCore::new(settings, media, controller)
}

pub fn run(settings: Settings) -> Result<()> {
    let mut core = build_core(settings);
    core.ensure_library_access();

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, &mut core);

    restore_terminal(terminal.backend_mut())?;
    result
}

/// Leaves raw mode and the alternate screen. Safe to call when neither is
/// active, so the panic hook can use it unconditionally.
pub fn restore_terminal(out: &mut impl Write) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(out, LeaveAlternateScreen, cursor::Show)
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    core: &mut MuzicCore,
) -> Result<()> {
    let mut mode = InputMode::Normal;
    let mut last_draw = Instant::now();

    loop {
        core.tick();

        if core.dirty || last_draw.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| crate::ui::draw(frame, core, &mode))?;
            core.dirty = false;
            last_draw = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if handle_key(core, &mut mode, key) == Flow::Quit {
            return Ok(());
        }
    }
}

fn handle_key(core: &mut MuzicCore, mode: &mut InputMode, key: KeyEvent) -> Flow {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Flow::Quit;
    }

    core.dirty = true;
    if *mode == InputMode::Normal {
        return handle_normal_key(core, mode, key.code);
    }

    let current = std::mem::replace(mode, InputMode::Normal);
    *mode = match current {
        InputMode::Normal => InputMode::Normal,
        InputMode::Search => match key.code {
            KeyCode::Esc => {
                core.end_search();
                InputMode::Normal
            }
            KeyCode::Enter => {
                core.play_selected();
                InputMode::Search
            }
            KeyCode::Down => {
                core.select_next();
                InputMode::Search
            }
            KeyCode::Up => {
                core.select_prev();
                InputMode::Search
            }
            KeyCode::Backspace => {
                let mut query = core.search_query.clone().unwrap_or_default();
                query.pop();
                core.update_search(&query);
                InputMode::Search
            }
            KeyCode::Char(ch) => {
                let mut query = core.search_query.clone().unwrap_or_default();
                query.push(ch);
                core.update_search(&query);
                InputMode::Search
            }
            _ => InputMode::Search,
        },
        InputMode::Rename { id, mut buffer } => match key.code {
            KeyCode::Esc => {
                core.set_status("Rename cancelled");
                InputMode::Normal
            }
            KeyCode::Enter => {
                if buffer.trim().is_empty() {
                    InputMode::Rename { id, buffer }
                } else {
                    core.rename(&id, &buffer);
                    InputMode::Normal
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
                InputMode::Rename { id, buffer }
            }
            KeyCode::Char(ch) => {
                buffer.push(ch);
                InputMode::Rename { id, buffer }
            }
            _ => InputMode::Rename { id, buffer },
        },
        InputMode::ConfirmDelete { id, title } => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                core.delete(&id);
                InputMode::Normal
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                core.set_status("Delete cancelled");
                InputMode::Normal
            }
            _ => InputMode::ConfirmDelete { id, title },
        },
        InputMode::Command(mut buffer) => match key.code {
            KeyCode::Esc => InputMode::Normal,
            KeyCode::Enter => {
                run_command(core, &buffer);
                InputMode::Normal
            }
            KeyCode::Backspace => {
                buffer.pop();
                InputMode::Command(buffer)
            }
            KeyCode::Char(ch) => {
                buffer.push(ch);
                InputMode::Command(buffer)
            }
            _ => InputMode::Command(buffer),
        },
    };
    Flow::Continue
}

fn handle_normal_key(core: &mut MuzicCore, mode: &mut InputMode, code: KeyCode) -> Flow {
    match code {
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Down => core.select_next(),
        KeyCode::Up => core.select_prev(),
        KeyCode::Enter => core.play_selected(),
        KeyCode::Char(' ') => core.toggle_play_pause(),
        KeyCode::Char('n') => core.play_next(),
        KeyCode::Char('p') => core.play_previous(),
        KeyCode::Char('s') => core.toggle_shuffle(),
        KeyCode::Char('r') => core.toggle_repeat(),
        KeyCode::Right => core.seek_by_step(true),
        KeyCode::Left => core.seek_by_step(false),
        KeyCode::Char('/') => {
            core.begin_search();
            *mode = InputMode::Search;
        }
        KeyCode::Char('e') | KeyCode::F(2) => {
            if let Some(track) = core.selected_track() {
                *mode = InputMode::Rename {
                    id: track.id.clone(),
                    buffer: track.title.clone(),
                };
            }
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(track) = core.selected_track() {
                *mode = InputMode::ConfirmDelete {
                    id: track.id.clone(),
                    title: track.title.clone(),
                };
            }
        }
        KeyCode::Char(':') => *mode = InputMode::Command(String::new()),
        _ => {}
    }
    Flow::Continue
}

fn run_command(core: &mut MuzicCore, raw: &str) {
    let input = raw.trim();
    if input.is_empty() {
        core.set_status("No command");
        return;
    }

    let mut command_split = input.splitn(2, char::is_whitespace);
    let command = command_split.next().unwrap_or_default();
    let rest = command_split.next().unwrap_or("").trim();

    match command {
        "help" => core.set_status(
            "Commands: add <folder> | reload | seek <m:ss> | Keys: enter play, space pause, n/p skip, s shuffle, r repeat, / search, e rename, d delete",
        ),
        "add" => {
            if rest.is_empty() {
                core.set_status("Usage: add <folder>");
            } else {
                core.add_folder(&PathBuf::from(rest));
            }
        }
        "reload" => core.reload_catalog(),
        "seek" => match parse_timestamp(rest) {
            Some(millis) => core.seek_to(millis),
            None => core.set_status("Usage: seek <m:ss>"),
        },
        _ => core.set_status("Unknown command. Use :help"),
    }
}

/// `m:ss` or plain seconds, to milliseconds.
fn parse_timestamp(raw: &str) -> Option<u64> {
    let seconds = match raw.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u64 = minutes.trim().parse().ok()?;
            let seconds: u64 = seconds.trim().parse().ok()?;
            if seconds >= 60 {
                return None;
            }
            minutes * 60 + seconds
        }
        None => raw.trim().parse().ok()?,
    };
    Some(seconds * 1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{FileMover, MediaCatalogSource, PermissionService};
    use crate::model::{AudioAsset, PermissionStatus};
    use std::io;
    use std::path::Path;

    struct Granted;

    impl PermissionService for Granted {
        fn request_audio_library_access(&mut self) -> PermissionStatus {
            PermissionStatus::Granted
        }
    }

    struct Fixed(Vec<AudioAsset>);

    impl MediaCatalogSource for Fixed {
        fn list_audio_assets(&mut self, _limit: usize) -> anyhow::Result<Vec<AudioAsset>> {
            Ok(self.0.clone())
        }

        fn resolve_local_uri(&self, _id: &TrackId) -> Option<PathBuf> {
            None
        }

        fn delete_assets(&mut self, _ids: &[TrackId]) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    struct Mover;

    impl FileMover for Mover {
        fn move_file(&mut self, _from: &Path, _to: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    fn test_core() -> MuzicCore {
        let assets = ["One", "Two"]
            .iter()
            .map(|title| AudioAsset {
                id: TrackId::from(*title),
                filename: format!("{title}.mp3"),
                uri: PathBuf::from(format!("/music/{title}.mp3")),
                duration_seconds: 1.0,
                artist: None,
            })
            .collect();
        let media = MediaServices::new(Box::new(Granted), Box::new(Fixed(assets)), Box::new(Mover));
        let controller =
            PlaybackController::new(Box::new(NullPlayer::new()), Duration::from_millis(10));
        let mut core = MuzicCore::new(Settings::default(), media, controller);
        core.ensure_library_access();
        core
    }

    fn press(core: &mut MuzicCore, mode: &mut InputMode, code: KeyCode) -> Flow {
        handle_key(core, mode, KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn restoring_the_terminal_leaves_the_alternate_screen() {
        let mut out = Vec::new();
        restore_terminal(&mut out).expect("restore");
        restore_terminal(&mut out).expect("restore twice");

        let written = String::from_utf8(out).expect("utf8");
        assert!(written.contains("\x1b[?1049l"));
        assert!(written.contains("\x1b[?25h"));
    }

    #[test]
    fn unknown_command_is_reported() {
        let mut core = test_core();
        run_command(&mut core, "wat");
        assert!(core.status.contains("Unknown command"));
    }

    #[test]
    fn add_command_rejects_missing_folder() {
        let mut core = test_core();
        run_command(&mut core, "add /definitely/not here");
        assert!(core.status.starts_with("Not a folder"));
        assert!(core.settings.folders.is_empty());
    }

    #[test]
    fn timestamps_parse_to_millis() {
        assert_eq!(parse_timestamp("1:05"), Some(65_000));
        assert_eq!(parse_timestamp("42"), Some(42_000));
        assert_eq!(parse_timestamp("1:75"), None);
        assert_eq!(parse_timestamp("abc"), None);
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut core = test_core();
        let mut mode = InputMode::Normal;

        press(&mut core, &mut mode, KeyCode::Char('d'));
        assert!(matches!(mode, InputMode::ConfirmDelete { .. }));
        press(&mut core, &mut mode, KeyCode::Char('n'));
        assert_eq!(mode, InputMode::Normal);
        assert_eq!(core.catalog.len(), 2);

        press(&mut core, &mut mode, KeyCode::Char('d'));
        press(&mut core, &mut mode, KeyCode::Char('y'));
        assert_eq!(core.catalog.len(), 1);
        assert_eq!(core.status, "Song deleted successfully");
    }

    #[test]
    fn rename_prompt_starts_from_current_title() {
        let mut core = test_core();
        let mut mode = InputMode::Normal;

        press(&mut core, &mut mode, KeyCode::Char('e'));
        assert_eq!(
            mode,
            InputMode::Rename {
                id: TrackId::from("One"),
                buffer: String::from("One"),
            }
        );
        press(&mut core, &mut mode, KeyCode::Char('!'));
        press(&mut core, &mut mode, KeyCode::Enter);

        assert_eq!(mode, InputMode::Normal);
        assert_eq!(core.catalog.tracks()[0].title, "One!");
        assert_eq!(core.catalog.tracks()[0].uri, PathBuf::from("/music/One!.mp3"));
    }

    #[test]
    fn blank_rename_keeps_prompt_open() {
        let mut core = test_core();
        let mut mode = InputMode::Rename {
            id: TrackId::from("One"),
            buffer: String::from("   "),
        };
        press(&mut core, &mut mode, KeyCode::Enter);
        assert!(matches!(mode, InputMode::Rename { .. }));
    }

    #[test]
    fn search_mode_types_into_query() {
        let mut core = test_core();
        let mut mode = InputMode::Normal;

        press(&mut core, &mut mode, KeyCode::Char('/'));
        press(&mut core, &mut mode, KeyCode::Char('t'));
        press(&mut core, &mut mode, KeyCode::Char('w'));
        assert_eq!(core.search_query.as_deref(), Some("tw"));
        assert_eq!(core.visible_tracks().len(), 1);

        press(&mut core, &mut mode, KeyCode::Esc);
        assert_eq!(mode, InputMode::Normal);
        assert_eq!(core.search_query, None);
    }

    #[test]
    fn quit_keys_end_the_loop() {
        let mut core = test_core();
        let mut mode = InputMode::Normal;
        assert_eq!(press(&mut core, &mut mode, KeyCode::Char('q')), Flow::Quit);

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let mut search = InputMode::Search;
        assert_eq!(handle_key(&mut core, &mut search, ctrl_c), Flow::Quit);
    }
}
