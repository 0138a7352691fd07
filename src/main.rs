use muzic::config;
use muzic::core::MuzicCore;
use muzic::model::format_time;
use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    folders: Vec<PathBuf>,
    list: bool,
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    init_logging(&args);

    install_panic_hook();

    let mut settings = config::load_settings()?;
    for folder in &args.folders {
        settings.add_folder(folder);
    }

    if args.list {
        return list_catalog(settings);
    }

    muzic::app::run(settings)
}

/// Puts the terminal back before the default hook prints the panic, so the
/// message is not lost on the alternate screen.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = muzic::app::restore_terminal(&mut std::io::stdout());
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
        previous(panic_info);
    }));
}

/// The TUI owns the terminal, so log output is only enabled there on request.
fn init_logging(args: &CliArgs) {
    if !args.list && !args.verbose && std::env::var_os("MUZIC_LOG").is_none() {
        return;
    }

    let mut clog = colog::default_builder();
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    clog.filter(None, level);
    if let Ok(filters) = std::env::var("MUZIC_LOG") {
        clog.parse_filters(&filters);
    }
    clog.init();
}

fn list_catalog(settings: config::Settings) -> anyhow::Result<()> {
    let mut core = MuzicCore::new(
        settings.clone(),
        muzic::media::MediaServices::for_folders(&settings.folders),
        muzic::controller::PlaybackController::new(
            Box::new(muzic::audio::NullPlayer::new()),
            settings.finish_poll_interval(),
        ),
    );
    core.ensure_library_access();
    if !core.has_library_access() {
        anyhow::bail!("{}", core.status);
    }

    for track in core.catalog.tracks() {
        let millis = (track.duration_seconds.max(0.0) * 1000.0) as u64;
        println!(
            "{:>6}  {}  {}  {}",
            format_time(millis),
            track.title,
            track.artist,
            track.uri.display()
        );
    }
    println!("{}", core.status);
    Ok(())
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--folder" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--folder requires a path");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--folder cannot be empty");
                }
                out.folders.push(PathBuf::from(value.trim()));
            }
            "--list" => out.list = true,
            "--verbose" => out.verbose = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("Muzic");
    println!("  --folder <path>   Add a music folder for this run (repeatable)");
    println!("  --list            Print the catalog and exit");
    println!("  --verbose         Debug logging");
}
