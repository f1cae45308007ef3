use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use rpassword::prompt_password;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zeroize::{Zeroize, Zeroizing};

use crate::config::{load_settings, Settings};
use crate::crypto::generate_password;
use crate::feedback::SystemClipboard;
use crate::models::Database;
use crate::page::{update, Command, Model, Msg};
use crate::storage::{FileStore, VaultStore};
use crate::ui::draw;

const LOG_ENV: &str = "PASSDECK_LOG";
const FALLBACK_SIZE: (u16, u16) = (100, 24);
const IDLE_POLL: Duration = Duration::from_millis(200);

type Tui = Terminal<CrosstermBackend<std::io::Stdout>>;

enum Mode {
    Browse(PathBuf),
    Init(PathBuf),
    Generate,
    Usage,
    Version,
}

pub fn run() -> Result<()> {
    let bin_name = executable_name();
    let mode = parse_args(std::env::args().skip(1))?;
    let settings = load_settings()?;

    match mode {
        Mode::Version => {
            println!("{bin_name} v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Mode::Usage => {
            print_usage(&bin_name);
            Ok(())
        }
        Mode::Generate => {
            let mut generated = generate_password(settings.generated_password_len);
            println!("{generated}");
            generated.zeroize();
            Ok(())
        }
        Mode::Init(path) => {
            init_logging(&settings);
            initialize_new_vault(&path)
        }
        Mode::Browse(path) => {
            init_logging(&settings);
            run_tui(path, settings)
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Mode> {
    let mut args = args.into_iter();
    let mut mode = Mode::Usage;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return Ok(Mode::Version),
            "--help" | "-h" => return Ok(Mode::Usage),
            "--generate" | "-g" => mode = Mode::Generate,
            "--init" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--init requires a path"))?;
                mode = Mode::Init(PathBuf::from(path));
            }
            flag if flag.starts_with('-') => return Err(anyhow!("Unknown option: {flag}")),
            path => {
                if matches!(mode, Mode::Usage) {
                    mode = Mode::Browse(PathBuf::from(path));
                }
            }
        }
    }
    Ok(mode)
}

fn init_logging(settings: &Settings) {
    let Some(path) = settings.resolved_log_file() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(filter)
        .try_init();
}

fn run_tui(path: PathBuf, settings: Settings) -> Result<()> {
    let viewport = match crossterm::terminal::size() {
        Ok(size) => size,
        Err(e) => {
            tracing::warn!("terminal size unavailable, using {FALLBACK_SIZE:?}: {e}");
            FALLBACK_SIZE
        }
    };
    let store = FileStore::new(path);
    tracing::info!(path = %store.path().display(), "starting");
    let tick_interval = settings.tick_interval();
    let mut model = Model::new(
        Box::new(store),
        Arc::new(SystemClipboard::default()),
        settings,
        viewport,
    );

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, crossterm::cursor::Hide)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut model, tick_interval);

    teardown_terminal(&mut terminal);
    model.flush_pending_clear();
    model.wipe();
    tracing::info!("exiting");
    result
}

fn event_loop(terminal: &mut Tui, model: &mut Model, tick_interval: Duration) -> Result<()> {
    let mut next_tick: Option<Instant> = None;
    loop {
        terminal.draw(|f| draw(f, model))?;

        let timeout = next_tick
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_POLL);
        let mut pending = Vec::with_capacity(2);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => pending.push(Msg::Key(key)),
                Event::Resize(width, height) => pending.push(Msg::Resize(width, height)),
                _ => {}
            }
        }
        if next_tick.is_some_and(|at| Instant::now() >= at) {
            next_tick = None;
            pending.push(Msg::Tick);
        }

        for msg in pending {
            match update(model, msg) {
                Command::None => {}
                Command::ScheduleTick => next_tick = Some(Instant::now() + tick_interval),
                Command::Quit => return Ok(()),
            }
        }
    }
}

fn teardown_terminal(terminal: &mut Tui) {
    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        crossterm::cursor::Show
    )
    .ok();
    terminal.show_cursor().ok();
}

fn initialize_new_vault(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(anyhow!("{} already exists; refusing to overwrite", path.display()));
    }
    let passphrase = prompt_new_passphrase()?;
    FileStore::new(path)
        .save(&passphrase, &Database::with_root_group())
        .with_context(|| format!("Failed to create {}", path.display()))?;
    tracing::info!(path = %path.display(), "created empty vault");
    println!("Created {}", path.display());
    Ok(())
}

fn prompt_new_passphrase() -> Result<Zeroizing<String>> {
    loop {
        let first = Zeroizing::new(prompt_password("Set a master password: ")?);
        let second = Zeroizing::new(prompt_password("Confirm master password: ")?);
        if first.is_empty() {
            println!("Password cannot be empty, try again.");
        } else if first != second {
            println!("Passwords did not match, try again.");
        } else {
            return Ok(first);
        }
    }
}

fn print_usage(bin_name: &str) {
    eprintln!("Usage: {bin_name} [OPTIONS] <DATABASE>");
    eprintln!("  -g, --generate          Generate and print a strong password");
    eprintln!("      --init <PATH>       Create a new empty vault at PATH");
    eprintln!("  -V, --version           Show version and exit");
    eprintln!("  -h, --help              Show this help");
}

fn executable_name() -> String {
    let fallback = "passdeck".to_string();
    let arg0 = match std::env::args().next() {
        Some(v) => v,
        None => return fallback,
    };
    let path = Path::new(&arg0);
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => fallback,
    }
}
