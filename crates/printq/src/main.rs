mod config;
mod files;
mod job_store;
mod spooler;
mod state;
mod tasks;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use printq_core::{OperationTracker, Spooler, SubmitRequest};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::files::FileBrowser;
use crate::job_store::FileJobStore;
use crate::spooler::CupsSpooler;
use crate::state::{App, Effect};
use crate::tasks::AppEvent;

#[derive(Parser, Debug)]
#[command(name = "printq", version, about = "Terminal dashboard for the local print queue")]
struct Cli {
    /// Config file (defaults to $PRINTQ_CONFIG_PATH or ~/.config/printq/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start in the file browser with PATTERN typed into the filter.
    Add {
        #[arg(required = true)]
        patterns: Vec<String>,
    },
}

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let (config, warning) = config::load_config(&config_path);
    init_logging(&config);
    if let Some(warning) = warning {
        warn!("{warning}");
    }
    info!(config = %config_path.display(), jobs = %config.jobs_path().display(), "starting printq");

    let cwd = std::env::current_dir().context("resolve working directory")?;
    let (start_dir, pattern) = match &cli.command {
        Some(Command::Add { patterns }) => {
            let (dir, pattern) = initial_pattern(patterns, &cwd);
            (dir, Some(pattern))
        }
        None => (cwd, None),
    };

    let store = FileJobStore::open(config.jobs_path(), config.retention());
    info!(path = %store.path().display(), records = store.len(), "job store loaded");
    let (submit_tx, submit_rx) = mpsc::unbounded_channel::<SubmitRequest>();
    let tracker = OperationTracker::new(
        Box::new(move |request: SubmitRequest| {
            // The receiver lives as long as the loop.
            let _ = submit_tx.send(request);
        }),
        Box::new(store),
    );
    let browser = FileBrowser::new(start_dir, config.normalized_extensions());
    let mut app = App::new(config, tracker, browser);
    if let Some(pattern) = pattern {
        app.prefill_pattern(&pattern);
    }

    let spooler: Arc<dyn Spooler> = Arc::new(CupsSpooler::new());
    let mut terminal = setup_terminal().context("initialize terminal")?;
    let result = run_app(&mut terminal, &mut app, spooler, submit_rx).await;
    restore_terminal(&mut terminal).context("restore terminal")?;

    if let Err(err) = result {
        eprintln!("printq: {err:#}");
    }
    Ok(())
}

/// The first pattern may carry a directory; later ones are file-name globs
/// applied in that same directory.
fn initial_pattern(patterns: &[String], cwd: &Path) -> (PathBuf, String) {
    let Some((first, rest)) = patterns.split_first() else {
        return (cwd.to_path_buf(), String::new());
    };
    let (dir, glob) = files::split_pattern(first, cwd, &config::home_dir());
    let mut globs = vec![glob];
    globs.extend(rest.iter().cloned());
    (dir, globs.join(" "))
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file = config.resolved_log_file().and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        OpenOptions::new().create(true).append(true).open(path).ok()
    });
    match file {
        Some(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Watches one directory at a time, non-recursively.
struct DirWatcher {
    watcher: RecommendedWatcher,
    current: Option<PathBuf>,
}

impl DirWatcher {
    fn watch(&mut self, dir: &Path) {
        if let Some(previous) = self.current.take() {
            let _ = self.watcher.unwatch(&previous);
        }
        match self.watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => self.current = Some(dir.to_path_buf()),
            Err(err) => warn!(dir = %dir.display(), "watch failed: {err}"),
        }
    }
}

fn setup_watcher(tx: mpsc::Sender<()>) -> Option<DirWatcher> {
    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if res.is_ok() {
                let _ = tx.try_send(());
            }
        },
        notify::Config::default(),
    );
    match watcher {
        Ok(watcher) => Some(DirWatcher {
            watcher,
            current: None,
        }),
        Err(err) => {
            warn!("directory watcher unavailable: {err}");
            None
        }
    }
}

async fn run_app(
    terminal: &mut Tui,
    app: &mut App,
    spooler: Arc<dyn Spooler>,
    mut submit_rx: UnboundedReceiver<SubmitRequest>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let (watch_tx, mut watch_rx) = mpsc::channel::<()>(1);
    let mut watcher = setup_watcher(watch_tx);
    if let Some(watcher) = watcher.as_mut() {
        watcher.watch(app.browser.dir());
    }

    let size = terminal.size()?;
    app.resize(size.width, size.height);

    let mut poll_ticker = tokio::time::interval(app.config.poll_interval());
    poll_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut events = EventStream::new();

    while !app.should_quit() {
        terminal.draw(|f| ui::render(f, app))?;

        let effects = tokio::select! {
            _ = poll_ticker.tick() => {
                start_poll(app, &spooler, &tx);
                Vec::new()
            }
            Some(event) = rx.recv() => app.apply_event(event),
            Some(request) = submit_rx.recv() => {
                let stagger = tasks::stagger_delay(app.config.stagger_range());
                tokio::spawn(tasks::submit_task(
                    Arc::clone(&spooler),
                    request,
                    stagger,
                    app.config.submit_timeout(),
                    tx.clone(),
                ));
                Vec::new()
            }
            Some(()) = watch_rx.recv() => {
                let dir = app.browser.dir().to_path_buf();
                app.apply_event(AppEvent::DirectoryChanged(dir))
            }
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Some(Ok(Event::Resize(width, height))) => {
                    app.resize(width, height);
                    Vec::new()
                }
                Some(Ok(_)) => Vec::new(),
                Some(Err(err)) => {
                    warn!("terminal event error: {err}");
                    Vec::new()
                }
                None => break,
            },
        };

        for effect in effects {
            run_effect(effect, app, &spooler, &tx, &mut watcher);
        }
    }
    Ok(())
}

fn start_poll(app: &mut App, spooler: &Arc<dyn Spooler>, tx: &UnboundedSender<AppEvent>) {
    if !app.begin_poll() {
        debug!("poll still in flight, skipping");
        return;
    }
    tokio::spawn(tasks::poll_task(
        Arc::clone(spooler),
        app.config.poll_timeout(),
        tx.clone(),
    ));
}

fn run_effect(
    effect: Effect,
    app: &mut App,
    spooler: &Arc<dyn Spooler>,
    tx: &UnboundedSender<AppEvent>,
    watcher: &mut Option<DirWatcher>,
) {
    match effect {
        Effect::Cancel(system_job_id) => {
            tokio::spawn(tasks::cancel_task(
                Arc::clone(spooler),
                system_job_id,
                app.config.submit_timeout(),
                tx.clone(),
            ));
        }
        Effect::Open(path) => open_in_desktop(app, &path),
        Effect::OpenFolder(path) => {
            let folder = path.parent().map(Path::to_path_buf).unwrap_or(path);
            open_in_desktop(app, &folder);
        }
        Effect::PollNow => start_poll(app, spooler, tx),
        Effect::WatchDir(dir) => {
            if let Some(watcher) = watcher.as_mut() {
                watcher.watch(&dir);
            }
        }
    }
}

fn open_in_desktop(app: &mut App, path: &Path) {
    if !path.exists() {
        app.status_message = Some(format!("Not found: {}", path.display()));
        return;
    }
    if let Err(err) = spooler::open_path(path) {
        warn!(path = %path.display(), "open failed: {err}");
        app.status_message = Some(format!("Cannot open {}: {err}", path.display()));
    }
}
