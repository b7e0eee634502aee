use clap::{error::ErrorKind, ArgAction, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{error, info};

use linetrim::{
    app::{App, Control, Workspace},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    cursor::Direction,
    logging::{init_logging, Verbosity},
    outline::{self, Outline},
    project,
    rangefinder::{self, FeedFormat},
    runtime::{AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    session::Session,
    ui,
};

const TICK_RATE_MS: u64 = 100;
const FEED_AUTO: &str = "auto";

/// measure paraglider lines against their theoretical lengths
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Record measured line lengths of a paraglider, by hand or from a laser rangefinder, and see every line's deviation from the manufacturer's table after removing the common offset."
)]
pub struct Cli {
    /// line length table to load at startup
    #[clap(short = 'p', long)]
    profile: Option<PathBuf>,

    /// project file to open at startup
    #[clap(short = 'o', long, conflicts_with_all = ["profile", "demo"])]
    project: Option<PathBuf>,

    /// rangefinder source: serial device, FIFO or file, or "auto" for the first /dev/rfcomm*
    #[clap(short = 'f', long)]
    feed: Option<PathBuf>,

    /// how the feed encodes readings: text lines or 4-byte notification frames
    #[clap(long, value_enum, default_value_t = FeedFormat::Text)]
    feed_format: FeedFormat,

    /// measuring order (overrides the saved setting)
    #[clap(short = 'd', long, value_enum)]
    direction: Option<Direction>,

    /// silence audible cues
    #[clap(long)]
    no_sound: bool,

    /// planform outline file (overrides the saved setting)
    #[clap(long)]
    outline: Option<PathBuf>,

    /// start with the bundled demo table
    #[clap(long, conflicts_with = "profile")]
    demo: bool,

    /// more detail in the log file (-v, -vv)
    #[clap(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Saved settings with command line overrides applied.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(direction) = self.direction {
            config.direction = direction;
        }
        if self.no_sound {
            config.sound = false;
        }
        if let Some(outline) = &self.outline {
            config.outline_path = Some(outline.clone());
        }
        config
    }

    fn feed_path(&self) -> Option<PathBuf> {
        match &self.feed {
            Some(p) if p == Path::new(FEED_AUTO) => {
                rangefinder::candidate_ports().into_iter().next()
            }
            other => other.clone(),
        }
    }

    fn build_session(&self, config: &Config) -> linetrim::Result<Session> {
        if let Some(path) = &self.project {
            return project::load(path, config.entry_policy(), config.direction);
        }
        let mut session = Session::new(config.entry_policy(), config.direction);
        if self.demo {
            session.install_profile(outline::bundled_table("demo")?);
            session.set_identification("Demo glider");
        }
        if let Some(path) = &self.profile {
            session.load_profile(path, AppDirs::autosave_dir().as_deref())?;
        }
        Ok(session)
    }
}

/// Start file logging. A log file that cannot be written is reported and
/// the tool runs without one; returns whether logging is on.
fn setup_logging(verbose: u8, log_path: &Path) -> bool {
    match init_logging(Verbosity::from_occurrences(verbose), log_path) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("warning: logging disabled: {e}");
            false
        }
    }
}

fn fail(message: String) -> ! {
    error!("{message}");
    let mut cmd = Cli::command();
    cmd.error(ErrorKind::Io, message).exit()
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let log_path = AppDirs::log_path().unwrap_or_else(|| PathBuf::from("linetrim.log"));
    setup_logging(cli.verbose, &log_path);

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());

    let outline = Outline::resolve(config.outline_path.as_deref())
        .unwrap_or_else(|e| fail(format!("cannot load planform outline: {e}")));
    let session = cli
        .build_session(&config)
        .unwrap_or_else(|e| fail(e.to_string()));

    let events = CrosstermEventSource::new();
    if let Some(feed) = cli.feed_path() {
        events
            .attach_feed(&feed, cli.feed_format)
            .unwrap_or_else(|e| fail(format!("cannot open rangefinder feed: {e}")));
    } else if cli.feed.is_some() {
        fail("no rangefinder found at /dev/rfcomm0..9".to_string());
    }
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    info!(version = env!("CARGO_PKG_VERSION"), "starting");
    let mut app = App::new(
        session,
        config,
        Box::new(store),
        outline,
        Workspace::from_app_dirs(),
    );

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        let event = runner.step();
        let redraw = !matches!(event, AppEvent::Tick);

        if app.handle_event(event) == Control::Quit {
            break;
        }
        if app.take_bell() {
            let mut out = io::stdout();
            out.write_all(b"\x07")?;
            out.flush()?;
        }
        if redraw {
            terminal.draw(|f| ui::draw(app, f))?;
        }
    }

    info!("quit");
    Ok(())
}
