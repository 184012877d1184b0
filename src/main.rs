pub mod app_dirs;
pub mod condition;
pub mod config;
pub mod experiment;
pub mod fields;
pub mod stats;
pub mod summary;
pub mod time_series;
pub mod ui;
pub mod upload;
pub mod util;

use crate::{
    config::{Config, ConfigStore, FileConfigStore},
    experiment::Experiment,
    fields::Catalog,
    ui::field_stats::render_field_stats,
    upload::{HttpSink, NullSink, ResultSink, RunUpload},
};
use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    sync::{mpsc, Arc},
    thread,
    time::Duration,
};
use time_humanize::{Accuracy, HumanTime, Tense};

const TICK_RATE_MS: u64 = 250;

/// terminal harness for signup form usability experiments
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Runs a participant through 8 randomized signup-form variants (field motion x inline validation x example hints), measures per-field completion latency, and shows a session summary."
)]
pub struct Cli {
    /// participant identifier recorded with session logs and uploads
    #[clap(short = 'p', long)]
    participant: Option<String>,

    /// persistence endpoint receiving completed-run payloads
    #[clap(short = 'e', long)]
    endpoint: Option<String>,

    /// seed for a reproducible condition order
    #[clap(short = 's', long)]
    seed: Option<u64>,

    /// do not forward completed runs to the persistence endpoint
    #[clap(long)]
    no_upload: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Welcome,
    Form,
    RunResult,
    Summary,
    FieldStats,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortBy {
    Field,
    AvgDwell,
    MotionGap,
    Samples,
}

#[derive(Debug)]
pub struct FieldStatsState {
    pub scroll_offset: usize,
    pub sort_by: SortBy,
    pub sort_ascending: bool,
}

impl Default for FieldStatsState {
    fn default() -> Self {
        Self {
            scroll_offset: 0,
            sort_by: SortBy::Field,
            sort_ascending: true,
        }
    }
}

pub struct App {
    pub experiment: Experiment,
    pub catalog: Catalog,
    pub state: AppState,
    pub field_stats_state: FieldStatsState,
    pub status: Option<String>,
    pub last_session: Option<String>,
    pub seed: Option<u64>,
    pub upload: bool,
    pub sink: Arc<dyn ResultSink>,
}

impl App {
    pub fn new(cli: Cli, config: Config) -> Self {
        let participant = cli.participant.clone().or(config.participant);
        let endpoint = cli.endpoint.clone().or(config.endpoint);
        let seed = cli.seed.or(config.seed);
        let upload = config.upload && !cli.no_upload && endpoint.is_some();

        let sink: Arc<dyn ResultSink> = match (&endpoint, upload) {
            (Some(url), true) => Arc::new(HttpSink::new(url.clone())),
            _ => Arc::new(NullSink),
        };

        let experiment = Experiment::new(participant);
        let last_session = experiment
            .stats_db
            .as_ref()
            .and_then(|db| db.last_recorded().ok().flatten())
            .map(|dt| {
                let secs = (Local::now() - dt).num_seconds().max(0) as u64;
                HumanTime::from(Duration::from_secs(secs)).to_text_en(Accuracy::Rough, Tense::Past)
            });

        Self {
            experiment,
            catalog: Catalog::new(),
            state: AppState::Welcome,
            field_stats_state: FieldStatsState::default(),
            status: None,
            last_session,
            seed,
            upload,
            sink,
        }
    }

    pub fn start_session(&mut self) {
        match self.seed {
            Some(seed) => self.experiment.start_session_seeded(seed),
            None => self.experiment.start_session(),
        }
        self.status = None;
        self.state = AppState::Form;
    }

    /// Back to the welcome screen with everything cleared.
    pub fn reset(&mut self) {
        self.experiment.reset_session();
        self.state = AppState::Welcome;
        self.field_stats_state = FieldStatsState::default();
        self.status = None;
    }

    pub fn focus_next(&mut self) {
        let visible = self.experiment.visible();
        let pos = self
            .experiment
            .run
            .focused
            .and_then(|f| visible.iter().position(|v| *v == f));
        if let Some(pos) = pos {
            if pos + 1 < visible.len() {
                self.experiment.focus_field(visible[pos + 1]);
            }
        } else if let Some(first) = visible.first() {
            self.experiment.focus_field(*first);
        }
    }

    pub fn focus_prev(&mut self) {
        let visible = self.experiment.visible();
        let pos = self
            .experiment
            .run
            .focused
            .and_then(|f| visible.iter().position(|v| *v == f));
        if let Some(pos) = pos {
            if pos > 0 {
                self.experiment.focus_field(visible[pos - 1]);
            }
        }
    }

    /// Left/Right on a select field cycles through its options.
    pub fn cycle_select(&mut self, forward: bool) {
        let field = match self.experiment.run.focused {
            Some(field) if field.is_select() => field,
            _ => return,
        };
        let options = self.catalog.spec(field).options.clone();
        if options.is_empty() {
            return;
        }
        let current = self.experiment.run.form.get(field).to_string();
        let idx = options.iter().position(|o| *o == current);
        let next = match (idx, forward) {
            (None, true) => 0,
            (None, false) => options.len() - 1,
            (Some(i), true) => (i + 1) % options.len(),
            (Some(i), false) => (i + options.len() - 1) % options.len(),
        };
        self.experiment.on_change(field, options[next].clone());
    }

    /// Enter inside the form: advance focus, or complete the run when the
    /// whole form is filled and focus sits on the last visible field.
    pub fn submit_or_next(&mut self) {
        let visible = self.experiment.visible();
        let on_last = self.experiment.run.focused.is_some()
            && self.experiment.run.focused == visible.last().copied();
        if on_last && self.experiment.form_complete() {
            self.finish_run();
        } else {
            self.focus_next();
        }
    }

    fn finish_run(&mut self) {
        self.experiment.complete_run();

        if self.upload {
            if let Some(result) = self.experiment.summary.last() {
                let payload = RunUpload::from_run(&self.experiment.run.form, result);
                upload::submit_fire_and_forget(self.sink.clone(), payload);
            }
        }

        self.state = AppState::RunResult;
    }

    pub fn advance(&mut self) {
        self.experiment.advance();
        self.state = if self.experiment.session_over {
            AppState::Summary
        } else {
            AppState::Form
        };
    }

    pub fn export_summary(&mut self) {
        let path = match summary::default_export_path() {
            Some(path) => path,
            None => {
                self.status = Some("no config directory for export".to_string());
                return;
            }
        };
        match summary::export_summary_csv(&self.experiment.summary, &path) {
            Ok(()) => self.status = Some(format!("exported to {}", path.display())),
            Err(e) => {
                tracing::warn!("summary export failed: {}", e);
                self.status = Some("export failed".to_string());
            }
        }
    }
}

fn init_logging() {
    if let Some(path) = app_dirs::AppDirs::log_path() {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(file) = std::fs::File::create(&path) {
            let _ = tracing_subscriber::fmt()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init();
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let config = FileConfigStore::new().load();
    let mut app = App::new(cli, config);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    start_tui(&mut terminal, &mut app)?;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    Ok(())
}

#[derive(Debug)]
enum ExitType {
    Restart,
    Quit,
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let app_events = get_app_events();

    loop {
        let mut exit_type: ExitType = ExitType::Quit;
        terminal.draw(|f| ui(app, f))?;

        loop {
            let app = &mut app;

            match app_events.recv()? {
                AppEvent::Tick => {
                    // redraw while a run is live so the elapsed timer moves
                    if app.state == AppState::Form {
                        terminal.draw(|f| ui(app, f))?;
                    }
                }
                AppEvent::Resize => {
                    terminal.draw(|f| ui(app, f))?;
                }
                AppEvent::Key(key) => {
                    if key.code == KeyCode::Esc
                        || (key.modifiers.contains(KeyModifiers::CONTROL)
                            && key.code == KeyCode::Char('c'))
                    {
                        break;
                    }

                    match app.state {
                        AppState::Welcome => match key.code {
                            KeyCode::Enter | KeyCode::Char(' ') => {
                                app.start_session();
                            }
                            _ => {}
                        },
                        AppState::Form => match key.code {
                            KeyCode::Tab | KeyCode::Down => app.focus_next(),
                            KeyCode::BackTab | KeyCode::Up => app.focus_prev(),
                            KeyCode::Left => app.cycle_select(false),
                            KeyCode::Right => app.cycle_select(true),
                            KeyCode::Backspace => app.experiment.backspace(),
                            KeyCode::Enter => app.submit_or_next(),
                            KeyCode::Char(c) => app.experiment.type_char(c),
                            _ => {}
                        },
                        AppState::RunResult => match key.code {
                            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('n') => {
                                app.advance()
                            }
                            _ => {}
                        },
                        AppState::Summary => match key.code {
                            KeyCode::Char('s') => {
                                app.state = AppState::FieldStats;
                            }
                            KeyCode::Char('e') => app.export_summary(),
                            KeyCode::Char('r') => {
                                exit_type = ExitType::Restart;
                                break;
                            }
                            _ => {}
                        },
                        AppState::FieldStats => match key.code {
                            KeyCode::Char('b') | KeyCode::Backspace => {
                                app.state = AppState::Summary;
                            }
                            KeyCode::Up => {
                                if app.field_stats_state.scroll_offset > 0 {
                                    app.field_stats_state.scroll_offset -= 1;
                                }
                            }
                            KeyCode::Down => {
                                // max scroll is clamped in the render function
                                app.field_stats_state.scroll_offset += 1;
                            }
                            KeyCode::PageUp => {
                                app.field_stats_state.scroll_offset =
                                    app.field_stats_state.scroll_offset.saturating_sub(10);
                            }
                            KeyCode::PageDown => {
                                app.field_stats_state.scroll_offset += 10;
                            }
                            KeyCode::Home => {
                                app.field_stats_state.scroll_offset = 0;
                            }
                            KeyCode::Char('1') => {
                                app.field_stats_state.sort_by = SortBy::Field;
                                app.field_stats_state.scroll_offset = 0;
                            }
                            KeyCode::Char('2') => {
                                app.field_stats_state.sort_by = SortBy::AvgDwell;
                                app.field_stats_state.scroll_offset = 0;
                            }
                            KeyCode::Char('3') => {
                                app.field_stats_state.sort_by = SortBy::MotionGap;
                                app.field_stats_state.scroll_offset = 0;
                            }
                            KeyCode::Char('4') => {
                                app.field_stats_state.sort_by = SortBy::Samples;
                                app.field_stats_state.scroll_offset = 0;
                            }
                            KeyCode::Char(' ') => {
                                app.field_stats_state.sort_ascending =
                                    !app.field_stats_state.sort_ascending;
                                app.field_stats_state.scroll_offset = 0;
                            }
                            _ => {}
                        },
                    }
                    terminal.draw(|f| ui(app, f))?;
                }
            }
        }

        match exit_type {
            ExitType::Restart => {
                app.reset();
            }
            ExitType::Quit => {
                break;
            }
        }
    }

    Ok(())
}

#[derive(Clone)]
enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

fn get_app_events() -> mpsc::Receiver<AppEvent> {
    let (tx, rx) = mpsc::channel();

    let tick_tx = tx.clone();
    thread::spawn(move || loop {
        if tick_tx.send(AppEvent::Tick).is_err() {
            break;
        }

        thread::sleep(Duration::from_millis(TICK_RATE_MS))
    });

    thread::spawn(move || loop {
        let evt = match event::read() {
            Ok(Event::Key(key)) => Some(AppEvent::Key(key)),
            Ok(Event::Resize(_, _)) => Some(AppEvent::Resize),
            Ok(_) => None,
            Err(_) => break,
        };

        if let Some(evt) = evt {
            if tx.send(evt).is_err() {
                break;
            }
        }
    });

    rx
}

fn ui(app: &mut App, f: &mut Frame) {
    match app.state {
        AppState::FieldStats => render_field_stats(app, f),
        _ => f.render_widget(&*app, f.area()),
    }
}
