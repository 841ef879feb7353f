mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use drillquiz::{
    app_dirs::AppDirs,
    count_words,
    runtime::{terminal_input, InputEvent, Runner},
    BuiltinBank, Config, ConfigStore, EngineEvent, FileConfigStore, Phase, ProfileRollup,
    ProfileStore, QuizType, Rules, SessionEngine, SqliteProfileStore, SteppedClock, UserProfile,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin},
    path::PathBuf,
    sync::{mpsc::Receiver, Mutex},
    time::Duration,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const TICK_RATE_MS: u64 = 100;

/// timed academic-english drills with lives, streaks and xp
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Timed academic-English drills (vocabulary, listening, grammar, reading, writing) with lives, streak bonuses, pause/resume and a persistent xp profile."
)]
pub struct Cli {
    /// quiz type to preselect
    #[clap(short = 't', long, value_enum)]
    quiz_type: Option<QuizType>,

    /// skip the menu and start the selected quiz right away
    #[clap(long)]
    start: bool,

    /// json question bank to use instead of the built-in one
    #[clap(short = 'b', long)]
    bank_file: Option<PathBuf>,

    /// seconds allowed per question
    #[clap(short = 's', long)]
    question_secs: Option<u32>,

    /// how long answer feedback stays on screen, in milliseconds
    #[clap(long)]
    feedback_ms: Option<u64>,

    /// persist the given options as the new defaults
    #[clap(long)]
    save_config: bool,

    /// print the profile and recent sessions, then exit
    #[clap(long)]
    history: bool,
}

impl Cli {
    /// Layer the command line over the stored config
    fn apply_to(&self, config: &mut Config) {
        if let Some(quiz_type) = self.quiz_type {
            config.quiz_type = quiz_type;
        }
        if let Some(path) = &self.bank_file {
            config.bank_path = Some(path.clone());
        }
        if let Some(secs) = self.question_secs {
            config.rules.question_secs = secs.max(1);
        }
        if let Some(ms) = self.feedback_ms {
            config.rules.feedback_ms = ms;
        }
    }
}

pub struct App {
    pub engine: SessionEngine<BuiltinBank, SteppedClock>,
    events: Receiver<EngineEvent>,
    rollup: Option<ProfileRollup<SqliteProfileStore>>,
    pub profile: UserProfile,
    /// Best recorded score for the most recently finished quiz type.
    pub best_score: Option<u32>,
    pub essay: String,
    pub menu_cursor: usize,
    last_quiz: QuizType,
}

impl App {
    pub fn new(
        bank: BuiltinBank,
        rules: Rules,
        quiz_type: QuizType,
        rollup: Option<ProfileRollup<SqliteProfileStore>>,
    ) -> Self {
        let mut engine = SessionEngine::new(bank, SteppedClock::new(), rules);
        let events = engine.subscribe();
        let profile = rollup
            .as_ref()
            .and_then(|r| r.store().load().ok())
            .unwrap_or_default();
        let menu_cursor = QuizType::ALL
            .iter()
            .position(|qt| *qt == quiz_type)
            .unwrap_or(0);

        Self {
            engine,
            events,
            rollup,
            profile,
            best_score: None,
            essay: String::new(),
            menu_cursor,
            last_quiz: quiz_type,
        }
    }

    pub fn start(&mut self, quiz_type: QuizType) {
        self.essay.clear();
        self.last_quiz = quiz_type;
        if let Err(e) = self.engine.start_session(quiz_type) {
            tracing::warn!(error = %e, "could not start session");
        }
    }

    pub fn on_tick(&mut self, elapsed: Duration) {
        self.engine.advance(elapsed);
    }

    /// Hands finished sessions to the rollup and refreshes the cached profile
    pub fn sync_profile(&mut self) {
        let Some(rollup) = self.rollup.as_mut() else {
            self.events.try_iter().for_each(drop);
            return;
        };
        match rollup.drain(&self.events) {
            Ok(0) => {}
            Ok(_) => {
                match rollup.store().load() {
                    Ok(profile) => self.profile = profile,
                    Err(e) => tracing::warn!(error = %e, "could not reload profile"),
                }
                match rollup.store().best_score(self.last_quiz) {
                    Ok(best) => self.best_score = best,
                    Err(e) => tracing::warn!(error = %e, "could not read best score"),
                }
            }
            Err(e) => tracing::warn!(error = %e, "profile rollup failed"),
        }
    }

    /// Returns true when the app should quit
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        match self.engine.session().phase {
            Phase::Idle => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return true,
                KeyCode::Up => self.menu_cursor = self.menu_cursor.saturating_sub(1),
                KeyCode::Down => {
                    self.menu_cursor = (self.menu_cursor + 1).min(QuizType::ALL.len() - 1)
                }
                KeyCode::Enter => self.start(QuizType::ALL[self.menu_cursor]),
                _ => {}
            },
            Phase::Playing | Phase::Feedback | Phase::Paused => match key.code {
                KeyCode::Tab => {
                    let _ = self.engine.pause();
                }
                KeyCode::Esc => {
                    self.engine.reset();
                    self.essay.clear();
                }
                code if self.engine.session().quiz_type == Some(QuizType::Writing) => {
                    self.on_essay_key(code)
                }
                KeyCode::Char(c) => {
                    if let Some(digit) = c.to_digit(10).filter(|d| *d > 0) {
                        let _ = self.engine.select_answer(digit as usize - 1);
                    }
                }
                _ => {}
            },
            Phase::Ended => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return true,
                KeyCode::Char('r') | KeyCode::Enter => self.start(self.last_quiz),
                KeyCode::Char('m') => self.engine.reset(),
                _ => {}
            },
        }
        false
    }

    fn on_essay_key(&mut self, code: KeyCode) {
        if self.engine.session().phase != Phase::Playing {
            return;
        }
        match code {
            KeyCode::Char(c) => self.essay.push(c),
            KeyCode::Backspace => {
                self.essay.pop();
            }
            KeyCode::Enter => {
                if let Err(e) = self.engine.submit_essay(count_words(&self.essay)) {
                    tracing::debug!(error = %e, "essay not accepted yet");
                }
            }
            _ => {}
        }
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    // stdout belongs to the terminal UI, so logs go to a file
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("DRILLQUIZ_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init();
}

fn load_bank(config: &Config) -> Result<BuiltinBank, Box<dyn Error>> {
    let bank = match &config.bank_path {
        Some(path) => BuiltinBank::from_path(path)?,
        None => BuiltinBank::named(&config.bank)?,
    };
    Ok(bank)
}

fn print_history() -> Result<(), Box<dyn Error>> {
    let store = SqliteProfileStore::new()?;
    let profile = store.load()?;
    let completed = profile
        .completed_games
        .iter()
        .map(|qt| qt.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    println!("xp: {}", profile.xp);
    println!("completed: {}", if completed.is_empty() { "-" } else { &completed });
    for record in store.recent_sessions(10)? {
        println!(
            "{}  {:<10} {:>5} pts  {:?}",
            record.finished_at.format("%Y-%m-%d %H:%M"),
            record.quiz_type.to_string(),
            record.score,
            record.reason
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply_to(&mut config);
    if cli.save_config {
        config_store.save(&config)?;
    }

    if cli.history {
        return print_history();
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let bank = load_bank(&config)?;
    let rollup = match SqliteProfileStore::new() {
        Ok(store) => Some(ProfileRollup::new(store)),
        Err(e) => {
            tracing::warn!(error = %e, "profile store unavailable, progress will not be saved");
            None
        }
    };

    let mut app = App::new(bank, config.rules, config.quiz_type, rollup);
    if cli.start {
        app.start(config.quiz_type);
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(terminal_input(), Duration::from_millis(TICK_RATE_MS));

    loop {
        terminal.draw(|f| ui(app, f))?;

        let step = runner.step();
        app.on_tick(step.elapsed);
        let quit = match step.event {
            InputEvent::Key(key) => app.on_key(key),
            InputEvent::Resize | InputEvent::Tick => false,
        };
        app.sync_profile();

        if quit {
            break;
        }
    }

    // leaving mid-session abandons it
    app.engine.reset();
    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    f.render_widget(&*app, f.area());
}
