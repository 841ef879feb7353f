use crate::app_dirs::AppDirs;
use crate::scoring::ScoringPolicy;
use crate::session::QuizType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on lives per session.
pub const MAX_LIVES: u8 = 3;

/// Game rules the session engine runs under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Rules {
    pub question_secs: u32,
    pub writing_secs: u32,
    pub feedback_ms: u64,
    pub max_lives: u8,
    pub essay_min_words: usize,
    pub essay_points: u32,
    pub scoring: ScoringPolicy,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            question_secs: 60,
            writing_secs: 1800,
            feedback_ms: 3000,
            max_lives: 3,
            essay_min_words: 50,
            essay_points: 500,
            scoring: ScoringPolicy::default(),
        }
    }
}

impl Rules {
    pub fn base_secs(&self, quiz_type: QuizType) -> u32 {
        match quiz_type {
            QuizType::Writing => self.writing_secs,
            QuizType::Vocabulary | QuizType::Listening | QuizType::Grammar | QuizType::Reading => {
                self.question_secs
            }
        }
    }

    /// Pulls hand-edited values back into the range the engine supports:
    /// lives in `1..=MAX_LIVES` and countdowns of at least one second.
    pub fn sanitized(self) -> Self {
        Self {
            question_secs: self.question_secs.max(1),
            writing_secs: self.writing_secs.max(1),
            max_lives: self.max_lives.clamp(1, MAX_LIVES),
            ..self
        }
    }

    pub fn feedback_window(&self) -> Duration {
        Duration::from_millis(self.feedback_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub quiz_type: QuizType,
    pub bank: String,
    pub bank_path: Option<PathBuf>,
    pub rules: Rules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quiz_type: QuizType::Vocabulary,
            bank: crate::question_bank::DEFAULT_BANK.to_string(),
            bank_path: None,
            rules: Rules::default(),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("drillquiz_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Config::default(),
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
