use crate::app_dirs::AppDirs;
use crate::engine::EngineEvent;
use crate::session::{EndReason, QuizType, SessionEnded};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to prepare profile directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProfileError>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub xp: u64,
    pub completed_games: BTreeSet<QuizType>,
}

/// One finished session as recorded in the history log.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub quiz_type: QuizType,
    pub score: u32,
    pub xp_earned: u32,
    pub reason: EndReason,
    pub finished_at: DateTime<Local>,
}

/// Persistent home of the user profile. Last write wins.
pub trait ProfileStore {
    fn load(&self) -> Result<UserProfile>;
    fn apply(&mut self, ended: &SessionEnded) -> Result<()>;
}

fn reason_str(reason: EndReason) -> &'static str {
    match reason {
        EndReason::Completed => "completed",
        EndReason::OutOfLives => "out_of_lives",
        EndReason::EssaySubmitted => "essay_submitted",
    }
}

fn parse_reason(s: &str) -> EndReason {
    match s {
        "out_of_lives" => EndReason::OutOfLives,
        "essay_submitted" => EndReason::EssaySubmitted,
        _ => EndReason::Completed,
    }
}

/// sqlite-backed profile and session history
#[derive(Debug)]
pub struct SqliteProfileStore {
    conn: Connection,
}

impl SqliteProfileStore {
    /// Opens the store at the default state location, creating it if needed.
    pub fn new() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("drillquiz_profile.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profile (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                xp INTEGER NOT NULL DEFAULT 0
            );
            INSERT OR IGNORE INTO profile (id, xp) VALUES (1, 0);

            CREATE TABLE IF NOT EXISTS completed_games (
                quiz_type TEXT PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS session_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                quiz_type TEXT NOT NULL,
                score INTEGER NOT NULL,
                xp_earned INTEGER NOT NULL,
                reason TEXT NOT NULL,
                finished_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_session_log_type ON session_log(quiz_type);
            "#,
        )?;
        Ok(Self { conn })
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT quiz_type, score, xp_earned, reason, finished_at
            FROM session_log
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let quiz_type: String = row.get(0)?;
            let quiz_type = QuizType::parse(&quiz_type).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(
                    0,
                    "quiz_type".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?;
            let reason: String = row.get(3)?;
            let finished_at: String = row.get(4)?;
            let finished_at = DateTime::parse_from_rfc3339(&finished_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        4,
                        "finished_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(SessionRecord {
                quiz_type,
                score: row.get(1)?,
                xp_earned: row.get(2)?,
                reason: parse_reason(&reason),
                finished_at,
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    pub fn best_score(&self, quiz_type: QuizType) -> Result<Option<u32>> {
        let best = self
            .conn
            .query_row(
                "SELECT MAX(score) FROM session_log WHERE quiz_type = ?1",
                [quiz_type.to_string()],
                |row| row.get::<_, Option<u32>>(0),
            )
            .optional()?;
        Ok(best.flatten())
    }
}

impl ProfileStore for SqliteProfileStore {
    fn load(&self) -> Result<UserProfile> {
        let xp: i64 = self
            .conn
            .query_row("SELECT xp FROM profile WHERE id = 1", [], |row| row.get(0))?;

        let mut stmt = self.conn.prepare("SELECT quiz_type FROM completed_games")?;
        let completed_games = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|name| name.ok().and_then(|n| QuizType::parse(&n)))
            .collect();

        Ok(UserProfile {
            xp: xp.max(0) as u64,
            completed_games,
        })
    }

    fn apply(&mut self, ended: &SessionEnded) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE profile SET xp = xp + ?1 WHERE id = 1",
            params![ended.xp_earned],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO completed_games (quiz_type) VALUES (?1)",
            params![ended.quiz_type.to_string()],
        )?;
        tx.execute(
            r#"
            INSERT INTO session_log (quiz_type, score, xp_earned, reason, finished_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                ended.quiz_type.to_string(),
                ended.final_score,
                ended.xp_earned,
                reason_str(ended.reason),
                Local::now().to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}

/// Merges finished sessions into the profile, each at most once.
pub struct ProfileRollup<S: ProfileStore> {
    store: S,
    applied: HashSet<u64>,
}

impl<S: ProfileStore> ProfileRollup<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            applied: HashSet::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns `false` when this session was already rolled up.
    pub fn consume(&mut self, ended: &SessionEnded) -> Result<bool> {
        if self.applied.contains(&ended.session_id) {
            tracing::debug!(session_id = ended.session_id, "rollup already applied");
            return Ok(false);
        }
        self.store.apply(ended)?;
        self.applied.insert(ended.session_id);
        tracing::info!(
            session_id = ended.session_id,
            quiz_type = %ended.quiz_type,
            xp = ended.xp_earned,
            "profile updated"
        );
        Ok(true)
    }

    /// Applies every terminal event waiting on `rx`, skipping snapshots.
    pub fn drain(&mut self, rx: &Receiver<EngineEvent>) -> Result<usize> {
        let mut applied = 0;
        for event in rx.try_iter() {
            if let EngineEvent::Ended(ended) = event {
                if self.consume(&ended)? {
                    applied += 1;
                }
            }
        }
        Ok(applied)
    }
}
