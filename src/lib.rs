// Library surface for headless/integration tests and reuse.
// The terminal front-end lives in main.rs and ui.rs.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod engine;
pub mod profile;
pub mod question_bank;
pub mod runtime;
pub mod scoring;
pub mod session;

pub use clock::{Clock, ClockEvent, SteppedClock, TimerSlot, TimerSpec};
pub use config::{Config, ConfigStore, FileConfigStore, Rules};
pub use engine::{count_words, CommandRejected, EngineEvent, SessionEngine};
pub use profile::{ProfileRollup, ProfileStore, SqliteProfileStore, UserProfile};
pub use question_bank::{BuiltinBank, QuestionBank, QuizItem};
pub use scoring::ScoringPolicy;
pub use session::{AnswerRecord, EndReason, Phase, QuizType, Session, SessionEnded};
