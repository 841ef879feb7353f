use serde::{Deserialize, Serialize};

/// The drill families a session can be started for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QuizType {
    Vocabulary,
    Listening,
    Grammar,
    Reading,
    Writing,
}

impl QuizType {
    pub const ALL: [QuizType; 5] = [
        QuizType::Vocabulary,
        QuizType::Listening,
        QuizType::Grammar,
        QuizType::Reading,
        QuizType::Writing,
    ];

    /// Case-insensitive lookup by the lowercase name used in storage and on the CLI.
    pub fn parse(name: &str) -> Option<QuizType> {
        <QuizType as clap::ValueEnum>::from_str(name, true).ok()
    }

    pub fn is_writing(self) -> bool {
        matches!(self, QuizType::Writing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Playing,
    Feedback,
    Paused,
    Ended,
}

/// Outcome of a single answered question, shown during the feedback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub selected_index: Option<usize>,
    pub is_correct: bool,
    pub points_awarded: u32,
}

/// The live quiz playthrough. Only the engine mutates it; everyone else sees clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub quiz_type: Option<QuizType>,
    pub score: u32,
    pub lives: u8,
    pub streak: u32,
    pub time_left: u32,
    pub question_index: usize,
    pub total_questions: usize,
    pub phase: Phase,
    pub last_answer: Option<AnswerRecord>,
}

impl Default for Session {
    fn default() -> Self {
        Self::idle(3)
    }
}

impl Session {
    /// Idle defaults. Lives sit at the full count so `lives == 0` only ever means a lost game.
    pub fn idle(max_lives: u8) -> Self {
        Self {
            quiz_type: None,
            score: 0,
            lives: max_lives,
            streak: 0,
            time_left: 0,
            question_index: 0,
            total_questions: 0,
            phase: Phase::Idle,
            last_answer: None,
        }
    }

    pub fn is_last_question(&self) -> bool {
        self.question_index + 1 >= self.total_questions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    Completed,
    OutOfLives,
    EssaySubmitted,
}

/// Terminal event of a session, consumed once by the profile rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEnded {
    pub session_id: u64,
    pub quiz_type: QuizType,
    pub final_score: u32,
    pub xp_earned: u32,
    pub reason: EndReason,
}
