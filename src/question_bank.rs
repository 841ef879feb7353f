use crate::session::QuizType;
use include_dir::{include_dir, Dir};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

static BANK_DIR: Dir = include_dir!("src/bank");

pub const DEFAULT_BANK: &str = "academic";

#[derive(Debug, Error)]
pub enum BankError {
    #[error("question bank `{0}` not found")]
    NotFound(String),
    #[error("question bank is not valid utf-8")]
    Encoding,
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse question bank: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{quiz_type} item {index}: {reason}")]
    InvalidItem {
        quiz_type: QuizType,
        index: usize,
        reason: String,
    },
}

/// A multiple-choice question. `answer` indexes into `options`.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Choice {
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuizItem {
    Vocabulary {
        term: String,
        choice: Choice,
    },
    Listening {
        clip: String,
        transcript: String,
        choice: Choice,
    },
    Grammar {
        choice: Choice,
    },
    Reading {
        title: String,
        passage: String,
        choice: Choice,
    },
    Writing {
        title: String,
        instructions: String,
    },
}

impl QuizItem {
    pub fn choice(&self) -> Option<&Choice> {
        match self {
            QuizItem::Vocabulary { choice, .. }
            | QuizItem::Listening { choice, .. }
            | QuizItem::Grammar { choice }
            | QuizItem::Reading { choice, .. } => Some(choice),
            QuizItem::Writing { .. } => None,
        }
    }
}

/// Read-only source of quiz items, ordered per quiz type.
pub trait QuestionBank {
    fn item_count(&self, quiz_type: QuizType) -> usize;
    fn item_at(&self, quiz_type: QuizType, index: usize) -> Option<&QuizItem>;

    fn correct_index_of(&self, quiz_type: QuizType, index: usize) -> Option<usize> {
        self.item_at(quiz_type, index)
            .and_then(QuizItem::choice)
            .map(|c| c.answer)
    }
}

#[derive(Deserialize, Debug)]
struct RawVocabulary {
    term: String,
    #[serde(flatten)]
    choice: Choice,
}

#[derive(Deserialize, Debug)]
struct RawListening {
    clip: String,
    transcript: String,
    #[serde(flatten)]
    choice: Choice,
}

#[derive(Deserialize, Debug)]
struct RawPassage {
    title: String,
    text: String,
    questions: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct RawPrompt {
    title: String,
    instructions: String,
}

#[derive(Deserialize, Debug)]
struct RawBank {
    name: String,
    #[serde(default)]
    vocabulary: Vec<RawVocabulary>,
    #[serde(default)]
    listening: Vec<RawListening>,
    #[serde(default)]
    grammar: Vec<Choice>,
    reading: Option<RawPassage>,
    #[serde(default)]
    writing: Vec<RawPrompt>,
}

/// Question bank deserialised from the JSON schema shipped under `src/bank`.
#[derive(Clone, Debug)]
pub struct BuiltinBank {
    pub name: String,
    items: HashMap<QuizType, Vec<QuizItem>>,
}

impl BuiltinBank {
    /// Loads one of the banks compiled into the binary.
    pub fn named(name: &str) -> Result<Self, BankError> {
        let file = BANK_DIR
            .get_file(format!("{name}.json"))
            .ok_or_else(|| BankError::NotFound(name.to_string()))?;
        let contents = file.contents_utf8().ok_or(BankError::Encoding)?;
        Self::from_json(contents)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BankError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, BankError> {
        let raw: RawBank = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawBank) -> Result<Self, BankError> {
        let mut items = HashMap::new();

        items.insert(
            QuizType::Vocabulary,
            raw.vocabulary
                .into_iter()
                .map(|v| QuizItem::Vocabulary {
                    term: v.term,
                    choice: v.choice,
                })
                .collect(),
        );
        items.insert(
            QuizType::Listening,
            raw.listening
                .into_iter()
                .map(|l| QuizItem::Listening {
                    clip: l.clip,
                    transcript: l.transcript,
                    choice: l.choice,
                })
                .collect(),
        );
        items.insert(
            QuizType::Grammar,
            raw.grammar
                .into_iter()
                .map(|choice| QuizItem::Grammar { choice })
                .collect(),
        );
        // A reading session covers the sub-questions of one passage.
        items.insert(
            QuizType::Reading,
            raw.reading
                .map(|p| {
                    let (title, text) = (p.title, p.text);
                    p.questions
                        .into_iter()
                        .map(|choice| QuizItem::Reading {
                            title: title.clone(),
                            passage: text.clone(),
                            choice,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        );
        items.insert(
            QuizType::Writing,
            raw.writing
                .into_iter()
                .map(|w| QuizItem::Writing {
                    title: w.title,
                    instructions: w.instructions,
                })
                .collect(),
        );

        let bank = Self {
            name: raw.name,
            items,
        };
        bank.validate()?;
        Ok(bank)
    }

    fn validate(&self) -> Result<(), BankError> {
        for (quiz_type, items) in &self.items {
            for (index, item) in items.iter().enumerate() {
                let Some(choice) = item.choice() else {
                    continue;
                };
                let invalid = |reason: String| BankError::InvalidItem {
                    quiz_type: *quiz_type,
                    index,
                    reason,
                };
                if choice.options.len() < 2 {
                    return Err(invalid("needs at least two options".to_string()));
                }
                if choice.answer >= choice.options.len() {
                    return Err(invalid(format!(
                        "answer {} out of range for {} options",
                        choice.answer,
                        choice.options.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl QuestionBank for BuiltinBank {
    fn item_count(&self, quiz_type: QuizType) -> usize {
        self.items.get(&quiz_type).map_or(0, Vec::len)
    }

    fn item_at(&self, quiz_type: QuizType, index: usize) -> Option<&QuizItem> {
        self.items.get(&quiz_type).and_then(|v| v.get(index))
    }
}
