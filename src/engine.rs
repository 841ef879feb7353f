use crate::clock::{ArmId, Clock, ClockEvent, ClockEventKind, SteppedClock, TimerSlot, TimerSpec};
use crate::config::Rules;
use crate::question_bank::{QuestionBank, QuizItem};
use crate::scoring::apply_lives_delta;
use crate::session::{AnswerRecord, EndReason, Phase, QuizType, Session, SessionEnded};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use thiserror::Error;

/// Everything the engine publishes to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Snapshot(Session),
    Ended(SessionEnded),
}

/// Why a command left the session untouched. Callers are free to ignore it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandRejected {
    #[error("`{command}` is not valid while {phase:?}")]
    InvalidTransition { command: &'static str, phase: Phase },
    #[error("essay has {words} words, at least {required} required")]
    PrematureSubmit { words: usize, required: usize },
    #[error("no {0} items in the question bank")]
    EmptyBank(QuizType),
}

#[derive(Debug, Clone, Copy)]
struct PausedTimer {
    resume_to: Phase,
    slot: TimerSlot,
    remaining: Duration,
}

/// Counts whitespace-separated words in an essay buffer.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Owns the live quiz session and drives it through
/// `Idle -> Playing <-> Feedback -> Ended`, with `Paused` reachable from both
/// live phases.
///
/// Commands and clock events are plain `&mut self` calls, so transitions are
/// serialized by construction. Every transition publishes a [`Session`]
/// snapshot; a finished game additionally publishes exactly one
/// [`SessionEnded`].
pub struct SessionEngine<B: QuestionBank, C: Clock> {
    bank: B,
    clock: C,
    rules: Rules,
    session: Session,
    session_id: u64,
    live_arm: Option<(TimerSlot, ArmId)>,
    paused: Option<PausedTimer>,
    subscribers: Vec<Sender<EngineEvent>>,
}

impl<B: QuestionBank, C: Clock> SessionEngine<B, C> {
    pub fn new(bank: B, clock: C, rules: Rules) -> Self {
        let rules = rules.sanitized();
        Self {
            bank,
            clock,
            session: Session::idle(rules.max_lives),
            rules,
            session_id: 0,
            live_arm: None,
            paused: None,
            subscribers: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Id of the current (or most recently finished) session.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn current_item(&self) -> Option<&QuizItem> {
        let quiz_type = self.session.quiz_type?;
        self.bank.item_at(quiz_type, self.session.question_index)
    }

    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn start_session(&mut self, quiz_type: QuizType) -> Result<(), CommandRejected> {
        let available = self.bank.item_count(quiz_type);
        if available == 0 {
            tracing::warn!(%quiz_type, "refusing to start a session with an empty bank");
            return Err(CommandRejected::EmptyBank(quiz_type));
        }
        let total_questions = if quiz_type.is_writing() { 1 } else { available };

        if self.session.phase != Phase::Idle {
            tracing::debug!(phase = ?self.session.phase, "abandoning session for a new start");
            self.clear();
        }

        self.session_id += 1;
        self.session = Session {
            quiz_type: Some(quiz_type),
            score: 0,
            lives: self.rules.max_lives,
            streak: 0,
            time_left: self.rules.base_secs(quiz_type),
            question_index: 0,
            total_questions,
            phase: Phase::Playing,
            last_answer: None,
        };
        self.arm(TimerSlot::Countdown, TimerSpec::every_second());
        tracing::info!(
            session_id = self.session_id,
            %quiz_type,
            total_questions,
            "session started"
        );
        self.publish_snapshot();
        Ok(())
    }

    /// Toggles between a live phase and `Paused`, carrying the exact remaining timer across.
    pub fn pause(&mut self) -> Result<(), CommandRejected> {
        match self.session.phase {
            Phase::Playing | Phase::Feedback => {
                let resume_to = self.session.phase;
                let slot = if resume_to == Phase::Feedback {
                    TimerSlot::Feedback
                } else {
                    TimerSlot::Countdown
                };
                let remaining = self.clock.remaining(slot).unwrap_or(match slot {
                    TimerSlot::Countdown => Duration::from_secs(1),
                    TimerSlot::Feedback => self.rules.feedback_window(),
                });
                self.disarm_all();
                self.paused = Some(PausedTimer {
                    resume_to,
                    slot,
                    remaining,
                });
                self.session.phase = Phase::Paused;
                tracing::debug!(?remaining, ?slot, "paused");
            }
            Phase::Paused => {
                let Some(paused) = self.paused.take() else {
                    tracing::error!("paused without a captured timer");
                    return Err(self.reject("pause"));
                };
                let spec = match paused.slot {
                    TimerSlot::Countdown => TimerSpec::Every {
                        period: Duration::from_secs(1),
                        first: paused.remaining,
                    },
                    TimerSlot::Feedback => TimerSpec::Once {
                        after: paused.remaining,
                    },
                };
                self.session.phase = paused.resume_to;
                self.arm(paused.slot, spec);
                tracing::debug!(remaining = ?paused.remaining, "resumed");
            }
            Phase::Idle | Phase::Ended => return Err(self.reject("pause")),
        }
        self.publish_snapshot();
        Ok(())
    }

    pub fn select_answer(&mut self, option_index: usize) -> Result<(), CommandRejected> {
        let quiz_type = match (self.session.phase, self.session.quiz_type) {
            (Phase::Playing, Some(qt)) if !qt.is_writing() => qt,
            _ => return Err(self.reject("select_answer")),
        };

        // Out-of-range indices simply never match.
        let is_correct = self
            .bank
            .correct_index_of(quiz_type, self.session.question_index)
            == Some(option_index);
        let eval = self.rules.scoring.evaluate(is_correct, self.session.streak);

        self.session.score = self.session.score.saturating_add(eval.points);
        self.session.streak = eval.new_streak;
        self.session.lives =
            apply_lives_delta(self.session.lives, eval.lives_delta, self.rules.max_lives);
        self.session.last_answer = Some(AnswerRecord {
            selected_index: Some(option_index),
            is_correct,
            points_awarded: eval.points,
        });
        tracing::debug!(
            question = self.session.question_index,
            is_correct,
            points = eval.points,
            lives = self.session.lives,
            "answer scored"
        );

        if self.session.lives == 0 {
            self.finish(EndReason::OutOfLives);
            return Ok(());
        }

        self.session.phase = Phase::Feedback;
        self.arm(
            TimerSlot::Feedback,
            TimerSpec::Once {
                after: self.rules.feedback_window(),
            },
        );
        self.publish_snapshot();
        Ok(())
    }

    pub fn submit_essay(&mut self, word_count: usize) -> Result<(), CommandRejected> {
        match (self.session.phase, self.session.quiz_type) {
            (Phase::Playing, Some(QuizType::Writing)) => {}
            _ => return Err(self.reject("submit_essay")),
        }
        if word_count < self.rules.essay_min_words {
            tracing::debug!(word_count, "essay below the word floor");
            return Err(CommandRejected::PrematureSubmit {
                words: word_count,
                required: self.rules.essay_min_words,
            });
        }
        self.session.score = self.session.score.saturating_add(self.rules.essay_points);
        self.finish(EndReason::EssaySubmitted);
        Ok(())
    }

    /// Abandons whatever is running. Never fires a rollup.
    pub fn reset(&mut self) {
        if self.session.phase != Phase::Idle {
            tracing::info!(session_id = self.session_id, "session reset");
        }
        self.clear();
        self.publish_snapshot();
    }

    /// Delivers a timer event. Events from anything but the live arming are dropped.
    pub fn on_clock(&mut self, event: ClockEvent) {
        if self.live_arm != Some((event.slot, event.id)) {
            tracing::trace!(?event, "stale clock event");
            return;
        }
        match (event.slot, event.kind, self.session.phase) {
            (TimerSlot::Countdown, ClockEventKind::Tick, Phase::Playing) => self.countdown_tick(),
            (TimerSlot::Feedback, ClockEventKind::Expired, Phase::Feedback) => {
                self.live_arm = None;
                self.auto_advance();
            }
            _ => tracing::trace!(?event, phase = ?self.session.phase, "clock event ignored"),
        }
    }

    fn countdown_tick(&mut self) {
        match self.session.time_left {
            // Timed out earlier; the question stays put until the player acts.
            0 => {}
            1 => {
                self.session.time_left = 0;
                self.session.lives = apply_lives_delta(self.session.lives, -1, self.rules.max_lives);
                tracing::debug!(lives = self.session.lives, "question timed out");
                if self.session.lives == 0 {
                    self.finish(EndReason::OutOfLives);
                } else {
                    self.publish_snapshot();
                }
            }
            _ => {
                self.session.time_left -= 1;
                self.publish_snapshot();
            }
        }
    }

    fn auto_advance(&mut self) {
        if self.session.lives == 0 {
            self.finish(EndReason::OutOfLives);
            return;
        }
        if self.session.is_last_question() {
            self.finish(EndReason::Completed);
            return;
        }
        let Some(quiz_type) = self.session.quiz_type else {
            return;
        };
        self.session.question_index += 1;
        self.session.time_left = self.rules.base_secs(quiz_type);
        self.session.last_answer = None;
        self.session.phase = Phase::Playing;
        self.arm(TimerSlot::Countdown, TimerSpec::every_second());
        self.publish_snapshot();
    }

    fn finish(&mut self, reason: EndReason) {
        self.disarm_all();
        self.paused = None;
        self.session.phase = Phase::Ended;
        self.publish_snapshot();

        let Some(quiz_type) = self.session.quiz_type else {
            return;
        };
        let ended = SessionEnded {
            session_id: self.session_id,
            quiz_type,
            final_score: self.session.score,
            xp_earned: self.session.score,
            reason,
        };
        tracing::info!(
            session_id = ended.session_id,
            %quiz_type,
            score = ended.final_score,
            ?reason,
            "session ended"
        );
        self.publish(EngineEvent::Ended(ended));
    }

    fn clear(&mut self) {
        self.disarm_all();
        self.paused = None;
        self.session = Session::idle(self.rules.max_lives);
    }

    /// Arms `slot` as the session's only timer.
    fn arm(&mut self, slot: TimerSlot, spec: TimerSpec) {
        let double_armed =
            self.clock.is_armed(slot) || self.live_arm.is_some_and(|(live, _)| live == slot);
        if double_armed {
            tracing::error!(?slot, "timer slot armed twice");
        }
        debug_assert!(!double_armed, "timer slot {slot:?} armed twice");
        // release builds recover by dropping whatever was armed
        self.disarm_all();
        let id = self.clock.arm(slot, spec);
        self.live_arm = Some((slot, id));
    }

    fn disarm_all(&mut self) {
        self.clock.reset();
        self.live_arm = None;
    }

    fn reject(&self, command: &'static str) -> CommandRejected {
        tracing::debug!(command, phase = ?self.session.phase, "command ignored");
        CommandRejected::InvalidTransition {
            command,
            phase: self.session.phase,
        }
    }

    fn publish_snapshot(&mut self) {
        debug_assert!(
            self.session.lives > 0 || self.session.phase == Phase::Ended,
            "lives exhausted outside Ended"
        );
        self.publish(EngineEvent::Snapshot(self.session.clone()));
    }

    fn publish(&mut self, event: EngineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl<B: QuestionBank> SessionEngine<B, SteppedClock> {
    /// Advances the owned clock and feeds every due event back into the engine.
    ///
    /// Time is stepped one deadline at a time, so a timer armed by an event
    /// (the next question's countdown after feedback) still sees the rest of `elapsed`.
    pub fn advance(&mut self, elapsed: Duration) {
        let mut left = elapsed;
        loop {
            let step = match self.clock.next_deadline() {
                Some(due) if due <= left => due,
                _ => left,
            };
            left -= step;
            for event in self.clock.advance(step) {
                self.on_clock(event);
            }
            if left.is_zero() {
                break;
            }
        }
    }
}

impl<B: QuestionBank, C: Clock> Drop for SessionEngine<B, C> {
    fn drop(&mut self) {
        self.clock.reset();
    }
}
