use serde::{Deserialize, Serialize};

/// Result of scoring one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub points: u32,
    pub new_streak: u32,
    pub lives_delta: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub base_points: u32,
    pub streak_bonus: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base_points: 100,
            streak_bonus: 10,
        }
    }
}

impl ScoringPolicy {
    /// `streak` is the run the player is on before this answer.
    pub fn evaluate(&self, is_correct: bool, streak: u32) -> Evaluation {
        if is_correct {
            Evaluation {
                points: self
                    .base_points
                    .saturating_add(streak.saturating_mul(self.streak_bonus)),
                new_streak: streak.saturating_add(1),
                lives_delta: 0,
            }
        } else {
            Evaluation {
                points: 0,
                new_streak: 0,
                lives_delta: -1,
            }
        }
    }
}

/// Lives left after applying `delta`, clamped to `[0, max]`.
pub fn apply_lives_delta(lives: u8, delta: i8, max: u8) -> u8 {
    let next = i16::from(lives) + i16::from(delta);
    next.clamp(0, i16::from(max)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_answer_awards_base_plus_streak_bonus() {
        let policy = ScoringPolicy::default();
        for streak in [0u32, 1, 2, 7, 50] {
            let eval = policy.evaluate(true, streak);
            assert_eq!(eval.points, 100 + 10 * streak);
            assert_eq!(eval.new_streak, streak + 1);
            assert_eq!(eval.lives_delta, 0);
        }
    }

    #[test]
    fn incorrect_answer_breaks_streak_and_costs_a_life() {
        let policy = ScoringPolicy::default();
        for streak in [0u32, 3, 99] {
            let eval = policy.evaluate(false, streak);
            assert_eq!(eval.points, 0);
            assert_eq!(eval.new_streak, 0);
            assert_eq!(eval.lives_delta, -1);
        }
    }

    #[test]
    fn custom_policy_constants() {
        let policy = ScoringPolicy {
            base_points: 50,
            streak_bonus: 5,
        };
        assert_eq!(policy.evaluate(true, 4).points, 70);
    }

    #[test]
    fn huge_streak_saturates() {
        let eval = ScoringPolicy::default().evaluate(true, u32::MAX);
        assert_eq!(eval.points, u32::MAX);
        assert_eq!(eval.new_streak, u32::MAX);
    }

    #[test]
    fn lives_are_clamped() {
        assert_eq!(apply_lives_delta(3, -1, 3), 2);
        assert_eq!(apply_lives_delta(0, -1, 3), 0);
        assert_eq!(apply_lives_delta(3, 1, 3), 3);
    }
}
