use std::time::Duration;

/// Logical timer slots. A session uses at most one of them at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    Countdown,
    Feedback,
}

/// Identifies one arming of a slot so that events from an earlier arming can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArmId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSpec {
    /// Fires `Tick` after `first`, then every `period` until disarmed.
    Every { period: Duration, first: Duration },
    /// Fires `Expired` once after `after` and disarms itself.
    Once { after: Duration },
}

impl TimerSpec {
    pub fn every_second() -> Self {
        TimerSpec::Every {
            period: Duration::from_secs(1),
            first: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEventKind {
    Tick,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockEvent {
    pub slot: TimerSlot,
    pub id: ArmId,
    pub kind: ClockEventKind,
}

/// Timer capability injected into the session engine.
pub trait Clock {
    fn arm(&mut self, slot: TimerSlot, spec: TimerSpec) -> ArmId;
    fn disarm(&mut self, slot: TimerSlot);
    fn is_armed(&self, slot: TimerSlot) -> bool;
    /// Time until the slot next fires, if armed.
    fn remaining(&self, slot: TimerSlot) -> Option<Duration>;

    fn reset(&mut self) {
        self.disarm(TimerSlot::Countdown);
        self.disarm(TimerSlot::Feedback);
    }
}

#[derive(Debug, Clone, Copy)]
struct Arming {
    id: ArmId,
    period: Option<Duration>,
    until_fire: Duration,
}

/// Clock advanced by explicit elapsed time.
///
/// The runtime feeds it wall-clock deltas between loop iterations; tests feed it
/// whatever they like, which keeps the engine deterministic.
#[derive(Debug, Default)]
pub struct SteppedClock {
    next_id: u64,
    countdown: Option<Arming>,
    feedback: Option<Arming>,
}

impl SteppedClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, slot: TimerSlot) -> &mut Option<Arming> {
        match slot {
            TimerSlot::Countdown => &mut self.countdown,
            TimerSlot::Feedback => &mut self.feedback,
        }
    }

    fn slot(&self, slot: TimerSlot) -> &Option<Arming> {
        match slot {
            TimerSlot::Countdown => &self.countdown,
            TimerSlot::Feedback => &self.feedback,
        }
    }

    /// Time until the earliest armed slot fires.
    pub fn next_deadline(&self) -> Option<Duration> {
        [self.countdown, self.feedback]
            .into_iter()
            .flatten()
            .map(|a| a.until_fire)
            .min()
    }

    /// Moves time forward and returns every event that fell due, in firing order per slot.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        for slot in [TimerSlot::Countdown, TimerSlot::Feedback] {
            let entry = self.slot_mut(slot);
            let mut left = elapsed;
            while let Some(arming) = entry.as_mut() {
                if left < arming.until_fire {
                    arming.until_fire -= left;
                    break;
                }
                left -= arming.until_fire;
                match arming.period {
                    Some(period) => {
                        events.push(ClockEvent {
                            slot,
                            id: arming.id,
                            kind: ClockEventKind::Tick,
                        });
                        arming.until_fire = period;
                    }
                    None => {
                        events.push(ClockEvent {
                            slot,
                            id: arming.id,
                            kind: ClockEventKind::Expired,
                        });
                        *entry = None;
                    }
                }
            }
        }
        events
    }
}

impl Clock for SteppedClock {
    fn arm(&mut self, slot: TimerSlot, spec: TimerSpec) -> ArmId {
        self.next_id += 1;
        let id = ArmId(self.next_id);
        let arming = match spec {
            TimerSpec::Every { period, first } => Arming {
                id,
                // a zero period would never let `advance` terminate
                period: Some(period.max(Duration::from_millis(1))),
                until_fire: first,
            },
            TimerSpec::Once { after } => Arming {
                id,
                period: None,
                until_fire: after,
            },
        };
        *self.slot_mut(slot) = Some(arming);
        id
    }

    fn disarm(&mut self, slot: TimerSlot) {
        *self.slot_mut(slot) = None;
    }

    fn is_armed(&self, slot: TimerSlot) -> bool {
        self.slot(slot).is_some()
    }

    fn remaining(&self, slot: TimerSlot) -> Option<Duration> {
        self.slot(slot).map(|a| a.until_fire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(events: &[ClockEvent]) -> Vec<ClockEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn repeating_timer_ticks_once_per_period() {
        let mut clock = SteppedClock::new();
        clock.arm(TimerSlot::Countdown, TimerSpec::every_second());

        assert!(clock.advance(Duration::from_millis(999)).is_empty());
        let events = clock.advance(Duration::from_millis(1));
        assert_eq!(kinds(&events), vec![ClockEventKind::Tick]);

        let events = clock.advance(Duration::from_millis(3500));
        assert_eq!(events.len(), 3);
        assert_eq!(
            clock.remaining(TimerSlot::Countdown),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn one_shot_expires_and_disarms() {
        let mut clock = SteppedClock::new();
        let id = clock.arm(
            TimerSlot::Feedback,
            TimerSpec::Once {
                after: Duration::from_millis(3000),
            },
        );

        assert!(clock.advance(Duration::from_millis(2999)).is_empty());
        let events = clock.advance(Duration::from_millis(10_000));
        assert_eq!(
            events,
            vec![ClockEvent {
                slot: TimerSlot::Feedback,
                id,
                kind: ClockEventKind::Expired
            }]
        );
        assert!(!clock.is_armed(TimerSlot::Feedback));
    }

    #[test]
    fn rearming_issues_a_new_id() {
        let mut clock = SteppedClock::new();
        let a = clock.arm(TimerSlot::Countdown, TimerSpec::every_second());
        let b = clock.arm(TimerSlot::Countdown, TimerSpec::every_second());
        assert_ne!(a, b);

        let events = clock.advance(Duration::from_secs(1));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, b);
    }

    #[test]
    fn disarmed_slot_is_silent() {
        let mut clock = SteppedClock::new();
        clock.arm(TimerSlot::Countdown, TimerSpec::every_second());
        clock.reset();
        assert!(clock.advance(Duration::from_secs(10)).is_empty());
        assert_eq!(clock.remaining(TimerSlot::Countdown), None);
    }

    #[test]
    fn first_delay_differs_from_period() {
        let mut clock = SteppedClock::new();
        clock.arm(
            TimerSlot::Countdown,
            TimerSpec::Every {
                period: Duration::from_secs(1),
                first: Duration::from_millis(250),
            },
        );
        assert_eq!(clock.advance(Duration::from_millis(250)).len(), 1);
        assert_eq!(
            clock.remaining(TimerSlot::Countdown),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn next_deadline_is_the_earliest_armed_slot() {
        let mut clock = SteppedClock::new();
        assert_eq!(clock.next_deadline(), None);

        clock.arm(TimerSlot::Countdown, TimerSpec::every_second());
        clock.arm(
            TimerSlot::Feedback,
            TimerSpec::Once {
                after: Duration::from_millis(400),
            },
        );
        assert_eq!(clock.next_deadline(), Some(Duration::from_millis(400)));

        clock.advance(Duration::from_millis(400));
        assert_eq!(clock.next_deadline(), Some(Duration::from_millis(600)));
    }
}
