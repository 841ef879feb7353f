use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// What woke the app loop up.
#[derive(Clone, Debug)]
pub enum InputEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Anything the loop can wait on for input.
pub trait InputSource {
    /// Waits up to `timeout`. `None` means nothing arrived, or the source is gone.
    fn next_within(&self, timeout: Duration) -> Option<InputEvent>;
}

impl InputSource for Receiver<InputEvent> {
    fn next_within(&self, timeout: Duration) -> Option<InputEvent> {
        self.recv_timeout(timeout).ok()
    }
}

/// Spawns a reader thread translating crossterm events into [`InputEvent`]s.
/// The thread exits once the receiver is dropped.
pub fn terminal_input() -> Receiver<InputEvent> {
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || loop {
        let evt = match event::read() {
            // windows reports both press and release
            Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => InputEvent::Key(key),
            Ok(CtEvent::Resize(_, _)) => InputEvent::Resize,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "terminal input closed");
                break;
            }
        };
        if tx.send(evt).is_err() {
            break;
        }
    });

    rx
}

/// One turn of the app loop.
#[derive(Debug)]
pub struct Step {
    pub event: InputEvent,
    /// Wall time since the previous step, for the session clock.
    pub elapsed: Duration,
}

/// Paces the app loop: waits for input, falls back to `Tick` every `tick`,
/// and measures the time that passed in between.
pub struct Runner<S: InputSource> {
    source: S,
    tick: Duration,
    last_step: Instant,
}

impl<S: InputSource> Runner<S> {
    pub fn new(source: S, tick: Duration) -> Self {
        Self {
            source,
            tick,
            last_step: Instant::now(),
        }
    }

    pub fn step(&mut self) -> Step {
        let event = self.source.next_within(self.tick).unwrap_or(InputEvent::Tick);
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_step);
        self.last_step = now;
        Step { event, elapsed }
    }
}
