//! crates/fitness_core/src/timer.rs
//!
//! The exercise countdown state machine.
//!
//! `Idle -> Running -> Expired`, with `Running <-> Paused` on toggle. The
//! timer arms countdowns through a [`Scheduler`] and receives their ticks back
//! as [`TimerEvent`]s on a channel. Every arm bumps a generation counter, so
//! events from a countdown that has since been cancelled are dropped.

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::scheduler::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    Tick { remaining: u32 },
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub generation: u64,
    pub signal: TimerSignal,
}

#[derive(Debug)]
pub struct Timer {
    state: TimerState,
    remaining_secs: u32,
    generation: u64,
    countdown: Option<CancellationToken>,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            remaining_secs: 0,
            generation: 0,
            countdown: None,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Cancels any running countdown and resets to `Idle` with `secs` on the clock.
    pub fn seed(&mut self, secs: u32) {
        self.cancel();
        self.state = TimerState::Idle;
        self.remaining_secs = secs;
    }

    /// Starts from `Idle` or resumes from `Paused`. Returns whether it did.
    pub fn start(&mut self, scheduler: &dyn Scheduler, events: &UnboundedSender<TimerEvent>) -> bool {
        match self.state {
            TimerState::Idle | TimerState::Paused => {
                self.state = TimerState::Running;
                self.arm(scheduler, events);
                true
            }
            TimerState::Running | TimerState::Expired => false,
        }
    }

    /// `Running -> Paused`, `Idle | Paused -> Running`. No effect once expired.
    pub fn toggle(&mut self, scheduler: &dyn Scheduler, events: &UnboundedSender<TimerEvent>) {
        if self.state == TimerState::Running {
            self.cancel();
            self.state = TimerState::Paused;
        } else {
            self.start(scheduler, events);
        }
    }

    /// Stops the countdown without changing state. Pending events become stale.
    pub fn cancel(&mut self) {
        if let Some(token) = self.countdown.take() {
            token.cancel();
        }
        self.generation += 1;
    }

    /// Applies an event from the scheduler. Returns `true` when this event
    /// moved the timer to `Expired`.
    pub fn apply(&mut self, event: TimerEvent) -> bool {
        if event.generation != self.generation || self.state != TimerState::Running {
            return false;
        }
        match event.signal {
            TimerSignal::Tick { remaining } => {
                self.remaining_secs = remaining;
                false
            }
            TimerSignal::Expired => {
                self.remaining_secs = 0;
                self.countdown = None;
                self.state = TimerState::Expired;
                true
            }
        }
    }

    fn arm(&mut self, scheduler: &dyn Scheduler, events: &UnboundedSender<TimerEvent>) {
        if let Some(token) = self.countdown.take() {
            token.cancel();
        }
        self.generation += 1;
        let generation = self.generation;
        let tick_tx = events.clone();
        let expire_tx = events.clone();

        let token = scheduler.start(
            self.remaining_secs,
            Box::new(move |remaining| {
                let _ = tick_tx.send(TimerEvent {
                    generation,
                    signal: TimerSignal::Tick { remaining },
                });
            }),
            Box::new(move || {
                let _ = expire_tx.send(TimerEvent {
                    generation,
                    signal: TimerSignal::Expired,
                });
            }),
        );
        self.countdown = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn drain(timer: &mut Timer, rx: &mut UnboundedReceiver<TimerEvent>) -> bool {
        let mut expired = false;
        while let Ok(event) = rx.try_recv() {
            expired |= timer.apply(event);
        }
        expired
    }

    #[test]
    fn runs_down_to_expired() {
        let scheduler = ManualScheduler::new();
        let (tx, mut rx) = unbounded_channel();
        let mut timer = Timer::new();
        timer.seed(3);
        assert!(timer.start(&scheduler, &tx));

        scheduler.advance(1);
        assert!(!drain(&mut timer, &mut rx));
        assert_eq!(timer.remaining_secs(), 2);

        scheduler.advance(2);
        assert!(drain(&mut timer, &mut rx));
        assert_eq!(timer.state(), TimerState::Expired);
        assert!(!timer.start(&scheduler, &tx));
    }

    #[test]
    fn pause_keeps_remaining_and_resume_continues() {
        let scheduler = ManualScheduler::new();
        let (tx, mut rx) = unbounded_channel();
        let mut timer = Timer::new();
        timer.seed(10);
        timer.toggle(&scheduler, &tx);
        scheduler.advance(4);
        drain(&mut timer, &mut rx);

        timer.toggle(&scheduler, &tx);
        assert_eq!(timer.state(), TimerState::Paused);
        assert_eq!(scheduler.active(), 0);
        scheduler.advance(3);
        drain(&mut timer, &mut rx);
        assert_eq!(timer.remaining_secs(), 6);

        timer.toggle(&scheduler, &tx);
        scheduler.advance(6);
        assert!(drain(&mut timer, &mut rx));
    }

    #[test]
    fn reseeding_drops_events_from_the_old_countdown() {
        let scheduler = ManualScheduler::new();
        let (tx, mut rx) = unbounded_channel();
        let mut timer = Timer::new();
        timer.seed(1);
        timer.start(&scheduler, &tx);
        scheduler.advance(1);

        // Expiry is queued but not yet applied when navigation reseeds.
        timer.seed(20);
        assert!(!drain(&mut timer, &mut rx));
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.remaining_secs(), 20);
    }
}
