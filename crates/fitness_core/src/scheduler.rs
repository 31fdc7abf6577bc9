//! crates/fitness_core/src/scheduler.rs
//!
//! The countdown clock behind the exercise timer. The player never touches
//! wall-clock time directly: it arms a countdown through a `Scheduler` and
//! gets a `CancellationToken` back.

use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Called after every elapsed tick with the seconds still remaining.
pub type TickFn = Box<dyn FnMut(u32) + Send>;
/// Called once when the countdown reaches zero.
pub type ExpireFn = Box<dyn FnOnce() + Send>;

pub trait Scheduler: Send + Sync {
    /// Arms a countdown of `duration_secs` ticks.
    ///
    /// Cancelling the returned token stops the countdown; neither callback
    /// fires after cancellation is observed.
    fn start(&self, duration_secs: u32, on_tick: TickFn, on_expire: ExpireFn) -> CancellationToken;
}

//=========================================================================================
// Tokio Scheduler
//=========================================================================================

/// Ticks on a `tokio::time::interval`. Must be used inside a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    tick_interval: Duration,
}

impl TokioScheduler {
    pub fn new(tick_interval: Duration) -> Self {
        Self { tick_interval }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Scheduler for TokioScheduler {
    fn start(&self, duration_secs: u32, mut on_tick: TickFn, on_expire: ExpireFn) -> CancellationToken {
        let token = CancellationToken::new();
        let child = token.clone();
        let period = self.tick_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick of an interval completes immediately.
            interval.tick().await;

            let mut remaining = duration_secs;
            while remaining > 0 {
                tokio::select! {
                    _ = child.cancelled() => return,
                    _ = interval.tick() => {
                        remaining -= 1;
                        on_tick(remaining);
                    }
                }
            }
            if !child.is_cancelled() {
                on_expire();
            }
        });

        token
    }
}

//=========================================================================================
// Manual Scheduler (fake clock)
//=========================================================================================

struct ManualCountdown {
    remaining: u32,
    token: CancellationToken,
    on_tick: TickFn,
    on_expire: Option<ExpireFn>,
}

/// A scheduler that only moves when `advance` is called.
#[derive(Default)]
pub struct ManualScheduler {
    countdowns: Mutex<Vec<ManualCountdown>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the fake clock forward by `secs` ticks, firing callbacks inline.
    pub fn advance(&self, secs: u32) {
        let mut countdowns = self.countdowns.lock().unwrap_or_else(|e| e.into_inner());
        for _ in 0..secs {
            countdowns.retain(|c| !c.token.is_cancelled());
            for countdown in countdowns.iter_mut() {
                countdown.remaining = countdown.remaining.saturating_sub(1);
                (countdown.on_tick)(countdown.remaining);
                if countdown.remaining == 0 {
                    if let Some(on_expire) = countdown.on_expire.take() {
                        on_expire();
                    }
                }
            }
            countdowns.retain(|c| c.remaining > 0);
        }
    }

    /// Countdowns that are armed and not cancelled.
    pub fn active(&self) -> usize {
        self.countdowns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| !c.token.is_cancelled())
            .count()
    }
}

impl Scheduler for ManualScheduler {
    fn start(&self, duration_secs: u32, on_tick: TickFn, on_expire: ExpireFn) -> CancellationToken {
        let token = CancellationToken::new();
        if duration_secs == 0 {
            on_expire();
            return token;
        }
        self.countdowns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ManualCountdown {
                remaining: duration_secs,
                token: token.clone(),
                on_tick,
                on_expire: Some(on_expire),
            });
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counters() -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        (Arc::new(AtomicU32::new(0)), Arc::new(AtomicU32::new(0)))
    }

    #[test]
    fn manual_countdown_expires_once_at_zero() {
        let scheduler = ManualScheduler::new();
        let (ticks, expiries) = counters();
        let (t, e) = (ticks.clone(), expiries.clone());
        scheduler.start(
            3,
            Box::new(move |_| {
                t.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(move || {
                e.fetch_add(1, Ordering::SeqCst);
            }),
        );

        scheduler.advance(2);
        assert_eq!(expiries.load(Ordering::SeqCst), 0);
        scheduler.advance(5);
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(expiries.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.active(), 0);
    }

    #[test]
    fn cancelled_countdown_never_fires() {
        let scheduler = ManualScheduler::new();
        let (_, expiries) = counters();
        let e = expiries.clone();
        let token = scheduler.start(
            2,
            Box::new(|_| {}),
            Box::new(move || {
                e.fetch_add(1, Ordering::SeqCst);
            }),
        );
        token.cancel();
        assert_eq!(scheduler.active(), 0);
        scheduler.advance(10);
        assert_eq!(expiries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_ticks_every_interval() {
        let scheduler = TokioScheduler::new(Duration::from_secs(1));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let expire_tx = tx.clone();
        scheduler.start(
            2,
            Box::new(move |remaining| {
                let _ = tx.send(Some(remaining));
            }),
            Box::new(move || {
                let _ = expire_tx.send(None);
            }),
        );

        assert_eq!(rx.recv().await, Some(Some(1)));
        assert_eq!(rx.recv().await, Some(Some(0)));
        assert_eq!(rx.recv().await, Some(None));
    }
}
