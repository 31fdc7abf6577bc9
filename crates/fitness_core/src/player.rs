//! crates/fitness_core/src/player.rs
//!
//! The progress player shared by the programs, classes and challenges pages.
//!
//! A player owns the selection (item, day, exercise pointer), the progress view
//! for the selected item, the exercise timer and the queue of completions the
//! server has not acknowledged yet. It is parameterized by the `ProgressSync`
//! it reads and writes through, and can be driven either by calling its
//! methods directly or by handing it to [`ProgressPlayer::run`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{Exercise, Item, ItemKind, Progress};
use crate::ports::{Celebration, Notice, Notifier, PortError, ProgressSync};
use crate::queue::{CompletionQueue, SyncStatus};
use crate::scheduler::Scheduler;
use crate::timer::{Timer, TimerEvent, TimerState};

/// Tunables for a player instance.
#[derive(Debug, Clone, Copy)]
pub struct PlayerConfig {
    /// Seconds a rep-based exercise is budgeted per rep when seeding the timer.
    pub seconds_per_rep: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self { seconds_per_rep: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayerError {
    #[error("Unknown item: {0}")]
    UnknownItem(Uuid),
    #[error("No item is selected")]
    NoItemSelected,
    #[error("Day {0} is out of range")]
    DayOutOfRange(usize),
    #[error("Exercise {0} is out of range")]
    ExerciseOutOfRange(usize),
}

/// Progress as currently shown, plus whether it could be out of date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressView {
    pub progress: Progress,
    /// Set when the last fetch failed and the view came from the cache or
    /// an empty fallback.
    pub stale: bool,
}

/// A point-in-time copy of the player state, for renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub item_id: Option<Uuid>,
    pub day_index: usize,
    pub exercise_index: usize,
    pub exercise_id: Option<String>,
    pub timer_state: TimerState,
    pub remaining_secs: u32,
    pub day_percent: u8,
    pub item_percent: u8,
    pub streak: u32,
    pub stale: bool,
    pub pending: usize,
}

/// Commands accepted by [`ProgressPlayer::run`].
#[derive(Debug)]
pub enum PlayerCommand {
    LoadItems,
    Select(Uuid),
    SelectDay(usize),
    SelectExercise(usize),
    Start,
    TogglePause,
    CompleteCurrent,
    RepeatDay,
    RestartItem,
    FlushPending,
    Snapshot(oneshot::Sender<PlayerSnapshot>),
}

pub struct ProgressPlayer<S: ProgressSync + ?Sized> {
    kind: ItemKind,
    sync: Arc<S>,
    scheduler: Arc<dyn Scheduler>,
    notifier: Arc<dyn Notifier>,
    config: PlayerConfig,

    items: Vec<Item>,
    current: Option<usize>,
    day_index: usize,
    exercise_index: usize,

    view: ProgressView,
    last_known_good: HashMap<Uuid, Progress>,
    queue: CompletionQueue,

    timer: Timer,
    events_tx: mpsc::UnboundedSender<TimerEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<TimerEvent>>,
}

impl<S: ProgressSync + ?Sized> ProgressPlayer<S> {
    pub fn new(
        kind: ItemKind,
        sync: Arc<S>,
        scheduler: Arc<dyn Scheduler>,
        notifier: Arc<dyn Notifier>,
        config: PlayerConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            kind,
            sync,
            scheduler,
            notifier,
            config,
            items: Vec::new(),
            current: None,
            day_index: 0,
            exercise_index: 0,
            view: ProgressView::default(),
            last_known_good: HashMap::new(),
            queue: CompletionQueue::new(),
            timer: Timer::new(),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    //=====================================================================================
    // Read access
    //=====================================================================================

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.current.and_then(|i| self.items.get(i))
    }

    pub fn day_index(&self) -> usize {
        self.day_index
    }

    pub fn exercise_index(&self) -> usize {
        self.exercise_index
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.current_item()?
            .days
            .get(self.day_index)?
            .exercises
            .get(self.exercise_index)
    }

    pub fn progress(&self) -> &Progress {
        &self.view.progress
    }

    pub fn is_stale(&self) -> bool {
        self.view.stale
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.timer.remaining_secs()
    }

    pub fn day_percent(&self) -> u8 {
        self.current_item()
            .map(|item| item.day_completion_percent(self.day_index, &self.view.progress.completed_exercises))
            .unwrap_or(0)
    }

    pub fn item_percent(&self) -> u8 {
        self.current_item()
            .map(|item| item.completion_percent(&self.view.progress.completed_exercises))
            .unwrap_or(0)
    }

    /// Sync state of a completion in the selected item, if it was made locally.
    pub fn sync_status(&self, exercise_id: &str) -> Option<SyncStatus> {
        let item_id = self.current_item()?.id;
        self.queue.status(item_id, exercise_id)
    }

    /// Completions and item marks the server has not acknowledged yet.
    pub fn pending_count(&self) -> usize {
        self.queue.pending().len() + self.queue.pending_item_marks().len()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            item_id: self.current_item().map(|i| i.id),
            day_index: self.day_index,
            exercise_index: self.exercise_index,
            exercise_id: self.current_exercise().map(|e| e.id.clone()),
            timer_state: self.timer.state(),
            remaining_secs: self.timer.remaining_secs(),
            day_percent: self.day_percent(),
            item_percent: self.item_percent(),
            streak: self.view.progress.streak,
            stale: self.view.stale,
            pending: self.pending_count(),
        }
    }

    //=====================================================================================
    // Selection
    //=====================================================================================

    /// Loads the user's items. A failed load leaves an empty list.
    pub async fn load_items(&mut self) {
        self.timer.cancel();
        self.current = None;
        self.day_index = 0;
        self.exercise_index = 0;
        self.view = ProgressView::default();

        match self.sync.fetch_items(self.kind).await {
            Ok(items) => {
                info!("Loaded {} {}", items.len(), self.kind);
                self.items = items;
            }
            Err(e) => {
                self.items.clear();
                self.warn(format!("Could not load {}: {}", self.kind, e));
            }
        }
        self.reseed_timer();
    }

    /// Makes `item_id` current and replaces the progress view with a fresh fetch.
    pub async fn select(&mut self, item_id: Uuid) -> Result<(), PlayerError> {
        let index = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(PlayerError::UnknownItem(item_id))?;

        self.timer.cancel();
        self.current = Some(index);
        self.day_index = 0;
        self.exercise_index = 0;

        match self.sync.fetch_progress(self.kind, item_id).await {
            Ok(progress) => {
                self.last_known_good.insert(item_id, progress.clone());
                self.adopt(progress, false);
            }
            Err(e) => {
                let fallback = self.last_known_good.get(&item_id).cloned().unwrap_or_default();
                self.adopt(fallback, true);
                self.warn(format!("Could not load progress, showing last saved state: {}", e));
            }
        }

        self.reseed_timer();
        Ok(())
    }

    pub fn select_day(&mut self, day_index: usize) -> Result<(), PlayerError> {
        let item = self.current_item().ok_or(PlayerError::NoItemSelected)?;
        if day_index >= item.days.len() {
            return Err(PlayerError::DayOutOfRange(day_index));
        }
        self.day_index = day_index;
        self.exercise_index = 0;
        self.reseed_timer();
        Ok(())
    }

    pub fn select_exercise(&mut self, exercise_index: usize) -> Result<(), PlayerError> {
        let item = self.current_item().ok_or(PlayerError::NoItemSelected)?;
        let in_range = item
            .days
            .get(self.day_index)
            .map_or(false, |d| exercise_index < d.exercises.len());
        if !in_range {
            return Err(PlayerError::ExerciseOutOfRange(exercise_index));
        }
        self.exercise_index = exercise_index;
        self.reseed_timer();
        Ok(())
    }

    //=====================================================================================
    // Timer
    //=====================================================================================

    pub fn start(&mut self) -> Result<(), PlayerError> {
        self.require_exercise()?;
        self.timer.start(self.scheduler.as_ref(), &self.events_tx);
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<(), PlayerError> {
        self.require_exercise()?;
        self.timer.toggle(self.scheduler.as_ref(), &self.events_tx);
        Ok(())
    }

    /// Applies one scheduler event. Expiry runs the completion routine.
    pub async fn handle_timer_event(&mut self, event: TimerEvent) {
        if self.timer.apply(event) {
            debug!("Timer expired");
            if let Err(e) = self.complete_current().await {
                warn!("Timer expired without a completable exercise: {}", e);
            }
        }
    }

    /// Handles every scheduler event queued so far.
    ///
    /// Only useful when the player is driven directly; [`ProgressPlayer::run`]
    /// consumes events itself.
    pub async fn pump_timer_events(&mut self) {
        loop {
            let event = match self.events_rx.as_mut().map(|rx| rx.try_recv()) {
                Some(Ok(event)) => event,
                _ => break,
            };
            self.handle_timer_event(event).await;
        }
    }

    //=====================================================================================
    // Completion
    //=====================================================================================

    /// Marks the exercise under the pointer complete and moves the pointer on.
    pub async fn complete_current(&mut self) -> Result<(), PlayerError> {
        let (item_id, exercise_id) = {
            let item = self.current_item().ok_or(PlayerError::NoItemSelected)?;
            let exercise = self
                .current_exercise()
                .ok_or(PlayerError::ExerciseOutOfRange(self.exercise_index))?;
            (item.id, exercise.id.clone())
        };
        self.timer.cancel();

        if self.view.progress.is_completed(&exercise_id) {
            debug!("Exercise {} already completed", exercise_id);
            self.advance();
            self.reseed_timer();
            return Ok(());
        }

        let day_was_covered = self.day_covered();
        let item_was_covered = self.item_covered();

        self.view.progress.completed_exercises.insert(exercise_id.clone());
        self.queue.enqueue(item_id, &exercise_id);

        match self.sync.post_completion(self.kind, item_id, &exercise_id).await {
            Ok(server) => {
                self.queue.confirm(item_id, &exercise_id);
                self.last_known_good.insert(item_id, server.clone());
                self.adopt(server, false);
            }
            Err(e) => {
                self.queue.record_failure(item_id, &exercise_id);
                self.warn(format!("Progress not saved yet, will retry: {}", e));
            }
        }

        if self.item_covered() && !item_was_covered {
            self.notifier.notify(Notice::Celebration(Celebration::ItemComplete));
            if let Err(e) = self.sync.mark_item_complete(self.kind, item_id).await {
                self.queue.defer_item_mark(item_id);
                self.warn(format!("Could not mark {} complete, will retry: {}", item_id, e));
            }
        } else if self.day_covered() && !day_was_covered {
            self.notifier.notify(Notice::Celebration(Celebration::DayComplete {
                day_index: self.day_index,
            }));
        }

        self.advance();
        self.reseed_timer();
        Ok(())
    }

    /// Clears the current day's completions and persists the reduced set.
    pub async fn repeat_day(&mut self) -> Result<(), PlayerError> {
        let (item_id, day_ids) = {
            let item = self.current_item().ok_or(PlayerError::NoItemSelected)?;
            let day = item
                .days
                .get(self.day_index)
                .ok_or(PlayerError::DayOutOfRange(self.day_index))?;
            let ids: BTreeSet<String> = day.exercises.iter().map(|e| e.id.clone()).collect();
            (item.id, ids)
        };
        self.timer.cancel();

        self.view
            .progress
            .completed_exercises
            .retain(|id| !day_ids.contains(id));
        self.queue.discard(item_id, &day_ids);

        let remaining: Vec<String> = self.view.progress.completed_exercises.iter().cloned().collect();
        match self.sync.post_bulk(self.kind, item_id, &remaining).await {
            Ok(()) => {
                // The overwrite carried every pending id of this item with it.
                for id in self.queue.pending_ids_for(item_id) {
                    self.queue.confirm(item_id, &id);
                }
                self.last_known_good.insert(item_id, self.view.progress.clone());
                info!("Repeated day {} of {}", self.day_index + 1, item_id);
            }
            Err(e) => self.warn(format!("Could not reset the day: {}", e)),
        }

        self.exercise_index = 0;
        self.reseed_timer();
        Ok(())
    }

    /// Wipes all progress for the current item.
    pub async fn restart_item(&mut self) -> Result<(), PlayerError> {
        let item_id = self.current_item().ok_or(PlayerError::NoItemSelected)?.id;
        self.timer.cancel();

        self.view.progress = Progress::empty();
        self.queue.discard_item(item_id);

        match self.sync.post_bulk(self.kind, item_id, &[]).await {
            Ok(()) => {
                self.last_known_good.insert(item_id, Progress::empty());
                info!("Restarted {}", item_id);
            }
            Err(e) => self.warn(format!("Could not restart: {}", e)),
        }

        self.day_index = 0;
        self.exercise_index = 0;
        self.reseed_timer();
        Ok(())
    }

    /// Replays every pending completion, then every deferred item mark.
    /// Returns how many of them the server accepted.
    pub async fn flush_pending(&mut self) -> usize {
        let pending = self.queue.pending();
        let marks = self.queue.pending_item_marks();
        let total = pending.len() + marks.len();
        let mut delivered = 0;

        for (item_id, exercise_id) in &pending {
            match self.sync.post_completion(self.kind, *item_id, exercise_id).await {
                Ok(server) => {
                    self.queue.confirm(*item_id, exercise_id);
                    self.last_known_good.insert(*item_id, server.clone());
                    if self.current_item().map(|i| i.id) == Some(*item_id) {
                        self.adopt(server, false);
                    }
                    delivered += 1;
                }
                Err(PortError::Invalid(reason)) => {
                    warn!("Dropping completion {} the server rejected: {}", exercise_id, reason);
                    let ids: BTreeSet<String> = [exercise_id.clone()].into_iter().collect();
                    self.queue.discard(*item_id, &ids);
                }
                Err(e) => {
                    self.queue.record_failure(*item_id, exercise_id);
                    warn!(
                        "Replay of {} failed after {} attempts: {}",
                        exercise_id,
                        self.queue.attempts(*item_id, exercise_id),
                        e
                    );
                }
            }
        }

        for item_id in marks {
            match self.sync.mark_item_complete(self.kind, item_id).await {
                Ok(()) => {
                    self.queue.confirm_item_mark(item_id);
                    info!("Delivered deferred completion mark for {}", item_id);
                    delivered += 1;
                }
                Err(e) => warn!("Replay of the completion mark for {} failed: {}", item_id, e),
            }
        }

        if delivered < total {
            self.warn(format!(
                "{} of {} changes still not saved",
                total - delivered,
                total
            ));
        }
        delivered
    }

    //=====================================================================================
    // Command loop
    //=====================================================================================

    /// Drives the player from `commands` and its own timer events until
    /// `shutdown` fires or the command channel closes. Returns the player.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<PlayerCommand>,
        shutdown: CancellationToken,
    ) -> Self {
        let Some(mut events) = self.events_rx.take() else {
            warn!("Player loop is already running");
            return self;
        };
        info!("Player loop started for {}", self.kind);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                Some(event) = events.recv() => self.handle_timer_event(event).await,
                command = commands.recv() => match command {
                    Some(command) => self.execute(command).await,
                    None => break,
                },
            }
        }

        self.timer.cancel();
        self.events_rx = Some(events);
        info!("Player loop stopped");
        self
    }

    async fn execute(&mut self, command: PlayerCommand) {
        let result = match command {
            PlayerCommand::LoadItems => {
                self.load_items().await;
                Ok(())
            }
            PlayerCommand::Select(item_id) => self.select(item_id).await,
            PlayerCommand::SelectDay(day) => self.select_day(day),
            PlayerCommand::SelectExercise(exercise) => self.select_exercise(exercise),
            PlayerCommand::Start => self.start(),
            PlayerCommand::TogglePause => self.toggle_pause(),
            PlayerCommand::CompleteCurrent => self.complete_current().await,
            PlayerCommand::RepeatDay => self.repeat_day().await,
            PlayerCommand::RestartItem => self.restart_item().await,
            PlayerCommand::FlushPending => {
                self.flush_pending().await;
                Ok(())
            }
            PlayerCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
                Ok(())
            }
        };
        if let Err(e) = result {
            self.warn(e.to_string());
        }
    }

    //=====================================================================================
    // Helpers
    //=====================================================================================

    /// Installs `progress` as the view, clipped to the current item's
    /// exercises, with still-pending local completions laid on top.
    fn adopt(&mut self, mut progress: Progress, stale: bool) {
        if let Some(item) = self.current_item() {
            progress
                .completed_exercises
                .retain(|id| item.contains_exercise(id));
            progress
                .completed_exercises
                .extend(self.queue.pending_ids_for(item.id));
        }
        self.view = ProgressView { progress, stale };
    }

    /// Moves to the next pending exercise of the day, else to the first
    /// exercise of the next non-empty day, else stays put.
    fn advance(&mut self) {
        let Some(item) = self.current_item() else {
            return;
        };
        let done = &self.view.progress.completed_exercises;

        if let Some(day) = item.days.get(self.day_index) {
            let len = day.exercises.len();
            let next = (self.exercise_index + 1..len)
                .chain(0..self.exercise_index.min(len))
                .find(|&i| !done.contains(&day.exercises[i].id));
            if let Some(next) = next {
                self.exercise_index = next;
                return;
            }
        }

        let next_day = (self.day_index + 1..item.days.len()).find(|&d| !item.days[d].exercises.is_empty());
        if let Some(next_day) = next_day {
            self.day_index = next_day;
            self.exercise_index = 0;
        }
    }

    fn reseed_timer(&mut self) {
        let secs = self
            .current_exercise()
            .map(|e| e.estimated_seconds(self.config.seconds_per_rep))
            .unwrap_or(0);
        self.timer.seed(secs);
    }

    fn day_covered(&self) -> bool {
        self.current_item()
            .and_then(|item| item.days.get(self.day_index))
            .map_or(false, |day| day.is_covered_by(&self.view.progress.completed_exercises))
    }

    fn item_covered(&self) -> bool {
        self.current_item()
            .map_or(false, |item| item.is_covered_by(&self.view.progress.completed_exercises))
    }

    fn require_exercise(&self) -> Result<(), PlayerError> {
        self.current_item().ok_or(PlayerError::NoItemSelected)?;
        self.current_exercise()
            .map(|_| ())
            .ok_or(PlayerError::ExerciseOutOfRange(self.exercise_index))
    }

    fn warn(&self, message: String) {
        warn!("{}", message);
        self.notifier.notify(Notice::Warning(message));
    }
}
