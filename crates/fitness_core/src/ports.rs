//! crates/fitness_core/src/ports.rs
//!
//! Defines the service contracts (traits) at the edges of the core.
//! The player only talks to the outside world through `ProgressSync`,
//! `Scheduler` (see `scheduler.rs`) and `Notifier`; the server talks to its
//! storage through `ProgressRepository`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{Item, ItemCompletion, ItemKind, Progress, TodayGoal};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    Invalid(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Client-side Ports
//=========================================================================================

/// The HTTP surface the player reads from and writes to.
#[async_trait]
pub trait ProgressSync: Send + Sync {
    async fn fetch_items(&self, kind: ItemKind) -> PortResult<Vec<Item>>;

    async fn fetch_progress(&self, kind: ItemKind, item_id: Uuid) -> PortResult<Progress>;

    /// Records one completed exercise. The returned progress is authoritative.
    async fn post_completion(
        &self,
        kind: ItemKind,
        item_id: Uuid,
        exercise_id: &str,
    ) -> PortResult<Progress>;

    /// Overwrites the completion set. An empty set restarts the item.
    async fn post_bulk(&self, kind: ItemKind, item_id: Uuid, completed: &[String]) -> PortResult<()>;

    async fn mark_item_complete(&self, kind: ItemKind, item_id: Uuid) -> PortResult<()>;
}

/// Which completion milestone was just reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Celebration {
    DayComplete { day_index: usize },
    ItemComplete,
}

/// User-visible side effects raised by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Warning(String),
    Celebration(Celebration),
}

/// Receives notices (toasts, confetti) from the player.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Default notifier: writes every notice to the tracing log.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Warning(message) => tracing::warn!("{}", message),
            Notice::Celebration(c) => tracing::info!("Celebration: {:?}", c),
        }
    }
}

//=========================================================================================
// Server-side Ports
//=========================================================================================

/// Source of "today" for streak bookkeeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Storage for items, progress and today goals.
///
/// Writes are last-write-wins; there is no version check.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    // --- Sessions ---
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    // --- Catalog ---
    async fn list_items_for_user(&self, user_id: Uuid, kind: ItemKind) -> PortResult<Vec<Item>>;

    /// Fetches an item of `kind` that is assigned to `user_id`. Items that
    /// exist but belong to someone else are reported as `NotFound`.
    async fn get_assigned_item(&self, user_id: Uuid, kind: ItemKind, item_id: Uuid) -> PortResult<Item>;

    // --- Progress ---
    async fn get_progress(&self, user_id: Uuid, item_id: Uuid) -> PortResult<Option<Progress>>;

    /// Returns the stored progress, inserting an empty record if none exists.
    /// Never overwrites an existing record.
    async fn ensure_progress(&self, user_id: Uuid, item_id: Uuid) -> PortResult<Progress>;

    async fn save_progress(&self, user_id: Uuid, item_id: Uuid, progress: &Progress) -> PortResult<()>;

    async fn mark_item_complete(&self, completion: ItemCompletion) -> PortResult<()>;

    // --- Today goals ---
    async fn list_today_goals(&self, user_id: Uuid, date: NaiveDate) -> PortResult<Vec<TodayGoal>>;

    async fn create_today_goal(&self, goal: TodayGoal) -> PortResult<TodayGoal>;

    async fn set_today_goal_completed(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        completed: bool,
    ) -> PortResult<TodayGoal>;

    async fn delete_today_goal(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<()>;
}
