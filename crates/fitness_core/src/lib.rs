pub mod achievements;
pub mod domain;
pub mod ledger;
pub mod player;
pub mod ports;
pub mod queue;
pub mod scheduler;
pub mod timer;

pub use domain::{Day, Exercise, ExerciseMode, Item, ItemCompletion, ItemKind, Progress, TodayGoal};
pub use player::{PlayerCommand, PlayerConfig, PlayerError, PlayerSnapshot, ProgressPlayer, ProgressView};
pub use ports::{
    Celebration, Clock, Notice, Notifier, PortError, PortResult, ProgressRepository, ProgressSync,
    SystemClock, TracingNotifier,
};
pub use queue::{CompletionQueue, SyncStatus};
pub use scheduler::{ManualScheduler, Scheduler, TokioScheduler};
pub use timer::{Timer, TimerState};
