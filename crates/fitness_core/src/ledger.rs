//! crates/fitness_core/src/ledger.rs
//!
//! The authoritative progress rules applied by the server: which ids may be
//! recorded, how the streak moves, and when achievements unlock.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::achievements;
use crate::domain::{Item, Progress};
use crate::ports::{PortError, PortResult};

/// What a single completion did to the stored progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Recorded,
    AlreadyCompleted,
}

/// Records one completed exercise for `today`.
///
/// Ids that do not belong to `item` are rejected so the completion set always
/// stays a subset of the item's exercises. Re-recording an id is a no-op.
pub fn record_completion(
    progress: &mut Progress,
    item: &Item,
    exercise_id: &str,
    today: NaiveDate,
) -> PortResult<CompletionOutcome> {
    if !item.contains_exercise(exercise_id) {
        return Err(PortError::Invalid(format!(
            "Exercise {} does not belong to item {}",
            exercise_id, item.id
        )));
    }

    if !progress.completed_exercises.insert(exercise_id.to_string()) {
        return Ok(CompletionOutcome::AlreadyCompleted);
    }

    advance_streak(progress, today);
    achievements::unlock(progress, item);
    Ok(CompletionOutcome::Recorded)
}

/// Replaces the completion set wholesale, as used by "repeat day" and
/// "restart".
///
/// An empty set is a restart: streak, last completion date and achievements
/// are cleared too. A non-empty set keeps the streak.
pub fn overwrite_completed(progress: &mut Progress, item: &Item, completed: &[String]) -> PortResult<()> {
    if let Some(unknown) = completed.iter().find(|id| !item.contains_exercise(id)) {
        return Err(PortError::Invalid(format!(
            "Exercise {} does not belong to item {}",
            unknown, item.id
        )));
    }

    let ids: BTreeSet<String> = completed.iter().cloned().collect();
    if ids.is_empty() {
        *progress = Progress::empty();
        return Ok(());
    }

    progress.completed_exercises = ids;
    achievements::unlock(progress, item);
    Ok(())
}

/// Streak counts consecutive calendar days with at least one completion.
fn advance_streak(progress: &mut Progress, today: NaiveDate) {
    progress.streak = match progress.last_completed_date {
        Some(last) if last == today => progress.streak.max(1),
        Some(last) if last.succ_opt() == Some(today) => progress.streak + 1,
        // Completions dated before the last one leave the streak alone.
        Some(last) if last > today => progress.streak.max(1),
        _ => 1,
    };
    if progress.last_completed_date.map_or(true, |last| last < today) {
        progress.last_completed_date = Some(today);
    }
}
