//! crates/fitness_core/src/achievements.rs
//!
//! Achievement rules evaluated by the server after every progress write.

use crate::domain::{Item, Progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Achievement {
    FirstWorkout,
    FirstDay,
    Halfway,
    Finisher,
    ThreeDayStreak,
    WeekStreak,
    MonthStreak,
}

impl Achievement {
    pub const ALL: [Achievement; 7] = [
        Achievement::FirstWorkout,
        Achievement::FirstDay,
        Achievement::Halfway,
        Achievement::Finisher,
        Achievement::ThreeDayStreak,
        Achievement::WeekStreak,
        Achievement::MonthStreak,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Achievement::FirstWorkout => "first-workout",
            Achievement::FirstDay => "first-day",
            Achievement::Halfway => "halfway",
            Achievement::Finisher => "finisher",
            Achievement::ThreeDayStreak => "streak-3",
            Achievement::WeekStreak => "streak-7",
            Achievement::MonthStreak => "streak-30",
        }
    }

    fn is_met(self, progress: &Progress, item: &Item) -> bool {
        let done = &progress.completed_exercises;
        match self {
            Achievement::FirstWorkout => !done.is_empty(),
            Achievement::FirstDay => item.days.iter().any(|d| d.is_covered_by(done)),
            Achievement::Halfway => item.completion_percent(done) >= 50,
            Achievement::Finisher => item.is_covered_by(done),
            Achievement::ThreeDayStreak => progress.streak >= 3,
            Achievement::WeekStreak => progress.streak >= 7,
            Achievement::MonthStreak => progress.streak >= 30,
        }
    }
}

/// Adds every achievement whose rule now holds. Already unlocked
/// achievements are kept even if their rule no longer holds.
///
/// Returns the newly unlocked ones.
pub fn unlock(progress: &mut Progress, item: &Item) -> Vec<Achievement> {
    let mut unlocked = Vec::new();
    for achievement in Achievement::ALL {
        if achievement.is_met(progress, item)
            && progress.achievements.insert(achievement.as_str().to_string())
        {
            unlocked.push(achievement);
        }
    }
    unlocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::three_day_item;

    #[test]
    fn first_day_and_halfway_unlock_together() {
        let item = three_day_item();
        let mut progress = Progress::empty();
        progress.completed_exercises.insert("d1-a".to_string());
        assert_eq!(unlock(&mut progress, &item), vec![Achievement::FirstWorkout]);

        progress.completed_exercises.insert("d1-b".to_string());
        assert_eq!(
            unlock(&mut progress, &item),
            vec![Achievement::FirstDay, Achievement::Halfway]
        );
    }

    #[test]
    fn unlocked_achievements_are_sticky() {
        let item = three_day_item();
        let mut progress = Progress::empty();
        progress.completed_exercises.insert("d1-a".to_string());
        progress.streak = 3;
        unlock(&mut progress, &item);
        assert!(progress.achievements.contains("streak-3"));

        progress.streak = 1;
        progress.completed_exercises.clear();
        assert!(unlock(&mut progress, &item).is_empty());
        assert!(progress.achievements.contains("streak-3"));
        assert!(progress.achievements.contains("first-workout"));
    }
}
