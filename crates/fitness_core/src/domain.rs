//! crates/fitness_core/src/domain.rs
//!
//! Defines the core data structures for programs, classes and challenges and
//! the per-user progress recorded against them.
//!
//! The wire shape (camelCase JSON) is shared by the REST server and the sync
//! client, so these types carry their serde attributes here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// The three kinds of top-level content a user can be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ItemKind {
    #[serde(rename = "programs")]
    Program,
    #[serde(rename = "classes")]
    Class,
    #[serde(rename = "challenges")]
    Challenge,
}

impl ItemKind {
    /// The URL segment used by the REST surface, e.g. `/api/classes/user`.
    pub fn path_segment(self) -> &'static str {
        match self {
            ItemKind::Program => "programs",
            ItemKind::Class => "classes",
            ItemKind::Challenge => "challenges",
        }
    }

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "programs" => Some(ItemKind::Program),
            "classes" => Some(ItemKind::Class),
            "challenges" => Some(ItemKind::Challenge),
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// How an exercise is measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExerciseMode {
    Time { duration: u32 },
    Reps { reps: u32, sets: u32 },
}

/// A single trackable unit inside a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    /// Stable key into `Progress::completed_exercises`.
    pub id: String,
    pub name: String,
    pub mode: ExerciseMode,
    #[serde(default)]
    pub calories: Option<u32>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Exercise {
    pub fn timed(id: &str, name: &str, duration: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            mode: ExerciseMode::Time { duration },
            calories: None,
            thumbnail: None,
            notes: None,
        }
    }

    pub fn reps(id: &str, name: &str, reps: u32, sets: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            mode: ExerciseMode::Reps { reps, sets },
            calories: None,
            thumbnail: None,
            notes: None,
        }
    }

    /// Seconds the countdown is seeded with.
    ///
    /// Rep-based exercises have no natural duration, so they are estimated as
    /// `reps * seconds_per_rep`.
    pub fn estimated_seconds(&self, seconds_per_rep: u32) -> u32 {
        match self.mode {
            ExerciseMode::Time { duration } => duration,
            ExerciseMode::Reps { reps, .. } => reps.saturating_mul(seconds_per_rep),
        }
    }
}

/// An ordered group of exercises. `index` is the 1-based day number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub title: String,
    pub index: u32,
    pub exercises: Vec<Exercise>,
}

impl Day {
    pub fn is_covered_by(&self, completed: &BTreeSet<String>) -> bool {
        !self.exercises.is_empty() && self.exercises.iter().all(|e| completed.contains(&e.id))
    }
}

/// A program, class or challenge: a titled collection of days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub kind: ItemKind,
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub duration_label: Option<String>,
    pub days: Vec<Day>,
}

impl Item {
    pub fn total_days(&self) -> usize {
        self.days.len()
    }

    pub fn exercise_ids(&self) -> BTreeSet<String> {
        self.days
            .iter()
            .flat_map(|d| d.exercises.iter().map(|e| e.id.clone()))
            .collect()
    }

    pub fn contains_exercise(&self, exercise_id: &str) -> bool {
        self.days
            .iter()
            .any(|d| d.exercises.iter().any(|e| e.id == exercise_id))
    }

    pub fn is_covered_by(&self, completed: &BTreeSet<String>) -> bool {
        let ids = self.exercise_ids();
        !ids.is_empty() && ids.iter().all(|id| completed.contains(id))
    }

    /// Whole-number percentage of the item's exercises found in `completed`.
    pub fn completion_percent(&self, completed: &BTreeSet<String>) -> u8 {
        let ids = self.exercise_ids();
        percent(ids.iter().filter(|id| completed.contains(*id)).count(), ids.len())
    }

    /// Same as [`Item::completion_percent`] restricted to one day.
    pub fn day_completion_percent(&self, day_index: usize, completed: &BTreeSet<String>) -> u8 {
        match self.days.get(day_index) {
            Some(day) => percent(
                day.exercises.iter().filter(|e| completed.contains(&e.id)).count(),
                day.exercises.len(),
            ),
            None => 0,
        }
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done * 100) / total) as u8
}

/// The per-user completion record for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub completed_exercises: BTreeSet<String>,
    pub streak: u32,
    pub last_completed_date: Option<NaiveDate>,
    pub achievements: BTreeSet<String>,
}

impl Progress {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, exercise_id: &str) -> bool {
        self.completed_exercises.contains(exercise_id)
    }
}

/// A small free-text goal for the user's current day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TodayGoal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub completed: bool,
    pub date: NaiveDate,
}

/// Records that a user finished an item as a whole.
#[derive(Debug, Clone)]
pub struct ItemCompletion {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// One day holding `A` (30s) and `B` (12 reps).
    pub fn single_day_item() -> Item {
        Item {
            id: Uuid::new_v4(),
            kind: ItemKind::Class,
            title: "Core Blast".to_string(),
            thumbnail: None,
            difficulty: Some("beginner".to_string()),
            duration_label: Some("15 min".to_string()),
            days: vec![Day {
                title: "Day 1".to_string(),
                index: 1,
                exercises: vec![Exercise::timed("A", "Plank", 30), Exercise::reps("B", "Crunches", 12, 3)],
            }],
        }
    }

    /// Three days; the middle one is a rest day with no exercises.
    pub fn three_day_item() -> Item {
        Item {
            id: Uuid::new_v4(),
            kind: ItemKind::Challenge,
            title: "30 Day Shred".to_string(),
            thumbnail: None,
            difficulty: None,
            duration_label: None,
            days: vec![
                Day {
                    title: "Day 1".to_string(),
                    index: 1,
                    exercises: vec![
                        Exercise::timed("d1-a", "Jumping jacks", 45),
                        Exercise::reps("d1-b", "Squats", 15, 3),
                    ],
                },
                Day {
                    title: "Rest".to_string(),
                    index: 2,
                    exercises: vec![],
                },
                Day {
                    title: "Day 3".to_string(),
                    index: 3,
                    exercises: vec![
                        Exercise::timed("d3-a", "Mountain climbers", 40),
                        Exercise::reps("d3-b", "Push-ups", 10, 3),
                    ],
                },
            ],
        }
    }
}
