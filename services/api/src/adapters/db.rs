//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ProgressRepository` port from the core crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::NaiveDate;
use fitness_core::domain::{Day, Item, ItemCompletion, ItemKind, Progress, TodayGoal};
use fitness_core::ports::{PortError, PortResult, ProgressRepository};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ProgressRepository` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ItemRecord {
    id: Uuid,
    kind: String,
    title: String,
    thumbnail: Option<String>,
    difficulty: Option<String>,
    duration_label: Option<String>,
    days: Json<Vec<Day>>,
}
impl ItemRecord {
    fn to_domain(self) -> PortResult<Item> {
        let kind = ItemKind::from_path_segment(&self.kind)
            .ok_or_else(|| PortError::Unexpected(format!("Unknown item kind '{}'", self.kind)))?;
        Ok(Item {
            id: self.id,
            kind,
            title: self.title,
            thumbnail: self.thumbnail,
            difficulty: self.difficulty,
            duration_label: self.duration_label,
            days: self.days.0,
        })
    }
}

#[derive(FromRow)]
struct ProgressRecord {
    completed_exercises: Vec<String>,
    streak: i32,
    last_completed_date: Option<NaiveDate>,
    achievements: Vec<String>,
}
impl ProgressRecord {
    fn to_domain(self) -> Progress {
        Progress {
            completed_exercises: self.completed_exercises.into_iter().collect(),
            streak: self.streak.max(0) as u32,
            last_completed_date: self.last_completed_date,
            achievements: self.achievements.into_iter().collect(),
        }
    }
}

#[derive(FromRow)]
struct TodayGoalRecord {
    id: Uuid,
    user_id: Uuid,
    text: String,
    completed: bool,
    goal_date: NaiveDate,
}
impl TodayGoalRecord {
    fn to_domain(self) -> TodayGoal {
        TodayGoal {
            id: self.id,
            user_id: self.user_id,
            text: self.text,
            completed: self.completed,
            date: self.goal_date,
        }
    }
}

const ITEM_COLUMNS: &str = "i.id, i.kind, i.title, i.thumbnail, i.difficulty, i.duration_label, i.days";
const GOAL_COLUMNS: &str = "id, user_id, text, completed, goal_date";

//=========================================================================================
// `ProgressRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProgressRepository for DbAdapter {
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        user_id.ok_or(PortError::Unauthorized)
    }

    async fn list_items_for_user(&self, user_id: Uuid, kind: ItemKind) -> PortResult<Vec<Item>> {
        let records = sqlx::query_as::<_, ItemRecord>(&format!(
            "SELECT {} FROM items i JOIN user_items u ON u.item_id = i.id \
             WHERE u.user_id = $1 AND i.kind = $2 ORDER BY u.assigned_at ASC",
            ITEM_COLUMNS
        ))
        .bind(user_id)
        .bind(kind.path_segment())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_assigned_item(&self, user_id: Uuid, kind: ItemKind, item_id: Uuid) -> PortResult<Item> {
        let record = sqlx::query_as::<_, ItemRecord>(&format!(
            "SELECT {} FROM items i JOIN user_items u ON u.item_id = i.id \
             WHERE i.id = $1 AND i.kind = $2 AND u.user_id = $3",
            ITEM_COLUMNS
        ))
        .bind(item_id)
        .bind(kind.path_segment())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("{} {} not found", kind, item_id)),
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn get_progress(&self, user_id: Uuid, item_id: Uuid) -> PortResult<Option<Progress>> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            "SELECT completed_exercises, streak, last_completed_date, achievements \
             FROM progress WHERE user_id = $1 AND item_id = $2",
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn ensure_progress(&self, user_id: Uuid, item_id: Uuid) -> PortResult<Progress> {
        sqlx::query(
            "INSERT INTO progress (user_id, item_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, item_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(item_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        self.get_progress(user_id, item_id)
            .await?
            .ok_or_else(|| PortError::Unexpected(format!("Progress for {} vanished after insert", item_id)))
    }

    async fn save_progress(&self, user_id: Uuid, item_id: Uuid, progress: &Progress) -> PortResult<()> {
        let completed: Vec<String> = progress.completed_exercises.iter().cloned().collect();
        let achievements: Vec<String> = progress.achievements.iter().cloned().collect();

        sqlx::query(
            "INSERT INTO progress (user_id, item_id, completed_exercises, streak, last_completed_date, achievements, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
             ON CONFLICT (user_id, item_id) DO UPDATE SET \
             completed_exercises = EXCLUDED.completed_exercises, \
             streak = EXCLUDED.streak, \
             last_completed_date = EXCLUDED.last_completed_date, \
             achievements = EXCLUDED.achievements, \
             updated_at = NOW()",
        )
        .bind(user_id)
        .bind(item_id)
        .bind(completed)
        .bind(progress.streak as i32)
        .bind(progress.last_completed_date)
        .bind(achievements)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn mark_item_complete(&self, completion: ItemCompletion) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO item_completions (user_id, item_id, completed_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, item_id) DO UPDATE SET completed_at = EXCLUDED.completed_at",
        )
        .bind(completion.user_id)
        .bind(completion.item_id)
        .bind(completion.completed_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_today_goals(&self, user_id: Uuid, date: NaiveDate) -> PortResult<Vec<TodayGoal>> {
        let records = sqlx::query_as::<_, TodayGoalRecord>(&format!(
            "SELECT {} FROM today_goals WHERE user_id = $1 AND goal_date = $2 ORDER BY created_at ASC, id ASC",
            GOAL_COLUMNS
        ))
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_today_goal(&self, goal: TodayGoal) -> PortResult<TodayGoal> {
        let record = sqlx::query_as::<_, TodayGoalRecord>(&format!(
            "INSERT INTO today_goals (id, user_id, text, completed, goal_date) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            GOAL_COLUMNS
        ))
        .bind(goal.id)
        .bind(goal.user_id)
        .bind(&goal.text)
        .bind(goal.completed)
        .bind(goal.date)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn set_today_goal_completed(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        completed: bool,
    ) -> PortResult<TodayGoal> {
        let record = sqlx::query_as::<_, TodayGoalRecord>(&format!(
            "UPDATE today_goals SET completed = $1 WHERE id = $2 AND user_id = $3 RETURNING {}",
            GOAL_COLUMNS
        ))
        .bind(completed)
        .bind(goal_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        record
            .map(|r| r.to_domain())
            .ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))
    }

    async fn delete_today_goal(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM today_goals WHERE id = $1 AND user_id = $2")
            .bind(goal_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Goal {} not found", goal_id)));
        }
        Ok(())
    }
}
