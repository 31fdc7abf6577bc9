//! services/api/src/adapters/memory.rs
//!
//! An in-process `ProgressRepository` used by the integration tests and for
//! running the server without Postgres.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fitness_core::domain::{Item, ItemCompletion, ItemKind, Progress, TodayGoal};
use fitness_core::ports::{PortError, PortResult, ProgressRepository};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Store {
    sessions: HashMap<String, Uuid>,
    items: HashMap<Uuid, Item>,
    assignments: Vec<(Uuid, Uuid)>,
    progress: HashMap<(Uuid, Uuid), Progress>,
    completions: HashMap<(Uuid, Uuid), ItemCompletion>,
    goals: Vec<TodayGoal>,
}

#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_session(&self, session_id: &str, user_id: Uuid) {
        self.store
            .write()
            .await
            .sessions
            .insert(session_id.to_string(), user_id);
    }

    pub async fn insert_item(&self, item: Item) {
        self.store.write().await.items.insert(item.id, item);
    }

    /// Makes `item_id` show up in the user's item list.
    pub async fn assign(&self, user_id: Uuid, item_id: Uuid) {
        let mut store = self.store.write().await;
        if !store.assignments.contains(&(user_id, item_id)) {
            store.assignments.push((user_id, item_id));
        }
    }

    pub async fn item_completed_at(&self, user_id: Uuid, item_id: Uuid) -> Option<DateTime<Utc>> {
        self.store
            .read()
            .await
            .completions
            .get(&(user_id, item_id))
            .map(|c| c.completed_at)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.store
            .read()
            .await
            .sessions
            .get(session_id)
            .copied()
            .ok_or(PortError::Unauthorized)
    }

    async fn list_items_for_user(&self, user_id: Uuid, kind: ItemKind) -> PortResult<Vec<Item>> {
        let store = self.store.read().await;
        Ok(store
            .assignments
            .iter()
            .filter(|(user, _)| *user == user_id)
            .filter_map(|(_, item_id)| store.items.get(item_id))
            .filter(|item| item.kind == kind)
            .cloned()
            .collect())
    }

    async fn get_assigned_item(&self, user_id: Uuid, kind: ItemKind, item_id: Uuid) -> PortResult<Item> {
        let store = self.store.read().await;
        store
            .items
            .get(&item_id)
            .filter(|item| item.kind == kind)
            .filter(|_| store.assignments.contains(&(user_id, item_id)))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("{} {} not found", kind, item_id)))
    }

    async fn get_progress(&self, user_id: Uuid, item_id: Uuid) -> PortResult<Option<Progress>> {
        Ok(self.store.read().await.progress.get(&(user_id, item_id)).cloned())
    }

    async fn ensure_progress(&self, user_id: Uuid, item_id: Uuid) -> PortResult<Progress> {
        Ok(self
            .store
            .write()
            .await
            .progress
            .entry((user_id, item_id))
            .or_default()
            .clone())
    }

    async fn save_progress(&self, user_id: Uuid, item_id: Uuid, progress: &Progress) -> PortResult<()> {
        self.store
            .write()
            .await
            .progress
            .insert((user_id, item_id), progress.clone());
        Ok(())
    }

    async fn mark_item_complete(&self, completion: ItemCompletion) -> PortResult<()> {
        self.store
            .write()
            .await
            .completions
            .insert((completion.user_id, completion.item_id), completion);
        Ok(())
    }

    async fn list_today_goals(&self, user_id: Uuid, date: NaiveDate) -> PortResult<Vec<TodayGoal>> {
        Ok(self
            .store
            .read()
            .await
            .goals
            .iter()
            .filter(|g| g.user_id == user_id && g.date == date)
            .cloned()
            .collect())
    }

    async fn create_today_goal(&self, goal: TodayGoal) -> PortResult<TodayGoal> {
        self.store.write().await.goals.push(goal.clone());
        Ok(goal)
    }

    async fn set_today_goal_completed(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        completed: bool,
    ) -> PortResult<TodayGoal> {
        let mut store = self.store.write().await;
        let goal = store
            .goals
            .iter_mut()
            .find(|g| g.id == goal_id && g.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Goal {} not found", goal_id)))?;
        goal.completed = completed;
        Ok(goal.clone())
    }

    async fn delete_today_goal(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<()> {
        let mut store = self.store.write().await;
        let before = store.goals.len();
        store.goals.retain(|g| !(g.id == goal_id && g.user_id == user_id));
        if store.goals.len() == before {
            return Err(PortError::NotFound(format!("Goal {} not found", goal_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitness_core::domain::{Day, Exercise};

    fn item() -> Item {
        Item {
            id: Uuid::new_v4(),
            kind: ItemKind::Class,
            title: "Mobility".to_string(),
            thumbnail: None,
            difficulty: None,
            duration_label: None,
            days: vec![Day {
                title: "Day 1".to_string(),
                index: 1,
                exercises: vec![Exercise::timed("A", "Stretch", 30)],
            }],
        }
    }

    #[tokio::test]
    async fn ensure_progress_keeps_a_record_written_after_the_first_read() {
        let repo = InMemoryRepository::new();
        let (user, item) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(repo.get_progress(user, item).await.unwrap().is_none());

        // A completion lands between the read above and the lazy insert.
        let mut saved = Progress::empty();
        saved.completed_exercises.insert("A".to_string());
        saved.streak = 1;
        repo.save_progress(user, item, &saved).await.unwrap();

        assert_eq!(repo.ensure_progress(user, item).await.unwrap(), saved);
        assert_eq!(repo.get_progress(user, item).await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn unassigned_items_are_not_found() {
        let repo = InMemoryRepository::new();
        let (owner, stranger) = (Uuid::new_v4(), Uuid::new_v4());
        let item = item();
        repo.insert_item(item.clone()).await;
        repo.assign(owner, item.id).await;

        assert!(repo.get_assigned_item(owner, ItemKind::Class, item.id).await.is_ok());
        assert!(matches!(
            repo.get_assigned_item(stranger, ItemKind::Class, item.id).await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            repo.get_assigned_item(owner, ItemKind::Program, item.id).await,
            Err(PortError::NotFound(_))
        ));
    }
}
