//! services/api/src/web/protocol.rs
//!
//! Request bodies shared by the REST handlers and the sync client.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Records one completed exercise.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteExerciseRequest {
    pub item_id: Uuid,
    pub completed_exercise_id: String,
}

/// Overwrites the whole completion set. An empty list restarts the item.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkProgressRequest {
    pub item_id: Uuid,
    pub completed_exercises: Vec<String>,
}

/// Body of `POST /api/{kind}/progress`: either shape is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ProgressUpdateRequest {
    Single(CompleteExerciseRequest),
    Bulk(BulkProgressRequest),
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateGoalRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateGoalRequest {
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_progress_shapes_deserialize() {
        let item = Uuid::new_v4();
        let single: ProgressUpdateRequest = serde_json::from_value(serde_json::json!({
            "itemId": item,
            "completedExerciseId": "A"
        }))
        .unwrap();
        assert!(matches!(single, ProgressUpdateRequest::Single(r) if r.completed_exercise_id == "A"));

        let bulk: ProgressUpdateRequest = serde_json::from_value(serde_json::json!({
            "itemId": item,
            "completedExercises": []
        }))
        .unwrap();
        assert!(matches!(bulk, ProgressUpdateRequest::Bulk(r) if r.completed_exercises.is_empty()));
    }
}
