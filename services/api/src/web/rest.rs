//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the progress REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::protocol::{
    BulkProgressRequest, CompleteExerciseRequest, CreateGoalRequest, ProgressUpdateRequest,
    UpdateGoalRequest,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use fitness_core::domain::{
    Day, Exercise, ExerciseMode, Item, ItemCompletion, ItemKind, Progress, TodayGoal,
};
use fitness_core::ledger::{self, CompletionOutcome};
use fitness_core::ports::PortError;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_items_handler,
        get_progress_handler,
        post_progress_handler,
        complete_item_handler,
        list_goals_handler,
        create_goal_handler,
        update_goal_handler,
        delete_goal_handler,
    ),
    components(
        schemas(
            Item, Day, Exercise, ExerciseMode, ItemKind, Progress, TodayGoal,
            ProgressUpdateRequest, CompleteExerciseRequest, BulkProgressRequest,
            CreateGoalRequest, UpdateGoalRequest,
        )
    ),
    tags(
        (name = "Fitness Progress API", description = "Workout progress for programs, classes and challenges.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Items and Progress
//=========================================================================================

/// List the items of one kind assigned to the current user.
#[utoipa::path(
    get,
    path = "/api/{kind}/user",
    params(("kind" = ItemKind, Path, description = "programs, classes or challenges")),
    responses(
        (status = 200, description = "Assigned items with their days and exercises", body = [Item]),
        (status = 401, description = "Missing or invalid session")
    )
)]
pub async fn list_items_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(kind): Path<ItemKind>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state.repo.list_items_for_user(user_id, kind).await?;
    Ok(Json(items))
}

/// Read the user's progress for an item, creating an empty record on first access.
#[utoipa::path(
    get,
    path = "/api/{kind}/{item_id}/progress",
    params(
        ("kind" = ItemKind, Path, description = "programs, classes or challenges"),
        ("item_id" = Uuid, Path, description = "The item id")
    ),
    responses(
        (status = 200, description = "Current progress", body = Progress),
        (status = 404, description = "Unknown item or not assigned to the user")
    )
)]
pub async fn get_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path((kind, item_id)): Path<(ItemKind, Uuid)>,
) -> Result<Json<Progress>, ApiError> {
    state.repo.get_assigned_item(user_id, kind, item_id).await?;
    let progress = state.repo.ensure_progress(user_id, item_id).await?;
    Ok(Json(progress))
}

/// Record a completed exercise, or overwrite the completion set.
#[utoipa::path(
    post,
    path = "/api/{kind}/progress",
    params(("kind" = ItemKind, Path, description = "programs, classes or challenges")),
    request_body = ProgressUpdateRequest,
    responses(
        (status = 200, description = "Updated progress", body = Progress),
        (status = 400, description = "Exercise does not belong to the item"),
        (status = 404, description = "Unknown item")
    )
)]
pub async fn post_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(kind): Path<ItemKind>,
    Json(body): Json<ProgressUpdateRequest>,
) -> Result<Json<Progress>, ApiError> {
    let item_id = match &body {
        ProgressUpdateRequest::Single(req) => req.item_id,
        ProgressUpdateRequest::Bulk(req) => req.item_id,
    };
    let item = state.repo.get_assigned_item(user_id, kind, item_id).await?;
    let mut progress = state
        .repo
        .get_progress(user_id, item_id)
        .await?
        .unwrap_or_default();

    match body {
        ProgressUpdateRequest::Single(req) => {
            let outcome = ledger::record_completion(
                &mut progress,
                &item,
                &req.completed_exercise_id,
                state.clock.today(),
            )?;
            if outcome == CompletionOutcome::AlreadyCompleted {
                return Ok(Json(progress));
            }
            info!(
                "User {} completed {} in {} (streak {})",
                user_id, req.completed_exercise_id, item_id, progress.streak
            );
        }
        ProgressUpdateRequest::Bulk(req) => {
            ledger::overwrite_completed(&mut progress, &item, &req.completed_exercises)?;
            info!(
                "User {} overwrote progress for {} with {} exercises",
                user_id,
                item_id,
                req.completed_exercises.len()
            );
        }
    }

    state.repo.save_progress(user_id, item_id, &progress).await?;
    Ok(Json(progress))
}

/// Mark a whole item as completed.
#[utoipa::path(
    patch,
    path = "/api/{kind}/{item_id}/complete",
    params(
        ("kind" = ItemKind, Path, description = "programs, classes or challenges"),
        ("item_id" = Uuid, Path, description = "The item id")
    ),
    responses(
        (status = 204, description = "Marked complete"),
        (status = 404, description = "Unknown item")
    )
)]
pub async fn complete_item_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path((kind, item_id)): Path<(ItemKind, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.repo.get_assigned_item(user_id, kind, item_id).await?;
    state
        .repo
        .mark_item_complete(ItemCompletion {
            user_id,
            item_id,
            completed_at: state.clock.now(),
        })
        .await?;
    info!("User {} finished {}", user_id, item_id);
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Today Goals
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/goals/today",
    responses((status = 200, description = "Goals for today", body = [TodayGoal]))
)]
pub async fn list_goals_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<TodayGoal>>, ApiError> {
    let goals = state
        .repo
        .list_today_goals(user_id, state.clock.today())
        .await?;
    Ok(Json(goals))
}

#[utoipa::path(
    post,
    path = "/api/goals/today",
    request_body = CreateGoalRequest,
    responses(
        (status = 201, description = "Goal created", body = TodayGoal),
        (status = 400, description = "Empty goal text")
    )
)]
pub async fn create_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateGoalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(PortError::Invalid("Goal text must not be empty".to_string()).into());
    }

    let goal = state
        .repo
        .create_today_goal(TodayGoal {
            id: Uuid::new_v4(),
            user_id,
            text: text.to_string(),
            completed: false,
            date: state.clock.today(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

#[utoipa::path(
    patch,
    path = "/api/goals/today/{goal_id}",
    params(("goal_id" = Uuid, Path, description = "The goal id")),
    request_body = UpdateGoalRequest,
    responses(
        (status = 200, description = "Goal updated", body = TodayGoal),
        (status = 404, description = "Unknown goal")
    )
)]
pub async fn update_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(goal_id): Path<Uuid>,
    Json(req): Json<UpdateGoalRequest>,
) -> Result<Json<TodayGoal>, ApiError> {
    let goal = state
        .repo
        .set_today_goal_completed(user_id, goal_id, req.completed)
        .await?;
    Ok(Json(goal))
}

#[utoipa::path(
    delete,
    path = "/api/goals/today/{goal_id}",
    params(("goal_id" = Uuid, Path, description = "The goal id")),
    responses(
        (status = 204, description = "Goal deleted"),
        (status = 404, description = "Unknown goal")
    )
)]
pub async fn delete_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(goal_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.repo.delete_today_goal(user_id, goal_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
