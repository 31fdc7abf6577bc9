//! services/api/src/adapters/http_client.rs
//!
//! The `ProgressSync` port over HTTP, talking to the REST surface in `web::rest`.
//! The session is carried as a `session=<id>` cookie on every request.

use async_trait::async_trait;
use fitness_core::domain::{Item, ItemKind, Progress, TodayGoal};
use fitness_core::ports::{PortError, PortResult, ProgressSync};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::web::protocol::{
    BulkProgressRequest, CompleteExerciseRequest, CreateGoalRequest, ProgressUpdateRequest,
    UpdateGoalRequest,
};

#[derive(Clone)]
pub struct HttpProgressClient {
    client: Client,
    base_url: String,
}

impl HttpProgressClient {
    pub fn new(base_url: &str, session_id: &str) -> PortResult<Self> {
        let mut headers = header::HeaderMap::new();
        let cookie = header::HeaderValue::from_str(&format!("session={}", session_id))
            .map_err(|e| PortError::Invalid(format!("Session id is not a valid header value: {}", e)))?;
        headers.insert(header::COOKIE, cookie);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // --- Today goals ---

    pub async fn today_goals(&self) -> PortResult<Vec<TodayGoal>> {
        let response = send(self.client.get(self.url("/api/goals/today"))).await?;
        json(response).await
    }

    pub async fn add_today_goal(&self, text: &str) -> PortResult<TodayGoal> {
        let body = CreateGoalRequest {
            text: text.to_string(),
        };
        let response = send(self.client.post(self.url("/api/goals/today")).json(&body)).await?;
        json(response).await
    }

    pub async fn set_today_goal_completed(&self, goal_id: Uuid, completed: bool) -> PortResult<TodayGoal> {
        let body = UpdateGoalRequest { completed };
        let response = send(
            self.client
                .patch(self.url(&format!("/api/goals/today/{}", goal_id)))
                .json(&body),
        )
        .await?;
        json(response).await
    }

    pub async fn delete_today_goal(&self, goal_id: Uuid) -> PortResult<()> {
        send(self.client.delete(self.url(&format!("/api/goals/today/{}", goal_id)))).await?;
        Ok(())
    }
}

#[async_trait]
impl ProgressSync for HttpProgressClient {
    async fn fetch_items(&self, kind: ItemKind) -> PortResult<Vec<Item>> {
        let response = send(self.client.get(self.url(&format!("/api/{}/user", kind)))).await?;
        json(response).await
    }

    async fn fetch_progress(&self, kind: ItemKind, item_id: Uuid) -> PortResult<Progress> {
        let response = send(
            self.client
                .get(self.url(&format!("/api/{}/{}/progress", kind, item_id))),
        )
        .await?;
        json(response).await
    }

    async fn post_completion(&self, kind: ItemKind, item_id: Uuid, exercise_id: &str) -> PortResult<Progress> {
        let body = ProgressUpdateRequest::Single(CompleteExerciseRequest {
            item_id,
            completed_exercise_id: exercise_id.to_string(),
        });
        let response = send(
            self.client
                .post(self.url(&format!("/api/{}/progress", kind)))
                .json(&body),
        )
        .await?;
        json(response).await
    }

    async fn post_bulk(&self, kind: ItemKind, item_id: Uuid, completed: &[String]) -> PortResult<()> {
        let body = ProgressUpdateRequest::Bulk(BulkProgressRequest {
            item_id,
            completed_exercises: completed.to_vec(),
        });
        send(
            self.client
                .post(self.url(&format!("/api/{}/progress", kind)))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn mark_item_complete(&self, kind: ItemKind, item_id: Uuid) -> PortResult<()> {
        send(
            self.client
                .patch(self.url(&format!("/api/{}/{}/complete", kind, item_id))),
        )
        .await?;
        Ok(())
    }
}

/// Sends the request and turns non-2xx statuses into port errors.
async fn send(request: RequestBuilder) -> PortResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| PortError::Unexpected(format!("Request failed: {}", e)))?;

    let status = response.status();
    debug!("{} {}", status, response.url());
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => PortError::NotFound(body),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => PortError::Invalid(body),
        StatusCode::UNAUTHORIZED => PortError::Unauthorized,
        _ => PortError::Unexpected(format!("HTTP {}: {}", status, body)),
    })
}

async fn json<T: DeserializeOwned>(response: Response) -> PortResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Unexpected(format!("Malformed response body: {}", e)))
}
