//! services/api/src/web/middleware.rs
//!
//! Session middleware for the progress routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::state::AppState;

/// Validates the `session` cookie and inserts the user id into the request
/// extensions. Missing or unknown sessions get 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let session_id = session_from_cookie(cookie_header).ok_or(StatusCode::UNAUTHORIZED)?;

    let user_id = state
        .repo
        .validate_auth_session(session_id)
        .await
        .map_err(|e| {
            warn!("Rejected session: {:?}", e);
            StatusCode::UNAUTHORIZED
        })?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

fn session_from_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::session_from_cookie;

    #[test]
    fn finds_the_session_among_other_cookies() {
        assert_eq!(session_from_cookie("theme=dark; session=abc123"), Some("abc123"));
        assert_eq!(session_from_cookie("session="), None);
        assert_eq!(session_from_cookie("theme=dark"), None);
    }
}
