use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use cardflow_core::{AppError, UserIdentity};

use crate::error::ApiResult;
use crate::state::AppState;

const ACTOR_HEADER: &str = "x-cardflow-actor";

/// Authenticates the calling service and binds the acting subject.
///
/// Callers present the shared service secret as a bearer token and identify
/// the user they act for in the `x-cardflow-actor` header.
pub async fn require_service_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let presented = authorization.strip_prefix("Bearer ").unwrap_or_default();
    if presented.is_empty() || presented != state.service_secret {
        return Err(AppError::Unauthorized("service credentials required".to_owned()).into());
    }

    let subject = request
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized(format!("{ACTOR_HEADER} header required")))?;

    let identity = UserIdentity::new(subject, subject, None);
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
