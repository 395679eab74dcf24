use axum::Json;
use axum::extract::{Extension, State};
use cardflow_core::UserIdentity;

use crate::dto::{ActivityDigestResponse, ActivityEventRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn ingest_activity_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Json(payload): Json<ActivityEventRequest>,
) -> ApiResult<Json<ActivityDigestResponse>> {
    let event = payload.try_into_event()?;
    let digest = state.rule_engine.on_activity(&event).await?;

    Ok(Json(ActivityDigestResponse::from(digest)))
}
