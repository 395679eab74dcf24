use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use cardflow_application::CreateRuleInput;
use cardflow_core::{BoardId, UserIdentity};
use uuid::Uuid;

use crate::dto::{CreateRuleRequest, RuleResponse, UpdateRuleRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_rules_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<Vec<RuleResponse>>> {
    let rules = state
        .rule_service
        .list_rules(&user, BoardId::from_uuid(board_id))
        .await?
        .into_iter()
        .map(RuleResponse::from)
        .collect();

    Ok(Json(rules))
}

pub async fn create_rule_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(board_id): Path<Uuid>,
    Json(payload): Json<CreateRuleRequest>,
) -> ApiResult<(StatusCode, Json<RuleResponse>)> {
    let rule = state
        .rule_service
        .create_rule(
            &user,
            BoardId::from_uuid(board_id),
            CreateRuleInput {
                title: payload.title,
                trigger: payload.trigger.try_into_spec()?,
                action: payload.action,
                is_enabled: payload.is_enabled,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RuleResponse::from(rule))))
}

pub async fn get_rule_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(rule_id): Path<String>,
) -> ApiResult<Json<RuleResponse>> {
    let rule = state.rule_service.find_rule(&user, rule_id.as_str()).await?;
    Ok(Json(RuleResponse::from(rule)))
}

pub async fn update_rule_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(rule_id): Path<String>,
    Json(payload): Json<UpdateRuleRequest>,
) -> ApiResult<Json<RuleResponse>> {
    let rule = state
        .rule_service
        .update_rule(&user, rule_id.as_str(), payload.try_into_patch()?)
        .await?;

    Ok(Json(RuleResponse::from(rule)))
}

pub async fn delete_rule_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(rule_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.rule_service.delete_rule(&user, rule_id.as_str()).await?;
    Ok(StatusCode::NO_CONTENT)
}
