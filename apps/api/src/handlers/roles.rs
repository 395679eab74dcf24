use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use cardflow_core::{BoardId, UserIdentity};
use uuid::Uuid;

use crate::dto::{AssignRoleRequest, EffectivePermissionsResponse, RoleAssignmentResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_role_assignments_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<Vec<RoleAssignmentResponse>>> {
    let assignments = state
        .role_admin_service
        .list_assignments(&user, BoardId::from_uuid(board_id))
        .await?
        .into_iter()
        .map(RoleAssignmentResponse::from)
        .collect();

    Ok(Json(assignments))
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(board_id): Path<Uuid>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .assign_role(
            &user,
            BoardId::from_uuid(board_id),
            payload.subject.as_str(),
            payload.role.as_str(),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((board_id, subject)): Path<(Uuid, String)>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .revoke_role(&user, BoardId::from_uuid(board_id), subject.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn effective_permissions_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<UserIdentity>,
    Path((board_id, subject)): Path<(Uuid, String)>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let board_id = BoardId::from_uuid(board_id);
    let roles = state
        .authorization_service
        .user_roles(board_id, subject.as_str())
        .await?;
    let permissions = state
        .authorization_service
        .permissions_for(board_id, subject.as_str())
        .await?;

    Ok(Json(EffectivePermissionsResponse {
        subject,
        roles: roles.iter().map(|role| role.as_str().to_owned()).collect(),
        permissions: permissions
            .iter()
            .map(|permission| permission.as_str().to_owned())
            .collect(),
    }))
}
