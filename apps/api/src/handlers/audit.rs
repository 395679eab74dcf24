use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use cardflow_application::AuditLogQuery;
use cardflow_core::{BoardId, UserIdentity};
use cardflow_domain::Permission;
use uuid::Uuid;

use crate::dto::AuditEntryResponse;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, serde::Deserialize)]
pub struct AuditListQueryRequest {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub action: Option<String>,
    pub subject: Option<String>,
}

pub async fn list_audit_entries_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(board_id): Path<Uuid>,
    Query(query): Query<AuditListQueryRequest>,
) -> ApiResult<Json<Vec<AuditEntryResponse>>> {
    let board_id = BoardId::from_uuid(board_id);
    state
        .authorization_service
        .require_permission(board_id, user.subject(), Permission::BoardsAdmin)
        .await?;

    let entries = state
        .audit_log_repository
        .list_recent_entries(
            board_id,
            AuditLogQuery {
                limit: query.limit.unwrap_or(50).min(500),
                offset: query.offset.unwrap_or(0),
                action: query.action,
                subject: query.subject,
            },
        )
        .await?
        .into_iter()
        .map(AuditEntryResponse::from)
        .collect();

    Ok(Json(entries))
}
