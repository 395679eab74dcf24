use std::str::FromStr;
use std::sync::Arc;

use cardflow_core::{AppError, AppResult, BoardId, UserIdentity};
use cardflow_domain::{AuditAction, BoardRole, Permission};
use chrono::Utc;

use crate::{AuditEvent, AuditRepository, AuthorizationService, RoleAssignment, RoleRepository};

/// Application service for board role administration.
#[derive(Clone)]
pub struct RoleAdminService {
    authorization_service: AuthorizationService,
    role_repository: Arc<dyn RoleRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RoleAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        role_repository: Arc<dyn RoleRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            authorization_service,
            role_repository,
            audit_repository,
        }
    }

    /// Assigns a role to a subject, superseding any prior assignment.
    ///
    /// Unknown role names are rejected at this boundary and never coerced to
    /// a default. The first assignment on an otherwise empty board skips the
    /// admin check so a new board can bootstrap its first administrator.
    pub async fn assign_role(
        &self,
        actor: &UserIdentity,
        board_id: BoardId,
        subject: &str,
        role_name: &str,
    ) -> AppResult<()> {
        let role = BoardRole::from_str(role_name)?;

        if subject.trim().is_empty() {
            return Err(AppError::Validation(
                "assignment subject must not be empty".to_owned(),
            ));
        }

        let existing = self.role_repository.list_assignments(board_id).await?;
        if !existing.is_empty() {
            self.authorization_service
                .require_permission(board_id, actor.subject(), Permission::BoardsAdmin)
                .await?;
        }

        self.role_repository
            .upsert_assignment(RoleAssignment {
                board_id,
                subject: subject.to_owned(),
                role,
                assigned_at: Utc::now(),
            })
            .await?;

        self.audit_repository
            .append_event(AuditEvent {
                board_id,
                subject: actor.subject().to_owned(),
                action: AuditAction::RoleAssigned,
                resource_type: "role_assignment".to_owned(),
                resource_id: format!("{subject}:{}", role.as_str()),
                detail: Some(format!("assigned role '{}' to '{subject}'", role.as_str())),
            })
            .await
    }

    /// Revokes the subject's role on the board.
    ///
    /// All subsequent permission checks for the pair fail once the
    /// assignment is gone.
    pub async fn revoke_role(
        &self,
        actor: &UserIdentity,
        board_id: BoardId,
        subject: &str,
    ) -> AppResult<()> {
        self.authorization_service
            .require_permission(board_id, actor.subject(), Permission::BoardsAdmin)
            .await?;

        let removed = self
            .role_repository
            .remove_assignment(board_id, subject)
            .await?;

        if !removed {
            return Err(AppError::NotFound(format!(
                "subject '{subject}' has no role on board '{board_id}'"
            )));
        }

        self.audit_repository
            .append_event(AuditEvent {
                board_id,
                subject: actor.subject().to_owned(),
                action: AuditAction::RoleRevoked,
                resource_type: "role_assignment".to_owned(),
                resource_id: subject.to_owned(),
                detail: Some(format!("revoked role of '{subject}'")),
            })
            .await
    }

    /// Lists current role assignments on the board.
    pub async fn list_assignments(
        &self,
        actor: &UserIdentity,
        board_id: BoardId,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.authorization_service
            .require_permission(board_id, actor.subject(), Permission::BoardsAdmin)
            .await?;

        self.role_repository.list_assignments(board_id).await
    }
}
