use std::sync::Arc;

use cardflow_core::{AppError, AppResult, BoardId};
use cardflow_domain::{BoardRole, Permission};

use crate::RoleRepository;

/// Application service for board-scoped permission checks.
#[derive(Clone)]
pub struct AuthorizationService {
    role_repository: Arc<dyn RoleRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(role_repository: Arc<dyn RoleRepository>) -> Self {
        Self { role_repository }
    }

    /// Returns the subject's current role on the board, if any.
    pub async fn role_for(&self, board_id: BoardId, subject: &str) -> AppResult<Option<BoardRole>> {
        Ok(self
            .role_repository
            .find_assignment(board_id, subject)
            .await?
            .map(|assignment| assignment.role))
    }

    /// Returns the subject's roles on the board; empty or a single entry.
    pub async fn user_roles(&self, board_id: BoardId, subject: &str) -> AppResult<Vec<BoardRole>> {
        Ok(self
            .role_for(board_id, subject)
            .await?
            .into_iter()
            .collect())
    }

    /// Returns the effective permission set for the subject on the board.
    pub async fn permissions_for(
        &self,
        board_id: BoardId,
        subject: &str,
    ) -> AppResult<Vec<Permission>> {
        Ok(self
            .role_for(board_id, subject)
            .await?
            .map(|role| role.permissions().to_vec())
            .unwrap_or_default())
    }

    /// Returns whether the subject currently has the permission.
    ///
    /// A `BoardAdmin` assignment short-circuits every check before the
    /// permission table is consulted; a subject without an assignment has no
    /// permissions at all.
    pub async fn has_permission(
        &self,
        board_id: BoardId,
        subject: &str,
        permission: Permission,
    ) -> AppResult<bool> {
        let Some(role) = self.role_for(board_id, subject).await? else {
            return Ok(false);
        };

        if role == BoardRole::BoardAdmin {
            return Ok(true);
        }

        Ok(role.permissions().contains(&permission))
    }

    /// Ensures the subject has the required permission on the board.
    pub async fn require_permission(
        &self,
        board_id: BoardId,
        subject: &str,
        permission: Permission,
    ) -> AppResult<()> {
        if self.has_permission(board_id, subject, permission).await? {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "subject '{subject}' is missing permission '{}' on board '{board_id}'",
            permission.as_str()
        )))
    }
}
