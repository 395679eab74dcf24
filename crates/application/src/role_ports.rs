use async_trait::async_trait;
use cardflow_core::{AppResult, BoardId};
use cardflow_domain::BoardRole;
use chrono::{DateTime, Utc};

/// Binding of one user to one role on one board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// Board the role applies to.
    pub board_id: BoardId,
    /// Subject identifier.
    pub subject: String,
    /// Assigned role.
    pub role: BoardRole,
    /// Assignment timestamp.
    pub assigned_at: DateTime<Utc>,
}

/// Repository port for role assignments.
///
/// At most one assignment exists per (subject, board) pair; `upsert` replaces
/// any prior assignment for the pair as a single atomic write, so no reader
/// ever observes two roles, or a transient zero-role gap, during a change.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Inserts or atomically replaces the assignment for (subject, board).
    async fn upsert_assignment(&self, assignment: RoleAssignment) -> AppResult<()>;

    /// Removes the assignment for (subject, board); returns whether one existed.
    async fn remove_assignment(&self, board_id: BoardId, subject: &str) -> AppResult<bool>;

    /// Finds the current assignment for (subject, board).
    async fn find_assignment(
        &self,
        board_id: BoardId,
        subject: &str,
    ) -> AppResult<Option<RoleAssignment>>;

    /// Lists current assignments on a board.
    async fn list_assignments(&self, board_id: BoardId) -> AppResult<Vec<RoleAssignment>>;
}
