use std::collections::HashMap;

use async_trait::async_trait;
use cardflow_application::{RoleAssignment, RoleRepository};
use cardflow_core::{AppResult, BoardId};
use tokio::sync::RwLock;

/// In-memory role assignment repository implementation.
///
/// One map entry per (board, subject) pair makes the upsert a single write
/// under the lock, so a concurrent reader sees either the old role or the
/// new one, never both and never a gap.
#[derive(Debug, Default)]
pub struct InMemoryRoleRepository {
    assignments: RwLock<HashMap<(BoardId, String), RoleAssignment>>,
}

impl InMemoryRoleRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            assignments: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn upsert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        self.assignments.write().await.insert(
            (assignment.board_id, assignment.subject.clone()),
            assignment,
        );
        Ok(())
    }

    async fn remove_assignment(&self, board_id: BoardId, subject: &str) -> AppResult<bool> {
        Ok(self
            .assignments
            .write()
            .await
            .remove(&(board_id, subject.to_owned()))
            .is_some())
    }

    async fn find_assignment(
        &self,
        board_id: BoardId,
        subject: &str,
    ) -> AppResult<Option<RoleAssignment>> {
        Ok(self
            .assignments
            .read()
            .await
            .get(&(board_id, subject.to_owned()))
            .cloned())
    }

    async fn list_assignments(&self, board_id: BoardId) -> AppResult<Vec<RoleAssignment>> {
        let assignments = self.assignments.read().await;

        let mut listed: Vec<RoleAssignment> = assignments
            .iter()
            .filter_map(|((stored_board_id, _), assignment)| {
                (stored_board_id == &board_id).then(|| assignment.clone())
            })
            .collect();
        listed.sort_by(|left, right| left.subject.cmp(&right.subject));

        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use cardflow_application::{RoleAssignment, RoleRepository};
    use cardflow_core::BoardId;
    use cardflow_domain::BoardRole;
    use chrono::Utc;

    use super::InMemoryRoleRepository;

    fn assignment(board_id: BoardId, subject: &str, role: BoardRole) -> RoleAssignment {
        RoleAssignment {
            board_id,
            subject: subject.to_owned(),
            role,
            assigned_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_prior_assignment() {
        let repository = InMemoryRoleRepository::new();
        let board_id = BoardId::new();

        let first = repository
            .upsert_assignment(assignment(board_id, "bob", BoardRole::Normal))
            .await;
        assert!(first.is_ok());

        let second = repository
            .upsert_assignment(assignment(board_id, "bob", BoardRole::CommentOnly))
            .await;
        assert!(second.is_ok());

        let found = repository.find_assignment(board_id, "bob").await;
        assert!(found.is_ok());
        assert_eq!(
            found.unwrap_or_default().map(|entry| entry.role),
            Some(BoardRole::CommentOnly)
        );

        let listed = repository.list_assignments(board_id).await;
        assert!(listed.is_ok());
        assert_eq!(listed.unwrap_or_default().len(), 1);
    }

    #[tokio::test]
    async fn remove_reports_whether_an_assignment_existed() {
        let repository = InMemoryRoleRepository::new();
        let board_id = BoardId::new();

        let inserted = repository
            .upsert_assignment(assignment(board_id, "bob", BoardRole::Normal))
            .await;
        assert!(inserted.is_ok());

        let first = repository.remove_assignment(board_id, "bob").await;
        assert!(first.is_ok());
        assert!(first.unwrap_or(false));

        let second = repository.remove_assignment(board_id, "bob").await;
        assert!(second.is_ok());
        assert!(!second.unwrap_or(true));
    }

    #[tokio::test]
    async fn assignments_do_not_leak_across_boards() {
        let repository = InMemoryRoleRepository::new();
        let left_board = BoardId::new();
        let right_board = BoardId::new();

        let left = repository
            .upsert_assignment(assignment(left_board, "bob", BoardRole::Normal))
            .await;
        assert!(left.is_ok());
        let right = repository
            .upsert_assignment(assignment(right_board, "carol", BoardRole::BoardAdmin))
            .await;
        assert!(right.is_ok());

        let listed = repository.list_assignments(left_board).await;
        assert!(listed.is_ok());

        let entries = listed.unwrap_or_default();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].subject, "bob");
    }
}
