use async_trait::async_trait;
use cardflow_application::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
};
use cardflow_core::{AppResult, BoardId};
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory append-only audit repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    entries: RwLock<Vec<(BoardId, AuditLogEntry)>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.entries.write().await.push((
            event.board_id,
            AuditLogEntry {
                event_id: Uuid::new_v4().to_string(),
                subject: event.subject,
                action: event.action.as_str().to_owned(),
                resource_type: event.resource_type,
                resource_id: event.resource_id,
                detail: event.detail,
                created_at: Utc::now().to_rfc3339(),
            },
        ));
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditRepository {
    async fn list_recent_entries(
        &self,
        board_id: BoardId,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        let entries = self.entries.read().await;

        Ok(entries
            .iter()
            .rev()
            .filter(|(stored_board_id, _)| stored_board_id == &board_id)
            .map(|(_, entry)| entry)
            .filter(|entry| {
                query
                    .action
                    .as_deref()
                    .is_none_or(|action| entry.action == action)
            })
            .filter(|entry| {
                query
                    .subject
                    .as_deref()
                    .is_none_or(|subject| entry.subject == subject)
            })
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use cardflow_application::{
        AuditEvent, AuditLogQuery, AuditLogRepository, AuditRepository,
    };
    use cardflow_core::BoardId;
    use cardflow_domain::AuditAction;

    use super::InMemoryAuditRepository;

    fn event(board_id: BoardId, subject: &str, action: AuditAction) -> AuditEvent {
        AuditEvent {
            board_id,
            subject: subject.to_owned(),
            action,
            resource_type: "rule".to_owned(),
            resource_id: "rule-1".to_owned(),
            detail: None,
        }
    }

    #[tokio::test]
    async fn listing_filters_by_action_and_subject() {
        let repository = InMemoryAuditRepository::new();
        let board_id = BoardId::new();

        for (subject, action) in [
            ("alice", AuditAction::RuleCreated),
            ("alice", AuditAction::RuleDeleted),
            ("bob", AuditAction::RuleCreated),
        ] {
            let appended = repository.append_event(event(board_id, subject, action)).await;
            assert!(appended.is_ok());
        }

        let listed = repository
            .list_recent_entries(
                board_id,
                AuditLogQuery {
                    limit: 10,
                    offset: 0,
                    action: Some("rules.rule.created".to_owned()),
                    subject: Some("alice".to_owned()),
                },
            )
            .await;
        assert!(listed.is_ok());
        assert_eq!(listed.unwrap_or_default().len(), 1);
    }

    #[tokio::test]
    async fn listing_is_most_recent_first_and_board_scoped() {
        let repository = InMemoryAuditRepository::new();
        let board_id = BoardId::new();
        let other_board = BoardId::new();

        let first = repository
            .append_event(event(board_id, "alice", AuditAction::RuleCreated))
            .await;
        assert!(first.is_ok());
        let second = repository
            .append_event(event(board_id, "alice", AuditAction::RuleDeleted))
            .await;
        assert!(second.is_ok());
        let foreign = repository
            .append_event(event(other_board, "carol", AuditAction::RuleCreated))
            .await;
        assert!(foreign.is_ok());

        let listed = repository
            .list_recent_entries(
                board_id,
                AuditLogQuery {
                    limit: 10,
                    offset: 0,
                    action: None,
                    subject: None,
                },
            )
            .await;
        assert!(listed.is_ok());

        let entries = listed.unwrap_or_default();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "rules.rule.deleted");
    }
}
