use async_trait::async_trait;
use cardflow_core::{AppResult, BoardId};
use cardflow_domain::AuditAction;

/// One audit event appended by application use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Board the event is scoped to.
    pub board_id: BoardId,
    /// Actor subject.
    pub subject: String,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Event resource type.
    pub resource_type: String,
    /// Event resource identifier.
    pub resource_id: String,
    /// Optional event detail.
    pub detail: Option<String>,
}

/// Audit log entry projection for administrative views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogEntry {
    /// Stable event identifier.
    pub event_id: String,
    /// Actor subject.
    pub subject: String,
    /// Stable action identifier.
    pub action: String,
    /// Event resource type.
    pub resource_type: String,
    /// Event resource identifier.
    pub resource_id: String,
    /// Optional event detail.
    pub detail: Option<String>,
    /// Event timestamp in RFC3339.
    pub created_at: String,
}

/// Query parameters for audit log listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
    /// Optional action filter.
    pub action: Option<String>,
    /// Optional subject filter.
    pub subject: Option<String>,
}

/// Append-only port for audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}

/// Read port for board audit logs.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists most recent board audit entries.
    async fn list_recent_entries(
        &self,
        board_id: BoardId,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>>;
}
