use async_trait::async_trait;
use cardflow_application::{
    AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository,
};
use cardflow_core::{AppError, AppResult, BoardId};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// PostgreSQL-backed append-only audit repository.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log_entries (
                board_id,
                subject,
                action,
                resource_type,
                resource_id,
                detail
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.board_id.as_uuid())
        .bind(event.subject)
        .bind(event.action.as_str())
        .bind(event.resource_type)
        .bind(event.resource_id)
        .bind(event.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditRepository {
    async fn list_recent_entries(
        &self,
        board_id: BoardId,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        let rows = sqlx::query(
            r#"
            SELECT event_id, subject, action, resource_type, resource_id, detail, created_at
            FROM audit_log_entries
            WHERE board_id = $1
              AND ($2::TEXT IS NULL OR action = $2)
              AND ($3::TEXT IS NULL OR subject = $3)
            ORDER BY created_at DESC, event_id DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(board_id.as_uuid())
        .bind(query.action)
        .bind(query.subject)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audit entries: {error}")))?;

        rows.into_iter().map(decode_entry).collect()
    }
}

fn decode_entry(row: PgRow) -> AppResult<AuditLogEntry> {
    let event_id: Uuid = column(&row, "event_id")?;
    let subject: String = column(&row, "subject")?;
    let action: String = column(&row, "action")?;
    let resource_type: String = column(&row, "resource_type")?;
    let resource_id: String = column(&row, "resource_id")?;
    let detail: Option<String> = column(&row, "detail")?;
    let created_at: DateTime<Utc> = column(&row, "created_at")?;

    Ok(AuditLogEntry {
        event_id: event_id.to_string(),
        subject,
        action,
        resource_type,
        resource_id,
        detail,
        created_at: created_at.to_rfc3339(),
    })
}

fn column<'r, T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>>(
    row: &'r PgRow,
    name: &str,
) -> AppResult<T> {
    row.try_get(name)
        .map_err(|error| AppError::Internal(format!("failed to read column '{name}': {error}")))
}
