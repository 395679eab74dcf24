use std::str::FromStr;

use async_trait::async_trait;
use cardflow_application::{RoleAssignment, RoleRepository};
use cardflow_core::{AppError, AppResult, BoardId};
use cardflow_domain::BoardRole;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// PostgreSQL-backed role assignment repository.
///
/// The (board_id, subject) primary key plus `ON CONFLICT .. DO UPDATE` makes
/// a role change one atomic statement: readers observe the old row or the
/// new one, never two rows and never none.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn upsert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO role_assignments (board_id, subject, role, assigned_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (board_id, subject)
            DO UPDATE SET role = EXCLUDED.role, assigned_at = EXCLUDED.assigned_at
            "#,
        )
        .bind(assignment.board_id.as_uuid())
        .bind(assignment.subject.as_str())
        .bind(assignment.role.as_str())
        .bind(assignment.assigned_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to upsert assignment: {error}")))?;

        Ok(())
    }

    async fn remove_assignment(&self, board_id: BoardId, subject: &str) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM role_assignments WHERE board_id = $1 AND subject = $2")
                .bind(board_id.as_uuid())
                .bind(subject)
                .execute(&self.pool)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to remove assignment: {error}"))
                })?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_assignment(
        &self,
        board_id: BoardId,
        subject: &str,
    ) -> AppResult<Option<RoleAssignment>> {
        let row = sqlx::query(
            r#"
            SELECT board_id, subject, role, assigned_at
            FROM role_assignments
            WHERE board_id = $1 AND subject = $2
            "#,
        )
        .bind(board_id.as_uuid())
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load assignment: {error}")))?;

        row.map(decode_assignment).transpose()
    }

    async fn list_assignments(&self, board_id: BoardId) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query(
            r#"
            SELECT board_id, subject, role, assigned_at
            FROM role_assignments
            WHERE board_id = $1
            ORDER BY subject
            "#,
        )
        .bind(board_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list assignments: {error}")))?;

        rows.into_iter().map(decode_assignment).collect()
    }
}

fn decode_assignment(row: PgRow) -> AppResult<RoleAssignment> {
    let board_id: Uuid = column(&row, "board_id")?;
    let subject: String = column(&row, "subject")?;
    let role: String = column(&row, "role")?;
    let assigned_at: DateTime<Utc> = column(&row, "assigned_at")?;

    Ok(RoleAssignment {
        board_id: BoardId::from_uuid(board_id),
        subject,
        role: BoardRole::from_str(role.as_str())?,
        assigned_at,
    })
}

fn column<'r, T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>>(
    row: &'r PgRow,
    name: &str,
) -> AppResult<T> {
    row.try_get(name)
        .map_err(|error| AppError::Internal(format!("failed to read column '{name}': {error}")))
}
