use async_trait::async_trait;
use cardflow_application::{Rule, RuleRepository};
use cardflow_core::{AppError, AppResult, BoardId};
use cardflow_domain::RuleDefinition;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// PostgreSQL-backed rule repository.
#[derive(Clone)]
pub struct PostgresRuleRepository {
    pool: PgPool,
}

impl PostgresRuleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleRepository for PostgresRuleRepository {
    async fn insert_rule(&self, rule: Rule) -> AppResult<()> {
        let rule_id = parse_rule_id(rule.rule_id.as_str())?;
        let (trigger, action) = encode_definition(&rule)?;

        sqlx::query(
            r#"
            INSERT INTO rules (
                rule_id,
                board_id,
                title,
                author_subject,
                trigger,
                action,
                is_enabled,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(rule_id)
        .bind(rule.board_id.as_uuid())
        .bind(rule.definition.title().as_str())
        .bind(rule.definition.author_subject().as_str())
        .bind(trigger)
        .bind(action)
        .bind(rule.definition.is_enabled())
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert rule: {error}")))?;

        Ok(())
    }

    async fn update_rule(&self, rule: Rule) -> AppResult<()> {
        let rule_id = parse_rule_id(rule.rule_id.as_str())?;
        let (trigger, action) = encode_definition(&rule)?;

        let result = sqlx::query(
            r#"
            UPDATE rules
            SET title = $2,
                author_subject = $3,
                trigger = $4,
                action = $5,
                is_enabled = $6,
                updated_at = $7
            WHERE rule_id = $1
            "#,
        )
        .bind(rule_id)
        .bind(rule.definition.title().as_str())
        .bind(rule.definition.author_subject().as_str())
        .bind(trigger)
        .bind(action)
        .bind(rule.definition.is_enabled())
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update rule: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "rule '{}' does not exist",
                rule.rule_id
            )));
        }

        Ok(())
    }

    async fn find_rule(&self, rule_id: &str) -> AppResult<Option<Rule>> {
        let Ok(rule_id) = Uuid::parse_str(rule_id) else {
            return Ok(None);
        };

        let row = sqlx::query(
            r#"
            SELECT rule_id, board_id, title, author_subject, trigger, action,
                   is_enabled, created_at, updated_at
            FROM rules
            WHERE rule_id = $1
            "#,
        )
        .bind(rule_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load rule: {error}")))?;

        row.map(decode_rule).transpose()
    }

    async fn delete_rule(&self, rule_id: &str) -> AppResult<bool> {
        let Ok(rule_id) = Uuid::parse_str(rule_id) else {
            return Ok(false);
        };

        let result = sqlx::query("DELETE FROM rules WHERE rule_id = $1")
            .bind(rule_id)
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete rule: {error}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_rules(&self, board_id: BoardId) -> AppResult<Vec<Rule>> {
        let rows = sqlx::query(
            r#"
            SELECT rule_id, board_id, title, author_subject, trigger, action,
                   is_enabled, created_at, updated_at
            FROM rules
            WHERE board_id = $1
            ORDER BY created_at, rule_id
            "#,
        )
        .bind(board_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list rules: {error}")))?;

        rows.into_iter().map(decode_rule).collect()
    }
}

fn parse_rule_id(rule_id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(rule_id)
        .map_err(|error| AppError::Validation(format!("invalid rule id '{rule_id}': {error}")))
}

fn encode_definition(rule: &Rule) -> AppResult<(Value, Value)> {
    let trigger = serde_json::to_value(rule.definition.trigger())
        .map_err(|error| AppError::Internal(format!("failed to encode trigger: {error}")))?;
    let action = serde_json::to_value(rule.definition.action())
        .map_err(|error| AppError::Internal(format!("failed to encode action: {error}")))?;

    Ok((trigger, action))
}

fn decode_rule(row: PgRow) -> AppResult<Rule> {
    let rule_id: Uuid = column(&row, "rule_id")?;
    let board_id: Uuid = column(&row, "board_id")?;
    let title: String = column(&row, "title")?;
    let author_subject: String = column(&row, "author_subject")?;
    let trigger: Value = column(&row, "trigger")?;
    let action: Value = column(&row, "action")?;
    let is_enabled: bool = column(&row, "is_enabled")?;
    let created_at: DateTime<Utc> = column(&row, "created_at")?;
    let updated_at: DateTime<Utc> = column(&row, "updated_at")?;

    // Stored rows rebuild through serde rather than the validating
    // constructor; the matcher treats whatever comes back fail-closed.
    let definition: RuleDefinition = serde_json::from_value(serde_json::json!({
        "title": title,
        "author_subject": author_subject,
        "trigger": trigger,
        "action": action,
        "is_enabled": is_enabled,
    }))
    .map_err(|error| {
        AppError::Internal(format!("failed to decode rule '{rule_id}': {error}"))
    })?;

    Ok(Rule {
        rule_id: rule_id.to_string(),
        board_id: BoardId::from_uuid(board_id),
        definition,
        created_at,
        updated_at,
    })
}

fn column<'r, T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>>(
    row: &'r PgRow,
    name: &str,
) -> AppResult<T> {
    row.try_get(name)
        .map_err(|error| AppError::Internal(format!("failed to read column '{name}': {error}")))
}
