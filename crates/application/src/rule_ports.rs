use async_trait::async_trait;
use cardflow_core::{AppResult, BoardId};
use cardflow_domain::RuleDefinition;
use chrono::{DateTime, Utc};

/// Stored automation rule with its board scope and bookkeeping fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Stable rule identifier.
    pub rule_id: String,
    /// Board the rule belongs to.
    pub board_id: BoardId,
    /// Validated rule definition.
    pub definition: RuleDefinition,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Repository port for rule definitions.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Inserts a new rule.
    async fn insert_rule(&self, rule: Rule) -> AppResult<()>;

    /// Replaces an existing rule; fails when the id is unknown.
    async fn update_rule(&self, rule: Rule) -> AppResult<()>;

    /// Finds a rule by id.
    async fn find_rule(&self, rule_id: &str) -> AppResult<Option<Rule>>;

    /// Deletes a rule by id; returns whether one existed.
    async fn delete_rule(&self, rule_id: &str) -> AppResult<bool>;

    /// Lists all rules for a board.
    async fn list_rules(&self, board_id: BoardId) -> AppResult<Vec<Rule>>;
}
