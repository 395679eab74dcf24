use std::collections::HashMap;

use async_trait::async_trait;
use cardflow_application::{Rule, RuleRepository};
use cardflow_core::{AppError, AppResult, BoardId};
use tokio::sync::RwLock;

/// In-memory rule repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryRuleRepository {
    rules: RwLock<HashMap<String, Rule>>,
}

impl InMemoryRuleRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn insert_rule(&self, rule: Rule) -> AppResult<()> {
        let mut rules = self.rules.write().await;

        if rules.contains_key(&rule.rule_id) {
            return Err(AppError::Conflict(format!(
                "rule '{}' already exists",
                rule.rule_id
            )));
        }

        rules.insert(rule.rule_id.clone(), rule);
        Ok(())
    }

    async fn update_rule(&self, rule: Rule) -> AppResult<()> {
        let mut rules = self.rules.write().await;

        if !rules.contains_key(&rule.rule_id) {
            return Err(AppError::NotFound(format!(
                "rule '{}' does not exist",
                rule.rule_id
            )));
        }

        rules.insert(rule.rule_id.clone(), rule);
        Ok(())
    }

    async fn find_rule(&self, rule_id: &str) -> AppResult<Option<Rule>> {
        Ok(self.rules.read().await.get(rule_id).cloned())
    }

    async fn delete_rule(&self, rule_id: &str) -> AppResult<bool> {
        Ok(self.rules.write().await.remove(rule_id).is_some())
    }

    async fn list_rules(&self, board_id: BoardId) -> AppResult<Vec<Rule>> {
        let rules = self.rules.read().await;

        let mut listed: Vec<Rule> = rules
            .values()
            .filter(|rule| rule.board_id == board_id)
            .cloned()
            .collect();
        listed.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.rule_id.cmp(&right.rule_id))
        });

        Ok(listed)
    }
}
