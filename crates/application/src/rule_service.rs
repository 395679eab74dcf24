use std::sync::Arc;

use cardflow_core::{AppError, AppResult, BoardId, UserIdentity};
use cardflow_domain::{AuditAction, Permission, RuleDefinition, RuleDefinitionInput, RuleDefinitionPatch};
use chrono::Utc;
use uuid::Uuid;

use crate::{AuditEvent, AuditRepository, AuthorizationService, Rule, RuleRepository};

/// Input payload for creating one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRuleInput {
    /// User-facing rule title.
    pub title: String,
    /// Trigger configuration.
    pub trigger: cardflow_domain::TriggerSpec,
    /// Action configuration.
    pub action: cardflow_domain::ActionSpec,
    /// Enabled/disabled flag.
    pub is_enabled: bool,
}

/// Application service for the rule-builder flow.
#[derive(Clone)]
pub struct RuleService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn RuleRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RuleService {
    /// Creates a rule service.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn RuleRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
            audit_repository,
        }
    }

    /// Creates a validated rule and returns it with its new id.
    ///
    /// Validation failures surface synchronously and nothing is persisted;
    /// an invalid rule never becomes visible to `list_rules`.
    pub async fn create_rule(
        &self,
        actor: &UserIdentity,
        board_id: BoardId,
        input: CreateRuleInput,
    ) -> AppResult<Rule> {
        self.authorization_service
            .require_permission(board_id, actor.subject(), Permission::RulesManage)
            .await?;

        let definition = RuleDefinition::new(RuleDefinitionInput {
            title: input.title,
            author_subject: actor.subject().to_owned(),
            trigger: input.trigger,
            action: input.action,
            is_enabled: input.is_enabled,
        })?;

        let now = Utc::now();
        let rule = Rule {
            rule_id: Uuid::new_v4().to_string(),
            board_id,
            definition,
            created_at: now,
            updated_at: now,
        };

        self.repository.insert_rule(rule.clone()).await?;

        self.audit_repository
            .append_event(AuditEvent {
                board_id,
                subject: actor.subject().to_owned(),
                action: AuditAction::RuleCreated,
                resource_type: "rule".to_owned(),
                resource_id: rule.rule_id.clone(),
                detail: Some(format!(
                    "created rule '{}'",
                    rule.definition.title().as_str()
                )),
            })
            .await?;

        Ok(rule)
    }

    /// Applies a partial update to an existing rule.
    ///
    /// The merged result goes through the same validation as creation; the
    /// editing actor becomes the rule's dispatch identity.
    pub async fn update_rule(
        &self,
        actor: &UserIdentity,
        rule_id: &str,
        patch: RuleDefinitionPatch,
    ) -> AppResult<Rule> {
        let stored = self
            .repository
            .find_rule(rule_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("rule '{rule_id}' does not exist")))?;

        self.authorization_service
            .require_permission(stored.board_id, actor.subject(), Permission::RulesManage)
            .await?;

        let definition = stored.definition.apply_patch(patch, actor.subject())?;
        let updated = Rule {
            definition,
            updated_at: Utc::now(),
            ..stored
        };

        self.repository.update_rule(updated.clone()).await?;

        self.audit_repository
            .append_event(AuditEvent {
                board_id: updated.board_id,
                subject: actor.subject().to_owned(),
                action: AuditAction::RuleUpdated,
                resource_type: "rule".to_owned(),
                resource_id: updated.rule_id.clone(),
                detail: Some(format!(
                    "updated rule '{}'",
                    updated.definition.title().as_str()
                )),
            })
            .await?;

        Ok(updated)
    }

    /// Deletes a rule together with its trigger and action.
    ///
    /// Idempotent: deleting an id that is already gone is a no-op, matching
    /// the optimistic-delete behavior of rule list clients.
    pub async fn delete_rule(&self, actor: &UserIdentity, rule_id: &str) -> AppResult<()> {
        let Some(stored) = self.repository.find_rule(rule_id).await? else {
            return Ok(());
        };

        self.authorization_service
            .require_permission(stored.board_id, actor.subject(), Permission::RulesManage)
            .await?;

        if !self.repository.delete_rule(rule_id).await? {
            return Ok(());
        }

        self.audit_repository
            .append_event(AuditEvent {
                board_id: stored.board_id,
                subject: actor.subject().to_owned(),
                action: AuditAction::RuleDeleted,
                resource_type: "rule".to_owned(),
                resource_id: rule_id.to_owned(),
                detail: Some(format!(
                    "deleted rule '{}'",
                    stored.definition.title().as_str()
                )),
            })
            .await
    }

    /// Lists all rules on a board.
    pub async fn list_rules(&self, actor: &UserIdentity, board_id: BoardId) -> AppResult<Vec<Rule>> {
        self.authorization_service
            .require_permission(board_id, actor.subject(), Permission::RulesManage)
            .await?;

        self.repository.list_rules(board_id).await
    }

    /// Finds a rule by id.
    pub async fn find_rule(&self, actor: &UserIdentity, rule_id: &str) -> AppResult<Rule> {
        let stored = self
            .repository
            .find_rule(rule_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("rule '{rule_id}' does not exist")))?;

        self.authorization_service
            .require_permission(stored.board_id, actor.subject(), Permission::RulesManage)
            .await?;

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use cardflow_core::{AppError, AppResult, BoardId, UserIdentity};
    use cardflow_domain::{
        ActionSpec, ActivityType, BoardRole, CardAction, CardColor, MailAction,
        RuleDefinitionPatch, TriggerCondition, TriggerSpec,
    };
    use chrono::Utc;
    use serde_json::json;
    use tokio::sync::Mutex;

    use crate::{
        AuditEvent, AuditRepository, AuthorizationService, Rule, RoleAssignment, RoleRepository,
        RuleRepository,
    };

    use super::{CreateRuleInput, RuleService};

    #[derive(Default)]
    struct FakeAuditRepository {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditRepository for FakeAuditRepository {
        async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    struct FakeRoleRepository {
        admin_subject: String,
    }

    #[async_trait]
    impl RoleRepository for FakeRoleRepository {
        async fn upsert_assignment(&self, _assignment: RoleAssignment) -> AppResult<()> {
            Ok(())
        }

        async fn remove_assignment(&self, _board_id: BoardId, _subject: &str) -> AppResult<bool> {
            Ok(false)
        }

        async fn find_assignment(
            &self,
            board_id: BoardId,
            subject: &str,
        ) -> AppResult<Option<RoleAssignment>> {
            Ok((subject == self.admin_subject).then(|| RoleAssignment {
                board_id,
                subject: subject.to_owned(),
                role: BoardRole::BoardAdmin,
                assigned_at: Utc::now(),
            }))
        }

        async fn list_assignments(&self, _board_id: BoardId) -> AppResult<Vec<RoleAssignment>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct FakeRuleRepository {
        rules: Mutex<HashMap<String, Rule>>,
    }

    #[async_trait]
    impl RuleRepository for FakeRuleRepository {
        async fn insert_rule(&self, rule: Rule) -> AppResult<()> {
            self.rules.lock().await.insert(rule.rule_id.clone(), rule);
            Ok(())
        }

        async fn update_rule(&self, rule: Rule) -> AppResult<()> {
            let mut rules = self.rules.lock().await;
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
            Ok(self.rules.lock().await.get(rule_id).cloned())
        }

        async fn delete_rule(&self, rule_id: &str) -> AppResult<bool> {
            Ok(self.rules.lock().await.remove(rule_id).is_some())
        }

        async fn list_rules(&self, board_id: BoardId) -> AppResult<Vec<Rule>> {
            let mut listed: Vec<Rule> = self
                .rules
                .lock()
                .await
                .values()
                .filter(|rule| rule.board_id == board_id)
                .cloned()
                .collect();
            listed.sort_by(|left, right| left.created_at.cmp(&right.created_at));
            Ok(listed)
        }
    }

    fn build_service() -> RuleService {
        RuleService::new(
            AuthorizationService::new(Arc::new(FakeRoleRepository {
                admin_subject: "alice".to_owned(),
            })),
            Arc::new(FakeRuleRepository::default()),
            Arc::new(FakeAuditRepository::default()),
        )
    }

    fn admin() -> UserIdentity {
        UserIdentity::new("alice", "Alice", None)
    }

    fn set_color_input() -> CreateRuleInput {
        CreateRuleInput {
            title: "Flag urgent cards".to_owned(),
            trigger: TriggerSpec::new(
                ActivityType::AddedLabel,
                None,
                vec![
                    TriggerCondition::new("label_id", "equals", json!("label-urgent"))
                        .unwrap_or_else(|_| unreachable!()),
                ],
            ),
            action: ActionSpec::Card(CardAction::SetColor {
                color: CardColor::Red,
            }),
            is_enabled: true,
        }
    }

    #[tokio::test]
    async fn create_and_list_rules() {
        let service = build_service();
        let board_id = BoardId::new();

        let created = service.create_rule(&admin(), board_id, set_color_input()).await;
        assert!(created.is_ok());

        let listed = service.list_rules(&admin(), board_id).await;
        assert!(listed.is_ok());
        assert_eq!(listed.unwrap_or_default().len(), 1);
    }

    #[tokio::test]
    async fn mail_rule_without_subject_never_reaches_the_list() {
        let service = build_service();
        let board_id = BoardId::new();

        let mut input = set_color_input();
        input.action = ActionSpec::Mail(MailAction::Send {
            to: "team@example.com".to_owned(),
            subject: String::new(),
            message: "card moved".to_owned(),
        });

        let created = service.create_rule(&admin(), board_id, input).await;
        assert!(created.is_err());

        let listed = service.list_rules(&admin(), board_id).await;
        assert!(listed.is_ok());
        assert!(listed.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn delete_rule_is_idempotent() {
        let service = build_service();
        let board_id = BoardId::new();

        let created = service.create_rule(&admin(), board_id, set_color_input()).await;
        assert!(created.is_ok());
        let rule_id = created.map(|rule| rule.rule_id).unwrap_or_default();

        let first = service.delete_rule(&admin(), rule_id.as_str()).await;
        assert!(first.is_ok());

        let second = service.delete_rule(&admin(), rule_id.as_str()).await;
        assert!(second.is_ok());

        let listed = service.list_rules(&admin(), board_id).await;
        assert!(listed.is_ok());
        assert!(listed.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn update_records_editor_as_dispatch_actor() {
        // Both alice and bob administer the board in this scenario.
        struct DualAdmin;
        #[async_trait]
        impl RoleRepository for DualAdmin {
            async fn upsert_assignment(&self, _assignment: RoleAssignment) -> AppResult<()> {
                Ok(())
            }
            async fn remove_assignment(
                &self,
                _board_id: BoardId,
                _subject: &str,
            ) -> AppResult<bool> {
                Ok(false)
            }
            async fn find_assignment(
                &self,
                board_id: BoardId,
                subject: &str,
            ) -> AppResult<Option<RoleAssignment>> {
                Ok(Some(RoleAssignment {
                    board_id,
                    subject: subject.to_owned(),
                    role: BoardRole::BoardAdmin,
                    assigned_at: Utc::now(),
                }))
            }
            async fn list_assignments(&self, _board_id: BoardId) -> AppResult<Vec<RoleAssignment>> {
                Ok(Vec::new())
            }
        }

        let service = RuleService::new(
            AuthorizationService::new(Arc::new(DualAdmin)),
            Arc::new(FakeRuleRepository::default()),
            Arc::new(FakeAuditRepository::default()),
        );
        let board_id = BoardId::new();

        let created = service.create_rule(&admin(), board_id, set_color_input()).await;
        assert!(created.is_ok());
        let rule_id = created.map(|rule| rule.rule_id).unwrap_or_default();

        let editor = UserIdentity::new("bob", "Bob", None);
        let updated = service
            .update_rule(
                &editor,
                rule_id.as_str(),
                RuleDefinitionPatch {
                    is_enabled: Some(false),
                    ..RuleDefinitionPatch::default()
                },
            )
            .await;
        assert!(updated.is_ok());

        let updated = updated.unwrap_or_else(|_| unreachable!());
        assert_eq!(updated.definition.author_subject().as_str(), "bob");
        assert!(!updated.definition.is_enabled());
    }

    #[tokio::test]
    async fn non_admin_cannot_create_rules() {
        let service = build_service();
        let board_id = BoardId::new();

        let member = UserIdentity::new("bob", "Bob", None);
        let created = service.create_rule(&member, board_id, set_color_input()).await;
        assert!(created.is_err());
    }
}
