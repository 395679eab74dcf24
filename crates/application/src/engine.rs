use std::sync::Arc;

use cardflow_core::{AppResult, BoardId};
use cardflow_domain::{ActivityEvent, ActivityType, AuditAction, TriggerEvaluation};

use crate::{
    ActionDispatchService, AuditEvent, AuditRepository, DispatchEffect, Rule, RuleRepository,
};

/// One malformed-trigger report produced during matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerDiagnostic {
    /// Rule whose stored trigger failed closed.
    pub rule_id: String,
    /// Why matching refused the trigger.
    pub reason: String,
}

/// One recorded dispatch failure; sibling rules are unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    /// Rule whose action failed.
    pub rule_id: String,
    /// Rule title for report surfaces.
    pub rule_title: String,
    /// Failure rendered for the audit trail.
    pub error: String,
}

/// Outcome of running one activity event through the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDigest {
    /// Board the event belonged to.
    pub board_id: BoardId,
    /// Activity kind that was evaluated.
    pub activity_type: ActivityType,
    /// Number of enabled rules that matched.
    pub matched: usize,
    /// Effects of successfully dispatched actions, in dispatch order.
    pub effects: Vec<DispatchEffect>,
    /// Recorded per-rule dispatch failures.
    pub failures: Vec<DispatchFailure>,
    /// Malformed-trigger reports.
    pub diagnostics: Vec<TriggerDiagnostic>,
}

/// Orchestrates rule matching and action dispatch for activity events.
///
/// Each event is processed to completion: every enabled rule on the event's
/// board is evaluated, every match is dispatched exactly once in
/// (created_at, rule_id) order, and failures are recorded rather than
/// thrown so one broken rule cannot starve its siblings. Failed actions are
/// not retried; the event counts as fully processed once the digest exists.
#[derive(Clone)]
pub struct RuleEngine {
    rule_repository: Arc<dyn RuleRepository>,
    dispatch_service: ActionDispatchService,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RuleEngine {
    /// Creates a rule engine.
    #[must_use]
    pub fn new(
        rule_repository: Arc<dyn RuleRepository>,
        dispatch_service: ActionDispatchService,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            rule_repository,
            dispatch_service,
            audit_repository,
        }
    }

    /// Runs one activity event through matching and dispatch.
    pub async fn on_activity(&self, event: &ActivityEvent) -> AppResult<ActivityDigest> {
        let mut rules = self.rule_repository.list_rules(event.board_id()).await?;
        rules.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.rule_id.cmp(&right.rule_id))
        });

        let mut digest = ActivityDigest {
            board_id: event.board_id(),
            activity_type: event.activity_type(),
            matched: 0,
            effects: Vec::new(),
            failures: Vec::new(),
            diagnostics: Vec::new(),
        };

        for rule in rules {
            if !rule.definition.is_enabled() {
                continue;
            }

            match rule.definition.trigger().evaluate(event) {
                TriggerEvaluation::NotMatched => {}
                TriggerEvaluation::Malformed(reason) => {
                    self.report_malformed_trigger(event, &rule, reason.as_str())
                        .await?;
                    digest.diagnostics.push(TriggerDiagnostic {
                        rule_id: rule.rule_id.clone(),
                        reason,
                    });
                }
                TriggerEvaluation::Matched => {
                    digest.matched += 1;
                    match self.dispatch_service.execute(&rule, event).await {
                        Ok(effect) => digest.effects.push(effect),
                        Err(error) => {
                            let failure = DispatchFailure {
                                rule_id: rule.rule_id.clone(),
                                rule_title: rule.definition.title().as_str().to_owned(),
                                error: error.to_string(),
                            };
                            self.report_dispatch_failure(event, &failure).await?;
                            digest.failures.push(failure);
                        }
                    }
                }
            }
        }

        self.audit_repository
            .append_event(AuditEvent {
                board_id: event.board_id(),
                subject: event.actor_subject().to_owned(),
                action: AuditAction::ActivityProcessed,
                resource_type: "activity".to_owned(),
                resource_id: event.activity_type().as_str().to_owned(),
                detail: Some(format!(
                    "matched {} rule(s), {} dispatched, {} failed",
                    digest.matched,
                    digest.effects.len(),
                    digest.failures.len()
                )),
            })
            .await?;

        Ok(digest)
    }

    async fn report_malformed_trigger(
        &self,
        event: &ActivityEvent,
        rule: &Rule,
        reason: &str,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                board_id: event.board_id(),
                subject: event.actor_subject().to_owned(),
                action: AuditAction::RuleTriggerMalformed,
                resource_type: "rule".to_owned(),
                resource_id: rule.rule_id.clone(),
                detail: Some(reason.to_owned()),
            })
            .await
    }

    async fn report_dispatch_failure(
        &self,
        event: &ActivityEvent,
        failure: &DispatchFailure,
    ) -> AppResult<()> {
        self.audit_repository
            .append_event(AuditEvent {
                board_id: event.board_id(),
                subject: event.actor_subject().to_owned(),
                action: AuditAction::RuleDispatchFailed,
                resource_type: "rule".to_owned(),
                resource_id: failure.rule_id.clone(),
                detail: Some(format!("'{}': {}", failure.rule_title, failure.error)),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cardflow_domain::{
        ActionSpec, AuditAction, BoardAction, BoardPosition, CardAction, CardColor,
    };
    use serde_json::json;

    use crate::test_support::{
        added_label_event, BoardFixture, MemoryAuditRepository, MemoryRuleRepository,
        RecordingBoardGateway, RecordingMailService, rule_with_action,
    };
    use crate::{
        ActionDispatchService, AuthorizationService, RuleEngine, RuleRepository,
        test_support::StaticRoleRepository,
    };

    struct EngineHarness {
        engine: RuleEngine,
        rules: Arc<MemoryRuleRepository>,
        gateway: Arc<RecordingBoardGateway>,
        audit: Arc<MemoryAuditRepository>,
    }

    fn build_engine(fixture: &BoardFixture) -> EngineHarness {
        let rules = Arc::new(MemoryRuleRepository::default());
        let gateway = Arc::new(RecordingBoardGateway::new(fixture));
        let audit = Arc::new(MemoryAuditRepository::default());
        let dispatcher = ActionDispatchService::new(
            AuthorizationService::new(Arc::new(StaticRoleRepository)),
            gateway.clone(),
            Arc::new(RecordingMailService::default()),
        );

        EngineHarness {
            engine: RuleEngine::new(rules.clone(), dispatcher, audit.clone()),
            rules,
            gateway,
            audit,
        }
    }

    fn set_color_action() -> ActionSpec {
        ActionSpec::Card(CardAction::SetColor {
            color: CardColor::Red,
        })
    }

    #[tokio::test]
    async fn matching_rule_dispatches_exactly_once() {
        let fixture = BoardFixture::new();
        let harness = build_engine(&fixture);

        let inserted = harness
            .rules
            .insert_rule(rule_with_action(fixture.board_id, set_color_action()))
            .await;
        assert!(inserted.is_ok());

        let digest = harness
            .engine
            .on_activity(&added_label_event(fixture.board_id, "label-urgent"))
            .await;
        assert!(digest.is_ok());

        let digest = digest.unwrap_or_else(|_| unreachable!());
        assert_eq!(digest.matched, 1);
        assert_eq!(digest.effects.len(), 1);
        assert!(digest.failures.is_empty());
        assert_eq!(
            harness.gateway.calls().await,
            vec!["set_card_color card-1 red".to_owned()]
        );
    }

    #[tokio::test]
    async fn non_matching_label_dispatches_nothing() {
        let fixture = BoardFixture::new();
        let harness = build_engine(&fixture);

        let inserted = harness
            .rules
            .insert_rule(rule_with_action(fixture.board_id, set_color_action()))
            .await;
        assert!(inserted.is_ok());

        let digest = harness
            .engine
            .on_activity(&added_label_event(fixture.board_id, "label-other"))
            .await;
        assert!(digest.is_ok());

        let digest = digest.unwrap_or_else(|_| unreachable!());
        assert_eq!(digest.matched, 0);
        assert!(digest.effects.is_empty());
        assert!(harness.gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn failed_dispatch_does_not_block_sibling_rules() {
        let fixture = BoardFixture::new();
        let harness = build_engine(&fixture);

        // First rule targets a list that does not exist, second one is fine.
        let mut broken = rule_with_action(
            fixture.board_id,
            ActionSpec::Board(BoardAction::MoveCard {
                position: BoardPosition::Top,
                list_name: "Nowhere".to_owned(),
                swimlane_name: None,
                board_name: None,
            }),
        );
        let mut working = rule_with_action(fixture.board_id, set_color_action());
        broken.created_at = working.created_at - chrono::Duration::seconds(1);
        broken.updated_at = broken.created_at;

        assert!(harness.rules.insert_rule(broken.clone()).await.is_ok());
        assert!(harness.rules.insert_rule(working).await.is_ok());

        let digest = harness
            .engine
            .on_activity(&added_label_event(fixture.board_id, "label-urgent"))
            .await;
        assert!(digest.is_ok());

        let digest = digest.unwrap_or_else(|_| unreachable!());
        assert_eq!(digest.matched, 2);
        assert_eq!(digest.effects.len(), 1);
        assert_eq!(digest.failures.len(), 1);
        assert_eq!(digest.failures[0].rule_id, broken.rule_id);
        assert_eq!(
            harness.gateway.calls().await,
            vec!["set_card_color card-1 red".to_owned()]
        );

        let audit_actions: Vec<AuditAction> = harness
            .audit
            .events
            .lock()
            .await
            .iter()
            .map(|event| event.action)
            .collect();
        assert!(audit_actions.contains(&AuditAction::RuleDispatchFailed));
        assert!(audit_actions.contains(&AuditAction::ActivityProcessed));
    }

    #[tokio::test]
    async fn disabled_rules_are_never_matched() {
        let fixture = BoardFixture::new();
        let harness = build_engine(&fixture);

        let mut rule = rule_with_action(fixture.board_id, set_color_action());
        rule.definition = serde_json::from_value(json!({
            "title": "test rule",
            "author_subject": "alice",
            "trigger": serde_json::to_value(rule.definition.trigger()).unwrap_or_default(),
            "action": serde_json::to_value(rule.definition.action()).unwrap_or_default(),
            "is_enabled": false
        }))
        .unwrap_or_else(|_| unreachable!());

        assert!(harness.rules.insert_rule(rule).await.is_ok());

        let digest = harness
            .engine
            .on_activity(&added_label_event(fixture.board_id, "label-urgent"))
            .await;
        assert!(digest.is_ok());
        assert_eq!(digest.unwrap_or_else(|_| unreachable!()).matched, 0);
        assert!(harness.gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_trigger_reports_and_spares_siblings() {
        let fixture = BoardFixture::new();
        let harness = build_engine(&fixture);

        let mut malformed = rule_with_action(fixture.board_id, set_color_action());
        malformed.definition = serde_json::from_value(json!({
            "title": "junk operator",
            "author_subject": "alice",
            "trigger": {
                "activity_type": "added_label",
                "actor_subject": "*",
                "conditions": [
                    {"field": "label_id", "operator": "regex", "value": "label-urgent"}
                ]
            },
            "action": serde_json::to_value(set_color_action()).unwrap_or_default(),
            "is_enabled": true
        }))
        .unwrap_or_else(|_| unreachable!());

        let mut working = rule_with_action(fixture.board_id, set_color_action());
        working.created_at = malformed.created_at + chrono::Duration::seconds(1);
        working.updated_at = working.created_at;

        assert!(harness.rules.insert_rule(malformed).await.is_ok());
        assert!(harness.rules.insert_rule(working).await.is_ok());

        let digest = harness
            .engine
            .on_activity(&added_label_event(fixture.board_id, "label-urgent"))
            .await;
        assert!(digest.is_ok());

        let digest = digest.unwrap_or_else(|_| unreachable!());
        assert_eq!(digest.diagnostics.len(), 1);
        assert_eq!(digest.matched, 1);
        assert_eq!(digest.effects.len(), 1);

        let audit_actions: Vec<AuditAction> = harness
            .audit
            .events
            .lock()
            .await
            .iter()
            .map(|event| event.action)
            .collect();
        assert!(audit_actions.contains(&AuditAction::RuleTriggerMalformed));
    }

    #[tokio::test]
    async fn rules_from_other_boards_are_ignored() {
        let fixture = BoardFixture::new();
        let harness = build_engine(&fixture);

        let inserted = harness
            .rules
            .insert_rule(rule_with_action(
                fixture.archive_board_id,
                set_color_action(),
            ))
            .await;
        assert!(inserted.is_ok());

        let digest = harness
            .engine
            .on_activity(&added_label_event(fixture.board_id, "label-urgent"))
            .await;
        assert!(digest.is_ok());
        assert_eq!(digest.unwrap_or_else(|_| unreachable!()).matched, 0);
    }
}
