//! Shared port fakes for application service tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cardflow_core::{AppError, AppResult, BoardId};
use cardflow_domain::{
    ActionSpec, ActivityEvent, ActivityEventInput, ActivityType, BoardRole, CardColor,
    CardDateField, RuleDefinition,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::Mutex;

use crate::{
    ActionDispatchService, AuditEvent, AuditRepository, AuthorizationService, BoardGateway,
    MailService, ResolvedCardMove, RoleAssignment, RoleRepository, Rule, RuleRepository,
};

/// Known names on the fixture board: lists `Done`/`QA`, swimlane `Express`,
/// default swimlane `lane-default`, member `bob`, sibling board `Archive`.
pub(crate) struct BoardFixture {
    pub board_id: BoardId,
    pub archive_board_id: BoardId,
}

impl BoardFixture {
    pub fn new() -> Self {
        Self {
            board_id: BoardId::new(),
            archive_board_id: BoardId::new(),
        }
    }
}

pub(crate) struct RecordingBoardGateway {
    boards: HashMap<String, BoardId>,
    lists: HashMap<(BoardId, String), String>,
    swimlanes: HashMap<(BoardId, String), String>,
    default_swimlanes: HashMap<BoardId, String>,
    members: HashMap<(BoardId, String), String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingBoardGateway {
    pub fn new(fixture: &BoardFixture) -> Self {
        Self {
            boards: HashMap::from([("Archive".to_owned(), fixture.archive_board_id)]),
            lists: HashMap::from([
                ((fixture.board_id, "Done".to_owned()), "list-done".to_owned()),
                ((fixture.board_id, "QA".to_owned()), "list-qa".to_owned()),
                (
                    (fixture.archive_board_id, "Inbox".to_owned()),
                    "list-inbox".to_owned(),
                ),
            ]),
            swimlanes: HashMap::from([(
                (fixture.board_id, "Express".to_owned()),
                "lane-express".to_owned(),
            )]),
            default_swimlanes: HashMap::from([
                (fixture.board_id, "lane-default".to_owned()),
                (fixture.archive_board_id, "lane-archive".to_owned()),
            ]),
            members: HashMap::from([(
                (fixture.board_id, "bob".to_owned()),
                "subject-bob".to_owned(),
            )]),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl BoardGateway for RecordingBoardGateway {
    async fn find_board_id(&self, board_name: &str) -> AppResult<Option<BoardId>> {
        Ok(self.boards.get(board_name).copied())
    }

    async fn find_list_id(&self, board_id: BoardId, list_name: &str) -> AppResult<Option<String>> {
        Ok(self.lists.get(&(board_id, list_name.to_owned())).cloned())
    }

    async fn find_swimlane_id(
        &self,
        board_id: BoardId,
        swimlane_name: &str,
    ) -> AppResult<Option<String>> {
        Ok(self
            .swimlanes
            .get(&(board_id, swimlane_name.to_owned()))
            .cloned())
    }

    async fn default_swimlane_id(&self, board_id: BoardId) -> AppResult<Option<String>> {
        Ok(self.default_swimlanes.get(&board_id).cloned())
    }

    async fn find_member_subject(
        &self,
        board_id: BoardId,
        username: &str,
    ) -> AppResult<Option<String>> {
        Ok(self.members.get(&(board_id, username.to_owned())).cloned())
    }

    async fn create_swimlane(&self, board_id: BoardId, swimlane_name: &str) -> AppResult<String> {
        self.record(format!("create_swimlane {board_id} {swimlane_name}"))
            .await;
        Ok("lane-new".to_owned())
    }

    async fn move_card(&self, command: ResolvedCardMove) -> AppResult<()> {
        self.record(format!(
            "move_card {} {} {} {} {}",
            command.card_id,
            command.board_id,
            command.list_id,
            command.swimlane_id,
            command.position.as_str()
        ))
        .await;
        Ok(())
    }

    async fn archive_card(&self, card_id: &str) -> AppResult<()> {
        self.record(format!("archive_card {card_id}")).await;
        Ok(())
    }

    async fn restore_card(&self, card_id: &str) -> AppResult<()> {
        self.record(format!("restore_card {card_id}")).await;
        Ok(())
    }

    async fn create_card(
        &self,
        board_id: BoardId,
        list_id: &str,
        swimlane_id: &str,
        card_title: &str,
    ) -> AppResult<String> {
        self.record(format!(
            "create_card {board_id} {list_id} {swimlane_id} {card_title}"
        ))
        .await;
        Ok("card-new".to_owned())
    }

    async fn link_card(&self, card_id: &str, board_id: BoardId, list_id: &str) -> AppResult<()> {
        self.record(format!("link_card {card_id} {board_id} {list_id}"))
            .await;
        Ok(())
    }

    async fn set_card_date(
        &self,
        card_id: &str,
        field: CardDateField,
        value: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        self.record(format!(
            "set_card_date {card_id} {} {}",
            field.as_str(),
            if value.is_some() { "now" } else { "clear" }
        ))
        .await;
        Ok(())
    }

    async fn add_card_label(&self, card_id: &str, label_id: &str) -> AppResult<()> {
        self.record(format!("add_card_label {card_id} {label_id}"))
            .await;
        Ok(())
    }

    async fn remove_card_label(&self, card_id: &str, label_id: &str) -> AppResult<()> {
        self.record(format!("remove_card_label {card_id} {label_id}"))
            .await;
        Ok(())
    }

    async fn clear_card_labels(&self, card_id: &str) -> AppResult<()> {
        self.record(format!("clear_card_labels {card_id}")).await;
        Ok(())
    }

    async fn add_card_member(&self, card_id: &str, subject: &str) -> AppResult<()> {
        self.record(format!("add_card_member {card_id} {subject}"))
            .await;
        Ok(())
    }

    async fn remove_card_member(&self, card_id: &str, subject: &str) -> AppResult<()> {
        self.record(format!("remove_card_member {card_id} {subject}"))
            .await;
        Ok(())
    }

    async fn clear_card_members(&self, card_id: &str) -> AppResult<()> {
        self.record(format!("clear_card_members {card_id}")).await;
        Ok(())
    }

    async fn set_card_color(&self, card_id: &str, color: CardColor) -> AppResult<()> {
        self.record(format!("set_card_color {card_id} {}", color.as_str()))
            .await;
        Ok(())
    }

    async fn add_checklist(&self, card_id: &str, checklist_name: &str) -> AppResult<()> {
        self.record(format!("add_checklist {card_id} {checklist_name}"))
            .await;
        Ok(())
    }

    async fn remove_checklist(&self, card_id: &str, checklist_name: &str) -> AppResult<()> {
        self.record(format!("remove_checklist {card_id} {checklist_name}"))
            .await;
        Ok(())
    }

    async fn set_checklist_item(
        &self,
        card_id: &str,
        item_name: &str,
        checked: bool,
    ) -> AppResult<()> {
        self.record(format!("set_checklist_item {card_id} {item_name} {checked}"))
            .await;
        Ok(())
    }

    async fn set_all_checklist_items(&self, card_id: &str, checked: bool) -> AppResult<()> {
        self.record(format!("set_all_checklist_items {card_id} {checked}"))
            .await;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingMailService {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailService {
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MailService for RecordingMailService {
    async fn send_mail(&self, to: &str, subject: &str, _body: &str) -> AppResult<()> {
        self.sent
            .lock()
            .await
            .push((to.to_owned(), subject.to_owned()));
        Ok(())
    }
}

/// Fixed role table: `alice` administers every board, `comment-only-carol`
/// may only comment, everyone else is unassigned.
pub(crate) struct StaticRoleRepository;

#[async_trait]
impl RoleRepository for StaticRoleRepository {
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
        let role = match subject {
            "alice" => Some(BoardRole::BoardAdmin),
            "comment-only-carol" => Some(BoardRole::CommentOnly),
            _ => None,
        };

        Ok(role.map(|role| RoleAssignment {
            board_id,
            subject: subject.to_owned(),
            role,
            assigned_at: Utc::now(),
        }))
    }

    async fn list_assignments(&self, _board_id: BoardId) -> AppResult<Vec<RoleAssignment>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub(crate) struct MemoryRuleRepository {
    rules: Mutex<HashMap<String, Rule>>,
}

#[async_trait]
impl RuleRepository for MemoryRuleRepository {
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
        Ok(self
            .rules
            .lock()
            .await
            .values()
            .filter(|rule| rule.board_id == board_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct MemoryAuditRepository {
    pub events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for MemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

pub(crate) fn build_dispatcher(
    fixture: &BoardFixture,
) -> (
    ActionDispatchService,
    Arc<RecordingBoardGateway>,
    Arc<RecordingMailService>,
) {
    let gateway = Arc::new(RecordingBoardGateway::new(fixture));
    let mailer = Arc::new(RecordingMailService::default());
    let dispatcher = ActionDispatchService::new(
        AuthorizationService::new(Arc::new(StaticRoleRepository)),
        gateway.clone(),
        mailer.clone(),
    );
    (dispatcher, gateway, mailer)
}

/// Builds a stored rule around an action, forged through serde so tests can
/// also carry payloads that creation-time validation would reject.
pub(crate) fn rule_with_action(board_id: BoardId, action: ActionSpec) -> Rule {
    let definition: RuleDefinition = serde_json::from_value(json!({
        "title": "test rule",
        "author_subject": "alice",
        "trigger": {
            "activity_type": "added_label",
            "actor_subject": "*",
            "conditions": [
                {"field": "label_id", "operator": "equals", "value": "label-urgent"}
            ]
        },
        "action": serde_json::to_value(&action).unwrap_or_default(),
        "is_enabled": true
    }))
    .unwrap_or_else(|_| unreachable!());

    let now = Utc::now();
    Rule {
        rule_id: uuid::Uuid::new_v4().to_string(),
        board_id,
        definition,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn added_label_event(board_id: BoardId, label_id: &str) -> ActivityEvent {
    ActivityEvent::new(ActivityEventInput {
        activity_type: ActivityType::AddedLabel,
        board_id,
        actor_subject: "dave".to_owned(),
        card_id: Some("card-1".to_owned()),
        list_id: None,
        swimlane_id: None,
        occurred_at: Utc::now(),
        data: json!({"label_id": label_id}),
    })
    .unwrap_or_else(|_| unreachable!())
}

/// Rebuilds an event without a card, under a different activity type.
pub(crate) fn without_card(event: ActivityEvent, activity_type: ActivityType) -> ActivityEvent {
    ActivityEvent::new(ActivityEventInput {
        activity_type,
        board_id: event.board_id(),
        actor_subject: event.actor_subject().to_owned(),
        card_id: None,
        list_id: None,
        swimlane_id: None,
        occurred_at: event.occurred_at(),
        data: event.data().clone(),
    })
    .unwrap_or_else(|_| unreachable!())
}
