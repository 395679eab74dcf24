use std::sync::Arc;

use cardflow_core::{AppError, AppResult, BoardId};
use cardflow_domain::{
    ActionSpec, ActivityEvent, BoardAction, CardAction, CardDateOp, ChecklistAction, MailAction,
};
use chrono::Utc;

use crate::{AuthorizationService, BoardGateway, MailService, ResolvedCardMove, Rule};

/// Record of one successfully dispatched rule action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEffect {
    /// Rule that fired.
    pub rule_id: String,
    /// Human-readable description of the side effect.
    pub summary: String,
}

/// Application service that executes one rule action against collaborators.
///
/// The dispatcher authorizes the rule's author, resolves named targets to
/// ids, and hands one fully-resolved command to the board gateway or mailer.
/// It never creates missing targets, with the single exception of an
/// add-swimlane action.
#[derive(Clone)]
pub struct ActionDispatchService {
    authorization_service: AuthorizationService,
    board_gateway: Arc<dyn BoardGateway>,
    mail_service: Arc<dyn MailService>,
}

impl ActionDispatchService {
    /// Creates a dispatch service.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        board_gateway: Arc<dyn BoardGateway>,
        mail_service: Arc<dyn MailService>,
    ) -> Self {
        Self {
            authorization_service,
            board_gateway,
            mail_service,
        }
    }

    /// Executes the rule's action for one matched event.
    ///
    /// Failures come back as values for the engine to record; an action that
    /// begins executing runs to completion or failure, with no retry here.
    pub async fn execute(&self, rule: &Rule, event: &ActivityEvent) -> AppResult<DispatchEffect> {
        let author = rule.definition.author_subject().as_str();
        self.authorization_service
            .require_permission(
                rule.board_id,
                author,
                rule.definition.action().required_permission(),
            )
            .await?;

        let summary = match rule.definition.action() {
            ActionSpec::Board(action) => self.execute_board_action(action, event).await?,
            ActionSpec::Card(action) => self.execute_card_action(action, event).await?,
            ActionSpec::Checklist(action) => self.execute_checklist_action(action, event).await?,
            ActionSpec::Mail(action) => self.execute_mail_action(action).await?,
        };

        Ok(DispatchEffect {
            rule_id: rule.rule_id.clone(),
            summary,
        })
    }

    async fn execute_board_action(
        &self,
        action: &BoardAction,
        event: &ActivityEvent,
    ) -> AppResult<String> {
        match action {
            BoardAction::MoveCard {
                position,
                list_name,
                swimlane_name,
                board_name,
            } => {
                let card_id = require_event_card(event)?;
                let board_id = self
                    .resolve_board(board_name.as_deref(), event.board_id())
                    .await?;
                let list_id = self.resolve_list(board_id, list_name).await?;
                let swimlane_id = self
                    .resolve_swimlane(board_id, swimlane_name.as_deref())
                    .await?;

                self.board_gateway
                    .move_card(ResolvedCardMove {
                        card_id: card_id.to_owned(),
                        board_id,
                        list_id,
                        swimlane_id,
                        position: *position,
                    })
                    .await?;

                Ok(format!(
                    "moved card '{card_id}' to {} of list '{list_name}'",
                    position.as_str()
                ))
            }
            BoardAction::AddSwimlane { swimlane_name } => {
                let swimlane_id = self
                    .board_gateway
                    .create_swimlane(event.board_id(), swimlane_name)
                    .await?;
                Ok(format!("created swimlane '{swimlane_name}' ({swimlane_id})"))
            }
            BoardAction::ArchiveCard => {
                let card_id = require_event_card(event)?;
                self.board_gateway.archive_card(card_id).await?;
                Ok(format!("archived card '{card_id}'"))
            }
            BoardAction::RestoreCard => {
                let card_id = require_event_card(event)?;
                self.board_gateway.restore_card(card_id).await?;
                Ok(format!("restored card '{card_id}'"))
            }
            BoardAction::CreateCard {
                list_name,
                card_title,
            } => {
                let board_id = event.board_id();
                let list_id = self.resolve_list(board_id, list_name).await?;
                let swimlane_id = self.resolve_swimlane(board_id, None).await?;
                let card_id = self
                    .board_gateway
                    .create_card(board_id, list_id.as_str(), swimlane_id.as_str(), card_title)
                    .await?;
                Ok(format!("created card '{card_id}' in list '{list_name}'"))
            }
            BoardAction::LinkCard {
                board_name,
                list_name,
            } => {
                let card_id = require_event_card(event)?;
                let board_id = self
                    .resolve_board(Some(board_name.as_str()), event.board_id())
                    .await?;
                let list_id = self.resolve_list(board_id, list_name).await?;
                self.board_gateway
                    .link_card(card_id, board_id, list_id.as_str())
                    .await?;
                Ok(format!(
                    "linked card '{card_id}' into list '{list_name}' on board '{board_name}'"
                ))
            }
        }
    }

    async fn execute_card_action(
        &self,
        action: &CardAction,
        event: &ActivityEvent,
    ) -> AppResult<String> {
        let card_id = require_event_card(event)?;

        match action {
            CardAction::SetDate { field, op } => {
                let value = match op {
                    CardDateOp::Set => Some(Utc::now()),
                    CardDateOp::Remove => None,
                };
                self.board_gateway
                    .set_card_date(card_id, *field, value)
                    .await?;
                Ok(format!(
                    "{} '{}' on card '{card_id}'",
                    if value.is_some() { "stamped" } else { "cleared" },
                    field.as_str()
                ))
            }
            CardAction::AddLabel { label_id } => {
                self.board_gateway.add_card_label(card_id, label_id).await?;
                Ok(format!("added label '{label_id}' to card '{card_id}'"))
            }
            CardAction::RemoveLabel { label_id } => {
                self.board_gateway
                    .remove_card_label(card_id, label_id)
                    .await?;
                Ok(format!("removed label '{label_id}' from card '{card_id}'"))
            }
            CardAction::RemoveAllLabels => {
                self.board_gateway.clear_card_labels(card_id).await?;
                Ok(format!("removed all labels from card '{card_id}'"))
            }
            CardAction::AddMember { username } => {
                let subject = self.resolve_member(event.board_id(), username).await?;
                self.board_gateway
                    .add_card_member(card_id, subject.as_str())
                    .await?;
                Ok(format!("added member '{username}' to card '{card_id}'"))
            }
            CardAction::RemoveMember { username } => {
                let subject = self.resolve_member(event.board_id(), username).await?;
                self.board_gateway
                    .remove_card_member(card_id, subject.as_str())
                    .await?;
                Ok(format!("removed member '{username}' from card '{card_id}'"))
            }
            CardAction::RemoveAllMembers => {
                self.board_gateway.clear_card_members(card_id).await?;
                Ok(format!("removed all members from card '{card_id}'"))
            }
            CardAction::SetColor { color } => {
                self.board_gateway.set_card_color(card_id, *color).await?;
                Ok(format!(
                    "set color '{}' on card '{card_id}'",
                    color.as_str()
                ))
            }
        }
    }

    async fn execute_checklist_action(
        &self,
        action: &ChecklistAction,
        event: &ActivityEvent,
    ) -> AppResult<String> {
        let card_id = require_event_card(event)?;

        match action {
            ChecklistAction::AddChecklist { checklist_name } => {
                self.board_gateway
                    .add_checklist(card_id, checklist_name)
                    .await?;
                Ok(format!(
                    "added checklist '{checklist_name}' to card '{card_id}'"
                ))
            }
            ChecklistAction::RemoveChecklist { checklist_name } => {
                self.board_gateway
                    .remove_checklist(card_id, checklist_name)
                    .await?;
                Ok(format!(
                    "removed checklist '{checklist_name}' from card '{card_id}'"
                ))
            }
            ChecklistAction::CheckAllItems => {
                self.board_gateway
                    .set_all_checklist_items(card_id, true)
                    .await?;
                Ok(format!("checked all items on card '{card_id}'"))
            }
            ChecklistAction::UncheckAllItems => {
                self.board_gateway
                    .set_all_checklist_items(card_id, false)
                    .await?;
                Ok(format!("unchecked all items on card '{card_id}'"))
            }
            ChecklistAction::CheckItem { item_name } => {
                self.board_gateway
                    .set_checklist_item(card_id, item_name, true)
                    .await?;
                Ok(format!("checked item '{item_name}' on card '{card_id}'"))
            }
            ChecklistAction::UncheckItem { item_name } => {
                self.board_gateway
                    .set_checklist_item(card_id, item_name, false)
                    .await?;
                Ok(format!("unchecked item '{item_name}' on card '{card_id}'"))
            }
        }
    }

    async fn execute_mail_action(&self, action: &MailAction) -> AppResult<String> {
        let MailAction::Send {
            to,
            subject,
            message,
        } = action;

        // Creation-time validation already guarantees these; a record that
        // bypassed it must not reach the mailer half-filled.
        if to.trim().is_empty() || subject.trim().is_empty() {
            return Err(AppError::Validation(
                "mail action is missing recipient or subject".to_owned(),
            ));
        }

        self.mail_service.send_mail(to, subject, message).await?;
        Ok(format!("sent mail '{subject}' to '{to}'"))
    }

    async fn resolve_board(
        &self,
        board_name: Option<&str>,
        event_board: BoardId,
    ) -> AppResult<BoardId> {
        let Some(name) = board_name else {
            return Ok(event_board);
        };

        self.board_gateway
            .find_board_id(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("board '{name}' could not be resolved")))
    }

    async fn resolve_list(&self, board_id: BoardId, list_name: &str) -> AppResult<String> {
        self.board_gateway
            .find_list_id(board_id, list_name)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "list '{list_name}' could not be resolved on board '{board_id}'"
                ))
            })
    }

    async fn resolve_swimlane(
        &self,
        board_id: BoardId,
        swimlane_name: Option<&str>,
    ) -> AppResult<String> {
        if let Some(name) = swimlane_name
            && let Some(swimlane_id) = self.board_gateway.find_swimlane_id(board_id, name).await?
        {
            return Ok(swimlane_id);
        }

        self.board_gateway
            .default_swimlane_id(board_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("board '{board_id}' has no default swimlane"))
            })
    }

    async fn resolve_member(&self, board_id: BoardId, username: &str) -> AppResult<String> {
        self.board_gateway
            .find_member_subject(board_id, username)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "member '{username}' could not be resolved on board '{board_id}'"
                ))
            })
    }
}

fn require_event_card(event: &ActivityEvent) -> AppResult<&str> {
    event.card_id().ok_or_else(|| {
        AppError::Validation(format!(
            "activity '{}' carries no card to act on",
            event.activity_type().as_str()
        ))
    })
}

#[cfg(test)]
mod tests {
    use cardflow_domain::{ActionSpec, ActivityType, BoardAction, BoardPosition, CardAction};
    use serde_json::json;

    use crate::test_support::{
        added_label_event, build_dispatcher, rule_with_action, BoardFixture,
    };

    #[tokio::test]
    async fn move_card_falls_back_to_default_swimlane() {
        let fixture = BoardFixture::new();
        let (dispatcher, gateway, _mailer) = build_dispatcher(&fixture);

        let rule = rule_with_action(
            fixture.board_id,
            ActionSpec::Board(BoardAction::MoveCard {
                position: BoardPosition::Top,
                list_name: "Done".to_owned(),
                swimlane_name: Some("No Such Lane".to_owned()),
                board_name: None,
            }),
        );
        let event = added_label_event(fixture.board_id, "label-urgent");

        let result = dispatcher.execute(&rule, &event).await;
        assert!(result.is_ok());

        let calls = gateway.calls().await;
        assert_eq!(
            calls,
            vec![format!(
                "move_card card-1 {} list-done lane-default top",
                fixture.board_id
            )]
        );
    }

    #[tokio::test]
    async fn unresolved_list_is_a_target_not_found_failure() {
        let fixture = BoardFixture::new();
        let (dispatcher, gateway, _mailer) = build_dispatcher(&fixture);

        let rule = rule_with_action(
            fixture.board_id,
            ActionSpec::Board(BoardAction::MoveCard {
                position: BoardPosition::Bottom,
                list_name: "Nowhere".to_owned(),
                swimlane_name: None,
                board_name: None,
            }),
        );
        let event = added_label_event(fixture.board_id, "label-urgent");

        let result = dispatcher.execute(&rule, &event).await;
        assert!(matches!(
            result,
            Err(cardflow_core::AppError::NotFound(_))
        ));
        assert!(gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn unauthorized_author_skips_the_action() {
        let fixture = BoardFixture::new();
        let (dispatcher, gateway, _mailer) = build_dispatcher(&fixture);

        let mut rule = rule_with_action(
            fixture.board_id,
            ActionSpec::Card(CardAction::RemoveAllLabels),
        );
        rule.definition = rule
            .definition
            .apply_patch(Default::default(), "comment-only-carol")
            .unwrap_or_else(|_| unreachable!());
        let event = added_label_event(fixture.board_id, "label-urgent");

        let result = dispatcher.execute(&rule, &event).await;
        assert!(matches!(
            result,
            Err(cardflow_core::AppError::Forbidden(_))
        ));
        assert!(gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn member_action_resolves_username_to_subject() {
        let fixture = BoardFixture::new();
        let (dispatcher, gateway, _mailer) = build_dispatcher(&fixture);

        let rule = rule_with_action(
            fixture.board_id,
            ActionSpec::Card(CardAction::AddMember {
                username: "bob".to_owned(),
            }),
        );
        let event = added_label_event(fixture.board_id, "label-urgent");

        let result = dispatcher.execute(&rule, &event).await;
        assert!(result.is_ok());
        assert_eq!(
            gateway.calls().await,
            vec!["add_card_member card-1 subject-bob".to_owned()]
        );
    }

    #[tokio::test]
    async fn mail_dispatch_double_checks_recipients() {
        let fixture = BoardFixture::new();
        let (dispatcher, _gateway, mailer) = build_dispatcher(&fixture);

        // Forged through serde to sidestep creation-time validation.
        let action: ActionSpec = serde_json::from_value(json!({
            "category": "mail",
            "type": "send",
            "to": "",
            "subject": "hello",
            "message": "body"
        }))
        .unwrap_or_else(|_| unreachable!());
        let rule = rule_with_action(fixture.board_id, action);
        let event = added_label_event(fixture.board_id, "label-urgent");

        let result = dispatcher.execute(&rule, &event).await;
        assert!(matches!(
            result,
            Err(cardflow_core::AppError::Validation(_))
        ));
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn card_action_without_event_card_fails_cleanly() {
        let fixture = BoardFixture::new();
        let (dispatcher, gateway, _mailer) = build_dispatcher(&fixture);

        let rule = rule_with_action(
            fixture.board_id,
            ActionSpec::Card(CardAction::RemoveAllMembers),
        );
        let mut event = added_label_event(fixture.board_id, "label-urgent");
        event = crate::test_support::without_card(event, ActivityType::SetDueDate);

        let result = dispatcher.execute(&rule, &event).await;
        assert!(result.is_err());
        assert!(gateway.calls().await.is_empty());
    }
}
