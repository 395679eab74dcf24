use cardflow_core::{AppError, AppResult, BoardId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Board activity kinds that can trigger rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// A card was created in a list.
    CreateCard,
    /// A card moved between lists or swimlanes.
    MoveCard,
    /// A card was archived.
    ArchivedCard,
    /// A card was restored from the archive.
    RestoredCard,
    /// A label was attached to a card.
    AddedLabel,
    /// A label was detached from a card.
    RemovedLabel,
    /// A member joined a card.
    JoinedMember,
    /// A member was removed from a card.
    RemovedMember,
    /// A checklist item was checked.
    CheckedItem,
    /// A checklist item was unchecked.
    UncheckedItem,
    /// A checklist was added to a card.
    AddedChecklist,
    /// A checklist was removed from a card.
    RemovedChecklist,
    /// A comment was posted on a card.
    AddComment,
    /// A due date was set on a card.
    SetDueDate,
    /// An attachment was added to a card.
    AddedAttachment,
}

impl ActivityType {
    /// Returns a stable storage value for this activity type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateCard => "create_card",
            Self::MoveCard => "move_card",
            Self::ArchivedCard => "archived_card",
            Self::RestoredCard => "restored_card",
            Self::AddedLabel => "added_label",
            Self::RemovedLabel => "removed_label",
            Self::JoinedMember => "joined_member",
            Self::RemovedMember => "removed_member",
            Self::CheckedItem => "checked_item",
            Self::UncheckedItem => "unchecked_item",
            Self::AddedChecklist => "added_checklist",
            Self::RemovedChecklist => "removed_checklist",
            Self::AddComment => "add_comment",
            Self::SetDueDate => "set_due_date",
            Self::AddedAttachment => "added_attachment",
        }
    }
}

/// One recorded board mutation delivered by the activity source.
///
/// The engine only reads events; it never persists or mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    activity_type: ActivityType,
    board_id: BoardId,
    actor_subject: String,
    card_id: Option<String>,
    list_id: Option<String>,
    swimlane_id: Option<String>,
    occurred_at: DateTime<Utc>,
    data: Value,
}

/// Input payload for constructing one activity event.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEventInput {
    /// Activity kind.
    pub activity_type: ActivityType,
    /// Board the mutation happened on.
    pub board_id: BoardId,
    /// Subject of the user who caused the mutation.
    pub actor_subject: String,
    /// Optional card the mutation touched.
    pub card_id: Option<String>,
    /// Optional list the mutation touched.
    pub list_id: Option<String>,
    /// Optional swimlane the mutation touched.
    pub swimlane_id: Option<String>,
    /// Time the mutation was recorded.
    pub occurred_at: DateTime<Utc>,
    /// Free-form payload fields referenced by trigger conditions.
    pub data: Value,
}

impl ActivityEvent {
    /// Creates a validated activity event.
    pub fn new(input: ActivityEventInput) -> AppResult<Self> {
        let ActivityEventInput {
            activity_type,
            board_id,
            actor_subject,
            card_id,
            list_id,
            swimlane_id,
            occurred_at,
            data,
        } = input;

        if actor_subject.trim().is_empty() {
            return Err(AppError::Validation(
                "activity event actor_subject must not be empty".to_owned(),
            ));
        }

        if !data.is_object() && !data.is_null() {
            return Err(AppError::Validation(
                "activity event data must be a JSON object when present".to_owned(),
            ));
        }

        Ok(Self {
            activity_type,
            board_id,
            actor_subject,
            card_id,
            list_id,
            swimlane_id,
            occurred_at,
            data,
        })
    }

    /// Returns the activity kind.
    #[must_use]
    pub fn activity_type(&self) -> ActivityType {
        self.activity_type
    }

    /// Returns the board the event happened on.
    #[must_use]
    pub fn board_id(&self) -> BoardId {
        self.board_id
    }

    /// Returns the subject of the acting user.
    #[must_use]
    pub fn actor_subject(&self) -> &str {
        self.actor_subject.as_str()
    }

    /// Returns the card the event touched, when applicable.
    #[must_use]
    pub fn card_id(&self) -> Option<&str> {
        self.card_id.as_deref()
    }

    /// Returns the list the event touched, when applicable.
    #[must_use]
    pub fn list_id(&self) -> Option<&str> {
        self.list_id.as_deref()
    }

    /// Returns the swimlane the event touched, when applicable.
    #[must_use]
    pub fn swimlane_id(&self) -> Option<&str> {
        self.swimlane_id.as_deref()
    }

    /// Returns the time the event was recorded.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Returns the free-form payload object.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Resolves a named field against the event.
    ///
    /// Structural fields win over payload fields of the same name; a field
    /// absent on this activity type resolves to `None`, never an error.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "activity_type" => Some(Value::String(self.activity_type.as_str().to_owned())),
            "board_id" => Some(Value::String(self.board_id.to_string())),
            "user_id" | "actor_subject" => Some(Value::String(self.actor_subject.clone())),
            "card_id" => self.card_id.clone().map(Value::String),
            "list_id" => self.list_id.clone().map(Value::String),
            "swimlane_id" => self.swimlane_id.clone().map(Value::String),
            other => self
                .data
                .as_object()
                .and_then(|object| object.get(other))
                .cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use cardflow_core::BoardId;
    use chrono::Utc;
    use serde_json::json;

    use super::{ActivityEvent, ActivityEventInput, ActivityType};

    fn label_event() -> ActivityEventInput {
        ActivityEventInput {
            activity_type: ActivityType::AddedLabel,
            board_id: BoardId::new(),
            actor_subject: "alice".to_owned(),
            card_id: Some("card-1".to_owned()),
            list_id: None,
            swimlane_id: None,
            occurred_at: Utc::now(),
            data: json!({"label_id": "label-urgent"}),
        }
    }

    #[test]
    fn event_requires_actor_subject() {
        let mut input = label_event();
        input.actor_subject = "  ".to_owned();
        assert!(ActivityEvent::new(input).is_err());
    }

    #[test]
    fn event_rejects_non_object_data() {
        let mut input = label_event();
        input.data = json!(["not", "an", "object"]);
        assert!(ActivityEvent::new(input).is_err());
    }

    #[test]
    fn field_resolves_structural_then_payload() {
        let event = ActivityEvent::new(label_event()).unwrap_or_else(|_| unreachable!());

        assert_eq!(event.field("card_id"), Some(json!("card-1")));
        assert_eq!(event.field("label_id"), Some(json!("label-urgent")));
        assert_eq!(event.field("no_such_field"), None);
    }
}
