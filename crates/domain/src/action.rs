use std::str::FromStr;

use cardflow_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::security::Permission;

/// Action categories over which dispatch is exhaustively matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    /// Actions that rearrange cards across boards, lists and swimlanes.
    Board,
    /// Actions that mutate fields of a single card.
    Card,
    /// Actions that mutate checklists on a card.
    Checklist,
    /// Actions that send mail.
    Mail,
}

impl ActionCategory {
    /// Returns a stable storage value for this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Board => "board-action",
            Self::Card => "card-action",
            Self::Checklist => "checklist-action",
            Self::Mail => "mail-action",
        }
    }
}

/// Vertical placement for moved or created cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardPosition {
    /// Insert at the top of the target list.
    Top,
    /// Insert at the bottom of the target list.
    Bottom,
}

impl BoardPosition {
    /// Returns a stable storage value for this position.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

/// Card date fields addressable by date actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardDateField {
    /// When work on the card starts.
    Start,
    /// When the card is due.
    Due,
    /// When work on the card ended.
    End,
    /// When the card was received.
    Received,
}

impl CardDateField {
    /// Returns a stable storage value for this date field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start_at",
            Self::Due => "due_at",
            Self::End => "end_at",
            Self::Received => "received_at",
        }
    }
}

/// Whether a date action stamps the current time or clears the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardDateOp {
    /// Set the field to the dispatch time.
    Set,
    /// Clear the field.
    Remove,
}

/// Card display colors accepted by set-color actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardColor {
    /// White card front.
    White,
    /// Green card front.
    Green,
    /// Yellow card front.
    Yellow,
    /// Orange card front.
    Orange,
    /// Red card front.
    Red,
    /// Purple card front.
    Purple,
    /// Blue card front.
    Blue,
    /// Sky-blue card front.
    Sky,
    /// Lime card front.
    Lime,
    /// Pink card front.
    Pink,
    /// Black card front.
    Black,
    /// Silver card front.
    Silver,
}

impl CardColor {
    /// Returns a stable storage value for this color.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Red => "red",
            Self::Purple => "purple",
            Self::Blue => "blue",
            Self::Sky => "sky",
            Self::Lime => "lime",
            Self::Pink => "pink",
            Self::Black => "black",
            Self::Silver => "silver",
        }
    }
}

impl FromStr for CardColor {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "white" => Ok(Self::White),
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "orange" => Ok(Self::Orange),
            "red" => Ok(Self::Red),
            "purple" => Ok(Self::Purple),
            "blue" => Ok(Self::Blue),
            "sky" => Ok(Self::Sky),
            "lime" => Ok(Self::Lime),
            "pink" => Ok(Self::Pink),
            "black" => Ok(Self::Black),
            "silver" => Ok(Self::Silver),
            _ => Err(AppError::Validation(format!("unknown card color '{value}'"))),
        }
    }
}

/// Board-level rule actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardAction {
    /// Moves the triggering card to a named list and swimlane.
    MoveCard {
        /// Placement within the target list.
        position: BoardPosition,
        /// Target list name on the target board.
        list_name: String,
        /// Optional target swimlane name; the board default is used otherwise.
        swimlane_name: Option<String>,
        /// Optional target board name; the event board is used otherwise.
        board_name: Option<String>,
    },
    /// Creates a swimlane on the event board.
    AddSwimlane {
        /// Name for the new swimlane.
        swimlane_name: String,
    },
    /// Archives the triggering card.
    ArchiveCard,
    /// Restores the triggering card from the archive.
    RestoreCard,
    /// Creates a card in a named list on the event board.
    CreateCard {
        /// Target list name.
        list_name: String,
        /// Title for the new card.
        card_title: String,
    },
    /// Links the triggering card into a list on another board.
    LinkCard {
        /// Target board name.
        board_name: String,
        /// Target list name on that board.
        list_name: String,
    },
}

/// Card-level rule actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardAction {
    /// Stamps or clears one of the card date fields.
    SetDate {
        /// Date field to touch.
        field: CardDateField,
        /// Stamp with current time or clear.
        op: CardDateOp,
    },
    /// Attaches a label by id.
    AddLabel {
        /// Label id on the event board.
        label_id: String,
    },
    /// Detaches a label by id.
    RemoveLabel {
        /// Label id on the event board.
        label_id: String,
    },
    /// Detaches every label from the card.
    RemoveAllLabels,
    /// Adds a member resolved by username.
    AddMember {
        /// Username to resolve on the event board.
        username: String,
    },
    /// Removes a member resolved by username.
    RemoveMember {
        /// Username to resolve on the event board.
        username: String,
    },
    /// Removes every member from the card.
    RemoveAllMembers,
    /// Sets the card display color.
    SetColor {
        /// New card color.
        color: CardColor,
    },
}

/// Checklist-level rule actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChecklistAction {
    /// Adds a named checklist to the card.
    AddChecklist {
        /// Checklist title.
        checklist_name: String,
    },
    /// Removes a named checklist from the card.
    RemoveChecklist {
        /// Checklist title.
        checklist_name: String,
    },
    /// Checks every item on every checklist of the card.
    CheckAllItems,
    /// Unchecks every item on every checklist of the card.
    UncheckAllItems,
    /// Checks one named item.
    CheckItem {
        /// Item title.
        item_name: String,
    },
    /// Unchecks one named item.
    UncheckItem {
        /// Item title.
        item_name: String,
    },
}

/// Mail rule actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MailAction {
    /// Sends one email.
    Send {
        /// Recipient address.
        to: String,
        /// Mail subject.
        subject: String,
        /// Mail body.
        message: String,
    },
}

/// The effect a rule performs once triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ActionSpec {
    /// Board-level action.
    Board(BoardAction),
    /// Card-level action.
    Card(CardAction),
    /// Checklist-level action.
    Checklist(ChecklistAction),
    /// Mail action.
    Mail(MailAction),
}

impl ActionSpec {
    /// Returns the category this action dispatches under.
    #[must_use]
    pub fn category(&self) -> ActionCategory {
        match self {
            Self::Board(_) => ActionCategory::Board,
            Self::Card(_) => ActionCategory::Card,
            Self::Checklist(_) => ActionCategory::Checklist,
            Self::Mail(_) => ActionCategory::Mail,
        }
    }

    /// Returns the permission the dispatch actor must hold.
    #[must_use]
    pub fn required_permission(&self) -> Permission {
        match self {
            Self::Board(BoardAction::AddSwimlane { .. }) => Permission::SwimlanesCreate,
            Self::Board(_) => Permission::BoardsEdit,
            Self::Card(_) => Permission::CardsEdit,
            Self::Checklist(_) => Permission::ChecklistsEdit,
            Self::Mail(_) => Permission::MailSend,
        }
    }

    /// Validates that required parameters for the declared type are present.
    ///
    /// Runs at rule-creation time; an action missing required parameters is
    /// rejected here and never reaches the dispatcher.
    pub fn validate(&self) -> AppResult<()> {
        match self {
            Self::Board(action) => validate_board_action(action),
            Self::Card(action) => validate_card_action(action),
            Self::Checklist(action) => validate_checklist_action(action),
            Self::Mail(action) => validate_mail_action(action),
        }
    }
}

fn validate_board_action(action: &BoardAction) -> AppResult<()> {
    match action {
        BoardAction::MoveCard {
            list_name,
            swimlane_name,
            board_name,
            ..
        } => {
            require_non_empty("move_card action list_name", list_name)?;
            if let Some(name) = swimlane_name {
                require_non_empty("move_card action swimlane_name", name)?;
            }
            if let Some(name) = board_name {
                require_non_empty("move_card action board_name", name)?;
            }
            Ok(())
        }
        BoardAction::AddSwimlane { swimlane_name } => {
            require_non_empty("add_swimlane action swimlane_name", swimlane_name)
        }
        BoardAction::ArchiveCard | BoardAction::RestoreCard => Ok(()),
        BoardAction::CreateCard {
            list_name,
            card_title,
        } => {
            require_non_empty("create_card action list_name", list_name)?;
            require_non_empty("create_card action card_title", card_title)
        }
        BoardAction::LinkCard {
            board_name,
            list_name,
        } => {
            require_non_empty("link_card action board_name", board_name)?;
            require_non_empty("link_card action list_name", list_name)
        }
    }
}

fn validate_card_action(action: &CardAction) -> AppResult<()> {
    match action {
        CardAction::AddLabel { label_id } | CardAction::RemoveLabel { label_id } => {
            require_non_empty("label action label_id", label_id)
        }
        CardAction::AddMember { username } | CardAction::RemoveMember { username } => {
            require_non_empty("member action username", username)
        }
        CardAction::SetDate { .. }
        | CardAction::RemoveAllLabels
        | CardAction::RemoveAllMembers
        | CardAction::SetColor { .. } => Ok(()),
    }
}

fn validate_checklist_action(action: &ChecklistAction) -> AppResult<()> {
    match action {
        ChecklistAction::AddChecklist { checklist_name }
        | ChecklistAction::RemoveChecklist { checklist_name } => {
            require_non_empty("checklist action checklist_name", checklist_name)
        }
        ChecklistAction::CheckItem { item_name } | ChecklistAction::UncheckItem { item_name } => {
            require_non_empty("checklist item action item_name", item_name)
        }
        ChecklistAction::CheckAllItems | ChecklistAction::UncheckAllItems => Ok(()),
    }
}

fn validate_mail_action(action: &MailAction) -> AppResult<()> {
    match action {
        MailAction::Send { to, subject, .. } => {
            require_non_empty("mail action to", to)?;
            require_non_empty("mail action subject", subject)
        }
    }
}

fn require_non_empty(label: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{label} must not be empty")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::security::Permission;

    use super::{ActionSpec, BoardAction, BoardPosition, CardAction, CardColor, MailAction};

    #[test]
    fn mail_action_requires_subject() {
        let action = ActionSpec::Mail(MailAction::Send {
            to: "team@example.com".to_owned(),
            subject: "  ".to_owned(),
            message: "done".to_owned(),
        });

        assert!(action.validate().is_err());
    }

    #[test]
    fn move_card_requires_list_name() {
        let action = ActionSpec::Board(BoardAction::MoveCard {
            position: BoardPosition::Top,
            list_name: String::new(),
            swimlane_name: None,
            board_name: None,
        });

        assert!(action.validate().is_err());
    }

    #[test]
    fn add_swimlane_maps_to_swimlane_permission() {
        let action = ActionSpec::Board(BoardAction::AddSwimlane {
            swimlane_name: "Review".to_owned(),
        });

        assert_eq!(action.required_permission(), Permission::SwimlanesCreate);
    }

    #[test]
    fn card_actions_map_to_card_edit_permission() {
        let action = ActionSpec::Card(CardAction::SetColor {
            color: CardColor::Red,
        });

        assert_eq!(action.required_permission(), Permission::CardsEdit);
        assert!(action.validate().is_ok());
    }

    #[test]
    fn action_spec_roundtrips_through_json() {
        let action = ActionSpec::Board(BoardAction::MoveCard {
            position: BoardPosition::Bottom,
            list_name: "Done".to_owned(),
            swimlane_name: Some("Default".to_owned()),
            board_name: None,
        });

        let encoded = serde_json::to_value(&action).unwrap_or_default();
        assert_eq!(encoded["category"], "board");
        assert_eq!(encoded["type"], "move_card");

        let decoded: Result<ActionSpec, _> = serde_json::from_value(encoded);
        assert!(decoded.is_ok());
        assert_eq!(decoded.unwrap_or_else(|_| unreachable!()), action);
    }
}
