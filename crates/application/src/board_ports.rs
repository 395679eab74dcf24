use async_trait::async_trait;
use cardflow_core::{AppResult, BoardId};
use cardflow_domain::{ActivityEvent, BoardPosition, CardColor, CardDateField};
use chrono::{DateTime, Utc};

/// Fully-resolved move command handed to the board application.
///
/// Name resolution happens in the dispatcher; the gateway only ever sees ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCardMove {
    /// Card being moved.
    pub card_id: String,
    /// Target board.
    pub board_id: BoardId,
    /// Target list id.
    pub list_id: String,
    /// Target swimlane id.
    pub swimlane_id: String,
    /// Placement within the target list.
    pub position: BoardPosition,
}

/// Port for board/card mutations and name lookups in the board application.
#[async_trait]
pub trait BoardGateway: Send + Sync {
    /// Resolves a board name to its id.
    async fn find_board_id(&self, board_name: &str) -> AppResult<Option<BoardId>>;

    /// Resolves a list name on a board; first match wins for duplicates.
    async fn find_list_id(&self, board_id: BoardId, list_name: &str) -> AppResult<Option<String>>;

    /// Resolves a swimlane name on a board; first match wins for duplicates.
    async fn find_swimlane_id(
        &self,
        board_id: BoardId,
        swimlane_name: &str,
    ) -> AppResult<Option<String>>;

    /// Returns the board's default swimlane.
    async fn default_swimlane_id(&self, board_id: BoardId) -> AppResult<Option<String>>;

    /// Resolves a board member's username to their subject.
    async fn find_member_subject(
        &self,
        board_id: BoardId,
        username: &str,
    ) -> AppResult<Option<String>>;

    /// Creates a swimlane and returns its id.
    async fn create_swimlane(&self, board_id: BoardId, swimlane_name: &str) -> AppResult<String>;

    /// Moves a card to a resolved target.
    async fn move_card(&self, command: ResolvedCardMove) -> AppResult<()>;

    /// Archives a card.
    async fn archive_card(&self, card_id: &str) -> AppResult<()>;

    /// Restores a card from the archive.
    async fn restore_card(&self, card_id: &str) -> AppResult<()>;

    /// Creates a card and returns its id.
    async fn create_card(
        &self,
        board_id: BoardId,
        list_id: &str,
        swimlane_id: &str,
        card_title: &str,
    ) -> AppResult<String>;

    /// Links an existing card into a list on another board.
    async fn link_card(&self, card_id: &str, board_id: BoardId, list_id: &str) -> AppResult<()>;

    /// Sets or clears one card date field.
    async fn set_card_date(
        &self,
        card_id: &str,
        field: CardDateField,
        value: Option<DateTime<Utc>>,
    ) -> AppResult<()>;

    /// Attaches a label to a card.
    async fn add_card_label(&self, card_id: &str, label_id: &str) -> AppResult<()>;

    /// Detaches a label from a card.
    async fn remove_card_label(&self, card_id: &str, label_id: &str) -> AppResult<()>;

    /// Detaches every label from a card.
    async fn clear_card_labels(&self, card_id: &str) -> AppResult<()>;

    /// Adds a member to a card.
    async fn add_card_member(&self, card_id: &str, subject: &str) -> AppResult<()>;

    /// Removes a member from a card.
    async fn remove_card_member(&self, card_id: &str, subject: &str) -> AppResult<()>;

    /// Removes every member from a card.
    async fn clear_card_members(&self, card_id: &str) -> AppResult<()>;

    /// Sets the card display color.
    async fn set_card_color(&self, card_id: &str, color: CardColor) -> AppResult<()>;

    /// Adds a named checklist to a card.
    async fn add_checklist(&self, card_id: &str, checklist_name: &str) -> AppResult<()>;

    /// Removes a named checklist from a card.
    async fn remove_checklist(&self, card_id: &str, checklist_name: &str) -> AppResult<()>;

    /// Checks or unchecks one named checklist item.
    async fn set_checklist_item(
        &self,
        card_id: &str,
        item_name: &str,
        checked: bool,
    ) -> AppResult<()>;

    /// Checks or unchecks every checklist item on a card.
    async fn set_all_checklist_items(&self, card_id: &str, checked: bool) -> AppResult<()>;
}

/// Port for outbound mail delivery.
#[async_trait]
pub trait MailService: Send + Sync {
    /// Sends one email.
    async fn send_mail(&self, to: &str, subject: &str, body: &str) -> AppResult<()>;
}

/// One claimed page of the board application's activity feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedActivityBatch {
    /// Events in delivery order.
    pub events: Vec<ActivityEvent>,
    /// Cursor to acknowledge and resume from, absent when the feed is empty.
    pub next_cursor: Option<String>,
}

/// Port for claiming activity events from the board application.
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    /// Claims up to `limit` events after `cursor`.
    async fn claim_batch(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> AppResult<ClaimedActivityBatch>;

    /// Acknowledges a processed cursor.
    async fn acknowledge(&self, cursor: &str) -> AppResult<()>;
}
