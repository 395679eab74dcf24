use std::collections::HashMap;

use async_trait::async_trait;
use cardflow_application::{BoardGateway, ResolvedCardMove};
use cardflow_core::{AppError, AppResult, BoardId};
use cardflow_domain::{CardColor, CardDateField};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// One checklist on an in-memory card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistSnapshot {
    /// Checklist title.
    pub name: String,
    /// Items as (title, checked) pairs.
    pub items: Vec<(String, bool)>,
}

/// Observable state of one in-memory card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSnapshot {
    /// Board the card lives on.
    pub board_id: BoardId,
    /// List the card lives in.
    pub list_id: String,
    /// Swimlane the card lives in.
    pub swimlane_id: String,
    /// Card title.
    pub title: String,
    /// Attached label ids.
    pub labels: Vec<String>,
    /// Member subjects on the card.
    pub members: Vec<String>,
    /// Display color, if set.
    pub color: Option<CardColor>,
    /// Date fields keyed by their storage name.
    pub dates: HashMap<String, DateTime<Utc>>,
    /// Checklists on the card.
    pub checklists: Vec<ChecklistSnapshot>,
    /// Whether the card is archived.
    pub archived: bool,
}

#[derive(Debug)]
struct BoardState {
    name: String,
    lists: Vec<(String, String)>,
    swimlanes: Vec<(String, String)>,
    default_swimlane_id: String,
    members: Vec<(String, String)>,
}

/// In-memory board application stand-in.
///
/// Backs development deployments without a live board application and gives
/// adapter tests an observable card store. Name lookups resolve in insertion
/// order, so duplicated names behave first-match-wins like the real gateway.
#[derive(Debug, Default)]
pub struct InMemoryBoardGateway {
    boards: RwLock<HashMap<BoardId, BoardState>>,
    cards: RwLock<HashMap<String, CardSnapshot>>,
}

impl InMemoryBoardGateway {
    /// Creates an empty in-memory gateway.
    #[must_use]
    pub fn new() -> Self {
        Self {
            boards: RwLock::new(HashMap::new()),
            cards: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a board with a `Default` swimlane and returns its id.
    pub async fn add_board(&self, name: impl Into<String>) -> BoardId {
        let board_id = BoardId::new();
        let default_swimlane_id = Uuid::new_v4().to_string();

        self.boards.write().await.insert(
            board_id,
            BoardState {
                name: name.into(),
                lists: Vec::new(),
                swimlanes: vec![(default_swimlane_id.clone(), "Default".to_owned())],
                default_swimlane_id,
                members: Vec::new(),
            },
        );

        board_id
    }

    /// Adds a list to a board and returns its id.
    pub async fn add_list(&self, board_id: BoardId, name: impl Into<String>) -> AppResult<String> {
        let mut boards = self.boards.write().await;
        let board = board_mut(&mut boards, board_id)?;

        let list_id = Uuid::new_v4().to_string();
        board.lists.push((list_id.clone(), name.into()));
        Ok(list_id)
    }

    /// Registers a board member under a username.
    pub async fn add_member(
        &self,
        board_id: BoardId,
        username: impl Into<String>,
        subject: impl Into<String>,
    ) -> AppResult<()> {
        let mut boards = self.boards.write().await;
        let board = board_mut(&mut boards, board_id)?;

        board.members.push((username.into(), subject.into()));
        Ok(())
    }

    /// Adds a card in the board's default swimlane and returns its id.
    pub async fn add_card(
        &self,
        board_id: BoardId,
        list_id: &str,
        title: impl Into<String>,
    ) -> AppResult<String> {
        let swimlane_id = {
            let boards = self.boards.read().await;
            board_ref(&boards, board_id)?.default_swimlane_id.clone()
        };

        let card_id = Uuid::new_v4().to_string();
        self.cards.write().await.insert(
            card_id.clone(),
            CardSnapshot {
                board_id,
                list_id: list_id.to_owned(),
                swimlane_id,
                title: title.into(),
                labels: Vec::new(),
                members: Vec::new(),
                color: None,
                dates: HashMap::new(),
                checklists: Vec::new(),
                archived: false,
            },
        );

        Ok(card_id)
    }

    /// Returns a snapshot of one card.
    pub async fn card(&self, card_id: &str) -> Option<CardSnapshot> {
        self.cards.read().await.get(card_id).cloned()
    }

    async fn with_card<T>(
        &self,
        card_id: &str,
        mutate: impl FnOnce(&mut CardSnapshot) -> T,
    ) -> AppResult<T> {
        let mut cards = self.cards.write().await;
        let card = cards.get_mut(card_id).ok_or_else(|| {
            AppError::NotFound(format!("card '{card_id}' does not exist"))
        })?;

        Ok(mutate(card))
    }
}

fn board_mut(
    boards: &mut HashMap<BoardId, BoardState>,
    board_id: BoardId,
) -> AppResult<&mut BoardState> {
    boards
        .get_mut(&board_id)
        .ok_or_else(|| AppError::NotFound(format!("board '{board_id}' does not exist")))
}

fn board_ref(boards: &HashMap<BoardId, BoardState>, board_id: BoardId) -> AppResult<&BoardState> {
    boards
        .get(&board_id)
        .ok_or_else(|| AppError::NotFound(format!("board '{board_id}' does not exist")))
}

#[async_trait]
impl BoardGateway for InMemoryBoardGateway {
    async fn find_board_id(&self, board_name: &str) -> AppResult<Option<BoardId>> {
        Ok(self
            .boards
            .read()
            .await
            .iter()
            .find(|(_, board)| board.name == board_name)
            .map(|(board_id, _)| *board_id))
    }

    async fn find_list_id(&self, board_id: BoardId, list_name: &str) -> AppResult<Option<String>> {
        let boards = self.boards.read().await;
        Ok(board_ref(&boards, board_id)?
            .lists
            .iter()
            .find(|(_, name)| name == list_name)
            .map(|(list_id, _)| list_id.clone()))
    }

    async fn find_swimlane_id(
        &self,
        board_id: BoardId,
        swimlane_name: &str,
    ) -> AppResult<Option<String>> {
        let boards = self.boards.read().await;
        Ok(board_ref(&boards, board_id)?
            .swimlanes
            .iter()
            .find(|(_, name)| name == swimlane_name)
            .map(|(swimlane_id, _)| swimlane_id.clone()))
    }

    async fn default_swimlane_id(&self, board_id: BoardId) -> AppResult<Option<String>> {
        let boards = self.boards.read().await;
        Ok(Some(board_ref(&boards, board_id)?.default_swimlane_id.clone()))
    }

    async fn find_member_subject(
        &self,
        board_id: BoardId,
        username: &str,
    ) -> AppResult<Option<String>> {
        let boards = self.boards.read().await;
        Ok(board_ref(&boards, board_id)?
            .members
            .iter()
            .find(|(member_username, _)| member_username == username)
            .map(|(_, subject)| subject.clone()))
    }

    async fn create_swimlane(&self, board_id: BoardId, swimlane_name: &str) -> AppResult<String> {
        let mut boards = self.boards.write().await;
        let board = board_mut(&mut boards, board_id)?;

        let swimlane_id = Uuid::new_v4().to_string();
        board
            .swimlanes
            .push((swimlane_id.clone(), swimlane_name.to_owned()));
        Ok(swimlane_id)
    }

    async fn move_card(&self, command: ResolvedCardMove) -> AppResult<()> {
        self.with_card(command.card_id.as_str(), |card| {
            card.board_id = command.board_id;
            card.list_id = command.list_id.clone();
            card.swimlane_id = command.swimlane_id.clone();
        })
        .await
    }

    async fn archive_card(&self, card_id: &str) -> AppResult<()> {
        self.with_card(card_id, |card| card.archived = true).await
    }

    async fn restore_card(&self, card_id: &str) -> AppResult<()> {
        self.with_card(card_id, |card| card.archived = false).await
    }

    async fn create_card(
        &self,
        board_id: BoardId,
        list_id: &str,
        swimlane_id: &str,
        card_title: &str,
    ) -> AppResult<String> {
        let card_id = Uuid::new_v4().to_string();
        self.cards.write().await.insert(
            card_id.clone(),
            CardSnapshot {
                board_id,
                list_id: list_id.to_owned(),
                swimlane_id: swimlane_id.to_owned(),
                title: card_title.to_owned(),
                labels: Vec::new(),
                members: Vec::new(),
                color: None,
                dates: HashMap::new(),
                checklists: Vec::new(),
                archived: false,
            },
        );
        Ok(card_id)
    }

    async fn link_card(&self, card_id: &str, board_id: BoardId, list_id: &str) -> AppResult<()> {
        // Linking mirrors the card into the target list without detaching it
        // from its home board, so only the placement fields move.
        self.with_card(card_id, |card| {
            card.board_id = board_id;
            card.list_id = list_id.to_owned();
        })
        .await
    }

    async fn set_card_date(
        &self,
        card_id: &str,
        field: CardDateField,
        value: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        self.with_card(card_id, |card| match value {
            Some(stamp) => {
                card.dates.insert(field.as_str().to_owned(), stamp);
            }
            None => {
                card.dates.remove(field.as_str());
            }
        })
        .await
    }

    async fn add_card_label(&self, card_id: &str, label_id: &str) -> AppResult<()> {
        self.with_card(card_id, |card| {
            if !card.labels.iter().any(|label| label == label_id) {
                card.labels.push(label_id.to_owned());
            }
        })
        .await
    }

    async fn remove_card_label(&self, card_id: &str, label_id: &str) -> AppResult<()> {
        self.with_card(card_id, |card| {
            card.labels.retain(|label| label != label_id);
        })
        .await
    }

    async fn clear_card_labels(&self, card_id: &str) -> AppResult<()> {
        self.with_card(card_id, |card| card.labels.clear()).await
    }

    async fn add_card_member(&self, card_id: &str, subject: &str) -> AppResult<()> {
        self.with_card(card_id, |card| {
            if !card.members.iter().any(|member| member == subject) {
                card.members.push(subject.to_owned());
            }
        })
        .await
    }

    async fn remove_card_member(&self, card_id: &str, subject: &str) -> AppResult<()> {
        self.with_card(card_id, |card| {
            card.members.retain(|member| member != subject);
        })
        .await
    }

    async fn clear_card_members(&self, card_id: &str) -> AppResult<()> {
        self.with_card(card_id, |card| card.members.clear()).await
    }

    async fn set_card_color(&self, card_id: &str, color: CardColor) -> AppResult<()> {
        self.with_card(card_id, |card| card.color = Some(color)).await
    }

    async fn add_checklist(&self, card_id: &str, checklist_name: &str) -> AppResult<()> {
        self.with_card(card_id, |card| {
            card.checklists.push(ChecklistSnapshot {
                name: checklist_name.to_owned(),
                items: Vec::new(),
            });
        })
        .await
    }

    async fn remove_checklist(&self, card_id: &str, checklist_name: &str) -> AppResult<()> {
        self.with_card(card_id, |card| {
            card.checklists
                .retain(|checklist| checklist.name != checklist_name);
        })
        .await
    }

    async fn set_checklist_item(
        &self,
        card_id: &str,
        item_name: &str,
        checked: bool,
    ) -> AppResult<()> {
        // An item name that matches nothing is a silent no-op, matching the
        // board application's behavior.
        self.with_card(card_id, |card| {
            for checklist in &mut card.checklists {
                for (name, state) in &mut checklist.items {
                    if name == item_name {
                        *state = checked;
                    }
                }
            }
        })
        .await
    }

    async fn set_all_checklist_items(&self, card_id: &str, checked: bool) -> AppResult<()> {
        self.with_card(card_id, |card| {
            for checklist in &mut card.checklists {
                for (_, state) in &mut checklist.items {
                    *state = checked;
                }
            }
        })
        .await
    }
}
