use std::str::FromStr;

use cardflow_core::AppError;
use serde::{Deserialize, Serialize};

/// Permissions enforced by application policy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Allows administering board settings and members.
    BoardsAdmin,
    /// Allows moving, archiving and creating cards across lists.
    BoardsEdit,
    /// Allows mutating card fields such as labels, members and dates.
    CardsEdit,
    /// Allows mutating card checklists and their items.
    ChecklistsEdit,
    /// Allows adding comments to cards.
    CommentsCreate,
    /// Allows managing automation rules on a board.
    RulesManage,
    /// Allows creating swimlanes on a board.
    SwimlanesCreate,
    /// Allows sending rule-triggered mail.
    MailSend,
}

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoardsAdmin => "boards.admin",
            Self::BoardsEdit => "boards.edit",
            Self::CardsEdit => "cards.edit",
            Self::ChecklistsEdit => "checklists.edit",
            Self::CommentsCreate => "comments.create",
            Self::RulesManage => "rules.manage",
            Self::SwimlanesCreate => "swimlanes.create",
            Self::MailSend => "mail.send",
        }
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::BoardsAdmin,
            Permission::BoardsEdit,
            Permission::CardsEdit,
            Permission::ChecklistsEdit,
            Permission::CommentsCreate,
            Permission::RulesManage,
            Permission::SwimlanesCreate,
            Permission::MailSend,
        ];

        ALL
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "boards.admin" => Ok(Self::BoardsAdmin),
            "boards.edit" => Ok(Self::BoardsEdit),
            "cards.edit" => Ok(Self::CardsEdit),
            "checklists.edit" => Ok(Self::ChecklistsEdit),
            "comments.create" => Ok(Self::CommentsCreate),
            "rules.manage" => Ok(Self::RulesManage),
            "swimlanes.create" => Ok(Self::SwimlanesCreate),
            "mail.send" => Ok(Self::MailSend),
            _ => Err(AppError::Validation(format!(
                "unknown permission value '{value}'"
            ))),
        }
    }
}

/// Board-scoped member roles with a fixed permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardRole {
    /// Full control over the board, including rules and membership.
    BoardAdmin,
    /// Regular member with card, checklist and comment access.
    Normal,
    /// Member restricted to commenting.
    CommentOnly,
    /// Regular member without comment access.
    NoComments,
}

impl BoardRole {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoardAdmin => "board_admin",
            Self::Normal => "normal",
            Self::CommentOnly => "comment_only",
            Self::NoComments => "no_comments",
        }
    }

    /// Returns the fixed permission set granted by this role.
    ///
    /// The table is static; role grants are never mutated per assignment.
    /// `BoardAdmin` additionally short-circuits every permission check at the
    /// authorization layer, so its entry here is informational for listings.
    #[must_use]
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Self::BoardAdmin => Permission::all(),
            Self::Normal => &[
                Permission::BoardsEdit,
                Permission::CardsEdit,
                Permission::ChecklistsEdit,
                Permission::CommentsCreate,
                Permission::SwimlanesCreate,
            ],
            Self::CommentOnly => &[Permission::CommentsCreate],
            Self::NoComments => &[
                Permission::BoardsEdit,
                Permission::CardsEdit,
                Permission::ChecklistsEdit,
                Permission::SwimlanesCreate,
            ],
        }
    }

    /// Returns all known roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[BoardRole] = &[
            BoardRole::BoardAdmin,
            BoardRole::Normal,
            BoardRole::CommentOnly,
            BoardRole::NoComments,
        ];

        ALL
    }
}

impl FromStr for BoardRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "board_admin" => Ok(Self::BoardAdmin),
            "normal" => Ok(Self::Normal),
            "comment_only" => Ok(Self::CommentOnly),
            "no_comments" => Ok(Self::NoComments),
            _ => Err(AppError::Validation(format!(
                "unknown board role '{value}'"
            ))),
        }
    }
}

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role is assigned to a subject on a board.
    RoleAssigned,
    /// Emitted when a role assignment is revoked.
    RoleRevoked,
    /// Emitted when an automation rule is created.
    RuleCreated,
    /// Emitted when an automation rule is updated.
    RuleUpdated,
    /// Emitted when an automation rule is deleted.
    RuleDeleted,
    /// Emitted after an activity event finished rule evaluation.
    ActivityProcessed,
    /// Emitted when a matched rule's action failed to dispatch.
    RuleDispatchFailed,
    /// Emitted when a stored trigger turned out malformed at match time.
    RuleTriggerMalformed,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleAssigned => "security.role.assigned",
            Self::RoleRevoked => "security.role.revoked",
            Self::RuleCreated => "rules.rule.created",
            Self::RuleUpdated => "rules.rule.updated",
            Self::RuleDeleted => "rules.rule.deleted",
            Self::ActivityProcessed => "engine.activity.processed",
            Self::RuleDispatchFailed => "engine.dispatch.failed",
            Self::RuleTriggerMalformed => "engine.trigger.malformed",
        }
    }
}
