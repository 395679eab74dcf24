use cardflow_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::action::ActionSpec;
use crate::trigger::TriggerSpec;

/// A stored (trigger, action) automation entry for one board.
///
/// The trigger and action travel with the definition as one unit; deleting a
/// rule can therefore never leave an orphaned trigger or action behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    title: NonEmptyString,
    author_subject: NonEmptyString,
    trigger: TriggerSpec,
    action: ActionSpec,
    is_enabled: bool,
}

/// Input payload for constructing one rule definition.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinitionInput {
    /// User-facing rule title.
    pub title: String,
    /// Subject of the user who authored or last edited the rule; actions
    /// dispatch under this identity.
    pub author_subject: String,
    /// Trigger configuration.
    pub trigger: TriggerSpec,
    /// Action configuration.
    pub action: ActionSpec,
    /// Enabled/disabled flag; disabled rules are stored but never matched.
    pub is_enabled: bool,
}

/// Partial update applied to an existing rule definition.
///
/// Absent fields keep their current value; the merged result is re-validated
/// as a whole before it replaces the stored definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RuleDefinitionPatch {
    /// New rule title.
    pub title: Option<String>,
    /// New trigger configuration.
    pub trigger: Option<TriggerSpec>,
    /// New action configuration.
    pub action: Option<ActionSpec>,
    /// New enabled flag.
    pub is_enabled: Option<bool>,
}

impl RuleDefinition {
    /// Creates a validated rule definition.
    pub fn new(input: RuleDefinitionInput) -> AppResult<Self> {
        let RuleDefinitionInput {
            title,
            author_subject,
            trigger,
            action,
            is_enabled,
        } = input;

        action.validate()?;

        Ok(Self {
            title: NonEmptyString::new(title)?,
            author_subject: NonEmptyString::new(author_subject)?,
            trigger,
            action,
            is_enabled,
        })
    }

    /// Returns a new validated definition with the patch applied.
    ///
    /// The editing subject becomes the rule's dispatch actor.
    pub fn apply_patch(
        &self,
        patch: RuleDefinitionPatch,
        editor_subject: impl Into<String>,
    ) -> AppResult<Self> {
        Self::new(RuleDefinitionInput {
            title: patch
                .title
                .unwrap_or_else(|| self.title.as_str().to_owned()),
            author_subject: editor_subject.into(),
            trigger: patch.trigger.unwrap_or_else(|| self.trigger.clone()),
            action: patch.action.unwrap_or_else(|| self.action.clone()),
            is_enabled: patch.is_enabled.unwrap_or(self.is_enabled),
        })
    }

    /// Returns the rule title.
    #[must_use]
    pub fn title(&self) -> &NonEmptyString {
        &self.title
    }

    /// Returns the subject the rule's actions dispatch under.
    #[must_use]
    pub fn author_subject(&self) -> &NonEmptyString {
        &self.author_subject
    }

    /// Returns the trigger configuration.
    #[must_use]
    pub fn trigger(&self) -> &TriggerSpec {
        &self.trigger
    }

    /// Returns the action configuration.
    #[must_use]
    pub fn action(&self) -> &ActionSpec {
        &self.action
    }

    /// Returns whether the rule participates in matching.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::action::{ActionSpec, CardAction, CardColor, MailAction};
    use crate::activity::ActivityType;
    use crate::trigger::{TriggerCondition, TriggerSpec};

    use super::{RuleDefinition, RuleDefinitionInput, RuleDefinitionPatch};

    fn set_color_rule() -> RuleDefinitionInput {
        RuleDefinitionInput {
            title: "Flag urgent cards".to_owned(),
            author_subject: "alice".to_owned(),
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

    #[test]
    fn rule_requires_title() {
        let mut input = set_color_rule();
        input.title = " ".to_owned();
        assert!(RuleDefinition::new(input).is_err());
    }

    #[test]
    fn rule_rejects_invalid_action() {
        let mut input = set_color_rule();
        input.action = ActionSpec::Mail(MailAction::Send {
            to: "team@example.com".to_owned(),
            subject: String::new(),
            message: "hi".to_owned(),
        });

        assert!(RuleDefinition::new(input).is_err());
    }

    #[test]
    fn patch_preserves_unset_fields_and_revalidates() {
        let rule = RuleDefinition::new(set_color_rule()).unwrap_or_else(|_| unreachable!());

        let patched = rule.apply_patch(
            RuleDefinitionPatch {
                is_enabled: Some(false),
                ..RuleDefinitionPatch::default()
            },
            "bob",
        );
        assert!(patched.is_ok());

        let patched = patched.unwrap_or_else(|_| unreachable!());
        assert_eq!(patched.title().as_str(), "Flag urgent cards");
        assert_eq!(patched.author_subject().as_str(), "bob");
        assert!(!patched.is_enabled());
    }

    #[test]
    fn patch_cannot_produce_invalid_rule() {
        let rule = RuleDefinition::new(set_color_rule()).unwrap_or_else(|_| unreachable!());

        let patched = rule.apply_patch(
            RuleDefinitionPatch {
                action: Some(ActionSpec::Mail(MailAction::Send {
                    to: String::new(),
                    subject: "x".to_owned(),
                    message: "y".to_owned(),
                })),
                ..RuleDefinitionPatch::default()
            },
            "bob",
        );

        assert!(patched.is_err());
    }
}
