use std::str::FromStr;

use cardflow_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::activity::{ActivityEvent, ActivityType};

/// Stored sentinel meaning "match any value".
///
/// Blank author inputs are normalized to this sentinel before storage so the
/// matcher stays total and never special-cases empty strings.
pub const WILDCARD: &str = "*";

/// Supported condition operators for trigger conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Equality comparison.
    Equals,
    /// Inequality comparison.
    NotEquals,
    /// Substring or array-membership comparison.
    Contains,
    /// Numeric greater-than comparison.
    GreaterThan,
    /// Numeric less-than comparison.
    LessThan,
}

impl ConditionOperator {
    /// Returns a stable storage value for this operator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
        }
    }
}

impl FromStr for ConditionOperator {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "equals" => Ok(Self::Equals),
            "not_equals" => Ok(Self::NotEquals),
            "contains" => Ok(Self::Contains),
            "greater_than" => Ok(Self::GreaterThan),
            "less_than" => Ok(Self::LessThan),
            _ => Err(AppError::Validation(format!(
                "unknown condition operator '{value}'"
            ))),
        }
    }
}

/// One trigger condition over an event field.
///
/// The operator is stored as its string form so records deserialized from an
/// untrusted store are re-checked at match time instead of panicking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCondition {
    field: String,
    operator: String,
    value: Value,
}

impl TriggerCondition {
    /// Creates a validated trigger condition.
    ///
    /// Blank fields and blank string values normalize to the wildcard
    /// sentinel; the operator must parse as a known [`ConditionOperator`].
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: Value,
    ) -> AppResult<Self> {
        let operator = operator.into();
        ConditionOperator::from_str(operator.as_str())?;

        Ok(Self {
            field: normalize_wildcard(field.into()),
            operator,
            value: normalize_wildcard_value(value),
        })
    }

    /// Returns the event field this condition inspects.
    #[must_use]
    pub fn field(&self) -> &str {
        self.field.as_str()
    }

    /// Returns the stored operator string.
    #[must_use]
    pub fn operator(&self) -> &str {
        self.operator.as_str()
    }

    /// Returns the comparison value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Outcome of evaluating one trigger against one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvaluation {
    /// The event satisfies the trigger.
    Matched,
    /// The event does not satisfy the trigger; the expected common case.
    NotMatched,
    /// The stored trigger is malformed; matching failed closed.
    Malformed(String),
}

impl TriggerEvaluation {
    /// Returns whether the evaluation is a match.
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched)
    }
}

/// The condition under which a rule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSpec {
    activity_type: ActivityType,
    actor_subject: String,
    conditions: Vec<TriggerCondition>,
}

impl TriggerSpec {
    /// Creates a trigger spec, normalizing a blank actor filter to `'*'`.
    #[must_use]
    pub fn new(
        activity_type: ActivityType,
        actor_subject: Option<String>,
        conditions: Vec<TriggerCondition>,
    ) -> Self {
        Self {
            activity_type,
            actor_subject: normalize_wildcard(actor_subject.unwrap_or_default()),
            conditions,
        }
    }

    /// Returns the activity type this trigger listens for.
    #[must_use]
    pub fn activity_type(&self) -> ActivityType {
        self.activity_type
    }

    /// Returns the actor filter, `'*'` when any actor matches.
    #[must_use]
    pub fn actor_subject(&self) -> &str {
        self.actor_subject.as_str()
    }

    /// Returns the condition list.
    #[must_use]
    pub fn conditions(&self) -> &[TriggerCondition] {
        &self.conditions
    }

    /// Evaluates this trigger against an event.
    ///
    /// Total over all inputs: malformed stored operators fail closed with a
    /// diagnostic and a missing event field is an ordinary non-match.
    #[must_use]
    pub fn evaluate(&self, event: &ActivityEvent) -> TriggerEvaluation {
        if self.activity_type != event.activity_type() {
            return TriggerEvaluation::NotMatched;
        }

        if self.actor_subject != WILDCARD && self.actor_subject != event.actor_subject() {
            return TriggerEvaluation::NotMatched;
        }

        for condition in &self.conditions {
            if condition.field == WILDCARD || is_wildcard_value(&condition.value) {
                continue;
            }

            let Ok(operator) = ConditionOperator::from_str(condition.operator.as_str()) else {
                return TriggerEvaluation::Malformed(format!(
                    "condition on field '{}' has unknown operator '{}'",
                    condition.field, condition.operator
                ));
            };

            let Some(event_value) = event.field(condition.field.as_str()) else {
                return TriggerEvaluation::NotMatched;
            };

            if !compare(operator, &event_value, &condition.value) {
                return TriggerEvaluation::NotMatched;
            }
        }

        TriggerEvaluation::Matched
    }
}

fn compare(operator: ConditionOperator, event_value: &Value, expected: &Value) -> bool {
    match operator {
        ConditionOperator::Equals => values_equal(event_value, expected),
        ConditionOperator::NotEquals => !values_equal(event_value, expected),
        ConditionOperator::Contains => contains(event_value, expected),
        ConditionOperator::GreaterThan => {
            numeric_pair(event_value, expected).is_some_and(|(left, right)| left > right)
        }
        ConditionOperator::LessThan => {
            numeric_pair(event_value, expected).is_some_and(|(left, right)| left < right)
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    if let Some(pair) = numeric_pair(left, right) {
        return (pair.0 - pair.1).abs() < f64::EPSILON;
    }

    left == right
}

fn contains(event_value: &Value, expected: &Value) -> bool {
    match event_value {
        Value::String(haystack) => expected
            .as_str()
            .is_some_and(|needle| haystack.contains(needle)),
        Value::Array(items) => items.iter().any(|item| values_equal(item, expected)),
        _ => false,
    }
}

fn numeric_pair(left: &Value, right: &Value) -> Option<(f64, f64)> {
    Some((left.as_f64()?, right.as_f64()?))
}

fn normalize_wildcard(value: String) -> String {
    if value.trim().is_empty() {
        WILDCARD.to_owned()
    } else {
        value
    }
}

fn normalize_wildcard_value(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(normalize_wildcard(text)),
        Value::Null => Value::String(WILDCARD.to_owned()),
        other => other,
    }
}

fn is_wildcard_value(value: &Value) -> bool {
    value.as_str() == Some(WILDCARD)
}
