use cardflow_application::{
    ActivityDigest, AuditLogEntry, DispatchEffect, DispatchFailure, RoleAssignment, Rule,
    TriggerDiagnostic,
};
use cardflow_core::{AppError, BoardId};
use cardflow_domain::{
    ActionSpec, ActivityEvent, ActivityEventInput, ActivityType, RuleDefinitionPatch,
    TriggerCondition, TriggerSpec,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct TriggerConditionRequest {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct TriggerSpecRequest {
    pub activity_type: ActivityType,
    #[serde(default)]
    pub actor_subject: Option<String>,
    #[serde(default)]
    pub conditions: Vec<TriggerConditionRequest>,
}

impl TriggerSpecRequest {
    pub fn try_into_spec(self) -> Result<TriggerSpec, AppError> {
        let conditions = self
            .conditions
            .into_iter()
            .map(|condition| {
                TriggerCondition::new(condition.field, condition.operator, condition.value)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TriggerSpec::new(
            self.activity_type,
            self.actor_subject,
            conditions,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub title: String,
    pub trigger: TriggerSpecRequest,
    pub action: ActionSpec,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateRuleRequest {
    pub title: Option<String>,
    pub trigger: Option<TriggerSpecRequest>,
    pub action: Option<ActionSpec>,
    pub is_enabled: Option<bool>,
}

impl UpdateRuleRequest {
    pub fn try_into_patch(self) -> Result<RuleDefinitionPatch, AppError> {
        Ok(RuleDefinitionPatch {
            title: self.title,
            trigger: self
                .trigger
                .map(TriggerSpecRequest::try_into_spec)
                .transpose()?,
            action: self.action,
            is_enabled: self.is_enabled,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RuleResponse {
    pub rule_id: String,
    pub board_id: Uuid,
    pub title: String,
    pub author_subject: String,
    pub trigger: Value,
    pub action: Value,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Rule> for RuleResponse {
    fn from(rule: Rule) -> Self {
        Self {
            rule_id: rule.rule_id,
            board_id: rule.board_id.as_uuid(),
            title: rule.definition.title().as_str().to_owned(),
            author_subject: rule.definition.author_subject().as_str().to_owned(),
            trigger: serde_json::to_value(rule.definition.trigger()).unwrap_or_default(),
            action: serde_json::to_value(rule.definition.action()).unwrap_or_default(),
            is_enabled: rule.definition.is_enabled(),
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub subject: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RoleAssignmentResponse {
    pub subject: String,
    pub role: String,
    pub assigned_at: DateTime<Utc>,
}

impl From<RoleAssignment> for RoleAssignmentResponse {
    fn from(assignment: RoleAssignment) -> Self {
        Self {
            subject: assignment.subject,
            role: assignment.role.as_str().to_owned(),
            assigned_at: assignment.assigned_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EffectivePermissionsResponse {
    pub subject: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityEventRequest {
    pub activity_type: ActivityType,
    pub board_id: Uuid,
    pub actor_subject: String,
    #[serde(default)]
    pub card_id: Option<String>,
    #[serde(default)]
    pub list_id: Option<String>,
    #[serde(default)]
    pub swimlane_id: Option<String>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Value,
}

impl ActivityEventRequest {
    pub fn try_into_event(self) -> Result<ActivityEvent, AppError> {
        ActivityEvent::new(ActivityEventInput {
            activity_type: self.activity_type,
            board_id: BoardId::from_uuid(self.board_id),
            actor_subject: self.actor_subject,
            card_id: self.card_id,
            list_id: self.list_id,
            swimlane_id: self.swimlane_id,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
            data: self.data,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DispatchEffectResponse {
    pub rule_id: String,
    pub summary: String,
}

impl From<DispatchEffect> for DispatchEffectResponse {
    fn from(effect: DispatchEffect) -> Self {
        Self {
            rule_id: effect.rule_id,
            summary: effect.summary,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DispatchFailureResponse {
    pub rule_id: String,
    pub rule_title: String,
    pub error: String,
}

impl From<DispatchFailure> for DispatchFailureResponse {
    fn from(failure: DispatchFailure) -> Self {
        Self {
            rule_id: failure.rule_id,
            rule_title: failure.rule_title,
            error: failure.error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TriggerDiagnosticResponse {
    pub rule_id: String,
    pub reason: String,
}

impl From<TriggerDiagnostic> for TriggerDiagnosticResponse {
    fn from(diagnostic: TriggerDiagnostic) -> Self {
        Self {
            rule_id: diagnostic.rule_id,
            reason: diagnostic.reason,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityDigestResponse {
    pub board_id: Uuid,
    pub activity_type: String,
    pub matched: usize,
    pub effects: Vec<DispatchEffectResponse>,
    pub failures: Vec<DispatchFailureResponse>,
    pub diagnostics: Vec<TriggerDiagnosticResponse>,
}

impl From<ActivityDigest> for ActivityDigestResponse {
    fn from(digest: ActivityDigest) -> Self {
        Self {
            board_id: digest.board_id.as_uuid(),
            activity_type: digest.activity_type.as_str().to_owned(),
            matched: digest.matched,
            effects: digest.effects.into_iter().map(Into::into).collect(),
            failures: digest.failures.into_iter().map(Into::into).collect(),
            diagnostics: digest.diagnostics.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditEntryResponse {
    pub event_id: String,
    pub subject: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub detail: Option<String>,
    pub created_at: String,
}

impl From<AuditLogEntry> for AuditEntryResponse {
    fn from(entry: AuditLogEntry) -> Self {
        Self {
            event_id: entry.event_id,
            subject: entry.subject,
            action: entry.action,
            resource_type: entry.resource_type,
            resource_id: entry.resource_id,
            detail: entry.detail,
            created_at: entry.created_at,
        }
    }
}
