//! Application services and ports.

#![forbid(unsafe_code)]

mod audit;
mod authorization_service;
mod board_ports;
mod dispatch_service;
mod engine;
mod role_admin_service;
mod role_ports;
mod rule_ports;
mod rule_service;

#[cfg(test)]
mod test_support;

pub use audit::{AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditRepository};
pub use authorization_service::AuthorizationService;
pub use board_ports::{
    ActivityFeed, BoardGateway, ClaimedActivityBatch, MailService, ResolvedCardMove,
};
pub use dispatch_service::{ActionDispatchService, DispatchEffect};
pub use engine::{ActivityDigest, DispatchFailure, RuleEngine, TriggerDiagnostic};
pub use role_admin_service::RoleAdminService;
pub use role_ports::{RoleAssignment, RoleRepository};
pub use rule_ports::{Rule, RuleRepository};
pub use rule_service::{CreateRuleInput, RuleService};
