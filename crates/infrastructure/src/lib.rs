//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod console_mail_service;
mod http_activity_feed;
mod http_board_gateway;
mod in_memory_audit_repository;
mod in_memory_board_gateway;
mod in_memory_role_repository;
mod in_memory_rule_repository;
mod postgres_audit_repository;
mod postgres_role_repository;
mod postgres_rule_repository;
mod smtp_mail_service;

pub use console_mail_service::ConsoleMailService;
pub use http_activity_feed::HttpActivityFeed;
pub use http_board_gateway::HttpBoardGateway;
pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use in_memory_board_gateway::{CardSnapshot, ChecklistSnapshot, InMemoryBoardGateway};
pub use in_memory_role_repository::InMemoryRoleRepository;
pub use in_memory_rule_repository::InMemoryRuleRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_role_repository::PostgresRoleRepository;
pub use postgres_rule_repository::PostgresRuleRepository;
pub use smtp_mail_service::{SmtpMailConfig, SmtpMailService};
