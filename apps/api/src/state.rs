use std::sync::Arc;

use cardflow_application::{
    AuditLogRepository, AuthorizationService, RoleAdminService, RuleEngine, RuleService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub rule_service: RuleService,
    pub role_admin_service: RoleAdminService,
    pub authorization_service: AuthorizationService,
    pub rule_engine: RuleEngine,
    pub audit_log_repository: Arc<dyn AuditLogRepository>,
    pub service_secret: String,
}
