use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/api/boards/{board_id}/rules",
            get(handlers::rules::list_rules_handler).post(handlers::rules::create_rule_handler),
        )
        .route(
            "/api/rules/{rule_id}",
            get(handlers::rules::get_rule_handler)
                .put(handlers::rules::update_rule_handler)
                .delete(handlers::rules::delete_rule_handler),
        )
        .route(
            "/api/boards/{board_id}/roles",
            get(handlers::roles::list_role_assignments_handler)
                .post(handlers::roles::assign_role_handler),
        )
        .route(
            "/api/boards/{board_id}/roles/{subject}",
            delete(handlers::roles::revoke_role_handler),
        )
        .route(
            "/api/boards/{board_id}/permissions/{subject}",
            get(handlers::roles::effective_permissions_handler),
        )
        .route(
            "/api/boards/{board_id}/audit",
            get(handlers::audit::list_audit_entries_handler),
        )
        .route(
            "/api/activities",
            post(handlers::activities::ingest_activity_handler),
        )
        .layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_service_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
