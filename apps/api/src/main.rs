//! Cardflow automation API runtime.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dev_seed;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cardflow_application::{
    ActionDispatchService, AuditLogRepository, AuditRepository, AuthorizationService, BoardGateway,
    MailService, RoleAdminService, RoleRepository, RuleEngine, RuleRepository, RuleService,
};
use cardflow_core::AppError;
use cardflow_infrastructure::{
    ConsoleMailService, HttpBoardGateway, InMemoryAuditRepository, InMemoryBoardGateway,
    InMemoryRoleRepository, InMemoryRuleRepository, PostgresAuditRepository,
    PostgresRoleRepository, PostgresRuleRepository, SmtpMailConfig, SmtpMailService,
};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api_config::{ApiConfig, BoardGatewayConfig, MailProviderConfig, StorageConfig};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let app_state = build_state(&config).await?;
    let router = api_router::build_router(app_state);

    let address: SocketAddr = format!("{}:{}", config.api_host, config.api_port)
        .parse()
        .map_err(|error| AppError::Validation(format!("invalid API bind address: {error}")))?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind {address}: {error}")))?;

    info!(address = %address, "cardflow-api started");

    axum::serve(listener, router)
        .await
        .map_err(|error| AppError::Internal(format!("server error: {error}")))
}

async fn build_state(config: &ApiConfig) -> Result<AppState, AppError> {
    let (rule_repository, role_repository, audit_repository, audit_log_repository) =
        build_storage(&config.storage).await?;
    let board_gateway = build_board_gateway(&config.board_gateway).await?;
    let mail_service = build_mail_service(&config.mail_provider);

    let authorization_service = AuthorizationService::new(role_repository.clone());
    let role_admin_service = RoleAdminService::new(
        authorization_service.clone(),
        role_repository,
        audit_repository.clone(),
    );
    let rule_service = RuleService::new(
        authorization_service.clone(),
        rule_repository.clone(),
        audit_repository.clone(),
    );
    let dispatch_service = ActionDispatchService::new(
        authorization_service.clone(),
        board_gateway,
        mail_service,
    );
    let rule_engine = RuleEngine::new(rule_repository, dispatch_service, audit_repository);

    Ok(AppState {
        rule_service,
        role_admin_service,
        authorization_service,
        rule_engine,
        audit_log_repository,
        service_secret: config.service_secret.clone(),
    })
}

type StorageHandles = (
    Arc<dyn RuleRepository>,
    Arc<dyn RoleRepository>,
    Arc<dyn AuditRepository>,
    Arc<dyn AuditLogRepository>,
);

async fn build_storage(storage: &StorageConfig) -> Result<StorageHandles, AppError> {
    match storage {
        StorageConfig::Postgres { database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to connect to database: {error}"))
                })?;

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to run migrations: {error}"))
                })?;

            let audit = PostgresAuditRepository::new(pool.clone());
            Ok((
                Arc::new(PostgresRuleRepository::new(pool.clone())),
                Arc::new(PostgresRoleRepository::new(pool)),
                Arc::new(audit.clone()),
                Arc::new(audit),
            ))
        }
        StorageConfig::Memory => {
            let audit = Arc::new(InMemoryAuditRepository::new());
            Ok((
                Arc::new(InMemoryRuleRepository::new()),
                Arc::new(InMemoryRoleRepository::new()),
                audit.clone(),
                audit,
            ))
        }
    }
}

async fn build_board_gateway(
    config: &BoardGatewayConfig,
) -> Result<Arc<dyn BoardGateway>, AppError> {
    match config {
        BoardGatewayConfig::Http {
            base_url,
            shared_secret,
        } => {
            let http_client = reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .map_err(|error| {
                    AppError::Internal(format!("failed to build HTTP client: {error}"))
                })?;

            Ok(Arc::new(HttpBoardGateway::new(
                http_client,
                base_url.clone(),
                shared_secret.clone(),
                3,
                200,
            )))
        }
        BoardGatewayConfig::Memory => {
            let gateway = Arc::new(InMemoryBoardGateway::new());
            dev_seed::seed_demo_board(gateway.as_ref()).await?;
            Ok(gateway)
        }
    }
}

fn build_mail_service(config: &MailProviderConfig) -> Arc<dyn MailService> {
    match config {
        MailProviderConfig::Console => Arc::new(ConsoleMailService::new()),
        MailProviderConfig::Smtp(smtp) => Arc::new(SmtpMailService::new(SmtpMailConfig {
            host: smtp.host.clone(),
            port: smtp.port,
            username: smtp.username.clone(),
            password: smtp.password.clone(),
            from_address: smtp.from_address.clone(),
        })),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
