//! Cardflow activity worker runtime.
//!
//! Polls the board application's activity feed and runs each claimed event
//! through the rule engine. Per board, events arrive and are processed in
//! feed order; ordering across boards is left to the feed.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use cardflow_application::{
    ActionDispatchService, ActivityFeed, AuthorizationService, MailService, RuleEngine,
};
use cardflow_core::{AppError, AppResult};
use cardflow_infrastructure::{
    ConsoleMailService, HttpActivityFeed, HttpBoardGateway, PostgresAuditRepository,
    PostgresRoleRepository, PostgresRuleRepository, SmtpMailConfig, SmtpMailService,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    board_api_url: String,
    board_api_secret: String,
    worker_id: String,
    claim_limit: usize,
    poll_interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let engine = build_engine(pool, http_client.clone(), &config)?;
    let feed = HttpActivityFeed::new(
        http_client,
        config.board_api_url.clone(),
        config.board_api_secret.clone(),
    );

    info!(
        worker_id = %config.worker_id,
        board_api_url = %config.board_api_url,
        claim_limit = config.claim_limit,
        poll_interval_ms = config.poll_interval_ms,
        "cardflow-worker started"
    );

    let mut cursor: Option<String> = None;

    loop {
        match feed.claim_batch(cursor.as_deref(), config.claim_limit).await {
            Ok(batch) => {
                if batch.events.is_empty() {
                    tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)).await;
                    continue;
                }

                info!(
                    worker_id = %config.worker_id,
                    claimed_count = batch.events.len(),
                    "claimed activity events"
                );

                let mut processed_events = 0_u32;
                let mut failed_rules = 0_u32;

                for event in &batch.events {
                    match engine.on_activity(event).await {
                        Ok(digest) => {
                            processed_events = processed_events.saturating_add(1);
                            failed_rules = failed_rules
                                .saturating_add(u32::try_from(digest.failures.len()).unwrap_or(0));
                            info!(
                                worker_id = %config.worker_id,
                                board_id = %digest.board_id,
                                activity_type = digest.activity_type.as_str(),
                                matched = digest.matched,
                                dispatched = digest.effects.len(),
                                failed = digest.failures.len(),
                                "activity event processed"
                            );
                        }
                        Err(error) => {
                            warn!(
                                worker_id = %config.worker_id,
                                board_id = %event.board_id(),
                                activity_type = event.activity_type().as_str(),
                                error = %error,
                                "activity event processing failed"
                            );
                        }
                    }
                }

                if let Some(next_cursor) = batch.next_cursor {
                    if let Err(error) = feed.acknowledge(next_cursor.as_str()).await {
                        warn!(
                            worker_id = %config.worker_id,
                            error = %error,
                            "failed to acknowledge activity cursor"
                        );
                    }
                    cursor = Some(next_cursor);
                }

                info!(
                    worker_id = %config.worker_id,
                    processed_events,
                    failed_rules,
                    "poll cycle finished"
                );
            }
            Err(error) => {
                warn!(
                    worker_id = %config.worker_id,
                    error = %error,
                    "failed to claim activity events"
                );
                tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)).await;
            }
        }
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_engine(
    pool: PgPool,
    http_client: reqwest::Client,
    config: &WorkerConfig,
) -> AppResult<RuleEngine> {
    let rule_repository = Arc::new(PostgresRuleRepository::new(pool.clone()));
    let role_repository = Arc::new(PostgresRoleRepository::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool));
    let board_gateway = Arc::new(HttpBoardGateway::new(
        http_client,
        config.board_api_url.clone(),
        config.board_api_secret.clone(),
        3,
        200,
    ));
    let mail_service = build_mail_service()?;

    let authorization_service = AuthorizationService::new(role_repository);
    let dispatch_service =
        ActionDispatchService::new(authorization_service, board_gateway, mail_service);

    Ok(RuleEngine::new(
        rule_repository,
        dispatch_service,
        audit_repository,
    ))
}

fn build_mail_service() -> AppResult<Arc<dyn MailService>> {
    match env::var("MAIL_PROVIDER")
        .unwrap_or_else(|_| "console".to_owned())
        .as_str()
    {
        "console" => Ok(Arc::new(ConsoleMailService::new())),
        "smtp" => {
            let port = required_env("SMTP_PORT")?
                .parse::<u16>()
                .map_err(|error| AppError::Validation(format!("invalid SMTP_PORT: {error}")))?;

            Ok(Arc::new(SmtpMailService::new(SmtpMailConfig {
                host: required_env("SMTP_HOST")?,
                port,
                username: required_env("SMTP_USERNAME")?,
                password: required_env("SMTP_PASSWORD")?,
                from_address: required_env("SMTP_FROM_ADDRESS")?,
            })))
        }
        other => Err(AppError::Validation(format!(
            "unsupported MAIL_PROVIDER '{other}'"
        ))),
    }
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let board_api_url = required_env("BOARD_API_URL")?
            .trim_end_matches('/')
            .to_owned();
        let board_api_secret = required_env("BOARD_API_SECRET")?;
        let worker_id = env::var("WORKER_ID")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| format!("worker-{}", std::process::id()));
        let claim_limit = parse_env_usize("WORKER_CLAIM_LIMIT", 20)?;
        let poll_interval_ms = parse_env_u64("WORKER_POLL_INTERVAL_MS", 1500)?;

        if claim_limit == 0 {
            return Err(AppError::Validation(
                "WORKER_CLAIM_LIMIT must be greater than zero".to_owned(),
            ));
        }

        if poll_interval_ms == 0 {
            return Err(AppError::Validation(
                "WORKER_POLL_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            board_api_url,
            board_api_secret,
            worker_id,
            claim_limit,
            poll_interval_ms,
        })
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

fn required_env(name: &str) -> AppResult<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn parse_env_usize(name: &str, default: usize) -> AppResult<usize> {
    match env::var(name) {
        Ok(value) => value.parse::<usize>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
