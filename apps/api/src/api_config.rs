use std::env;

use cardflow_core::AppError;

#[derive(Debug, Clone)]
pub struct SmtpRuntimeConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub enum MailProviderConfig {
    Console,
    Smtp(SmtpRuntimeConfig),
}

#[derive(Debug, Clone)]
pub enum StorageConfig {
    Postgres { database_url: String },
    Memory,
}

#[derive(Debug, Clone)]
pub enum BoardGatewayConfig {
    Http {
        base_url: String,
        shared_secret: String,
    },
    Memory,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub service_secret: String,
    pub storage: StorageConfig,
    pub board_gateway: BoardGatewayConfig,
    pub mail_provider: MailProviderConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);
        let service_secret = required_env("SERVICE_SHARED_SECRET")?;

        let storage = match env::var("STORAGE_DRIVER")
            .unwrap_or_else(|_| "postgres".to_owned())
            .as_str()
        {
            "postgres" => StorageConfig::Postgres {
                database_url: required_env("DATABASE_URL")?,
            },
            "memory" => StorageConfig::Memory,
            other => {
                return Err(AppError::Validation(format!(
                    "unsupported STORAGE_DRIVER '{other}'"
                )));
            }
        };

        let board_gateway = match env::var("BOARD_GATEWAY_DRIVER")
            .unwrap_or_else(|_| "http".to_owned())
            .as_str()
        {
            "http" => BoardGatewayConfig::Http {
                base_url: required_env("BOARD_API_URL")?,
                shared_secret: required_env("BOARD_API_SECRET")?,
            },
            "memory" => BoardGatewayConfig::Memory,
            other => {
                return Err(AppError::Validation(format!(
                    "unsupported BOARD_GATEWAY_DRIVER '{other}'"
                )));
            }
        };

        let mail_provider = load_mail_provider()?;

        Ok(Self {
            api_host,
            api_port,
            service_secret,
            storage,
            board_gateway,
            mail_provider,
        })
    }
}

pub fn load_mail_provider() -> Result<MailProviderConfig, AppError> {
    match env::var("MAIL_PROVIDER")
        .unwrap_or_else(|_| "console".to_owned())
        .as_str()
    {
        "console" => Ok(MailProviderConfig::Console),
        "smtp" => {
            let port = required_env("SMTP_PORT")?
                .parse::<u16>()
                .map_err(|error| AppError::Validation(format!("invalid SMTP_PORT: {error}")))?;

            Ok(MailProviderConfig::Smtp(SmtpRuntimeConfig {
                host: required_env("SMTP_HOST")?,
                port,
                username: required_env("SMTP_USERNAME")?,
                password: required_env("SMTP_PASSWORD")?,
                from_address: required_env("SMTP_FROM_ADDRESS")?,
            }))
        }
        other => Err(AppError::Validation(format!(
            "unsupported MAIL_PROVIDER '{other}'"
        ))),
    }
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}
