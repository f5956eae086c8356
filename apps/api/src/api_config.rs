use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use wardkeep_core::AppError;
use wardkeep_domain::UserId;

const DEFAULT_CACHE_TTL_SECONDS: u32 = 300;
const DEFAULT_CACHE_KEY_PREFIX: &str = "wardkeep:permissions";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub api_host: String,
    pub api_port: u16,
    pub permission_cache_ttl_seconds: u32,
    pub permission_cache_key_prefix: String,
    pub seed_default_catalog: bool,
    pub bootstrap_admin_id: Option<UserId>,
    pub cors_allowed_origin: Option<String>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(env::args().nth(1).as_deref(), |name| env::var(name).ok())
    }

    fn from_lookup(
        first_argument: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let migrate_only = first_argument == Some("migrate");
        let database_url = optional("DATABASE_URL");
        if migrate_only && database_url.is_none() {
            return Err(AppError::Validation(
                "DATABASE_URL is required to run migrations".to_owned(),
            ));
        }

        let api_port = match optional("API_PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|error| AppError::Validation(format!("invalid API_PORT: {error}")))?,
            None => 3001,
        };

        let permission_cache_ttl_seconds = match optional("PERMISSION_CACHE_TTL_SECONDS") {
            Some(value) => value.trim().parse::<u32>().map_err(|error| {
                AppError::Validation(format!("invalid PERMISSION_CACHE_TTL_SECONDS: {error}"))
            })?,
            None => DEFAULT_CACHE_TTL_SECONDS,
        };

        let seed_default_catalog = match optional("SEED_DEFAULT_CATALOG") {
            Some(value) => parse_bool("SEED_DEFAULT_CATALOG", value.as_str())?,
            None => true,
        };

        let bootstrap_admin_id = optional("BOOTSTRAP_ADMIN_USER_ID")
            .map(|value| {
                uuid::Uuid::parse_str(value.trim())
                    .map(UserId::from_uuid)
                    .map_err(|error| {
                        AppError::Validation(format!("invalid BOOTSTRAP_ADMIN_USER_ID: {error}"))
                    })
            })
            .transpose()?;

        Ok(Self {
            migrate_only,
            database_url,
            redis_url: optional("REDIS_URL"),
            api_host: optional("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned()),
            api_port,
            permission_cache_ttl_seconds,
            permission_cache_key_prefix: optional("PERMISSION_CACHE_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_CACHE_KEY_PREFIX.to_owned()),
            seed_default_catalog,
            bootstrap_admin_id,
            cors_allowed_origin: optional("CORS_ALLOWED_ORIGIN"),
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_bool(name: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(AppError::Validation(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}
