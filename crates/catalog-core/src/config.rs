use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Upper bound for `CATALOG_TOKEN_TTL_MINUTES`: 30 days.
const MAX_TOKEN_TTL_MINUTES: i64 = 30 * 24 * 60;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("CATALOG_ENV", "development"))?;

    let bind_addr = parse_addr("CATALOG_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("CATALOG_LOG_LEVEL", "info");
    let seed_path = PathBuf::from(or_default("CATALOG_SEED_PATH", "./config/catalog.yaml"));

    let db_max_connections = parse_u32("CATALOG_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("CATALOG_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("CATALOG_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let upload_dir = PathBuf::from(or_default("CATALOG_UPLOAD_DIR", "./uploads"));
    let upload_max_bytes = parse_usize("CATALOG_UPLOAD_MAX_BYTES", "5242880")?;
    let public_base_url = or_default("CATALOG_PUBLIC_BASE_URL", "/uploads")
        .trim_end_matches('/')
        .to_string();

    let jwt_secret = optional("CATALOG_JWT_SECRET");
    if let Some(ref secret) = jwt_secret {
        if secret.len() < 32 {
            return Err(invalid(
                "CATALOG_JWT_SECRET",
                "must be at least 32 characters".to_string(),
            ));
        }
    } else if env != Environment::Development {
        return Err(ConfigError::MissingEnvVar("CATALOG_JWT_SECRET".to_string()));
    }

    let token_ttl_minutes = or_default("CATALOG_TOKEN_TTL_MINUTES", "480")
        .parse::<i64>()
        .map_err(|e| invalid("CATALOG_TOKEN_TTL_MINUTES", e.to_string()))?;
    if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&token_ttl_minutes) {
        return Err(invalid(
            "CATALOG_TOKEN_TTL_MINUTES",
            format!("must be between 1 and {MAX_TOKEN_TTL_MINUTES}"),
        ));
    }

    let admin_email = optional("CATALOG_ADMIN_EMAIL");
    let admin_password = optional("CATALOG_ADMIN_PASSWORD");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        seed_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        upload_dir,
        upload_max_bytes,
        public_base_url,
        jwt_secret,
        token_ttl_minutes,
        admin_email,
        admin_password,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CATALOG_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
