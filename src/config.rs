// src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  // Secret key for signing bearer tokens; must be set in the environment.
  pub token_secret: String,
  // Token lifetime in seconds.
  pub token_ttl_secs: i64,

  // Optional: for seeding the catalog on startup
  pub seed_db: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let token_secret = get_env("TOKEN_SECRET")?;
    if token_secret.len() < 16 {
      return Err(AppError::Config(
        "TOKEN_SECRET must be at least 16 characters".to_string(),
      ));
    }

    let token_ttl_secs = get_env("TOKEN_TTL_SECS")
      .unwrap_or_else(|_| "86400".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid TOKEN_TTL_SECS: {}", e)))?;

    let seed_db = get_env("SEED_DB")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      token_secret,
      token_ttl_secs,
      seed_db,
    })
  }
}
