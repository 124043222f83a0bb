// src/web/extractors.rs

use actix_web::{web, FromRequest, HttpRequest};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::token_service;
use crate::state::AppState;

/// Identity extracted from a verified `Authorization: Bearer <token>` header.
/// Extraction runs before the handler body, so an unauthenticated request is
/// rejected with 401 before any content validation happens.
#[derive(Debug)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    futures_util::future::ready(extract_user(req))
  }
}

fn extract_user(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state not configured.".to_string()))?;

  let header = req
    .headers()
    .get("Authorization")
    .and_then(|value| value.to_str().ok())
    .ok_or_else(|| AppError::Auth("User authentication required.".to_string()))?;

  let token = header.strip_prefix("Bearer ").ok_or_else(|| {
    warn!("Authorization header present but not a Bearer token.");
    AppError::Auth("User authentication required.".to_string())
  })?;

  let user_id = token_service::verify_token(&state.config.token_secret, token)?;
  Ok(AuthenticatedUser { user_id })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use actix_web::test::TestRequest;
  use sqlx::postgres::PgPoolOptions;
  use std::sync::Arc;

  const SECRET: &str = "extractor-test-secret";

  fn test_state() -> web::Data<AppState> {
    // connect_lazy performs no I/O; the pool is never used by the extractor.
    let pool = PgPoolOptions::new()
      .connect_lazy("postgres://localhost/unused")
      .unwrap();
    web::Data::new(AppState {
      db_pool: pool,
      config: Arc::new(AppConfig {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_url: String::new(),
        token_secret: SECRET.to_string(),
        token_ttl_secs: 3600,
        seed_db: false,
      }),
    })
  }

  #[tokio::test]
  async fn missing_header_is_unauthenticated() {
    let req = TestRequest::default().app_data(test_state()).to_http_request();
    let result = extract_user(&req);
    assert!(matches!(result, Err(AppError::Auth(_))));
  }

  #[tokio::test]
  async fn non_bearer_header_is_unauthenticated() {
    let req = TestRequest::default()
      .app_data(test_state())
      .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
      .to_http_request();
    assert!(matches!(extract_user(&req), Err(AppError::Auth(_))));
  }

  #[tokio::test]
  async fn valid_bearer_token_yields_the_user() {
    let user_id = Uuid::new_v4();
    let token = token_service::issue_token(SECRET, user_id, 3600).unwrap();
    let req = TestRequest::default()
      .app_data(test_state())
      .insert_header(("Authorization", format!("Bearer {}", token)))
      .to_http_request();
    let user = extract_user(&req).unwrap();
    assert_eq!(user.user_id, user_id);
  }

  #[tokio::test]
  async fn tampered_token_is_unauthenticated() {
    let token = token_service::issue_token(SECRET, Uuid::new_v4(), 3600).unwrap();
    let req = TestRequest::default()
      .app_data(test_state())
      .insert_header(("Authorization", format!("Bearer {}x", token)))
      .to_http_request();
    assert!(matches!(extract_user(&req), Err(AppError::Auth(_))));
  }
}
