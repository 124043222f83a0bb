// src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::User;
use crate::services::{auth_service, token_service};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub email: String,
  pub password: String,
  pub display_name: String,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequestPayload {
  pub email: String,
  pub password: String,
}

// --- Handler Implementations ---

#[instrument(name = "handler::signup", skip(app_state, req_payload), fields(email = %req_payload.email))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();

  let email = payload.email.trim().to_lowercase();
  if email.is_empty() || !email.contains('@') {
    return Err(AppError::Validation("A valid email address is required.".to_string()));
  }
  if payload.password.len() < 8 {
    return Err(AppError::Validation(
      "Password must be at least 8 characters long.".to_string(),
    ));
  }
  if payload.display_name.trim().is_empty() {
    return Err(AppError::Validation("Display name is required.".to_string()));
  }

  let password_hash = auth_service::hash_password(&payload.password)?;

  let user: User = sqlx::query_as(
    "INSERT INTO users (id, email, display_name, password_hash, is_admin) \
     VALUES ($1, $2, $3, $4, FALSE) \
     RETURNING id, email, display_name, password_hash, is_admin, created_at, updated_at",
  )
  .bind(Uuid::new_v4())
  .bind(&email)
  .bind(payload.display_name.trim())
  .bind(&password_hash)
  .fetch_one(&app_state.db_pool)
  .await
  .map_err(|e| {
    if e.as_database_error().is_some_and(|db_err| db_err.is_unique_violation()) {
      AppError::Conflict("An account with this email already exists.".to_string())
    } else {
      AppError::Sqlx(e)
    }
  })?;

  info!(user_id = %user.id, "New user signed up.");

  Ok(HttpResponse::Created().json(json!({
      "message": "Account created successfully.",
      "user": user
  })))
}

#[instrument(name = "handler::signin", skip(app_state, req_payload), fields(email = %req_payload.email))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let email = payload.email.trim().to_lowercase();

  let user: Option<User> = sqlx::query_as(
    "SELECT id, email, display_name, password_hash, is_admin, created_at, updated_at \
     FROM users WHERE email = $1",
  )
  .bind(&email)
  .fetch_optional(&app_state.db_pool)
  .await?;

  // Same response for unknown email and wrong password.
  let invalid = || AppError::Auth("Invalid email or password.".to_string());
  let user = user.ok_or_else(invalid)?;

  if !auth_service::verify_password(&user.password_hash, &payload.password)? {
    warn!(user_id = %user.id, "Failed sign-in attempt.");
    return Err(invalid());
  }

  let token = token_service::issue_token(&app_state.config.token_secret, user.id, app_state.config.token_ttl_secs)?;

  info!(user_id = %user.id, "User signed in.");

  Ok(HttpResponse::Ok().json(json!({
      "message": "Signed in successfully.",
      "token": token,
      "user": user
  })))
}

#[instrument(name = "handler::me", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn me_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user: Option<User> = sqlx::query_as(
    "SELECT id, email, display_name, password_hash, is_admin, created_at, updated_at \
     FROM users WHERE id = $1",
  )
  .bind(auth_user.user_id)
  .fetch_optional(&app_state.db_pool)
  .await?;

  let user = user.ok_or_else(|| AppError::Auth("Unknown user identity.".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({ "user": user })))
}
