// src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Insufficient stock for \"{title}\": requested {requested}, available {available}")]
  InsufficientStock {
    title: String,
    available: i32,
    requested: i32,
  },

  // Stored stock is outside its invariant (negative). Always a server-side
  // data problem, never the caller's fault.
  #[error("Inventory record for \"{0}\" is in an invalid state")]
  InvalidInventoryState(String),

  // The store could not open a multi-row transaction. Placement must fail
  // fast here rather than fall back to non-atomic writes.
  #[error("Transaction could not be established: {0}")]
  TransactionUnavailable(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Allow anyhow::Error to be converted into AppError::Internal for convenience
// in handlers that call `?` on functions returning anyhow::Result.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    if err.is::<sqlx::Error>() {
      return AppError::Sqlx(err.downcast::<sqlx::Error>().unwrap());
    }
    AppError::Internal(err.to_string())
  }
}

// Serialization failures and deadlocks are transient: Postgres aborted the
// losing transaction and a plain resubmit of the same request can succeed.
fn is_retryable_sqlstate(code: Option<&str>) -> bool {
  matches!(code, Some("40001") | Some("40P01"))
}

fn sqlx_is_retryable(err: &sqlx::Error) -> bool {
  match err {
    sqlx::Error::Database(db_err) => is_retryable_sqlstate(db_err.code().as_deref()),
    _ => false,
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Sqlx(e) if sqlx_is_retryable(e) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::TransactionUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::InvalidInventoryState(_) | AppError::Config(_) | AppError::Sqlx(_) | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response.
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"message": m})),
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"message": m})),
      AppError::Forbidden(m) => HttpResponse::Forbidden().json(json!({"message": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"message": m})),
      AppError::InsufficientStock { .. } => HttpResponse::BadRequest().json(json!({"message": self.to_string()})),
      AppError::Conflict(m) => HttpResponse::Conflict().json(json!({"message": m})),
      AppError::Sqlx(e) if sqlx_is_retryable(e) => HttpResponse::ServiceUnavailable()
        .json(json!({"message": "The order conflicted with another in progress. Please try again."})),
      AppError::TransactionUnavailable(_) => HttpResponse::ServiceUnavailable()
        .json(json!({"message": "Order processing is temporarily unavailable. Please try again."})),
      AppError::InvalidInventoryState(_) => {
        HttpResponse::InternalServerError().json(json!({"message": "Inventory data error"}))
      }
      AppError::Config(m) => HttpResponse::InternalServerError().json(json!({"message": "Configuration issue", "detail": m})),
      // Never leak driver-level detail to the client.
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"message": "Database operation failed"})),
      AppError::Internal(_) => HttpResponse::InternalServerError().json(json!({"message": "An internal error occurred"})),
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn insufficient_stock_message_names_book_and_counts() {
    let err = AppError::InsufficientStock {
      title: "Dune".to_string(),
      available: 2,
      requested: 5,
    };
    let msg = err.to_string();
    assert!(msg.contains("Dune"));
    assert!(msg.contains('2'));
    assert!(msg.contains('5'));
  }

  #[test]
  fn status_codes_follow_error_class() {
    assert_eq!(
      AppError::Validation("no items".into()).status_code(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(AppError::Auth("missing token".into()).status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::Forbidden("admins only".into()).status_code(), StatusCode::FORBIDDEN);
    assert_eq!(AppError::NotFound("book".into()).status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
      AppError::InsufficientStock {
        title: "x".into(),
        available: 0,
        requested: 1
      }
      .status_code(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      AppError::TransactionUnavailable("no replica set".into()).status_code(),
      StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(
      AppError::InvalidInventoryState("x".into()).status_code(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }

  #[test]
  fn serialization_and_deadlock_sqlstates_are_retryable() {
    assert!(is_retryable_sqlstate(Some("40001"))); // serialization_failure
    assert!(is_retryable_sqlstate(Some("40P01"))); // deadlock_detected
    assert!(!is_retryable_sqlstate(Some("23505"))); // unique_violation
    assert!(!is_retryable_sqlstate(None));
  }

  #[test]
  fn non_retryable_sqlx_errors_stay_internal() {
    assert!(!sqlx_is_retryable(&sqlx::Error::PoolTimedOut));
    assert_eq!(
      AppError::Sqlx(sqlx::Error::RowNotFound).status_code(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }

  #[test]
  fn sqlx_errors_do_not_leak_detail() {
    let err = AppError::Sqlx(sqlx::Error::PoolTimedOut);
    let body = err.error_response();
    assert_eq!(body.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
