// src/web/handlers/book_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Book;
use crate::services::auth_service;
use crate::services::order_service::LOW_STOCK_THRESHOLD;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

const BOOK_COLUMNS: &str =
  "id, title, author, description, price_cents, stock_quantity, image_path, created_at, updated_at";

#[derive(Deserialize, Debug)]
pub struct BookPayload {
  pub title: String,
  pub author: String,
  pub description: Option<String>,
  pub price_cents: i32,
  pub stock_quantity: i32,
  pub image_path: Option<String>,
}

fn validate_book_payload(payload: &BookPayload) -> Result<(), AppError> {
  if payload.title.trim().is_empty() || payload.author.trim().is_empty() {
    return Err(AppError::Validation("Title and author are required.".to_string()));
  }
  if payload.price_cents < 0 {
    return Err(AppError::Validation("Price cannot be negative.".to_string()));
  }
  if payload.stock_quantity < 0 {
    return Err(AppError::Validation("Stock quantity cannot be negative.".to_string()));
  }
  Ok(())
}

#[instrument(name = "handler::list_books", skip(app_state))]
pub async fn list_books_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let books: Vec<Book> = sqlx::query_as(&format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY title ASC"))
    .fetch_all(&app_state.db_pool)
    .await?;

  Ok(HttpResponse::Ok().json(json!({ "books": books })))
}

#[instrument(name = "handler::get_book", skip(app_state, path), fields(book_id = %path.as_ref()))]
pub async fn get_book_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let book_id = path.into_inner();

  let book: Option<Book> = sqlx::query_as(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
    .bind(book_id)
    .fetch_optional(&app_state.db_pool)
    .await?;

  match book {
    Some(book) => Ok(HttpResponse::Ok().json(json!({ "book": book }))),
    None => {
      warn!("Book with ID {} not found.", book_id);
      Err(AppError::NotFound(format!("Book with ID {} not found.", book_id)))
    }
  }
}

#[instrument(name = "handler::create_book", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn create_book_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<BookPayload>,
) -> Result<HttpResponse, AppError> {
  auth_service::require_admin(&app_state.db_pool, auth_user.user_id).await?;
  let payload = req_payload.into_inner();
  validate_book_payload(&payload)?;

  let book: Book = sqlx::query_as(&format!(
    "INSERT INTO books (id, title, author, description, price_cents, stock_quantity, image_path) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {BOOK_COLUMNS}"
  ))
  .bind(Uuid::new_v4())
  .bind(payload.title.trim())
  .bind(payload.author.trim())
  .bind(&payload.description)
  .bind(payload.price_cents)
  .bind(payload.stock_quantity)
  .bind(&payload.image_path)
  .fetch_one(&app_state.db_pool)
  .await?;

  info!(book_id = %book.id, "Book added to catalog.");
  Ok(HttpResponse::Created().json(json!({ "message": "Book created successfully.", "book": book })))
}

#[instrument(name = "handler::update_book", skip(app_state, auth_user, req_payload, path), fields(user_id = %auth_user.user_id, book_id = %path.as_ref()))]
pub async fn update_book_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<BookPayload>,
) -> Result<HttpResponse, AppError> {
  auth_service::require_admin(&app_state.db_pool, auth_user.user_id).await?;
  let book_id = path.into_inner();
  let payload = req_payload.into_inner();
  validate_book_payload(&payload)?;

  let book: Option<Book> = sqlx::query_as(&format!(
    "UPDATE books SET title = $1, author = $2, description = $3, price_cents = $4, \
     stock_quantity = $5, image_path = $6, updated_at = NOW() WHERE id = $7 RETURNING {BOOK_COLUMNS}"
  ))
  .bind(payload.title.trim())
  .bind(payload.author.trim())
  .bind(&payload.description)
  .bind(payload.price_cents)
  .bind(payload.stock_quantity)
  .bind(&payload.image_path)
  .bind(book_id)
  .fetch_optional(&app_state.db_pool)
  .await?;

  let book = book.ok_or_else(|| AppError::NotFound(format!("Book with ID {} not found.", book_id)))?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Book updated successfully.", "book": book })))
}

#[instrument(name = "handler::delete_book", skip(app_state, auth_user, path), fields(user_id = %auth_user.user_id, book_id = %path.as_ref()))]
pub async fn delete_book_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  auth_service::require_admin(&app_state.db_pool, auth_user.user_id).await?;
  let book_id = path.into_inner();

  let result = sqlx::query("DELETE FROM books WHERE id = $1")
    .bind(book_id)
    .execute(&app_state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound(format!("Book with ID {} not found.", book_id)));
  }

  info!(book_id = %book_id, "Book removed from catalog.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Book deleted successfully." })))
}

/// The restock dashboard query: everything at or below the low-stock
/// threshold, most depleted first.
#[instrument(name = "handler::low_stock_books", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn low_stock_books_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_service::require_admin(&app_state.db_pool, auth_user.user_id).await?;

  let books: Vec<Book> = sqlx::query_as(&format!(
    "SELECT {BOOK_COLUMNS} FROM books WHERE stock_quantity <= $1 ORDER BY stock_quantity ASC, title ASC"
  ))
  .bind(LOW_STOCK_THRESHOLD)
  .fetch_all(&app_state.db_pool)
  .await?;

  Ok(HttpResponse::Ok().json(json!({ "books": books })))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn payload() -> BookPayload {
    BookPayload {
      title: "The Left Hand of Darkness".to_string(),
      author: "Ursula K. Le Guin".to_string(),
      description: None,
      price_cents: 1599,
      stock_quantity: 12,
      image_path: None,
    }
  }

  #[test]
  fn valid_payload_passes() {
    assert!(validate_book_payload(&payload()).is_ok());
  }

  #[test]
  fn blank_title_or_author_is_rejected() {
    let mut p = payload();
    p.title = "  ".to_string();
    assert!(validate_book_payload(&p).is_err());

    let mut p = payload();
    p.author = String::new();
    assert!(validate_book_payload(&p).is_err());
  }

  #[test]
  fn negative_price_or_stock_is_rejected() {
    let mut p = payload();
    p.price_cents = -1;
    assert!(validate_book_payload(&p).is_err());

    let mut p = payload();
    p.stock_quantity = -1;
    assert!(validate_book_payload(&p).is_err());
  }
}
