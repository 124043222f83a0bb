// src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Book, CartItem};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

// --- Request DTO ---

#[derive(Deserialize, Debug)]
pub struct AddToCartRequestPayload {
  pub book_id: Uuid,
  pub quantity: i32,
}

/// Cart row joined with its catalog entry for display.
#[derive(Debug, Serialize, FromRow)]
pub struct CartEntry {
  pub book_id: Uuid,
  pub title: String,
  pub author: String,
  pub price_cents: i32,
  pub quantity: i32,
  pub image_path: Option<String>,
  pub stock_quantity: i32,
}

// --- Handler Implementations ---

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, book_id = %req_payload.book_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  if payload.quantity <= 0 {
    return Err(AppError::Validation("Quantity must be positive.".to_string()));
  }

  let book: Option<Book> = sqlx::query_as(
    "SELECT id, title, author, description, price_cents, stock_quantity, image_path, created_at, updated_at \
     FROM books WHERE id = $1",
  )
  .bind(payload.book_id)
  .fetch_optional(&app_state.db_pool)
  .await?;
  let book = book.ok_or_else(|| AppError::NotFound(format!("Book with ID {} not found.", payload.book_id)))?;

  // Stock is only reserved at placement; this check just keeps carts honest
  // about what is currently available.
  let in_cart: Option<i32> = sqlx::query_scalar("SELECT quantity FROM cart_items WHERE user_id = $1 AND book_id = $2")
    .bind(auth_user.user_id)
    .bind(payload.book_id)
    .fetch_optional(&app_state.db_pool)
    .await?;
  let requested_total = in_cart.unwrap_or(0) + payload.quantity;
  if requested_total > book.stock_quantity {
    warn!(book_id = %book.id, requested = requested_total, available = book.stock_quantity, "Cart add exceeds stock.");
    return Err(AppError::InsufficientStock {
      title: book.title,
      available: book.stock_quantity,
      requested: requested_total,
    });
  }

  let cart_item: CartItem = sqlx::query_as(
    "INSERT INTO cart_items (id, user_id, book_id, quantity, added_at) \
     VALUES ($1, $2, $3, $4, NOW()) \
     ON CONFLICT (user_id, book_id) DO UPDATE \
     SET quantity = cart_items.quantity + EXCLUDED.quantity, added_at = NOW() \
     RETURNING id, user_id, book_id, quantity, added_at",
  )
  .bind(Uuid::new_v4())
  .bind(auth_user.user_id)
  .bind(payload.book_id)
  .bind(payload.quantity)
  .fetch_one(&app_state.db_pool)
  .await?;

  info!(cart_item_id = %cart_item.id, new_quantity = cart_item.quantity, "Cart updated.");

  Ok(HttpResponse::Ok().json(json!({
      "message": "Item added to cart successfully.",
      "cartItem": cart_item
  })))
}

#[instrument(name = "handler::view_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn view_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let entries: Vec<CartEntry> = sqlx::query_as(
    "SELECT c.book_id, b.title, b.author, b.price_cents, c.quantity, b.image_path, b.stock_quantity \
     FROM cart_items c JOIN books b ON b.id = c.book_id \
     WHERE c.user_id = $1 ORDER BY c.added_at ASC",
  )
  .bind(auth_user.user_id)
  .fetch_all(&app_state.db_pool)
  .await?;

  let total_cents: i64 = entries
    .iter()
    .map(|entry| i64::from(entry.price_cents) * i64::from(entry.quantity))
    .sum();

  Ok(HttpResponse::Ok().json(json!({
      "items": entries,
      "totalAmountCents": total_cents
  })))
}

#[instrument(name = "handler::remove_from_cart", skip(app_state, auth_user, path), fields(user_id = %auth_user.user_id, book_id = %path.as_ref()))]
pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let book_id = path.into_inner();

  let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND book_id = $2")
    .bind(auth_user.user_id)
    .bind(book_id)
    .execute(&app_state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::NotFound("That book is not in your cart.".to_string()));
  }

  Ok(HttpResponse::Ok().json(json!({ "message": "Item removed from cart." })))
}
