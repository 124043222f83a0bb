// src/models/order_item.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable line item. Title, price and image are snapshots taken at
/// placement time; later catalog edits do not affect existing orders.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub book_id: Uuid,
  pub title: String,
  pub price_cents: i32,
  pub quantity: i32,
  pub image_path: Option<String>,
}
