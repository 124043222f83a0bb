// src/models/book.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Catalog entry. `stock_quantity` is the units available for purchase and is
/// only ever decremented through the order placement transaction.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Book {
  pub id: Uuid,
  pub title: String,
  pub author: String,
  pub description: Option<String>,
  pub price_cents: i32,
  pub stock_quantity: i32,
  pub image_path: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
