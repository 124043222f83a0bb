// src/models/cart_item.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row per (user, book); adding the same book again accumulates quantity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartItem {
  pub id: Uuid,
  pub user_id: Uuid,
  pub book_id: Uuid,
  pub quantity: i32,
  pub added_at: DateTime<Utc>,
}
