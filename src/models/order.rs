// src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

// Matches the `order_status` enum type in schema.sql.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Packed,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  /// Lifecycle rules for fulfillment transitions. Placement always creates
  /// orders in `Pending`; `Delivered` and `Cancelled` are terminal.
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (Pending, Packed) | (Pending, Cancelled) | (Packed, Shipped) | (Packed, Cancelled) | (Shipped, Delivered)
    )
  }
}

/// Shipping address captured at placement time. Stored as flat columns on the
/// orders table and flattened into `Order` rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShippingAddress {
  pub recipient_name: String,
  pub street_address: String,
  pub city: String,
  pub postal_code: String,
  pub country: String,
  pub phone: String,
  pub email: String,
  pub delivery_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub status: OrderStatus,
  #[sqlx(flatten)]
  pub shipping_address: ShippingAddress,
  pub total_amount_cents: i64,
  pub carrier: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
