// src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Order, OrderItem};
use crate::services::order_service::{self, PlaceOrderRequest};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

const ORDER_COLUMNS: &str = "id, user_id, status, recipient_name, street_address, city, postal_code, \
  country, phone, email, delivery_notes, total_amount_cents, carrier, created_at, updated_at";

/// `POST /orders` — the order placement entry point. The authenticated user
/// comes from the bearer-token extractor, which runs before this body; the
/// rest of the request is validated and executed atomically by the service.
#[instrument(name = "handler::create_order", skip(app_state, req_payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<PlaceOrderRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let placed = order_service::place_order(&app_state.db_pool, auth_user.user_id, req_payload.into_inner()).await?;

  info!(order_id = %placed.order.id, "Order placement completed.");

  Ok(HttpResponse::Created().json(json!({
      "message": "Order placed successfully.",
      "order": {
          "id": placed.order.id,
          "status": placed.order.status,
          "shippingAddress": placed.order.shipping_address,
          "totalAmountCents": placed.order.total_amount_cents,
          "createdAt": placed.order.created_at,
          "items": placed.items,
      },
      "lowStockBooks": placed.low_stock_books
  })))
}

#[instrument(name = "handler::list_my_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders: Vec<Order> = sqlx::query_as(&format!(
    "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
  ))
  .bind(auth_user.user_id)
  .fetch_all(&app_state.db_pool)
  .await?;

  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user, path), fields(user_id = %auth_user.user_id, order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();

  let order: Option<Order> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
    .bind(order_id)
    .fetch_optional(&app_state.db_pool)
    .await?;
  let order = order.ok_or_else(|| AppError::NotFound(format!("Order with ID {} not found.", order_id)))?;

  // Owners see their own orders; everyone else needs the admin gate.
  if order.user_id != auth_user.user_id {
    crate::services::auth_service::require_admin(&app_state.db_pool, auth_user.user_id).await?;
  }

  let items: Vec<OrderItem> = sqlx::query_as(
    "SELECT id, order_id, book_id, title, price_cents, quantity, image_path \
     FROM order_items WHERE order_id = $1",
  )
  .bind(order_id)
  .fetch_all(&app_state.db_pool)
  .await?;

  Ok(HttpResponse::Ok().json(json!({ "order": order, "items": items })))
}
