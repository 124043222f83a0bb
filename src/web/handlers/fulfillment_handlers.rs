// src/web/handlers/fulfillment_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::OrderStatus;
use crate::services::{auth_service, fulfillment_service};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct PackRequestPayload {
  pub carrier: String,
}

#[derive(Deserialize, Debug)]
pub struct StatusRequestPayload {
  pub status: OrderStatus,
}

#[instrument(name = "handler::packing_queue", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn packing_queue_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_service::require_admin(&app_state.db_pool, auth_user.user_id).await?;

  let orders = fulfillment_service::packing_queue(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::pack_order", skip(app_state, auth_user, path, req_payload), fields(user_id = %auth_user.user_id, order_id = %path.as_ref()))]
pub async fn pack_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<PackRequestPayload>,
) -> Result<HttpResponse, AppError> {
  auth_service::require_admin(&app_state.db_pool, auth_user.user_id).await?;

  let order = fulfillment_service::pack_order(&app_state.db_pool, path.into_inner(), &req_payload.carrier).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Order packed.", "order": order })))
}

#[instrument(name = "handler::transition_order", skip(app_state, auth_user, path, req_payload), fields(user_id = %auth_user.user_id, order_id = %path.as_ref()))]
pub async fn transition_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<StatusRequestPayload>,
) -> Result<HttpResponse, AppError> {
  auth_service::require_admin(&app_state.db_pool, auth_user.user_id).await?;

  let order = fulfillment_service::transition_order(&app_state.db_pool, path.into_inner(), req_payload.status).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Order status updated.", "order": order })))
}
