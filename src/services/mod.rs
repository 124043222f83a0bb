// src/services/mod.rs

//! Business logic invoked by the HTTP handlers. Each service owns one
//! concern; the handlers stay thin and map results to responses.

pub mod auth_service;
pub mod fulfillment_service;
pub mod order_service;
pub mod token_service;
