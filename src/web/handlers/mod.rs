// src/web/handlers/mod.rs

//! HTTP request handlers, grouped per resource.

pub mod auth_handlers;
pub mod book_handlers;
pub mod cart_handlers;
pub mod fulfillment_handlers;
pub mod order_handlers;
