// src/web/mod.rs

//! Web layer: routing, extractors, and request handlers.

pub mod extractors;
pub mod handlers;
pub mod routes;
