// src/models/mod.rs

//! Contains data structures representing database entities.

pub mod book;
pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod user;

// Re-export the model structs for convenient access
pub use book::Book;
pub use cart_item::CartItem;
pub use order::{Order, OrderStatus, ShippingAddress};
pub use order_item::OrderItem;
pub use user::User;
