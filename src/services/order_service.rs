// src/services/order_service.rs

//! Order placement: converts a cart snapshot into a persisted order while
//! enforcing stock availability, as a single all-or-nothing operation.
//!
//! All mutual exclusion is delegated to the database: every book row touched
//! by an order is read with `FOR UPDATE` inside one transaction, so two
//! overlapping placements serialize on the book rows and the later one
//! observes already-decremented stock. No in-process locking, no retries;
//! a failed placement is reported to the caller, who decides whether to
//! resubmit.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{Book, Order, OrderItem, ShippingAddress};

/// Books at or below this many units after a sale are flagged to the caller
/// so the storefront can surface a restock warning.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// One requested line item. Title, price and image are the storefront's
/// snapshots; they are persisted as-is and never re-validated against the
/// current catalog price.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
  pub book_id: Uuid,
  pub title: String,
  pub price_cents: i32,
  pub quantity: i32,
  pub image_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
  pub items: Vec<OrderItemRequest>,
  pub shipping_address: ShippingAddress,
  pub total_amount_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LowStockBook {
  pub title: String,
  pub stock: i32,
}

#[derive(Debug, Serialize)]
pub struct PlacedOrder {
  pub order: Order,
  pub items: Vec<OrderItem>,
  pub low_stock_books: Vec<LowStockBook>,
}

/// Places an order for `user_id`.
///
/// On success every referenced book's stock has been reduced by the requested
/// quantity and one `pending` order row (plus its line items) exists, all
/// committed atomically. On any failure the transaction is dropped and rolls
/// back, so no partial decrement is ever observable. The first failing
/// condition is reported; items are processed strictly in the given order.
#[instrument(
  name = "order_service::place_order",
  skip(pool, request),
  fields(user_id = %user_id, item_count = request.items.len())
)]
pub async fn place_order(pool: &PgPool, user_id: Uuid, request: PlaceOrderRequest) -> Result<PlacedOrder> {
  validate_request(&request)?;

  // Fail fast if the store cannot give us a transactional scope; falling
  // back to non-atomic writes is never acceptable here.
  let mut tx = pool
    .begin()
    .await
    .map_err(|e| AppError::TransactionUnavailable(e.to_string()))?;

  // Per item, in the given order: lock the book row, check availability,
  // write back the decremented stock. Repeated book ids are fine: the second
  // read observes the first decrement within the same transaction.
  for item in &request.items {
    let book: Option<Book> = sqlx::query_as(
      "SELECT id, title, author, description, price_cents, stock_quantity, image_path, created_at, updated_at \
       FROM books WHERE id = $1 FOR UPDATE",
    )
    .bind(item.book_id)
    .fetch_optional(&mut *tx)
    .await?;

    let book = book.ok_or_else(|| AppError::NotFound(format!("Book with ID {} not found.", item.book_id)))?;

    if book.stock_quantity < 0 {
      warn!(book_id = %book.id, stock = book.stock_quantity, "Negative stock encountered during placement.");
      return Err(AppError::InvalidInventoryState(book.title));
    }
    if book.stock_quantity < item.quantity {
      return Err(AppError::InsufficientStock {
        title: book.title,
        available: book.stock_quantity,
        requested: item.quantity,
      });
    }

    sqlx::query("UPDATE books SET stock_quantity = $1, updated_at = NOW() WHERE id = $2")
      .bind(book.stock_quantity - item.quantity)
      .bind(book.id)
      .execute(&mut *tx)
      .await?;
  }

  let order: Order = sqlx::query_as(
    "INSERT INTO orders (id, user_id, status, recipient_name, street_address, city, postal_code, \
     country, phone, email, delivery_notes, total_amount_cents) \
     VALUES ($1, $2, 'pending', $3, $4, $5, $6, $7, $8, $9, $10, $11) \
     RETURNING id, user_id, status, recipient_name, street_address, city, postal_code, country, \
     phone, email, delivery_notes, total_amount_cents, carrier, created_at, updated_at",
  )
  .bind(Uuid::new_v4())
  .bind(user_id)
  .bind(&request.shipping_address.recipient_name)
  .bind(&request.shipping_address.street_address)
  .bind(&request.shipping_address.city)
  .bind(&request.shipping_address.postal_code)
  .bind(&request.shipping_address.country)
  .bind(&request.shipping_address.phone)
  .bind(&request.shipping_address.email)
  .bind(&request.shipping_address.delivery_notes)
  .bind(request.total_amount_cents)
  .fetch_one(&mut *tx)
  .await?;

  let mut order_items = Vec::with_capacity(request.items.len());
  for item in &request.items {
    let line_item = OrderItem {
      id: Uuid::new_v4(),
      order_id: order.id,
      book_id: item.book_id,
      title: item.title.clone(),
      price_cents: item.price_cents,
      quantity: item.quantity,
      image_path: item.image_path.clone(),
    };
    sqlx::query(
      "INSERT INTO order_items (id, order_id, book_id, title, price_cents, quantity, image_path) \
       VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(line_item.id)
    .bind(line_item.order_id)
    .bind(line_item.book_id)
    .bind(&line_item.title)
    .bind(line_item.price_cents)
    .bind(line_item.quantity)
    .bind(&line_item.image_path)
    .execute(&mut *tx)
    .await?;
    order_items.push(line_item);
  }

  // Re-read each affected book once, after all decrements, so a book that
  // appears in several line items is reported with its final stock.
  let mut low_stock_books = Vec::new();
  for book_id in distinct_book_ids(&request.items) {
    let (title, stock): (String, i32) = sqlx::query_as("SELECT title, stock_quantity FROM books WHERE id = $1")
      .bind(book_id)
      .fetch_one(&mut *tx)
      .await?;
    if is_low_stock(stock) {
      low_stock_books.push(LowStockBook { title, stock });
    }
  }

  tx.commit().await?;

  info!(order_id = %order.id, total_cents = order.total_amount_cents, "Order placed successfully.");

  Ok(PlacedOrder {
    order,
    items: order_items,
    low_stock_books,
  })
}

/// Content validation, performed before any I/O. Authentication is enforced
/// upstream by the bearer-token extractor, so the auth check always precedes
/// everything here.
fn validate_request(request: &PlaceOrderRequest) -> Result<()> {
  if request.items.is_empty() {
    return Err(AppError::Validation("No items in the order.".to_string()));
  }
  for item in &request.items {
    if item.quantity <= 0 {
      return Err(AppError::Validation(format!(
        "Invalid quantity {} for \"{}\".",
        item.quantity, item.title
      )));
    }
    if item.price_cents < 0 {
      return Err(AppError::Validation(format!("Invalid price for \"{}\".", item.title)));
    }
  }

  let addr = &request.shipping_address;
  let required = [
    &addr.recipient_name,
    &addr.street_address,
    &addr.city,
    &addr.postal_code,
    &addr.country,
    &addr.phone,
    &addr.email,
  ];
  if request.total_amount_cents <= 0 || required.iter().any(|field| field.trim().is_empty()) {
    return Err(AppError::Validation("Missing required fields.".to_string()));
  }

  // Creation-time invariant: the total must equal the sum over the submitted
  // line-item snapshots (not current catalog prices).
  let computed = order_total_cents(&request.items);
  if request.total_amount_cents != computed {
    return Err(AppError::Validation(format!(
      "Total amount mismatch: expected {} cents from line items, got {}.",
      computed, request.total_amount_cents
    )));
  }

  Ok(())
}

fn order_total_cents(items: &[OrderItemRequest]) -> i64 {
  items
    .iter()
    .map(|item| i64::from(item.price_cents) * i64::from(item.quantity))
    .sum()
}

// The source system mixed `<` and `<=` for this check; `<=` is used
// everywhere in this codebase.
pub fn is_low_stock(stock: i32) -> bool {
  stock <= LOW_STOCK_THRESHOLD
}

/// Distinct book ids in first-appearance order.
fn distinct_book_ids(items: &[OrderItemRequest]) -> Vec<Uuid> {
  let mut seen = Vec::with_capacity(items.len());
  for item in items {
    if !seen.contains(&item.book_id) {
      seen.push(item.book_id);
    }
  }
  seen
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(quantity: i32, price_cents: i32) -> OrderItemRequest {
    OrderItemRequest {
      book_id: Uuid::new_v4(),
      title: "The Name of the Wind".to_string(),
      price_cents,
      quantity,
      image_path: None,
    }
  }

  fn address() -> ShippingAddress {
    ShippingAddress {
      recipient_name: "Ada Lovelace".to_string(),
      street_address: "12 Analytical Way".to_string(),
      city: "London".to_string(),
      postal_code: "EC1A 1BB".to_string(),
      country: "UK".to_string(),
      phone: "+44 20 7946 0000".to_string(),
      email: "ada@example.com".to_string(),
      delivery_notes: None,
    }
  }

  fn request(items: Vec<OrderItemRequest>) -> PlaceOrderRequest {
    let total_amount_cents = order_total_cents(&items);
    PlaceOrderRequest {
      items,
      shipping_address: address(),
      total_amount_cents,
    }
  }

  #[test]
  fn empty_items_are_rejected() {
    let mut req = request(vec![]);
    req.total_amount_cents = 100; // even with a plausible total
    let err = validate_request(&req).unwrap_err();
    assert!(matches!(err, AppError::Validation(m) if m.contains("No items")));
  }

  #[test]
  fn zero_and_negative_quantities_are_rejected() {
    for quantity in [0, -3] {
      let req = request(vec![item(quantity, 1999)]);
      assert!(validate_request(&req).is_err());
    }
  }

  #[test]
  fn blank_address_fields_are_rejected() {
    let mut req = request(vec![item(1, 1999)]);
    req.shipping_address.city = "   ".to_string();
    let err = validate_request(&req).unwrap_err();
    assert!(matches!(err, AppError::Validation(m) if m.contains("Missing required fields")));
  }

  #[test]
  fn zero_total_is_rejected() {
    let mut req = request(vec![item(1, 1999)]);
    req.total_amount_cents = 0;
    assert!(validate_request(&req).is_err());
  }

  #[test]
  fn total_must_match_line_item_snapshots() {
    let mut req = request(vec![item(2, 1999)]);
    req.total_amount_cents += 1;
    let err = validate_request(&req).unwrap_err();
    assert!(matches!(err, AppError::Validation(m) if m.contains("mismatch")));
  }

  #[test]
  fn valid_request_passes() {
    let req = request(vec![item(3, 1999), item(1, 2500)]);
    assert!(validate_request(&req).is_ok());
  }

  #[test]
  fn total_uses_price_times_quantity() {
    let items = vec![item(3, 1000), item(2, 250)];
    assert_eq!(order_total_cents(&items), 3_500);
  }

  #[test]
  fn total_does_not_overflow_i32() {
    let items = vec![item(1_000_000, i32::MAX)];
    assert_eq!(order_total_cents(&items), i64::from(i32::MAX) * 1_000_000);
  }

  #[test]
  fn distinct_ids_keep_first_appearance_order() {
    let a = item(1, 100);
    let b = item(1, 200);
    let a_again = OrderItemRequest {
      book_id: a.book_id,
      ..item(2, 100)
    };
    let ids = distinct_book_ids(&[a.clone(), b.clone(), a_again]);
    assert_eq!(ids, vec![a.book_id, b.book_id]);
  }

  #[test]
  fn low_stock_boundary_is_inclusive_at_five() {
    assert!(is_low_stock(0));
    assert!(is_low_stock(4));
    assert!(is_low_stock(5));
    assert!(!is_low_stock(6));
  }

  // --- Transactional properties against a live database ---
  //
  // These run against DATABASE_URL with schema.sql applied:
  //   cargo test -- --ignored

  use crate::models::OrderStatus;

  async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a database with schema.sql applied");
    PgPool::connect(&url).await.expect("failed to connect to test database")
  }

  async fn seed_user(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, display_name, password_hash) VALUES ($1, $2, 'Test Reader', 'x')")
      .bind(id)
      .bind(format!("reader-{}@example.com", id.simple()))
      .execute(pool)
      .await
      .expect("failed to seed user");
    id
  }

  async fn seed_book(pool: &PgPool, stock: i32, price_cents: i32) -> (Uuid, String) {
    let id = Uuid::new_v4();
    let title = format!("Test Book {}", id.simple());
    sqlx::query("INSERT INTO books (id, title, author, price_cents, stock_quantity) VALUES ($1, $2, 'Test Author', $3, $4)")
      .bind(id)
      .bind(&title)
      .bind(price_cents)
      .bind(stock)
      .execute(pool)
      .await
      .expect("failed to seed book");
    (id, title)
  }

  async fn stock_of(pool: &PgPool, book_id: Uuid) -> i32 {
    sqlx::query_scalar("SELECT stock_quantity FROM books WHERE id = $1")
      .bind(book_id)
      .fetch_one(pool)
      .await
      .expect("failed to read stock")
  }

  async fn order_count(pool: &PgPool, user_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
      .bind(user_id)
      .fetch_one(pool)
      .await
      .expect("failed to count orders")
  }

  fn item_for(book_id: Uuid, title: &str, quantity: i32, price_cents: i32) -> OrderItemRequest {
    OrderItemRequest {
      book_id,
      title: title.to_string(),
      price_cents,
      quantity,
      image_path: None,
    }
  }

  #[tokio::test]
  #[ignore = "requires a PostgreSQL database with schema.sql applied"]
  async fn placement_decrements_stock_and_flags_low_stock() {
    let pool = test_pool().await;
    let user_id = seed_user(&pool).await;
    let (scarce_id, scarce_title) = seed_book(&pool, 8, 1999).await;
    let (plentiful_id, plentiful_title) = seed_book(&pool, 20, 2500).await;

    let placed = place_order(
      &pool,
      user_id,
      request(vec![
        item_for(scarce_id, &scarce_title, 4, 1999),
        item_for(plentiful_id, &plentiful_title, 3, 2500),
      ]),
    )
    .await
    .expect("placement should succeed");

    // Conservation: qty_after = qty_before - requested, for every item.
    assert_eq!(stock_of(&pool, scarce_id).await, 4);
    assert_eq!(stock_of(&pool, plentiful_id).await, 17);
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.items.len(), 2);

    // Only the book at or below the threshold is reported, with its
    // post-decrement stock.
    assert_eq!(placed.low_stock_books.len(), 1);
    assert_eq!(placed.low_stock_books[0].title, scarce_title);
    assert_eq!(placed.low_stock_books[0].stock, 4);
  }

  #[tokio::test]
  #[ignore = "requires a PostgreSQL database with schema.sql applied"]
  async fn failed_placement_rolls_back_every_decrement() {
    let pool = test_pool().await;
    let user_id = seed_user(&pool).await;
    let (first_id, first_title) = seed_book(&pool, 10, 1500).await;
    let (short_id, short_title) = seed_book(&pool, 2, 1800).await;

    // The first item is satisfiable; the second is not. The first item's
    // decrement must not survive the abort.
    let build_request = || {
      request(vec![
        item_for(first_id, &first_title, 3, 1500),
        item_for(short_id, &short_title, 5, 1800),
      ])
    };

    let err = place_order(&pool, user_id, build_request()).await.unwrap_err();
    assert!(
      matches!(&err, AppError::InsufficientStock { title, available: 2, requested: 5 } if *title == short_title),
      "unexpected error: {err}"
    );
    assert_eq!(stock_of(&pool, first_id).await, 10);
    assert_eq!(stock_of(&pool, short_id).await, 2);
    assert_eq!(order_count(&pool, user_id).await, 0);

    // Idempotent rejection: resubmitting yields the same error and still no
    // state change.
    let err = place_order(&pool, user_id, build_request()).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));
    assert_eq!(stock_of(&pool, first_id).await, 10);
    assert_eq!(stock_of(&pool, short_id).await, 2);
    assert_eq!(order_count(&pool, user_id).await, 0);
  }

  #[tokio::test]
  #[ignore = "requires a PostgreSQL database with schema.sql applied"]
  async fn unknown_book_aborts_the_whole_placement() {
    let pool = test_pool().await;
    let user_id = seed_user(&pool).await;
    let (book_id, title) = seed_book(&pool, 10, 1200).await;

    let err = place_order(
      &pool,
      user_id,
      request(vec![
        item_for(book_id, &title, 2, 1200),
        item_for(Uuid::new_v4(), "Ghost Book", 1, 999),
      ]),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(stock_of(&pool, book_id).await, 10);
    assert_eq!(order_count(&pool, user_id).await, 0);
  }
}
