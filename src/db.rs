// src/db.rs

//! Startup catalog seeding, enabled via `SEED_DB=true`. Inserts are keyed on
//! the title unique index so re-running against a seeded database is a no-op.

use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::Result;

const SEED_BOOKS: &[(&str, &str, i32, i32)] = &[
  ("The Name of the Wind", "Patrick Rothfuss", 1899, 14),
  ("The Left Hand of Darkness", "Ursula K. Le Guin", 1599, 9),
  ("Dune", "Frank Herbert", 2199, 20),
  ("Piranesi", "Susanna Clarke", 1499, 4),
  ("The Dispossessed", "Ursula K. Le Guin", 1699, 6),
];

#[instrument(name = "db::seed_catalog", skip(pool))]
pub async fn seed_catalog(pool: &PgPool) -> Result<()> {
  let mut inserted = 0u64;
  for &(title, author, price_cents, stock_quantity) in SEED_BOOKS {
    let result = sqlx::query(
      "INSERT INTO books (id, title, author, price_cents, stock_quantity) \
       VALUES ($1, $2, $3, $4, $5) ON CONFLICT (title) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(title)
    .bind(author)
    .bind(price_cents)
    .bind(stock_quantity)
    .execute(pool)
    .await?;
    inserted += result.rows_affected();
  }
  info!(inserted, "Catalog seeding finished.");
  Ok(())
}
