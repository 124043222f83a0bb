// src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{auth_handlers, book_handlers, cart_handlers, fulfillment_handlers, order_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// Called in `main.rs` to configure services for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      // Health Check Route
      .route("/health", web::get().to(health_check_handler))
      // Authentication Routes
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup_handler))
          .route("/signin", web::post().to(auth_handlers::signin_handler))
          .route("/me", web::get().to(auth_handlers::me_handler)),
      )
      // Catalog Routes (list/get public, mutation admin-gated in handlers)
      .service(
        web::scope("/books")
          .route("", web::get().to(book_handlers::list_books_handler))
          .route("", web::post().to(book_handlers::create_book_handler))
          .route("/low-stock", web::get().to(book_handlers::low_stock_books_handler))
          .route("/{book_id}", web::get().to(book_handlers::get_book_handler))
          .route("/{book_id}", web::put().to(book_handlers::update_book_handler))
          .route("/{book_id}", web::delete().to(book_handlers::delete_book_handler)),
      )
      // Cart Routes
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::view_cart_handler))
          .route("/add", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/{book_id}", web::delete().to(cart_handlers::remove_from_cart_handler)),
      )
      // Order Routes
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("", web::get().to(order_handlers::list_my_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler)),
      )
      // Fulfillment Routes (admin)
      .service(
        web::scope("/fulfillment")
          .route("/queue", web::get().to(fulfillment_handlers::packing_queue_handler))
          .route("/{order_id}/pack", web::post().to(fulfillment_handlers::pack_order_handler))
          .route(
            "/{order_id}/status",
            web::post().to(fulfillment_handlers::transition_order_handler),
          ),
      ),
  );
}
