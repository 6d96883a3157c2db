//! Route definitions for the Goods Receipt Workflow Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::actor_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - receipt workflow
        .nest("/receipts", receipt_routes())
}

/// Receipt workflow routes (actor identity required)
fn receipt_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_receipts).post(handlers::create_receipt),
        )
        .route("/:receipt_id", get(handlers::get_receipt))
        .route(
            "/:receipt_id/start-inspection",
            post(handlers::start_inspection),
        )
        .route(
            "/:receipt_id/items/:item_id/inspect",
            post(handlers::inspect_item),
        )
        .route("/:receipt_id/submit", post(handlers::submit_for_qc))
        .route("/:receipt_id/approve-qc", post(handlers::approve_qc))
        .route("/:receipt_id/send-back", post(handlers::send_back))
        .route("/:receipt_id/resume", post(handlers::resume_inspection))
        .route("/:receipt_id/reject", post(handlers::reject_receipt))
        .route("/:receipt_id/approve", post(handlers::approve_and_store))
        .route_layer(middleware::from_fn(actor_middleware))
}
