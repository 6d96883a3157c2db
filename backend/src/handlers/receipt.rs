//! HTTP handlers for receipt creation and queries

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentActor;
use crate::services::receipt::{
    CreateReceiptInput, ReceiptFilters, ReceiptService, ReceiptSummary,
};
use crate::AppState;
use shared::models::{Receipt, ReceiptStatus};
use shared::types::{PaginatedResponse, Pagination};

/// Query parameters for the receipt listing
#[derive(Debug, Deserialize)]
pub struct ListReceiptsQuery {
    pub status: Option<ReceiptStatus>,
    pub search: Option<String>,
    pub created_by: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Create a receipt; the workflow starts in `pending`
pub async fn create_receipt(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(input): Json<CreateReceiptInput>,
) -> AppResult<Json<Receipt>> {
    let service = ReceiptService::new(state.db);
    let receipt = service.create(actor.0.actor_id, input).await?;
    Ok(Json(receipt))
}

/// Get the full receipt aggregate, including items and activity log
pub async fn get_receipt(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(receipt_id): Path<Uuid>,
) -> AppResult<Json<Receipt>> {
    let service = ReceiptService::new(state.db);
    let receipt = service.get(receipt_id).await?;
    Ok(Json(receipt))
}

/// List receipts with optional filters
pub async fn list_receipts(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Query(query): Query<ListReceiptsQuery>,
) -> AppResult<Json<PaginatedResponse<ReceiptSummary>>> {
    let service = ReceiptService::new(state.db);
    let filters = ReceiptFilters {
        status: query.status,
        search: query.search,
        created_by: query.created_by,
    };
    let default_pagination = Pagination::default();
    let pagination = Pagination {
        page: query.page.unwrap_or(default_pagination.page),
        per_page: query.per_page.unwrap_or(default_pagination.per_page),
    };
    let listing = service.list(filters, pagination).await?;
    Ok(Json(listing))
}
