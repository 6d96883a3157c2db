//! HTTP handlers for workflow transitions
//!
//! Every mutating endpoint responds with the authoritative post-transition
//! aggregate; clients never apply optimistic updates.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentActor;
use crate::services::WorkflowService;
use crate::AppState;
use shared::models::Receipt;
use shared::workflow::{InspectionInput, WarehouseAssignment};

/// Body carrying a mandatory reason for rejections and send-backs
#[derive(Debug, Deserialize)]
pub struct ReasonBody {
    #[serde(default)]
    pub reason: String,
}

/// Body carrying the warehouse assignments for final approval
#[derive(Debug, Deserialize)]
pub struct ApproveAndStoreBody {
    #[serde(default)]
    pub assignments: Vec<WarehouseAssignment>,
}

fn workflow_service(state: AppState) -> WorkflowService {
    WorkflowService::new(state.db, state.placement)
}

/// Start inspecting a pending receipt
pub async fn start_inspection(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(receipt_id): Path<Uuid>,
) -> AppResult<Json<Receipt>> {
    let receipt = workflow_service(state)
        .start_inspection(receipt_id, actor.0.actor_id)
        .await?;
    Ok(Json(receipt))
}

/// Record an inspection decision for one line item
pub async fn inspect_item(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path((receipt_id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<InspectionInput>,
) -> AppResult<Json<Receipt>> {
    let receipt = workflow_service(state)
        .inspect_item(receipt_id, item_id, input)
        .await?;
    Ok(Json(receipt))
}

/// Submit a fully inspected receipt for inventory routing
pub async fn submit_for_qc(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(receipt_id): Path<Uuid>,
) -> AppResult<Json<Receipt>> {
    let receipt = workflow_service(state)
        .submit_for_qc(receipt_id, actor.0.actor_id)
        .await?;
    Ok(Json(receipt))
}

/// QC final approval
pub async fn approve_qc(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(receipt_id): Path<Uuid>,
) -> AppResult<Json<Receipt>> {
    let receipt = workflow_service(state)
        .approve_qc(receipt_id, actor.0.actor_id)
        .await?;
    Ok(Json(receipt))
}

/// Send the receipt back for revision
pub async fn send_back(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(receipt_id): Path<Uuid>,
    Json(body): Json<ReasonBody>,
) -> AppResult<Json<Receipt>> {
    let receipt = workflow_service(state)
        .send_back(receipt_id, actor.0.actor_id, body.reason)
        .await?;
    Ok(Json(receipt))
}

/// Resume inspection on a sent-back receipt
pub async fn resume_inspection(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(receipt_id): Path<Uuid>,
) -> AppResult<Json<Receipt>> {
    let receipt = workflow_service(state)
        .resume_inspection(receipt_id, actor.0.actor_id)
        .await?;
    Ok(Json(receipt))
}

/// Reject the whole receipt
pub async fn reject_receipt(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(receipt_id): Path<Uuid>,
    Json(body): Json<ReasonBody>,
) -> AppResult<Json<Receipt>> {
    let receipt = workflow_service(state)
        .reject(receipt_id, actor.0.actor_id, body.reason)
        .await?;
    Ok(Json(receipt))
}

/// Approve the receipt and place accepted stock into warehouses
pub async fn approve_and_store(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(receipt_id): Path<Uuid>,
    Json(body): Json<ApproveAndStoreBody>,
) -> AppResult<Json<Receipt>> {
    let receipt = workflow_service(state)
        .approve_and_store(receipt_id, actor.0.actor_id, body.assignments)
        .await?;
    Ok(Json(receipt))
}
