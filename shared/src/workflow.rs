//! Workflow state machine for goods receipts
//!
//! Pure transition evaluation over the receipt aggregate: no I/O, no
//! clocks, no identity resolution. The backend's transition controller
//! loads an aggregate, calls into this module, and persists the result
//! atomically. Every successful transition appends exactly one activity
//! log entry to the aggregate; a failed evaluation leaves it untouched.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ActivityLogEntry, ItemStatus, QcChecklist, Receipt, ReceiptStatus};
use crate::quality;

/// Inbound workflow events, one per controller operation
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    StartInspection,
    SubmitForQc,
    ApproveQc,
    SendBack { reason: String },
    ResumeInspection,
    Reject { reason: String },
    ApproveAndStore { assignments: Vec<WarehouseAssignment> },
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::StartInspection => "start_inspection",
            WorkflowEvent::SubmitForQc => "submit_for_qc",
            WorkflowEvent::ApproveQc => "approve_qc",
            WorkflowEvent::SendBack { .. } => "send_back",
            WorkflowEvent::ResumeInspection => "resume_inspection",
            WorkflowEvent::Reject { .. } => "reject",
            WorkflowEvent::ApproveAndStore { .. } => "approve_and_store",
        }
    }
}

/// Warehouse assignment for one line item, supplied with `ApproveAndStore`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WarehouseAssignment {
    pub item_id: Uuid,
    pub warehouse: String,
    pub bin_rack: Option<String>,
}

/// One stock-placement request emitted per accepted line item on approval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementRequest {
    pub item_id: Uuid,
    pub item_code: String,
    pub quantity: Decimal,
    pub warehouse: String,
    pub source_receipt_id: Uuid,
}

/// Guard predicates a transition can fail on, named so callers can
/// explain exactly what blocked the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPredicate {
    AllItemsInspected,
    CanEnterInventoryApproval,
    CanPlaceInInventory,
}

impl std::fmt::Display for GuardPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GuardPredicate::AllItemsInspected => "all_items_inspected",
            GuardPredicate::CanEnterInventoryApproval => "can_enter_inventory_approval",
            GuardPredicate::CanPlaceInInventory => "can_place_in_inventory",
        };
        f.write_str(s)
    }
}

/// Typed rejections from transition and inspection evaluation
///
/// None of these represent a partially-applied state: evaluation is
/// all-or-nothing with respect to the aggregate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("{event} is not allowed while the receipt is {from}")]
    InvalidTransition {
        event: &'static str,
        from: ReceiptStatus,
    },

    #[error("{transition} blocked: {predicate} not satisfied")]
    GuardFailed {
        transition: &'static str,
        predicate: GuardPredicate,
    },

    #[error("a reason is required for {action}")]
    MissingRejectionReason { action: &'static str },

    #[error("item {item_code}: accepted ({accepted}) + rejected ({rejected}) must equal received ({received})")]
    QuantityMismatch {
        item_code: String,
        accepted: Decimal,
        rejected: Decimal,
        received: Decimal,
    },

    #[error("item {item_code}: all four QC checks must pass before acceptance")]
    IncompleteQualityCheck { item_code: String },

    #[error("item {item_code}: {detail}")]
    InvalidDecision {
        item_code: String,
        detail: &'static str,
    },

    #[error("line item {item_id} does not belong to this receipt")]
    UnknownItem { item_id: Uuid },
}

/// Outcome of a committed transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: ReceiptStatus,
    pub to: ReceiptStatus,
    pub action: &'static str,
    pub reason: Option<String>,
    /// Stock-placement requests the caller must issue before committing
    pub placements: Vec<PlacementRequest>,
}

/// Inspection disposition for a single line item
#[derive(Debug, Clone, Deserialize)]
pub struct InspectionInput {
    pub decision: ItemStatus,
    pub accepted_qty: Decimal,
    pub rejected_qty: Decimal,
    pub qc_checks: QcChecklist,
    pub notes: Option<String>,
}

/// Evaluate and apply a workflow event against the aggregate
///
/// On success the receipt carries the post-transition state, including the
/// appended activity log entry. On error the receipt is unchanged.
pub fn apply_event(
    receipt: &mut Receipt,
    event: WorkflowEvent,
    actor: Uuid,
    now: DateTime<Utc>,
) -> Result<Transition, WorkflowError> {
    let from = receipt.status;
    let name = event.name();

    match event {
        WorkflowEvent::StartInspection => {
            if from != ReceiptStatus::Pending {
                return Err(WorkflowError::InvalidTransition { event: name, from });
            }
            Ok(record(
                receipt,
                ReceiptStatus::Inspecting,
                "START_INSPECTION",
                None,
                actor,
                now,
            ))
        }

        WorkflowEvent::SubmitForQc => {
            if from != ReceiptStatus::Inspecting {
                return Err(WorkflowError::InvalidTransition { event: name, from });
            }
            if !quality::all_items_inspected(receipt) {
                return Err(WorkflowError::GuardFailed {
                    transition: name,
                    predicate: GuardPredicate::AllItemsInspected,
                });
            }
            recompute_totals(receipt);
            receipt.inspection_completed_by = Some(actor);
            Ok(record(
                receipt,
                ReceiptStatus::AwaitingInventoryApproval,
                "INSPECTION_COMPLETE",
                None,
                actor,
                now,
            ))
        }

        WorkflowEvent::ApproveQc => {
            if from != ReceiptStatus::Inspecting
                && from != ReceiptStatus::AwaitingInventoryApproval
            {
                return Err(WorkflowError::InvalidTransition { event: name, from });
            }
            if !quality::can_enter_inventory_approval(receipt) {
                return Err(WorkflowError::GuardFailed {
                    transition: name,
                    predicate: GuardPredicate::CanEnterInventoryApproval,
                });
            }
            recompute_totals(receipt);
            if from == ReceiptStatus::Inspecting {
                receipt.inspection_completed_by = Some(actor);
            }
            Ok(record(
                receipt,
                ReceiptStatus::AwaitingInventoryApproval,
                "QC_APPROVED",
                None,
                actor,
                now,
            ))
        }

        WorkflowEvent::SendBack { reason } => {
            if from != ReceiptStatus::Inspecting
                && from != ReceiptStatus::AwaitingInventoryApproval
            {
                return Err(WorkflowError::InvalidTransition { event: name, from });
            }
            let reason = require_reason(reason, "send_back")?;
            Ok(record(
                receipt,
                ReceiptStatus::SentBack,
                "SENT_BACK",
                Some(reason),
                actor,
                now,
            ))
        }

        WorkflowEvent::ResumeInspection => {
            if from != ReceiptStatus::SentBack {
                return Err(WorkflowError::InvalidTransition { event: name, from });
            }
            Ok(record(
                receipt,
                ReceiptStatus::Inspecting,
                "RESUME_INSPECTION",
                None,
                actor,
                now,
            ))
        }

        WorkflowEvent::Reject { reason } => {
            if from != ReceiptStatus::Inspecting {
                return Err(WorkflowError::InvalidTransition { event: name, from });
            }
            let reason = require_reason(reason, "reject")?;
            receipt.approved_by = Some(actor);
            Ok(record(
                receipt,
                ReceiptStatus::Rejected,
                "REJECTED",
                Some(reason),
                actor,
                now,
            ))
        }

        WorkflowEvent::ApproveAndStore { assignments } => {
            if from != ReceiptStatus::AwaitingInventoryApproval {
                return Err(WorkflowError::InvalidTransition { event: name, from });
            }

            // Apply assignments to a scratch copy so a failed guard leaves
            // the aggregate untouched.
            let mut items = receipt.items.clone();
            for assignment in &assignments {
                let item = items
                    .iter_mut()
                    .find(|i| i.id == assignment.item_id)
                    .ok_or(WorkflowError::UnknownItem {
                        item_id: assignment.item_id,
                    })?;
                item.warehouse = Some(assignment.warehouse.clone());
                item.bin_rack = assignment.bin_rack.clone();
            }

            if !quality::all_accepted_assigned(&items) {
                return Err(WorkflowError::GuardFailed {
                    transition: name,
                    predicate: GuardPredicate::CanPlaceInInventory,
                });
            }

            let placements: Vec<PlacementRequest> = items
                .iter()
                .filter(|i| i.is_accepted() && i.accepted_qty > Decimal::ZERO)
                .map(|i| PlacementRequest {
                    item_id: i.id,
                    item_code: i.item_code.clone(),
                    quantity: i.accepted_qty,
                    warehouse: i.warehouse.clone().unwrap_or_default(),
                    source_receipt_id: receipt.id,
                })
                .collect();

            receipt.items = items;
            receipt.approved_by = Some(actor);
            let mut transition = record(
                receipt,
                ReceiptStatus::Approved,
                "INVENTORY_APPROVED",
                None,
                actor,
                now,
            );
            transition.placements = placements;
            Ok(transition)
        }
    }
}

/// Inspect a single line item
///
/// Mutates only the line item (status, quantities, checklist, notes); the
/// receipt status is untouched. The parent receipt must be `inspecting`.
pub fn inspect_item(
    receipt: &mut Receipt,
    item_id: Uuid,
    input: InspectionInput,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    if receipt.status != ReceiptStatus::Inspecting {
        return Err(WorkflowError::InvalidTransition {
            event: "inspect_item",
            from: receipt.status,
        });
    }

    let item = receipt
        .items
        .iter_mut()
        .find(|i| i.id == item_id)
        .ok_or(WorkflowError::UnknownItem { item_id })?;

    if input.accepted_qty < Decimal::ZERO || input.rejected_qty < Decimal::ZERO {
        return Err(WorkflowError::InvalidDecision {
            item_code: item.item_code.clone(),
            detail: "quantities cannot be negative",
        });
    }

    // Invariant A: quantity conservation, never auto-corrected
    if input.accepted_qty + input.rejected_qty != item.received_qty {
        return Err(WorkflowError::QuantityMismatch {
            item_code: item.item_code.clone(),
            accepted: input.accepted_qty,
            rejected: input.rejected_qty,
            received: item.received_qty,
        });
    }

    match input.decision {
        ItemStatus::Pending => {
            return Err(WorkflowError::InvalidDecision {
                item_code: item.item_code.clone(),
                detail: "an inspection must record a disposition",
            });
        }
        ItemStatus::Accepted => {
            if input.accepted_qty <= Decimal::ZERO || input.rejected_qty != Decimal::ZERO {
                return Err(WorkflowError::InvalidDecision {
                    item_code: item.item_code.clone(),
                    detail: "full acceptance requires the entire received quantity",
                });
            }
            // Invariant B: acceptance never silently downgrades on an
            // incomplete checklist
            if !input.qc_checks.all_passed() {
                return Err(WorkflowError::IncompleteQualityCheck {
                    item_code: item.item_code.clone(),
                });
            }
        }
        ItemStatus::PartiallyAccepted => {
            if input.accepted_qty <= Decimal::ZERO || input.rejected_qty <= Decimal::ZERO {
                return Err(WorkflowError::InvalidDecision {
                    item_code: item.item_code.clone(),
                    detail: "partial acceptance requires both accepted and rejected quantities",
                });
            }
        }
        ItemStatus::Rejected => {
            if input.accepted_qty != Decimal::ZERO {
                return Err(WorkflowError::InvalidDecision {
                    item_code: item.item_code.clone(),
                    detail: "a rejected item cannot carry an accepted quantity",
                });
            }
            if input.notes.as_deref().map_or(true, |n| n.trim().is_empty()) {
                return Err(WorkflowError::MissingRejectionReason {
                    action: "item rejection",
                });
            }
        }
    }

    item.item_status = input.decision;
    item.accepted_qty = input.accepted_qty;
    item.rejected_qty = input.rejected_qty;
    item.qc_checks = input.qc_checks;
    item.notes = input.notes;
    item.inspected_at = Some(now);
    receipt.updated_at = now;

    Ok(())
}

fn require_reason(reason: String, action: &'static str) -> Result<String, WorkflowError> {
    if reason.trim().is_empty() {
        return Err(WorkflowError::MissingRejectionReason { action });
    }
    Ok(reason)
}

fn recompute_totals(receipt: &mut Receipt) {
    receipt.total_accepted = receipt.items.iter().map(|i| i.accepted_qty).sum();
    receipt.total_rejected = receipt.items.iter().map(|i| i.rejected_qty).sum();
}

/// Commit the status change and append the audit entry, newest first
fn record(
    receipt: &mut Receipt,
    to: ReceiptStatus,
    action: &'static str,
    reason: Option<String>,
    actor: Uuid,
    now: DateTime<Utc>,
) -> Transition {
    let from = receipt.status;
    receipt.status = to;
    receipt.updated_at = now;
    receipt.logs.insert(
        0,
        ActivityLogEntry {
            id: Uuid::new_v4(),
            action: action.to_string(),
            status_from: from,
            status_to: to,
            reason: reason.clone(),
            actor,
            created_at: now,
        },
    );

    Transition {
        from,
        to,
        action,
        reason,
        placements: Vec::new(),
    }
}
