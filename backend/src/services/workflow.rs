//! Workflow transition controller for goods receipts
//!
//! Each receipt is the unit of mutual exclusion: every mutating call here
//! locks the receipt row (`SELECT ... FOR UPDATE`), evaluates the pure
//! transition rules against that consistent snapshot, and persists the
//! result atomically with exactly one activity log row. A request that
//! loses the race blocks on the lock and is re-evaluated against the
//! post-transition state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::InventoryPlacement;
use crate::services::receipt::load_receipt;
use shared::models::Receipt;
use shared::workflow::{
    self, InspectionInput, Transition, WarehouseAssignment, WorkflowEvent,
};

/// Transition controller for the receipt state machine
#[derive(Clone)]
pub struct WorkflowService {
    db: PgPool,
    placement: Arc<dyn InventoryPlacement>,
}

impl WorkflowService {
    /// Create a new WorkflowService instance
    pub fn new(db: PgPool, placement: Arc<dyn InventoryPlacement>) -> Self {
        Self { db, placement }
    }

    /// pending -> inspecting
    pub async fn start_inspection(&self, receipt_id: Uuid, actor: Uuid) -> AppResult<Receipt> {
        self.transition(receipt_id, actor, WorkflowEvent::StartInspection)
            .await
    }

    /// Record the inspection of a single line item
    ///
    /// Not a workflow transition: the receipt status is untouched and no
    /// activity log entry is written.
    pub async fn inspect_item(
        &self,
        receipt_id: Uuid,
        item_id: Uuid,
        input: InspectionInput,
    ) -> AppResult<Receipt> {
        let mut tx = self.db.begin().await?;
        let mut receipt = self.lock_and_load(&mut tx, receipt_id).await?;

        workflow::inspect_item(&mut receipt, item_id, input, Utc::now())?;

        let item = receipt
            .items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| AppError::Internal("inspected item vanished".to_string()))?;

        sqlx::query(
            r#"
            UPDATE receipt_items
            SET item_status = $1, accepted_qty = $2, rejected_qty = $3, qc_checks = $4,
                notes = $5, inspected_at = $6
            WHERE id = $7
            "#,
        )
        .bind(item.item_status.as_str())
        .bind(item.accepted_qty)
        .bind(item.rejected_qty)
        .bind(serde_json::to_value(item.qc_checks).unwrap_or_default())
        .bind(&item.notes)
        .bind(item.inspected_at)
        .bind(item.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE receipts SET updated_at = $1 WHERE id = $2")
            .bind(receipt.updated_at)
            .bind(receipt.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            receipt_id = %receipt_id,
            item_id = %item_id,
            status = %item.item_status,
            "Line item inspected"
        );

        Ok(receipt)
    }

    /// inspecting -> awaiting_inventory_approval (all items inspected)
    pub async fn submit_for_qc(&self, receipt_id: Uuid, actor: Uuid) -> AppResult<Receipt> {
        self.transition(receipt_id, actor, WorkflowEvent::SubmitForQc)
            .await
    }

    /// QC final approval gate: 100% pass rate over accepted items
    pub async fn approve_qc(&self, receipt_id: Uuid, actor: Uuid) -> AppResult<Receipt> {
        self.transition(receipt_id, actor, WorkflowEvent::ApproveQc)
            .await
    }

    /// Roll the receipt back for correction; reason is mandatory
    pub async fn send_back(
        &self,
        receipt_id: Uuid,
        actor: Uuid,
        reason: String,
    ) -> AppResult<Receipt> {
        self.transition(receipt_id, actor, WorkflowEvent::SendBack { reason })
            .await
    }

    /// sent_back -> inspecting
    pub async fn resume_inspection(&self, receipt_id: Uuid, actor: Uuid) -> AppResult<Receipt> {
        self.transition(receipt_id, actor, WorkflowEvent::ResumeInspection)
            .await
    }

    /// Reject the whole receipt; reason is mandatory, no stock effect
    pub async fn reject(&self, receipt_id: Uuid, actor: Uuid, reason: String) -> AppResult<Receipt> {
        self.transition(receipt_id, actor, WorkflowEvent::Reject { reason })
            .await
    }

    /// Final approval: place accepted stock and mark the receipt approved
    ///
    /// Placement calls go out before the transaction commits. If any of
    /// them fails, the transaction rolls back and the receipt stays in
    /// `awaiting_inventory_approval` with no log entry recorded.
    pub async fn approve_and_store(
        &self,
        receipt_id: Uuid,
        actor: Uuid,
        assignments: Vec<WarehouseAssignment>,
    ) -> AppResult<Receipt> {
        self.transition(receipt_id, actor, WorkflowEvent::ApproveAndStore { assignments })
            .await
    }

    async fn transition(
        &self,
        receipt_id: Uuid,
        actor: Uuid,
        event: WorkflowEvent,
    ) -> AppResult<Receipt> {
        let event_name = event.name();
        let mut tx = self.db.begin().await?;
        let receipt = self.lock_and_load(&mut tx, receipt_id).await?;

        let (receipt, transition) =
            apply_with_placements(receipt, event, actor, self.placement.as_ref(), Utc::now())
                .await?;

        self.persist(&mut tx, &receipt, &transition).await?;
        tx.commit().await?;

        tracing::info!(
            receipt_id = %receipt_id,
            event = event_name,
            from = %transition.from,
            to = %transition.to,
            "Workflow transition committed"
        );

        Ok(receipt)
    }

    /// Lock the receipt row and load a consistent aggregate snapshot
    async fn lock_and_load(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        receipt_id: Uuid,
    ) -> AppResult<Receipt> {
        let locked = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM receipts WHERE id = $1 FOR UPDATE",
        )
        .bind(receipt_id)
        .fetch_optional(&mut **tx)
        .await?;

        if locked.is_none() {
            return Err(AppError::NotFound("Receipt".to_string()));
        }

        load_receipt(&mut **tx, receipt_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Receipt".to_string()))
    }

    /// Write the post-transition aggregate and exactly one log row
    async fn persist(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        receipt: &Receipt,
        transition: &Transition,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE receipts
            SET status = $1, total_accepted = $2, total_rejected = $3,
                inspection_completed_by = $4, approved_by = $5, updated_at = $6
            WHERE id = $7
            "#,
        )
        .bind(receipt.status.as_str())
        .bind(receipt.total_accepted)
        .bind(receipt.total_rejected)
        .bind(receipt.inspection_completed_by)
        .bind(receipt.approved_by)
        .bind(receipt.updated_at)
        .bind(receipt.id)
        .execute(&mut **tx)
        .await?;

        // Warehouse assignments land on items during approve-and-store
        if !transition.placements.is_empty() {
            for item in &receipt.items {
                sqlx::query(
                    "UPDATE receipt_items SET warehouse = $1, bin_rack = $2 WHERE id = $3",
                )
                .bind(&item.warehouse)
                .bind(&item.bin_rack)
                .bind(item.id)
                .execute(&mut **tx)
                .await?;
            }
        }

        let entry = receipt
            .logs
            .first()
            .ok_or_else(|| AppError::Internal("transition committed without log entry".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO receipt_logs (id, receipt_id, action, status_from, status_to,
                                      reason, actor, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(receipt.id)
        .bind(&entry.action)
        .bind(entry.status_from.as_str())
        .bind(entry.status_to.as_str())
        .bind(&entry.reason)
        .bind(entry.actor)
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

/// Evaluate the event and issue the resulting placement calls
///
/// Takes the aggregate by value: the ledger must acknowledge every
/// placement before the caller is handed a receipt to persist, so a
/// failed placement leaves the caller holding nothing to commit and the
/// transaction rolls back.
async fn apply_with_placements(
    mut receipt: Receipt,
    event: WorkflowEvent,
    actor: Uuid,
    placement: &dyn InventoryPlacement,
    now: DateTime<Utc>,
) -> AppResult<(Receipt, Transition)> {
    let transition = workflow::apply_event(&mut receipt, event, actor, now)?;

    for request in &transition.placements {
        let ack = placement.place(request).await?;
        tracing::info!(
            receipt_id = %receipt.id,
            item_code = %request.item_code,
            entry_no = %ack.entry_no,
            warehouse = %ack.warehouse,
            "Stock placement acknowledged"
        );
    }

    Ok((receipt, transition))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::str::FromStr;
    use std::sync::Mutex;

    use rust_decimal::Decimal;

    use crate::external::PlacementReceipt;
    use shared::models::{ItemStatus, LineItem, QcChecklist, ReceiptStatus};
    use shared::workflow::PlacementRequest;

    /// Ledger fake that records requests and fails after a set number of
    /// successful acknowledgements
    struct LedgerFake {
        fail_after: usize,
        requests: Mutex<Vec<PlacementRequest>>,
    }

    impl LedgerFake {
        fn failing_after(fail_after: usize) -> Self {
            Self {
                fail_after,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn accepting() -> Self {
            Self::failing_after(usize::MAX)
        }
    }

    #[async_trait::async_trait]
    impl InventoryPlacement for LedgerFake {
        async fn place(&self, request: &PlacementRequest) -> AppResult<PlacementReceipt> {
            let mut requests = self.requests.lock().unwrap();
            if requests.len() >= self.fail_after {
                return Err(AppError::PlacementFailure("ledger unavailable".to_string()));
            }
            requests.push(request.clone());
            Ok(PlacementReceipt {
                entry_no: format!("SLE-{}", requests.len()),
                warehouse: request.warehouse.clone(),
            })
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn accepted_item(item_code: &str, qty: &str, warehouse: &str) -> LineItem {
        LineItem {
            id: Uuid::new_v4(),
            item_code: item_code.to_string(),
            item_name: format!("{} name", item_code),
            po_qty: dec(qty),
            received_qty: dec(qty),
            accepted_qty: dec(qty),
            rejected_qty: Decimal::ZERO,
            batch_no: None,
            item_status: ItemStatus::Accepted,
            qc_checks: QcChecklist::passed(),
            warehouse: Some(warehouse.to_string()),
            bin_rack: None,
            notes: None,
            inspected_at: Some(Utc::now()),
        }
    }

    fn awaiting_receipt(items: Vec<LineItem>) -> Receipt {
        let now = Utc::now();
        Receipt {
            id: Uuid::new_v4(),
            grn_no: "GRN-2024-0009".to_string(),
            po_no: None,
            supplier_id: None,
            supplier_name: None,
            receipt_date: now.date_naive(),
            status: ReceiptStatus::AwaitingInventoryApproval,
            items,
            logs: Vec::new(),
            notes: None,
            total_accepted: Decimal::ZERO,
            total_rejected: Decimal::ZERO,
            created_by: Uuid::new_v4(),
            inspection_completed_by: None,
            approved_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A failed placement aborts the approval before anything is handed
    /// back for persistence: no approved receipt, no log entry
    #[tokio::test]
    async fn test_placement_failure_rolls_back_approval() {
        let receipt = awaiting_receipt(vec![accepted_item("STEEL-01", "100", "WH-A")]);
        let ledger = LedgerFake::failing_after(0);

        let result = apply_with_placements(
            receipt,
            WorkflowEvent::ApproveAndStore {
                assignments: Vec::new(),
            },
            Uuid::new_v4(),
            &ledger,
            Utc::now(),
        )
        .await;

        assert!(matches!(result, Err(AppError::PlacementFailure(_))));
        assert!(ledger.requests.lock().unwrap().is_empty());
    }

    /// Placement is all-or-nothing across line items: a failure on the
    /// second item discards the whole approval
    #[tokio::test]
    async fn test_partial_placement_failure_discards_approval() {
        let receipt = awaiting_receipt(vec![
            accepted_item("STEEL-01", "100", "WH-A"),
            accepted_item("STEEL-02", "40", "WH-B"),
        ]);
        let ledger = LedgerFake::failing_after(1);

        let result = apply_with_placements(
            receipt,
            WorkflowEvent::ApproveAndStore {
                assignments: Vec::new(),
            },
            Uuid::new_v4(),
            &ledger,
            Utc::now(),
        )
        .await;

        assert!(matches!(result, Err(AppError::PlacementFailure(_))));
        assert_eq!(ledger.requests.lock().unwrap().len(), 1);
    }

    /// A guard rejection surfaces as a workflow error without touching
    /// the ledger at all
    #[tokio::test]
    async fn test_guard_failure_never_calls_ledger() {
        let mut item = accepted_item("STEEL-01", "100", "WH-A");
        item.warehouse = None;
        let receipt = awaiting_receipt(vec![item]);
        let ledger = LedgerFake::accepting();

        let result = apply_with_placements(
            receipt,
            WorkflowEvent::ApproveAndStore {
                assignments: Vec::new(),
            },
            Uuid::new_v4(),
            &ledger,
            Utc::now(),
        )
        .await;

        assert!(matches!(result, Err(AppError::Workflow(_))));
        assert!(ledger.requests.lock().unwrap().is_empty());
    }

    /// The happy path acknowledges one placement per accepted item and
    /// returns the approved aggregate with its log entry
    #[tokio::test]
    async fn test_successful_approval_places_every_item() {
        let receipt = awaiting_receipt(vec![
            accepted_item("STEEL-01", "100", "WH-A"),
            accepted_item("STEEL-02", "40", "WH-B"),
        ]);
        let ledger = LedgerFake::accepting();
        let actor = Uuid::new_v4();

        let (receipt, transition) = apply_with_placements(
            receipt,
            WorkflowEvent::ApproveAndStore {
                assignments: Vec::new(),
            },
            actor,
            &ledger,
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(receipt.status, ReceiptStatus::Approved);
        assert_eq!(transition.placements.len(), 2);
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].action, "INVENTORY_APPROVED");

        let requests = ledger.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].warehouse, "WH-A");
        assert_eq!(requests[1].warehouse, "WH-B");
    }
}
