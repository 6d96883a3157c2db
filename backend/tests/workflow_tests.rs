//! Workflow transition tests
//!
//! Tests for the receipt state machine including:
//! - Property 5: Audit Completeness (one log entry per successful transition)
//! - Property 6: Failed transitions leave the aggregate untouched

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{ItemStatus, LineItem, QcChecklist, Receipt, ReceiptStatus};
use shared::workflow::{
    apply_event, inspect_item, GuardPredicate, InspectionInput, WarehouseAssignment,
    WorkflowError, WorkflowEvent,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn pending_item(item_code: &str, received_qty: Decimal) -> LineItem {
    LineItem {
        id: Uuid::new_v4(),
        item_code: item_code.to_string(),
        item_name: format!("{} name", item_code),
        po_qty: received_qty,
        received_qty,
        accepted_qty: Decimal::ZERO,
        rejected_qty: Decimal::ZERO,
        batch_no: None,
        item_status: ItemStatus::Pending,
        qc_checks: QcChecklist::default(),
        warehouse: None,
        bin_rack: None,
        notes: None,
        inspected_at: None,
    }
}

fn receipt_with(status: ReceiptStatus, items: Vec<LineItem>) -> Receipt {
    let now = Utc::now();
    Receipt {
        id: Uuid::new_v4(),
        grn_no: "GRN-2024-0003".to_string(),
        po_no: Some("PO-2024-0003".to_string()),
        supplier_id: None,
        supplier_name: Some("Acme Metals".to_string()),
        receipt_date: now.date_naive(),
        status,
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

fn accept(receipt: &mut Receipt, item_id: Uuid, qty: Decimal) {
    inspect_item(
        receipt,
        item_id,
        InspectionInput {
            decision: ItemStatus::Accepted,
            accepted_qty: qty,
            rejected_qty: Decimal::ZERO,
            qc_checks: QcChecklist::passed(),
            notes: None,
        },
        Utc::now(),
    )
    .unwrap();
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Scenario 1: accepted item with a full checklist clears the QC gate
    #[test]
    fn test_full_approval_path() {
        let item = pending_item("STEEL-01", dec("100"));
        let item_id = item.id;
        let mut receipt = receipt_with(ReceiptStatus::Pending, vec![item]);
        let actor = Uuid::new_v4();

        apply_event(&mut receipt, WorkflowEvent::StartInspection, actor, Utc::now()).unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Inspecting);

        accept(&mut receipt, item_id, dec("100"));

        let transition =
            apply_event(&mut receipt, WorkflowEvent::ApproveQc, actor, Utc::now()).unwrap();
        assert_eq!(receipt.status, ReceiptStatus::AwaitingInventoryApproval);
        assert_eq!(transition.action, "QC_APPROVED");
        assert_eq!(receipt.total_accepted, dec("100"));
        assert_eq!(receipt.inspection_completed_by, Some(actor));
    }

    /// Scenario 2: one unchecked box on the only accepted item blocks QC
    #[test]
    fn test_qc_approval_blocked_by_checklist() {
        let item = pending_item("STEEL-01", dec("100"));
        let item_id = item.id;
        let mut receipt = receipt_with(ReceiptStatus::Inspecting, vec![item]);

        let mut checks = QcChecklist::passed();
        checks.documentation = false;
        inspect_item(
            &mut receipt,
            item_id,
            InspectionInput {
                decision: ItemStatus::PartiallyAccepted,
                accepted_qty: dec("90"),
                rejected_qty: dec("10"),
                qc_checks: checks,
                notes: None,
            },
            Utc::now(),
        )
        .unwrap();

        let result = apply_event(
            &mut receipt,
            WorkflowEvent::ApproveQc,
            Uuid::new_v4(),
            Utc::now(),
        );

        assert_eq!(
            result,
            Err(WorkflowError::GuardFailed {
                transition: "approve_qc",
                predicate: GuardPredicate::CanEnterInventoryApproval,
            })
        );
        assert_eq!(receipt.status, ReceiptStatus::Inspecting);
        assert!(receipt.logs.is_empty());
    }

    /// Submission requires every item to carry a disposition
    #[test]
    fn test_submit_requires_all_items_inspected() {
        let first = pending_item("STEEL-01", dec("100"));
        let first_id = first.id;
        let second = pending_item("STEEL-02", dec("40"));
        let mut receipt = receipt_with(ReceiptStatus::Inspecting, vec![first, second]);
        accept(&mut receipt, first_id, dec("100"));

        let result = apply_event(
            &mut receipt,
            WorkflowEvent::SubmitForQc,
            Uuid::new_v4(),
            Utc::now(),
        );

        assert_eq!(
            result,
            Err(WorkflowError::GuardFailed {
                transition: "submit_for_qc",
                predicate: GuardPredicate::AllItemsInspected,
            })
        );
        assert_eq!(receipt.status, ReceiptStatus::Inspecting);
    }

    /// Scenario 4: an empty reason never reaches the aggregate
    #[test]
    fn test_send_back_requires_reason() {
        let mut receipt = receipt_with(ReceiptStatus::Inspecting, vec![]);

        let result = apply_event(
            &mut receipt,
            WorkflowEvent::SendBack {
                reason: String::new(),
            },
            Uuid::new_v4(),
            Utc::now(),
        );

        assert_eq!(
            result,
            Err(WorkflowError::MissingRejectionReason {
                action: "send_back"
            })
        );
        assert_eq!(receipt.status, ReceiptStatus::Inspecting);
        assert!(receipt.logs.is_empty());
    }

    /// Send back and resume form a revision cycle
    #[test]
    fn test_send_back_and_resume() {
        let mut receipt = receipt_with(ReceiptStatus::AwaitingInventoryApproval, vec![]);
        let actor = Uuid::new_v4();

        apply_event(
            &mut receipt,
            WorkflowEvent::SendBack {
                reason: "batch numbers missing on two lines".to_string(),
            },
            actor,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(receipt.status, ReceiptStatus::SentBack);
        assert_eq!(
            receipt.logs[0].reason.as_deref(),
            Some("batch numbers missing on two lines")
        );

        apply_event(&mut receipt, WorkflowEvent::ResumeInspection, actor, Utc::now()).unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Inspecting);
        assert_eq!(receipt.logs.len(), 2);
        // Newest entry first
        assert_eq!(receipt.logs[0].action, "RESUME_INSPECTION");
        assert_eq!(receipt.logs[1].action, "SENT_BACK");
    }

    #[test]
    fn test_reject_receipt() {
        let mut receipt = receipt_with(ReceiptStatus::Inspecting, vec![]);
        let actor = Uuid::new_v4();

        let transition = apply_event(
            &mut receipt,
            WorkflowEvent::Reject {
                reason: "entire delivery water damaged".to_string(),
            },
            actor,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(receipt.status, ReceiptStatus::Rejected);
        assert_eq!(transition.action, "REJECTED");
        assert_eq!(receipt.approved_by, Some(actor));
        assert!(receipt.status.is_terminal());
    }

    /// Terminal states define no outgoing transitions
    #[test]
    fn test_terminal_states_refuse_events() {
        for status in [ReceiptStatus::Approved, ReceiptStatus::Rejected] {
            let mut receipt = receipt_with(status, vec![]);

            let result = apply_event(
                &mut receipt,
                WorkflowEvent::StartInspection,
                Uuid::new_v4(),
                Utc::now(),
            );

            assert_eq!(
                result,
                Err(WorkflowError::InvalidTransition {
                    event: "start_inspection",
                    from: status,
                })
            );
            assert_eq!(receipt.status, status);
        }
    }

    #[test]
    fn test_approve_and_store_from_pending_is_invalid() {
        let mut receipt = receipt_with(ReceiptStatus::Pending, vec![]);

        let result = apply_event(
            &mut receipt,
            WorkflowEvent::ApproveAndStore {
                assignments: Vec::new(),
            },
            Uuid::new_v4(),
            Utc::now(),
        );

        assert_eq!(
            result,
            Err(WorkflowError::InvalidTransition {
                event: "approve_and_store",
                from: ReceiptStatus::Pending,
            })
        );
    }

    /// Approval without a warehouse on every accepted item fails and
    /// leaves the items without partial assignments
    #[test]
    fn test_approve_and_store_requires_assignments() {
        let first = pending_item("STEEL-01", dec("100"));
        let first_id = first.id;
        let second = pending_item("STEEL-02", dec("40"));
        let second_id = second.id;
        let mut receipt = receipt_with(ReceiptStatus::Inspecting, vec![first, second]);
        accept(&mut receipt, first_id, dec("100"));
        accept(&mut receipt, second_id, dec("40"));
        receipt.status = ReceiptStatus::AwaitingInventoryApproval;

        let result = apply_event(
            &mut receipt,
            WorkflowEvent::ApproveAndStore {
                assignments: vec![WarehouseAssignment {
                    item_id: first_id,
                    warehouse: "WH-A".to_string(),
                    bin_rack: Some("A-01".to_string()),
                }],
            },
            Uuid::new_v4(),
            Utc::now(),
        );

        assert_eq!(
            result,
            Err(WorkflowError::GuardFailed {
                transition: "approve_and_store",
                predicate: GuardPredicate::CanPlaceInInventory,
            })
        );
        assert_eq!(receipt.status, ReceiptStatus::AwaitingInventoryApproval);
        // The partial assignment must not stick
        assert!(receipt.items.iter().all(|i| i.warehouse.is_none()));
    }

    #[test]
    fn test_approve_and_store_rejects_unknown_assignment() {
        let item = pending_item("STEEL-01", dec("100"));
        let item_id = item.id;
        let mut receipt = receipt_with(ReceiptStatus::Inspecting, vec![item]);
        accept(&mut receipt, item_id, dec("100"));
        receipt.status = ReceiptStatus::AwaitingInventoryApproval;

        let stranger = Uuid::new_v4();
        let result = apply_event(
            &mut receipt,
            WorkflowEvent::ApproveAndStore {
                assignments: vec![WarehouseAssignment {
                    item_id: stranger,
                    warehouse: "WH-A".to_string(),
                    bin_rack: None,
                }],
            },
            Uuid::new_v4(),
            Utc::now(),
        );

        assert_eq!(result, Err(WorkflowError::UnknownItem { item_id: stranger }));
        assert_eq!(receipt.status, ReceiptStatus::AwaitingInventoryApproval);
    }

    /// Approval emits one placement request per accepted line item and
    /// none for rejected ones
    #[test]
    fn test_approve_and_store_emits_placements() {
        let first = pending_item("STEEL-01", dec("100"));
        let first_id = first.id;
        let second = pending_item("STEEL-02", dec("40"));
        let second_id = second.id;
        let mut receipt = receipt_with(ReceiptStatus::Inspecting, vec![first, second]);
        accept(&mut receipt, first_id, dec("100"));
        inspect_item(
            &mut receipt,
            second_id,
            InspectionInput {
                decision: ItemStatus::Rejected,
                accepted_qty: Decimal::ZERO,
                rejected_qty: dec("40"),
                qc_checks: QcChecklist::default(),
                notes: Some("rust along the welds".to_string()),
            },
            Utc::now(),
        )
        .unwrap();
        receipt.status = ReceiptStatus::AwaitingInventoryApproval;
        let actor = Uuid::new_v4();

        let transition = apply_event(
            &mut receipt,
            WorkflowEvent::ApproveAndStore {
                assignments: vec![WarehouseAssignment {
                    item_id: first_id,
                    warehouse: "WH-A".to_string(),
                    bin_rack: Some("A-03".to_string()),
                }],
            },
            actor,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(receipt.status, ReceiptStatus::Approved);
        assert_eq!(receipt.approved_by, Some(actor));
        assert_eq!(transition.placements.len(), 1);
        let placement = &transition.placements[0];
        assert_eq!(placement.item_code, "STEEL-01");
        assert_eq!(placement.quantity, dec("100"));
        assert_eq!(placement.warehouse, "WH-A");
        assert_eq!(placement.source_receipt_id, receipt.id);
        assert_eq!(receipt.items[0].bin_rack.as_deref(), Some("A-03"));
    }

    /// Log entry count tracks successful transitions exactly
    #[test]
    fn test_audit_completeness_over_a_full_run() {
        let item = pending_item("STEEL-01", dec("100"));
        let item_id = item.id;
        let mut receipt = receipt_with(ReceiptStatus::Pending, vec![item]);
        let actor = Uuid::new_v4();

        apply_event(&mut receipt, WorkflowEvent::StartInspection, actor, Utc::now()).unwrap();
        accept(&mut receipt, item_id, dec("100"));
        apply_event(&mut receipt, WorkflowEvent::SubmitForQc, actor, Utc::now()).unwrap();
        apply_event(
            &mut receipt,
            WorkflowEvent::SendBack {
                reason: "recount requested".to_string(),
            },
            actor,
            Utc::now(),
        )
        .unwrap();
        apply_event(&mut receipt, WorkflowEvent::ResumeInspection, actor, Utc::now()).unwrap();

        // A failed attempt must not log
        let failed = apply_event(
            &mut receipt,
            WorkflowEvent::ApproveAndStore {
                assignments: Vec::new(),
            },
            actor,
            Utc::now(),
        );
        assert!(failed.is_err());

        assert_eq!(receipt.logs.len(), 4);
        let actions: Vec<&str> = receipt.logs.iter().map(|l| l.action.as_str()).collect();
        assert_eq!(
            actions,
            vec![
                "RESUME_INSPECTION",
                "SENT_BACK",
                "INSPECTION_COMPLETE",
                "START_INSPECTION"
            ]
        );
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn arb_status() -> impl Strategy<Value = ReceiptStatus> {
    prop_oneof![
        Just(ReceiptStatus::Pending),
        Just(ReceiptStatus::Inspecting),
        Just(ReceiptStatus::AwaitingInventoryApproval),
        Just(ReceiptStatus::Approved),
        Just(ReceiptStatus::Rejected),
        Just(ReceiptStatus::SentBack),
    ]
}

fn arb_event() -> impl Strategy<Value = WorkflowEvent> {
    prop_oneof![
        Just(WorkflowEvent::StartInspection),
        Just(WorkflowEvent::SubmitForQc),
        Just(WorkflowEvent::ApproveQc),
        "[ a-z]{0,12}".prop_map(|reason| WorkflowEvent::SendBack { reason }),
        Just(WorkflowEvent::ResumeInspection),
        "[ a-z]{0,12}".prop_map(|reason| WorkflowEvent::Reject { reason }),
        Just(WorkflowEvent::ApproveAndStore {
            assignments: Vec::new()
        }),
    ]
}

fn arb_inspected_item() -> impl Strategy<Value = LineItem> {
    (
        prop_oneof![
            Just(ItemStatus::Pending),
            Just(ItemStatus::Accepted),
            Just(ItemStatus::PartiallyAccepted),
            Just(ItemStatus::Rejected),
        ],
        1u32..1_000,
        any::<bool>(),
    )
        .prop_map(|(status, received, checked)| {
            let received = Decimal::from(received);
            let mut item = pending_item("ITEM-01", received);
            item.item_status = status;
            if status != ItemStatus::Pending {
                item.inspected_at = Some(Utc::now());
            }
            match status {
                ItemStatus::Pending => {}
                ItemStatus::Accepted => {
                    item.accepted_qty = received;
                    item.qc_checks = QcChecklist::passed();
                }
                ItemStatus::PartiallyAccepted => {
                    item.accepted_qty = received;
                    if checked {
                        item.qc_checks = QcChecklist::passed();
                    }
                }
                ItemStatus::Rejected => {
                    item.rejected_qty = received;
                }
            }
            item
        })
}

proptest! {
    /// Property 6: a rejected event leaves the whole aggregate bit-for-bit
    /// unchanged, and an accepted one appends exactly one log entry
    #[test]
    fn prop_failed_event_changes_nothing(
        status in arb_status(),
        event in arb_event(),
        items in prop::collection::vec(arb_inspected_item(), 0..4),
    ) {
        let mut receipt = receipt_with(status, items);
        let before = serde_json::to_value(&receipt).unwrap();
        let logs_before = receipt.logs.len();

        let result = apply_event(&mut receipt, event, Uuid::new_v4(), Utc::now());

        match result {
            Ok(transition) => {
                prop_assert_eq!(receipt.logs.len(), logs_before + 1);
                prop_assert_eq!(receipt.logs[0].status_from, transition.from);
                prop_assert_eq!(receipt.logs[0].status_to, transition.to);
                prop_assert_eq!(receipt.status, transition.to);
            }
            Err(_) => {
                prop_assert_eq!(serde_json::to_value(&receipt).unwrap(), before);
            }
        }
    }

    /// Terminal states admit no event at all
    #[test]
    fn prop_terminal_states_are_final(
        status in prop_oneof![Just(ReceiptStatus::Approved), Just(ReceiptStatus::Rejected)],
        event in arb_event(),
    ) {
        let mut receipt = receipt_with(status, vec![]);

        let result = apply_event(&mut receipt, event, Uuid::new_v4(), Utc::now());

        prop_assert!(result.is_err());
        prop_assert_eq!(receipt.status, status);
    }
}
