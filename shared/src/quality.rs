//! Quality aggregation rules for receipts
//!
//! Pure, stateless computations over a receipt's line items. These
//! predicates are the only decision inputs used by the workflow guards;
//! no other code computes approval eligibility.

use crate::models::{LineItem, Receipt};

/// Items counted toward inventory placement (accepted or partially accepted)
pub fn accepted_items(receipt: &Receipt) -> Vec<&LineItem> {
    receipt.items.iter().filter(|i| i.is_accepted()).collect()
}

/// Number of accepted items whose checklist is fully passed
pub fn qc_passed_count(receipt: &Receipt) -> usize {
    receipt
        .items
        .iter()
        .filter(|i| i.is_accepted() && i.qc_checks.all_passed())
        .count()
}

/// Fraction of accepted items passing all four checks (0.0 when none accepted)
pub fn qc_pass_rate(receipt: &Receipt) -> f64 {
    let accepted = accepted_items(receipt).len();
    if accepted == 0 {
        return 0.0;
    }
    qc_passed_count(receipt) as f64 / accepted as f64
}

/// Every line item has been individually inspected
pub fn all_items_inspected(receipt: &Receipt) -> bool {
    receipt.items.iter().all(|i| i.is_inspected())
}

/// Gate for QC final approval: at least one accepted item and a 100% QC
/// pass rate. A single accepted item with an unchecked box blocks the
/// whole receipt.
pub fn can_enter_inventory_approval(receipt: &Receipt) -> bool {
    let accepted = accepted_items(receipt);
    !accepted.is_empty() && accepted.iter().all(|i| i.qc_checks.all_passed())
}

/// Gate for inventory placement: every accepted item has a non-empty
/// warehouse assignment.
pub fn can_place_in_inventory(receipt: &Receipt) -> bool {
    all_accepted_assigned(&receipt.items)
}

/// Slice form of [`can_place_in_inventory`], for callers evaluating a
/// working copy of the items before committing it to the aggregate.
pub fn all_accepted_assigned(items: &[LineItem]) -> bool {
    items
        .iter()
        .filter(|i| i.is_accepted())
        .all(|i| i.warehouse.as_deref().is_some_and(|w| !w.trim().is_empty()))
}
