//! Validation utilities for the Goods Receipt Workflow Platform
//!
//! Boundary checks applied when a receipt is created, before any workflow
//! evaluation runs.

use rust_decimal::Decimal;

// ============================================================================
// Receipt Validations
// ============================================================================

/// Validate a receipt number (e.g., "GRN-2024-0001")
pub fn validate_grn_no(grn_no: &str) -> Result<(), &'static str> {
    let trimmed = grn_no.trim();
    if trimmed.is_empty() {
        return Err("Receipt number is required");
    }
    if trimmed.len() > 32 {
        return Err("Receipt number must be at most 32 characters");
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Receipt number may only contain letters, digits, '-' and '_'");
    }
    Ok(())
}

/// Validate quantities on a new line item
pub fn validate_new_item_quantities(po_qty: Decimal, received_qty: Decimal) -> Result<(), &'static str> {
    if po_qty < Decimal::ZERO {
        return Err("Ordered quantity cannot be negative");
    }
    if received_qty <= Decimal::ZERO {
        return Err("Received quantity must be positive");
    }
    Ok(())
}
