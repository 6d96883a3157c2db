//! Receipt line items and the quality-control checklist

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One item/quantity entry within a receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub item_code: String,
    pub item_name: String,
    /// Quantity on the purchase order
    pub po_qty: Decimal,
    /// Quantity physically delivered
    pub received_qty: Decimal,
    pub accepted_qty: Decimal,
    pub rejected_qty: Decimal,
    pub batch_no: Option<String>,
    pub item_status: ItemStatus,
    pub qc_checks: QcChecklist,
    /// Assigned storage location, required before inventory placement
    pub warehouse: Option<String>,
    pub bin_rack: Option<String>,
    /// Mandatory when the item is rejected
    pub notes: Option<String>,
    pub inspected_at: Option<DateTime<Utc>>,
}

impl LineItem {
    /// Whether this item counts toward inventory placement
    pub fn is_accepted(&self) -> bool {
        matches!(
            self.item_status,
            ItemStatus::Accepted | ItemStatus::PartiallyAccepted
        )
    }

    pub fn is_inspected(&self) -> bool {
        self.item_status != ItemStatus::Pending
    }
}

/// Inspection disposition of a line item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Accepted,
    PartiallyAccepted,
    Rejected,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Accepted => "accepted",
            ItemStatus::PartiallyAccepted => "partially_accepted",
            ItemStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "accepted" => Ok(ItemStatus::Accepted),
            "partially_accepted" => Ok(ItemStatus::PartiallyAccepted),
            "rejected" => Ok(ItemStatus::Rejected),
            other => Err(format!("unknown item status: {}", other)),
        }
    }
}

/// Fixed quality-control checklist applied to every line item
///
/// Exactly four named checks; an item passes QC only when all four are
/// true. A fixed struct rather than an open map keeps that invariant
/// checkable at the type level.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QcChecklist {
    /// Item checked for visual defects
    pub visual_inspection: bool,
    /// Received quantity matches the purchase order
    pub quantity_check: bool,
    /// Packaging is in good condition
    pub packaging_condition: bool,
    /// All documents complete and match
    pub documentation: bool,
}

impl QcChecklist {
    pub fn all_passed(&self) -> bool {
        self.visual_inspection
            && self.quantity_check
            && self.packaging_condition
            && self.documentation
    }

    /// Number of checks passed, out of four
    pub fn passed_count(&self) -> u8 {
        [
            self.visual_inspection,
            self.quantity_check,
            self.packaging_condition,
            self.documentation,
        ]
        .iter()
        .filter(|&&c| c)
        .count() as u8
    }

    pub fn passed() -> Self {
        Self {
            visual_inspection: true,
            quantity_check: true,
            packaging_condition: true,
            documentation: true,
        }
    }
}
