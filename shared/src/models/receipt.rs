//! Goods receipt note (GRN) aggregate

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActivityLogEntry, LineItem};

/// A goods receipt note tracked through inspection and approval
///
/// The receipt exclusively owns its line items and activity log; `status`
/// changes only through the workflow transition rules in [`crate::workflow`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    /// Unique human-readable receipt number (e.g., "GRN-2024-0001")
    pub grn_no: String,
    /// Purchase order this delivery was made against
    pub po_no: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub receipt_date: NaiveDate,
    pub status: ReceiptStatus,
    /// Line items in receipt order
    pub items: Vec<LineItem>,
    /// Append-only audit trail, newest first
    pub logs: Vec<ActivityLogEntry>,
    pub notes: Option<String>,
    pub total_accepted: Decimal,
    pub total_rejected: Decimal,
    pub created_by: Uuid,
    pub inspection_completed_by: Option<Uuid>,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Workflow state of a receipt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Pending,
    Inspecting,
    AwaitingInventoryApproval,
    Approved,
    Rejected,
    SentBack,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Pending => "pending",
            ReceiptStatus::Inspecting => "inspecting",
            ReceiptStatus::AwaitingInventoryApproval => "awaiting_inventory_approval",
            ReceiptStatus::Approved => "approved",
            ReceiptStatus::Rejected => "rejected",
            ReceiptStatus::SentBack => "sent_back",
        }
    }

    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReceiptStatus::Approved | ReceiptStatus::Rejected)
    }
}

impl std::fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReceiptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReceiptStatus::Pending),
            "inspecting" => Ok(ReceiptStatus::Inspecting),
            "awaiting_inventory_approval" => Ok(ReceiptStatus::AwaitingInventoryApproval),
            "approved" => Ok(ReceiptStatus::Approved),
            "rejected" => Ok(ReceiptStatus::Rejected),
            "sent_back" => Ok(ReceiptStatus::SentBack),
            other => Err(format!("unknown receipt status: {}", other)),
        }
    }
}
