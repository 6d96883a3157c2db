//! Activity log entries for receipt audit trails

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ReceiptStatus;

/// One audit record for a successful workflow transition
///
/// Entries are created only as the side effect of a committed transition
/// and are never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    /// Short action label (e.g., "START_INSPECTION", "QC_APPROVED")
    pub action: String,
    pub status_from: ReceiptStatus,
    pub status_to: ReceiptStatus,
    /// Present for rejections and send-backs
    pub reason: Option<String>,
    pub actor: Uuid,
    pub created_at: DateTime<Utc>,
}
