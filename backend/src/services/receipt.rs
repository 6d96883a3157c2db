//! Receipt service for creating and querying goods receipt notes

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{ActivityLogEntry, ItemStatus, LineItem, QcChecklist, Receipt, ReceiptStatus};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;

/// Receipt service for creating receipts and reading full aggregates
#[derive(Clone)]
pub struct ReceiptService {
    db: PgPool,
}

/// Input for creating a receipt
#[derive(Debug, Deserialize)]
pub struct CreateReceiptInput {
    pub grn_no: String,
    pub po_no: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub receipt_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub items: Vec<NewLineItem>,
}

/// One line item on a new receipt
#[derive(Debug, Deserialize)]
pub struct NewLineItem {
    pub item_code: String,
    pub item_name: String,
    pub po_qty: Decimal,
    pub received_qty: Decimal,
    pub batch_no: Option<String>,
    /// Proposed storage location, confirmed at inventory approval
    pub warehouse: Option<String>,
}

/// Listing filters
#[derive(Debug, Default, Deserialize)]
pub struct ReceiptFilters {
    pub status: Option<ReceiptStatus>,
    pub search: Option<String>,
    pub created_by: Option<Uuid>,
}

/// Listing row: receipt header plus an item count, no full aggregate
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptSummary {
    pub id: Uuid,
    pub grn_no: String,
    pub po_no: Option<String>,
    pub supplier_name: Option<String>,
    pub receipt_date: NaiveDate,
    pub status: ReceiptStatus,
    pub total_items: i64,
    pub total_accepted: Decimal,
    pub total_rejected: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Database row for a receipt header
#[derive(Debug, FromRow)]
struct ReceiptRow {
    id: Uuid,
    grn_no: String,
    po_no: Option<String>,
    supplier_id: Option<Uuid>,
    supplier_name: Option<String>,
    receipt_date: NaiveDate,
    status: String,
    notes: Option<String>,
    total_accepted: Decimal,
    total_rejected: Decimal,
    created_by: Uuid,
    inspection_completed_by: Option<Uuid>,
    approved_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Database row for a line item
#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    item_code: String,
    item_name: String,
    po_qty: Decimal,
    received_qty: Decimal,
    accepted_qty: Decimal,
    rejected_qty: Decimal,
    batch_no: Option<String>,
    item_status: String,
    qc_checks: serde_json::Value,
    warehouse: Option<String>,
    bin_rack: Option<String>,
    notes: Option<String>,
    inspected_at: Option<DateTime<Utc>>,
}

/// Database row for an activity log entry
#[derive(Debug, FromRow)]
struct LogRow {
    id: Uuid,
    action: String,
    status_from: String,
    status_to: String,
    reason: Option<String>,
    actor: Uuid,
    created_at: DateTime<Utc>,
}

/// Database row for a listing entry
#[derive(Debug, FromRow)]
struct SummaryRow {
    id: Uuid,
    grn_no: String,
    po_no: Option<String>,
    supplier_name: Option<String>,
    receipt_date: NaiveDate,
    status: String,
    total_items: i64,
    total_accepted: Decimal,
    total_rejected: Decimal,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> AppResult<ReceiptStatus> {
    s.parse()
        .map_err(|e: String| AppError::Internal(format!("corrupt receipt row: {}", e)))
}

fn parse_item_status(s: &str) -> AppResult<ItemStatus> {
    s.parse()
        .map_err(|e: String| AppError::Internal(format!("corrupt item row: {}", e)))
}

impl TryFrom<ItemRow> for LineItem {
    type Error = AppError;

    fn try_from(row: ItemRow) -> AppResult<Self> {
        let qc_checks: QcChecklist = serde_json::from_value(row.qc_checks)
            .map_err(|e| AppError::Internal(format!("corrupt qc_checks: {}", e)))?;
        Ok(LineItem {
            id: row.id,
            item_code: row.item_code,
            item_name: row.item_name,
            po_qty: row.po_qty,
            received_qty: row.received_qty,
            accepted_qty: row.accepted_qty,
            rejected_qty: row.rejected_qty,
            batch_no: row.batch_no,
            item_status: parse_item_status(&row.item_status)?,
            qc_checks,
            warehouse: row.warehouse,
            bin_rack: row.bin_rack,
            notes: row.notes,
            inspected_at: row.inspected_at,
        })
    }
}

/// Load the full aggregate: header, items in receipt order, logs newest first
pub(crate) async fn load_receipt(
    conn: &mut sqlx::PgConnection,
    id: Uuid,
) -> AppResult<Option<Receipt>> {
    let row = sqlx::query_as::<_, ReceiptRow>(
        r#"
        SELECT id, grn_no, po_no, supplier_id, supplier_name, receipt_date, status, notes,
               total_accepted, total_rejected, created_by, inspection_completed_by,
               approved_by, created_at, updated_at
        FROM receipts
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let item_rows = sqlx::query_as::<_, ItemRow>(
        r#"
        SELECT id, item_code, item_name, po_qty, received_qty, accepted_qty, rejected_qty,
               batch_no, item_status, qc_checks, warehouse, bin_rack, notes, inspected_at
        FROM receipt_items
        WHERE receipt_id = $1
        ORDER BY position
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let log_rows = sqlx::query_as::<_, LogRow>(
        r#"
        SELECT id, action, status_from, status_to, reason, actor, created_at
        FROM receipt_logs
        WHERE receipt_id = $1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let items = item_rows
        .into_iter()
        .map(LineItem::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    let logs = log_rows
        .into_iter()
        .map(|row| {
            Ok(ActivityLogEntry {
                id: row.id,
                action: row.action,
                status_from: parse_status(&row.status_from)?,
                status_to: parse_status(&row.status_to)?,
                reason: row.reason,
                actor: row.actor,
                created_at: row.created_at,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Some(Receipt {
        id: row.id,
        grn_no: row.grn_no,
        po_no: row.po_no,
        supplier_id: row.supplier_id,
        supplier_name: row.supplier_name,
        receipt_date: row.receipt_date,
        status: parse_status(&row.status)?,
        items,
        logs,
        notes: row.notes,
        total_accepted: row.total_accepted,
        total_rejected: row.total_rejected,
        created_by: row.created_by,
        inspection_completed_by: row.inspection_completed_by,
        approved_by: row.approved_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

impl ReceiptService {
    /// Create a new ReceiptService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a receipt with its line items; the workflow starts in `pending`
    pub async fn create(&self, created_by: Uuid, input: CreateReceiptInput) -> AppResult<Receipt> {
        validation::validate_grn_no(&input.grn_no).map_err(|msg| AppError::Validation {
            field: "grn_no".to_string(),
            message: msg.to_string(),
        })?;

        if input.items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "A receipt requires at least one line item".to_string(),
            });
        }

        for item in &input.items {
            if item.item_code.trim().is_empty() {
                return Err(AppError::Validation {
                    field: "item_code".to_string(),
                    message: "Item code is required".to_string(),
                });
            }
            validation::validate_new_item_quantities(item.po_qty, item.received_qty).map_err(
                |msg| AppError::Validation {
                    field: format!("items.{}", item.item_code),
                    message: msg.to_string(),
                },
            )?;
        }

        let existing = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM receipts WHERE grn_no = $1)",
        )
        .bind(input.grn_no.trim())
        .fetch_one(&self.db)
        .await?;

        if existing {
            return Err(AppError::DuplicateEntry("grn_no".to_string()));
        }

        let receipt_date = input.receipt_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        let receipt_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO receipts (grn_no, po_no, supplier_id, supplier_name, receipt_date,
                                  status, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
            RETURNING id
            "#,
        )
        .bind(input.grn_no.trim())
        .bind(&input.po_no)
        .bind(input.supplier_id)
        .bind(&input.supplier_name)
        .bind(receipt_date)
        .bind(&input.notes)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in input.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO receipt_items (receipt_id, position, item_code, item_name,
                                           po_qty, received_qty, batch_no, warehouse, qc_checks)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(receipt_id)
            .bind(position as i32)
            .bind(item.item_code.trim())
            .bind(&item.item_name)
            .bind(item.po_qty)
            .bind(item.received_qty)
            .bind(&item.batch_no)
            .bind(&item.warehouse)
            .bind(serde_json::to_value(QcChecklist::default()).unwrap_or_default())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(receipt_id = %receipt_id, grn_no = %input.grn_no, "Receipt created");

        self.get(receipt_id).await
    }

    /// Get the full receipt aggregate including items and log
    pub async fn get(&self, id: Uuid) -> AppResult<Receipt> {
        let mut conn = self.db.acquire().await?;
        load_receipt(&mut conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Receipt".to_string()))
    }

    /// List receipts with optional status / search / creator filters
    pub async fn list(
        &self,
        filters: ReceiptFilters,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<ReceiptSummary>> {
        let per_page = pagination.per_page.clamp(1, 100);
        let page = pagination.page.max(1);
        let offset = (page - 1) as i64 * per_page as i64;

        let status = filters.status.map(|s| s.as_str().to_string());
        let search = filters
            .search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("%{}%", s.trim()));

        let total_items = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM receipts r
            WHERE ($1::text IS NULL OR r.status = $1)
              AND ($2::text IS NULL OR r.grn_no ILIKE $2 OR r.po_no ILIKE $2
                   OR r.supplier_name ILIKE $2)
              AND ($3::uuid IS NULL OR r.created_by = $3)
            "#,
        )
        .bind(&status)
        .bind(&search)
        .bind(filters.created_by)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT r.id, r.grn_no, r.po_no, r.supplier_name, r.receipt_date, r.status,
                   COUNT(ri.id) AS total_items, r.total_accepted, r.total_rejected,
                   r.created_by, r.created_at
            FROM receipts r
            LEFT JOIN receipt_items ri ON ri.receipt_id = r.id
            WHERE ($1::text IS NULL OR r.status = $1)
              AND ($2::text IS NULL OR r.grn_no ILIKE $2 OR r.po_no ILIKE $2
                   OR r.supplier_name ILIKE $2)
              AND ($3::uuid IS NULL OR r.created_by = $3)
            GROUP BY r.id
            ORDER BY r.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&status)
        .bind(&search)
        .bind(filters.created_by)
        .bind(per_page as i64)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(|row| {
                Ok(ReceiptSummary {
                    id: row.id,
                    grn_no: row.grn_no,
                    po_no: row.po_no,
                    supplier_name: row.supplier_name,
                    receipt_date: row.receipt_date,
                    status: parse_status(&row.status)?,
                    total_items: row.total_items,
                    total_accepted: row.total_accepted,
                    total_rejected: row.total_rejected,
                    created_by: row.created_by,
                    created_at: row.created_at,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let total_pages = ((total_items as u64) + per_page as u64 - 1) / per_page as u64;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta {
                page,
                per_page,
                total_items: total_items as u64,
                total_pages: total_pages as u32,
            },
        })
    }
}
