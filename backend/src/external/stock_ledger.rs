//! Stock Ledger Client
//!
//! Client for the inventory subsystem that commits accepted stock into
//! warehouses. Placement is at-least-once: every request carries an
//! idempotency key derived from (receipt id, item code) so retries never
//! double-post stock.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::workflow::PlacementRequest;

use crate::config::StockLedgerConfig;
use crate::error::{AppError, AppResult};

/// Port for inventory placement, injected into the workflow service so
/// the state machine stays testable without a network
#[async_trait]
pub trait InventoryPlacement: Send + Sync {
    /// Place one accepted line item into its assigned warehouse
    async fn place(&self, request: &PlacementRequest) -> AppResult<PlacementReceipt>;
}

/// HTTP client for the stock ledger service
#[derive(Clone)]
pub struct StockLedgerClient {
    base_url: String,
    api_key: String,
    max_retries: u32,
    http_client: Client,
}

/// Wire format for a placement request
#[derive(Debug, Serialize)]
struct PlaceInInventoryRequest<'a> {
    item_code: &'a str,
    quantity: rust_decimal::Decimal,
    warehouse: &'a str,
    source_receipt_id: uuid::Uuid,
}

/// Acknowledgement from the stock ledger
#[derive(Debug, Deserialize)]
pub struct PlacementReceipt {
    pub entry_no: String,
    pub warehouse: String,
}

impl StockLedgerClient {
    /// Create a new stock ledger client
    pub fn new(config: &StockLedgerConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            http_client,
        })
    }

    async fn place_once(&self, request: &PlacementRequest) -> AppResult<PlacementReceipt> {
        let url = format!("{}/placements", self.base_url);
        let idempotency_key = format!("{}:{}", request.source_receipt_id, request.item_code);

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("Idempotency-Key", idempotency_key)
            .json(&PlaceInInventoryRequest {
                item_code: &request.item_code,
                quantity: request.quantity,
                warehouse: &request.warehouse,
                source_receipt_id: request.source_receipt_id,
            })
            .send()
            .await
            .map_err(|e| AppError::PlacementFailure(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::PlacementFailure(format!(
                "Ledger returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::PlacementFailure(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl InventoryPlacement for StockLedgerClient {
    async fn place(&self, request: &PlacementRequest) -> AppResult<PlacementReceipt> {
        let mut attempt = 0;
        loop {
            match self.place_once(request).await {
                Ok(receipt) => return Ok(receipt),
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        item_code = %request.item_code,
                        receipt_id = %request.source_receipt_id,
                        attempt,
                        "Placement attempt failed, retrying: {}",
                        err
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}
