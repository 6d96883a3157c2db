//! Business logic services for the Goods Receipt Workflow Platform

pub mod receipt;
pub mod workflow;

pub use receipt::ReceiptService;
pub use workflow::WorkflowService;
