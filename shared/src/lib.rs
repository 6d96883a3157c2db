//! Shared types and models for the Goods Receipt Workflow Platform
//!
//! This crate contains the receipt domain model, the pure quality
//! aggregation rules, and the workflow state machine shared between the
//! backend and other components of the system.

pub mod models;
pub mod quality;
pub mod types;
pub mod validation;
pub mod workflow;

pub use models::*;
pub use types::*;
pub use workflow::*;
