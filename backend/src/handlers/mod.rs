//! HTTP handlers for the Goods Receipt Workflow Platform

mod health;
mod receipt;
mod workflow;

pub use health::*;
pub use receipt::*;
pub use workflow::*;
