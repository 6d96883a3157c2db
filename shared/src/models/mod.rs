//! Domain models for the Goods Receipt Workflow Platform

mod activity;
mod line_item;
mod receipt;

pub use activity::*;
pub use line_item::*;
pub use receipt::*;
