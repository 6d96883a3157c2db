//! HTTP middleware

pub mod actor;

pub use actor::{actor_middleware, CurrentActor};
