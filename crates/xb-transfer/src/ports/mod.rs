//! # Ports Module
//!
//! Hexagonal architecture ports (inbound API, outbound capabilities).

pub mod inbound;
pub mod mock;
pub mod outbound;

pub use inbound::*;
pub use mock::{MockMessagingAdapter, ScriptedObserver};
pub use outbound::*;
