//! # Algorithms Module
//!
//! The pipeline stages: reconcile, quote, simulate, submit, watch.

pub mod cancel;
pub mod fee;
pub mod reconcile;
pub mod signer_locks;
pub mod simulate;
pub mod submit;
pub mod watcher;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use fee::FeeQuotingEngine;
pub use reconcile::{reconcile, reconcile_config};
pub use signer_locks::SignerLocks;
pub use simulate::simulate;
pub use submit::{submit, value_to_send};
pub use watcher::{await_delivery, DeliveryWatcher, PollState};
