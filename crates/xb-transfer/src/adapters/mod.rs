//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound capability traits.

mod simnet;

pub use simnet::{ObservedAsset, Simnet, SimnetAdapter, SimnetObserver};
