//! # Domain Module
//!
//! Core domain types for cross-chain transfers.

pub mod config;
pub mod entities;
pub mod errors;
pub mod mesh;
pub mod units;
pub mod value_objects;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use mesh::*;
pub use units::*;
pub use value_objects::*;
