//! # XBridge Runtime
//!
//! Loads a deployment file and drives the transfer service over an
//! in-process simulated network.
//!
//! ## Modules
//!
//! - `deployment` - TOML deployment file: endpoints, connections, overrides
//! - `runtime` - builds chains, adapters and the [`xb_transfer::TransferService`]
//! - `commands` - `wire`, `audit` and `send` as used by the `xbridge` binary

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commands;
pub mod deployment;
pub mod runtime;

pub use commands::{audit, build_request, describe_outcome, send, wire, SendArgs};
pub use deployment::{ConfigError, Deployment};
pub use runtime::SimnetRuntime;
