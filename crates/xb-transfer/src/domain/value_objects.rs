//! # Domain Value Objects
//!
//! Immutable value types shared by every pipeline stage.

use super::errors::TransferError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a chain within the messaging mesh.
///
/// Externally assigned by the messaging network; opaque to the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(u32);

impl EndpointId {
    /// Wrap a raw endpoint id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw numeric value.
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EndpointId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Account or contract identifier on some chain.
///
/// Stored in the 32-byte universal form used for peer bindings: 20-byte EVM
/// addresses are left-padded with zeros. Equality is byte equality, so two
/// hex spellings differing only in letter case compare equal.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 32]);

impl Address {
    /// The all-zero address, reported by adapters for unset peers.
    pub const ZERO: Address = Address([0u8; 32]);

    /// Build from the 32-byte universal form.
    pub const fn from_bytes32(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build from a 20-byte EVM address.
    pub fn from_evm(bytes: [u8; 20]) -> Self {
        let mut out = [0u8; 32];
        out[12..].copy_from_slice(&bytes);
        Self(out)
    }

    /// Parse a hex address of 20 or 32 bytes, `0x` prefix optional.
    pub fn parse(s: &str) -> Result<Self, TransferError> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(digits)
            .map_err(|e| TransferError::InvalidAddress(format!("{s}: {e}")))?;

        match bytes.len() {
            20 => {
                let mut evm = [0u8; 20];
                evm.copy_from_slice(&bytes);
                Ok(Self::from_evm(evm))
            }
            32 => {
                let mut universal = [0u8; 32];
                universal.copy_from_slice(&bytes);
                Ok(Self(universal))
            }
            n => Err(TransferError::InvalidAddress(format!(
                "{s}: expected 20 or 32 bytes, got {n}"
            ))),
        }
    }

    /// The 32-byte universal form.
    pub fn as_bytes32(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Whether the address fits in 20 bytes (upper 12 bytes are zero).
    pub fn is_evm(&self) -> bool {
        self.0[..12].iter().all(|b| *b == 0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_evm() {
            write!(f, "0x{}", hex::encode(&self.0[12..]))
        } else {
            write!(f, "0x{}", hex::encode(self.0))
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = TransferError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_string()
    }
}

/// Identifier of a transaction accepted by a chain (usually a hash).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wrap a transaction identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TransactionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Pipeline stage names, attached to every logged transition and failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Local request validation.
    Validate,
    /// Peer binding reconciliation.
    Reconcile,
    /// Fee quoting.
    Quote,
    /// Dry run.
    Simulate,
    /// Real submission.
    Submit,
    /// Delivery watching.
    Watch,
}

impl Stage {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Reconcile => "reconcile",
            Stage::Quote => "quote",
            Stage::Simulate => "simulate",
            Stage::Submit => "submit",
            Stage::Watch => "watch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestration state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestrationState {
    /// Request accepted, nothing done yet.
    #[default]
    Initialized,
    /// Peer bindings verified (and corrected if needed).
    PeersReconciled,
    /// Fee obtained (quoted or fallback).
    FeeQuoted,
    /// Dry run succeeded.
    Simulated,
    /// Transfer accepted by the source chain.
    Submitted,
    /// Delivery observed on the destination.
    Confirmed,
    /// Watch window ended without observing delivery.
    TimedOut,
    /// Fatal error in some stage.
    Failed,
}

impl OrchestrationState {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: OrchestrationState) -> bool {
        match (self, next) {
            (s, Self::Failed) => !s.is_terminal(),
            (Self::Initialized, Self::PeersReconciled) => true,
            (Self::PeersReconciled, Self::FeeQuoted) => true,
            (Self::FeeQuoted, Self::Simulated) => true,
            (Self::FeeQuoted, Self::Submitted) => true,
            (Self::Simulated, Self::Submitted) => true,
            (Self::Submitted, Self::Confirmed) => true,
            (Self::Submitted, Self::TimedOut) => true,
            _ => false,
        }
    }

    /// Check if terminal state.
    ///
    /// `Simulated` and `Submitted` are terminal only for dry runs and
    /// unobserved routes respectively, which the orchestrator decides.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::TimedOut | Self::Failed)
    }
}
