//! # Transfer Submitter
//!
//! Checks the value invariant locally, then submits exactly once.

use super::signer_locks::SignerLocks;
use crate::domain::{Address, FeeQuote, TransactionReceipt, TransferError, TransferRequest};
use crate::ports::SubmitCapability;
use primitive_types::U256;
use tracing::info;

/// Value a `send` must carry: the native fee, plus the amount when the
/// adapter wraps the native asset.
pub fn value_to_send(
    request: &TransferRequest,
    fee: &FeeQuote,
    native_adapter: bool,
) -> Result<U256, TransferError> {
    if !native_adapter {
        return Ok(fee.native_fee);
    }
    fee.native_fee
        .checked_add(request.amount)
        .ok_or_else(|| TransferError::InvalidAmount("native fee + amount overflows".into()))
}

/// Submit `request` once, under the signer's write lock.
///
/// `value` must equal [`value_to_send`]; a mismatch fails with
/// `ValueMismatch` before any call reaches the adapter.
pub async fn submit<A>(
    adapter: &A,
    request: &TransferRequest,
    fee: &FeeQuote,
    refund_address: Address,
    value: U256,
    locks: &SignerLocks,
) -> Result<TransactionReceipt, TransferError>
where
    A: SubmitCapability + ?Sized,
{
    let expected = value_to_send(request, fee, adapter.is_native_adapter())?;
    if value != expected {
        return Err(TransferError::ValueMismatch {
            expected,
            actual: value,
        });
    }

    let _guard = locks.acquire(adapter.signer()).await;
    let receipt = adapter.send(request, fee, refund_address, value).await?;

    info!(
        tx = %receipt.transaction_id,
        value = %value,
        "[xb-transfer] Transfer {} -> {} accepted by source chain",
        request.source,
        request.destination
    );
    Ok(receipt)
}
