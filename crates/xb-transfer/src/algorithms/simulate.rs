//! # Transfer Simulator
//!
//! State-reverting dry run. A failed dry run stops the transfer before
//! anything is submitted.

use crate::domain::{Address, FeeQuote, SimulationReport, TransferError, TransferRequest};
use crate::ports::SimulateCapability;
use tracing::debug;

/// Dry-run `request` with `fee`.
///
/// A report crediting less than `min_amount` counts as a failed simulation,
/// since the live call would revert on slippage.
pub async fn simulate<A>(
    adapter: &A,
    request: &TransferRequest,
    fee: &FeeQuote,
    refund_address: Address,
) -> Result<SimulationReport, TransferError>
where
    A: SimulateCapability + ?Sized,
{
    let report = adapter.simulate_send(request, fee, refund_address).await?;

    if report.amount_received < request.min_amount {
        return Err(TransferError::SimulationError {
            reason: format!(
                "slippage: would receive {}, minimum is {}",
                report.amount_received, request.min_amount
            ),
        });
    }

    debug!(
        "[xb-transfer] Simulation ok: guid {} receives {}",
        report.message_id, report.amount_received
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EndpointId;
    use primitive_types::U256;
    use crate::ports::mock::MockMessagingAdapter;

    fn request(min: u64) -> TransferRequest {
        TransferRequest::builder(EndpointId::new(1), EndpointId::new(2), Address::from_evm([9; 20]))
            .amount(100u64)
            .min_amount(min)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_simulation_reports_amounts() {
        let adapter = MockMessagingAdapter::new(EndpointId::new(1), Address::from_evm([1; 20]));
        let report = simulate(&adapter, &request(100), &FeeQuote::native(2u64), Address::from_evm([3; 20]))
            .await
            .unwrap();
        assert_eq!(report.amount_received, U256::from(100u64));
        assert_eq!(report.native_fee, U256::from(2u64));
    }

    #[tokio::test]
    async fn test_revert_reason_is_verbatim() {
        let adapter = MockMessagingAdapter::new(EndpointId::new(1), Address::from_evm([1; 20]))
            .with_simulation_failure("NoPeer(40231)");
        let err = simulate(&adapter, &request(100), &FeeQuote::native(2u64), Address::from_evm([3; 20]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::SimulationError {
                reason: "NoPeer(40231)".into()
            }
        );
    }

    #[tokio::test]
    async fn test_slippage_below_minimum_fails() {
        let adapter = MockMessagingAdapter::new(EndpointId::new(1), Address::from_evm([1; 20]))
            .with_received_shortfall(5u64);
        assert!(
            simulate(&adapter, &request(96), &FeeQuote::native(2u64), Address::from_evm([3; 20]))
                .await
                .is_err()
        );
        assert!(
            simulate(&adapter, &request(95), &FeeQuote::native(2u64), Address::from_evm([3; 20]))
                .await
                .is_ok()
        );
    }
}
