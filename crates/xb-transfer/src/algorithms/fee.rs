//! # Fee Quoting Engine
//!
//! Quotes the delivery fee and substitutes a configured conservative fee on
//! any failure. Quoting never fails a transfer.

use crate::domain::{FeeQuote, FeeSource, OrchestratorConfig, TransferError, TransferRequest};
use crate::ports::QuoteCapability;
use primitive_types::U256;
use std::time::Duration;
use tracing::{debug, warn};

/// Fee quoting with fallback.
#[derive(Clone, Debug)]
pub struct FeeQuotingEngine {
    fallback_fee: U256,
    use_protocol_token: bool,
    timeout: Duration,
}

impl FeeQuotingEngine {
    /// Create an engine with an explicit fallback.
    pub fn new(fallback_fee: U256, use_protocol_token: bool, timeout: Duration) -> Self {
        Self {
            fallback_fee,
            use_protocol_token,
            timeout,
        }
    }

    /// Create an engine from orchestrator configuration.
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(
            config.fallback_fee,
            config.use_protocol_token,
            Duration::from_millis(config.quote_timeout_ms),
        )
    }

    /// Fee used when quoting fails.
    pub fn fallback(&self) -> FeeQuote {
        FeeQuote::native(self.fallback_fee)
    }

    /// Quote the fee for `request`.
    ///
    /// Timeouts, reverts and malformed responses all yield the fallback fee
    /// tagged [`FeeSource::Fallback`].
    pub async fn quote<A>(&self, adapter: &A, request: &TransferRequest) -> (FeeQuote, FeeSource)
    where
        A: QuoteCapability + ?Sized,
    {
        let result = match tokio::time::timeout(
            self.timeout,
            adapter.quote_send(request, self.use_protocol_token),
        )
        .await
        {
            Ok(Ok(quote)) => self.check(quote),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(TransferError::QuoteError(format!(
                "quote timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };

        match result {
            Ok(quote) => {
                debug!(
                    "[xb-transfer] Quoted fee {} {} -> {}: native {}",
                    request.source, request.destination, request.amount, quote.native_fee
                );
                (quote, FeeSource::Quoted)
            }
            Err(err) => {
                let fallback = self.fallback();
                warn!(
                    error = %err,
                    fallback_fee = %fallback.native_fee,
                    "[xb-transfer] Fee quote failed, using fallback fee"
                );
                (fallback, FeeSource::Fallback)
            }
        }
    }

    fn check(&self, quote: FeeQuote) -> Result<FeeQuote, TransferError> {
        if !self.use_protocol_token && !quote.protocol_token_fee.is_zero() {
            return Err(TransferError::QuoteError(format!(
                "protocol token fee {} quoted for a native-only request",
                quote.protocol_token_fee
            )));
        }
        Ok(quote)
    }
}

impl Default for FeeQuotingEngine {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, EndpointId};
    use crate::ports::mock::MockMessagingAdapter;

    fn request() -> TransferRequest {
        TransferRequest::builder(EndpointId::new(1), EndpointId::new(2), Address::from_evm([9; 20]))
            .amount(100u64)
            .build()
            .unwrap()
    }

    fn adapter() -> MockMessagingAdapter {
        MockMessagingAdapter::new(EndpointId::new(1), Address::from_evm([1; 20]))
    }

    #[tokio::test]
    async fn test_quote_passes_through() {
        let adapter = adapter().with_quote(FeeQuote::native(7u64));
        let engine = FeeQuotingEngine::default();
        let (quote, source) = engine.quote(&adapter, &request()).await;
        assert_eq!(quote.native_fee, U256::from(7u64));
        assert_eq!(source, FeeSource::Quoted);
    }

    #[tokio::test]
    async fn test_failed_quote_falls_back() {
        let adapter = adapter().with_quote_failure(TransferError::NetworkError("rpc".into()));
        let engine = FeeQuotingEngine::new(U256::from(300u64), false, Duration::from_secs(1));
        let (quote, source) = engine.quote(&adapter, &request()).await;
        assert_eq!(quote, FeeQuote::native(300u64));
        assert_eq!(source, FeeSource::Fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_quote_falls_back() {
        let adapter = adapter().with_quote_delay(Duration::from_secs(30));
        let engine = FeeQuotingEngine::new(U256::from(300u64), false, Duration::from_secs(1));
        let (quote, source) = engine.quote(&adapter, &request()).await;
        assert_eq!(quote.native_fee, U256::from(300u64));
        assert_eq!(source, FeeSource::Fallback);
    }

    #[tokio::test]
    async fn test_unrequested_protocol_token_fee_is_malformed() {
        let adapter = adapter().with_quote(FeeQuote {
            native_fee: U256::from(5u64),
            protocol_token_fee: U256::from(1u64),
        });
        let engine = FeeQuotingEngine::new(U256::from(300u64), false, Duration::from_secs(1));
        let (_, source) = engine.quote(&adapter, &request()).await;
        assert_eq!(source, FeeSource::Fallback);

        let engine = FeeQuotingEngine::new(U256::from(300u64), true, Duration::from_secs(1));
        let (quote, source) = engine.quote(&adapter, &request()).await;
        assert_eq!(source, FeeSource::Quoted);
        assert_eq!(quote.protocol_token_fee, U256::from(1u64));
    }
}
