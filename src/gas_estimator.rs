use crate::{chain::GasOracle, error::Error};
use alloy::{
    primitives::{Address, Bytes, U256},
    rpc::types::TransactionRequest,
};
use tracing::debug;

pub const DEFAULT_GAS_MARGIN: u64 = 100_000;

/// Re-estimates gas on the target chain and pads the result, since the
/// source transaction's gas limit says nothing about execution on divergent state.
pub struct GasEstimator<'a, O: ?Sized> {
    oracle: &'a O,
    margin: u64,
}

impl<'a, O: GasOracle + ?Sized> GasEstimator<'a, O> {
    pub fn new(oracle: &'a O, margin: u64) -> Self {
        Self { oracle, margin }
    }

    pub async fn estimate(
        &self,
        sender: Address,
        recipient: Option<Address>,
        value: U256,
        payload: &Bytes,
    ) -> Result<u64, Error> {
        let mut call = TransactionRequest::default()
            .from(sender)
            .value(value)
            .input(payload.clone().into());
        // No `to` means the node estimates a contract creation
        if let Some(recipient) = recipient {
            call = call.to(recipient);
        }

        let estimate = self.oracle.estimate_gas(call).await?;
        let gas_limit = estimate
            .checked_add(self.margin)
            .ok_or(Error::GasOverflow {
                estimate,
                margin: self.margin,
            })?;

        debug!(%sender, estimate, margin = self.margin, gas_limit, "Estimated gas");
        Ok(gas_limit)
    }
}
