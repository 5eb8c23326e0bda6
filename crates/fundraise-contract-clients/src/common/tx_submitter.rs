use alloy::{
    contract::{CallBuilder, CallDecoder},
    providers::Provider,
    rpc::types::TransactionReceipt,
    sol_types::SolInterface,
};
use anyhow::anyhow;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{REQUIRED_CONFIRMATIONS, gas_with_buffer};
use crate::error::{FundraiseError, classify_contract_error};

/// Runs a state-changing call through simulate -> estimate -> send -> confirm.
///
/// `S` is the custom error interface tried first when decoding reverts.
#[derive(Clone)]
pub(crate) struct TransactionSubmitter<S> {
    tx_lock: Arc<Mutex<()>>,
    _decoder: PhantomData<S>,
}

impl<S: SolInterface + Debug + Clone> TransactionSubmitter<S> {
    pub(crate) fn new(tx_lock: Arc<Mutex<()>>) -> Self {
        Self {
            tx_lock,
            _decoder: PhantomData,
        }
    }

    pub(crate) async fn invoke<P, D>(
        &self,
        method: &str,
        call: CallBuilder<P, D>,
    ) -> Result<TransactionReceipt, FundraiseError>
    where
        P: Provider + Clone,
        D: CallDecoder + Clone,
    {
        // Pre-simulate to catch reverts with proper error messages
        if let Err(e) = call.call().await {
            return Err(self.decode_error(method, e));
        }

        let estimated_gas = call
            .estimate_gas()
            .await
            .map_err(|e| self.decode_error(method, e))?;
        let gas_limit = gas_with_buffer(estimated_gas);
        let call = call.gas(gas_limit);

        // Acquire lock and send
        let _guard = self.tx_lock.lock().await;
        let pending = call.send().await.map_err(|e| self.decode_error(method, e))?;
        let tx_hash = *pending.tx_hash();
        info!(
            stage = "submitted",
            method = %method,
            tx_hash = ?tx_hash,
            gas_limit,
            "⏳ transaction submitted"
        );

        let receipt = pending
            .with_required_confirmations(REQUIRED_CONFIRMATIONS)
            .get_receipt()
            .await
            .map_err(|e| anyhow!("{method} was submitted but never confirmed: {e}"))?;

        Self::log_fee_details(method, &receipt, estimated_gas, gas_limit);

        if !receipt.status() {
            let used = receipt.gas_used;
            if used >= gas_limit {
                return Err(FundraiseError::reverted(
                    method,
                    format!("ran out of gas (used {used} of {gas_limit} limit). Tx: {tx_hash:?}"),
                ));
            }
            return Err(FundraiseError::reverted(
                method,
                format!("reverted on-chain. Tx hash: {tx_hash:?}"),
            ));
        }

        Ok(receipt)
    }

    fn decode_error(&self, method: &str, error: alloy::contract::Error) -> FundraiseError {
        match error.try_decode_into_interface_error::<S>() {
            Ok(error) => FundraiseError::reverted(method, format!("{error:?}")),
            Err(error) => classify_contract_error(method, error),
        }
    }

    fn log_fee_details(
        method: &str,
        receipt: &TransactionReceipt,
        estimated_gas: u64,
        gas_limit: u64,
    ) {
        let total_cost = receipt.effective_gas_price * receipt.gas_used as u128;

        if receipt.gas_used > estimated_gas {
            warn!(
                method = %method,
                tx_hash = ?receipt.transaction_hash,
                effective_gas_price = receipt.effective_gas_price,
                gas_used = receipt.gas_used,
                estimated_gas,
                gas_limit,
                total_cost,
                "💰 transaction gas details (used more than estimated)"
            );
        } else {
            info!(
                method = %method,
                tx_hash = ?receipt.transaction_hash,
                effective_gas_price = receipt.effective_gas_price,
                gas_used = receipt.gas_used,
                estimated_gas,
                gas_limit,
                total_cost,
                "💰 transaction gas details"
            );
        }
    }
}
