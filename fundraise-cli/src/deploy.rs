use alloy::{
    hex,
    network::TransactionBuilder,
    primitives::{Address, B256, Bytes},
    providers::Provider,
    rpc::types::TransactionRequest,
};
use anyhow::{Context, anyhow, bail};
use fundraise_contract_clients::{
    FundraiseError, WalletConnection,
    common::{REQUIRED_CONFIRMATIONS, gas_with_buffer},
    error::classify_transport_error,
};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Creation bytecode from a Hardhat (`"bytecode": "0x.."`) or Foundry
/// (`"bytecode": { "object": "0x.." }`) artifact.
pub fn parse_artifact_bytecode(json: &str) -> anyhow::Result<Bytes> {
    let artifact: Value = serde_json::from_str(json).context("artifact is not valid JSON")?;
    let code = match artifact.get("bytecode") {
        Some(Value::String(code)) => code.as_str(),
        Some(Value::Object(object)) => object
            .get("object")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("artifact bytecode has no \"object\" field"))?,
        _ => bail!("artifact has no \"bytecode\" field"),
    };

    let bytes = hex::decode(code.trim()).context("artifact bytecode is not valid hex")?;
    if bytes.is_empty() {
        bail!("artifact bytecode is empty, is this an interface or abstract contract?");
    }
    Ok(Bytes::from(bytes))
}

pub fn read_artifact(path: &Path) -> anyhow::Result<Bytes> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read artifact {}", path.display()))?;
    parse_artifact_bytecode(&json)
}

/// Publish `bytecode` from the connected account and wait for one confirmation.
pub async fn deploy_contract(
    wallet: &WalletConnection,
    bytecode: Bytes,
) -> Result<(Address, B256), FundraiseError> {
    let provider = wallet.provider();
    let tx = TransactionRequest::default()
        .with_from(wallet.address())
        .with_deploy_code(bytecode);

    let estimated_gas = provider
        .estimate_gas(tx.clone())
        .await
        .map_err(|e| classify_transport_error("deploy", &e))?;
    let tx = tx.with_gas_limit(gas_with_buffer(estimated_gas));

    let pending = provider
        .send_transaction(tx)
        .await
        .map_err(|e| classify_transport_error("deploy", &e))?;
    let tx_hash = *pending.tx_hash();
    info!(tx_hash = ?tx_hash, "⏳ deployment submitted");

    let receipt = pending
        .with_required_confirmations(REQUIRED_CONFIRMATIONS)
        .get_receipt()
        .await
        .map_err(|e| anyhow!("deployment was submitted but never confirmed: {e}"))?;

    if !receipt.status() {
        return Err(FundraiseError::reverted(
            "deploy",
            format!("constructor reverted. Tx hash: {tx_hash:?}"),
        ));
    }
    let address = receipt
        .contract_address
        .ok_or_else(|| anyhow!("deployment receipt has no contract address"))?;
    Ok((address, tx_hash))
}
