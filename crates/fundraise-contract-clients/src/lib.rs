use alloy::primitives::{Address, address};

pub mod board;
pub mod campaign;
pub mod card;
pub mod chain_fundraise;
pub mod common;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod session;
pub mod validation;

// ============================================================================
// Re-exports
// ============================================================================

pub use board::CampaignBoard;
pub use campaign::{Campaign, CampaignStatus};
pub use card::CampaignCard;
pub use chain_fundraise::{CampaignEvent, ChainFundraiseClient};
pub use error::FundraiseError;
pub use ledger::{CampaignLedger, TxOutcome};
pub use orchestrator::Orchestrator;
pub use session::{AccountSource, Session, SessionChange, SessionMonitor, WalletConnection};
pub use validation::{CreateCampaign, ValidationError};

// ============================================================================
// Contract Configuration
// ============================================================================

/// First contract address produced by Anvil account #0 (nonce 0).
pub const ANVIL_DEFAULT_CONTRACT_ADDRESS: Address =
    address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

/// Default local RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Configuration for connecting to a deployed ChainFundraise contract.
#[derive(Clone, Debug)]
pub struct ContractConfig {
    pub contract_address: Address,
    pub rpc_url: String,
    /// Reconnect attempts for WebSocket transports.
    pub max_ws_retries: u32,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            contract_address: Address::ZERO,
            rpc_url: String::new(),
            max_ws_retries: 10,
        }
    }
}

impl ContractConfig {
    /// # Arguments
    /// * `rpc_url` - Ethereum RPC endpoint (HTTP or WebSocket)
    /// * `contract_address` - Address of the deployed ChainFundraise contract
    pub fn new(rpc_url: String, contract_address: Address) -> Self {
        Self {
            contract_address,
            rpc_url,
            ..Default::default()
        }
    }

    /// Local Anvil node with the contract deployed first by account #0.
    pub fn anvil_config() -> Self {
        Self::new(DEFAULT_RPC_URL.to_string(), ANVIL_DEFAULT_CONTRACT_ADDRESS)
    }

    /// Same endpoint over WebSocket, required for event subscriptions.
    pub fn ws_url(&self) -> String {
        self.rpc_url
            .replace("http://", "ws://")
            .replace("https://", "wss://")
    }

    /// Copy of this config pointing at the WebSocket endpoint.
    pub fn with_ws_transport(&self) -> Self {
        Self {
            rpc_url: self.ws_url(),
            ..self.clone()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
