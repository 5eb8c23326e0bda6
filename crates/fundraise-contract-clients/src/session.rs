//! Connection to the RPC endpoint and the account that signs transactions.

use alloy::{
    network::EthereumWallet,
    primitives::{Address, U256},
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
    rpc::client::{ClientBuilder, RpcClient},
    signers::local::PrivateKeySigner,
};
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::board::CampaignBoard;
use crate::chain_fundraise::ChainFundraiseClient;
use crate::error::{FundraiseError, classify_transport_error};
use crate::ledger::CampaignLedger;
use crate::orchestrator::Orchestrator;
use crate::ContractConfig;

/// Where the signing account comes from.
#[derive(Clone)]
pub enum AccountSource {
    /// Hex private key, signed locally.
    LocalKey(String),
    /// Accounts unlocked on the node (`eth_accounts`), optionally pinned to one.
    Node { from: Option<Address> },
}

impl std::fmt::Debug for AccountSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountSource::LocalKey(_) => f.write_str("LocalKey(<redacted>)"),
            AccountSource::Node { from } => f.debug_struct("Node").field("from", from).finish(),
        }
    }
}

fn is_ws_url(url: &str) -> bool {
    url.starts_with("ws://") || url.starts_with("wss://")
}

async fn rpc_client(rpc_url: &str, max_ws_retries: u32) -> Result<RpcClient, FundraiseError> {
    if is_ws_url(rpc_url) {
        let ws = WsConnect::new(rpc_url).with_max_retries(max_ws_retries);
        return ClientBuilder::default()
            .ws(ws)
            .await
            .map_err(|e| FundraiseError::provider_unavailable(format!("{rpc_url}: {e}")));
    }
    let url = rpc_url.parse().map_err(|e| {
        FundraiseError::provider_unavailable(format!("invalid RPC URL {rpc_url}: {e}"))
    })?;
    Ok(ClientBuilder::default().http(url))
}

/// Pick the signing account out of the node's unlocked accounts.
fn select_account(accounts: &[Address], from: Option<Address>) -> Result<Address, FundraiseError> {
    match from {
        Some(wanted) if accounts.contains(&wanted) => Ok(wanted),
        Some(wanted) => Err(FundraiseError::UserRejected(format!(
            "account {wanted} is not available on this node"
        ))),
        None => accounts.first().copied().ok_or_else(|| {
            FundraiseError::UserRejected("the node exposes no accounts".to_string())
        }),
    }
}

/// Connected provider plus the resolved account and network.
#[derive(Clone)]
pub struct WalletConnection {
    provider: DynProvider,
    address: Address,
    chain_id: u64,
    source: AccountSource,
}

impl WalletConnection {
    /// Connect to `rpc_url` (HTTP or WebSocket) and resolve the account.
    ///
    /// Fails with `ProviderUnavailable` when the endpoint does not answer and
    /// with `UserRejected` when no usable account is granted.
    pub async fn connect(
        rpc_url: &str,
        source: &AccountSource,
        max_ws_retries: u32,
    ) -> Result<Self, FundraiseError> {
        let client = rpc_client(rpc_url, max_ws_retries).await?;

        let (provider, local_address) = match source {
            AccountSource::LocalKey(key) => {
                let signer: PrivateKeySigner = key
                    .trim()
                    .parse()
                    .map_err(|e| anyhow!("invalid private key: {e}"))?;
                let address = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_client(client)
                    .erased();
                (provider, Some(address))
            }
            AccountSource::Node { .. } => {
                (ProviderBuilder::new().connect_client(client).erased(), None)
            }
        };

        // First round trip doubles as the reachability probe
        let chain_id = provider.get_chain_id().await.map_err(|e| {
            FundraiseError::provider_unavailable(format!("{rpc_url} did not answer: {e}"))
        })?;

        let address = match local_address {
            Some(address) => address,
            None => {
                let accounts = provider
                    .get_accounts()
                    .await
                    .map_err(|e| classify_transport_error("eth_accounts", &e))?;
                let pinned = match source {
                    AccountSource::Node { from } => *from,
                    AccountSource::LocalKey(_) => None,
                };
                select_account(&accounts, pinned)?
            }
        };

        info!(address = %address, chain_id, rpc_url = %rpc_url, "🔗 connected");
        Ok(Self {
            provider,
            address,
            chain_id,
            source: source.clone(),
        })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Chain id captured at connect time.
    pub fn network(&self) -> u64 {
        self.chain_id
    }

    pub async fn balance(&self, address: Address) -> Result<U256, FundraiseError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| classify_transport_error("eth_getBalance", &e))
    }

    pub async fn own_balance(&self) -> Result<U256, FundraiseError> {
        self.balance(self.address).await
    }

    /// Current view of the node: chain id and (for node accounts) the account list.
    async fn observe(&self) -> Result<Observed, FundraiseError> {
        let chain_id = self
            .provider
            .get_chain_id()
            .await
            .map_err(|e| classify_transport_error("eth_chainId", &e))?;
        let accounts = match self.source {
            AccountSource::LocalKey(_) => vec![self.address],
            AccountSource::Node { .. } => self
                .provider
                .get_accounts()
                .await
                .map_err(|e| classify_transport_error("eth_accounts", &e))?,
        };
        Ok(Observed { chain_id, accounts })
    }
}

/// A connected wallet bound to the ChainFundraise contract.
#[derive(Clone)]
pub struct Session {
    config: ContractConfig,
    wallet: WalletConnection,
    client: ChainFundraiseClient<DynProvider>,
}

impl Session {
    /// Connect, bind the contract and verify it answers.
    ///
    /// A contract that fails the liveness probe aborts the connection with
    /// `ContractUnreachable`.
    pub async fn connect(
        config: ContractConfig,
        source: &AccountSource,
    ) -> Result<Self, FundraiseError> {
        let wallet = WalletConnection::connect(&config.rpc_url, source, config.max_ws_retries).await?;
        let tx_lock = Arc::new(Mutex::new(()));
        let client = ChainFundraiseClient::new(
            wallet.provider().clone(),
            config.contract_address,
            wallet.address(),
            tx_lock,
        );
        let count = client.check_liveness().await?;
        info!(contract = %config.contract_address, campaigns = count, "📜 contract reachable");
        Ok(Self {
            config,
            wallet,
            client,
        })
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    pub fn wallet(&self) -> &WalletConnection {
        &self.wallet
    }

    pub fn client(&self) -> &ChainFundraiseClient<DynProvider> {
        &self.client
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn network(&self) -> u64 {
        self.wallet.network()
    }

    pub fn ledger(&self) -> Arc<dyn CampaignLedger> {
        Arc::new(self.client.clone())
    }

    /// Fresh board and orchestrator sharing this session's ledger.
    pub fn orchestrator(&self) -> Orchestrator {
        let ledger = self.ledger();
        Orchestrator::new(ledger.clone(), CampaignBoard::new(ledger))
    }

    /// Watcher for account and network changes on this session.
    pub fn monitor(&self, period: Duration) -> SessionMonitor {
        SessionMonitor::new(self.wallet.clone(), period)
    }
}

/// Something that invalidates the whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// The account list changed. Empty means the wallet disconnected.
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

impl SessionChange {
    pub fn is_disconnect(&self) -> bool {
        matches!(self, SessionChange::AccountsChanged(accounts) if accounts.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Observed {
    chain_id: u64,
    accounts: Vec<Address>,
}

/// Compare what the session was built on with what the node reports now.
fn detect_change(address: Address, chain_id: u64, observed: &Observed) -> Option<SessionChange> {
    if observed.chain_id != chain_id {
        return Some(SessionChange::ChainChanged(observed.chain_id));
    }
    if observed.accounts.first() != Some(&address) {
        return Some(SessionChange::AccountsChanged(observed.accounts.clone()));
    }
    None
}

/// Polls the node for account and network changes.
pub struct SessionMonitor {
    wallet: WalletConnection,
    interval: Interval,
}

impl SessionMonitor {
    pub fn new(wallet: WalletConnection, period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { wallet, interval }
    }

    /// Wait for the next change. Poll errors are returned to the caller.
    pub async fn changed(&mut self) -> Result<SessionChange, FundraiseError> {
        loop {
            self.interval.tick().await;
            let mut observed = self.wallet.observe().await?;
            // A pinned node account only has to stay in the list
            if let AccountSource::Node { from: Some(pinned) } = self.wallet.source {
                if observed.accounts.contains(&pinned) {
                    observed.accounts.retain(|a| *a == pinned);
                }
            }
            if let Some(change) =
                detect_change(self.wallet.address, self.wallet.chain_id, &observed)
            {
                info!(change = ?change, "session changed");
                return Ok(change);
            }
            debug!("session unchanged");
        }
    }
}
