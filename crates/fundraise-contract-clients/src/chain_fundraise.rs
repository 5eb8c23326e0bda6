use crate::campaign::Campaign;
use crate::common::errors::StandardErrors::StandardErrorsErrors;
use crate::common::event_helper::{listen_events, listen_events_filtered};
use crate::common::tx_submitter::TransactionSubmitter;
use crate::error::{FundraiseError, classify_contract_error, classify_transport_error};
use crate::ledger::{CampaignLedger, TxOutcome};
use crate::validation::{CreateCampaign, trim_ether};
use alloy::{
    primitives::{Address, U256, utils::format_ether},
    providers::Provider,
    rpc::types::{Log, TransactionReceipt},
    sol,
};
use anyhow::anyhow;
use async_trait::async_trait;
use futures_util::{
    StreamExt,
    stream::{BoxStream, select_all},
};
use std::sync::Arc;
use tokio::sync::Mutex;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    contract ChainFundraise {
        struct CampaignView {
            string title;
            address creator;
            uint256 goal;
            uint256 raised;
            uint256 deadline;
            uint256 minContribution;
            bool withdrawn;
            bool active;
        }

        function createCampaign(string memory _title, uint256 _goal, uint256 _duration, uint256 _minContribution) public returns (uint256);
        function contribute(uint256 _campaignId) public payable;
        function getContribution(uint256 _campaignId, address _contributor) public view returns (uint256);
        function withdrawFunds(uint256 _campaignId) public;
        function claimRefund(uint256 _campaignId) public;
        function getCampaign(uint256 _campaignId) public view returns (CampaignView memory);
        function getCampaignCount() public view returns (uint256);

        event CampaignCreated(uint256 indexed campaignId, address indexed creator, string title, uint256 goal, uint256 deadline);
        event ContributionMade(uint256 indexed campaignId, address indexed contributor, uint256 amount);
        event FundsWithdrawn(uint256 indexed campaignId, address indexed creator, uint256 amount);
        event RefundClaimed(uint256 indexed campaignId, address indexed contributor, uint256 amount);
    }
}

use ChainFundraise::{
    CampaignCreated, ChainFundraiseInstance, ContributionMade, FundsWithdrawn, RefundClaimed,
};

/// Decoded event stream merged over all four contract events.
pub type CampaignEventStream =
    BoxStream<'static, Result<(CampaignEvent, Log), alloy::sol_types::Error>>;

/// Any of the events the contract emits, with ids narrowed to `u64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignEvent {
    CampaignCreated {
        campaign_id: u64,
        creator: Address,
        title: String,
        goal: U256,
        deadline: U256,
    },
    ContributionMade {
        campaign_id: u64,
        contributor: Address,
        amount: U256,
    },
    FundsWithdrawn {
        campaign_id: u64,
        creator: Address,
        amount: U256,
    },
    RefundClaimed {
        campaign_id: u64,
        contributor: Address,
        amount: U256,
    },
}

fn narrow_id(id: U256) -> u64 {
    u64::try_from(id).unwrap_or(u64::MAX)
}

impl From<CampaignCreated> for CampaignEvent {
    fn from(event: CampaignCreated) -> Self {
        CampaignEvent::CampaignCreated {
            campaign_id: narrow_id(event.campaignId),
            creator: event.creator,
            title: event.title,
            goal: event.goal,
            deadline: event.deadline,
        }
    }
}

impl From<ContributionMade> for CampaignEvent {
    fn from(event: ContributionMade) -> Self {
        CampaignEvent::ContributionMade {
            campaign_id: narrow_id(event.campaignId),
            contributor: event.contributor,
            amount: event.amount,
        }
    }
}

impl From<FundsWithdrawn> for CampaignEvent {
    fn from(event: FundsWithdrawn) -> Self {
        CampaignEvent::FundsWithdrawn {
            campaign_id: narrow_id(event.campaignId),
            creator: event.creator,
            amount: event.amount,
        }
    }
}

impl From<RefundClaimed> for CampaignEvent {
    fn from(event: RefundClaimed) -> Self {
        CampaignEvent::RefundClaimed {
            campaign_id: narrow_id(event.campaignId),
            contributor: event.contributor,
            amount: event.amount,
        }
    }
}

impl CampaignEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CampaignEvent::CampaignCreated { .. } => "CampaignCreated",
            CampaignEvent::ContributionMade { .. } => "ContributionMade",
            CampaignEvent::FundsWithdrawn { .. } => "FundsWithdrawn",
            CampaignEvent::RefundClaimed { .. } => "RefundClaimed",
        }
    }

    pub fn campaign_id(&self) -> u64 {
        match self {
            CampaignEvent::CampaignCreated { campaign_id, .. }
            | CampaignEvent::ContributionMade { campaign_id, .. }
            | CampaignEvent::FundsWithdrawn { campaign_id, .. }
            | CampaignEvent::RefundClaimed { campaign_id, .. } => *campaign_id,
        }
    }

    /// The account the event is about (creator or contributor).
    pub fn actor(&self) -> Address {
        match self {
            CampaignEvent::CampaignCreated { creator, .. }
            | CampaignEvent::FundsWithdrawn { creator, .. } => *creator,
            CampaignEvent::ContributionMade { contributor, .. }
            | CampaignEvent::RefundClaimed { contributor, .. } => *contributor,
        }
    }

    /// Success notice for `account`, if the event is one of its own actions.
    pub fn notice_for(&self, account: Address) -> Option<String> {
        if self.actor() != account {
            return None;
        }
        Some(match self {
            CampaignEvent::CampaignCreated {
                campaign_id, title, ..
            } => format!("Campaign \"{title}\" created successfully! ID: {campaign_id}"),
            CampaignEvent::ContributionMade {
                campaign_id,
                amount,
                ..
            } => format!(
                "Contribution of {} ETH made to campaign {campaign_id}",
                trim_ether(*amount)
            ),
            CampaignEvent::FundsWithdrawn {
                campaign_id,
                amount,
                ..
            } => format!(
                "Successfully withdrew {} ETH from campaign {campaign_id}",
                trim_ether(*amount)
            ),
            CampaignEvent::RefundClaimed {
                campaign_id,
                amount,
                ..
            } => format!(
                "Refund of {} ETH claimed from campaign {campaign_id}",
                trim_ether(*amount)
            ),
        })
    }
}

/// Id assigned by `createCampaign`, read from the `CampaignCreated` log that
/// `contract` emitted in the receipt.
pub fn campaign_created_id(receipt: &TransactionReceipt, contract: Address) -> Option<u64> {
    receipt
        .inner
        .logs()
        .iter()
        .filter(|log| log.address() == contract)
        .find_map(|log| log.log_decode::<CampaignCreated>().ok())
        .map(|created| narrow_id(created.inner.campaignId))
}

fn outcome(receipt: &TransactionReceipt, campaign_id: Option<u64>) -> TxOutcome {
    TxOutcome {
        tx_hash: receipt.transaction_hash,
        gas_used: receipt.gas_used,
        campaign_id,
    }
}

/// Client for the ChainFundraise contract.
#[derive(Clone)]
pub struct ChainFundraiseClient<P: Provider + Clone> {
    contract: ChainFundraiseInstance<P>,
    from: Address,
    submitter: TransactionSubmitter<StandardErrorsErrors>,
}

impl<P: Provider + Clone> ChainFundraiseClient<P> {
    /// Bind the contract at `address`; transactions are sent from `from`.
    pub fn new(provider: P, address: Address, from: Address, tx_lock: Arc<Mutex<()>>) -> Self {
        let contract = ChainFundraiseInstance::new(address, provider);
        let submitter = TransactionSubmitter::new(tx_lock);
        Self {
            contract,
            from,
            submitter,
        }
    }

    /// Get the contract address.
    pub fn address(&self) -> Address {
        *self.contract.address()
    }

    pub fn from_address(&self) -> Address {
        self.from
    }

    /// Probe the contract with `getCampaignCount`.
    ///
    /// Any failure means the address does not hold a usable ChainFundraise
    /// deployment on this network.
    pub async fn check_liveness(&self) -> Result<u64, FundraiseError> {
        self.get_campaign_count()
            .await
            .map_err(|e| FundraiseError::ContractUnreachable {
                address: self.address(),
                reason: e.to_string(),
            })
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn get_campaign_count(&self) -> Result<u64, FundraiseError> {
        let count = self
            .contract
            .getCampaignCount()
            .call()
            .await
            .map_err(|e| classify_contract_error("getCampaignCount", e))?;
        u64::try_from(count).map_err(|_| anyhow!("campaign count {count} does not fit in u64").into())
    }

    pub async fn get_campaign(&self, id: u64) -> Result<Campaign, FundraiseError> {
        let view = self
            .contract
            .getCampaign(U256::from(id))
            .call()
            .await
            .map_err(|e| classify_contract_error("getCampaign", e))?;
        Ok(Campaign::from_view(id, view))
    }

    pub async fn get_contribution(
        &self,
        id: u64,
        contributor: Address,
    ) -> Result<U256, FundraiseError> {
        self.contract
            .getContribution(U256::from(id), contributor)
            .call()
            .await
            .map_err(|e| classify_contract_error("getContribution", e))
    }

    // ------------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------------

    /// Create a campaign and return the id from the `CampaignCreated` log.
    pub async fn create_campaign(
        &self,
        title: String,
        goal: U256,
        duration_secs: u64,
        min_contribution: U256,
    ) -> Result<TxOutcome, FundraiseError> {
        let call = self
            .contract
            .createCampaign(title, goal, U256::from(duration_secs), min_contribution)
            .from(self.from);
        let receipt = self.submitter.invoke("createCampaign", call).await?;
        Ok(outcome(&receipt, campaign_created_id(&receipt, self.address())))
    }

    pub async fn contribute(&self, id: u64, amount: U256) -> Result<TxOutcome, FundraiseError> {
        let call = self
            .contract
            .contribute(U256::from(id))
            .from(self.from)
            .value(amount);
        tracing::debug!(campaign_id = id, amount_eth = %format_ether(amount), "contributing");
        let receipt = self.submitter.invoke("contribute", call).await?;
        Ok(outcome(&receipt, None))
    }

    pub async fn withdraw_funds(&self, id: u64) -> Result<TxOutcome, FundraiseError> {
        let call = self.contract.withdrawFunds(U256::from(id)).from(self.from);
        let receipt = self.submitter.invoke("withdrawFunds", call).await?;
        Ok(outcome(&receipt, None))
    }

    pub async fn claim_refund(&self, id: u64) -> Result<TxOutcome, FundraiseError> {
        let call = self.contract.claimRefund(U256::from(id)).from(self.from);
        let receipt = self.submitter.invoke("claimRefund", call).await?;
        Ok(outcome(&receipt, None))
    }

    // ------------------------------------------------------------------------
    // Real-time Event Streaming
    // ------------------------------------------------------------------------

    /// Subscribe to all four contract events as one stream.
    ///
    /// Requires a pubsub (WebSocket) provider.
    pub async fn campaign_events(&self) -> Result<CampaignEventStream, FundraiseError> {
        let created = self
            .contract
            .event_filter::<CampaignCreated>()
            .subscribe()
            .await
            .map_err(|e| classify_transport_error("subscribe", &e))?;
        let contributed = self
            .contract
            .event_filter::<ContributionMade>()
            .subscribe()
            .await
            .map_err(|e| classify_transport_error("subscribe", &e))?;
        let withdrawn = self
            .contract
            .event_filter::<FundsWithdrawn>()
            .subscribe()
            .await
            .map_err(|e| classify_transport_error("subscribe", &e))?;
        let refunded = self
            .contract
            .event_filter::<RefundClaimed>()
            .subscribe()
            .await
            .map_err(|e| classify_transport_error("subscribe", &e))?;

        let streams: Vec<CampaignEventStream> = vec![
            created
                .into_stream()
                .map(|item| item.map(|(event, log)| (CampaignEvent::from(event), log)))
                .boxed(),
            contributed
                .into_stream()
                .map(|item| item.map(|(event, log)| (CampaignEvent::from(event), log)))
                .boxed(),
            withdrawn
                .into_stream()
                .map(|item| item.map(|(event, log)| (CampaignEvent::from(event), log)))
                .boxed(),
            refunded
                .into_stream()
                .map(|item| item.map(|(event, log)| (CampaignEvent::from(event), log)))
                .boxed(),
        ];
        Ok(select_all(streams).boxed())
    }

    /// Process every contract event with `callback` until the subscription ends.
    pub async fn listen_campaign_events<F, Fut>(&self, callback: F) -> anyhow::Result<()>
    where
        F: FnMut(CampaignEvent) -> Fut + Send,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send,
    {
        let stream = self.campaign_events().await?;
        listen_events(stream, "ChainFundraise", callback).await
    }

    /// Process only the events touching `campaign_id`.
    pub async fn listen_campaign_events_for<F, Fut>(
        &self,
        campaign_id: u64,
        callback: F,
    ) -> anyhow::Result<()>
    where
        F: FnMut(CampaignEvent) -> Fut + Send,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send,
    {
        let stream = self.campaign_events().await?;
        listen_events_filtered(
            stream,
            "ChainFundraise",
            move |event: &CampaignEvent| event.campaign_id() == campaign_id,
            callback,
        )
        .await
    }
}

#[async_trait]
impl<P> CampaignLedger for ChainFundraiseClient<P>
where
    P: Provider + Clone + 'static,
{
    fn account(&self) -> Address {
        self.from
    }

    async fn campaign_count(&self) -> Result<u64, FundraiseError> {
        self.get_campaign_count().await
    }

    async fn campaign(&self, id: u64) -> Result<Campaign, FundraiseError> {
        self.get_campaign(id).await
    }

    async fn contribution(&self, id: u64, contributor: Address) -> Result<U256, FundraiseError> {
        self.get_contribution(id, contributor).await
    }

    async fn create_campaign(&self, request: &CreateCampaign) -> Result<TxOutcome, FundraiseError> {
        ChainFundraiseClient::create_campaign(
            self,
            request.title.clone(),
            request.goal,
            request.duration_secs,
            request.min_contribution,
        )
        .await
    }

    async fn contribute(&self, id: u64, amount: U256) -> Result<TxOutcome, FundraiseError> {
        ChainFundraiseClient::contribute(self, id, amount).await
    }

    async fn withdraw_funds(&self, id: u64) -> Result<TxOutcome, FundraiseError> {
        ChainFundraiseClient::withdraw_funds(self, id).await
    }

    async fn claim_refund(&self, id: u64) -> Result<TxOutcome, FundraiseError> {
        ChainFundraiseClient::claim_refund(self, id).await
    }
}
