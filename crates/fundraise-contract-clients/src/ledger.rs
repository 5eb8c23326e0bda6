use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::campaign::Campaign;
use crate::error::FundraiseError;
use crate::validation::CreateCampaign;

/// Result of a confirmed state-changing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub gas_used: u64,
    /// Set by `createCampaign` when the `CampaignCreated` log was found.
    pub campaign_id: Option<u64>,
}

/// The campaign contract as seen by the orchestrator and the board.
///
/// [`crate::ChainFundraiseClient`] is the on-chain implementation.
#[async_trait]
pub trait CampaignLedger: Send + Sync {
    /// Account that signs state-changing calls.
    fn account(&self) -> Address;

    async fn campaign_count(&self) -> Result<u64, FundraiseError>;

    async fn campaign(&self, id: u64) -> Result<Campaign, FundraiseError>;

    async fn contribution(&self, id: u64, contributor: Address) -> Result<U256, FundraiseError>;

    async fn create_campaign(&self, request: &CreateCampaign) -> Result<TxOutcome, FundraiseError>;

    async fn contribute(&self, id: u64, amount: U256) -> Result<TxOutcome, FundraiseError>;

    async fn withdraw_funds(&self, id: u64) -> Result<TxOutcome, FundraiseError>;

    async fn claim_refund(&self, id: u64) -> Result<TxOutcome, FundraiseError>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory ledger that records submitted calls.

    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Submitted {
        Create(CreateCampaign),
        Contribute(u64, U256),
        Withdraw(u64),
        Refund(u64),
    }

    #[derive(Default)]
    pub(crate) struct MockLedger {
        pub(crate) account: Address,
        pub(crate) campaigns: Mutex<BTreeMap<u64, Campaign>>,
        pub(crate) contributions: Mutex<BTreeMap<(u64, Address), U256>>,
        pub(crate) failing_reads: Mutex<HashSet<u64>>,
        pub(crate) submitted: Mutex<Vec<Submitted>>,
        pub(crate) reads: Mutex<u64>,
        /// Revert reason returned by every submission when set.
        pub(crate) revert_with: Mutex<Option<String>>,
    }

    impl MockLedger {
        pub(crate) fn with_campaigns(account: Address, campaigns: Vec<Campaign>) -> Self {
            let ledger = Self {
                account,
                ..Default::default()
            };
            {
                let mut map = ledger.campaigns.lock().unwrap();
                for campaign in campaigns {
                    map.insert(campaign.id, campaign);
                }
            }
            ledger
        }

        pub(crate) fn submitted(&self) -> Vec<Submitted> {
            self.submitted.lock().unwrap().clone()
        }

        pub(crate) fn reads(&self) -> u64 {
            *self.reads.lock().unwrap()
        }

        fn outcome(&self, call: Submitted) -> Result<TxOutcome, FundraiseError> {
            if let Some(reason) = self.revert_with.lock().unwrap().clone() {
                return Err(FundraiseError::reverted("mock", reason));
            }
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(call);
            Ok(TxOutcome {
                tx_hash: B256::with_last_byte(submitted.len() as u8),
                gas_used: 21_000,
                campaign_id: None,
            })
        }
    }

    #[async_trait]
    impl CampaignLedger for MockLedger {
        fn account(&self) -> Address {
            self.account
        }

        async fn campaign_count(&self) -> Result<u64, FundraiseError> {
            let campaigns = self.campaigns.lock().unwrap();
            Ok(campaigns.keys().next_back().map_or(0, |id| id + 1))
        }

        async fn campaign(&self, id: u64) -> Result<Campaign, FundraiseError> {
            *self.reads.lock().unwrap() += 1;
            if self.failing_reads.lock().unwrap().contains(&id) {
                return Err(FundraiseError::reverted("getCampaign", "node hiccup"));
            }
            self.campaigns
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| FundraiseError::reverted("getCampaign", "Campaign does not exist"))
        }

        async fn contribution(&self, id: u64, contributor: Address) -> Result<U256, FundraiseError> {
            Ok(self
                .contributions
                .lock()
                .unwrap()
                .get(&(id, contributor))
                .copied()
                .unwrap_or_default())
        }

        async fn create_campaign(
            &self,
            request: &CreateCampaign,
        ) -> Result<TxOutcome, FundraiseError> {
            let id = self.campaign_count().await?;
            let mut outcome = self.outcome(Submitted::Create(request.clone()))?;
            outcome.campaign_id = Some(id);
            Ok(outcome)
        }

        async fn contribute(&self, id: u64, amount: U256) -> Result<TxOutcome, FundraiseError> {
            self.outcome(Submitted::Contribute(id, amount))
        }

        async fn withdraw_funds(&self, id: u64) -> Result<TxOutcome, FundraiseError> {
            self.outcome(Submitted::Withdraw(id))
        }

        async fn claim_refund(&self, id: u64) -> Result<TxOutcome, FundraiseError> {
            self.outcome(Submitted::Refund(id))
        }
    }
}
