//! Validated state-changing calls.
//!
//! Every operation runs the same pipeline: client-side validation (read
//! calls only), then submission through the ledger, which simulates,
//! estimates gas with a 10% buffer and waits for one confirmation. A
//! confirmed call invalidates the campaign board. Nothing is retried.

use alloy::primitives::{Address, U256};
use std::sync::Arc;
use tracing::{info, warn};

use crate::board::CampaignBoard;
use crate::error::FundraiseError;
use crate::ledger::{CampaignLedger, TxOutcome};
use crate::validation::{
    CreateCampaign, ValidationError, validate_contribution, validate_refund, validate_withdrawal,
};

/// Source of "now" in unix seconds.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Wall clock in unix seconds.
pub fn system_clock() -> Clock {
    Arc::new(|| u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default())
}

#[derive(Clone)]
pub struct Orchestrator {
    ledger: Arc<dyn CampaignLedger>,
    board: CampaignBoard,
    clock: Clock,
}

impl Orchestrator {
    pub fn new(ledger: Arc<dyn CampaignLedger>, board: CampaignBoard) -> Self {
        Self::with_clock(ledger, board, system_clock())
    }

    pub fn with_clock(ledger: Arc<dyn CampaignLedger>, board: CampaignBoard, clock: Clock) -> Self {
        Self {
            ledger,
            board,
            clock,
        }
    }

    pub fn board(&self) -> &CampaignBoard {
        &self.board
    }

    pub fn account(&self) -> Address {
        self.ledger.account()
    }

    pub fn now(&self) -> u64 {
        (self.clock)()
    }

    /// Create a campaign. The outcome carries the new id when the
    /// `CampaignCreated` log was found in the receipt.
    pub async fn create_campaign(
        &self,
        request: CreateCampaign,
    ) -> Result<TxOutcome, FundraiseError> {
        info!(stage = "validating", method = "createCampaign", title = %request.title);
        let request = request.validated()?;

        let outcome = self.ledger.create_campaign(&request).await?;
        match outcome.campaign_id {
            Some(id) => info!(
                stage = "confirmed",
                tx_hash = ?outcome.tx_hash,
                campaign_id = id,
                "✅ campaign created"
            ),
            None => warn!(
                tx_hash = ?outcome.tx_hash,
                "campaign created but no CampaignCreated event was found in the receipt"
            ),
        }
        self.board.invalidate();
        Ok(outcome)
    }

    pub async fn contribute(&self, id: u64, amount: U256) -> Result<TxOutcome, FundraiseError> {
        info!(stage = "validating", method = "contribute", campaign_id = id);
        // Checked before any read
        if amount.is_zero() {
            return Err(ValidationError::InvalidAmount.into());
        }
        let campaign = self.ledger.campaign(id).await?;
        validate_contribution(&campaign, amount, self.now())?;

        let outcome = self.ledger.contribute(id, amount).await?;
        self.confirmed("contribute", id, &outcome);
        Ok(outcome)
    }

    pub async fn withdraw_funds(&self, id: u64) -> Result<TxOutcome, FundraiseError> {
        info!(stage = "validating", method = "withdrawFunds", campaign_id = id);
        let campaign = self.ledger.campaign(id).await?;
        validate_withdrawal(&campaign, self.account())?;

        let outcome = self.ledger.withdraw_funds(id).await?;
        self.confirmed("withdrawFunds", id, &outcome);
        Ok(outcome)
    }

    pub async fn claim_refund(&self, id: u64) -> Result<TxOutcome, FundraiseError> {
        info!(stage = "validating", method = "claimRefund", campaign_id = id);
        let account = self.account();
        let campaign = self.ledger.campaign(id).await?;
        let contribution = self.ledger.contribution(id, account).await?;
        validate_refund(&campaign, account, contribution, self.now())?;

        let outcome = self.ledger.claim_refund(id).await?;
        self.confirmed("claimRefund", id, &outcome);
        Ok(outcome)
    }

    /// Number of campaigns on the contract, without reading any of them.
    pub async fn campaign_count(&self) -> Result<u64, FundraiseError> {
        self.ledger.campaign_count().await
    }

    /// Amount `contributor` (default: the session account) has put into `id`.
    pub async fn contribution_of(
        &self,
        id: u64,
        contributor: Option<Address>,
    ) -> Result<U256, FundraiseError> {
        let contributor = contributor.unwrap_or_else(|| self.account());
        self.ledger.contribution(id, contributor).await
    }

    fn confirmed(&self, method: &str, id: u64, outcome: &TxOutcome) {
        info!(
            stage = "confirmed",
            method = %method,
            campaign_id = id,
            tx_hash = ?outcome.tx_hash,
            gas_used = outcome.gas_used,
            "✅ transaction confirmed"
        );
        self.board.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::tests::{campaign, eth};
    use crate::ledger::mock::{MockLedger, Submitted};
    use crate::validation::SECONDS_PER_DAY;
    use alloy::primitives::address;

    const NOW: u64 = 1_700_000_000;
    const ME: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");

    fn setup(ledger: MockLedger) -> (Arc<MockLedger>, Orchestrator) {
        let ledger = Arc::new(ledger);
        let board = CampaignBoard::new(ledger.clone());
        let orchestrator = Orchestrator::with_clock(ledger.clone(), board, Arc::new(|| NOW));
        (ledger, orchestrator)
    }

    fn request(goal: U256, min: U256) -> CreateCampaign {
        CreateCampaign {
            title: "Solar roof".to_string(),
            goal,
            duration_secs: 7 * SECONDS_PER_DAY,
            min_contribution: min,
        }
    }

    #[tokio::test]
    async fn test_create_returns_new_id_and_invalidates() {
        let (ledger, orchestrator) = setup(MockLedger::with_campaigns(
            ME,
            vec![campaign(0, eth(1), U256::ZERO, NOW + 10)],
        ));
        let changes = orchestrator.board().subscribe();

        let outcome = orchestrator
            .create_campaign(request(eth(10), eth(1)))
            .await
            .unwrap();

        assert_eq!(outcome.campaign_id, Some(1));
        assert_eq!(ledger.submitted(), vec![Submitted::Create(request(eth(10), eth(1)))]);
        assert!(changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_campaign_count_skips_campaign_reads() {
        let (ledger, orchestrator) = setup(MockLedger::with_campaigns(
            ME,
            vec![
                campaign(0, eth(10), U256::ZERO, NOW + 100),
                campaign(1, eth(10), U256::ZERO, NOW + 100),
                campaign(2, eth(10), U256::ZERO, NOW + 100),
            ],
        ));
        ledger.failing_reads.lock().unwrap().insert(1);

        assert_eq!(orchestrator.campaign_count().await.unwrap(), 3);
        assert_eq!(ledger.reads(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_min_above_goal_without_network() {
        let (ledger, orchestrator) = setup(MockLedger::with_campaigns(ME, vec![]));
        let err = orchestrator
            .create_campaign(request(eth(1), eth(2)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FundraiseError::Validation(ValidationError::MinContributionAboveGoal)
        ));
        assert!(ledger.submitted().is_empty());
        assert_eq!(ledger.reads(), 0);
    }

    #[tokio::test]
    async fn test_contribute_below_minimum_sends_nothing() {
        let mut c = campaign(0, eth(10), U256::ZERO, NOW + 100);
        c.min_contribution = eth(1);
        let (ledger, orchestrator) = setup(MockLedger::with_campaigns(ME, vec![c]));

        let err = orchestrator
            .contribute(0, U256::from(100_000_000_000_000_000u128))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Minimum contribution is 1 ETH");
        assert!(ledger.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_zero_contribution_rejected_before_reads() {
        let (ledger, orchestrator) = setup(MockLedger::with_campaigns(
            ME,
            vec![campaign(0, eth(10), U256::ZERO, NOW + 100)],
        ));
        let err = orchestrator.contribute(0, U256::ZERO).await.unwrap_err();
        assert!(matches!(
            err,
            FundraiseError::Validation(ValidationError::InvalidAmount)
        ));
        assert_eq!(ledger.reads(), 0);
    }

    #[tokio::test]
    async fn test_contribute_submits_and_invalidates() {
        let (ledger, orchestrator) = setup(MockLedger::with_campaigns(
            ME,
            vec![campaign(0, eth(10), U256::ZERO, NOW + 100)],
        ));
        orchestrator.board().campaigns().await.unwrap();
        assert!(!orchestrator.board().is_stale().await);

        orchestrator.contribute(0, eth(2)).await.unwrap();

        assert_eq!(ledger.submitted(), vec![Submitted::Contribute(0, eth(2))]);
        assert!(orchestrator.board().is_stale().await);
    }

    #[tokio::test]
    async fn test_revert_leaves_board_fresh() {
        let ledger = MockLedger::with_campaigns(
            ME,
            vec![campaign(0, eth(10), U256::ZERO, NOW + 100)],
        );
        *ledger.revert_with.lock().unwrap() = Some("Campaign has ended".to_string());
        let (_, orchestrator) = setup(ledger);
        orchestrator.board().campaigns().await.unwrap();

        let err = orchestrator.contribute(0, eth(1)).await.unwrap_err();
        assert_eq!(err.kind(), "transaction_reverted");
        assert!(!orchestrator.board().is_stale().await);
    }

    #[tokio::test]
    async fn test_withdraw_requires_creator() {
        let mut c = campaign(0, eth(10), eth(10), NOW - 1);
        c.creator = Address::repeat_byte(0xbb);
        let (ledger, orchestrator) = setup(MockLedger::with_campaigns(ME, vec![c.clone()]));

        let err = orchestrator.withdraw_funds(0).await.unwrap_err();
        assert!(matches!(
            err,
            FundraiseError::Validation(ValidationError::NotCreator { .. })
        ));

        c.creator = ME;
        let (ledger2, orchestrator) = setup(MockLedger::with_campaigns(ME, vec![c]));
        orchestrator.withdraw_funds(0).await.unwrap();
        assert!(ledger.submitted().is_empty());
        assert_eq!(ledger2.submitted(), vec![Submitted::Withdraw(0)]);
    }

    #[tokio::test]
    async fn test_refund_for_failed_campaign() {
        let ledger = MockLedger::with_campaigns(ME, vec![campaign(0, eth(10), eth(4), NOW - 1)]);
        ledger
            .contributions
            .lock()
            .unwrap()
            .insert((0, ME), eth(4));
        let (ledger, orchestrator) = setup(ledger);

        orchestrator.claim_refund(0).await.unwrap();
        assert_eq!(ledger.submitted(), vec![Submitted::Refund(0)]);
        assert_eq!(orchestrator.contribution_of(0, None).await.unwrap(), eth(4));
    }

    #[tokio::test]
    async fn test_refund_without_contribution_rejected() {
        let (ledger, orchestrator) = setup(MockLedger::with_campaigns(
            ME,
            vec![campaign(0, eth(10), eth(4), NOW - 1)],
        ));
        let err = orchestrator.claim_refund(0).await.unwrap_err();
        assert!(matches!(
            err,
            FundraiseError::Validation(ValidationError::NoContribution { id: 0, .. })
        ));
        assert!(ledger.submitted().is_empty());
    }
}
