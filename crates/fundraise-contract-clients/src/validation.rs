//! Client-side checks run before anything is sent to the chain.
//!
//! These mirror the contract's own `require`s so obvious mistakes fail fast
//! with a readable message; the contract remains the authority.

use alloy::primitives::{
    Address, U256,
    utils::{format_ether, parse_ether},
};

use crate::campaign::Campaign;

/// Shortest accepted campaign title, after trimming.
pub const MIN_TITLE_LEN: usize = 3;

/// Goal / minimum contribution below which a hint is shown (0.001 ETH).
pub const HINT_THRESHOLD_WEI: U256 = U256::from_limbs([1_000_000_000_000_000, 0, 0, 0]);

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title must be at least {MIN_TITLE_LEN} characters")]
    TitleTooShort,
    #[error("funding goal must be greater than zero")]
    InvalidGoal,
    #[error("duration must be greater than zero")]
    InvalidDuration,
    #[error("minimum contribution must be greater than zero")]
    InvalidMinContribution,
    #[error("minimum contribution cannot exceed the funding goal")]
    MinContributionAboveGoal,
    #[error("'{input}' is not a valid ETH amount")]
    MalformedAmount { input: String },
    #[error("contribution amount must be greater than zero")]
    InvalidAmount,
    #[error("campaign {0} is not active")]
    CampaignInactive(u64),
    #[error("campaign {0} deadline has passed")]
    DeadlinePassed(u64),
    #[error("Minimum contribution is {minimum} ETH")]
    BelowMinimum { minimum: String },
    #[error("only the campaign creator ({creator}) can withdraw funds")]
    NotCreator { creator: Address },
    #[error("funds for campaign {0} have already been withdrawn")]
    AlreadyWithdrawn(u64),
    #[error("campaign {0} has not reached its funding goal")]
    GoalNotReached(u64),
    #[error("{contributor} has no recorded contribution to campaign {id}")]
    NoContribution { id: u64, contributor: Address },
    #[error("campaign {0} is funded and still running, refunds are not available")]
    RefundUnavailable(u64),
}

/// Arguments of `createCampaign`, amounts in wei.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCampaign {
    pub title: String,
    pub goal: U256,
    pub duration_secs: u64,
    pub min_contribution: U256,
}

impl CreateCampaign {
    /// Build from user-facing units: ETH strings and a duration in days.
    pub fn from_user_input(
        title: &str,
        goal_eth: &str,
        duration_days: u64,
        min_contribution_eth: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            title: title.trim().to_string(),
            goal: parse_eth_amount(goal_eth)?,
            duration_secs: duration_days.saturating_mul(SECONDS_PER_DAY),
            min_contribution: parse_eth_amount(min_contribution_eth)?,
        })
    }

    /// Check the request and return it with a trimmed title.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let title = self.title.trim().to_string();
        if title.chars().count() < MIN_TITLE_LEN {
            return Err(ValidationError::TitleTooShort);
        }
        if self.goal.is_zero() {
            return Err(ValidationError::InvalidGoal);
        }
        if self.duration_secs == 0 {
            return Err(ValidationError::InvalidDuration);
        }
        if self.min_contribution.is_zero() {
            return Err(ValidationError::InvalidMinContribution);
        }
        if self.min_contribution > self.goal {
            return Err(ValidationError::MinContributionAboveGoal);
        }
        Ok(Self { title, ..self })
    }

    /// Non-blocking advice shown while filling in a campaign.
    pub fn hints(&self) -> Vec<String> {
        let mut hints = Vec::new();
        if !self.goal.is_zero() && self.goal < HINT_THRESHOLD_WEI {
            hints.push("funding goals below 0.001 ETH are unusually small".to_string());
        }
        if !self.min_contribution.is_zero() && self.min_contribution < HINT_THRESHOLD_WEI {
            hints.push("minimum contribution should be at least 0.001 ETH".to_string());
        }
        hints
    }
}

/// Parse a decimal ETH amount ("0.5", "10") into wei.
pub fn parse_eth_amount(input: &str) -> Result<U256, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(ValidationError::MalformedAmount {
            input: input.to_string(),
        });
    }
    parse_ether(trimmed).map_err(|_| ValidationError::MalformedAmount {
        input: input.to_string(),
    })
}

/// Checks before `contribute`: positive amount, open campaign, minimum met.
pub fn validate_contribution(
    campaign: &Campaign,
    amount: U256,
    now: u64,
) -> Result<(), ValidationError> {
    if amount.is_zero() {
        return Err(ValidationError::InvalidAmount);
    }
    if !campaign.active {
        return Err(ValidationError::CampaignInactive(campaign.id));
    }
    if campaign.deadline < now {
        return Err(ValidationError::DeadlinePassed(campaign.id));
    }
    if amount < campaign.min_contribution {
        return Err(ValidationError::BelowMinimum {
            minimum: trim_ether(campaign.min_contribution),
        });
    }
    Ok(())
}

/// Checks before `withdrawFunds`: caller is the creator, goal met, not yet withdrawn.
pub fn validate_withdrawal(campaign: &Campaign, caller: Address) -> Result<(), ValidationError> {
    if campaign.creator != caller {
        return Err(ValidationError::NotCreator {
            creator: campaign.creator,
        });
    }
    if campaign.withdrawn {
        return Err(ValidationError::AlreadyWithdrawn(campaign.id));
    }
    if !campaign.goal_reached() {
        return Err(ValidationError::GoalNotReached(campaign.id));
    }
    Ok(())
}

/// Checks before `claimRefund`: the caller contributed, and the campaign is
/// not both funded and still running.
pub fn validate_refund(
    campaign: &Campaign,
    caller: Address,
    contribution: U256,
    now: u64,
) -> Result<(), ValidationError> {
    if contribution.is_zero() {
        return Err(ValidationError::NoContribution {
            id: campaign.id,
            contributor: caller,
        });
    }
    if !campaign.refund_window_open_at(now) {
        return Err(ValidationError::RefundUnavailable(campaign.id));
    }
    Ok(())
}

/// Ether amount without trailing zeros ("0.010000" -> "0.01", "5.0" -> "5").
pub fn trim_ether(wei: U256) -> String {
    let formatted = format_ether(wei);
    if !formatted.contains('.') {
        return formatted;
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::tests::{campaign, eth};

    const NOW: u64 = 1_700_000_000;

    fn request(title: &str, goal: &str, days: u64, min: &str) -> CreateCampaign {
        CreateCampaign::from_user_input(title, goal, days, min).unwrap()
    }

    #[test]
    fn test_create_accepts_valid_input_and_trims_title() {
        let validated = request("  Solar roof  ", "10", 30, "0.1").validated().unwrap();
        assert_eq!(validated.title, "Solar roof");
        assert_eq!(validated.goal, eth(10));
        assert_eq!(validated.duration_secs, 30 * SECONDS_PER_DAY);
    }

    #[test]
    fn test_create_rejects_short_title() {
        assert_eq!(
            request(" ab ", "1", 1, "0.1").validated(),
            Err(ValidationError::TitleTooShort)
        );
    }

    #[test]
    fn test_create_rejects_zero_values() {
        assert_eq!(
            request("Roof", "0", 1, "0.1").validated(),
            Err(ValidationError::InvalidGoal)
        );
        assert_eq!(
            request("Roof", "1", 0, "0.1").validated(),
            Err(ValidationError::InvalidDuration)
        );
        assert_eq!(
            request("Roof", "1", 1, "0").validated(),
            Err(ValidationError::InvalidMinContribution)
        );
    }

    #[test]
    fn test_create_rejects_min_contribution_above_goal() {
        assert_eq!(
            request("Roof", "1", 7, "1.5").validated(),
            Err(ValidationError::MinContributionAboveGoal)
        );
        // Equal is fine
        assert!(request("Roof", "1", 7, "1").validated().is_ok());
    }

    #[test]
    fn test_parse_eth_amount() {
        assert_eq!(parse_eth_amount("1.5").unwrap(), U256::from(1_500_000_000_000_000_000u128));
        assert!(matches!(
            parse_eth_amount("-1"),
            Err(ValidationError::MalformedAmount { .. })
        ));
        assert!(parse_eth_amount("abc").is_err());
        assert!(parse_eth_amount("   ").is_err());
    }

    #[test]
    fn test_hints_for_tiny_amounts() {
        let hints = request("Roof", "0.0005", 1, "0.0001").hints();
        assert_eq!(hints.len(), 2);
        assert!(request("Roof", "1", 1, "0.01").hints().is_empty());
    }

    #[test]
    fn test_contribution_below_minimum_reports_eth() {
        let mut c = campaign(1, eth(10), eth(0), NOW + 100);
        c.min_contribution = U256::from(10_000_000_000_000_000u128); // 0.01 ETH
        let err = validate_contribution(&c, U256::from(1_000_000_000_000_000u128), NOW).unwrap_err();
        assert_eq!(err.to_string(), "Minimum contribution is 0.01 ETH");
    }

    #[test]
    fn test_contribution_checks_state() {
        let mut c = campaign(4, eth(10), eth(0), NOW + 100);
        assert_eq!(
            validate_contribution(&c, U256::ZERO, NOW),
            Err(ValidationError::InvalidAmount)
        );
        assert!(validate_contribution(&c, eth(1), NOW).is_ok());
        // The deadline second itself is still open
        assert!(validate_contribution(&c, eth(1), NOW + 100).is_ok());
        assert_eq!(
            validate_contribution(&c, eth(1), NOW + 101),
            Err(ValidationError::DeadlinePassed(4))
        );
        c.active = false;
        assert_eq!(
            validate_contribution(&c, eth(1), NOW),
            Err(ValidationError::CampaignInactive(4))
        );
    }

    #[test]
    fn test_withdrawal_rules() {
        let creator = Address::repeat_byte(0xaa);
        let stranger = Address::repeat_byte(0xbb);
        let mut c = campaign(2, eth(10), eth(10), NOW - 1);
        c.creator = creator;

        assert!(validate_withdrawal(&c, creator).is_ok());
        assert_eq!(
            validate_withdrawal(&c, stranger),
            Err(ValidationError::NotCreator { creator })
        );

        c.raised = eth(9);
        assert_eq!(
            validate_withdrawal(&c, creator),
            Err(ValidationError::GoalNotReached(2))
        );

        c.raised = eth(12);
        c.withdrawn = true;
        assert_eq!(
            validate_withdrawal(&c, creator),
            Err(ValidationError::AlreadyWithdrawn(2))
        );
    }

    #[test]
    fn test_refund_rules() {
        let caller = Address::repeat_byte(0x11);
        // Failed and expired: refund allowed for contributors
        let failed = campaign(3, eth(10), eth(4), NOW - 1);
        assert!(validate_refund(&failed, caller, eth(1), NOW).is_ok());
        assert!(matches!(
            validate_refund(&failed, caller, U256::ZERO, NOW),
            Err(ValidationError::NoContribution { id: 3, .. })
        ));

        // Underfunded but running: allowed
        let running = campaign(5, eth(10), eth(4), NOW + 1_000);
        assert!(validate_refund(&running, caller, eth(1), NOW).is_ok());

        // Funded and running: blocked
        let funded = campaign(6, eth(10), eth(10), NOW + 1_000);
        assert_eq!(
            validate_refund(&funded, caller, eth(1), NOW),
            Err(ValidationError::RefundUnavailable(6))
        );
    }

    #[test]
    fn test_trim_ether() {
        assert_eq!(trim_ether(eth(5)), "5");
        assert_eq!(trim_ether(U256::from(10_000_000_000_000_000u128)), "0.01");
        assert_eq!(trim_ether(U256::ZERO), "0");
    }
}
