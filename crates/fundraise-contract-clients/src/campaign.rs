use alloy::primitives::{Address, U256, utils::format_ether};
use serde::Serialize;
use std::fmt;

use crate::chain_fundraise::ChainFundraise::CampaignView;

/// Wei per ether.
const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// One campaign as read from `getCampaign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: u64,
    pub title: String,
    pub creator: Address,
    pub goal: U256,
    pub raised: U256,
    /// Unix seconds.
    pub deadline: u64,
    pub min_contribution: U256,
    pub withdrawn: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CampaignStatus {
    Active,
    Funded,
    FundedExpired,
    FailedExpired,
    Inactive,
}

impl CampaignStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "Active",
            CampaignStatus::Funded => "Funded",
            CampaignStatus::FundedExpired => "Funded (Expired)",
            CampaignStatus::FailedExpired => "Failed (Expired)",
            CampaignStatus::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Campaign {
    pub fn from_view(id: u64, view: CampaignView) -> Self {
        Self {
            id,
            title: view.title,
            creator: view.creator,
            goal: view.goal,
            raised: view.raised,
            // Deadlines past u64 are effectively "never"
            deadline: u64::try_from(view.deadline).unwrap_or(u64::MAX),
            min_contribution: view.minContribution,
            withdrawn: view.withdrawn,
            active: view.active,
        }
    }

    pub fn goal_reached(&self) -> bool {
        self.raised >= self.goal
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.deadline
    }

    pub fn status_at(&self, now: u64) -> CampaignStatus {
        if !self.active {
            return CampaignStatus::Inactive;
        }
        match (self.is_expired_at(now), self.goal_reached()) {
            (true, false) => CampaignStatus::FailedExpired,
            (true, true) => CampaignStatus::FundedExpired,
            (false, true) => CampaignStatus::Funded,
            (false, false) => CampaignStatus::Active,
        }
    }

    /// `raised / goal * 100`, unclamped. Zero when the goal is zero.
    pub fn progress_percent(&self) -> f64 {
        if self.goal.is_zero() {
            return 0.0;
        }
        // Fixed point with 4 decimals before converting to float
        let scaled = self.raised.saturating_mul(U256::from(1_000_000u64)) / self.goal;
        let scaled = u64::try_from(scaled).unwrap_or(u64::MAX);
        scaled as f64 / 10_000.0
    }

    /// Progress for rendering, clamped to `[0, 100]`.
    pub fn display_progress(&self) -> f64 {
        self.progress_percent().clamp(0.0, 100.0)
    }

    /// Whole days remaining, rounded up. Zero once expired.
    pub fn days_left_at(&self, now: u64) -> u64 {
        if self.is_expired_at(now) {
            return 0;
        }
        (self.deadline - now).div_ceil(24 * 60 * 60)
    }

    /// Refunds are blocked only while the campaign is funded and still running.
    pub fn refund_window_open_at(&self, now: u64) -> bool {
        !(self.goal_reached() && self.deadline > now)
    }
}

/// Newest campaign first.
pub fn sort_newest_first(campaigns: &mut [Campaign]) {
    campaigns.sort_by(|a, b| b.id.cmp(&a.id));
}

/// Ether with exactly `decimals` fractional digits, rounded half up.
pub fn format_eth_fixed(wei: U256, decimals: u32) -> String {
    let decimals = decimals.min(18);
    let unit = U256::from(10u64).pow(U256::from(18 - decimals));
    let rounded = (wei.saturating_add(unit / U256::from(2u64))) / unit;
    let scale = U256::from(10u64).pow(U256::from(decimals));
    let whole = rounded / scale;
    if decimals == 0 {
        return whole.to_string();
    }
    let frac = rounded % scale;
    format!("{whole}.{frac:0>width$}", width = decimals as usize)
}

/// Ether as alloy formats it, used where full precision matters.
pub fn format_eth(wei: U256) -> String {
    format_ether(wei)
}

/// Whole ether amount as wei, for tests and defaults.
pub fn eth_to_wei(eth: u64) -> U256 {
    U256::from(eth) * U256::from(WEI_PER_ETH)
}
