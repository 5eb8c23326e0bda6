//! Display-ready rendering of a [`Campaign`] at a given instant.

use chrono::DateTime;
use serde::Serialize;

use crate::campaign::{Campaign, CampaignStatus, format_eth_fixed};
use crate::validation::trim_ether;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignCard {
    pub id: u64,
    pub title: String,
    pub creator: String,
    pub status: CampaignStatus,
    pub goal_eth: String,
    pub raised_eth: String,
    pub min_contribution_eth: String,
    pub deadline: String,
    /// `None` once the deadline has passed.
    pub days_left: Option<u64>,
    pub progress: f64,
    pub withdrawn: bool,
}

impl CampaignCard {
    pub fn at(campaign: &Campaign, now: u64) -> Self {
        let deadline = i64::try_from(campaign.deadline)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "never".to_string());

        Self {
            id: campaign.id,
            title: campaign.title.clone(),
            creator: campaign.creator.to_string(),
            status: campaign.status_at(now),
            goal_eth: trim_ether(campaign.goal),
            raised_eth: format_eth_fixed(campaign.raised, 4),
            min_contribution_eth: trim_ether(campaign.min_contribution),
            deadline,
            days_left: (!campaign.is_expired_at(now)).then(|| campaign.days_left_at(now)),
            progress: campaign.display_progress(),
            withdrawn: campaign.withdrawn,
        }
    }

    pub fn progress_text(&self) -> String {
        format!(
            "{:.2}% funded ({} / {} ETH)",
            self.progress, self.raised_eth, self.goal_eth
        )
    }

    pub fn time_left_text(&self) -> String {
        match self.days_left {
            Some(1) => "1 day left".to_string(),
            Some(days) => format!("{days} days left"),
            None => "Ended".to_string(),
        }
    }

    /// Everything a user can see on the card, lowercased for searching.
    pub fn search_text(&self) -> String {
        let mut text = format!(
            "#{} {} {} {} {} {} {} {}",
            self.id,
            self.title,
            self.creator,
            self.status,
            self.progress_text(),
            self.min_contribution_eth,
            self.deadline,
            self.time_left_text(),
        );
        if self.withdrawn {
            text.push_str(" withdrawn");
        }
        text.to_lowercase()
    }

    /// Case-insensitive substring match. An empty term matches everything.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty() || self.search_text().contains(&term)
    }
}

/// Keep the cards matching `term`, preserving order.
pub fn filter_cards(cards: Vec<CampaignCard>, term: &str) -> Vec<CampaignCard> {
    cards.into_iter().filter(|card| card.matches(term)).collect()
}
