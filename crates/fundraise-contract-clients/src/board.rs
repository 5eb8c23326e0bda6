//! Read-through cache of every campaign, refreshed in full on invalidation.

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use crate::campaign::{Campaign, sort_newest_first};
use crate::error::FundraiseError;
use crate::ledger::CampaignLedger;

struct Snapshot {
    generation: u64,
    campaigns: Vec<Campaign>,
}

struct BoardInner {
    ledger: Arc<dyn CampaignLedger>,
    cache: Mutex<Option<Snapshot>>,
    generation: watch::Sender<u64>,
}

/// Campaign list shared by everything that renders campaigns.
///
/// [`CampaignBoard::invalidate`] is the only way to mark the list stale; the
/// next [`CampaignBoard::campaigns`] call re-reads every campaign.
#[derive(Clone)]
pub struct CampaignBoard {
    inner: Arc<BoardInner>,
}

impl CampaignBoard {
    pub fn new(ledger: Arc<dyn CampaignLedger>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            inner: Arc::new(BoardInner {
                ledger,
                cache: Mutex::new(None),
                generation,
            }),
        }
    }

    /// Mark the cached list stale and wake subscribers.
    pub fn invalidate(&self) {
        self.inner.generation.send_modify(|generation| *generation += 1);
    }

    /// Receiver that observes every invalidation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.generation.subscribe()
    }

    pub async fn is_stale(&self) -> bool {
        let current = *self.inner.generation.borrow();
        match self.inner.cache.lock().await.as_ref() {
            Some(snapshot) => snapshot.generation != current,
            None => true,
        }
    }

    /// Every campaign, newest first. Re-fetches when stale.
    pub async fn campaigns(&self) -> Result<Vec<Campaign>, FundraiseError> {
        let mut cache = self.inner.cache.lock().await;
        // Read before fetching so an invalidation during the fetch is not lost
        let generation = *self.inner.generation.borrow();
        if let Some(snapshot) = cache.as_ref().filter(|s| s.generation == generation) {
            return Ok(snapshot.campaigns.clone());
        }

        let campaigns = load_all(self.inner.ledger.as_ref()).await?;
        debug!(count = campaigns.len(), generation, "campaign board refreshed");
        *cache = Some(Snapshot {
            generation,
            campaigns: campaigns.clone(),
        });
        Ok(campaigns)
    }

    /// One campaign, from the cache when fresh, otherwise straight from the ledger.
    pub async fn campaign(&self, id: u64) -> Result<Campaign, FundraiseError> {
        let cache = self.inner.cache.lock().await;
        let generation = *self.inner.generation.borrow();
        let cached = cache
            .as_ref()
            .filter(|s| s.generation == generation)
            .and_then(|s| s.campaigns.iter().find(|c| c.id == id).cloned());
        if let Some(campaign) = cached {
            return Ok(campaign);
        }
        drop(cache);
        self.inner.ledger.campaign(id).await
    }
}

/// Read every campaign concurrently. Failed lookups are logged and skipped.
pub async fn load_all(ledger: &dyn CampaignLedger) -> Result<Vec<Campaign>, FundraiseError> {
    let count = ledger.campaign_count().await?;
    let results = join_all((0..count).map(|id| ledger.campaign(id))).await;

    let mut campaigns: Vec<Campaign> = results
        .into_iter()
        .zip(0..count)
        .filter_map(|(result, id)| match result {
            Ok(campaign) => Some(campaign),
            Err(e) => {
                warn!(campaign_id = id, error = %e, "failed to load campaign, skipping");
                None
            }
        })
        .collect();
    sort_newest_first(&mut campaigns);
    Ok(campaigns)
}
