//! Long-running mode: render the campaign list and keep it current.
//!
//! Contract events and periodic ticks invalidate the board; every
//! invalidation re-renders. An account or network change drops the whole
//! session and connects again from scratch.

use fundraise_contract_clients::{
    CampaignCard, FundraiseError, Orchestrator, Session, SessionChange,
};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::args::ClientConfig;
use crate::render;

/// Why a watched session ended.
#[derive(Debug, PartialEq, Eq)]
enum WatchExit {
    Shutdown,
    Disconnected,
    Reconnect(Option<SessionChange>),
}

/// Initial reconnection delay
const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
/// Maximum reconnection delay
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

fn next_reconnect_delay(current: Duration) -> Duration {
    std::cmp::min(current * 2, MAX_RECONNECT_DELAY)
}

/// Sleep for `delay` unless shutdown comes first. Returns true on shutdown.
async fn wait_before_reconnect(delay: Duration, shutdown_token: &CancellationToken) -> bool {
    info!(delay_secs = delay.as_secs(), "Waiting before reconnecting");
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown_token.cancelled() => true,
    }
}

pub async fn run_watch(
    config: &ClientConfig,
    refresh_secs: u64,
    poll_secs: u64,
    shutdown_token: CancellationToken,
) -> Result<(), FundraiseError> {
    // Event subscriptions need a pubsub transport
    let contract = config.contract.with_ws_transport();
    let refresh = Duration::from_secs(refresh_secs.max(1));
    let poll = Duration::from_secs(poll_secs.max(1));
    let mut reconnect_delay = INITIAL_RECONNECT_DELAY;
    let mut connected_once = false;

    info!("Press Ctrl+C to stop watching");
    loop {
        let connected = tokio::select! {
            session = Session::connect(contract.clone(), &config.account) => session,
            _ = shutdown_token.cancelled() => return Ok(()),
        };
        let session = match connected {
            Ok(session) => session,
            // Only the first connection failure is fatal
            Err(e) if !connected_once => return Err(e),
            Err(e) => {
                error!(error = %e, "Failed to reconnect. Retrying...");
                if wait_before_reconnect(reconnect_delay, &shutdown_token).await {
                    return Ok(());
                }
                reconnect_delay = next_reconnect_delay(reconnect_delay);
                continue;
            }
        };
        connected_once = true;

        match watch_session(config, &session, refresh, poll, &shutdown_token).await {
            WatchExit::Shutdown => {
                info!("Stopped watching");
                return Ok(());
            }
            WatchExit::Disconnected => {
                println!("Wallet disconnected");
                return Ok(());
            }
            WatchExit::Reconnect(Some(change)) => {
                warn!(change = ?change, "Session changed, reloading");
                reconnect_delay = INITIAL_RECONNECT_DELAY;
            }
            WatchExit::Reconnect(None) => {
                if wait_before_reconnect(reconnect_delay, &shutdown_token).await {
                    return Ok(());
                }
                reconnect_delay = next_reconnect_delay(reconnect_delay);
            }
        }
    }
}

/// How a session monitor result ends the session. Poll errors keep it running.
fn session_exit(change: Result<SessionChange, FundraiseError>) -> Option<WatchExit> {
    match change {
        Ok(change) if change.is_disconnect() => Some(WatchExit::Disconnected),
        Ok(change) => Some(WatchExit::Reconnect(Some(change))),
        Err(e) => {
            warn!(error = %e, "Failed to poll account and network, will retry");
            None
        }
    }
}

async fn watch_session(
    config: &ClientConfig,
    session: &Session,
    refresh: Duration,
    poll: Duration,
    shutdown_token: &CancellationToken,
) -> WatchExit {
    let orchestrator = session.orchestrator();
    let board = orchestrator.board().clone();
    let account = session.address();
    let mut board_changes = board.subscribe();

    let listener_board = board.clone();
    let client = session.client().clone();
    let mut listener = tokio::spawn(async move {
        client
            .listen_campaign_events(move |event| {
                let board = listener_board.clone();
                async move {
                    info!(
                        event = event.name(),
                        campaign_id = event.campaign_id(),
                        "contract event"
                    );
                    if let Some(notice) = event.notice_for(account) {
                        println!("✅ {notice}");
                    }
                    board.invalidate();
                    Ok(())
                }
            })
            .await
    });

    let mut monitor = session.monitor(poll);
    let mut ticker = tokio::time::interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    render_board(config, &orchestrator).await;

    let exit = loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => break WatchExit::Shutdown,
            result = &mut listener => {
                match result {
                    Ok(Ok(())) => warn!("Event subscription ended. Reconnecting..."),
                    Ok(Err(e)) => error!(error = %e, "Event listener failed. Reconnecting..."),
                    Err(e) => error!(error = %e, "Event listener task failed. Reconnecting..."),
                }
                break WatchExit::Reconnect(None);
            }
            change = monitor.changed() => {
                if let Some(exit) = session_exit(change) {
                    break exit;
                }
            }
            _ = ticker.tick() => board.invalidate(),
            changed = board_changes.changed() => {
                if changed.is_err() {
                    break WatchExit::Reconnect(None);
                }
                render_board(config, &orchestrator).await;
            }
        }
    };

    listener.abort();
    exit
}

async fn render_board(config: &ClientConfig, orchestrator: &Orchestrator) {
    let campaigns = match orchestrator.board().campaigns().await {
        Ok(campaigns) => campaigns,
        Err(e) => {
            error!(error = %e, "Failed to load campaigns");
            return;
        }
    };
    let now = orchestrator.now();
    let cards: Vec<CampaignCard> = campaigns
        .iter()
        .map(|campaign| CampaignCard::at(campaign, now))
        .collect();

    if config.json {
        match render::json(&cards) {
            Ok(json) => println!("{json}"),
            Err(e) => error!(error = %e, "Failed to serialize campaigns"),
        }
    } else if cards.is_empty() {
        println!("No campaigns yet.");
    } else {
        println!("{}", render::campaigns_table(&cards));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_delay_doubles_up_to_cap() {
        let mut delay = INITIAL_RECONNECT_DELAY;
        let mut seen = Vec::new();
        for _ in 0..8 {
            delay = next_reconnect_delay(delay);
            seen.push(delay.as_secs());
        }
        assert_eq!(seen, vec![2, 4, 8, 16, 32, 60, 60, 60]);
    }

    #[test]
    fn test_poll_error_keeps_session_running() {
        let err = FundraiseError::provider_unavailable("eth_chainId timed out");
        assert_eq!(session_exit(Err(err)), None);
    }

    #[test]
    fn test_session_changes_end_session() {
        assert_eq!(
            session_exit(Ok(SessionChange::AccountsChanged(vec![]))),
            Some(WatchExit::Disconnected)
        );
        assert_eq!(
            session_exit(Ok(SessionChange::ChainChanged(5))),
            Some(WatchExit::Reconnect(Some(SessionChange::ChainChanged(5))))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_before_reconnect_sleeps_full_delay() {
        let token = CancellationToken::new();
        let started = tokio::time::Instant::now();
        assert!(!wait_before_reconnect(Duration::from_secs(4), &token).await);
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_wait_before_reconnect_stops_on_shutdown() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(wait_before_reconnect(MAX_RECONNECT_DELAY, &token).await);
    }
}
