//! # Event Helper
//!
//! Drives contract event subscriptions: iterates the stream, hands each
//! decoded event to a callback and logs failures without ending the loop.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::common::event_helper::listen_events;
//!
//! let stream = client.campaign_events().await?;
//! listen_events(stream, "ChainFundraise", |event| async move {
//!     println!("{event:?}");
//!     Ok(())
//! })
//! .await?;
//! ```

use anyhow::Result;
use futures_util::StreamExt;
use tracing::error;

/// Listen to events, processing only those accepted by `predicate`.
///
/// Returns once the stream ends (subscription dropped by the node).
///
/// # Arguments
///
/// * `stream` - The event stream to listen to
/// * `event_name` - Name of the event for logging purposes
/// * `predicate` - Function that returns true if the event should be processed
/// * `callback` - Async function to process each matching event
pub async fn listen_events_filtered<E, Err, L, P, F, Fut>(
    mut stream: L,
    event_name: &str,
    predicate: P,
    mut callback: F,
) -> Result<()>
where
    E: Send,
    Err: std::fmt::Display,
    L: StreamExt<Item = Result<(E, alloy::rpc::types::Log), Err>> + Unpin + Send,
    P: Fn(&E) -> bool + Send,
    F: FnMut(E) -> Fut + Send,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    while let Some(event_result) = stream.next().await {
        match event_result {
            Ok((event, _log)) => {
                if predicate(&event) {
                    if let Err(e) = callback(event).await {
                        error!("Error processing {} event: {}", event_name, e);
                    }
                }
            }
            Err(e) => {
                error!("Error receiving {} event: {}", event_name, e);
            }
        }
    }
    Ok(())
}

/// Listen to every event of a stream. See [`listen_events_filtered`].
pub async fn listen_events<E, Err, L, F, Fut>(
    stream: L,
    event_name: &str,
    callback: F,
) -> Result<()>
where
    E: Send,
    Err: std::fmt::Display,
    L: StreamExt<Item = Result<(E, alloy::rpc::types::Log), Err>> + Unpin + Send,
    F: FnMut(E) -> Fut + Send,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    listen_events_filtered(stream, event_name, |_| true, callback).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::rpc::types::Log;
    use futures_util::stream;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_listen_events_skips_errors_and_filtered() {
        let items: Vec<Result<(u64, Log), String>> = vec![
            Ok((1, Log::default())),
            Err("decode failure".to_string()),
            Ok((2, Log::default())),
            Ok((3, Log::default())),
        ];
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        listen_events_filtered(
            stream::iter(items),
            "Test",
            |value| *value != 2,
            move |value| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(value);
                    Ok(())
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_callback_error_does_not_stop_listener() {
        let items: Vec<Result<(u64, Log), String>> =
            vec![Ok((1, Log::default())), Ok((2, Log::default()))];
        let count = Arc::new(Mutex::new(0));
        let counter = count.clone();

        listen_events(stream::iter(items), "Test", move |_| {
            let counter = counter.clone();
            async move {
                *counter.lock().unwrap() += 1;
                Err::<(), _>(anyhow::anyhow!("callback failed"))
            }
        })
        .await
        .unwrap();

        assert_eq!(*count.lock().unwrap(), 2);
    }
}
