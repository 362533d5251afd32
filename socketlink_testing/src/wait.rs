//! Polling helpers for asynchronous connector state.

use std::time::Duration;

use socketlink::{ConnectionId, Connector};

/// Poll `condition` until it holds.
///
/// # Panics
///
/// Panics if `condition` does not hold within five seconds.
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met within five seconds");
}

/// Wait until the hub has assigned a connection id to `connector`.
///
/// # Panics
///
/// Panics if no id is assigned within five seconds.
pub async fn wait_for_connection_id(connector: &Connector) -> ConnectionId {
    let mut ids = connector.subscribe_connection_id();
    let id = tokio::time::timeout(
        Duration::from_secs(5),
        ids.wait_for(Option::is_some),
    )
    .await
    .expect("no connection id assigned within five seconds")
    .expect("connector dropped")
    .clone();
    id.expect("wait_for only returns assigned ids")
}
