//! Readiness coordinator: polling waits for targets that render late.
//!
//! The page the guide just navigated to may render its targets
//! asynchronously. Both waits poll the host until a condition holds or their
//! ceiling elapses, and report a plain found/not-found. Neither ever errors.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::host::{ElementInfo, Host, ReadyState};

/// Poll until `selector` matches or `timeout` elapses.
pub async fn wait_for_element(
    host: &dyn Host,
    selector: &str,
    poll_interval: Duration,
    timeout: Duration,
) -> Option<ElementInfo> {
    let found = poll_until(poll_interval, timeout, || host.query_selector(selector)).await;
    if found.is_none() {
        debug!(selector, timeout_ms = timeout.as_millis() as u64, "Element wait timed out");
    }
    found
}

/// Poll until the document reports `complete` or `timeout` elapses.
pub async fn wait_for_page_ready(host: &dyn Host, poll_interval: Duration, timeout: Duration) -> bool {
    poll_until(poll_interval, timeout, || {
        (host.ready_state() == ReadyState::Complete).then_some(())
    })
    .await
    .is_some()
}

/// Check `probe` immediately, then every `interval`, until it yields or `timeout` passes.
async fn poll_until<T>(interval: Duration, timeout: Duration, mut probe: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + timeout;
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Some(value) = probe() {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
    }
}
