use anyhow::{Result, bail};
use std::future::Future;
use std::time::Duration;
use tandem_client::SessionEvent;
use tokio::sync::broadcast;
use tokio::time::{Instant, sleep, timeout};

/// Timeout for a single expected session event (ms).
pub const EVENT_TIMEOUT_MS: u64 = 5000;

/// Polling interval for state checks (ms).
pub const POLL_INTERVAL_MS: u64 = 10;

/// Receive events until one matches `pred`, skipping the rest.
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<SessionEvent>,
    mut pred: F,
) -> Result<SessionEvent>
where
    F: FnMut(&SessionEvent) -> bool,
{
    let deadline = Duration::from_millis(EVENT_TIMEOUT_MS);
    let found = timeout(deadline, async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return Ok(event),
                Ok(event) => tracing::debug!("[Wait] skipping {:?}", event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("[Wait] lagged by {} events", n);
                }
                Err(e) => bail!("event stream ended: {e}"),
            }
        }
    })
    .await;

    match found {
        Ok(res) => res,
        Err(_) => bail!("no matching event within {EVENT_TIMEOUT_MS}ms"),
    }
}

/// Poll `check` until it returns `true`.
pub async fn eventually<F, Fut>(what: &str, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + Duration::from_millis(EVENT_TIMEOUT_MS);
    while Instant::now() < deadline {
        if check().await {
            return Ok(());
        }
        sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
    bail!("timed out waiting for {what}")
}

/// Collect whatever events are already queued.
pub fn drain_events(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
