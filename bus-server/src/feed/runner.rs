//! Background producers that keep the snapshot slot current.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

use crate::domain::ClockTime;
use crate::store::{BusSource, StoreError};

use super::slot::{FeedHealth, SnapshotOrigin, SnapshotSlot};

/// Configuration for the feed tasks.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Keep a push subscription open. When off, the collection is polled
    /// every `refresh_interval` instead.
    pub subscription_enabled: bool,

    /// Polling interval used when the subscription is disabled.
    pub refresh_interval: Duration,

    /// Wait before reopening a broken subscription.
    pub reconnect_delay: Duration,

    /// How often the clock is sampled. Watchers are only woken when the
    /// minute changes.
    pub clock_poll: Duration,

    /// Source of the current time of day.
    pub clock: fn() -> ClockTime,
}

impl FeedConfig {
    pub fn new(subscription_enabled: bool, refresh_interval: Duration) -> Self {
        Self {
            subscription_enabled,
            refresh_interval,
            ..Default::default()
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> ClockTime) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            subscription_enabled: true,
            refresh_interval: Duration::from_secs(300),
            reconnect_delay: Duration::from_secs(5),
            clock_poll: Duration::from_secs(5),
            clock: ClockTime::now_local,
        }
    }
}

/// Cloneable access to a running feed, for request handlers.
#[derive(Clone)]
pub struct FeedControl {
    refresh: Arc<Notify>,
    clock: watch::Receiver<ClockTime>,
}

impl FeedControl {
    /// Ask the refresh task to re-fetch the collection now.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// The current minute as last published by the clock task.
    pub fn now(&self) -> ClockTime {
        *self.clock.borrow()
    }

    /// Receiver woken once per minute. Closed when the feed shuts down.
    pub fn clock(&self) -> watch::Receiver<ClockTime> {
        self.clock.clone()
    }

    /// A control with no tasks behind it, stuck at `now`.
    #[cfg(test)]
    pub(crate) fn stopped(now: ClockTime) -> Self {
        Self::manual(now).0
    }

    /// A control whose clock is driven by the returned sender. Dropping the
    /// sender closes the clock, as a feed shutdown does.
    #[cfg(test)]
    pub(crate) fn manual(now: ClockTime) -> (Self, watch::Sender<ClockTime>) {
        let (tx, clock) = watch::channel(now);
        let control = Self {
            refresh: Arc::new(Notify::new()),
            clock,
        };
        (control, tx)
    }
}

/// Owner of the feed tasks.
///
/// Dropping the handle stops every task, which closes the clock channel.
pub struct FeedHandle {
    tasks: Vec<JoinHandle<()>>,
    control: FeedControl,
}

impl FeedHandle {
    pub fn control(&self) -> FeedControl {
        self.control.clone()
    }

    pub fn request_refresh(&self) {
        self.control.request_refresh();
    }

    /// Stop all tasks and wait for them to finish.
    pub async fn shutdown(mut self) {
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks.drain(..) {
            // Cancelled is the expected outcome here.
            if let Err(e) = task.await
                && e.is_panic()
            {
                tracing::error!(error = %e, "feed task panicked");
            }
        }
        tracing::info!("bus feed stopped");
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Start the feed: an initial fetch, the subscription listener (when
/// enabled), the refresh task and the minute clock.
pub fn spawn_feed<S: BusSource>(
    source: Arc<S>,
    slot: SnapshotSlot,
    config: FeedConfig,
) -> FeedHandle {
    let refresh = Arc::new(Notify::new());
    let (clock_tx, clock_rx) = watch::channel((config.clock)());
    let mut tasks = Vec::with_capacity(4);

    tasks.push(tokio::spawn({
        let source = Arc::clone(&source);
        let slot = slot.clone();
        async move {
            fetch_into(source.as_ref(), &slot, SnapshotOrigin::InitialFetch).await;
        }
    }));

    if config.subscription_enabled {
        tasks.push(tokio::spawn(listen(
            Arc::clone(&source),
            slot.clone(),
            config.reconnect_delay,
        )));
    }

    tasks.push(tokio::spawn(refresh_loop(
        source,
        slot,
        Arc::clone(&refresh),
        (!config.subscription_enabled).then_some(config.refresh_interval),
    )));

    tasks.push(tokio::spawn(tick(clock_tx, config.clock, config.clock_poll)));

    tracing::info!(
        subscription = config.subscription_enabled,
        refresh_secs = config.refresh_interval.as_secs(),
        "bus feed started"
    );

    FeedHandle {
        tasks,
        control: FeedControl {
            refresh,
            clock: clock_rx,
        },
    }
}

/// Fetch the collection once and publish it. On failure the previous
/// snapshot is kept and the health records the error.
///
/// A failure that lands after another producer published newer data leaves
/// the health alone, so live data is never shown under a failure banner.
async fn fetch_into<S: BusSource>(source: &S, slot: &SnapshotSlot, origin: SnapshotOrigin) {
    let started_at = slot.version();
    match source.fetch_all().await {
        Ok(documents) => {
            slot.publish(&documents, origin);
        }
        Err(e) if slot.version() > started_at => {
            tracing::warn!(
                error = %e,
                origin = ?origin,
                "fetch failed, newer snapshot already published"
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, origin = ?origin, "failed to fetch buses");
            slot.set_health(FeedHealth::FetchFailed {
                message: e.to_string(),
            });
        }
    }
}

/// Keep a subscription open, reconnecting after failures.
async fn listen<S: BusSource>(source: Arc<S>, slot: SnapshotSlot, reconnect_delay: Duration) {
    loop {
        let failure = match source.subscribe().await {
            Ok(mut stream) => {
                tracing::info!("bus subscription opened");
                loop {
                    match stream.next().await {
                        Some(Ok(documents)) => {
                            slot.publish(&documents, SnapshotOrigin::Subscription);
                        }
                        // One bad delivery; the stream itself is fine.
                        Some(Err(e @ StoreError::Json { .. })) => {
                            tracing::warn!(error = %e, "skipping undecodable snapshot");
                        }
                        Some(Err(e)) => break e,
                        None => break StoreError::StreamClosed,
                    }
                }
            }
            Err(e) => e,
        };

        tracing::warn!(
            error = %failure,
            retry_secs = reconnect_delay.as_secs_f32(),
            "bus subscription failed"
        );
        slot.set_health(if slot.latest().is_some() {
            FeedHealth::Degraded {
                message: failure.to_string(),
            }
        } else {
            FeedHealth::FetchFailed {
                message: failure.to_string(),
            }
        });

        tokio::time::sleep(reconnect_delay).await;
    }
}

/// Re-fetch on request, and periodically when `interval` is set.
async fn refresh_loop<S: BusSource>(
    source: Arc<S>,
    slot: SnapshotSlot,
    refresh: Arc<Notify>,
    interval: Option<Duration>,
) {
    let mut ticker = interval.map(tokio::time::interval);
    if let Some(ticker) = ticker.as_mut() {
        // First tick is immediate; the initial fetch already covers it.
        ticker.tick().await;
    }

    loop {
        tokio::select! {
            _ = refresh.notified() => {
                tracing::info!("manual refresh requested");
            }
            _ = async {
                match ticker.as_mut() {
                    Some(ticker) => { ticker.tick().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {
                tracing::debug!("periodic refresh");
            }
        }

        fetch_into(source.as_ref(), &slot, SnapshotOrigin::Refresh).await;
    }
}

/// Publish the current minute whenever it changes.
async fn tick(clock_tx: watch::Sender<ClockTime>, clock: fn() -> ClockTime, poll: Duration) {
    let mut interval = tokio::time::interval(poll);
    loop {
        interval.tick().await;
        let now = clock();
        clock_tx.send_if_modified(|current| {
            if *current == now {
                return false;
            }
            *current = now;
            true
        });
    }
}
