use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::dedup::SeenSet;
use crate::error::FetchError;
use crate::scraping::base::PageFetcher;
use crate::scraping::{detail, listing};
use crate::updates::{self, EventSink, EventStream};

pub const LISTING_URL: &str = "https://standupstore.ru/";
pub const INITIAL_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub listing_url: String,
    pub interval: Duration,
    /// Delay before the first (baseline) cycle and before retrying a failed one.
    pub initial_delay: Duration,
    /// When set, the first completed cycle only seeds the seen-set.
    pub suppress_baseline: bool,
}

impl WatchConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            listing_url: LISTING_URL.to_string(),
            interval,
            initial_delay: INITIAL_DELAY,
            suppress_baseline: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Fetching,
    Extracting,
    Enriching,
    Deduplicating,
    Emitting,
    Shutdown,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub candidates: usize,
    pub new: usize,
    pub emitted: usize,
    pub enrich_failures: usize,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// The listing page could not be fetched; nothing was recorded.
    Skipped(FetchError),
    Shutdown,
}

pub struct WatchHandle<F> {
    pub events: EventStream,
    pub task: JoinHandle<Watcher<F>>,
}

/// Polls the listing page and emits events it has not surfaced before.
///
/// The watcher owns its seen-set outright and runs on a single task, so none of
/// its state is shared or locked.
pub struct Watcher<F> {
    fetcher: F,
    config: WatchConfig,
    seen: SeenSet,
    baseline_pending: bool,
    state: WatchState,
}

impl<F> Watcher<F>
where
    F: PageFetcher + 'static,
{
    pub fn new(fetcher: F, config: WatchConfig) -> Self {
        let baseline_pending = config.suppress_baseline;
        Self {
            fetcher,
            config,
            seen: SeenSet::new(),
            baseline_pending,
            state: WatchState::Idle,
        }
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn baseline_pending(&self) -> bool {
        self.baseline_pending
    }

    /// Spawns the poll loop. The event stream ends once `cancel` fires.
    pub fn watch(self, cancel: CancellationToken) -> WatchHandle<F> {
        let (updates_tx, updates_rx) = updates::channel();
        let task = tokio::spawn(self.run(updates_tx, cancel));
        WatchHandle {
            events: updates_rx,
            task,
        }
    }

    pub async fn run(mut self, updates: EventSink, cancel: CancellationToken) -> Self {
        let mut delay = self.config.initial_delay;

        loop {
            self.state = WatchState::Idle;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = updates.closed() => break,
                _ = sleep(delay) => {}
            }

            match self.poll_cycle(&updates, &cancel).await {
                CycleOutcome::Completed(_) => delay = self.config.interval,
                CycleOutcome::Skipped(_) => {}
                CycleOutcome::Shutdown => break,
            }
        }

        self.state = WatchState::Shutdown;
        info!("triggered shutdown");
        drop(updates);
        info!("updates channel closed");
        self
    }

    /// Runs one pass over the listing: fetch, extract, then dedup, enrich and emit per entry.
    pub async fn poll_cycle(
        &mut self,
        updates: &EventSink,
        cancel: &CancellationToken,
    ) -> CycleOutcome {
        if cancel.is_cancelled() {
            return self.shut_down();
        }

        self.state = WatchState::Fetching;
        let url = self.config.listing_url.clone();
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.fetcher.fetch_html(&url) => Some(result),
        };
        let html = match fetched {
            None => return self.shut_down(),
            Some(Ok(html)) => html,
            Some(Err(err)) => {
                error!(url = %url, error = %err, "unable to fetch listing");
                self.state = WatchState::Idle;
                return CycleOutcome::Skipped(err);
            }
        };

        self.state = WatchState::Extracting;
        let candidates = listing::extract_events(&html, &url);
        let mut report = CycleReport {
            candidates: candidates.len(),
            ..CycleReport::default()
        };

        for mut event in candidates {
            if cancel.is_cancelled() {
                return self.shut_down();
            }

            // Identity comes from the listing alone, so a failed detail fetch
            // can neither hide a known event nor make it look new.
            self.state = WatchState::Deduplicating;
            let fingerprint = event.fingerprint();
            if self.seen.contains(&fingerprint) {
                continue;
            }

            self.state = WatchState::Enriching;
            let enriched = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = detail::enrich(&self.fetcher, &mut event) => Some(result),
            };
            match enriched {
                None => return self.shut_down(),
                Some(Err(_)) => report.enrich_failures += 1,
                Some(Ok(())) => {}
            }

            debug!(fingerprint = %fingerprint, link = %event.booking_link, "new event");
            self.seen.record(fingerprint);
            report.new += 1;
            if self.baseline_pending {
                continue;
            }

            self.state = WatchState::Emitting;
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                delivered = updates.send(event) => delivered,
            };
            if !sent {
                return self.shut_down();
            }
            report.emitted += 1;
        }

        if report.new > 0 {
            debug!(count = report.new, "found new events");
        } else {
            debug!("no new events");
        }

        if self.baseline_pending {
            self.baseline_pending = false;
            info!(seeded = self.seen.len(), "baseline pass complete");
        }

        self.state = WatchState::Idle;
        CycleOutcome::Completed(report)
    }

    fn shut_down(&mut self) -> CycleOutcome {
        self.state = WatchState::Shutdown;
        CycleOutcome::Shutdown
    }
}
