//! Calendar snapshot kept fresh through a [`RefreshCache`].
//!
//! The snapshot covers `[now, now + window)` and holds at most `max_results`
//! events, ascending by start. All-day events start at midnight in the zone of
//! the `now` passed in, the same reading the evaluator uses. A failed sync leaves the previous snapshot in
//! place and does not reset the sync clock, so the next tick tries again.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::{debug, error, info};

use crate::cache::RefreshCache;
use crate::error::FetchError;
use crate::sources::{CalendarEvent, CalendarSource};
use crate::storage::CalendarConfig;

const SNAPSHOT_KEY: &str = "calendar";

/// Result of asking the feed to refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Snapshot is younger than the sync interval.
    Fresh,
    /// Snapshot replaced with this many events.
    Synced(usize),
    /// Fetch failed; the previous snapshot was kept.
    Failed(FetchError),
    /// No calendar source configured.
    Disabled,
}

pub struct CalendarFeed {
    source: Option<Box<dyn CalendarSource>>,
    cache: RefreshCache<Vec<CalendarEvent>>,
    config: CalendarConfig,
}

impl CalendarFeed {
    pub fn new(source: Box<dyn CalendarSource>, config: CalendarConfig) -> Self {
        Self {
            source: Some(source),
            cache: RefreshCache::new(),
            config,
        }
    }

    /// A feed with no provider; never has events.
    pub fn disabled(config: CalendarConfig) -> Self {
        Self {
            source: None,
            cache: RefreshCache::new(),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// Latest successfully synced events, possibly stale.
    pub fn events(&self) -> &[CalendarEvent] {
        self.cache
            .peek(SNAPSHOT_KEY)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// How long before an event its reminder fires.
    pub fn reminder_lead(&self) -> Duration {
        self.config.reminder_lead()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.cache.stored_at(SNAPSHOT_KEY)
    }

    /// True when never synced or the last sync is older than the interval.
    pub fn needs_sync(&self, now: DateTime<Utc>) -> bool {
        match self.last_sync() {
            None => true,
            Some(last) => now - last > self.config.sync_interval(),
        }
    }

    /// Sync if [`CalendarFeed::needs_sync`]. Failures are logged, not raised.
    pub fn refresh_if_stale<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> SyncOutcome {
        if !self.needs_sync(now.with_timezone(&Utc)) {
            return SyncOutcome::Fresh;
        }
        self.sync_now(now)
    }

    /// Sync unconditionally.
    pub fn sync_now<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> SyncOutcome {
        let Some(source) = self.source.as_deref() else {
            debug!("calendar sync skipped: no source configured");
            return SyncOutcome::Disabled;
        };

        let tz = now.timezone();
        let now = now.with_timezone(&Utc);
        let window_end = now + self.config.window();
        let max = self.config.max_results;
        let start_of = |e: &CalendarEvent| e.start.in_zone(&tz).map(|s| s.with_timezone(&Utc));
        // zero TTL forces a fetch
        let fetched = self
            .cache
            .get_at(SNAPSHOT_KEY, Duration::zero(), now, || {
                let mut events = source.list_upcoming(now, window_end, max)?;
                // the provider also returns events still running at `now`
                events.retain(|e| {
                    start_of(e).is_some_and(|start| start >= now && start < window_end)
                });
                events.sort_by_key(|e| start_of(e));
                events.truncate(max as usize);
                Ok::<_, FetchError>(events)
            });

        match fetched {
            Ok(events) => {
                info!(count = events.len(), "synced calendar events");
                SyncOutcome::Synced(events.len())
            }
            Err(e) => {
                error!(error = %e, "calendar sync failed, keeping previous snapshot");
                SyncOutcome::Failed(e)
            }
        }
    }
}
