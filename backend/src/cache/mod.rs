//! Sales cache - reuse the last table fetch for a while
//!
//! The dashboard server fetches the whole `sales_data` table per request.
//! The table only changes when something loads into it, so the server keeps
//! the last fetch for a fixed time-to-live and drops it after an upload.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::DEFAULT_CACHE_TTL_SECS;
use crate::models::StoredSale;

/// A cached fetch
#[derive(Debug, Clone)]
struct CachedFetch {
    rows: Arc<Vec<StoredSale>>,
    fetched_at: Instant,
}

/// Time-bounded cache of the persisted sales rows
#[derive(Debug, Clone)]
pub struct SalesCache {
    ttl: Duration,
    entry: Option<CachedFetch>,
}

impl SalesCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached rows, unless expired.
    pub fn get(&self) -> Option<Arc<Vec<StoredSale>>> {
        self.get_at(Instant::now())
    }

    fn get_at(&self, now: Instant) -> Option<Arc<Vec<StoredSale>>> {
        self.entry
            .as_ref()
            .filter(|e| now.saturating_duration_since(e.fetched_at) < self.ttl)
            .map(|e| Arc::clone(&e.rows))
    }

    /// Replace the cached rows. Returns the shared handle now stored.
    pub fn put(&mut self, rows: Vec<StoredSale>) -> Arc<Vec<StoredSale>> {
        let rows = Arc::new(rows);
        self.entry = Some(CachedFetch {
            rows: Arc::clone(&rows),
            fetched_at: Instant::now(),
        });
        rows
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

impl Default for SalesCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }
}
