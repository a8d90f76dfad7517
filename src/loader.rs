// Availability loader: owns the published availability for one destination and the
// refresh_availability() re-entry point used by the calendar driver.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::availability::AvailabilityMap;
use crate::availability_cache::AvailabilityCache;
use crate::availability_client::AvailabilitySource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    // Fetch failed; availability is treated as empty until the next refresh
    Failed(String),
}

impl LoadStatus {
    pub fn can_retry(&self) -> bool {
        matches!(self, LoadStatus::Failed(_) | LoadStatus::Idle)
    }
}

struct Published {
    status: LoadStatus,
    map: Arc<AvailabilityMap>,
}

pub struct AvailabilityLoader {
    destination_id: String,
    source: Arc<dyn AvailabilitySource>,
    cache: Option<Arc<AvailabilityCache>>,
    generation: AtomicU64,
    published: RwLock<Published>,
}

// Resets a refresh that was dropped before it could publish
struct RefreshGuard<'a> {
    loader: &'a AvailabilityLoader,
    generation: u64,
    finished: bool,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.finished
            && self
                .loader
                .publish(self.generation, LoadStatus::Idle, Arc::default())
        {
            debug!(
                destination_id = %self.loader.destination_id,
                generation = self.generation,
                "Availability refresh cancelled"
            );
        }
    }
}

impl AvailabilityLoader {
    pub fn new(destination_id: impl Into<String>, source: Arc<dyn AvailabilitySource>) -> Self {
        Self {
            destination_id: destination_id.into(),
            source,
            cache: None,
            generation: AtomicU64::new(0),
            published: RwLock::new(Published {
                status: LoadStatus::Idle,
                map: Arc::default(),
            }),
        }
    }

    pub fn with_cache(mut self, cache: Arc<AvailabilityCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }

    pub fn status(&self) -> LoadStatus {
        self.published.read().status.clone()
    }

    // Currently published map; empty unless the last refresh succeeded
    pub fn availability(&self) -> Arc<AvailabilityMap> {
        Arc::clone(&self.published.read().map)
    }

    // Fetch availability and publish it. Failures publish an empty map. Only the most
    // recent refresh may publish; an older one that finishes late returns what is
    // currently published instead of overwriting it.
    pub async fn refresh_availability(&self) -> Arc<AvailabilityMap> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(generation, LoadStatus::Loading, Arc::default());

        let mut guard = RefreshGuard {
            loader: self,
            generation,
            finished: false,
        };

        let result = match &self.cache {
            Some(cache) => {
                cache
                    .get_or_fetch(self.source.as_ref(), &self.destination_id)
                    .await
            }
            None => self.source.fetch(&self.destination_id).await.map(Arc::new),
        };
        guard.finished = true;

        let (status, map) = match result {
            Ok(map) => {
                info!(
                    destination_id = %self.destination_id,
                    dates = map.len(),
                    "Availability loaded"
                );
                (LoadStatus::Ready, map)
            }
            Err(err) => {
                warn!(
                    destination_id = %self.destination_id,
                    "Availability unavailable, treating all dates as closed: {}",
                    err
                );
                (LoadStatus::Failed(err.to_string()), Arc::default())
            }
        };

        if self.publish(generation, status, Arc::clone(&map)) {
            map
        } else {
            debug!(generation, "Discarding superseded availability refresh");
            self.availability()
        }
    }

    // Bypass the cache for this destination and refresh
    pub async fn force_refresh(&self) -> Arc<AvailabilityMap> {
        if let Some(cache) = &self.cache {
            cache.invalidate(Some(&self.destination_id));
        }
        self.refresh_availability().await
    }

    fn publish(&self, generation: u64, status: LoadStatus, map: Arc<AvailabilityMap>) -> bool {
        let mut published = self.published.write();
        if generation != self.generation.load(Ordering::SeqCst) {
            return false;
        }
        *published = Published { status, map };
        true
    }
}
