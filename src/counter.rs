//! MSH-ID counter allocation
//!
//! Every `MSH{n}` identifier comes from [`CounterAllocator`], which only
//! touches the counter through the store's atomic
//! [`DocumentStore::increment_counter`]. When the store keeps failing the
//! allocator hands out a timestamp-derived provisional id instead of
//! blocking, and marks the allocation as degraded.

use crate::config::CounterConfig;
use crate::error::Result;
use crate::storage::records::{raw_msh_id, ASSESSMENTS};
use crate::storage::DocumentStore;
use crate::types::MshId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// An allocated identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedId {
    pub id: MshId,

    /// True when the counter could not be advanced and `id` is provisional
    pub degraded: bool,
}

/// Outcome of a counter sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub previous: Option<u64>,
    pub current: u64,
}

impl SyncOutcome {
    pub fn changed(&self) -> bool {
        self.previous != Some(self.current)
    }
}

pub struct CounterAllocator {
    store: Arc<dyn DocumentStore>,
    name: String,
    max_attempts: u32,
    backoff: Duration,
}

impl CounterAllocator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::from_config(store, &CounterConfig::default())
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, config: &CounterConfig) -> Self {
        Self {
            store,
            name: config.name.clone(),
            max_attempts: config.max_attempts.max(1),
            backoff: config.retry_backoff(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hand out the next `MSH{n}`
    ///
    /// Strictly increasing across callers as long as `degraded` is false.
    pub async fn allocate_next_id(&self) -> AllocatedId {
        let mut delay = self.backoff;
        for attempt in 1..=self.max_attempts {
            match self.store.increment_counter(&self.name).await {
                Ok(n) => {
                    debug!("Allocated MSH{} on attempt {}", n, attempt);
                    return AllocatedId {
                        id: MshId::Sequence(n),
                        degraded: false,
                    };
                }
                Err(e) => {
                    warn!(
                        "Counter {} increment failed (attempt {}/{}): {}",
                        self.name, attempt, self.max_attempts, e
                    );
                    if attempt < self.max_attempts && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                        delay = delay.saturating_mul(2);
                    }
                }
            }
        }

        let id = MshId::Provisional(Utc::now().timestamp_millis());
        warn!(
            "Counter {} unavailable after {} attempts, issuing provisional id {}",
            self.name, self.max_attempts, id
        );
        AllocatedId { id, degraded: true }
    }

    /// Stored counter value, 0 if never written
    pub async fn current(&self) -> Result<u64> {
        Ok(self.store.get_counter(&self.name).await?.unwrap_or(0))
    }

    /// Set the counter back to 0; only for full data wipes
    pub async fn reset(&self) -> Result<()> {
        info!("Resetting counter {} to 0", self.name);
        self.store.set_counter(&self.name, 0).await
    }

    /// Set the counter to the highest MSH sequence present on any assessment
    ///
    /// Corrects drift after direct writes bypassed the allocator. Provisional
    /// and unparseable ids are ignored. Running it twice without new
    /// assessments yields the same value.
    pub async fn sync(&self) -> Result<SyncOutcome> {
        let documents = self.store.list(ASSESSMENTS).await?;
        let max = documents
            .iter()
            .filter_map(raw_msh_id)
            .filter_map(|id| id.sequence())
            .max()
            .unwrap_or(0);

        let previous = self.store.get_counter(&self.name).await?;
        self.store.set_counter(&self.name, max).await?;

        let outcome = SyncOutcome {
            previous,
            current: max,
        };
        if outcome.changed() {
            info!(
                "Synced counter {}: {:?} -> {} across {} assessments",
                self.name,
                previous,
                max,
                documents.len()
            );
        } else {
            debug!("Counter {} already at {}", self.name, max);
        }
        Ok(outcome)
    }
}
