//! Whole-queue advisory lock.
//!
//! The lock lives in `<name>-lock` as `{token, expires_at_ms}`. It only
//! excludes other lock holders: appends and checkouts on the queue itself
//! are not blocked by it. A holder that crashes leaves a record behind;
//! once its expiry passes any contender removes it with a guarded delete.

use crate::keys;
use crate::{Queue, QueueError, QueueResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sync_queue_store::ItemStore;
use tokio::task;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Delay between acquisition attempts while the lock is held elsewhere.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Serialize, Deserialize)]
struct LockRecord {
    token: String,
    expires_at_ms: i64,
}

impl Queue {
    /// Acquire the lock, polling until `timeout` elapses.
    ///
    /// A zero timeout makes exactly one attempt. Each attempt runs on the
    /// blocking pool since the store may wait on a busy SQLite file.
    pub async fn lock(&self, timeout: Duration) -> QueueResult<()> {
        let deadline = Instant::now() + timeout;

        loop {
            let store = self.store.clone();
            let name = self.name.clone();
            let now_ms = self.keys.now().timestamp_millis();
            let ttl = self.lock_ttl;
            let acquired =
                task::spawn_blocking(move || try_acquire(store.as_ref(), &name, now_ms, ttl))
                    .await??;
            if acquired {
                info!(queue = %self.name, "Acquired queue lock");
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(queue = %self.name, timeout_ms = timeout.as_millis() as u64, "Queue lock timed out");
                return Err(QueueError::LockTimeout {
                    queue: self.name.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(LOCK_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// One acquisition attempt. Returns `true` if this call took the lock.
    pub fn try_lock(&self) -> QueueResult<bool> {
        try_acquire(
            self.store.as_ref(),
            &self.name,
            self.keys.now().timestamp_millis(),
            self.lock_ttl,
        )
    }

    /// Release the lock. A no-op when nothing is locked.
    pub fn unlock(&self) -> QueueResult<()> {
        let removed = self.store.delete_keys(&[keys::lock_key(&self.name)])?;
        if removed > 0 {
            info!(queue = %self.name, "Released queue lock");
        }
        Ok(())
    }

    /// Whether a live (unexpired) lock is held.
    pub fn is_locked(&self) -> QueueResult<bool> {
        let Some(existing) = self.store.get(&keys::lock_key(&self.name))? else {
            return Ok(false);
        };
        Ok(match serde_json::from_slice::<LockRecord>(&existing) {
            Ok(held) => held.expires_at_ms > self.keys.now().timestamp_millis(),
            Err(_) => false,
        })
    }
}

fn try_acquire(
    store: &dyn ItemStore,
    queue: &str,
    now_ms: i64,
    ttl: Duration,
) -> QueueResult<bool> {
    let key = keys::lock_key(queue);
    let record = LockRecord {
        token: uuid::Uuid::new_v4().to_string(),
        expires_at_ms: now_ms.saturating_add(ttl.as_millis() as i64),
    };
    let bytes = serde_json::to_vec(&record)?;

    if store.insert_if_absent(&key, &bytes)? {
        return Ok(true);
    }

    match store.get(&key)? {
        // Released between our insert and read
        None => Ok(store.insert_if_absent(&key, &bytes)?),
        Some(existing) => {
            let stale = match serde_json::from_slice::<LockRecord>(&existing) {
                Ok(held) => held.expires_at_ms <= now_ms,
                Err(_) => true,
            };
            if !stale {
                return Ok(false);
            }
            if store
                .delete_if_match(&key, &existing, &[key.clone()])?
                .is_some()
            {
                warn!(queue, "Removed stale queue lock");
            }
            Ok(store.insert_if_absent(&key, &bytes)?)
        }
    }
}
