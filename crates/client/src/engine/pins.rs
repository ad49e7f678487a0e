//! Session pins: the version hash each live session resolves against.
//!
//! Pins live in one key-value document. Every read-modify-write goes through
//! `write_lock`, so a session is never observed pinned to two hashes.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use appcache_core::Error;
use appcache_core::cache::kv::{self, KvStore, SESSION_PINS_KEY};

type Pins = BTreeMap<String, String>;

/// Session pin manager.
pub struct SessionPins {
    kv: Arc<dyn KvStore>,
    write_lock: Mutex<()>,
}

impl SessionPins {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv, write_lock: Mutex::new(()) }
    }

    async fn read(&self) -> Result<Pins, Error> {
        Ok(kv::get_typed::<Pins>(self.kv.as_ref(), SESSION_PINS_KEY).await?.unwrap_or_default())
    }

    /// Pinned hash for a session. Read failures count as "no pin".
    pub async fn get_pin(&self, session_id: &str) -> Option<String> {
        match self.read().await {
            Ok(mut pins) => pins.remove(session_id),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "session pins unavailable");
                None
            }
        }
    }

    /// Pin `session_id` to `hash` unless it is already pinned.
    ///
    /// Returns the pin in effect afterwards, which is the earlier value when
    /// one existed.
    pub async fn set_pin_if_absent(&self, session_id: &str, hash: &str) -> Result<String, Error> {
        let _guard = self.write_lock.lock().await;
        let mut pins = self.read().await?;
        if let Some(existing) = pins.get(session_id) {
            return Ok(existing.clone());
        }
        pins.insert(session_id.to_string(), hash.to_string());
        kv::set_typed(self.kv.as_ref(), SESSION_PINS_KEY, &pins).await?;
        tracing::debug!(session_id, hash, "pinned session");
        Ok(hash.to_string())
    }

    /// Drop pins of sessions that are no longer active.
    ///
    /// Returns the hashes those pins pointed at.
    pub async fn prune_and_return_orphans(&self, active: &HashSet<String>) -> Result<BTreeSet<String>, Error> {
        self.prune(active).await.map(|(orphans, _)| orphans)
    }

    /// Like [`prune_and_return_orphans`](Self::prune_and_return_orphans), also
    /// returning the hashes still referenced by surviving pins.
    pub(crate) async fn prune(&self, active: &HashSet<String>) -> Result<(BTreeSet<String>, BTreeSet<String>), Error> {
        let _guard = self.write_lock.lock().await;
        let mut pins = self.read().await?;
        let mut orphans = BTreeSet::new();
        pins.retain(|session_id, hash| {
            let live = active.contains(session_id);
            if !live {
                orphans.insert(hash.clone());
            }
            live
        });
        if !orphans.is_empty() {
            kv::set_typed(self.kv.as_ref(), SESSION_PINS_KEY, &pins).await?;
        }
        let in_use = pins.into_values().collect();
        Ok((orphans, in_use))
    }

    /// Every current pin.
    pub async fn all(&self) -> Result<Pins, Error> {
        self.read().await
    }
}
