//! Generation garbage collection.
//!
//! Pins of sessions that are gone are pruned first. A generation is then
//! deleted when its hash is superseded (not the latest version of its
//! manifest) and no surviving pin references it. Latest versions are always
//! kept, pinned or not, since new sessions resolve to them.
//!
//! Restricting deletion to the hashes orphaned in this pass would leak
//! superseded generations that were never pinned.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::future::join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::pins::SessionPins;
use super::session::SessionEnvironment;
use appcache_core::cache::kv::{self, KvStore, REGISTRY_KEY};
use appcache_core::{Error, GenerationStore, Registry};

/// Outcome of one collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CleanupReport {
    /// Hashes whose pins were pruned with their sessions.
    pub orphaned: Vec<String>,
    /// Hashes that are no longer the latest version of their manifest.
    pub superseded: Vec<String>,
    /// Generations deleted in this pass.
    pub deleted: Vec<String>,
    /// Generations whose deletion failed; retried on the next pass.
    pub failed: Vec<String>,
}

/// Reclaims generations no live session can reach.
#[derive(Clone)]
pub struct GenerationCollector {
    kv: Arc<dyn KvStore>,
    pins: Arc<SessionPins>,
    sessions: Arc<dyn SessionEnvironment>,
    generations: Arc<dyn GenerationStore>,
}

impl GenerationCollector {
    pub fn new(
        kv: Arc<dyn KvStore>, pins: Arc<SessionPins>, sessions: Arc<dyn SessionEnvironment>,
        generations: Arc<dyn GenerationStore>,
    ) -> Self {
        Self { kv, pins, sessions, generations }
    }

    /// Run one pass.
    ///
    /// # Errors
    ///
    /// Fails before deleting anything if the pins, the registry or the
    /// generation list cannot be read. Individual delete failures are
    /// reported in [`CleanupReport::failed`] instead.
    pub async fn run(&self) -> Result<CleanupReport, Error> {
        let active = self.sessions.list_active_session_ids().await;
        let (orphaned, in_use) = self.pins.prune(&active).await?;

        let registry: Registry = kv::get_typed(self.kv.as_ref(), REGISTRY_KEY).await?.unwrap_or_default();
        let superseded = registry.superseded_hashes();

        let existing: BTreeSet<String> = self.generations.list().await?.into_iter().collect();
        let doomed: Vec<&String> = superseded
            .iter()
            .filter(|hash| !in_use.contains(*hash) && existing.contains(*hash))
            .collect();

        let results = join_all(doomed.iter().map(|hash| async move { (*hash, self.generations.delete(hash).await) })).await;

        let mut report = CleanupReport {
            orphaned: orphaned.into_iter().collect(),
            superseded: superseded.iter().cloned().collect(),
            ..Default::default()
        };
        for (hash, result) in results {
            match result {
                Ok(_) => report.deleted.push(hash.clone()),
                Err(e) => {
                    tracing::warn!(hash = %hash, error = %e, "failed to delete generation");
                    report.failed.push(hash.clone());
                }
            }
        }

        tracing::info!(
            active_sessions = active.len(),
            orphaned = report.orphaned.len(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "generation cleanup finished"
        );

        Ok(report)
    }

    /// Run a pass in the background. Errors are logged, never returned.
    pub fn spawn(&self) -> tokio::task::JoinHandle<()> {
        let collector = self.clone();
        tokio::spawn(async move {
            if let Err(e) = collector.run().await {
                tracing::warn!(error = %e, "generation cleanup aborted");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::session::SessionTable;
    use crate::engine::testing::{FlakyGenerations, version};
    use appcache_core::CacheDb;
    use appcache_core::cache::kv::set_typed;

    const MANIFEST: &str = "https://app.test/app.appcache";

    struct Fixture {
        db: Arc<CacheDb>,
        pins: Arc<SessionPins>,
        sessions: Arc<SessionTable>,
    }

    impl Fixture {
        async fn new(hashes: &[&str]) -> Self {
            let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
            let mut registry = Registry::default();
            for hash in hashes {
                registry.history_mut(MANIFEST).append(version(hash, |_| {}));
                db.open_generation(hash).await.unwrap();
            }
            set_typed(db.as_ref(), REGISTRY_KEY, &registry).await.unwrap();

            let pins = Arc::new(SessionPins::new(db.clone()));
            Self { db, pins, sessions: Arc::new(SessionTable::new()) }
        }

        fn collector(&self) -> GenerationCollector {
            GenerationCollector::new(self.db.clone(), self.pins.clone(), self.sessions.clone(), self.db.clone())
        }

        async fn pin(&self, session: &str, hash: &str, live: bool) {
            self.pins.set_pin_if_absent(session, hash).await.unwrap();
            if live {
                self.sessions.open(session, "https://app.test/").await;
            }
        }

        async fn remaining(&self) -> BTreeSet<String> {
            self.db.list().await.unwrap().into_iter().collect()
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_orphaned_superseded_deleted() {
        let fx = Fixture::new(&["h1", "h2"]).await;
        fx.pin("dead", "h1", false).await;

        let report = fx.collector().run().await.unwrap();
        assert_eq!(report.orphaned, vec!["h1".to_string()]);
        assert_eq!(report.deleted, vec!["h1".to_string()]);
        assert_eq!(fx.remaining().await, set(&["h2"]));
        assert!(fx.pins.get_pin("dead").await.is_none());
    }

    #[tokio::test]
    async fn test_latest_kept_even_when_orphaned() {
        let fx = Fixture::new(&["h1", "h2"]).await;
        fx.pin("dead", "h2", false).await;

        let report = fx.collector().run().await.unwrap();
        assert_eq!(report.orphaned, vec!["h2".to_string()]);
        assert!(fx.remaining().await.contains("h2"));
    }

    #[tokio::test]
    async fn test_live_pin_keeps_superseded() {
        let fx = Fixture::new(&["h1", "h2"]).await;
        fx.pin("live", "h1", true).await;

        let report = fx.collector().run().await.unwrap();
        assert!(report.deleted.is_empty());
        assert_eq!(fx.remaining().await, set(&["h1", "h2"]));
    }

    #[tokio::test]
    async fn test_shared_hash_survives_while_any_session_lives() {
        let fx = Fixture::new(&["h1", "h2"]).await;
        fx.pin("dead", "h1", false).await;
        fx.pin("live", "h1", true).await;

        let report = fx.collector().run().await.unwrap();
        assert_eq!(report.orphaned, vec!["h1".to_string()]);
        assert!(report.deleted.is_empty());
        assert!(fx.remaining().await.contains("h1"));

        fx.sessions.close("live").await;
        let report = fx.collector().run().await.unwrap();
        assert_eq!(report.deleted, vec!["h1".to_string()]);
    }

    #[tokio::test]
    async fn test_unpinned_superseded_deleted() {
        let fx = Fixture::new(&["h1", "h2", "h3"]).await;

        let report = fx.collector().run().await.unwrap();
        assert_eq!(report.superseded, vec!["h1".to_string(), "h2".to_string()]);
        assert_eq!(fx.remaining().await, set(&["h3"]));
    }

    #[tokio::test]
    async fn test_remaining_generations_are_latest_or_pinned() {
        let fx = Fixture::new(&["h1", "h2", "h3", "h4"]).await;
        fx.pin("a", "h1", true).await;
        fx.pin("b", "h2", false).await;
        fx.pin("c", "h3", true).await;

        fx.collector().run().await.unwrap();

        let pinned: BTreeSet<String> = fx.pins.all().await.unwrap().into_values().collect();
        for hash in fx.remaining().await {
            assert!(hash == "h4" || pinned.contains(&hash), "unexpected survivor {hash}");
        }
        assert!(!fx.remaining().await.contains("h2"));
    }

    #[tokio::test]
    async fn test_delete_failure_is_isolated() {
        let fx = Fixture::new(&["h1", "h2", "h3"]).await;
        let flaky = Arc::new(FlakyGenerations::new(fx.db.clone(), "h1"));
        let collector = GenerationCollector::new(fx.db.clone(), fx.pins.clone(), fx.sessions.clone(), flaky);

        let report = collector.run().await.unwrap();
        assert_eq!(report.failed, vec!["h1".to_string()]);
        assert_eq!(report.deleted, vec!["h2".to_string()]);
        assert_eq!(fx.remaining().await, set(&["h1", "h3"]));
    }

    #[tokio::test]
    async fn test_spawn_runs_detached() {
        let fx = Fixture::new(&["h1", "h2"]).await;
        fx.collector().spawn().await.unwrap();
        assert_eq!(fx.remaining().await, set(&["h2"]));
    }
}
