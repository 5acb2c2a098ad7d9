//! Two-level compiled-rule cache with cross-process version coherency.
//!
//! Level one is process-local: the compiled set tagged with the version
//! token it was built against, trusted only while the TTL is fresh.
//! Level two is a [`SharedRuleStore`]: the MessagePack-serialized
//! compiled set plus a monotonically bumped version token, visible to
//! every worker.
//!
//! Read path: a fresh local set is served directly. A stale one
//! triggers a version probe; on match the TTL is refreshed, on mismatch
//! (or no local set) the cache reloads under an async mutex, shared
//! payload first and persistent rule source as the rebuild path, and
//! writes through both levels. A shared-store timeout serves the stale
//! local set rather than failing the tick.
//!
//! [`RuleCache::invalidate`] clears both levels and bumps the version;
//! the rule-CRUD collaborator calls it synchronously on every mutation,
//! and the TTL bounds staleness for workers that missed the signal.
//! Concurrent reloads are idempotent: last writer wins on the version
//! token, at worst duplicating work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::compile::{compile_set, CompiledRule};
use crate::error::{Result, RuleError};
use crate::schema::Visibility;
use crate::source::RuleSource;

// ── Shared store seam ───────────────────────────────────────────────

/// Serialized compiled set plus the version it was built against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRuleSet {
    pub version: u64,
    pub payload: Vec<u8>,
}

/// Cross-process backing store for the compiled rule set.
///
/// Implementations are expected to be cheap on `get_version`: it is
/// the coherency probe every worker issues when its TTL lapses.
#[async_trait]
pub trait SharedRuleStore: Send + Sync {
    /// Current version token; 0 when nothing has ever been stored.
    async fn get_version(&self) -> Result<u64>;

    /// Fetch the stored set, if any.
    async fn load(&self) -> Result<Option<StoredRuleSet>>;

    /// Write the serialized set (last writer wins).
    async fn store(&self, set: StoredRuleSet) -> Result<()>;

    /// Drop the stored payload and bump the version. Returns the new
    /// version token.
    async fn bump(&self) -> Result<u64>;
}

/// In-memory shared store: the single-process deployment default and
/// the test double. A networked implementation lives behind the same
/// trait in the deployment crate.
#[derive(Debug, Default)]
pub struct MemorySharedStore {
    inner: RwLock<(u64, Option<Vec<u8>>)>,
}

impl MemorySharedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedRuleStore for MemorySharedStore {
    async fn get_version(&self) -> Result<u64> {
        Ok(self.inner.read().expect("store lock poisoned").0)
    }

    async fn load(&self) -> Result<Option<StoredRuleSet>> {
        let guard = self.inner.read().expect("store lock poisoned");
        Ok(guard
            .1
            .as_ref()
            .map(|payload| StoredRuleSet {
                version: guard.0,
                payload: payload.clone(),
            }))
    }

    async fn store(&self, set: StoredRuleSet) -> Result<()> {
        let mut guard = self.inner.write().expect("store lock poisoned");
        *guard = (set.version, Some(set.payload));
        Ok(())
    }

    async fn bump(&self) -> Result<u64> {
        let mut guard = self.inner.write().expect("store lock poisoned");
        guard.0 += 1;
        guard.1 = None;
        Ok(guard.0)
    }
}

// ── Caller scope ────────────────────────────────────────────────────

/// Who is asking for the active rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerScope {
    /// The tick pipeline: sees every rule regardless of visibility.
    System,
    /// A user context: public + shared + their own private rules.
    User(String),
}

impl CallerScope {
    fn sees(&self, rule: &CompiledRule) -> bool {
        match self {
            CallerScope::System => true,
            CallerScope::User(id) => match rule.rule.visibility {
                Visibility::Public | Visibility::Shared => true,
                Visibility::Private => rule.rule.owner.as_deref() == Some(id.as_str()),
            },
        }
    }
}

// ── Cache status ────────────────────────────────────────────────────

/// Health snapshot for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub cached_rules: usize,
    pub version: u64,
    pub age_secs: u64,
    pub shared_reachable: bool,
}

// ── The cache ───────────────────────────────────────────────────────

struct LocalSet {
    version: u64,
    rules: Arc<Vec<CompiledRule>>,
    loaded_at: Instant,
}

/// Two-level compiled-rule cache.
pub struct RuleCache {
    shared: Arc<dyn SharedRuleStore>,
    source: Arc<dyn RuleSource>,
    local: RwLock<Option<LocalSet>>,
    reload_lock: Mutex<()>,
    ttl: Duration,
    shared_timeout: Duration,
    shared_reachable: AtomicBool,
}

impl RuleCache {
    pub fn new(
        shared: Arc<dyn SharedRuleStore>,
        source: Arc<dyn RuleSource>,
        ttl: Duration,
        shared_timeout: Duration,
    ) -> Self {
        Self {
            shared,
            source,
            local: RwLock::new(None),
            reload_lock: Mutex::new(()),
            ttl,
            shared_timeout,
            shared_reachable: AtomicBool::new(true),
        }
    }

    /// Active rules visible to the caller, enabled rules only.
    ///
    /// Never fails the tick: if both cache levels and the source are
    /// unreachable and no stale local set exists, the result is empty.
    pub async fn get_active_rules(&self, scope: &CallerScope) -> Vec<CompiledRule> {
        let rules = match self.current_set().await {
            Ok(rules) => rules,
            Err(e) => {
                warn!(error = %e, "rule cache unavailable; serving empty set");
                return Vec::new();
            }
        };
        rules
            .iter()
            .filter(|r| r.rule.enabled && scope.sees(r))
            .cloned()
            .collect()
    }

    /// Clear both levels and bump the shared version token.
    ///
    /// Called synchronously by the rule-CRUD collaborator on every
    /// create/update/delete so the next read anywhere reloads.
    pub async fn invalidate(&self) -> Result<u64> {
        *self.local.write().expect("local cache lock poisoned") = None;
        let version = self.with_timeout(self.shared.bump()).await?;
        info!(version, "rule cache invalidated");
        Ok(version)
    }

    /// Health probe: local counters plus a live shared-store check.
    pub async fn status(&self) -> CacheStatus {
        let reachable = self.with_timeout(self.shared.get_version()).await.is_ok();
        let guard = self.local.read().expect("local cache lock poisoned");
        match guard.as_ref() {
            Some(local) => CacheStatus {
                cached_rules: local.rules.len(),
                version: local.version,
                age_secs: local.loaded_at.elapsed().as_secs(),
                shared_reachable: reachable,
            },
            None => CacheStatus {
                cached_rules: 0,
                version: 0,
                age_secs: 0,
                shared_reachable: reachable,
            },
        }
    }

    // ── Read path ───────────────────────────────────────────────────

    async fn current_set(&self) -> Result<Arc<Vec<CompiledRule>>> {
        // Fresh local set: no shared round-trip at all.
        if let Some(rules) = self.fresh_local() {
            return Ok(rules);
        }

        // Stale or missing: probe the shared version. Unreachable shared
        // store serves the stale local set (stale-but-available beats
        // failing the tick).
        let shared_version = match self.with_timeout(self.shared.get_version()).await {
            Ok(v) => v,
            Err(e) => {
                if let Some(rules) = self.any_local() {
                    warn!(error = %e, "shared store unreachable; serving stale local cache");
                    return Ok(rules);
                }
                return Err(e);
            }
        };

        if let Some(rules) = self.local_at_version(shared_version) {
            return Ok(rules);
        }

        self.reload(shared_version).await
    }

    async fn reload(&self, mut shared_version: u64) -> Result<Arc<Vec<CompiledRule>>> {
        let _guard = self.reload_lock.lock().await;

        // Another task may have finished the same reload while this one
        // waited on the lock.
        if let Some(rules) = self.local_at_version(shared_version) {
            return Ok(rules);
        }

        // Try the shared payload first.
        match self.with_timeout(self.shared.load()).await {
            Ok(Some(stored)) if stored.version == shared_version => {
                match decode_set(&stored.payload) {
                    Ok(rules) => {
                        debug!(
                            version = stored.version,
                            count = rules.len(),
                            "rule cache loaded from shared store"
                        );
                        return Ok(self.install(stored.version, rules));
                    }
                    Err(e) => {
                        warn!(error = %e, "stored rule set undecodable; rebuilding from source");
                    }
                }
            }
            Ok(_) => {} // nothing stored, or a version race; rebuild
            Err(e) => {
                if let Some(rules) = self.any_local() {
                    warn!(error = %e, "shared load failed; serving stale local cache");
                    return Ok(rules);
                }
                warn!(error = %e, "shared load failed with no local fallback; rebuilding");
            }
        }

        // Rebuild from the persistent rule source.
        let raw = self.source.list_enabled().await?;
        let compiled = compile_set(raw);

        if shared_version == 0 {
            // First writer establishes the token.
            shared_version = self.with_timeout(self.shared.bump()).await.unwrap_or(1);
        }
        let payload =
            rmp_serde::to_vec(&compiled).map_err(|e| RuleError::Encode(e.to_string()))?;
        if let Err(e) = self
            .with_timeout(self.shared.store(StoredRuleSet {
                version: shared_version,
                payload,
            }))
            .await
        {
            warn!(error = %e, "failed to write compiled set to shared store");
        }

        info!(
            version = shared_version,
            count = compiled.len(),
            "rule cache rebuilt from source"
        );
        Ok(self.install(shared_version, compiled))
    }

    fn install(&self, version: u64, rules: Vec<CompiledRule>) -> Arc<Vec<CompiledRule>> {
        let rules = Arc::new(rules);
        *self.local.write().expect("local cache lock poisoned") = Some(LocalSet {
            version,
            rules: Arc::clone(&rules),
            loaded_at: Instant::now(),
        });
        rules
    }

    fn fresh_local(&self) -> Option<Arc<Vec<CompiledRule>>> {
        let guard = self.local.read().expect("local cache lock poisoned");
        guard
            .as_ref()
            .filter(|l| l.loaded_at.elapsed() < self.ttl)
            .map(|l| Arc::clone(&l.rules))
    }

    fn any_local(&self) -> Option<Arc<Vec<CompiledRule>>> {
        let guard = self.local.read().expect("local cache lock poisoned");
        guard.as_ref().map(|l| Arc::clone(&l.rules))
    }

    /// Local set matching a version token; refreshes the TTL on hit.
    fn local_at_version(&self, version: u64) -> Option<Arc<Vec<CompiledRule>>> {
        let mut guard = self.local.write().expect("local cache lock poisoned");
        match guard.as_mut() {
            Some(local) if local.version == version => {
                local.loaded_at = Instant::now();
                Some(Arc::clone(&local.rules))
            }
            _ => None,
        }
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        let result = match tokio::time::timeout(self.shared_timeout, fut).await {
            Ok(inner) => inner,
            Err(_) => Err(RuleError::SharedTimeout),
        };
        self.shared_reachable
            .store(result.is_ok(), Ordering::Relaxed);
        result
    }
}

fn decode_set(payload: &[u8]) -> Result<Vec<CompiledRule>> {
    let mut rules: Vec<CompiledRule> =
        rmp_serde::from_slice(payload).map_err(|e| RuleError::Encode(e.to_string()))?;
    for rule in &mut rules {
        rule.rehydrate();
    }
    Ok(rules)
}
