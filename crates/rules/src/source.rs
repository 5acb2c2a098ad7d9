//! Persistent rule source seam and the file-backed implementation.
//!
//! The rule-CRUD collaborator owns rule persistence; the engine only
//! needs one read ("list the enabled rules") plus a change signal.
//! [`YamlDirSource`] serves deployments where rules live as YAML
//! documents in a directory, with [`RuleWatcher`] turning filesystem
//! changes into cache invalidations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::RuleCache;
use crate::error::{Result, RuleError};
use crate::schema::Rule;

/// Read seam onto the persistent rule store.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Every enabled rule, in no particular order.
    ///
    /// Implementations skip individually broken rules rather than
    /// failing the listing; a total failure is a [`RuleError::Source`].
    async fn list_enabled(&self) -> Result<Vec<Rule>>;
}

// ── In-memory source ────────────────────────────────────────────────

/// Test and embedded-deployment source.
#[derive(Debug, Default)]
pub struct MemoryRuleSource {
    rules: RwLock<Vec<Rule>>,
}

impl MemoryRuleSource {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    /// Swap the whole rule set (the caller then invalidates the cache).
    pub async fn replace(&self, rules: Vec<Rule>) {
        *self.rules.write().await = rules;
    }
}

#[async_trait]
impl RuleSource for MemoryRuleSource {
    async fn list_enabled(&self) -> Result<Vec<Rule>> {
        Ok(self
            .rules
            .read()
            .await
            .iter()
            .filter(|r| r.enabled)
            .cloned()
            .collect())
    }
}

// ── YAML directory source ───────────────────────────────────────────

/// Rules as `*.yml` / `*.yaml` documents under a directory, scanned
/// recursively. Dotfiles and other extensions are ignored; a file that
/// fails to parse or validate is skipped with a warning and the rest of
/// the directory still loads.
pub struct YamlDirSource {
    rules_dir: PathBuf,
}

impl YamlDirSource {
    /// Create a source over the given directory, creating it (and
    /// parents) if missing.
    pub fn new(rules_dir: PathBuf) -> Self {
        if !rules_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&rules_dir) {
                warn!(path = %rules_dir.display(), error = %e, "failed to create rules directory");
            }
        }
        Self { rules_dir }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    fn scan_dir(&self, dir: &Path, out: &mut Vec<Rule>) -> Result<()> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read rules directory");
                return Ok(());
            }
        };

        for entry in entries {
            let path = entry?.path();

            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    continue;
                }
            }
            if path.is_dir() {
                self.scan_dir(&path, out)?;
                continue;
            }
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yml" || e == "yaml")
                .unwrap_or(false);
            if !is_yaml {
                continue;
            }

            match load_rule_file(&path) {
                Ok(rule) => {
                    if rule.enabled {
                        out.push(rule);
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable rule file");
                }
            }
        }

        Ok(())
    }
}

fn load_rule_file(path: &Path) -> Result<Rule> {
    let contents = std::fs::read_to_string(path)?;
    let rule: Rule = serde_yaml::from_str(&contents)?;
    rule.validate().map_err(RuleError::Validation)?;
    Ok(rule)
}

#[async_trait]
impl RuleSource for YamlDirSource {
    async fn list_enabled(&self) -> Result<Vec<Rule>> {
        let mut rules = Vec::new();
        let root = self.rules_dir.clone();
        self.scan_dir(&root, &mut rules)?;

        // Duplicate ids would make cooldown keys ambiguous; keep the
        // first occurrence.
        rules.sort_by_key(|r| r.id);
        rules.dedup_by_key(|r| r.id);
        Ok(rules)
    }
}

// ── Change watcher ──────────────────────────────────────────────────

/// Watches the rules directory and invalidates the cache on change.
///
/// Held for its lifetime; dropping it stops the watch. Invalidation is
/// spawned onto the runtime the watcher was created on.
pub struct RuleWatcher {
    _watcher: RecommendedWatcher,
}

impl RuleWatcher {
    pub fn start(rules_dir: &Path, cache: Arc<RuleCache>) -> Result<Self> {
        let handle = tokio::runtime::Handle::current();

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if !touches_rule_file(&event) {
                        return;
                    }
                    let cache = Arc::clone(&cache);
                    handle.spawn(async move {
                        if let Err(e) = cache.invalidate().await {
                            warn!(error = %e, "rule change invalidation failed");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "rules watcher error"),
            },
        )?;

        watcher.watch(rules_dir, RecursiveMode::Recursive)?;
        let _ = watcher
            .configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)));

        info!(path = %rules_dir.display(), "watching rules directory for changes");
        Ok(Self { _watcher: watcher })
    }
}

fn touches_rule_file(event: &notify::Event) -> bool {
    event.paths.iter().any(|p| {
        p.extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "yml" || e == "yaml")
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_rule(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[tokio::test]
    async fn scans_directory_recursively() {
        let dir = tempfile::tempdir().unwrap();
        write_rule(
            dir.path(),
            "low.yml",
            "id: 1\nname: Low\nsimple: {type: altitude, operator: lt, value: 3000}",
        );
        std::fs::create_dir(dir.path().join("team")).unwrap();
        write_rule(
            &dir.path().join("team"),
            "fast.yaml",
            "id: 2\nname: Fast\nsimple: {type: ground_speed, operator: gt, value: 500}",
        );
        // Noise that must be ignored.
        write_rule(dir.path(), ".hidden.yml", "not yaml at all: [");
        write_rule(dir.path(), "notes.txt", "not a rule");

        let source = YamlDirSource::new(dir.path().to_path_buf());
        let rules = source.list_enabled().await.unwrap();
        let ids: Vec<u64> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn broken_file_skipped_rest_loads() {
        let dir = tempfile::tempdir().unwrap();
        write_rule(dir.path(), "bad.yml", "id: [not a number\n");
        write_rule(
            dir.path(),
            "good.yml",
            "id: 5\nname: Good\nsimple: {type: military, operator: eq, value: true}",
        );

        let source = YamlDirSource::new(dir.path().to_path_buf());
        let rules = source.list_enabled().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, 5);
    }

    #[tokio::test]
    async fn disabled_rules_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        write_rule(
            dir.path(),
            "off.yml",
            "id: 3\nname: Off\nenabled: false\nsimple: {type: military, operator: eq, value: true}",
        );

        let source = YamlDirSource::new(dir.path().to_path_buf());
        assert!(source.list_enabled().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_keep_first() {
        let dir = tempfile::tempdir().unwrap();
        write_rule(
            dir.path(),
            "a.yml",
            "id: 7\nname: First\nsimple: {type: altitude, operator: lt, value: 1000}",
        );
        write_rule(
            dir.path(),
            "b.yml",
            "id: 7\nname: Second\nsimple: {type: altitude, operator: gt, value: 1000}",
        );

        let source = YamlDirSource::new(dir.path().to_path_buf());
        let rules = source.list_enabled().await.unwrap();
        assert_eq!(rules.len(), 1);
    }
}
