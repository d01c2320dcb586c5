//! Permission store
//!
//! Durable state behind the permissions engine: grants, pending requests,
//! allowed paths, exclusion zones, the entity ACL table, and the audit log.
//!
//! The backing file is one JSON object, rewritten in full on every mutation.
//! Reads go through a short-lived cache (~5s) to avoid hammering the file;
//! this means a concurrent external edit can be masked for a few seconds and
//! two writers follow last-writer-wins. Both are known limitations carried
//! over from the system this store models.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::types::{AllowedPath, AuditEntry, PermissionGrant, PermissionRequest};

/// Default read-cache lifetime
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

/// Default audit log cap (the observed per-log limit in the modeled system)
pub const DEFAULT_AUDIT_CAP: usize = 1000;

/// Everything the store persists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub permissions: HashMap<String, PermissionGrant>,
    #[serde(default)]
    pub requests: HashMap<String, PermissionRequest>,
    #[serde(default)]
    pub audit: Vec<AuditEntry>,
    #[serde(default)]
    pub allowed_paths: Vec<AllowedPath>,
    #[serde(default)]
    pub exclusion_zones: Vec<String>,
    /// Entity ACL: entity -> "resource:action" -> allowed
    #[serde(default)]
    pub acl: HashMap<String, HashMap<String, bool>>,
}

struct Cached {
    data: StoreData,
    loaded_at: Instant,
}

/// File-backed permission store with a short read cache
pub struct PermissionStore {
    path: PathBuf,
    default_exclusions: Vec<String>,
    audit_cap: Option<usize>,
    cache_ttl: Duration,
    cache: Mutex<Option<Cached>>,
}

impl PermissionStore {
    /// Create a store backed by the given file
    pub fn new(path: impl Into<PathBuf>, default_exclusions: Vec<String>) -> Self {
        Self {
            path: path.into(),
            default_exclusions,
            audit_cap: Some(DEFAULT_AUDIT_CAP),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Mutex::new(None),
        }
    }

    /// Override the audit log cap (`None` disables capping)
    pub fn with_audit_cap(mut self, cap: Option<usize>) -> Self {
        self.audit_cap = cap;
        self
    }

    /// Override the read-cache lifetime
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn defaults(&self) -> StoreData {
        StoreData {
            exclusion_zones: self.default_exclusions.clone(),
            ..StoreData::default()
        }
    }

    fn load_from_disk(&self) -> StoreData {
        if !self.path.exists() {
            let data = self.defaults();
            // First run: materialize the file so external approvers can see it
            if let Err(e) = self.write_file(&data) {
                tracing::warn!("[PermissionStore] Failed to create store file: {}", e);
            }
            return data;
        }

        match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str::<StoreData>(&raw) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(
                        "[PermissionStore] Unreadable store at {}: {} (using safe defaults)",
                        self.path.display(),
                        e
                    );
                    self.defaults()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "[PermissionStore] Failed to read {}: {} (using safe defaults)",
                    self.path.display(),
                    e
                );
                self.defaults()
            }
        }
    }

    fn write_file(&self, data: &StoreData) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, json)
    }

    /// Read the current store contents
    ///
    /// Served from the cache when fresh; otherwise reloaded from disk.
    /// Never fails: unreadable state degrades to empty (deny-all) defaults.
    pub fn snapshot(&self) -> StoreData {
        let mut cache = self.cache.lock().unwrap();
        if let Some(cached) = cache.as_ref() {
            if cached.loaded_at.elapsed() < self.cache_ttl {
                return cached.data.clone();
            }
        }
        let data = self.load_from_disk();
        *cache = Some(Cached {
            data: data.clone(),
            loaded_at: Instant::now(),
        });
        data
    }

    /// Apply a mutation and persist the whole store
    ///
    /// The closure's return value is handed back along with whether the
    /// write succeeded. On write failure the mutation is discarded and the
    /// previous in-memory state stands.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut StoreData) -> R) -> (R, bool) {
        let mut cache = self.cache.lock().unwrap();

        let mut data = match cache.as_ref() {
            Some(cached) if cached.loaded_at.elapsed() < self.cache_ttl => cached.data.clone(),
            _ => self.load_from_disk(),
        };

        let result = f(&mut data);

        if let Some(cap) = self.audit_cap {
            if data.audit.len() > cap {
                let excess = data.audit.len() - cap;
                data.audit.drain(..excess);
            }
        }

        match self.write_file(&data) {
            Ok(()) => {
                *cache = Some(Cached {
                    data,
                    loaded_at: Instant::now(),
                });
                (result, true)
            }
            Err(e) => {
                tracing::error!("[PermissionStore] Failed to save permissions: {}", e);
                (result, false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::make_id;
    use crate::permissions::types::Target;
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> PermissionStore {
        PermissionStore::new(dir.path().join("permissions.json"), vec!["/etc".into()])
    }

    #[test]
    fn test_missing_file_yields_defaults_and_creates_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let data = store.snapshot();
        assert!(data.permissions.is_empty());
        assert_eq!(data.exclusion_zones, vec!["/etc".to_string()]);
        assert!(store.path().exists());
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("permissions.json");
        fs::write(&path, "{not valid json").unwrap();

        let store = PermissionStore::new(&path, vec!["/etc".into()]);
        let data = store.snapshot();
        assert!(data.permissions.is_empty());
        assert!(data.requests.is_empty());
    }

    #[test]
    fn test_mutation_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let (_, saved) = store.mutate(|data| {
            data.allowed_paths.push(AllowedPath {
                path: "/data".into(),
                read_only: false,
            });
        });
        assert!(saved);

        let reopened = store_in(&dir);
        let data = reopened.snapshot();
        assert_eq!(data.allowed_paths.len(), 1);
        assert_eq!(data.allowed_paths[0].path, "/data");
    }

    #[test]
    fn test_cache_masks_external_edit_until_ttl() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).with_cache_ttl(Duration::from_millis(50));

        store.snapshot();

        // External writer clobbers the file behind the cache's back
        fs::write(
            store.path().to_path_buf(),
            serde_json::to_string(&StoreData {
                allowed_paths: vec![AllowedPath {
                    path: "/sneaky".into(),
                    read_only: false,
                }],
                ..StoreData::default()
            })
            .unwrap(),
        )
        .unwrap();

        assert!(store.snapshot().allowed_paths.is_empty());

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(store.snapshot().allowed_paths.len(), 1);
    }

    #[test]
    fn test_audit_cap_drops_oldest() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir).with_audit_cap(Some(3));

        for i in 0..5 {
            store.mutate(|data| {
                data.audit.push(AuditEntry {
                    id: make_id(),
                    event: format!("event_{}", i),
                    details: json!({}),
                    ts: Utc::now(),
                });
            });
        }

        let data = store.snapshot();
        assert_eq!(data.audit.len(), 3);
        assert_eq!(data.audit[0].event, "event_2");
        assert_eq!(data.audit[2].event, "event_4");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("permissions.json");
        fs::write(&path, r#"{"allowed_paths": ["/data"]}"#).unwrap();

        let store = PermissionStore::new(&path, vec![]);
        let data = store.snapshot();
        assert_eq!(data.allowed_paths.len(), 1);
        assert!(!data.allowed_paths[0].read_only);
        assert!(data.permissions.is_empty());
        assert!(data.audit.is_empty());
    }

    #[test]
    fn test_grants_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let id = make_id();
        store.mutate(|data| {
            data.permissions.insert(
                id.clone(),
                PermissionGrant {
                    id: id.clone(),
                    action: "read_file".into(),
                    target: Target::path("/data/readme.txt"),
                    granted_by: "admin".into(),
                    granted_at: Utc::now(),
                    expires_at: None,
                    allowed: true,
                    revoked_at: None,
                },
            );
        });

        let data = store_in(&dir).snapshot();
        let grant = data.permissions.get(&id).unwrap();
        assert_eq!(grant.action, "read_file");
        assert!(grant.allowed);
    }
}
