//! CHAOS file registry engine
//!
//! CRUD over CHAOS documents stored under a dedicated directory, with a
//! keyed JSON registry of file metadata (last write wins, no invariants
//! beyond that). Every path-touching operation is gated through the
//! permissions engine and audited on both outcomes.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::bus::EventBus;
use crate::core::events;
use crate::permissions::PermissionsEngine;

use super::parser;

/// Registry metadata for one CHAOS file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaosFileRecord {
    pub filename: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryData {
    #[serde(default)]
    files: HashMap<String, ChaosFileRecord>,
}

/// CHAOS document store and analyzer
pub struct ChaosEngine {
    chaos_dir: PathBuf,
    registry_file: PathBuf,
    permissions: Arc<PermissionsEngine>,
    bus: Arc<EventBus>,
    records: Mutex<HashMap<String, ChaosFileRecord>>,
}

impl ChaosEngine {
    /// Create an engine over a chaos directory and registry file
    pub fn new(
        chaos_dir: impl Into<PathBuf>,
        registry_file: impl Into<PathBuf>,
        permissions: Arc<PermissionsEngine>,
        bus: Arc<EventBus>,
    ) -> Self {
        let registry_file = registry_file.into();
        let records = load_registry(&registry_file);
        Self {
            chaos_dir: chaos_dir.into(),
            registry_file,
            permissions,
            bus,
            records: Mutex::new(records),
        }
    }

    fn file_path(&self, filename: &str) -> Option<PathBuf> {
        // Registry filenames are flat; anything path-like is rejected
        if filename.is_empty() || filename.contains('/') || filename.contains('\\') {
            return None;
        }
        Some(self.chaos_dir.join(filename))
    }

    fn gate(&self, path: &str, operation: &str, tag: &str) -> bool {
        if self.permissions.is_path_allowed(path, operation) {
            return true;
        }
        self.permissions.audit(
            &format!("{}_denied", tag),
            json!({ "path": path, "operation": operation }),
        );
        false
    }

    fn save_registry(&self, records: &HashMap<String, ChaosFileRecord>) -> bool {
        let data = RegistryData {
            files: records.clone(),
        };
        match serde_json::to_string_pretty(&data) {
            Ok(jsonified) => match fs::write(&self.registry_file, jsonified) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("[ChaosEngine] Failed to save registry: {}", e);
                    false
                }
            },
            Err(e) => {
                tracing::error!("[ChaosEngine] Failed to serialize registry: {}", e);
                false
            }
        }
    }

    /// Create a new CHAOS file
    ///
    /// Fails if the file already exists.
    pub fn create_file(&self, filename: &str, content: &str) -> bool {
        let path = match self.file_path(filename) {
            Some(path) => path,
            None => return false,
        };
        let path_str = path.to_string_lossy().into_owned();

        if !self.gate(&path_str, "create", "chaos_create") {
            return false;
        }
        if path.exists() {
            return false;
        }
        if let Err(e) = fs::write(&path, content) {
            tracing::warn!("[ChaosEngine] Failed to write {}: {}", filename, e);
            return false;
        }

        let now = Utc::now();
        let record = ChaosFileRecord {
            filename: filename.to_string(),
            size: content.len() as u64,
            created_at: now,
            updated_at: now,
        };
        {
            let mut records = self.records.lock().unwrap();
            records.insert(filename.to_string(), record);
            self.save_registry(&records);
        }

        self.permissions.audit(
            "chaos_create_success",
            json!({ "filename": filename, "bytes": content.len() }),
        );
        self.bus.emit(
            events::CHAOS_FILE_CREATED,
            json!({ "filename": filename, "size": content.len() }),
        );
        true
    }

    /// Read a CHAOS file's content
    pub fn read_file(&self, filename: &str) -> Option<String> {
        let path = self.file_path(filename)?;
        let path_str = path.to_string_lossy().into_owned();

        if !self.gate(&path_str, "read", "chaos_read") {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(content) => {
                self.permissions.audit(
                    "chaos_read_success",
                    json!({ "filename": filename, "bytes": content.len() }),
                );
                Some(content)
            }
            Err(e) => {
                tracing::warn!("[ChaosEngine] Failed to read {}: {}", filename, e);
                None
            }
        }
    }

    /// Overwrite an existing CHAOS file
    pub fn update_file(&self, filename: &str, content: &str) -> bool {
        let path = match self.file_path(filename) {
            Some(path) => path,
            None => return false,
        };
        let path_str = path.to_string_lossy().into_owned();

        if !self.gate(&path_str, "write", "chaos_update") {
            return false;
        }
        if !path.exists() {
            return false;
        }
        if let Err(e) = fs::write(&path, content) {
            tracing::warn!("[ChaosEngine] Failed to update {}: {}", filename, e);
            return false;
        }

        {
            let mut records = self.records.lock().unwrap();
            let now = Utc::now();
            let entry = records
                .entry(filename.to_string())
                .or_insert_with(|| ChaosFileRecord {
                    filename: filename.to_string(),
                    size: 0,
                    created_at: now,
                    updated_at: now,
                });
            entry.size = content.len() as u64;
            entry.updated_at = now;
            self.save_registry(&records);
        }

        self.permissions.audit(
            "chaos_update_success",
            json!({ "filename": filename, "bytes": content.len() }),
        );
        self.bus.emit(
            events::CHAOS_FILE_UPDATED,
            json!({ "filename": filename, "size": content.len() }),
        );
        true
    }

    /// Delete a CHAOS file and its registry entry
    pub fn delete_file(&self, filename: &str) -> bool {
        let path = match self.file_path(filename) {
            Some(path) => path,
            None => return false,
        };
        let path_str = path.to_string_lossy().into_owned();

        if !self.gate(&path_str, "delete", "chaos_delete") {
            return false;
        }
        if !path.exists() {
            return false;
        }
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!("[ChaosEngine] Failed to delete {}: {}", filename, e);
            return false;
        }

        {
            let mut records = self.records.lock().unwrap();
            records.remove(filename);
            self.save_registry(&records);
        }

        self.permissions
            .audit("chaos_delete_success", json!({ "filename": filename }));
        self.bus
            .emit(events::CHAOS_FILE_DELETED, json!({ "filename": filename }));
        true
    }

    /// List registry records, alphabetical by filename
    pub fn list_files(&self) -> Vec<ChaosFileRecord> {
        let records = self.records.lock().unwrap();
        let mut list: Vec<ChaosFileRecord> = records.values().cloned().collect();
        list.sort_by(|a, b| a.filename.cmp(&b.filename));
        list
    }

    /// Registry record for one file
    pub fn file_info(&self, filename: &str) -> Option<ChaosFileRecord> {
        self.records.lock().unwrap().get(filename).cloned()
    }

    /// Parse a file and summarize its tag content
    pub fn analyze_file(&self, filename: &str) -> Option<Value> {
        let content = self.read_file(filename)?;
        let doc = parser::parse(&content)?;

        let analysis = json!({
            "filename": filename,
            "core_keys": doc.structured_core.len(),
            "emotions": doc.emotive_layer.emotions.len(),
            "symbols": doc.emotive_layer.symbols.len(),
            "relationships": doc.emotive_layer.relationships.len(),
            "chaosfield_bytes": doc.chaosfield_layer.len(),
            "document": doc,
        });

        self.bus
            .emit(events::CHAOS_ANALYZED, json!({ "filename": filename }));
        Some(analysis)
    }

    /// Filenames whose content contains the query (case-insensitive)
    pub fn search_files(&self, query: &str) -> Vec<String> {
        let dir_str = self.chaos_dir.to_string_lossy().into_owned();
        if !self.gate(&dir_str, "read", "chaos_search") {
            return Vec::new();
        }

        let needle = query.to_lowercase();
        let filenames: Vec<String> = {
            let records = self.records.lock().unwrap();
            records.keys().cloned().collect()
        };

        let mut hits = Vec::new();
        for filename in filenames {
            let path = self.chaos_dir.join(&filename);
            if let Ok(content) = fs::read_to_string(&path) {
                if content.to_lowercase().contains(&needle) {
                    hits.push(filename);
                }
            }
        }
        hits.sort();
        hits
    }

    /// Build an emotion tag, announcing it on the bus
    pub fn create_emotion_tag(&self, emotion_type: &str, intensity: &str) -> Option<String> {
        let tag = parser::create_emotion_tag(emotion_type, intensity)?;
        self.bus
            .emit(events::CHAOS_TAG_CREATED, json!({ "tag": tag }));
        Some(tag)
    }

    /// Build a symbol tag, announcing it on the bus
    pub fn create_symbol_tag(&self, symbol_type: &str, presence: &str) -> Option<String> {
        let tag = parser::create_symbol_tag(symbol_type, presence)?;
        self.bus
            .emit(events::CHAOS_TAG_CREATED, json!({ "tag": tag }));
        Some(tag)
    }

    /// Build a relationship tag, announcing it on the bus
    pub fn create_relationship_tag(
        &self,
        source: &str,
        relationship_type: &str,
        target: &str,
    ) -> Option<String> {
        let tag = parser::create_relationship_tag(source, relationship_type, target)?;
        self.bus
            .emit(events::CHAOS_TAG_CREATED, json!({ "tag": tag }));
        Some(tag)
    }
}

fn load_registry(registry_file: &PathBuf) -> HashMap<String, ChaosFileRecord> {
    if !registry_file.exists() {
        return HashMap::new();
    }
    match fs::read_to_string(registry_file) {
        Ok(raw) => match serde_json::from_str::<RegistryData>(&raw) {
            Ok(data) => data.files,
            Err(e) => {
                tracing::warn!("[ChaosEngine] Unreadable registry: {}", e);
                HashMap::new()
            }
        },
        Err(e) => {
            tracing::warn!("[ChaosEngine] Failed to read registry: {}", e);
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::PermissionStore;
    use tempfile::TempDir;

    fn engine_in(dir: &TempDir) -> ChaosEngine {
        let chaos_dir = dir.path().join("chaos_files");
        fs::create_dir_all(&chaos_dir).unwrap();

        let store = PermissionStore::new(dir.path().join("permissions.json"), vec![]);
        let permissions = Arc::new(PermissionsEngine::new(store));
        permissions.add_allowed_path(chaos_dir.to_str().unwrap(), false);

        ChaosEngine::new(
            chaos_dir,
            dir.path().join("chaos_registry.json"),
            permissions,
            Arc::new(EventBus::new()),
        )
    }

    #[test]
    fn test_create_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);

        assert!(engine.create_file("dawn.chaos", "[event]: first_light"));
        assert_eq!(
            engine.read_file("dawn.chaos").as_deref(),
            Some("[event]: first_light")
        );
        assert_eq!(engine.list_files().len(), 1);
    }

    #[test]
    fn test_create_rejects_existing_file() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);

        assert!(engine.create_file("dawn.chaos", "a"));
        assert!(!engine.create_file("dawn.chaos", "b"));
    }

    #[test]
    fn test_path_like_filenames_rejected() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);

        assert!(!engine.create_file("../escape.chaos", "x"));
        assert!(engine.read_file("a/b.chaos").is_none());
    }

    #[test]
    fn test_update_and_delete() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);

        engine.create_file("dawn.chaos", "v1");
        assert!(engine.update_file("dawn.chaos", "version two"));
        assert_eq!(engine.read_file("dawn.chaos").as_deref(), Some("version two"));
        assert_eq!(engine.file_info("dawn.chaos").unwrap().size, 11);

        assert!(engine.delete_file("dawn.chaos"));
        assert!(engine.read_file("dawn.chaos").is_none());
        assert!(engine.list_files().is_empty());
    }

    #[test]
    fn test_update_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);
        assert!(!engine.update_file("ghost.chaos", "boo"));
    }

    #[test]
    fn test_denied_without_allowed_path() {
        let dir = TempDir::new().unwrap();
        let chaos_dir = dir.path().join("chaos_files");
        fs::create_dir(&chaos_dir).unwrap();

        let store = PermissionStore::new(dir.path().join("permissions.json"), vec![]);
        let permissions = Arc::new(PermissionsEngine::new(store));
        let engine = ChaosEngine::new(
            chaos_dir,
            dir.path().join("chaos_registry.json"),
            permissions.clone(),
            Arc::new(EventBus::new()),
        );

        assert!(!engine.create_file("dawn.chaos", "x"));
        let denied = permissions
            .audit_log(10)
            .into_iter()
            .filter(|e| e.event == "chaos_create_denied")
            .count();
        assert_eq!(denied, 1);
    }

    #[test]
    fn test_analyze_counts_tags() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);

        engine.create_file(
            "dawn.chaos",
            "[event]: x\n---EMOTIVE_LAYER---\n[EMOTION:JOY:HIGH]\n[SYMBOL:FIRE:WEAK]",
        );
        let analysis = engine.analyze_file("dawn.chaos").unwrap();
        assert_eq!(analysis["emotions"], 1);
        assert_eq!(analysis["symbols"], 1);
        assert_eq!(analysis["relationships"], 0);
        assert_eq!(analysis["core_keys"], 1);
    }

    #[test]
    fn test_search_files() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);

        engine.create_file("a.chaos", "the water burned orange");
        engine.create_file("b.chaos", "nothing here");
        assert_eq!(engine.search_files("ORANGE"), vec!["a.chaos".to_string()]);
        assert!(engine.search_files("absent").is_empty());
    }

    #[test]
    fn test_registry_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        {
            let engine = engine_in(&dir);
            engine.create_file("keep.chaos", "persisted");
        }
        let reopened = engine_in(&dir);
        assert_eq!(reopened.list_files().len(), 1);
        assert_eq!(reopened.list_files()[0].filename, "keep.chaos");
    }
}
