//! Media registry engine
//!
//! Keyed JSON registry of media files with lightweight metadata: size,
//! mime type inferred from the extension, and a content hash. Registration
//! reads the file and is therefore gated as a read. Last write wins; the
//! registry carries no invariants beyond that.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::bus::EventBus;
use crate::core::{events, hex_digest, make_id};
use crate::permissions::PermissionsEngine;

/// One registered media file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: String,
    pub filename: String,
    pub path: String,
    pub size: u64,
    pub mime_type: String,
    pub sha256: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryData {
    #[serde(default)]
    media: HashMap<String, MediaRecord>,
}

/// Media registry over a JSON file
pub struct MediaEngine {
    registry_file: PathBuf,
    permissions: Arc<PermissionsEngine>,
    bus: Arc<EventBus>,
    records: Mutex<HashMap<String, MediaRecord>>,
}

impl MediaEngine {
    /// Create an engine over a registry file
    pub fn new(
        registry_file: impl Into<PathBuf>,
        permissions: Arc<PermissionsEngine>,
        bus: Arc<EventBus>,
    ) -> Self {
        let registry_file = registry_file.into();
        let records = load_registry(&registry_file);
        Self {
            registry_file,
            permissions,
            bus,
            records: Mutex::new(records),
        }
    }

    fn save(&self, records: &HashMap<String, MediaRecord>) -> bool {
        let data = RegistryData {
            media: records.clone(),
        };
        match serde_json::to_string_pretty(&data) {
            Ok(jsonified) => match fs::write(&self.registry_file, jsonified) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("[MediaEngine] Failed to save registry: {}", e);
                    false
                }
            },
            Err(e) => {
                tracing::error!("[MediaEngine] Failed to serialize registry: {}", e);
                false
            }
        }
    }

    /// Register a media file, extracting lightweight metadata
    ///
    /// Returns the new media id, or `None` when denied or unreadable.
    pub fn register_media(
        &self,
        path: &str,
        tags: Vec<String>,
        description: Option<String>,
    ) -> Option<String> {
        if !self.permissions.is_path_allowed(path, "read") {
            self.permissions
                .audit("media_register_denied", json!({ "path": path }));
            return None;
        }

        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("[MediaEngine] Failed to read {}: {}", path, e);
                return None;
            }
        };

        let filename = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        let record = MediaRecord {
            id: make_id(),
            filename: filename.clone(),
            path: path.to_string(),
            size: content.len() as u64,
            mime_type: mime_for_path(path).to_string(),
            sha256: hex_digest(&Sha256::digest(&content)),
            tags,
            description,
            registered_at: Utc::now(),
        };
        let media_id = record.id.clone();

        {
            let mut records = self.records.lock().unwrap();
            records.insert(media_id.clone(), record);
            self.save(&records);
        }

        self.permissions.audit(
            "media_register_success",
            json!({ "media_id": media_id, "path": path }),
        );
        self.bus.emit(
            events::MEDIA_REGISTERED,
            json!({ "media_id": media_id, "filename": filename }),
        );
        Some(media_id)
    }

    /// Look up one record
    pub fn media_info(&self, media_id: &str) -> Option<MediaRecord> {
        self.records.lock().unwrap().get(media_id).cloned()
    }

    /// Replace a record's tags
    pub fn update_tags(&self, media_id: &str, tags: Vec<String>) -> bool {
        let updated = {
            let mut records = self.records.lock().unwrap();
            match records.get_mut(media_id) {
                Some(record) => {
                    record.tags = tags;
                    self.save(&records)
                }
                None => return false,
            }
        };
        if updated {
            self.bus
                .emit(events::MEDIA_TAG_UPDATED, json!({ "media_id": media_id }));
        }
        updated
    }

    /// Add one tag (no duplicates)
    pub fn add_tag(&self, media_id: &str, tag: &str) -> bool {
        let updated = {
            let mut records = self.records.lock().unwrap();
            match records.get_mut(media_id) {
                Some(record) => {
                    if !record.tags.iter().any(|t| t == tag) {
                        record.tags.push(tag.to_string());
                    }
                    self.save(&records)
                }
                None => return false,
            }
        };
        if updated {
            self.bus.emit(
                events::MEDIA_TAG_UPDATED,
                json!({ "media_id": media_id, "tag": tag }),
            );
        }
        updated
    }

    /// Remove one tag
    pub fn remove_tag(&self, media_id: &str, tag: &str) -> bool {
        let updated = {
            let mut records = self.records.lock().unwrap();
            match records.get_mut(media_id) {
                Some(record) => {
                    record.tags.retain(|t| t != tag);
                    self.save(&records)
                }
                None => return false,
            }
        };
        if updated {
            self.bus.emit(
                events::MEDIA_TAG_UPDATED,
                json!({ "media_id": media_id, "tag": tag }),
            );
        }
        updated
    }

    /// Search by free-text query, tags, and mime prefix
    ///
    /// All given criteria must match. The query is matched against filename
    /// and description, case-insensitive.
    pub fn search_media(
        &self,
        query: Option<&str>,
        tags: &[String],
        mime_prefix: Option<&str>,
        limit: usize,
    ) -> Vec<MediaRecord> {
        let records = self.records.lock().unwrap();
        let needle = query.map(|q| q.to_lowercase());

        let mut hits: Vec<MediaRecord> = records
            .values()
            .filter(|record| {
                if let Some(needle) = &needle {
                    let in_name = record.filename.to_lowercase().contains(needle);
                    let in_desc = record
                        .description
                        .as_ref()
                        .map(|d| d.to_lowercase().contains(needle))
                        .unwrap_or(false);
                    if !in_name && !in_desc {
                        return false;
                    }
                }
                if !tags.iter().all(|tag| record.tags.contains(tag)) {
                    return false;
                }
                if let Some(prefix) = mime_prefix {
                    if !record.mime_type.starts_with(prefix) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        hits.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        hits.truncate(limit);
        hits
    }

    /// All records, newest first
    pub fn list_media(&self, limit: usize) -> Vec<MediaRecord> {
        let records = self.records.lock().unwrap();
        let mut list: Vec<MediaRecord> = records.values().cloned().collect();
        list.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        list.truncate(limit);
        list
    }

    /// Delete a record, optionally the backing file too
    pub fn delete_media(&self, media_id: &str, delete_file: bool) -> bool {
        let record = {
            let records = self.records.lock().unwrap();
            match records.get(media_id) {
                Some(record) => record.clone(),
                None => return false,
            }
        };

        if delete_file {
            if !self.permissions.is_path_allowed(&record.path, "delete") {
                self.permissions
                    .audit("media_delete_denied", json!({ "path": record.path }));
                return false;
            }
            if let Err(e) = fs::remove_file(&record.path) {
                tracing::warn!("[MediaEngine] Failed to delete {}: {}", record.path, e);
            }
        }

        {
            let mut records = self.records.lock().unwrap();
            records.remove(media_id);
            self.save(&records);
        }

        self.permissions.audit(
            "media_delete_success",
            json!({ "media_id": media_id, "file_deleted": delete_file }),
        );
        self.bus
            .emit(events::MEDIA_DELETED, json!({ "media_id": media_id }));
        true
    }

    /// Aggregate registry statistics
    pub fn registry_stats(&self) -> Value {
        let records = self.records.lock().unwrap();
        let total_size: u64 = records.values().map(|r| r.size).sum();
        let mut by_mime: HashMap<String, usize> = HashMap::new();
        for record in records.values() {
            *by_mime.entry(record.mime_type.clone()).or_default() += 1;
        }
        json!({
            "count": records.len(),
            "total_size": total_size,
            "by_mime": by_mime,
        })
    }
}

fn load_registry(registry_file: &PathBuf) -> HashMap<String, MediaRecord> {
    if !registry_file.exists() {
        return HashMap::new();
    }
    match fs::read_to_string(registry_file) {
        Ok(raw) => match serde_json::from_str::<RegistryData>(&raw) {
            Ok(data) => data.media,
            Err(e) => {
                tracing::warn!("[MediaEngine] Unreadable registry: {}", e);
                HashMap::new()
            }
        },
        Err(e) => {
            tracing::warn!("[MediaEngine] Failed to read registry: {}", e);
            HashMap::new()
        }
    }
}

/// Mime type by file extension; unknown extensions are opaque bytes
fn mime_for_path(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::PermissionStore;
    use tempfile::TempDir;

    fn engine_in(dir: &TempDir) -> MediaEngine {
        let store = PermissionStore::new(dir.path().join("permissions.json"), vec![]);
        let permissions = Arc::new(PermissionsEngine::new(store));
        permissions.add_allowed_path(dir.path().to_str().unwrap(), false);
        MediaEngine::new(
            dir.path().join("media_registry.json"),
            permissions,
            Arc::new(EventBus::new()),
        )
    }

    fn seed_file(dir: &TempDir, name: &str, content: &[u8]) -> String {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_register_extracts_metadata() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);
        let path = seed_file(&dir, "sunset.png", b"not really a png");

        let media_id = engine
            .register_media(&path, vec!["sky".into()], Some("evening".into()))
            .unwrap();
        let record = engine.media_info(&media_id).unwrap();
        assert_eq!(record.filename, "sunset.png");
        assert_eq!(record.mime_type, "image/png");
        assert_eq!(record.size, 16);
        assert_eq!(record.sha256.len(), 64);
        assert_eq!(record.tags, vec!["sky".to_string()]);
    }

    #[test]
    fn test_register_denied_outside_allowed_paths() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let engine = engine_in(&dir);
        let path = seed_file(&other, "outside.png", b"x");

        assert!(engine.register_media(&path, vec![], None).is_none());
    }

    #[test]
    fn test_tag_updates() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);
        let path = seed_file(&dir, "clip.mp4", b"video");
        let media_id = engine.register_media(&path, vec![], None).unwrap();

        assert!(engine.add_tag(&media_id, "short"));
        assert!(engine.add_tag(&media_id, "short")); // no duplicate
        assert_eq!(engine.media_info(&media_id).unwrap().tags, vec!["short"]);

        assert!(engine.remove_tag(&media_id, "short"));
        assert!(engine.media_info(&media_id).unwrap().tags.is_empty());

        assert!(engine.update_tags(&media_id, vec!["a".into(), "b".into()]));
        assert_eq!(engine.media_info(&media_id).unwrap().tags.len(), 2);

        assert!(!engine.add_tag("missing", "x"));
    }

    #[test]
    fn test_search_by_query_tags_and_mime() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);
        let image = seed_file(&dir, "sunset.png", b"1");
        let song = seed_file(&dir, "anthem.mp3", b"2");
        engine
            .register_media(&image, vec!["sky".into()], Some("an evening sky".into()))
            .unwrap();
        engine.register_media(&song, vec!["loud".into()], None).unwrap();

        assert_eq!(engine.search_media(Some("SUNSET"), &[], None, 10).len(), 1);
        assert_eq!(engine.search_media(Some("evening"), &[], None, 10).len(), 1);
        assert_eq!(
            engine
                .search_media(None, &["loud".to_string()], None, 10)
                .len(),
            1
        );
        assert_eq!(engine.search_media(None, &[], Some("image/"), 10).len(), 1);
        assert!(engine
            .search_media(Some("sunset"), &[], Some("audio/"), 10)
            .is_empty());
    }

    #[test]
    fn test_delete_media_keeps_file_by_default() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);
        let path = seed_file(&dir, "keep.txt", b"data");
        let media_id = engine.register_media(&path, vec![], None).unwrap();

        assert!(engine.delete_media(&media_id, false));
        assert!(engine.media_info(&media_id).is_none());
        assert!(Path::new(&path).exists());
    }

    #[test]
    fn test_delete_media_with_file() {
        let dir = TempDir::new().unwrap();
        let engine = engine_in(&dir);
        let path = seed_file(&dir, "gone.txt", b"data");
        let media_id = engine.register_media(&path, vec![], None).unwrap();

        assert!(engine.delete_media(&media_id, true));
        assert!(!Path::new(&path).exists());
    }

    #[test]
    fn test_registry_persists_and_stats() {
        let dir = TempDir::new().unwrap();
        {
            let engine = engine_in(&dir);
            let path = seed_file(&dir, "a.png", b"12345");
            engine.register_media(&path, vec![], None).unwrap();
        }
        let reopened = engine_in(&dir);
        assert_eq!(reopened.list_media(10).len(), 1);

        let stats = reopened.registry_stats();
        assert_eq!(stats["count"], 1);
        assert_eq!(stats["total_size"], 5);
        assert_eq!(stats["by_mime"]["image/png"], 1);
    }
}
