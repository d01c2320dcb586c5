//! Filesystem engine
//!
//! Gated file I/O. Every operation checks the permissions engine with the
//! proper operation tag, audits both outcomes, and announces successful
//! mutations on the bus. Failures come back as `false`/`None`, never as
//! errors.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::bus::EventBus;
use crate::core::events;
use crate::permissions::PermissionsEngine;

/// Cap on `find_files` results
const FIND_MAX_RESULTS: usize = 100;

/// Cap on `map_directory` recursion depth
const MAP_MAX_DEPTH: usize = 5;

/// Gated filesystem operations
pub struct FilesystemEngine {
    permissions: Arc<PermissionsEngine>,
    bus: Arc<EventBus>,
}

impl FilesystemEngine {
    /// Create an engine over the shared permissions and bus
    pub fn new(permissions: Arc<PermissionsEngine>, bus: Arc<EventBus>) -> Self {
        Self { permissions, bus }
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

    /// Read a file as UTF-8 text
    pub fn read_file(&self, path: &str) -> Option<String> {
        if !self.gate(path, "read", "fs_read") {
            return None;
        }
        match fs::read_to_string(path) {
            Ok(content) => {
                self.permissions.audit(
                    "fs_read_success",
                    json!({ "path": path, "bytes": content.len() }),
                );
                self.bus
                    .emit(events::FS_READ, json!({ "path": path, "bytes": content.len() }));
                Some(content)
            }
            Err(e) => {
                tracing::warn!("[FilesystemEngine] Failed to read {}: {}", path, e);
                None
            }
        }
    }

    /// Write (create or overwrite) a file, creating parent directories
    pub fn write_file(&self, path: &str, content: &str) -> bool {
        if !self.gate(path, "write", "fs_write") {
            return false;
        }
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!("[FilesystemEngine] Failed to create {}: {}", parent.display(), e);
                    return false;
                }
            }
        }
        match fs::write(path, content) {
            Ok(()) => {
                self.permissions.audit(
                    "fs_write_success",
                    json!({ "path": path, "bytes": content.len() }),
                );
                self.bus.emit(
                    events::FS_WRITTEN,
                    json!({ "path": path, "bytes": content.len() }),
                );
                true
            }
            Err(e) => {
                tracing::warn!("[FilesystemEngine] Failed to write {}: {}", path, e);
                false
            }
        }
    }

    /// Append text to a file, creating it if absent
    pub fn append_file(&self, path: &str, content: &str) -> bool {
        if !self.gate(path, "append", "fs_append") {
            return false;
        }
        use std::io::Write;
        let result = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(content.as_bytes()));
        match result {
            Ok(()) => {
                self.permissions.audit(
                    "fs_append_success",
                    json!({ "path": path, "bytes": content.len() }),
                );
                self.bus.emit(
                    events::FS_WRITTEN,
                    json!({ "path": path, "bytes": content.len() }),
                );
                true
            }
            Err(e) => {
                tracing::warn!("[FilesystemEngine] Failed to append {}: {}", path, e);
                false
            }
        }
    }

    /// Delete a file
    pub fn delete_file(&self, path: &str) -> bool {
        if !self.gate(path, "delete", "fs_delete") {
            return false;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                self.permissions
                    .audit("fs_delete_success", json!({ "path": path }));
                self.bus.emit(events::FS_DELETED, json!({ "path": path }));
                true
            }
            Err(e) => {
                tracing::warn!("[FilesystemEngine] Failed to delete {}: {}", path, e);
                false
            }
        }
    }

    /// Move a file; both endpoints must be allowed
    pub fn move_file(&self, source: &str, destination: &str) -> bool {
        if !self.gate(source, "move", "fs_move") || !self.gate(destination, "move", "fs_move") {
            return false;
        }
        if !self.transfer(source, destination) {
            return false;
        }
        self.permissions.audit(
            "fs_move_success",
            json!({ "source": source, "dest": destination }),
        );
        self.bus.emit(
            events::FS_MOVED,
            json!({ "source": source, "destination": destination }),
        );
        true
    }

    /// Copy a file; source needs read, destination needs write
    pub fn copy_file(&self, source: &str, destination: &str) -> bool {
        if !self.gate(source, "read", "fs_copy") || !self.gate(destination, "copy", "fs_copy") {
            return false;
        }
        if let Some(parent) = Path::new(destination).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if fs::create_dir_all(parent).is_err() {
                    return false;
                }
            }
        }
        match fs::copy(source, destination) {
            Ok(bytes) => {
                self.permissions.audit(
                    "fs_copy_success",
                    json!({ "source": source, "dest": destination, "bytes": bytes }),
                );
                self.bus.emit(
                    events::FS_WRITTEN,
                    json!({ "path": destination, "bytes": bytes }),
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    "[FilesystemEngine] Failed to copy {} -> {}: {}",
                    source,
                    destination,
                    e
                );
                false
            }
        }
    }

    /// Rename a file in place
    pub fn rename_file(&self, path: &str, new_name: &str) -> bool {
        if new_name.is_empty() || new_name.contains('/') || new_name.contains('\\') {
            return false;
        }
        let parent = match Path::new(path).parent() {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::new(),
        };
        let destination = parent.join(new_name).to_string_lossy().into_owned();

        if !self.gate(path, "rename", "fs_rename") || !self.gate(&destination, "rename", "fs_rename")
        {
            return false;
        }
        if !self.transfer(path, &destination) {
            return false;
        }
        self.permissions.audit(
            "fs_rename_success",
            json!({ "source": path, "dest": destination }),
        );
        self.bus.emit(
            events::FS_MOVED,
            json!({ "source": path, "destination": destination }),
        );
        true
    }

    fn transfer(&self, source: &str, destination: &str) -> bool {
        if let Some(parent) = Path::new(destination).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if fs::create_dir_all(parent).is_err() {
                    return false;
                }
            }
        }
        match fs::rename(source, destination) {
            Ok(()) => true,
            // Rename fails across filesystems; fall back to copy + remove
            Err(_) => match fs::copy(source, destination) {
                Ok(_) => fs::remove_file(source).is_ok(),
                Err(e) => {
                    tracing::warn!(
                        "[FilesystemEngine] Failed to move {} -> {}: {}",
                        source,
                        destination,
                        e
                    );
                    false
                }
            },
        }
    }

    /// Create a directory (and missing parents)
    pub fn create_directory(&self, path: &str) -> bool {
        if !self.gate(path, "create", "fs_mkdir") {
            return false;
        }
        match fs::create_dir_all(path) {
            Ok(()) => {
                self.permissions
                    .audit("fs_mkdir_success", json!({ "path": path }));
                true
            }
            Err(e) => {
                tracing::warn!("[FilesystemEngine] Failed to create dir {}: {}", path, e);
                false
            }
        }
    }

    /// List one directory level
    pub fn list_directory(&self, path: &str) -> Vec<Value> {
        if !self.gate(path, "read", "fs_list") {
            return Vec::new();
        }
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("[FilesystemEngine] Failed to list {}: {}", path, e);
                return Vec::new();
            }
        };

        let mut listing = Vec::new();
        for entry in entries.flatten() {
            let entry_path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = entry.metadata().ok();
            listing.push(json!({
                "name": name,
                "path": entry_path.to_string_lossy(),
                "kind": if entry_path.is_dir() { "directory" } else { "file" },
                "size": meta.as_ref().map(|m| m.len()),
                "modified": meta.and_then(|m| m.modified().ok()).map(system_time_iso),
            }));
        }
        listing.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        self.permissions.audit(
            "fs_list_success",
            json!({ "path": path, "entries": listing.len() }),
        );
        listing
    }

    /// Find files by name pattern and optional content pattern
    ///
    /// Name patterns are globs (`*.txt`); content patterns are regexes.
    /// Results are capped at 100 matches.
    pub fn find_files(
        &self,
        search_dir: &str,
        name_pattern: &str,
        content_pattern: Option<&str>,
    ) -> Vec<Value> {
        if !self.gate(search_dir, "read", "fs_find") {
            return Vec::new();
        }
        let glob_pattern = match glob::Pattern::new(name_pattern) {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::warn!("[FilesystemEngine] Bad name pattern '{}': {}", name_pattern, e);
                return Vec::new();
            }
        };
        let content_regex = match content_pattern {
            Some(raw) => match regex::Regex::new(raw) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("[FilesystemEngine] Bad content pattern '{}': {}", raw, e);
                    return Vec::new();
                }
            },
            None => None,
        };

        let mut results = Vec::new();
        let mut stack = vec![PathBuf::from(search_dir)];
        while let Some(dir) = stack.pop() {
            if results.len() >= FIND_MAX_RESULTS {
                break;
            }
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                if results.len() >= FIND_MAX_RESULTS {
                    break;
                }
                let entry_path = entry.path();
                if entry_path.is_dir() {
                    stack.push(entry_path);
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if !glob_pattern.matches(&name) {
                    continue;
                }
                if let Some(re) = &content_regex {
                    match fs::read_to_string(&entry_path) {
                        Ok(content) if re.is_match(&content) => {}
                        _ => continue,
                    }
                }
                let size = entry.metadata().map(|m| m.len()).ok();
                results.push(json!({
                    "name": name,
                    "path": entry_path.to_string_lossy(),
                    "size": size,
                }));
            }
        }

        self.permissions.audit(
            "fs_find_success",
            json!({ "path": search_dir, "pattern": name_pattern, "matches": results.len() }),
        );
        results
    }

    /// Recursive directory tree, depth-bounded
    pub fn map_directory(&self, path: &str) -> Option<Value> {
        if !self.gate(path, "read", "fs_map") {
            return None;
        }
        let tree = map_recursive(Path::new(path), 0);
        self.permissions
            .audit("fs_map_success", json!({ "path": path }));
        self.bus.emit(events::FS_MAPPED, json!({ "path": path }));
        Some(tree)
    }

    /// Size/timestamps/kind for one path
    pub fn file_info(&self, path: &str) -> Option<Value> {
        if !self.gate(path, "read", "fs_info") {
            return None;
        }
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("[FilesystemEngine] Failed to stat {}: {}", path, e);
                return None;
            }
        };
        self.permissions
            .audit("fs_info_success", json!({ "path": path }));
        Some(json!({
            "path": path,
            "kind": if meta.is_dir() { "directory" } else { "file" },
            "size": meta.len(),
            "readonly": meta.permissions().readonly(),
            "modified": meta.modified().ok().map(system_time_iso),
            "created": meta.created().ok().map(system_time_iso),
        }))
    }
}

fn map_recursive(path: &Path, depth: usize) -> Value {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    if !path.is_dir() {
        let size = fs::metadata(path).map(|m| m.len()).ok();
        return json!({ "name": name, "kind": "file", "size": size });
    }
    if depth >= MAP_MAX_DEPTH {
        return json!({ "name": name, "kind": "directory", "truncated": true });
    }

    let mut children = Vec::new();
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            children.push(map_recursive(&entry.path(), depth + 1));
        }
    }
    children.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
    json!({ "name": name, "kind": "directory", "children": children })
}

fn system_time_iso(time: std::time::SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}
