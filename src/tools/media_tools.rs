//! Media tool adapters

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engines::MediaEngine;

use super::tool::{optional_bool, optional_i64, optional_str, optional_str_vec, required_str, HubTool, ToolResult};

/// Register a media file
pub struct RegisterMediaTool {
    media: Arc<MediaEngine>,
}

impl RegisterMediaTool {
    pub fn new(media: Arc<MediaEngine>) -> Self {
        Self { media }
    }
}

#[async_trait]
impl HubTool for RegisterMediaTool {
    fn name(&self) -> &str {
        "register_media"
    }

    fn description(&self) -> &str {
        "Register a media file and extract lightweight metadata"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        let tags = optional_str_vec(args, "tags");
        let description = optional_str(args, "description").map(|s| s.to_string());

        match self.media.register_media(path, tags, description) {
            Some(media_id) => Ok(ToolResult::json(&json!({
                "status": "registered",
                "media_id": media_id,
            }))),
            None => Ok(ToolResult::error(format!("Cannot register {}", path))),
        }
    }
}

/// List registered media, newest first
pub struct ListMediaFilesTool {
    media: Arc<MediaEngine>,
}

impl ListMediaFilesTool {
    pub fn new(media: Arc<MediaEngine>) -> Self {
        Self { media }
    }
}

#[async_trait]
impl HubTool for ListMediaFilesTool {
    fn name(&self) -> &str {
        "list_media_files"
    }

    fn description(&self) -> &str {
        "List registered media files, newest first"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let limit = optional_i64(args, "limit").unwrap_or(100).max(0) as usize;
        let media = self.media.list_media(limit);
        Ok(ToolResult::json(&json!({ "media": media })))
    }
}

/// Full record for one media id
pub struct GetMediaInfoTool {
    media: Arc<MediaEngine>,
}

impl GetMediaInfoTool {
    pub fn new(media: Arc<MediaEngine>) -> Self {
        Self { media }
    }
}

#[async_trait]
impl HubTool for GetMediaInfoTool {
    fn name(&self) -> &str {
        "get_media_file_info"
    }

    fn description(&self) -> &str {
        "Get the registry record for one media id"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let media_id = required_str(args, "media_id")?;
        match self.media.media_info(media_id) {
            Some(record) => Ok(ToolResult::json(&serde_json::to_value(record)?)),
            None => Ok(ToolResult::error(format!("Unknown media id: {}", media_id))),
        }
    }
}

/// Search media by query, tags, and mime prefix
pub struct SearchMediaTool {
    media: Arc<MediaEngine>,
}

impl SearchMediaTool {
    pub fn new(media: Arc<MediaEngine>) -> Self {
        Self { media }
    }
}

#[async_trait]
impl HubTool for SearchMediaTool {
    fn name(&self) -> &str {
        "search_media"
    }

    fn description(&self) -> &str {
        "Search registered media by query, tags, and mime prefix"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let query = optional_str(args, "query");
        let tags = optional_str_vec(args, "tags");
        let mime = optional_str(args, "mime_type");
        let limit = optional_i64(args, "limit").unwrap_or(50).max(0) as usize;

        let hits = self.media.search_media(query, &tags, mime, limit);
        Ok(ToolResult::json(&json!({ "matches": hits })))
    }
}

/// Add a tag to a media record
pub struct AddMediaTagTool {
    media: Arc<MediaEngine>,
}

impl AddMediaTagTool {
    pub fn new(media: Arc<MediaEngine>) -> Self {
        Self { media }
    }
}

#[async_trait]
impl HubTool for AddMediaTagTool {
    fn name(&self) -> &str {
        "add_media_tag"
    }

    fn description(&self) -> &str {
        "Add a tag to a media record"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let media_id = required_str(args, "media_id")?;
        let tag = required_str(args, "tag")?;
        if self.media.add_tag(media_id, tag) {
            Ok(ToolResult::success(format!("Tag '{}' added", tag)))
        } else {
            Ok(ToolResult::error(format!("Unknown media id: {}", media_id)))
        }
    }
}

/// Remove a tag from a media record
pub struct RemoveMediaTagTool {
    media: Arc<MediaEngine>,
}

impl RemoveMediaTagTool {
    pub fn new(media: Arc<MediaEngine>) -> Self {
        Self { media }
    }
}

#[async_trait]
impl HubTool for RemoveMediaTagTool {
    fn name(&self) -> &str {
        "remove_media_tag"
    }

    fn description(&self) -> &str {
        "Remove a tag from a media record"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let media_id = required_str(args, "media_id")?;
        let tag = required_str(args, "tag")?;
        if self.media.remove_tag(media_id, tag) {
            Ok(ToolResult::success(format!("Tag '{}' removed", tag)))
        } else {
            Ok(ToolResult::error(format!("Unknown media id: {}", media_id)))
        }
    }
}

/// Delete a media record
pub struct DeleteMediaTool {
    media: Arc<MediaEngine>,
}

impl DeleteMediaTool {
    pub fn new(media: Arc<MediaEngine>) -> Self {
        Self { media }
    }
}

#[async_trait]
impl HubTool for DeleteMediaTool {
    fn name(&self) -> &str {
        "delete_media"
    }

    fn description(&self) -> &str {
        "Delete a media record, optionally with its backing file"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let media_id = required_str(args, "media_id")?;
        let delete_file = optional_bool(args, "delete_file").unwrap_or(false);
        if self.media.delete_media(media_id, delete_file) {
            Ok(ToolResult::success(format!("Media {} deleted", media_id)))
        } else {
            Ok(ToolResult::error(format!("Cannot delete {}", media_id)))
        }
    }
}

/// Registry statistics
pub struct MediaStatsTool {
    media: Arc<MediaEngine>,
}

impl MediaStatsTool {
    pub fn new(media: Arc<MediaEngine>) -> Self {
        Self { media }
    }
}

#[async_trait]
impl HubTool for MediaStatsTool {
    fn name(&self) -> &str {
        "media_stats"
    }

    fn description(&self) -> &str {
        "Aggregate statistics over the media registry"
    }

    async fn execute(&self, _args: &Value) -> Result<ToolResult> {
        Ok(ToolResult::json(&self.media.registry_stats()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::permissions::{PermissionStore, PermissionsEngine};
    use tempfile::TempDir;

    fn media_in(dir: &TempDir) -> Arc<MediaEngine> {
        let store = PermissionStore::new(dir.path().join("permissions.json"), vec![]);
        let permissions = Arc::new(PermissionsEngine::new(store));
        permissions.add_allowed_path(dir.path().to_str().unwrap(), false);
        Arc::new(MediaEngine::new(
            dir.path().join("media_registry.json"),
            permissions,
            Arc::new(EventBus::new()),
        ))
    }

    #[tokio::test]
    async fn test_register_and_search_flow() {
        let dir = TempDir::new().unwrap();
        let media = media_in(&dir);
        let path = dir.path().join("sunset.png");
        std::fs::write(&path, b"pixels").unwrap();

        let registered = RegisterMediaTool::new(media.clone())
            .execute(&json!({
                "path": path.to_str().unwrap(),
                "tags": ["sky"],
                "description": "an evening sky",
            }))
            .await
            .unwrap();
        assert!(!registered.is_error);
        let body: Value = serde_json::from_str(&registered.output).unwrap();
        let media_id = body["media_id"].as_str().unwrap().to_string();

        let info = GetMediaInfoTool::new(media.clone())
            .execute(&json!({"media_id": media_id}))
            .await
            .unwrap();
        let record: Value = serde_json::from_str(&info.output).unwrap();
        assert_eq!(record["mime_type"], "image/png");

        let search = SearchMediaTool::new(media)
            .execute(&json!({"query": "evening"}))
            .await
            .unwrap();
        let hits: Value = serde_json::from_str(&search.output).unwrap();
        assert_eq!(hits["matches"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_media_id() {
        let dir = TempDir::new().unwrap();
        let media = media_in(&dir);
        let result = GetMediaInfoTool::new(media)
            .execute(&json!({"media_id": "nope"}))
            .await
            .unwrap();
        assert!(result.is_error);
    }
}
