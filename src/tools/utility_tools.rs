//! Utility tool adapters

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engines::UtilityEngine;

use super::tool::{optional_i64, optional_str, required_str, HubTool, ToolResult};

/// Hash a file
pub struct CalculateChecksumTool {
    utility: Arc<UtilityEngine>,
}

impl CalculateChecksumTool {
    pub fn new(utility: Arc<UtilityEngine>) -> Self {
        Self { utility }
    }
}

#[async_trait]
impl HubTool for CalculateChecksumTool {
    fn name(&self) -> &str {
        "calculate_checksum"
    }

    fn description(&self) -> &str {
        "Hash an allowed file with sha256 or sha1"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "filepath")?;
        let algorithm = optional_str(args, "algorithm").unwrap_or("sha256");
        match self.utility.calculate_checksum(path, algorithm) {
            Some(checksum) => Ok(ToolResult::json(&json!({
                "path": path,
                "algorithm": algorithm,
                "checksum": checksum,
            }))),
            None => Ok(ToolResult::error(format!("Cannot checksum {}", path))),
        }
    }
}

/// Verify a file hash
pub struct VerifyChecksumTool {
    utility: Arc<UtilityEngine>,
}

impl VerifyChecksumTool {
    pub fn new(utility: Arc<UtilityEngine>) -> Self {
        Self { utility }
    }
}

#[async_trait]
impl HubTool for VerifyChecksumTool {
    fn name(&self) -> &str {
        "verify_checksum"
    }

    fn description(&self) -> &str {
        "Compare an allowed file's hash against an expected value"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "filepath")?;
        let expected = required_str(args, "expected")?;
        let algorithm = optional_str(args, "algorithm").unwrap_or("sha256");
        let matches = self.utility.verify_checksum(path, expected, algorithm);
        Ok(ToolResult::json(&json!({ "path": path, "matches": matches })))
    }
}

/// File metadata lookup
pub struct GetFileMetadataTool {
    utility: Arc<UtilityEngine>,
}

impl GetFileMetadataTool {
    pub fn new(utility: Arc<UtilityEngine>) -> Self {
        Self { utility }
    }
}

#[async_trait]
impl HubTool for GetFileMetadataTool {
    fn name(&self) -> &str {
        "get_file_metadata"
    }

    fn description(&self) -> &str {
        "Size, timestamps, and extension for an allowed file"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "filepath")?;
        match self.utility.file_metadata(path) {
            Some(metadata) => Ok(ToolResult::json(&metadata)),
            None => Ok(ToolResult::error(format!("Cannot stat {}", path))),
        }
    }
}

/// Git working-tree status
pub struct GitStatusTool {
    utility: Arc<UtilityEngine>,
}

impl GitStatusTool {
    pub fn new(utility: Arc<UtilityEngine>) -> Self {
        Self { utility }
    }
}

#[async_trait]
impl HubTool for GitStatusTool {
    fn name(&self) -> &str {
        "git_status"
    }

    fn description(&self) -> &str {
        "Branch and change counts for an allowed git repository"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let repo = optional_str(args, "repo_path").unwrap_or(".");
        match self.utility.git_status(repo) {
            Some(status) => Ok(ToolResult::json(&status)),
            None => Ok(ToolResult::error(format!("Not a readable git repo: {}", repo))),
        }
    }
}

/// Recent git commits
pub struct GitLogTool {
    utility: Arc<UtilityEngine>,
}

impl GitLogTool {
    pub fn new(utility: Arc<UtilityEngine>) -> Self {
        Self { utility }
    }
}

#[async_trait]
impl HubTool for GitLogTool {
    fn name(&self) -> &str {
        "git_log"
    }

    fn description(&self) -> &str {
        "Recent commits for an allowed git repository"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let repo = optional_str(args, "repo_path").unwrap_or(".");
        let limit = optional_i64(args, "limit").unwrap_or(10).max(0) as usize;
        let commits = self.utility.git_log(repo, limit);
        Ok(ToolResult::json(&json!({ "commits": commits })))
    }
}

/// Pack a path into an archive
pub struct CreateArchiveTool {
    utility: Arc<UtilityEngine>,
}

impl CreateArchiveTool {
    pub fn new(utility: Arc<UtilityEngine>) -> Self {
        Self { utility }
    }
}

#[async_trait]
impl HubTool for CreateArchiveTool {
    fn name(&self) -> &str {
        "create_archive"
    }

    fn description(&self) -> &str {
        "Pack an allowed path into a zip or tar archive"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let source = required_str(args, "source_path")?;
        let archive = required_str(args, "archive_path")?;
        let format = optional_str(args, "format").unwrap_or("zip");
        if self.utility.create_archive(source, archive, format) {
            Ok(ToolResult::success(format!("Archive created: {}", archive)))
        } else {
            Ok(ToolResult::error(format!("Cannot archive {}", source)))
        }
    }
}

/// List archive entries
pub struct ListArchiveContentsTool {
    utility: Arc<UtilityEngine>,
}

impl ListArchiveContentsTool {
    pub fn new(utility: Arc<UtilityEngine>) -> Self {
        Self { utility }
    }
}

#[async_trait]
impl HubTool for ListArchiveContentsTool {
    fn name(&self) -> &str {
        "list_archive_contents"
    }

    fn description(&self) -> &str {
        "List entry names inside an allowed archive"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let archive = required_str(args, "archive_path")?;
        let entries = self.utility.list_archive_contents(archive);
        Ok(ToolResult::json(&json!({ "archive": archive, "entries": entries })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::permissions::{PermissionStore, PermissionsEngine};
    use tempfile::TempDir;

    fn utility_in(dir: &TempDir) -> Arc<UtilityEngine> {
        let store = PermissionStore::new(dir.path().join("permissions.json"), vec![]);
        let permissions = Arc::new(PermissionsEngine::new(store));
        permissions.add_allowed_path(dir.path().to_str().unwrap(), false);
        Arc::new(UtilityEngine::new(permissions, Arc::new(EventBus::new())))
    }

    #[tokio::test]
    async fn test_checksum_tools() {
        let dir = TempDir::new().unwrap();
        let utility = utility_in(&dir);
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "abc").unwrap();
        let path = path.to_string_lossy().into_owned();

        let result = CalculateChecksumTool::new(utility.clone())
            .execute(&json!({"filepath": path}))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(
            body["checksum"],
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let verify = VerifyChecksumTool::new(utility)
            .execute(&json!({
                "filepath": path,
                "expected": body["checksum"],
            }))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&verify.output).unwrap();
        assert_eq!(body["matches"], true);
    }

    #[tokio::test]
    async fn test_metadata_tool() {
        let dir = TempDir::new().unwrap();
        let utility = utility_in(&dir);
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "12345").unwrap();

        let result = GetFileMetadataTool::new(utility)
            .execute(&json!({"filepath": path.to_str().unwrap()}))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(body["size"], 5);
    }
}
