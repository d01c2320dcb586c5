//! Filesystem tool adapters
//!
//! Two families, matching the two authorization styles:
//! - direct tools gated by allowed paths (`read_file`, `write_file`, ...)
//! - the request/execute flow gated by explicit grants (`create_file`
//!   requests, `execute_create` performs, and so on)

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engines::FilesystemEngine;
use crate::permissions::{PermissionGrant, PermissionsEngine, Target};

use super::tool::{optional_str, required_str, HubTool, ToolResult};

/// Read a file from an allowed path
pub struct ReadFileTool {
    filesystem: Arc<FilesystemEngine>,
}

impl ReadFileTool {
    pub fn new(filesystem: Arc<FilesystemEngine>) -> Self {
        Self { filesystem }
    }
}

#[async_trait]
impl HubTool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a UTF-8 text file from an allowed path"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        match self.filesystem.read_file(path) {
            Some(content) => Ok(ToolResult::success(content)),
            None => Ok(ToolResult::error(format!("Cannot read {}", path))),
        }
    }
}

/// Write a file under an allowed path
pub struct WriteFileTool {
    filesystem: Arc<FilesystemEngine>,
}

impl WriteFileTool {
    pub fn new(filesystem: Arc<FilesystemEngine>) -> Self {
        Self { filesystem }
    }
}

#[async_trait]
impl HubTool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write (create or overwrite) a file under an allowed path"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        let content = optional_str(args, "content").unwrap_or("");
        if self.filesystem.write_file(path, content) {
            Ok(ToolResult::success(format!("File written: {}", path)))
        } else {
            Ok(ToolResult::error(format!("Cannot write {}", path)))
        }
    }
}

/// Append to a file under an allowed path
pub struct AppendFileTool {
    filesystem: Arc<FilesystemEngine>,
}

impl AppendFileTool {
    pub fn new(filesystem: Arc<FilesystemEngine>) -> Self {
        Self { filesystem }
    }
}

#[async_trait]
impl HubTool for AppendFileTool {
    fn name(&self) -> &str {
        "append_file"
    }

    fn description(&self) -> &str {
        "Append text to a file under an allowed path"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        let content = required_str(args, "content")?;
        if self.filesystem.append_file(path, content) {
            Ok(ToolResult::success(format!("Appended to {}", path)))
        } else {
            Ok(ToolResult::error(format!("Cannot append to {}", path)))
        }
    }
}

/// Delete a file under an allowed path
pub struct DeleteFileTool {
    filesystem: Arc<FilesystemEngine>,
}

impl DeleteFileTool {
    pub fn new(filesystem: Arc<FilesystemEngine>) -> Self {
        Self { filesystem }
    }
}

#[async_trait]
impl HubTool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Delete a file under an allowed path"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        if self.filesystem.delete_file(path) {
            Ok(ToolResult::success(format!("File deleted: {}", path)))
        } else {
            Ok(ToolResult::error(format!("Cannot delete {}", path)))
        }
    }
}

/// Copy a file between allowed paths
pub struct CopyFileTool {
    filesystem: Arc<FilesystemEngine>,
}

impl CopyFileTool {
    pub fn new(filesystem: Arc<FilesystemEngine>) -> Self {
        Self { filesystem }
    }
}

#[async_trait]
impl HubTool for CopyFileTool {
    fn name(&self) -> &str {
        "copy_file"
    }

    fn description(&self) -> &str {
        "Copy a file between allowed paths"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let source = required_str(args, "source")?;
        let destination = required_str(args, "destination")?;
        if self.filesystem.copy_file(source, destination) {
            Ok(ToolResult::success(format!(
                "Copied {} -> {}",
                source, destination
            )))
        } else {
            Ok(ToolResult::error(format!(
                "Cannot copy {} -> {}",
                source, destination
            )))
        }
    }
}

/// List one directory level
pub struct ListDirTool {
    filesystem: Arc<FilesystemEngine>,
}

impl ListDirTool {
    pub fn new(filesystem: Arc<FilesystemEngine>) -> Self {
        Self { filesystem }
    }
}

#[async_trait]
impl HubTool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the entries of an allowed directory"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        let entries = self.filesystem.list_directory(path);
        Ok(ToolResult::json(&json!({ "path": path, "entries": entries })))
    }
}

/// Find files by name and content patterns
pub struct FindFilesTool {
    filesystem: Arc<FilesystemEngine>,
}

impl FindFilesTool {
    pub fn new(filesystem: Arc<FilesystemEngine>) -> Self {
        Self { filesystem }
    }
}

#[async_trait]
impl HubTool for FindFilesTool {
    fn name(&self) -> &str {
        "find_files"
    }

    fn description(&self) -> &str {
        "Find files under an allowed directory by glob and content pattern"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        let pattern = optional_str(args, "pattern").unwrap_or("*");
        let content = optional_str(args, "content");
        let matches = self.filesystem.find_files(path, pattern, content);
        Ok(ToolResult::json(&json!({ "matches": matches })))
    }
}

/// Depth-bounded directory tree
pub struct MapDirectoryTool {
    filesystem: Arc<FilesystemEngine>,
}

impl MapDirectoryTool {
    pub fn new(filesystem: Arc<FilesystemEngine>) -> Self {
        Self { filesystem }
    }
}

#[async_trait]
impl HubTool for MapDirectoryTool {
    fn name(&self) -> &str {
        "map_directory"
    }

    fn description(&self) -> &str {
        "Map an allowed directory as a bounded-depth tree"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        match self.filesystem.map_directory(path) {
            Some(tree) => Ok(ToolResult::json(&tree)),
            None => Ok(ToolResult::error(format!("Cannot map {}", path))),
        }
    }
}

/// File metadata lookup
pub struct FileInfoTool {
    filesystem: Arc<FilesystemEngine>,
}

impl FileInfoTool {
    pub fn new(filesystem: Arc<FilesystemEngine>) -> Self {
        Self { filesystem }
    }
}

#[async_trait]
impl HubTool for FileInfoTool {
    fn name(&self) -> &str {
        "file_info"
    }

    fn description(&self) -> &str {
        "Size, kind, and timestamps for an allowed path"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        match self.filesystem.file_info(path) {
            Some(info) => Ok(ToolResult::json(&info)),
            None => Ok(ToolResult::error(format!("Cannot stat {}", path))),
        }
    }
}

/// Create a directory under an allowed path
pub struct CreateDirectoryTool {
    filesystem: Arc<FilesystemEngine>,
}

impl CreateDirectoryTool {
    pub fn new(filesystem: Arc<FilesystemEngine>) -> Self {
        Self { filesystem }
    }
}

#[async_trait]
impl HubTool for CreateDirectoryTool {
    fn name(&self) -> &str {
        "create_directory"
    }

    fn description(&self) -> &str {
        "Create a directory (and parents) under an allowed path"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        if self.filesystem.create_directory(path) {
            Ok(ToolResult::success(format!("Directory created: {}", path)))
        } else {
            Ok(ToolResult::error(format!("Cannot create {}", path)))
        }
    }
}

// ----- request/execute flow -----

fn requested(request: &crate::permissions::PermissionRequest) -> ToolResult {
    ToolResult::json(&json!({
        "status": "requested",
        "request_id": request.id,
        "instruction": format!(
            "Call grant_permission('{}', granter='admin') to approve.",
            request.id
        ),
    }))
}

/// Request permission to create a file
pub struct CreateFileTool {
    permissions: Arc<PermissionsEngine>,
}

impl CreateFileTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Request permission to create a file"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        if self.permissions.is_excluded(path) {
            return Ok(ToolResult::error("Cannot create inside protected folder."));
        }
        match self
            .permissions
            .request_permission("create_file", Target::path(path), "agent")
        {
            Ok(request) => Ok(requested(&request)),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}

/// Request permission to move a file
pub struct MoveFileTool {
    permissions: Arc<PermissionsEngine>,
}

impl MoveFileTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for MoveFileTool {
    fn name(&self) -> &str {
        "move_file"
    }

    fn description(&self) -> &str {
        "Request permission to move a file"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let source = required_str(args, "source")?;
        let destination = required_str(args, "destination")?;
        if self.permissions.is_excluded(source) || self.permissions.is_excluded(destination) {
            return Ok(ToolResult::error(
                "Cannot move files from/to protected folder.",
            ));
        }
        match self.permissions.request_permission(
            "move_file",
            Target::transfer(source, destination),
            "agent",
        ) {
            Ok(request) => Ok(requested(&request)),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}

/// Request permission to rename a file
pub struct RenameFileTool {
    permissions: Arc<PermissionsEngine>,
}

impl RenameFileTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for RenameFileTool {
    fn name(&self) -> &str {
        "rename_file"
    }

    fn description(&self) -> &str {
        "Request permission to rename a file in place"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        let new_name = required_str(args, "new_name")?;
        if self.permissions.is_excluded(path) {
            return Ok(ToolResult::error("Cannot rename inside protected folder."));
        }
        let parent = Path::new(path).parent().unwrap_or_else(|| Path::new(""));
        let new_path = parent.join(new_name).to_string_lossy().into_owned();
        match self.permissions.request_permission(
            "rename_file",
            Target::transfer(path, new_path),
            "agent",
        ) {
            Ok(request) => Ok(requested(&request)),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}

/// Validate a grant for an execute tool, auditing the denial if any
fn checked_grant(
    permissions: &PermissionsEngine,
    action: &str,
    permission_id: &str,
    audit_tag: &str,
) -> Result<PermissionGrant, ToolResult> {
    let denied = |reason: &str| {
        permissions.audit(
            &format!("{}_denied", audit_tag),
            json!({ "permission_id": permission_id, "reason": reason }),
        );
        ToolResult::error(format!("Permission denied: {}", reason))
    };

    let grant = match permissions.get_permission(permission_id) {
        Some(grant) => grant,
        None => return Err(denied("permission_not_found")),
    };
    match permissions.check_permission_for(action, &grant.target, Some(permission_id)) {
        Ok(_) => Ok(grant),
        Err(reason) => Err(denied(reason.as_str())),
    }
}

/// Execute a granted read
pub struct ExecuteReadTool {
    permissions: Arc<PermissionsEngine>,
}

impl ExecuteReadTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for ExecuteReadTool {
    fn name(&self) -> &str {
        "execute_read"
    }

    fn description(&self) -> &str {
        "Read the file named by a granted read_file permission"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let permission_id = required_str(args, "permission_id")?;
        let grant = match checked_grant(&self.permissions, "read_file", permission_id, "execute_read")
        {
            Ok(grant) => grant,
            Err(result) => return Ok(result),
        };
        let path = match &grant.target {
            Target::Path(path) => path.clone(),
            Target::Transfer { .. } => {
                return Ok(ToolResult::error("Permission denied: target_mismatch"))
            }
        };
        if self.permissions.is_excluded(&path) {
            return Ok(ToolResult::error("Access denied: protected folder."));
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                self.permissions.audit(
                    "execute_read_success",
                    json!({ "permission_id": permission_id, "path": path, "bytes": content.len() }),
                );
                Ok(ToolResult::success(content))
            }
            Err(e) => {
                self.permissions.audit(
                    "execute_read_error",
                    json!({ "permission_id": permission_id, "path": path, "error": e.to_string() }),
                );
                Ok(ToolResult::error(format!("Error: {}", e)))
            }
        }
    }
}

/// Execute a granted file creation
pub struct ExecuteCreateTool {
    permissions: Arc<PermissionsEngine>,
}

impl ExecuteCreateTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for ExecuteCreateTool {
    fn name(&self) -> &str {
        "execute_create"
    }

    fn description(&self) -> &str {
        "Create the file named by a granted create_file permission"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let permission_id = required_str(args, "permission_id")?;
        let content = optional_str(args, "content").unwrap_or("");
        let grant = match checked_grant(
            &self.permissions,
            "create_file",
            permission_id,
            "execute_create",
        ) {
            Ok(grant) => grant,
            Err(result) => return Ok(result),
        };
        let path = match &grant.target {
            Target::Path(path) => path.clone(),
            Target::Transfer { .. } => {
                return Ok(ToolResult::error("Permission denied: target_mismatch"))
            }
        };
        if self.permissions.is_excluded(&path) {
            return Ok(ToolResult::error("Cannot create inside protected folder."));
        }

        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    return Ok(ToolResult::error(format!("Error: {}", e)));
                }
            }
        }
        match std::fs::write(&path, content) {
            Ok(()) => {
                self.permissions.audit(
                    "execute_create_success",
                    json!({ "permission_id": permission_id, "path": path, "bytes": content.len() }),
                );
                Ok(ToolResult::success(format!("File created: {}", path)))
            }
            Err(e) => {
                self.permissions.audit(
                    "execute_create_error",
                    json!({ "permission_id": permission_id, "path": path, "error": e.to_string() }),
                );
                Ok(ToolResult::error(format!("Error: {}", e)))
            }
        }
    }
}

/// Execute a granted move
pub struct ExecuteMoveTool {
    permissions: Arc<PermissionsEngine>,
}

impl ExecuteMoveTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for ExecuteMoveTool {
    fn name(&self) -> &str {
        "execute_move"
    }

    fn description(&self) -> &str {
        "Move the file pair named by a granted move_file permission"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let permission_id = required_str(args, "permission_id")?;
        let grant = match checked_grant(&self.permissions, "move_file", permission_id, "execute_move")
        {
            Ok(grant) => grant,
            Err(result) => return Ok(result),
        };
        let (source, destination) = match &grant.target {
            Target::Transfer {
                source,
                destination,
            } => (source.clone(), destination.clone()),
            Target::Path(_) => return Ok(ToolResult::error("Permission denied: target_mismatch")),
        };
        if self.permissions.is_excluded(&source) || self.permissions.is_excluded(&destination) {
            return Ok(ToolResult::error("Action blocked: protected folder."));
        }

        if let Some(parent) = Path::new(&destination).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    return Ok(ToolResult::error(format!("Error: {}", e)));
                }
            }
        }
        let moved = std::fs::rename(&source, &destination).or_else(|_| {
            std::fs::copy(&source, &destination).and_then(|_| std::fs::remove_file(&source))
        });
        match moved {
            Ok(()) => {
                self.permissions.audit(
                    "execute_move_success",
                    json!({ "permission_id": permission_id, "source": source, "dest": destination }),
                );
                Ok(ToolResult::success(format!(
                    "Moved {} -> {}",
                    source, destination
                )))
            }
            Err(e) => {
                self.permissions.audit(
                    "execute_move_error",
                    json!({ "permission_id": permission_id, "source": source, "dest": destination, "error": e.to_string() }),
                );
                Ok(ToolResult::error(format!("Error: {}", e)))
            }
        }
    }
}

/// Execute a granted rename
pub struct ExecuteRenameTool {
    permissions: Arc<PermissionsEngine>,
}

impl ExecuteRenameTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for ExecuteRenameTool {
    fn name(&self) -> &str {
        "execute_rename"
    }

    fn description(&self) -> &str {
        "Rename the file pair named by a granted rename_file permission"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let permission_id = required_str(args, "permission_id")?;
        let grant = match checked_grant(
            &self.permissions,
            "rename_file",
            permission_id,
            "execute_rename",
        ) {
            Ok(grant) => grant,
            Err(result) => return Ok(result),
        };
        let (source, destination) = match &grant.target {
            Target::Transfer {
                source,
                destination,
            } => (source.clone(), destination.clone()),
            Target::Path(_) => return Ok(ToolResult::error("Permission denied: target_mismatch")),
        };
        if self.permissions.is_excluded(&source) || self.permissions.is_excluded(&destination) {
            return Ok(ToolResult::error("Cannot rename inside protected folder."));
        }

        match std::fs::rename(&source, &destination) {
            Ok(()) => {
                self.permissions.audit(
                    "execute_rename_success",
                    json!({ "permission_id": permission_id, "source": source, "dest": destination }),
                );
                Ok(ToolResult::success(format!(
                    "Renamed {} -> {}",
                    source, destination
                )))
            }
            Err(e) => {
                self.permissions.audit(
                    "execute_rename_error",
                    json!({ "permission_id": permission_id, "source": source, "dest": destination, "error": e.to_string() }),
                );
                Ok(ToolResult::error(format!("Error: {}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::permissions::PermissionStore;
    use tempfile::TempDir;

    fn permissions_in(dir: &TempDir) -> Arc<PermissionsEngine> {
        let store = PermissionStore::new(dir.path().join("permissions.json"), vec![]);
        Arc::new(PermissionsEngine::new(store))
    }

    #[tokio::test]
    async fn test_request_then_execute_create() {
        let dir = TempDir::new().unwrap();
        let permissions = permissions_in(&dir);
        let target = dir.path().join("new.txt").to_string_lossy().into_owned();

        let request_result = CreateFileTool::new(permissions.clone())
            .execute(&json!({"path": target}))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&request_result.output).unwrap();
        let request_id = body["request_id"].as_str().unwrap();

        let grant = permissions
            .grant_permission(request_id, "admin", None)
            .unwrap();

        let create_result = ExecuteCreateTool::new(permissions.clone())
            .execute(&json!({"permission_id": grant.id, "content": "hello"}))
            .await
            .unwrap();
        assert!(!create_result.is_error, "{}", create_result.output);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");

        // Success audited exactly once
        let successes = permissions
            .audit_log(100)
            .into_iter()
            .filter(|e| e.event == "execute_create_success")
            .count();
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_execute_read_with_grant() {
        let dir = TempDir::new().unwrap();
        let permissions = permissions_in(&dir);
        let target = dir.path().join("secret.txt").to_string_lossy().into_owned();
        std::fs::write(&target, "classified").unwrap();

        let request = permissions
            .request_permission("read_file", Target::path(&target), "agent")
            .unwrap();
        let grant = permissions
            .grant_permission(&request.id, "admin", None)
            .unwrap();

        let result = ExecuteReadTool::new(permissions.clone())
            .execute(&json!({"permission_id": grant.id}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.output, "classified");
    }

    #[tokio::test]
    async fn test_execute_read_denied_after_revoke() {
        let dir = TempDir::new().unwrap();
        let permissions = permissions_in(&dir);
        let target = dir.path().join("secret.txt").to_string_lossy().into_owned();
        std::fs::write(&target, "classified").unwrap();

        let request = permissions
            .request_permission("read_file", Target::path(&target), "agent")
            .unwrap();
        let grant = permissions
            .grant_permission(&request.id, "admin", None)
            .unwrap();
        permissions.revoke_permission(&grant.id).unwrap();

        let result = ExecuteReadTool::new(permissions.clone())
            .execute(&json!({"permission_id": grant.id}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.output.contains("permission_not_allowed"));

        let denials = permissions
            .audit_log(100)
            .into_iter()
            .filter(|e| e.event == "execute_read_denied")
            .count();
        assert_eq!(denials, 1);
    }

    #[tokio::test]
    async fn test_execute_move_round_trip() {
        let dir = TempDir::new().unwrap();
        let permissions = permissions_in(&dir);
        let source = dir.path().join("a.txt").to_string_lossy().into_owned();
        let destination = dir.path().join("b.txt").to_string_lossy().into_owned();
        std::fs::write(&source, "cargo").unwrap();

        let request = permissions
            .request_permission("move_file", Target::transfer(&source, &destination), "agent")
            .unwrap();
        let grant = permissions
            .grant_permission(&request.id, "admin", None)
            .unwrap();

        let result = ExecuteMoveTool::new(permissions.clone())
            .execute(&json!({"permission_id": grant.id}))
            .await
            .unwrap();
        assert!(!result.is_error, "{}", result.output);
        assert!(!Path::new(&source).exists());
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "cargo");
    }

    #[tokio::test]
    async fn test_execute_with_wrong_action_grant() {
        let dir = TempDir::new().unwrap();
        let permissions = permissions_in(&dir);
        let target = dir.path().join("x.txt").to_string_lossy().into_owned();
        std::fs::write(&target, "x").unwrap();

        let request = permissions
            .request_permission("read_file", Target::path(&target), "agent")
            .unwrap();
        let grant = permissions
            .grant_permission(&request.id, "admin", None)
            .unwrap();

        // A read grant must not authorize create
        let result = ExecuteCreateTool::new(permissions.clone())
            .execute(&json!({"permission_id": grant.id}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.output.contains("action_mismatch"));
    }

    #[tokio::test]
    async fn test_direct_tools_round_trip() {
        let dir = TempDir::new().unwrap();
        let permissions = permissions_in(&dir);
        permissions.add_allowed_path(dir.path().to_str().unwrap(), false);
        let filesystem = Arc::new(FilesystemEngine::new(
            permissions.clone(),
            Arc::new(EventBus::new()),
        ));
        let path = dir.path().join("notes.txt").to_string_lossy().into_owned();

        let write = WriteFileTool::new(filesystem.clone())
            .execute(&json!({"path": path, "content": "alpha"}))
            .await
            .unwrap();
        assert!(!write.is_error);

        let read = ReadFileTool::new(filesystem.clone())
            .execute(&json!({"path": path}))
            .await
            .unwrap();
        assert_eq!(read.output, "alpha");

        let listing = ListDirTool::new(filesystem)
            .execute(&json!({"path": dir.path().to_str().unwrap()}))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&listing.output).unwrap();
        assert!(body["entries"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e["name"] == "notes.txt"));
    }
}
