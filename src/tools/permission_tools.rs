//! Permission tool adapters
//!
//! Thin adapters over the permissions engine. No business logic here.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::permissions::{PermissionsEngine, Target};

use super::tool::{optional_bool, optional_i64, optional_str, required_str, HubTool, ToolResult};

/// Build a target from tool args: `source`/`destination` for transfers,
/// `target` for single paths
pub(crate) fn target_from_args(args: &Value) -> Result<Target> {
    if let (Some(source), Some(destination)) =
        (args.get("source").and_then(Value::as_str), args.get("destination").and_then(Value::as_str))
    {
        return Ok(Target::transfer(source, destination));
    }
    Ok(Target::path(required_str(args, "target")?))
}

/// Create a pending permission request
pub struct RequestPermissionTool {
    permissions: Arc<PermissionsEngine>,
}

impl RequestPermissionTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for RequestPermissionTool {
    fn name(&self) -> &str {
        "request_permission"
    }

    fn description(&self) -> &str {
        "Create a permission request for an action on a target"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let action = required_str(args, "action")?;
        let target = target_from_args(args)?;
        let requester = optional_str(args, "requester").unwrap_or("agent");

        match self.permissions.request_permission(action, target, requester) {
            Ok(request) => Ok(ToolResult::json(&json!({
                "status": "requested",
                "request_id": request.id,
                "instruction": format!(
                    "Call grant_permission('{}', granter='admin') to approve.",
                    request.id
                ),
            }))),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}

/// Approve a pending request
pub struct GrantPermissionTool {
    permissions: Arc<PermissionsEngine>,
}

impl GrantPermissionTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for GrantPermissionTool {
    fn name(&self) -> &str {
        "grant_permission"
    }

    fn description(&self) -> &str {
        "Approve a pending request and create a granted permission"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let request_id = required_str(args, "request_id")?;
        let granter = optional_str(args, "granter").unwrap_or("admin");
        let ttl = optional_i64(args, "duration_seconds");

        match self.permissions.grant_permission(request_id, granter, ttl) {
            Ok(grant) => Ok(ToolResult::json(&json!({
                "status": "granted",
                "permission_id": grant.id,
                "action": grant.action,
                "target": grant.target.to_string(),
            }))),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}

/// Revoke a granted permission
pub struct RevokePermissionTool {
    permissions: Arc<PermissionsEngine>,
}

impl RevokePermissionTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for RevokePermissionTool {
    fn name(&self) -> &str {
        "revoke_permission"
    }

    fn description(&self) -> &str {
        "Revoke a previously granted permission immediately"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let permission_id = required_str(args, "permission_id")?;
        match self.permissions.revoke_permission(permission_id) {
            Ok(()) => Ok(ToolResult::success(format!(
                "Permission {} revoked.",
                permission_id
            ))),
            Err(e) => Ok(ToolResult::error(e.to_string())),
        }
    }
}

/// Check whether an action on a target is authorized
pub struct CheckPermissionTool {
    permissions: Arc<PermissionsEngine>,
}

impl CheckPermissionTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for CheckPermissionTool {
    fn name(&self) -> &str {
        "check_permission"
    }

    fn description(&self) -> &str {
        "Check an action/target pair against granted permissions"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let action = required_str(args, "action")?;
        let target = target_from_args(args)?;
        let permission_id = args.get("permission_id").and_then(Value::as_str);

        match self
            .permissions
            .check_permission_for(action, &target, permission_id)
        {
            Ok(id) => Ok(ToolResult::json(&json!({
                "allowed": true,
                "permission_id": id,
            }))),
            Err(reason) => Ok(ToolResult::json(&json!({
                "allowed": false,
                "reason": reason.as_str(),
            }))),
        }
    }
}

/// List the allowed path prefixes
pub struct ListAllowedPathsTool {
    permissions: Arc<PermissionsEngine>,
}

impl ListAllowedPathsTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for ListAllowedPathsTool {
    fn name(&self) -> &str {
        "list_allowed_paths"
    }

    fn description(&self) -> &str {
        "List all allowed path prefixes"
    }

    async fn execute(&self, _args: &Value) -> Result<ToolResult> {
        let paths = self.permissions.list_allowed_paths();
        Ok(ToolResult::json(&json!({ "allowed_paths": paths })))
    }
}

/// Add an allowed path prefix
pub struct AddAllowedPathTool {
    permissions: Arc<PermissionsEngine>,
}

impl AddAllowedPathTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for AddAllowedPathTool {
    fn name(&self) -> &str {
        "add_allowed_path"
    }

    fn description(&self) -> &str {
        "Add a path prefix to the allowed list (read-only by default)"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        let read_only = optional_bool(args, "read_only").unwrap_or(true);
        if self.permissions.add_allowed_path(path, read_only) {
            Ok(ToolResult::success(format!("Path allowed: {}", path)))
        } else {
            Ok(ToolResult::error(format!("Cannot allow path: {}", path)))
        }
    }
}

/// Remove an allowed path prefix
pub struct RemoveAllowedPathTool {
    permissions: Arc<PermissionsEngine>,
}

impl RemoveAllowedPathTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for RemoveAllowedPathTool {
    fn name(&self) -> &str {
        "remove_allowed_path"
    }

    fn description(&self) -> &str {
        "Remove a path prefix from the allowed list"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let path = required_str(args, "path")?;
        if self.permissions.remove_allowed_path(path) {
            Ok(ToolResult::success(format!("Path removed: {}", path)))
        } else {
            Ok(ToolResult::error(format!("Cannot remove path: {}", path)))
        }
    }
}

/// Recent audit entries
pub struct AuditLogTool {
    permissions: Arc<PermissionsEngine>,
}

impl AuditLogTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for AuditLogTool {
    fn name(&self) -> &str {
        "get_audit_log"
    }

    fn description(&self) -> &str {
        "Get recent audit entries, newest first"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let limit = optional_i64(args, "limit").unwrap_or(100).max(0) as usize;
        let entries = self.permissions.audit_log(limit);
        Ok(ToolResult::json(&json!({ "audit": entries })))
    }
}

/// Set a coarse entity capability flag
pub struct SetCapabilityTool {
    permissions: Arc<PermissionsEngine>,
}

impl SetCapabilityTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for SetCapabilityTool {
    fn name(&self) -> &str {
        "set_permission"
    }

    fn description(&self) -> &str {
        "Set an (entity, resource, action) capability flag"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let entity = required_str(args, "entity")?;
        let resource = required_str(args, "resource")?;
        let action = required_str(args, "action")?;
        let allowed = optional_bool(args, "allowed").unwrap_or(true);

        if self.permissions.set_capability(entity, resource, action, allowed) {
            Ok(ToolResult::success(format!(
                "Permission {} for {} on {}:{}",
                if allowed { "granted" } else { "revoked" },
                entity,
                resource,
                action
            )))
        } else {
            Ok(ToolResult::error("Failed to set permission"))
        }
    }
}

/// Check a coarse entity capability flag
pub struct CheckCapabilityTool {
    permissions: Arc<PermissionsEngine>,
}

impl CheckCapabilityTool {
    pub fn new(permissions: Arc<PermissionsEngine>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl HubTool for CheckCapabilityTool {
    fn name(&self) -> &str {
        "check_entity_permission"
    }

    fn description(&self) -> &str {
        "Check an (entity, resource, action) capability flag"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let entity = required_str(args, "entity")?;
        let resource = required_str(args, "resource")?;
        let action = required_str(args, "action")?;
        let allowed = self.permissions.check_capability(entity, resource, action);
        Ok(ToolResult::json(&json!({ "allowed": allowed })))
    }
}
