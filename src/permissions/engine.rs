//! Permissions engine
//!
//! Single authority for path access control, the permission
//! request/grant/revoke lifecycle, the entity capability table, and audit
//! recording. Policy outcomes are values, never errors: a denied check is
//! `false` or a reason tag, and store failures degrade to deny-all.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use crate::bus::{Event, EventBus};
use crate::core::{events, make_id, HubError, HubResult};

use super::store::PermissionStore;
use super::types::{
    AllowedPath, AuditEntry, CheckFailure, PermissionGrant, PermissionRequest, Target,
};

/// Lexically normalize a path to absolute form
///
/// Does not touch the filesystem, so it works for paths that do not exist
/// yet (grant targets are often files about to be created).
pub(crate) fn absolutize(path: &str) -> PathBuf {
    let p = Path::new(path);
    let mut abs = if p.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir().unwrap_or_default()
    };
    for comp in p.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                abs.pop();
            }
            other => abs.push(other.as_os_str()),
        }
    }
    abs
}

/// Whether an operation tag mutates its target
pub fn is_write_operation(operation: &str) -> bool {
    matches!(
        operation,
        "write" | "create" | "append" | "delete" | "move" | "copy" | "rename"
    )
}

/// Single authority for permissions, audit, and access control
pub struct PermissionsEngine {
    store: PermissionStore,
    bus: Option<Arc<EventBus>>,
}

impl PermissionsEngine {
    /// Create an engine over a store, with no event bus wired
    pub fn new(store: PermissionStore) -> Self {
        Self { store, bus: None }
    }

    /// Wire the event bus used for `permissions.granted`/`revoked` emissions
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    // ----- path rules -----

    /// True if the path falls under any exclusion zone
    ///
    /// Exclusion always wins over any allow rule. Empty paths are excluded.
    pub fn is_excluded(&self, path: &str) -> bool {
        if path.is_empty() {
            return true;
        }
        let normalized = absolutize(path);
        self.store
            .snapshot()
            .exclusion_zones
            .iter()
            .any(|zone| normalized.starts_with(absolutize(zone)))
    }

    /// True if some allowed path covers this path for the operation
    ///
    /// Default-deny: no matching entry means false. Read-only entries only
    /// cover non-mutating operations.
    pub fn is_path_allowed(&self, path: &str, operation: &str) -> bool {
        if path.is_empty() || self.is_excluded(path) {
            return false;
        }
        let normalized = absolutize(path);
        self.store.snapshot().allowed_paths.iter().any(|entry| {
            if entry.read_only && is_write_operation(operation) {
                return false;
            }
            normalized.starts_with(absolutize(&entry.path))
        })
    }

    /// Add a path prefix to the allowed list
    ///
    /// The path must exist on the filesystem. Re-adding an existing prefix
    /// is an idempotent success and is not re-audited.
    pub fn add_allowed_path(&self, path: &str, read_only: bool) -> bool {
        if path.is_empty() || !Path::new(path).exists() {
            return false;
        }
        let abs = absolutize(path).to_string_lossy().into_owned();

        let (added, saved) = self.store.mutate(|data| {
            if data.allowed_paths.iter().any(|e| e.path == abs) {
                return false;
            }
            data.allowed_paths.push(AllowedPath {
                path: abs.clone(),
                read_only,
            });
            true
        });

        if !added {
            return true; // already present
        }
        if saved {
            self.audit("path_allowed", json!({ "path": path, "read_only": read_only }));
        }
        saved
    }

    /// Remove a path prefix from the allowed list
    ///
    /// Idempotent; audited only when something was actually removed.
    pub fn remove_allowed_path(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        let abs = absolutize(path).to_string_lossy().into_owned();

        let (removed, saved) = self.store.mutate(|data| {
            let before = data.allowed_paths.len();
            data.allowed_paths.retain(|e| e.path != abs);
            data.allowed_paths.len() != before
        });

        if !removed {
            return true; // already absent
        }
        if saved {
            self.audit("path_removed", json!({ "path": path }));
        }
        saved
    }

    /// List all allowed path entries
    pub fn list_allowed_paths(&self) -> Vec<AllowedPath> {
        self.store.snapshot().allowed_paths
    }

    /// List the configured exclusion zones
    pub fn exclusion_zones(&self) -> Vec<String> {
        self.store.snapshot().exclusion_zones
    }

    // ----- request -> grant -> revoke lifecycle -----

    /// Create a pending permission request
    ///
    /// Refused up front when any target path sits in an exclusion zone;
    /// no request is created in that case.
    pub fn request_permission(
        &self,
        action: &str,
        target: Target,
        requester: &str,
    ) -> HubResult<PermissionRequest> {
        if target.paths().iter().any(|p| self.is_excluded(p)) {
            return Err(HubError::PermissionDenied(
                "Access denied: protected folder.".into(),
            ));
        }

        let request = PermissionRequest {
            id: make_id(),
            action: action.to_string(),
            target,
            requester: requester.to_string(),
            created_at: Utc::now(),
        };

        let req = request.clone();
        self.store.mutate(move |data| {
            data.requests.insert(req.id.clone(), req);
        });

        self.audit(
            "request_created",
            json!({
                "request_id": request.id,
                "action": request.action,
                "target": request.target.to_string(),
                "requester": request.requester,
            }),
        );

        tracing::info!(
            "[PermissionsEngine] Request {} created: {} on {}",
            request.id,
            request.action,
            request.target
        );
        Ok(request)
    }

    /// Approve a pending request, converting it into a grant
    ///
    /// The request is consumed. An optional TTL stamps `expires_at`.
    pub fn grant_permission(
        &self,
        request_id: &str,
        granter: &str,
        ttl_seconds: Option<i64>,
    ) -> HubResult<PermissionGrant> {
        let granter = granter.to_string();
        let (grant, _) = self.store.mutate(|data| {
            let request = data.requests.remove(request_id)?;
            let grant = PermissionGrant {
                id: make_id(),
                action: request.action,
                target: request.target,
                granted_by: granter,
                granted_at: Utc::now(),
                expires_at: ttl_seconds.map(|s| Utc::now() + Duration::seconds(s)),
                allowed: true,
                revoked_at: None,
            };
            data.permissions.insert(grant.id.clone(), grant.clone());
            Some(grant)
        });

        let grant = grant.ok_or_else(|| HubError::RequestNotFound(request_id.to_string()))?;

        self.audit(
            "permission_granted",
            json!({
                "permission_id": grant.id,
                "granted_by": grant.granted_by,
                "request_id": request_id,
            }),
        );

        tracing::info!(
            "[PermissionsEngine] Granted {} ({} on {})",
            grant.id,
            grant.action,
            grant.target
        );
        Ok(grant)
    }

    /// Revoke a grant immediately
    ///
    /// Soft delete: the record is kept with `allowed = false` and a
    /// `revoked_at` stamp for audit completeness.
    pub fn revoke_permission(&self, permission_id: &str) -> HubResult<()> {
        let (found, _) = self.store.mutate(|data| {
            match data.permissions.get_mut(permission_id) {
                Some(grant) => {
                    grant.allowed = false;
                    grant.revoked_at = Some(Utc::now());
                    true
                }
                None => false,
            }
        });

        if !found {
            return Err(HubError::PermissionNotFound(permission_id.to_string()));
        }

        self.audit(
            "permission_revoked",
            json!({ "permission_id": permission_id }),
        );
        tracing::info!("[PermissionsEngine] Revoked {}", permission_id);
        Ok(())
    }

    /// Look up a grant by id
    pub fn get_permission(&self, permission_id: &str) -> Option<PermissionGrant> {
        self.store.snapshot().permissions.get(permission_id).cloned()
    }

    /// List pending requests
    pub fn list_requests(&self) -> Vec<PermissionRequest> {
        self.store.snapshot().requests.into_values().collect()
    }

    /// The execution-time gate
    ///
    /// With a specific id, validates that grant against the requested
    /// action/target. Without one, scans for the first usable grant that
    /// covers them. Returns the usable grant's id, or the machine-readable
    /// reason the check failed.
    pub fn check_permission_for(
        &self,
        action: &str,
        target: &Target,
        permission_id: Option<&str>,
    ) -> Result<String, CheckFailure> {
        let data = self.store.snapshot();
        let now = Utc::now();

        if let Some(id) = permission_id {
            let grant = data
                .permissions
                .get(id)
                .ok_or(CheckFailure::PermissionNotFound)?;
            if !grant.allowed {
                return Err(CheckFailure::PermissionNotAllowed);
            }
            if grant.expires_at.map(|e| now > e).unwrap_or(false) {
                return Err(CheckFailure::PermissionExpired);
            }
            if grant.action != action {
                return Err(CheckFailure::ActionMismatch);
            }
            if !grant.target.covers(target) {
                return Err(CheckFailure::TargetMismatch);
            }
            return Ok(id.to_string());
        }

        for (id, grant) in &data.permissions {
            if grant.is_usable(now) && grant.action == action && grant.target.covers(target) {
                return Ok(id.clone());
            }
        }
        Err(CheckFailure::NoMatchingPermission)
    }

    // ----- entity capability table -----

    /// Set a coarse (entity, resource, action) capability flag
    ///
    /// Emits `permissions.granted` or `permissions.revoked` on the bus.
    pub fn set_capability(
        &self,
        entity: &str,
        resource: &str,
        action: &str,
        allowed: bool,
    ) -> bool {
        let key = format!("{}:{}", resource, action);
        let (_, saved) = self.store.mutate(|data| {
            data.acl
                .entry(entity.to_string())
                .or_default()
                .insert(key, allowed);
        });

        if saved {
            self.audit(
                "permission_set",
                json!({
                    "entity": entity,
                    "resource": resource,
                    "action": action,
                    "allowed": allowed,
                }),
            );
            if let Some(bus) = &self.bus {
                let event_type = if allowed {
                    events::PERMISSION_GRANTED
                } else {
                    events::PERMISSION_REVOKED
                };
                bus.emit(
                    event_type,
                    json!({ "entity": entity, "resource": resource, "action": action }),
                );
            }
        }
        saved
    }

    /// Check a coarse (entity, resource, action) capability flag
    ///
    /// Absent flags are denied.
    pub fn check_capability(&self, entity: &str, resource: &str, action: &str) -> bool {
        let key = format!("{}:{}", resource, action);
        self.store
            .snapshot()
            .acl
            .get(entity)
            .and_then(|caps| caps.get(&key).copied())
            .unwrap_or(false)
    }

    // ----- audit -----

    /// Append an audit entry
    ///
    /// Never raises to the caller; I/O failures are logged and reported as
    /// `false`.
    pub fn audit(&self, event_type: &str, details: Value) -> bool {
        let entry = AuditEntry {
            id: make_id(),
            event: event_type.to_string(),
            details,
            ts: Utc::now(),
        };
        let (_, saved) = self.store.mutate(move |data| {
            data.audit.push(entry);
        });
        if !saved {
            tracing::error!("[PermissionsEngine] Audit failed for '{}'", event_type);
        }
        saved
    }

    /// Recent audit entries, newest first
    pub fn audit_log(&self, limit: usize) -> Vec<AuditEntry> {
        let mut audit = self.store.snapshot().audit;
        audit.sort_by(|a, b| b.ts.cmp(&a.ts));
        audit.truncate(limit);
        audit
    }

    // ----- bus reactions -----

    /// React to system events worth an audit note
    pub fn handle_event(&self, event: &Event) {
        match event.event_type.as_str() {
            events::AGENT_TRUST_CHANGED => {
                self.audit(
                    "trust_change_reacted",
                    json!({
                        "agent": event.payload.get("agent_id"),
                        "level": event.payload.get("level"),
                    }),
                );
            }
            events::FS_DELETED => {
                self.audit(
                    "file_deletion_noted",
                    json!({ "path": event.payload.get("path") }),
                );
            }
            events::CHAOS_FILE_CREATED => {
                self.audit(
                    "chaos_creation_noted",
                    json!({ "filename": event.payload.get("filename") }),
                );
            }
            _ => {}
        }
    }
}
