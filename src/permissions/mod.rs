//! Permission system
//!
//! Single authoritative source for access control, the permission
//! request/grant/revoke lifecycle, and the audit log:
//! - **Path rules**: exclusion zones always deny; allowed-path prefixes
//!   authorize matching operations (default-deny otherwise)
//! - **Grants**: explicit, possibly time-limited `(action, target)`
//!   authorizations created through a request/approve lifecycle
//! - **Capabilities**: coarse `(entity, resource, action)` boolean flags
//! - **Audit**: append-only record of every state change and decision
//!
//! ## Example
//!
//! ```rust,ignore
//! use eden_hub::permissions::{PermissionStore, PermissionsEngine, Target};
//!
//! let store = PermissionStore::new("permissions.json", vec!["/etc".into()]);
//! let engine = PermissionsEngine::new(store);
//!
//! let request = engine.request_permission("read_file", Target::path("/data/notes.txt"), "agent1")?;
//! let grant = engine.grant_permission(&request.id, "admin", Some(3600))?;
//!
//! match engine.check_permission_for("read_file", &Target::path("/data/notes.txt"), Some(&grant.id)) {
//!     Ok(id) => { /* execute, audit success */ }
//!     Err(reason) => { /* audit denial with reason.as_str() */ }
//! }
//! ```

mod engine;
mod store;
mod types;

pub use engine::{is_write_operation, PermissionsEngine};
pub use store::{PermissionStore, StoreData, DEFAULT_AUDIT_CAP, DEFAULT_CACHE_TTL};
pub use types::{
    AllowedPath, AuditEntry, CheckFailure, PermissionGrant, PermissionRequest, Target,
};
