//! Canonical event vocabulary for cross-engine signaling
//!
//! Dot-namespaced event type constants. No engine imports, no side effects.

// CHAOS
pub const CHAOS_FILE_CREATED: &str = "chaos.file.created";
pub const CHAOS_FILE_UPDATED: &str = "chaos.file.updated";
pub const CHAOS_FILE_DELETED: &str = "chaos.file.deleted";
pub const CHAOS_ANALYZED: &str = "chaos.file.analyzed";
pub const CHAOS_TAG_CREATED: &str = "chaos.tag.created";

// Filesystem
pub const FS_READ: &str = "filesystem.read";
pub const FS_WRITTEN: &str = "filesystem.written";
pub const FS_DELETED: &str = "filesystem.deleted";
pub const FS_MOVED: &str = "filesystem.moved";
pub const FS_MAPPED: &str = "filesystem.mapped";

// Media
pub const MEDIA_REGISTERED: &str = "media.registered";
pub const MEDIA_TAG_UPDATED: &str = "media.tag.updated";
pub const MEDIA_DELETED: &str = "media.deleted";

// Permissions
pub const PERMISSION_GRANTED: &str = "permissions.granted";
pub const PERMISSION_REVOKED: &str = "permissions.revoked";
pub const PERMISSION_DENIED: &str = "permissions.denied";
pub const AUDIT_EVENT: &str = "audit.event";

// Agent trust
pub const AGENT_REGISTERED: &str = "agent.registered";
pub const AGENT_TRUST_CHANGED: &str = "agent.trust.changed";
pub const AGENT_REVOKED: &str = "agent.revoked";
pub const AGENT_ACCESSED: &str = "agent.accessed";

// Utilities
pub const ARCHIVE_CREATED: &str = "utility.archive.created";
pub const CHECKSUM_CALCULATED: &str = "utility.checksum.calculated";
pub const GIT_STATUS_QUERIED: &str = "utility.git.status";

// System
pub const SYSTEM_STARTED: &str = "system.started";
pub const SYSTEM_WARNING: &str = "system.warning";
pub const SYSTEM_ERROR: &str = "system.error";
