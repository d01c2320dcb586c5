//! Permission data model
//!
//! Records persisted in the permission store: grants, pending requests,
//! allowed path prefixes, and audit entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The resource a grant or request is scoped to
///
/// Composite actions (move/rename) carry a structured source/destination
/// pair instead of a delimited string, so paths containing arbitrary text
/// cannot collide with the encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    /// A single path or resource name
    Path(String),
    /// A source/destination pair for move/rename actions
    Transfer {
        source: String,
        destination: String,
    },
}

impl Target {
    /// Create a single-path target
    pub fn path(p: impl Into<String>) -> Self {
        Target::Path(p.into())
    }

    /// Create a transfer target
    pub fn transfer(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Target::Transfer {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// The filesystem paths this target names (one or two)
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Target::Path(p) => vec![p],
            Target::Transfer {
                source,
                destination,
            } => vec![source, destination],
        }
    }

    /// Whether a requested target is covered by this (granted) target
    ///
    /// Paths match on equality or when the requested path extends the
    /// granted prefix. Transfers match component-wise on equality only.
    pub fn covers(&self, requested: &Target) -> bool {
        match (self, requested) {
            (Target::Path(granted), Target::Path(req)) => {
                req == granted || std::path::Path::new(req).starts_with(granted)
            }
            (
                Target::Transfer {
                    source: gs,
                    destination: gd,
                },
                Target::Transfer {
                    source: rs,
                    destination: rd,
                },
            ) => gs == rs && gd == rd,
            _ => false,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Path(p) => write!(f, "{}", p),
            Target::Transfer {
                source,
                destination,
            } => write!(f, "{} -> {}", source, destination),
        }
    }
}

/// An approved, possibly time-limited authorization for one (action, target)
///
/// Revocation is a soft delete: `allowed` flips to false and `revoked_at`
/// is stamped, but the record is kept for audit completeness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub id: String,
    pub action: String,
    pub target: Target,
    pub granted_by: String,
    pub granted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl PermissionGrant {
    /// Usable iff still allowed and not past its expiry
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.allowed && self.expires_at.map(|e| now < e).unwrap_or(true)
    }
}

/// A pending, unapproved ask for a grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub id: String,
    pub action: String,
    pub target: Target,
    pub requester: String,
    pub created_at: DateTime<Utc>,
}

/// A configured path prefix that authorizes matching operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AllowedPathRepr")]
pub struct AllowedPath {
    pub path: String,
    #[serde(default)]
    pub read_only: bool,
}

/// Accepts both the bare-string and the `{path, read_only}` store forms
#[derive(Deserialize)]
#[serde(untagged)]
enum AllowedPathRepr {
    Plain(String),
    Full {
        path: String,
        #[serde(default)]
        read_only: bool,
    },
}

impl From<AllowedPathRepr> for AllowedPath {
    fn from(repr: AllowedPathRepr) -> Self {
        match repr {
            AllowedPathRepr::Plain(path) => AllowedPath {
                path,
                read_only: false,
            },
            AllowedPathRepr::Full { path, read_only } => AllowedPath { path, read_only },
        }
    }
}

/// An immutable record of a policy decision or state change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub event: String,
    pub details: Value,
    pub ts: DateTime<Utc>,
}

/// Machine-readable reason a permission check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckFailure {
    PermissionNotFound,
    PermissionNotAllowed,
    PermissionExpired,
    ActionMismatch,
    TargetMismatch,
    NoMatchingPermission,
}

impl CheckFailure {
    /// The stable reason tag, suitable for audit details and replies
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckFailure::PermissionNotFound => "permission_not_found",
            CheckFailure::PermissionNotAllowed => "permission_not_allowed",
            CheckFailure::PermissionExpired => "permission_expired",
            CheckFailure::ActionMismatch => "action_mismatch",
            CheckFailure::TargetMismatch => "target_mismatch",
            CheckFailure::NoMatchingPermission => "no_matching_permission",
        }
    }
}

impl std::fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_path_covers_prefix() {
        let granted = Target::path("/data");
        assert!(granted.covers(&Target::path("/data")));
        assert!(granted.covers(&Target::path("/data/readme.txt")));
        assert!(granted.covers(&Target::path("/data/sub/deep.txt")));
        assert!(!granted.covers(&Target::path("/database")));
        assert!(!granted.covers(&Target::path("/other")));
    }

    #[test]
    fn test_target_transfer_exact_match_only() {
        let granted = Target::transfer("/data/a.txt", "/data/b.txt");
        assert!(granted.covers(&Target::transfer("/data/a.txt", "/data/b.txt")));
        assert!(!granted.covers(&Target::transfer("/data/a.txt", "/data/c.txt")));
        assert!(!granted.covers(&Target::path("/data/a.txt")));
    }

    #[test]
    fn test_target_serde_round_trip() {
        let path = Target::path("/data/x");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/data/x\"");
        assert_eq!(serde_json::from_str::<Target>(&json).unwrap(), path);

        let transfer = Target::transfer("/a", "/b");
        let json = serde_json::to_string(&transfer).unwrap();
        let back: Target = serde_json::from_str(&json).unwrap();
        assert_eq!(back, transfer);
    }

    #[test]
    fn test_grant_usability() {
        let now = Utc::now();
        let mut grant = PermissionGrant {
            id: "g1".into(),
            action: "read_file".into(),
            target: Target::path("/data"),
            granted_by: "admin".into(),
            granted_at: now,
            expires_at: None,
            allowed: true,
            revoked_at: None,
        };
        assert!(grant.is_usable(now));

        grant.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(!grant.is_usable(now));

        grant.expires_at = Some(now + chrono::Duration::seconds(60));
        assert!(grant.is_usable(now));

        grant.allowed = false;
        assert!(!grant.is_usable(now));
    }

    #[test]
    fn test_allowed_path_accepts_both_forms() {
        let plain: AllowedPath = serde_json::from_str("\"/data\"").unwrap();
        assert_eq!(plain.path, "/data");
        assert!(!plain.read_only);

        let full: AllowedPath =
            serde_json::from_str(r#"{"path": "/docs", "read_only": true}"#).unwrap();
        assert_eq!(full.path, "/docs");
        assert!(full.read_only);
    }

    #[test]
    fn test_check_failure_tags() {
        assert_eq!(
            CheckFailure::NoMatchingPermission.as_str(),
            "no_matching_permission"
        );
        assert_eq!(CheckFailure::PermissionExpired.to_string(), "permission_expired");
    }
}
