//! Utility engine
//!
//! Checksums, archive creation/listing, git inspection, and file metadata.
//! Archives and git go through the system binaries (`tar`, `zip`, `git`);
//! checksums are computed in-process. All path operations are gated and
//! audited like every other engine.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::bus::EventBus;
use crate::core::{events, hex_digest};
use crate::permissions::PermissionsEngine;

/// Gated utility operations
pub struct UtilityEngine {
    permissions: Arc<PermissionsEngine>,
    bus: Arc<EventBus>,
}

impl UtilityEngine {
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

    /// Hash a file with sha256 (default) or sha1
    pub fn calculate_checksum(&self, path: &str, algorithm: &str) -> Option<String> {
        if !self.gate(path, "read", "checksum") {
            return None;
        }
        let checksum = match algorithm {
            "sha256" => hash_file::<Sha256>(path),
            "sha1" => hash_file::<Sha1>(path),
            other => {
                tracing::warn!("[UtilityEngine] Unsupported algorithm '{}'", other);
                return None;
            }
        }?;

        self.permissions.audit(
            "checksum_success",
            json!({ "path": path, "algorithm": algorithm }),
        );
        self.bus.emit(
            events::CHECKSUM_CALCULATED,
            json!({ "path": path, "algorithm": algorithm, "checksum": checksum }),
        );
        Some(checksum)
    }

    /// Compare a file's hash against an expected value
    pub fn verify_checksum(&self, path: &str, expected: &str, algorithm: &str) -> bool {
        match self.calculate_checksum(path, algorithm) {
            Some(actual) => actual.eq_ignore_ascii_case(expected),
            None => false,
        }
    }

    /// Size/timestamps/extension for one file
    pub fn file_metadata(&self, path: &str) -> Option<Value> {
        if !self.gate(path, "read", "metadata") {
            return None;
        }
        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("[UtilityEngine] Failed to stat {}: {}", path, e);
                return None;
            }
        };
        self.permissions
            .audit("metadata_success", json!({ "path": path }));
        Some(json!({
            "path": path,
            "size": meta.len(),
            "is_dir": meta.is_dir(),
            "readonly": meta.permissions().readonly(),
            "extension": Path::new(path).extension().map(|e| e.to_string_lossy()),
            "modified": meta.modified().ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339()),
            "created": meta.created().ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339()),
        }))
    }

    /// Whether the path is inside a git work tree
    pub fn is_git_repository(&self, path: &str) -> bool {
        Path::new(path).join(".git").exists()
    }

    /// Branch and change counts from `git status --porcelain`
    pub fn git_status(&self, repo_path: &str) -> Option<Value> {
        if !self.gate(repo_path, "read", "git_status") {
            return None;
        }
        if !self.is_git_repository(repo_path) {
            return None;
        }

        let output = Command::new("git")
            .args(["-C", repo_path, "status", "--porcelain", "--branch"])
            .output()
            .ok()?;
        if !output.status.success() {
            tracing::warn!(
                "[UtilityEngine] git status failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let mut branch = String::new();
        let mut staged = 0usize;
        let mut modified = 0usize;
        let mut untracked = 0usize;
        for line in text.lines() {
            if let Some(rest) = line.strip_prefix("## ") {
                branch = rest.split("...").next().unwrap_or(rest).to_string();
            } else if line.starts_with("??") {
                untracked += 1;
            } else {
                let mut chars = line.chars();
                let index_state = chars.next().unwrap_or(' ');
                let worktree_state = chars.next().unwrap_or(' ');
                if index_state != ' ' {
                    staged += 1;
                }
                if worktree_state != ' ' {
                    modified += 1;
                }
            }
        }

        let status = json!({
            "path": repo_path,
            "branch": branch,
            "staged": staged,
            "modified": modified,
            "untracked": untracked,
            "clean": staged == 0 && modified == 0 && untracked == 0,
        });

        self.permissions
            .audit("git_status_success", json!({ "path": repo_path }));
        self.bus.emit(
            events::GIT_STATUS_QUERIED,
            json!({ "path": repo_path, "branch": status["branch"] }),
        );
        Some(status)
    }

    /// Recent commits: hash, author, date, subject
    pub fn git_log(&self, repo_path: &str, limit: usize) -> Vec<Value> {
        if !self.gate(repo_path, "read", "git_log") || !self.is_git_repository(repo_path) {
            return Vec::new();
        }

        let output = match Command::new("git")
            .args([
                "-C",
                repo_path,
                "log",
                "--pretty=format:%H%x1f%an%x1f%aI%x1f%s",
                &format!("-n{}", limit),
            ])
            .output()
        {
            Ok(output) if output.status.success() => output,
            _ => return Vec::new(),
        };

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| {
                let parts: Vec<&str> = line.split('\x1f').collect();
                if parts.len() == 4 {
                    Some(json!({
                        "hash": parts[0],
                        "author": parts[1],
                        "date": parts[2],
                        "subject": parts[3],
                    }))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Pack a file or directory into a zip or tar.gz archive
    pub fn create_archive(&self, source_path: &str, archive_path: &str, format: &str) -> bool {
        if !self.gate(source_path, "read", "archive")
            || !self.gate(archive_path, "write", "archive")
        {
            return false;
        }
        let source = Path::new(source_path);
        if !source.exists() {
            return false;
        }
        let (parent, name) = match (source.parent(), source.file_name()) {
            (Some(parent), Some(name)) => (parent, name),
            _ => return false,
        };

        let status = match format {
            "zip" => Command::new("zip")
                .current_dir(parent)
                .args(["-qr", archive_path])
                .arg(name)
                .status(),
            "tar" | "tar.gz" => {
                let flags = if format == "tar" { "-cf" } else { "-czf" };
                Command::new("tar")
                    .args([flags, archive_path, "-C"])
                    .arg(parent)
                    .arg(name)
                    .status()
            }
            other => {
                tracing::warn!("[UtilityEngine] Unsupported archive format '{}'", other);
                return false;
            }
        };

        match status {
            Ok(status) if status.success() => {
                self.permissions.audit(
                    "archive_success",
                    json!({ "source": source_path, "archive": archive_path, "format": format }),
                );
                self.bus.emit(
                    events::ARCHIVE_CREATED,
                    json!({ "source": source_path, "archive": archive_path, "format": format }),
                );
                true
            }
            Ok(status) => {
                tracing::warn!("[UtilityEngine] Archiver exited with {}", status);
                false
            }
            Err(e) => {
                tracing::warn!("[UtilityEngine] Failed to run archiver: {}", e);
                false
            }
        }
    }

    /// Entry names inside a zip or tar archive
    pub fn list_archive_contents(&self, archive_path: &str) -> Vec<String> {
        if !self.gate(archive_path, "read", "archive_list") {
            return Vec::new();
        }
        let is_zip = archive_path.ends_with(".zip");
        let output = if is_zip {
            Command::new("unzip").args(["-Z1", archive_path]).output()
        } else {
            Command::new("tar").args(["-tf", archive_path]).output()
        };

        match output {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(|l| l.to_string())
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn hash_file<D: Digest>(path: &str) -> Option<String> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!("[UtilityEngine] Failed to open {}: {}", path, e);
            return None;
        }
    };
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];
    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) => {
                tracing::warn!("[UtilityEngine] Failed to read {}: {}", path, e);
                return None;
            }
        }
    }
    Some(hex_digest(&hasher.finalize()))
}
