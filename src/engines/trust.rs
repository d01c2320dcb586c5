//! Agent trust engine
//!
//! Tracks trust levels for external agents and enforces per-level access
//! policy. Each level carries a default policy matrix over the hub's
//! resources; per-agent custom policies override the matrix. Every agent
//! keeps an access log capped at 1000 entries.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha1::{Digest, Sha1};

use crate::bus::EventBus;
use crate::core::{events, hex_digest};
use crate::permissions::PermissionsEngine;

/// Per-agent access log cap
const ACCESS_LOG_CAP: usize = 1000;

/// Agent trust levels, least to most trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Unknown,
    Untrusted,
    Limited,
    Trusted,
    Privileged,
    System,
}

impl TrustLevel {
    /// Default policy: does this level allow `action` on `resource`?
    ///
    /// Resources: `filesystem`, `chaos`, `media`, `permissions`.
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        match self {
            TrustLevel::Unknown | TrustLevel::Untrusted => false,
            TrustLevel::Limited => matches!(
                (resource, action),
                ("filesystem", "read") | ("chaos", "read") | ("media", "read")
            ),
            TrustLevel::Trusted => match (resource, action) {
                ("filesystem", "read") | ("filesystem", "write") => true,
                ("chaos", "create") | ("chaos", "read") | ("chaos", "update") => true,
                ("media", "register") | ("media", "read") | ("media", "update") => true,
                ("permissions", "read") => true,
                _ => false,
            },
            TrustLevel::Privileged | TrustLevel::System => true,
        }
    }

    /// Stable string tag
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Unknown => "unknown",
            TrustLevel::Untrusted => "untrusted",
            TrustLevel::Limited => "limited",
            TrustLevel::Trusted => "trusted",
            TrustLevel::Privileged => "privileged",
            TrustLevel::System => "system",
        }
    }

    /// Parse a string tag
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "unknown" => Some(TrustLevel::Unknown),
            "untrusted" => Some(TrustLevel::Untrusted),
            "limited" => Some(TrustLevel::Limited),
            "trusted" => Some(TrustLevel::Trusted),
            "privileged" => Some(TrustLevel::Privileged),
            "system" => Some(TrustLevel::System),
            _ => None,
        }
    }
}

/// One access log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub resource: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub success: bool,
    pub ts: DateTime<Utc>,
}

/// One registered agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub info: Value,
    pub trust_level: TrustLevel,
    pub registered_at: DateTime<Utc>,
    /// "resource:action" -> allowed, overriding the level's default matrix
    #[serde(default)]
    pub custom_policies: HashMap<String, bool>,
    #[serde(default)]
    pub access_log: Vec<AccessLogEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryData {
    #[serde(default)]
    agents: HashMap<String, AgentRecord>,
}

/// Trust bookkeeping and policy enforcement for external agents
pub struct AgentTrustEngine {
    trust_file: PathBuf,
    permissions: Arc<PermissionsEngine>,
    bus: Arc<EventBus>,
    agents: Mutex<HashMap<String, AgentRecord>>,
}

impl AgentTrustEngine {
    /// Create an engine over a trust registry file
    pub fn new(
        trust_file: impl Into<PathBuf>,
        permissions: Arc<PermissionsEngine>,
        bus: Arc<EventBus>,
    ) -> Self {
        let trust_file = trust_file.into();
        let agents = load_registry(&trust_file);
        Self {
            trust_file,
            permissions,
            bus,
            agents: Mutex::new(agents),
        }
    }

    fn save(&self, agents: &HashMap<String, AgentRecord>) -> bool {
        let data = RegistryData {
            agents: agents.clone(),
        };
        match serde_json::to_string_pretty(&data) {
            Ok(jsonified) => match fs::write(&self.trust_file, jsonified) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("[AgentTrustEngine] Failed to save registry: {}", e);
                    false
                }
            },
            Err(e) => {
                tracing::error!("[AgentTrustEngine] Failed to serialize registry: {}", e);
                false
            }
        }
    }

    /// Register a new agent, returning its id
    pub fn register_agent(&self, name: &str, info: Value, initial_trust: TrustLevel) -> String {
        let mut hasher = Sha1::new();
        hasher.update(name.as_bytes());
        hasher.update(Utc::now().to_rfc3339().as_bytes());
        let agent_id = hex_digest(&hasher.finalize())[..16].to_string();

        let record = AgentRecord {
            id: agent_id.clone(),
            name: name.to_string(),
            info,
            trust_level: initial_trust,
            registered_at: Utc::now(),
            custom_policies: HashMap::new(),
            access_log: Vec::new(),
        };

        {
            let mut agents = self.agents.lock().unwrap();
            agents.insert(agent_id.clone(), record);
            self.save(&agents);
        }

        self.permissions.audit(
            "agent_registered",
            json!({ "agent_id": agent_id, "name": name, "trust_level": initial_trust.as_str() }),
        );
        self.bus.emit(
            events::AGENT_REGISTERED,
            json!({ "agent_id": agent_id, "name": name }),
        );
        tracing::info!("[AgentTrustEngine] Registered agent '{}' as {}", name, agent_id);
        agent_id
    }

    /// Change an agent's trust level
    pub fn set_trust_level(&self, agent_id: &str, level: TrustLevel, reason: Option<&str>) -> bool {
        let changed = {
            let mut agents = self.agents.lock().unwrap();
            match agents.get_mut(agent_id) {
                Some(record) => {
                    record.trust_level = level;
                    self.save(&agents)
                }
                None => return false,
            }
        };
        if changed {
            self.permissions.audit(
                "trust_level_set",
                json!({ "agent_id": agent_id, "level": level.as_str(), "reason": reason }),
            );
            self.bus.emit(
                events::AGENT_TRUST_CHANGED,
                json!({ "agent_id": agent_id, "level": level.as_str(), "reason": reason }),
            );
        }
        changed
    }

    /// An agent's current trust level
    pub fn trust_level(&self, agent_id: &str) -> Option<TrustLevel> {
        self.agents
            .lock()
            .unwrap()
            .get(agent_id)
            .map(|r| r.trust_level)
    }

    /// Full record for one agent
    pub fn agent_info(&self, agent_id: &str) -> Option<AgentRecord> {
        self.agents.lock().unwrap().get(agent_id).cloned()
    }

    /// All agents, optionally filtered by trust level
    pub fn list_agents(&self, level: Option<TrustLevel>) -> Vec<AgentRecord> {
        let agents = self.agents.lock().unwrap();
        let mut list: Vec<AgentRecord> = agents
            .values()
            .filter(|r| level.map(|l| r.trust_level == l).unwrap_or(true))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Policy check: custom overrides first, then the level's matrix
    ///
    /// Unknown agents are denied.
    pub fn check_permission(&self, agent_id: &str, resource: &str, action: &str) -> bool {
        let agents = self.agents.lock().unwrap();
        let record = match agents.get(agent_id) {
            Some(record) => record,
            None => return false,
        };
        let key = format!("{}:{}", resource, action);
        match record.custom_policies.get(&key) {
            Some(allowed) => *allowed,
            None => record.trust_level.allows(resource, action),
        }
    }

    /// Set a per-agent policy override
    pub fn set_custom_policy(
        &self,
        agent_id: &str,
        resource: &str,
        action: &str,
        allowed: bool,
    ) -> bool {
        let key = format!("{}:{}", resource, action);
        let mut agents = self.agents.lock().unwrap();
        match agents.get_mut(agent_id) {
            Some(record) => {
                record.custom_policies.insert(key, allowed);
                self.save(&agents)
            }
            None => false,
        }
    }

    /// Remove a per-agent policy override
    pub fn remove_custom_policy(&self, agent_id: &str, resource: &str, action: &str) -> bool {
        let key = format!("{}:{}", resource, action);
        let mut agents = self.agents.lock().unwrap();
        match agents.get_mut(agent_id) {
            Some(record) => {
                record.custom_policies.remove(&key);
                self.save(&agents)
            }
            None => false,
        }
    }

    /// Record an access attempt in the agent's capped log
    pub fn log_access(
        &self,
        agent_id: &str,
        resource: &str,
        action: &str,
        path: Option<&str>,
        success: bool,
    ) {
        let mut agents = self.agents.lock().unwrap();
        if let Some(record) = agents.get_mut(agent_id) {
            record.access_log.push(AccessLogEntry {
                resource: resource.to_string(),
                action: action.to_string(),
                path: path.map(|p| p.to_string()),
                success,
                ts: Utc::now(),
            });
            if record.access_log.len() > ACCESS_LOG_CAP {
                let excess = record.access_log.len() - ACCESS_LOG_CAP;
                record.access_log.drain(..excess);
            }
            self.save(&agents);
        }
    }

    /// Recent access log for one agent, newest first
    pub fn access_log(&self, agent_id: &str, limit: usize) -> Vec<AccessLogEntry> {
        let agents = self.agents.lock().unwrap();
        match agents.get(agent_id) {
            Some(record) => record.access_log.iter().rev().take(limit).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Drop an agent to untrusted and announce the revocation
    pub fn revoke_agent(&self, agent_id: &str, reason: Option<&str>) -> bool {
        if !self.set_trust_level(agent_id, TrustLevel::Untrusted, reason) {
            return false;
        }
        self.bus.emit(
            events::AGENT_REVOKED,
            json!({ "agent_id": agent_id, "reason": reason }),
        );
        true
    }

    /// Remove an agent entirely
    pub fn delete_agent(&self, agent_id: &str) -> bool {
        let mut agents = self.agents.lock().unwrap();
        if agents.remove(agent_id).is_none() {
            return false;
        }
        self.save(&agents)
    }

    /// Counts by trust level plus totals
    pub fn trust_statistics(&self) -> Value {
        let agents = self.agents.lock().unwrap();
        let mut by_level: HashMap<&'static str, usize> = HashMap::new();
        for record in agents.values() {
            *by_level.entry(record.trust_level.as_str()).or_default() += 1;
        }
        json!({
            "total": agents.len(),
            "by_level": by_level,
        })
    }

    /// Combined filesystem gate: trust policy plus path rules
    ///
    /// The attempt is logged either way, and denials are audited.
    pub fn enforce_filesystem_access(&self, agent_id: &str, path: &str, action: &str) -> bool {
        let allowed = self.check_permission(agent_id, "filesystem", action)
            && self.permissions.is_path_allowed(path, action);
        self.log_access(agent_id, "filesystem", action, Some(path), allowed);
        if !allowed {
            self.permissions.audit(
                "agent_fs_denied",
                json!({ "agent_id": agent_id, "path": path, "action": action }),
            );
        }
        allowed
    }
}

fn load_registry(trust_file: &PathBuf) -> HashMap<String, AgentRecord> {
    if !trust_file.exists() {
        return HashMap::new();
    }
    match fs::read_to_string(trust_file) {
        Ok(raw) => match serde_json::from_str::<RegistryData>(&raw) {
            Ok(data) => data.agents,
            Err(e) => {
                tracing::warn!("[AgentTrustEngine] Unreadable registry: {}", e);
                HashMap::new()
            }
        },
        Err(e) => {
            tracing::warn!("[AgentTrustEngine] Failed to read registry: {}", e);
            HashMap::new()
        }
    }
}
