//! Agent trust tool adapters

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engines::{AgentTrustEngine, TrustLevel};

use super::tool::{optional_bool, optional_i64, optional_str, required_str, HubTool, ToolResult};

/// Register an agent in the trust registry
pub struct RegisterAgentTool {
    trust: Arc<AgentTrustEngine>,
}

impl RegisterAgentTool {
    pub fn new(trust: Arc<AgentTrustEngine>) -> Self {
        Self { trust }
    }
}

#[async_trait]
impl HubTool for RegisterAgentTool {
    fn name(&self) -> &str {
        "register_agent"
    }

    fn description(&self) -> &str {
        "Register an agent with an initial trust level"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let name = required_str(args, "name")?;
        let info = args.get("info").cloned().unwrap_or_else(|| json!({}));
        let initial = optional_str(args, "trust_level")
            .and_then(TrustLevel::parse)
            .unwrap_or(TrustLevel::Unknown);

        let agent_id = self.trust.register_agent(name, info, initial);
        Ok(ToolResult::json(&json!({
            "status": "registered",
            "agent_id": agent_id,
            "trust_level": initial.as_str(),
        })))
    }
}

/// Change an agent's trust level
pub struct SetAgentTrustLevelTool {
    trust: Arc<AgentTrustEngine>,
}

impl SetAgentTrustLevelTool {
    pub fn new(trust: Arc<AgentTrustEngine>) -> Self {
        Self { trust }
    }
}

#[async_trait]
impl HubTool for SetAgentTrustLevelTool {
    fn name(&self) -> &str {
        "set_agent_trust_level"
    }

    fn description(&self) -> &str {
        "Set an agent's trust level"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let agent_id = required_str(args, "agent_id")?;
        let level = match TrustLevel::parse(required_str(args, "trust_level")?) {
            Some(level) => level,
            None => return Ok(ToolResult::error("Unknown trust level")),
        };
        let reason = optional_str(args, "reason");

        if self.trust.set_trust_level(agent_id, level, reason) {
            Ok(ToolResult::success(format!(
                "Agent {} set to {}",
                agent_id,
                level.as_str()
            )))
        } else {
            Ok(ToolResult::error(format!("Unknown agent: {}", agent_id)))
        }
    }
}

/// Look up an agent's trust level
pub struct GetAgentTrustLevelTool {
    trust: Arc<AgentTrustEngine>,
}

impl GetAgentTrustLevelTool {
    pub fn new(trust: Arc<AgentTrustEngine>) -> Self {
        Self { trust }
    }
}

#[async_trait]
impl HubTool for GetAgentTrustLevelTool {
    fn name(&self) -> &str {
        "get_agent_trust_level"
    }

    fn description(&self) -> &str {
        "Get an agent's current trust level"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let agent_id = required_str(args, "agent_id")?;
        match self.trust.trust_level(agent_id) {
            Some(level) => Ok(ToolResult::json(&json!({
                "agent_id": agent_id,
                "trust_level": level.as_str(),
            }))),
            None => Ok(ToolResult::error(format!("Unknown agent: {}", agent_id))),
        }
    }
}

/// List registered agents
pub struct ListAgentsTool {
    trust: Arc<AgentTrustEngine>,
}

impl ListAgentsTool {
    pub fn new(trust: Arc<AgentTrustEngine>) -> Self {
        Self { trust }
    }
}

#[async_trait]
impl HubTool for ListAgentsTool {
    fn name(&self) -> &str {
        "list_agents"
    }

    fn description(&self) -> &str {
        "List registered agents, optionally filtered by trust level"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let filter = optional_str(args, "trust_level").and_then(TrustLevel::parse);
        let agents: Vec<Value> = self
            .trust
            .list_agents(filter)
            .into_iter()
            .map(|record| {
                json!({
                    "agent_id": record.id,
                    "name": record.name,
                    "trust_level": record.trust_level.as_str(),
                    "registered_at": record.registered_at,
                })
            })
            .collect();
        Ok(ToolResult::json(&json!({ "agents": agents })))
    }
}

/// Liveness check for a registered agent
pub struct AgentPingTool {
    trust: Arc<AgentTrustEngine>,
}

impl AgentPingTool {
    pub fn new(trust: Arc<AgentTrustEngine>) -> Self {
        Self { trust }
    }
}

#[async_trait]
impl HubTool for AgentPingTool {
    fn name(&self) -> &str {
        "agent_ping"
    }

    fn description(&self) -> &str {
        "Check that an agent is registered and report its trust level"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let agent_id = required_str(args, "agent_id")?;
        match self.trust.trust_level(agent_id) {
            Some(level) => Ok(ToolResult::json(&json!({
                "agent_id": agent_id,
                "alive": true,
                "trust_level": level.as_str(),
            }))),
            None => Ok(ToolResult::error(format!("Unknown agent: {}", agent_id))),
        }
    }
}

/// Revoke an agent
pub struct RevokeAgentTool {
    trust: Arc<AgentTrustEngine>,
}

impl RevokeAgentTool {
    pub fn new(trust: Arc<AgentTrustEngine>) -> Self {
        Self { trust }
    }
}

#[async_trait]
impl HubTool for RevokeAgentTool {
    fn name(&self) -> &str {
        "revoke_agent"
    }

    fn description(&self) -> &str {
        "Drop an agent to untrusted and announce the revocation"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let agent_id = required_str(args, "agent_id")?;
        let reason = optional_str(args, "reason");
        if self.trust.revoke_agent(agent_id, reason) {
            Ok(ToolResult::success(format!("Agent {} revoked", agent_id)))
        } else {
            Ok(ToolResult::error(format!("Unknown agent: {}", agent_id)))
        }
    }
}

/// Set a per-agent policy override
pub struct SetAgentPolicyTool {
    trust: Arc<AgentTrustEngine>,
}

impl SetAgentPolicyTool {
    pub fn new(trust: Arc<AgentTrustEngine>) -> Self {
        Self { trust }
    }
}

#[async_trait]
impl HubTool for SetAgentPolicyTool {
    fn name(&self) -> &str {
        "set_agent_policy"
    }

    fn description(&self) -> &str {
        "Set a per-agent (resource, action) policy override"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let agent_id = required_str(args, "agent_id")?;
        let resource = required_str(args, "resource")?;
        let action = required_str(args, "action")?;
        let allowed = optional_bool(args, "allowed").unwrap_or(false);

        if self.trust.set_custom_policy(agent_id, resource, action, allowed) {
            Ok(ToolResult::success(format!(
                "Policy {}:{} = {} for {}",
                resource, action, allowed, agent_id
            )))
        } else {
            Ok(ToolResult::error(format!("Unknown agent: {}", agent_id)))
        }
    }
}

/// Recent access log entries for one agent
pub struct GetAgentAccessLogTool {
    trust: Arc<AgentTrustEngine>,
}

impl GetAgentAccessLogTool {
    pub fn new(trust: Arc<AgentTrustEngine>) -> Self {
        Self { trust }
    }
}

#[async_trait]
impl HubTool for GetAgentAccessLogTool {
    fn name(&self) -> &str {
        "get_agent_access_log"
    }

    fn description(&self) -> &str {
        "Recent access log entries for one agent, newest first"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let agent_id = required_str(args, "agent_id")?;
        let limit = optional_i64(args, "limit").unwrap_or(100).max(0) as usize;
        let log = self.trust.access_log(agent_id, limit);
        Ok(ToolResult::json(&json!({ "agent_id": agent_id, "access_log": log })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::permissions::{PermissionStore, PermissionsEngine};
    use tempfile::TempDir;

    fn trust_in(dir: &TempDir) -> Arc<AgentTrustEngine> {
        let store = PermissionStore::new(dir.path().join("permissions.json"), vec![]);
        let permissions = Arc::new(PermissionsEngine::new(store));
        Arc::new(AgentTrustEngine::new(
            dir.path().join("agent_trust.json"),
            permissions,
            Arc::new(EventBus::new()),
        ))
    }

    #[tokio::test]
    async fn test_register_and_trust_flow() {
        let dir = TempDir::new().unwrap();
        let trust = trust_in(&dir);

        let registered = RegisterAgentTool::new(trust.clone())
            .execute(&json!({"name": "chronicler", "trust_level": "limited"}))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&registered.output).unwrap();
        let agent_id = body["agent_id"].as_str().unwrap().to_string();

        let set = SetAgentTrustLevelTool::new(trust.clone())
            .execute(&json!({"agent_id": agent_id, "trust_level": "trusted"}))
            .await
            .unwrap();
        assert!(!set.is_error);

        let level = GetAgentTrustLevelTool::new(trust.clone())
            .execute(&json!({"agent_id": agent_id}))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&level.output).unwrap();
        assert_eq!(body["trust_level"], "trusted");

        let ping = AgentPingTool::new(trust)
            .execute(&json!({"agent_id": agent_id}))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&ping.output).unwrap();
        assert_eq!(body["alive"], true);
    }

    #[tokio::test]
    async fn test_invalid_trust_level() {
        let dir = TempDir::new().unwrap();
        let trust = trust_in(&dir);
        let result = SetAgentTrustLevelTool::new(trust)
            .execute(&json!({"agent_id": "x", "trust_level": "supreme"}))
            .await
            .unwrap();
        assert!(result.is_error);
    }
}
