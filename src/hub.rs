//! Hub wiring
//!
//! The `Hub` is the one service object constructed at process start. It
//! owns the event bus, the permissions engine, and every domain engine,
//! subscribes the cross-engine reactions, and exposes the tool registry
//! and gateway lifecycle. There is no global state; everything an engine
//! needs is injected here.

use std::fs;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::bus::{EventBus, SYSTEM_CHANNEL};
use crate::chaos::ChaosEngine;
use crate::config::HubConfig;
use crate::core::{events, HubError, HubResult};
use crate::engines::{AgentTrustEngine, FilesystemEngine, MediaEngine, UtilityEngine};
use crate::gateway::{GatewayHandle, LocalEventGateway};
use crate::permissions::{PermissionStore, PermissionsEngine};
use crate::tools::{self, ToolRegistry};

/// The assembled hub
pub struct Hub {
    config: HubConfig,
    bus: Arc<EventBus>,
    permissions: Arc<PermissionsEngine>,
    filesystem: Arc<FilesystemEngine>,
    chaos: Arc<ChaosEngine>,
    media: Arc<MediaEngine>,
    trust: Arc<AgentTrustEngine>,
    utility: Arc<UtilityEngine>,
    tools: ToolRegistry,
    gateway: Mutex<Option<GatewayHandle>>,
}

impl Hub {
    /// Build a hub from configuration
    ///
    /// Creates the data directories, wires every engine to the shared bus
    /// and permissions engine, and allows the hub-owned directories so the
    /// registries can reach their own files.
    pub fn new(config: HubConfig) -> HubResult<Arc<Self>> {
        fs::create_dir_all(&config.data_dir)?;
        fs::create_dir_all(config.chaos_dir())?;

        let bus = Arc::new(EventBus::new());

        let store = PermissionStore::new(config.permissions_file(), config.exclusion_zones.clone())
            .with_audit_cap(config.audit_cap)
            .with_cache_ttl(config.cache_ttl);
        let permissions = Arc::new(PermissionsEngine::new(store).with_bus(bus.clone()));

        // Hub-owned state must be reachable by the engines that manage it
        let data_dir = config.data_dir.to_string_lossy().into_owned();
        permissions.add_allowed_path(&data_dir, false);

        let filesystem = Arc::new(FilesystemEngine::new(permissions.clone(), bus.clone()));
        let chaos = Arc::new(ChaosEngine::new(
            config.chaos_dir(),
            config.chaos_registry_file(),
            permissions.clone(),
            bus.clone(),
        ));
        let media = Arc::new(MediaEngine::new(
            config.media_registry_file(),
            permissions.clone(),
            bus.clone(),
        ));
        let trust = Arc::new(AgentTrustEngine::new(
            config.trust_file(),
            permissions.clone(),
            bus.clone(),
        ));
        let utility = Arc::new(UtilityEngine::new(permissions.clone(), bus.clone()));

        // Cross-engine reactions
        {
            let permissions = permissions.clone();
            bus.subscribe(SYSTEM_CHANNEL, move |event| {
                permissions.handle_event(event);
                Ok(())
            });
        }

        let tools = tools::default_registry(
            &permissions,
            &filesystem,
            &chaos,
            &media,
            &trust,
            &utility,
        );

        tracing::info!(
            "[Hub] Initialized with {} tools, data dir {}",
            tools.len(),
            config.data_dir.display()
        );

        Ok(Arc::new(Self {
            config,
            bus,
            permissions,
            filesystem,
            chaos,
            media,
            trust,
            utility,
            tools,
            gateway: Mutex::new(None),
        }))
    }

    /// Publish a `{type, payload}` envelope on the system channel
    pub fn emit(&self, event_type: &str, payload: Value) {
        self.bus.emit(event_type, payload);
    }

    /// Start the local event gateway
    ///
    /// Returns the actual bound address. Starting twice is an error until
    /// `stop_gateway` is called.
    pub fn start_gateway(&self) -> HubResult<SocketAddr> {
        let mut guard = self.gateway.lock().unwrap();
        if guard.is_some() {
            return Err(HubError::other("Gateway already running"));
        }

        let handle =
            LocalEventGateway::new(self.config.gateway.clone(), self.bus.clone()).start()?;
        let addr = handle.local_addr();
        *guard = Some(handle);
        drop(guard);

        self.emit(
            events::SYSTEM_STARTED,
            json!({
                "component": "local_event_gateway",
                "host": addr.ip().to_string(),
                "port": addr.port(),
            }),
        );
        Ok(addr)
    }

    /// Stop the gateway if it is running
    pub fn stop_gateway(&self) {
        let handle = self.gateway.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.stop();
        }
    }

    /// The shared event bus
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The permissions engine
    pub fn permissions(&self) -> &Arc<PermissionsEngine> {
        &self.permissions
    }

    /// The filesystem engine
    pub fn filesystem(&self) -> &Arc<FilesystemEngine> {
        &self.filesystem
    }

    /// The CHAOS engine
    pub fn chaos(&self) -> &Arc<ChaosEngine> {
        &self.chaos
    }

    /// The media engine
    pub fn media(&self) -> &Arc<MediaEngine> {
        &self.media
    }

    /// The agent trust engine
    pub fn trust(&self) -> &Arc<AgentTrustEngine> {
        &self.trust
    }

    /// The utility engine
    pub fn utility(&self) -> &Arc<UtilityEngine> {
        &self.utility
    }

    /// The tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The configuration the hub was built from
    pub fn config(&self) -> &HubConfig {
        &self.config
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        self.stop_gateway();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRequest;
    use serde_json::json;
    use tempfile::TempDir;

    fn hub_in(dir: &TempDir) -> Arc<Hub> {
        let config = HubConfig::new(dir.path().join("eden_data"))
            .with_gateway_addr("127.0.0.1", 0)
            .with_cache_ttl(std::time::Duration::from_millis(0));
        Hub::new(config).unwrap()
    }

    #[test]
    fn test_hub_builds_and_allows_own_dirs() {
        let dir = TempDir::new().unwrap();
        let hub = hub_in(&dir);

        assert!(hub.config().chaos_dir().exists());
        let chaos_file = hub.config().chaos_dir().join("x.chaos");
        assert!(hub
            .permissions()
            .is_path_allowed(&chaos_file.to_string_lossy(), "create"));
    }

    #[test]
    fn test_tools_registered() {
        let dir = TempDir::new().unwrap();
        let hub = hub_in(&dir);
        let names = hub.tools().tool_names();
        for expected in [
            "request_permission",
            "grant_permission",
            "read_file",
            "execute_move",
            "create_chaos_file",
            "register_media",
            "set_agent_trust_level",
            "calculate_checksum",
        ] {
            assert!(names.contains(&expected), "missing tool {}", expected);
        }
    }

    #[tokio::test]
    async fn test_tool_flow_through_registry() {
        let dir = TempDir::new().unwrap();
        let hub = hub_in(&dir);

        let response = hub
            .tools()
            .dispatch(&ToolRequest {
                tool_name: "create_chaos_file".into(),
                args: json!({"filename": "dawn.chaos", "content": "[event]: light"}),
            })
            .await;
        assert!(response.ok, "{:?}", response.error);

        let response = hub
            .tools()
            .dispatch(&ToolRequest {
                tool_name: "get_chaos_file".into(),
                args: json!({"filename": "dawn.chaos"}),
            })
            .await;
        assert_eq!(response.result.as_deref(), Some("[event]: light"));
    }

    #[test]
    fn test_chaos_creation_reaches_permissions_audit() {
        let dir = TempDir::new().unwrap();
        let hub = hub_in(&dir);

        assert!(hub.chaos().create_file("dawn.chaos", "[event]: light"));

        // The bus reaction notes the creation in the audit log
        let noted = hub
            .permissions()
            .audit_log(100)
            .into_iter()
            .any(|e| e.event == "chaos_creation_noted");
        assert!(noted);
    }

    #[test]
    fn test_gateway_lifecycle() {
        let dir = TempDir::new().unwrap();
        let hub = hub_in(&dir);

        let addr = hub.start_gateway().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(hub.start_gateway().is_err());

        hub.stop_gateway();
        let addr2 = hub.start_gateway().unwrap();
        assert_ne!(addr2.port(), 0);
        hub.stop_gateway();
    }
}
