//! Hub configuration
//!
//! One `HubConfig` carries everything the hub needs: where its stores
//! live, where the gateway binds, and the permission-store knobs.
//!
//! ```ignore
//! let config = HubConfig::new("eden_data")
//!     .with_gateway_addr("127.0.0.1", 8765)
//!     .with_audit_cap(Some(1000))
//!     .with_exclusion_zones(vec!["/etc".into()]);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::gateway::GatewayConfig;
use crate::permissions::{DEFAULT_AUDIT_CAP, DEFAULT_CACHE_TTL};

/// Default base directory for hub state
const DEFAULT_DATA_DIR: &str = "eden_data";

/// Configuration for a Hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Base directory for all hub-owned state
    pub data_dir: PathBuf,

    /// Gateway bind address
    pub gateway: GatewayConfig,

    /// Audit log cap (None disables capping)
    pub audit_cap: Option<usize>,

    /// Permission-store read-cache lifetime
    pub cache_ttl: Duration,

    /// Path prefixes that are always denied
    pub exclusion_zones: Vec<String>,
}

impl HubConfig {
    /// Create a configuration rooted at a data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            gateway: GatewayConfig::default(),
            audit_cap: Some(DEFAULT_AUDIT_CAP),
            cache_ttl: DEFAULT_CACHE_TTL,
            exclusion_zones: default_exclusion_zones(),
        }
    }

    /// Read configuration from `EDEN_HUB_*` environment variables
    ///
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::new(
            std::env::var("EDEN_HUB_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()),
        );
        if let Ok(host) = std::env::var("EDEN_HUB_GATEWAY_HOST") {
            config.gateway.host = host;
        }
        if let Ok(port) = std::env::var("EDEN_HUB_GATEWAY_PORT") {
            match port.parse() {
                Ok(port) => config.gateway.port = port,
                Err(_) => tracing::warn!("[HubConfig] Ignoring invalid EDEN_HUB_GATEWAY_PORT"),
            }
        }
        config
    }

    /// Set the gateway bind address
    pub fn with_gateway_addr(mut self, host: impl Into<String>, port: u16) -> Self {
        self.gateway = GatewayConfig {
            host: host.into(),
            port,
        };
        self
    }

    /// Set the audit log cap (`None` disables capping)
    pub fn with_audit_cap(mut self, cap: Option<usize>) -> Self {
        self.audit_cap = cap;
        self
    }

    /// Set the permission-store read-cache lifetime
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Replace the exclusion zones
    pub fn with_exclusion_zones(mut self, zones: Vec<String>) -> Self {
        self.exclusion_zones = zones;
        self
    }

    /// Path of the permission store file
    pub fn permissions_file(&self) -> PathBuf {
        self.data_dir.join("permissions.json")
    }

    /// Path of the agent trust registry
    pub fn trust_file(&self) -> PathBuf {
        self.data_dir.join("agent_trust.json")
    }

    /// Path of the media registry
    pub fn media_registry_file(&self) -> PathBuf {
        self.data_dir.join("media_registry.json")
    }

    /// Path of the CHAOS registry
    pub fn chaos_registry_file(&self) -> PathBuf {
        self.data_dir.join("chaos_registry.json")
    }

    /// Directory holding CHAOS files
    pub fn chaos_dir(&self) -> PathBuf {
        self.data_dir.join("chaos_files")
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

/// System areas that are never served, regardless of grants
fn default_exclusion_zones() -> Vec<String> {
    vec!["/etc".into(), "/usr".into(), "/boot".into()]
}
