//! Domain engines
//!
//! Each engine wraps one narrow domain, gates every path-based or mutating
//! operation through the permissions engine (auditing both outcomes), and
//! announces successful mutations on the event bus. Failures surface as
//! `false`/`None` sentinels, never as errors.

pub mod filesystem;
pub mod media;
pub mod trust;
pub mod utility;

pub use filesystem::FilesystemEngine;
pub use media::{MediaEngine, MediaRecord};
pub use trust::{AccessLogEntry, AgentRecord, AgentTrustEngine, TrustLevel};
pub use utility::UtilityEngine;
