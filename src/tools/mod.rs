//! Hub tools
//!
//! The tool-call boundary: a typed `{tool_name, args}` request dispatched
//! through the `ToolRegistry` to thin adapters over the engines. The outer
//! transport that delivers requests is not part of this crate.

pub mod chaos_tools;
pub mod filesystem_tools;
pub mod media_tools;
pub mod permission_tools;
pub mod registry;
pub mod tool;
pub mod trust_tools;
pub mod utility_tools;

pub use registry::{ToolRegistry, ToolRequest, ToolResponse};
pub use tool::{HubTool, ToolResult};

use std::sync::Arc;

use crate::chaos::ChaosEngine;
use crate::engines::{AgentTrustEngine, FilesystemEngine, MediaEngine, UtilityEngine};
use crate::permissions::PermissionsEngine;

/// Build a registry holding the full hub tool surface
pub fn default_registry(
    permissions: &Arc<PermissionsEngine>,
    filesystem: &Arc<FilesystemEngine>,
    chaos: &Arc<ChaosEngine>,
    media: &Arc<MediaEngine>,
    trust: &Arc<AgentTrustEngine>,
    utility: &Arc<UtilityEngine>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // Permissions
    registry.register(permission_tools::RequestPermissionTool::new(permissions.clone()));
    registry.register(permission_tools::GrantPermissionTool::new(permissions.clone()));
    registry.register(permission_tools::RevokePermissionTool::new(permissions.clone()));
    registry.register(permission_tools::CheckPermissionTool::new(permissions.clone()));
    registry.register(permission_tools::ListAllowedPathsTool::new(permissions.clone()));
    registry.register(permission_tools::AddAllowedPathTool::new(permissions.clone()));
    registry.register(permission_tools::RemoveAllowedPathTool::new(permissions.clone()));
    registry.register(permission_tools::AuditLogTool::new(permissions.clone()));
    registry.register(permission_tools::SetCapabilityTool::new(permissions.clone()));
    registry.register(permission_tools::CheckCapabilityTool::new(permissions.clone()));

    // Filesystem (direct)
    registry.register(filesystem_tools::ReadFileTool::new(filesystem.clone()));
    registry.register(filesystem_tools::WriteFileTool::new(filesystem.clone()));
    registry.register(filesystem_tools::AppendFileTool::new(filesystem.clone()));
    registry.register(filesystem_tools::DeleteFileTool::new(filesystem.clone()));
    registry.register(filesystem_tools::CopyFileTool::new(filesystem.clone()));
    registry.register(filesystem_tools::ListDirTool::new(filesystem.clone()));
    registry.register(filesystem_tools::FindFilesTool::new(filesystem.clone()));
    registry.register(filesystem_tools::MapDirectoryTool::new(filesystem.clone()));
    registry.register(filesystem_tools::FileInfoTool::new(filesystem.clone()));
    registry.register(filesystem_tools::CreateDirectoryTool::new(filesystem.clone()));

    // Filesystem (request/execute flow)
    registry.register(filesystem_tools::CreateFileTool::new(permissions.clone()));
    registry.register(filesystem_tools::MoveFileTool::new(permissions.clone()));
    registry.register(filesystem_tools::RenameFileTool::new(permissions.clone()));
    registry.register(filesystem_tools::ExecuteReadTool::new(permissions.clone()));
    registry.register(filesystem_tools::ExecuteCreateTool::new(permissions.clone()));
    registry.register(filesystem_tools::ExecuteMoveTool::new(permissions.clone()));
    registry.register(filesystem_tools::ExecuteRenameTool::new(permissions.clone()));

    // CHAOS
    registry.register(chaos_tools::ListChaosFilesTool::new(chaos.clone()));
    registry.register(chaos_tools::GetChaosFileTool::new(chaos.clone()));
    registry.register(chaos_tools::CreateChaosFileTool::new(chaos.clone()));
    registry.register(chaos_tools::UpdateChaosFileTool::new(chaos.clone()));
    registry.register(chaos_tools::DeleteChaosFileTool::new(chaos.clone()));
    registry.register(chaos_tools::AnalyzeChaosFileTool::new(chaos.clone()));
    registry.register(chaos_tools::SearchChaosFilesTool::new(chaos.clone()));
    registry.register(chaos_tools::CreateEmotionTagTool::new(chaos.clone()));
    registry.register(chaos_tools::CreateSymbolTagTool::new(chaos.clone()));
    registry.register(chaos_tools::CreateRelationshipTagTool::new(chaos.clone()));

    // Media
    registry.register(media_tools::RegisterMediaTool::new(media.clone()));
    registry.register(media_tools::ListMediaFilesTool::new(media.clone()));
    registry.register(media_tools::GetMediaInfoTool::new(media.clone()));
    registry.register(media_tools::SearchMediaTool::new(media.clone()));
    registry.register(media_tools::AddMediaTagTool::new(media.clone()));
    registry.register(media_tools::RemoveMediaTagTool::new(media.clone()));
    registry.register(media_tools::DeleteMediaTool::new(media.clone()));
    registry.register(media_tools::MediaStatsTool::new(media.clone()));

    // Agent trust
    registry.register(trust_tools::RegisterAgentTool::new(trust.clone()));
    registry.register(trust_tools::SetAgentTrustLevelTool::new(trust.clone()));
    registry.register(trust_tools::GetAgentTrustLevelTool::new(trust.clone()));
    registry.register(trust_tools::ListAgentsTool::new(trust.clone()));
    registry.register(trust_tools::AgentPingTool::new(trust.clone()));
    registry.register(trust_tools::RevokeAgentTool::new(trust.clone()));
    registry.register(trust_tools::SetAgentPolicyTool::new(trust.clone()));
    registry.register(trust_tools::GetAgentAccessLogTool::new(trust.clone()));

    // Utilities
    registry.register(utility_tools::CalculateChecksumTool::new(utility.clone()));
    registry.register(utility_tools::VerifyChecksumTool::new(utility.clone()));
    registry.register(utility_tools::GetFileMetadataTool::new(utility.clone()));
    registry.register(utility_tools::GitStatusTool::new(utility.clone()));
    registry.register(utility_tools::GitLogTool::new(utility.clone()));
    registry.register(utility_tools::CreateArchiveTool::new(utility.clone()));
    registry.register(utility_tools::ListArchiveContentsTool::new(utility.clone()));

    registry
}
