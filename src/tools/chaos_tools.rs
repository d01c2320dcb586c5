//! CHAOS tool adapters

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::chaos::ChaosEngine;

use super::tool::{required_str, HubTool, ToolResult};

/// List registered CHAOS files
pub struct ListChaosFilesTool {
    chaos: Arc<ChaosEngine>,
}

impl ListChaosFilesTool {
    pub fn new(chaos: Arc<ChaosEngine>) -> Self {
        Self { chaos }
    }
}

#[async_trait]
impl HubTool for ListChaosFilesTool {
    fn name(&self) -> &str {
        "list_chaos_files"
    }

    fn description(&self) -> &str {
        "List all registered CHAOS files"
    }

    async fn execute(&self, _args: &Value) -> Result<ToolResult> {
        let files = self.chaos.list_files();
        Ok(ToolResult::json(&json!({ "files": files })))
    }
}

/// Read one CHAOS file
pub struct GetChaosFileTool {
    chaos: Arc<ChaosEngine>,
}

impl GetChaosFileTool {
    pub fn new(chaos: Arc<ChaosEngine>) -> Self {
        Self { chaos }
    }
}

#[async_trait]
impl HubTool for GetChaosFileTool {
    fn name(&self) -> &str {
        "get_chaos_file"
    }

    fn description(&self) -> &str {
        "Read the content of a CHAOS file"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let filename = required_str(args, "filename")?;
        match self.chaos.read_file(filename) {
            Some(content) => Ok(ToolResult::success(content)),
            None => Ok(ToolResult::error(format!("Cannot read {}", filename))),
        }
    }
}

/// Create a CHAOS file
pub struct CreateChaosFileTool {
    chaos: Arc<ChaosEngine>,
}

impl CreateChaosFileTool {
    pub fn new(chaos: Arc<ChaosEngine>) -> Self {
        Self { chaos }
    }
}

#[async_trait]
impl HubTool for CreateChaosFileTool {
    fn name(&self) -> &str {
        "create_chaos_file"
    }

    fn description(&self) -> &str {
        "Create a new CHAOS file"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let filename = required_str(args, "filename")?;
        let content = required_str(args, "content")?;
        if self.chaos.create_file(filename, content) {
            Ok(ToolResult::success(format!("CHAOS file created: {}", filename)))
        } else {
            Ok(ToolResult::error(format!("Cannot create {}", filename)))
        }
    }
}

/// Update a CHAOS file
pub struct UpdateChaosFileTool {
    chaos: Arc<ChaosEngine>,
}

impl UpdateChaosFileTool {
    pub fn new(chaos: Arc<ChaosEngine>) -> Self {
        Self { chaos }
    }
}

#[async_trait]
impl HubTool for UpdateChaosFileTool {
    fn name(&self) -> &str {
        "update_chaos_file"
    }

    fn description(&self) -> &str {
        "Overwrite an existing CHAOS file"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let filename = required_str(args, "filename")?;
        let content = required_str(args, "content")?;
        if self.chaos.update_file(filename, content) {
            Ok(ToolResult::success(format!("CHAOS file updated: {}", filename)))
        } else {
            Ok(ToolResult::error(format!("Cannot update {}", filename)))
        }
    }
}

/// Delete a CHAOS file
pub struct DeleteChaosFileTool {
    chaos: Arc<ChaosEngine>,
}

impl DeleteChaosFileTool {
    pub fn new(chaos: Arc<ChaosEngine>) -> Self {
        Self { chaos }
    }
}

#[async_trait]
impl HubTool for DeleteChaosFileTool {
    fn name(&self) -> &str {
        "delete_chaos_file"
    }

    fn description(&self) -> &str {
        "Delete a CHAOS file and its registry entry"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let filename = required_str(args, "filename")?;
        if self.chaos.delete_file(filename) {
            Ok(ToolResult::success(format!("CHAOS file deleted: {}", filename)))
        } else {
            Ok(ToolResult::error(format!("Cannot delete {}", filename)))
        }
    }
}

/// Analyze a CHAOS file's tags and sections
pub struct AnalyzeChaosFileTool {
    chaos: Arc<ChaosEngine>,
}

impl AnalyzeChaosFileTool {
    pub fn new(chaos: Arc<ChaosEngine>) -> Self {
        Self { chaos }
    }
}

#[async_trait]
impl HubTool for AnalyzeChaosFileTool {
    fn name(&self) -> &str {
        "analyze_chaos_file"
    }

    fn description(&self) -> &str {
        "Parse a CHAOS file and summarize its tag content"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let filename = required_str(args, "filename")?;
        match self.chaos.analyze_file(filename) {
            Some(analysis) => Ok(ToolResult::json(&analysis)),
            None => Ok(ToolResult::error(format!("Cannot analyze {}", filename))),
        }
    }
}

/// Search CHAOS files by content
pub struct SearchChaosFilesTool {
    chaos: Arc<ChaosEngine>,
}

impl SearchChaosFilesTool {
    pub fn new(chaos: Arc<ChaosEngine>) -> Self {
        Self { chaos }
    }
}

#[async_trait]
impl HubTool for SearchChaosFilesTool {
    fn name(&self) -> &str {
        "search_chaos_files"
    }

    fn description(&self) -> &str {
        "Search CHAOS file contents, case-insensitive"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let query = required_str(args, "query")?;
        let hits = self.chaos.search_files(query);
        Ok(ToolResult::json(&json!({ "query": query, "matches": hits })))
    }
}

/// Build an emotion tag
pub struct CreateEmotionTagTool {
    chaos: Arc<ChaosEngine>,
}

impl CreateEmotionTagTool {
    pub fn new(chaos: Arc<ChaosEngine>) -> Self {
        Self { chaos }
    }
}

#[async_trait]
impl HubTool for CreateEmotionTagTool {
    fn name(&self) -> &str {
        "create_emotion_tag"
    }

    fn description(&self) -> &str {
        "Build an [EMOTION:type:INTENSITY] tag"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let emotion_type = required_str(args, "emotion_type")?;
        let intensity = required_str(args, "intensity")?;
        match self.chaos.create_emotion_tag(emotion_type, intensity) {
            Some(tag) => Ok(ToolResult::success(tag)),
            None => Ok(ToolResult::error(format!(
                "Invalid emotion tag: {}:{}",
                emotion_type, intensity
            ))),
        }
    }
}

/// Build a symbol tag
pub struct CreateSymbolTagTool {
    chaos: Arc<ChaosEngine>,
}

impl CreateSymbolTagTool {
    pub fn new(chaos: Arc<ChaosEngine>) -> Self {
        Self { chaos }
    }
}

#[async_trait]
impl HubTool for CreateSymbolTagTool {
    fn name(&self) -> &str {
        "create_symbol_tag"
    }

    fn description(&self) -> &str {
        "Build a [SYMBOL:type:PRESENCE] tag"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let symbol_type = required_str(args, "symbol_type")?;
        let presence = required_str(args, "presence")?;
        match self.chaos.create_symbol_tag(symbol_type, presence) {
            Some(tag) => Ok(ToolResult::success(tag)),
            None => Ok(ToolResult::error(format!(
                "Invalid symbol tag: {}:{}",
                symbol_type, presence
            ))),
        }
    }
}

/// Build a relationship tag
pub struct CreateRelationshipTagTool {
    chaos: Arc<ChaosEngine>,
}

impl CreateRelationshipTagTool {
    pub fn new(chaos: Arc<ChaosEngine>) -> Self {
        Self { chaos }
    }
}

#[async_trait]
impl HubTool for CreateRelationshipTagTool {
    fn name(&self) -> &str {
        "create_relationship_tag"
    }

    fn description(&self) -> &str {
        "Build a [RELATIONSHIP:source:type:target] tag"
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let source = required_str(args, "source")?;
        let relationship_type = required_str(args, "relationship_type")?;
        let target = required_str(args, "target")?;
        match self
            .chaos
            .create_relationship_tag(source, relationship_type, target)
        {
            Some(tag) => Ok(ToolResult::success(tag)),
            None => Ok(ToolResult::error("Invalid relationship tag")),
        }
    }
}
