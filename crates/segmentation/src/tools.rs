//! Tool registry: named, schema-described operations that callers (HTTP,
//! assistants) invoke with JSON arguments. Tools are registered explicitly
//! at startup; there is no global registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use audience_core::types::SegmentationRequest;
use audience_core::{AudienceError, AudienceResult};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::trace;

use crate::engine::SegmentationEngine;

pub const SEGMENTATION_TOOL_NAME: &str = "segment_clients";

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the accepted arguments.
    fn parameters_schema(&self) -> Value;

    async fn invoke(&self, arguments: Value) -> AudienceResult<Value>;
}

/// Public description of a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    pub async fn invoke(&self, name: &str, arguments: Value) -> AudienceResult<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AudienceError::ToolNotFound(name.to_string()))?;
        trace!(tool = name, "Invoking tool");
        tool.invoke(arguments).await
    }
}

/// Exposes [`SegmentationEngine::plan`] as a tool.
pub struct SegmentationTool {
    engine: Arc<SegmentationEngine>,
}

impl SegmentationTool {
    pub fn new(engine: Arc<SegmentationEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for SegmentationTool {
    fn name(&self) -> &str {
        SEGMENTATION_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Group clients into at most five audience segments that together cover as many clients as possible. \
         Without filters every profile attribute is scanned; with filters only matching clients are grouped, one segment per filtered field."
    }

    fn parameters_schema(&self) -> Value {
        segmentation_parameters_schema()
    }

    async fn invoke(&self, arguments: Value) -> AudienceResult<Value> {
        // Tool callers often send `null` for "no arguments".
        let request: SegmentationRequest = if arguments.is_null() {
            SegmentationRequest::default()
        } else {
            serde_json::from_value(arguments)
                .map_err(|e| AudienceError::Validation(format!("invalid arguments: {e}")))?
        };
        let result = self.engine.plan(request).await?;
        Ok(serde_json::to_value(result)?)
    }
}

/// Register the segmentation tool. Called once at process start.
pub fn register_segmentation_tool(registry: &mut ToolRegistry, engine: Arc<SegmentationEngine>) {
    registry.register(Arc::new(SegmentationTool::new(engine)));
}

fn segmentation_parameters_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "filters": {
                "type": "array",
                "description": "Optional filters. A client is included when it matches at least one filter.",
                "items": {
                    "type": "object",
                    "properties": {
                        "field": {
                            "type": "string",
                            "description": "Client attribute, e.g. birthDate, gender, country, languages, tags, subscriptions, preferences, preferredContactMethod, telegramConfirmed, firstName or lastName. Unknown names match no value."
                        },
                        "match": {
                            "description": "Value(s) to match, or \"__MISSING__\" for clients without a value.",
                            "oneOf": [
                                { "type": "string" },
                                { "type": "array", "items": { "type": "string" } }
                            ]
                        },
                        "currentMonth": {
                            "type": "boolean",
                            "description": "birthDate only: birthday falls in the current month."
                        },
                        "min": { "type": "string", "format": "date", "description": "birthDate only: born on or after." },
                        "max": { "type": "string", "format": "date", "description": "birthDate only: born on or before." }
                    },
                    "required": ["field"]
                }
            },
            "maxCriteriaUsed": { "type": "integer", "minimum": 1, "maximum": 5 },
            "minGroupSize": { "type": "integer", "minimum": 1 }
        }
    })
}
