// MCP tool trait and registry

use crate::protocol::ToolSchema;
use crate::tools::{GrypeScanTool, SemgrepScanTool, ToolArguments};
use sast_sca_core::{ScanConfig, ScanError, ScanResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool schema for MCP
    fn schema(&self) -> ToolSchema;

    /// Validate arguments and run the tool, returning its raw output
    async fn execute(
        &self,
        arguments: &ToolArguments,
        cancel: &CancellationToken,
    ) -> ScanResult<Vec<u8>>;
}

/// Tool registry, populated once at startup and read-only afterwards
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registry with `semgrep_scan` and `grype_scan`
    pub fn with_default_tools(config: &ScanConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SemgrepScanTool::new(config.semgrep.clone())));
        registry.register(Arc::new(GrypeScanTool::new(config.grype.clone())));
        registry
    }

    /// Register a tool, replacing any tool of the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.schema().name;
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all tool schemas in registration order
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.schema())
            .collect()
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look up `name` and run it
    pub async fn call(
        &self,
        name: &str,
        arguments: &ToolArguments,
        cancel: &CancellationToken,
    ) -> ScanResult<Vec<u8>> {
        let tool = self
            .get(name)
            .ok_or_else(|| ScanError::UnknownTool(name.to_string()))?;
        tool.execute(arguments, cancel).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: serde_json::Value, required: Vec<&str>) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "description": description
    })
}

pub fn json_schema_integer(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "integer",
        "description": description
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "echo".to_string(),
                description: "Echo the message argument".to_string(),
                input_schema: json_schema_object(
                    json!({"message": json_schema_string("Text to echo")}),
                    vec!["message"],
                ),
            }
        }

        async fn execute(
            &self,
            arguments: &ToolArguments,
            _cancel: &CancellationToken,
        ) -> ScanResult<Vec<u8>> {
            Ok(arguments.require_str("message")?.as_bytes().to_vec())
        }
    }

    fn arguments(value: serde_json::Value) -> ToolArguments {
        match value {
            serde_json::Value::Object(map) => map.into(),
            _ => ToolArguments::default(),
        }
    }

    #[test]
    fn test_default_tools_in_order() {
        let registry = ToolRegistry::with_default_tools(&ScanConfig::default());
        let names: Vec<String> = registry.list_schemas().into_iter().map(|s| s.name).collect();

        assert_eq!(names, ["semgrep_scan", "grype_scan"]);
        assert!(registry.contains("grype_scan"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_schemas().len(), 1);
    }

    #[tokio::test]
    async fn test_call_dispatches_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let cancel = CancellationToken::new();

        let output = registry
            .call("echo", &arguments(json!({"message": "hi"})), &cancel)
            .await
            .unwrap();
        assert_eq!(output, b"hi");

        let err = registry
            .call("echo", &arguments(json!({})), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .call("nmap_scan", &ToolArguments::default(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::UnknownTool(ref name) if name == "nmap_scan"));
    }

    #[test]
    fn test_schema_helpers() {
        let schema = json_schema_object(
            json!({"timeout_seconds": json_schema_integer("Seconds")}),
            vec![],
        );
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["timeout_seconds"]["type"], "integer");
        assert_eq!(schema["required"], json!([]));
    }
}
