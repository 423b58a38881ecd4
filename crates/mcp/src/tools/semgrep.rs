// Semgrep SAST tool

use crate::protocol::ToolSchema;
use crate::tools::{
    json_schema_integer, json_schema_object, json_schema_string, Tool, ToolArguments,
};
use sast_sca_core::{resolve_directory, run_semgrep, ScanResult, SemgrepSettings};
use tokio_util::sync::CancellationToken;

pub const SEMGREP_SCAN: &str = "semgrep_scan";

/// Runs Semgrep against a source tree
pub struct SemgrepScanTool {
    settings: SemgrepSettings,
}

impl SemgrepScanTool {
    pub fn new(settings: SemgrepSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl Tool for SemgrepScanTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: SEMGREP_SCAN.to_string(),
            description: "Runs Semgrep SAST scan on the supplied source tree.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "target_path": json_schema_string("Absolute path to the directory containing source code."),
                    "config": json_schema_string("Optional Semgrep config (rule set URI). Defaults to auto."),
                    "timeout_seconds": json_schema_integer("Soft timeout for Semgrep execution.")
                }),
                vec!["target_path"],
            ),
        }
    }

    async fn execute(
        &self,
        arguments: &ToolArguments,
        cancel: &CancellationToken,
    ) -> ScanResult<Vec<u8>> {
        let target = resolve_directory(arguments.require_str("target_path")?)?;
        let config = arguments.str_or("config", &self.settings.default_config);
        let timeout = arguments.positive_seconds_or("timeout_seconds", self.settings.default_timeout);

        run_semgrep(&self.settings, &target, config, timeout, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sast_sca_core::ScanError;
    use serde_json::json;
    use tempfile::TempDir;

    fn arguments(value: serde_json::Value) -> ToolArguments {
        match value {
            serde_json::Value::Object(map) => map.into(),
            _ => ToolArguments::default(),
        }
    }

    #[test]
    fn test_schema() {
        let schema = SemgrepScanTool::new(SemgrepSettings::default()).schema();

        assert_eq!(schema.name, "semgrep_scan");
        assert_eq!(schema.input_schema["required"], json!(["target_path"]));
        assert_eq!(schema.input_schema["properties"]["config"]["type"], "string");
        assert_eq!(
            schema.input_schema["properties"]["timeout_seconds"]["type"],
            "integer"
        );
    }

    #[tokio::test]
    async fn test_rejects_non_directory_before_spawning() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("app.py");
        std::fs::write(&file, "print('hi')\n").unwrap();

        // a program that cannot launch proves nothing was spawned
        let tool = SemgrepScanTool::new(SemgrepSettings {
            program: "semgrep-should-not-run".to_string(),
            ..Default::default()
        });
        let err = tool
            .execute(
                &arguments(json!({"target_path": file.to_str().unwrap()})),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::NotADirectory(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_defaults_and_overrides_reach_the_command_line() {
        let temp_dir = TempDir::new().unwrap();
        let tool = SemgrepScanTool::new(SemgrepSettings {
            program: "echo".to_string(),
            ..Default::default()
        });
        let target = temp_dir.path().to_str().unwrap();

        let output = tool
            .execute(
                &arguments(json!({"target_path": target, "timeout_seconds": 0})),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            format!("scan --config auto --json --quiet {}\n", target)
        );

        let output = tool
            .execute(
                &arguments(json!({"target_path": target, "config": "p/secrets"})),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(String::from_utf8(output).unwrap().contains("--config p/secrets"));
    }
}
