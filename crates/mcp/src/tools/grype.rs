// Grype SCA tool

use crate::protocol::ToolSchema;
use crate::tools::{
    json_schema_integer, json_schema_object, json_schema_string, Tool, ToolArguments,
};
use sast_sca_core::{resolve_directory, run_grype, GrypeSettings, ScanResult};
use tokio_util::sync::CancellationToken;

pub const GRYPE_SCAN: &str = "grype_scan";

/// Runs Grype against the dependencies found in a project directory
pub struct GrypeScanTool {
    settings: GrypeSettings,
}

impl GrypeScanTool {
    pub fn new(settings: GrypeSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl Tool for GrypeScanTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: GRYPE_SCAN.to_string(),
            description: "Runs Grype SCA/vulnerability scan on dependencies detected in the target."
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "target_path": json_schema_string("Absolute path to the directory containing the project."),
                    "timeout_seconds": json_schema_integer("Soft timeout for Grype execution.")
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
        let timeout = arguments.positive_seconds_or("timeout_seconds", self.settings.default_timeout);

        run_grype(&self.settings, &target, timeout, cancel).await
    }
}
