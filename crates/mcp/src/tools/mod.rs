pub mod arguments;
pub mod grype;
pub mod semgrep;
mod registry;

pub use arguments::ToolArguments;
pub use grype::{GrypeScanTool, GRYPE_SCAN};
pub use semgrep::{SemgrepScanTool, SEMGREP_SCAN};
pub use registry::{
    json_schema_integer, json_schema_object, json_schema_string, Tool, ToolRegistry,
};
