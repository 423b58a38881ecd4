// Core scanning primitives shared by the MCP server and the CLI

pub mod config;
pub mod error;
pub mod resolve;
pub mod runner;
pub mod scanners;

pub use config::{
    ConfigError, GrypeSettings, ScanConfig, SemgrepSettings, ServerSettings, CONFIG_ENV,
};
pub use error::{ScanError, ScanResult};
pub use resolve::resolve_directory;
pub use runner::run_command;
pub use scanners::{run_grype, run_semgrep};
