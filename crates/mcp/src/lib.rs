// MCP (Model Context Protocol) server exposing the Semgrep and Grype scanners
// as tools over Content-Length framed stdio

pub mod framing;
pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
