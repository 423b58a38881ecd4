//! The two external scanners and the fixed flag sets they are run with.
//!
//! Both emit a JSON report on stdout. The report is returned as raw bytes
//! and never parsed here.

use crate::config::{GrypeSettings, SemgrepSettings};
use crate::error::ScanResult;
use crate::runner::run_command;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Semgrep SAST scan in JSON-report, quiet mode.
pub async fn run_semgrep(
    settings: &SemgrepSettings,
    target: &Path,
    config: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ScanResult<Vec<u8>> {
    let config = if config.is_empty() {
        settings.default_config.as_str()
    } else {
        config
    };

    tracing::info!(path = %target.display(), config, ?timeout, "Running semgrep");
    run_command(&settings.program, &semgrep_args(target, config), cancel, timeout).await
}

/// Grype SCA scan of the dependencies found under `target`.
pub async fn run_grype(
    settings: &GrypeSettings,
    target: &Path,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ScanResult<Vec<u8>> {
    tracing::info!(path = %target.display(), ?timeout, "Running grype");
    run_command(&settings.program, &grype_args(target), cancel, timeout).await
}

fn semgrep_args(target: &Path, config: &str) -> Vec<String> {
    vec![
        "scan".to_string(),
        "--config".to_string(),
        config.to_string(),
        "--json".to_string(),
        "--quiet".to_string(),
        target.display().to_string(),
    ]
}

fn grype_args(target: &Path) -> Vec<String> {
    vec![
        "--output".to_string(),
        "json".to_string(),
        format!("dir:{}", target.display()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;

    #[test]
    fn test_semgrep_flags() {
        let args = semgrep_args(Path::new("/src/app"), "p/owasp-top-ten");
        assert_eq!(
            args,
            ["scan", "--config", "p/owasp-top-ten", "--json", "--quiet", "/src/app"]
        );
    }

    #[test]
    fn test_grype_flags() {
        let args = grype_args(Path::new("/src/app"));
        assert_eq!(args, ["--output", "json", "dir:/src/app"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_semgrep_passes_arguments_through() {
        // `echo` stands in for the scanner so the argv can be observed
        let settings = SemgrepSettings {
            program: "echo".to_string(),
            ..Default::default()
        };

        let output = run_semgrep(
            &settings,
            Path::new("/src/app"),
            "",
            Duration::from_secs(10),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(output, b"scan --config auto --json --quiet /src/app\n");
    }

    #[tokio::test]
    async fn test_missing_grype_binary() {
        let settings = GrypeSettings {
            program: "grype-not-installed-here".to_string(),
            ..Default::default()
        };

        let err = run_grype(
            &settings,
            Path::new("/src/app"),
            Duration::ZERO,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ScanError::LaunchFailed { ref program, .. } if program == "grype-not-installed-here"));
    }
}
