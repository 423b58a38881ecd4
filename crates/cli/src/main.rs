use anyhow::Result;
use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand};
use sast_sca_core::{resolve_directory, run_grype, run_semgrep, ScanConfig, ScanResult};
use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "mcp-cli")]
#[command(about = "MCP security scan CLI", long_about = None)]
#[command(after_help = "Use \"mcp-cli <command> -h\" to see command-specific flags.")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run Semgrep SAST scan
    Semgrep(SemgrepArgs),

    /// Run Grype SCA scan
    Grype(GrypeArgs),
}

#[derive(Args, Debug)]
struct SemgrepArgs {
    /// Path to the project directory
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    target: String,

    /// Semgrep configuration (rule set URI or file) [default: auto]
    #[arg(long)]
    config: Option<String>,

    /// Timeout (e.g. 5m, 300s). Use 0 for no timeout [default: 10m]
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
}

#[derive(Args, Debug)]
struct GrypeArgs {
    /// Path to the project directory
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    target: String,

    /// Timeout (e.g. 5m, 300s). Use 0 for no timeout [default: 5m]
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let status = execute(
        std::env::args_os(),
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .await;
    ExitCode::from(status)
}

/// Parse `args`, run the scan and report on `out` and `err`.
///
/// Returns the exit status: 0 on success, 1 when the scan or its setup
/// fails, 2 for usage errors and help.
async fn execute<I, T>(args: I, out: &mut impl Write, err: &mut impl Write) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    // help and usage errors alike go to stderr with status 2
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = write!(err, "{}", e);
            return 2;
        }
    };

    match run(cli, out).await {
        Ok(()) => 0,
        Err(e) => {
            let _ = writeln!(err, "error: {}", e);
            1
        }
    }
}

async fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config = ScanConfig::from_env()?;

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.cancel();
        }
    });

    tracing::debug!(command = ?cli.command, "Starting scan");
    let result = scan(cli.command, &config, &cancel).await;

    // whatever the scanner printed is shown, even when it failed
    let output = match &result {
        Ok(output) => Some(output.as_slice()),
        Err(e) => e.output(),
    };
    if let Some(output) = output {
        write_output(out, output)?;
    }

    result?;
    Ok(())
}

async fn scan(
    command: Command,
    config: &ScanConfig,
    cancel: &CancellationToken,
) -> ScanResult<Vec<u8>> {
    match command {
        Command::Semgrep(args) => {
            let target = resolve_directory(&args.target)?;
            let rules = args
                .config
                .as_deref()
                .unwrap_or(&config.semgrep.default_config);
            let timeout = args.timeout.unwrap_or(config.semgrep.default_timeout);
            run_semgrep(&config.semgrep, &target, rules, timeout, cancel).await
        }
        Command::Grype(args) => {
            let target = resolve_directory(&args.target)?;
            let timeout = args.timeout.unwrap_or(config.grype.default_timeout);
            run_grype(&config.grype, &target, timeout, cancel).await
        }
    }
}

/// Write scanner output, making sure it ends with a newline.
fn write_output(out: &mut impl Write, output: &[u8]) -> std::io::Result<()> {
    if output.is_empty() {
        return Ok(());
    }
    out.write_all(output)?;
    if !output.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }
    out.flush()
}
