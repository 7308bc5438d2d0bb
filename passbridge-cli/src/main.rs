//! Passbridge - WebAuthn ceremonies for a host speaking JSON lines over stdio.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod exit_codes;
mod host;
mod lifecycle;
mod protocol;

#[derive(Parser)]
#[command(name = "passbridge")]
#[command(author, version, long_about = None)]
#[command(about = "WebAuthn ceremonies over a JSON-lines stdio channel")]
#[command(after_help = "Protocol:\n  \
    stdout  register, hook and done messages (one JSON object per line)\n  \
    stdin   call and hookResult messages\n  \
    stderr  logs\n\n\
Exit codes:\n  \
    0   Host called exit() or closed stdin\n  \
    1   General error\n  \
    64  Invalid log filter\n  \
    74  Host channel I/O error\n  \
    N   Code passed to exit(N)")]
struct Cli {
    /// Namespace the operations are registered under
    #[arg(value_name = "NAMESPACE", env = "PASSBRIDGE_NAMESPACE", default_value = "webauthn")]
    namespace: String,

    /// Log filter directive (e.g. `debug` or `passbridge_core=trace`)
    #[arg(long, env = "PASSBRIDGE_LOG")]
    log_level: Option<String>,
}

fn init_tracing(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("Invalid log filter: {directive}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_level.as_deref()) {
        eprintln!("Error: {e:#}");
        std::process::exit(exit_codes::USAGE_ERROR);
    }

    let (exit, waiter) = lifecycle::exit_signal();
    let namespace = cli.namespace;

    tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin().lock();
        let stdout = std::io::stdout().lock();
        let code = host::Host::new(stdin, stdout).run(&namespace);
        exit.exit(code);
    });

    let code = waiter.wait().await;
    tracing::debug!(code, "Shutting down");
    std::process::exit(code);
}
