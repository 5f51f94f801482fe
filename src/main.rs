//! HTTP(S) forward proxy.
//!
//! ```text
//!     Client ──▶ listener (HTTP / HTTPS) ──▶ dispatch ──▶ auth check
//!                                                │
//!                   ┌────────────────────────────┴────────────────────┐
//!                   ▼                                                 ▼
//!         forward: absolute-form request                    CONNECT host:port
//!         upstream client ──▶ origin                        dial ──▶ 200 ──▶ byte pumps
//! ```

use std::ffi::OsString;
use std::fmt::Display;
use std::path::Path;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forward_proxy::cli::{Cli, VERSION};
use forward_proxy::config::validate_config;
use forward_proxy::observability::LogSink;
use forward_proxy::ProxyServer;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<OsString> = std::env::args_os().collect();
    let prog = program_name(&args);

    if args.len() <= 1 {
        let _ = Cli::command().bin_name(&prog).print_help();
        return ExitCode::SUCCESS;
    }

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => return fail(&prog, clap_message(&err)),
    };

    let mut config = match cli.into_config() {
        Ok(config) => config,
        Err(err) => return fail(&prog, err),
    };
    if let Err(err) = validate_config(&mut config) {
        return fail(&prog, err);
    }

    let log = match LogSink::init(&config) {
        Ok(log) => log,
        Err(err) => return fail(&prog, err),
    };
    tracing_subscriber::registry().with(log.layer()).init();

    tracing::info!("forward-proxy {VERSION} starting");

    ProxyServer::new(config).run(log).await;
    ExitCode::SUCCESS
}

/// File name of argv[0], falling back to the package name.
fn program_name(args: &[OsString]) -> String {
    args.first()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

/// First line of a clap error without its `error: ` prefix.
fn clap_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

fn fail(prog: &str, message: impl Display) -> ExitCode {
    eprintln!("{prog}: error: {message}");
    eprintln!("Type {prog} --help to see a list of all options.");
    ExitCode::FAILURE
}
