mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rainfly_api::ApiClient;
use rainfly_core::LocalStore;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Shell completions don't need a backend connection
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "rainfly", &mut std::io::stdout());
            Ok(())
        }

        // Everything else talks to the cloud and/or the local store
        cmd => {
            let ctx = build_context(&cli.global)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &ctx).await
        }
    }
}

/// Build the handler context from config profile + CLI overrides.
fn build_context(global: &cli::GlobalOpts) -> Result<commands::Context, CliError> {
    let resolved = config::resolve(global)?;

    let api = ApiClient::new(
        resolved.base_url,
        resolved.claim_base_url,
        &resolved.token,
        &resolved.transport,
    )?;

    let store_dir = resolved
        .store_dir
        .or_else(LocalStore::default_dir)
        .unwrap_or_else(|| std::path::PathBuf::from(".rainfly"));

    Ok(commands::Context {
        api,
        store: LocalStore::new(store_dir),
        json: global.json,
    })
}
