//! refarch CLI entry point.
//!
//! Binary name: `refarch`
//!
//! Parses CLI arguments, initializes tracing, then dispatches to the batch
//! walkers or starts the HTTP/TLS test server.

mod cli;
mod http;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;

use refarch_infra::config::load_server_config;
use refarch_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_filter};
use refarch_types::config::ServerVariant;

use cli::batch::{BatchCommand, handle_batch};
use cli::{Cli, Commands};
use http::server::{TestServer, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need logging
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "refarch", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(verbosity_filter(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::RunAll => handle_batch(BatchCommand::RunAll, cli.json, cli.quiet).await,

        Commands::GenDocs => handle_batch(BatchCommand::GenDocs, cli.json, cli.quiet).await,

        Commands::Serve { fault_injection } => {
            let variant = if fault_injection {
                ServerVariant::FaultInjecting
            } else {
                ServerVariant::Echo
            };
            let config = load_server_config(variant);
            let https_port = config.https_port;

            let server = TestServer::bind(config)
                .await
                .context("test server failed to start")?;
            let http_addr = server.http_addr()?;

            let tls_handle = server.tls_handle();
            tokio::spawn(async move {
                if let Some(addr) = tls_handle.listening().await {
                    tracing::debug!("TLS listener ready on {addr}");
                }
            });

            if !cli.quiet {
                println!(
                    "  {} {} test server on {} and {}",
                    console::style("⚡").bold(),
                    variant,
                    console::style(format!("http://{http_addr}")).cyan(),
                    console::style(format!("https://0.0.0.0:{https_port}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            server.run(shutdown_signal()).await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
            Ok(())
        }

        Commands::Completions { .. } => Ok(()),
    }
}
