//! GA4 Report MCP Server
//!
//! Exposes Google Analytics 4 reports to MCP clients.

mod auth;
mod config;
mod data_api;
mod debug;
mod error;
mod report;
mod server;
mod tool;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rmcp::{transport::stdio, ServiceExt};

use crate::auth::GoogleAuth;
use crate::config::Config;
use crate::data_api::DataApiClient;
use crate::debug::DebugLogger;
use crate::server::Ga4ReportServer;

#[derive(Parser, Debug)]
#[command(name = "ga4-report-mcp")]
#[command(author, version, about = "GA4 Report MCP Server", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Enable debug mode (logs all tool calls)
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config))?;
    let debug_enabled = args.debug || config.debug;

    // stdout carries the MCP protocol, so logs go to stderr
    let default_filter = if debug_enabled {
        "ga4_report_mcp=debug"
    } else {
        "ga4_report_mcp=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let debug = Arc::new(DebugLogger::new(debug_enabled));
    if let Some(path) = debug.trace_path() {
        tracing::info!(path = %path.display(), "Writing debug trace");
    }

    let credentials = config
        .credential_source()
        .context("failed to resolve credentials")?;
    let auth = GoogleAuth::new(credentials, &config)?;
    let client = DataApiClient::new(&config, auth)?;
    let property = config.property_path()?;

    tracing::info!(
        property = %property,
        row_limit = config.row_limit,
        timeout_seconds = config.timeout_seconds,
        "Starting GA4 Report MCP server on stdio"
    );

    let server = Ga4ReportServer::new(Arc::new(client), debug.clone());
    let service = server.serve(stdio()).await?;

    debug.log("MCP server started, waiting for messages...");

    service.waiting().await?;

    tracing::info!("MCP server shutting down");

    Ok(())
}
