//! Citation Gateway - resilient search front-end for the USPTO Enriched
//! Citation API.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use serde_json::json;
use tracing::error;

use citation_gateway::{
    cli::{Cli, Command, SearchArgs},
    config::Config,
    gateway::{GatewayResponse, ResilientGateway},
    query::{build_query_with_limits, validate_criteria},
    setup_tracing,
    transport::{HttpTransport, Pagination},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(cli.config.as_deref()).and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Search(args) => run_search(&config, &args).await,
        Command::Validate { criteria } => run_validate(&config, &criteria),
        Command::ConfigCheck => run_config_check(&config),
    }
}

/// Run a search (or a dry-run query build) and print the outcome as JSON.
async fn run_search(config: &Config, args: &SearchArgs) -> ExitCode {
    let params = args.to_params();

    if args.dry_run {
        return match build_query_with_limits(&params, &config.query) {
            Ok(built) => {
                print_json(&json!({
                    "status": "success",
                    "query": built.query,
                    "parameters": built.params_used,
                    "warnings": built.warnings,
                }));
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        };
    }

    let gateway = match build_gateway(config) {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("❌ {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let page = Pagination {
        start: args.start,
        rows: args.rows,
    };

    match gateway.search(&params, page).await {
        Ok(outcome) => {
            let (status, source, response) = match &outcome.response {
                GatewayResponse::Fresh(v) => ("success", "remote", v.clone()),
                GatewayResponse::Cached(v) => ("success", "cache", v.clone()),
                GatewayResponse::Degraded(d) => {
                    ("degraded", "fallback", serde_json::to_value(d).unwrap_or_default())
                }
            };
            print_json(&json!({
                "status": status,
                "source": source,
                "query": outcome.built.query,
                "parameters": outcome.built.params_used,
                "warnings": outcome.built.warnings,
                "response": response,
            }));
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Validate raw criteria and report the verdict.
fn run_validate(config: &Config, criteria: &str) -> ExitCode {
    match validate_criteria(criteria, &config.query) {
        Ok(()) => {
            print_json(&json!({ "status": "success", "criteria": criteria }));
            ExitCode::SUCCESS
        }
        Err(reason) => {
            print_json(&json!({ "status": "error", "criteria": criteria, "reason": reason }));
            ExitCode::FAILURE
        }
    }
}

/// Print the effective configuration.
fn run_config_check(config: &Config) -> ExitCode {
    match serde_json::to_string_pretty(config) {
        Ok(rendered) => {
            println!("{rendered}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Failed to render configuration: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Resolve the API key and assemble the gateway with its HTTP transport.
fn build_gateway(config: &Config) -> anyhow::Result<ResilientGateway> {
    let api_key = std::env::var(&config.remote.api_key_env).with_context(|| {
        format!(
            "API key environment variable {} is not set",
            config.remote.api_key_env
        )
    })?;
    let transport = HttpTransport::new(&config.remote, api_key)?;
    Ok(ResilientGateway::new(Arc::new(transport), config))
}

fn fail(e: &citation_gateway::Error) -> ExitCode {
    error!(error = %e, status = e.status_code(), "Request failed");
    eprintln!("❌ {e}");
    ExitCode::FAILURE
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("❌ Failed to render response: {e}"),
    }
}
