//! Route Scout - command-line front end for route discovery.
//!
//! Reads a route manifest, walks it, resolves each endpoint's request schema and prints
//! a Postman collection or an OpenAPI document.
//!
//! # Usage
//!
//! ```bash
//! route-scout [OPTIONS] <MANIFEST>
//! ```
//!
//! # Examples
//!
//! Export a Postman collection:
//! ```bash
//! route-scout routes.json -o collection.json
//! ```
//!
//! Export OpenAPI as YAML:
//! ```bash
//! route-scout routes.yaml --export openapi -f yaml -o openapi.yaml
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use route_scout::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    // Initialize logger based on verbose flag
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Route Scout starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    Ok(())
}
