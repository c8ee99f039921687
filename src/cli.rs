use crate::discovery::{ScanOptions, ScannedEndpoint, Scanner};
use crate::exporter::openapi::{export_document, OpenApiOptions};
use crate::exporter::postman::{export_collection, PostmanOptions};
use crate::manifest::RouteManifest;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Route Scout - discover HTTP routes and request schemas from a route manifest
#[derive(Parser, Debug)]
#[command(name = "route-scout")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the route manifest (JSON, or YAML with a .yaml/.yml extension)
    #[arg(value_name = "MANIFEST")]
    pub manifest_path: PathBuf,

    /// Document to produce
    #[arg(short = 'e', long = "export", value_enum, default_value = "postman")]
    pub export: ExportKind,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Collection name, or API title for OpenAPI
    #[arg(short = 'n', long = "name", default_value = "Discovered API")]
    pub name: String,

    /// Extra request header for Postman exports, as KEY:VALUE (repeatable)
    #[arg(short = 'H', long = "header", value_name = "KEY:VALUE")]
    pub headers: Vec<String>,

    /// Route graph depth that aborts the scan
    #[arg(long = "max-depth", default_value_t = crate::walker::DEFAULT_MAX_WALK_DEPTH)]
    pub max_depth: usize,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Export document options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ExportKind {
    /// Postman collection v2.1
    Postman,
    /// OpenAPI 3.0 document
    Openapi,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.manifest_path.is_file() {
        anyhow::bail!(
            "Manifest file does not exist: {}",
            args.manifest_path.display()
        );
    }
    parse_headers(&args.headers)?;

    info!("Manifest: {}", args.manifest_path.display());
    info!("Export: {:?} as {:?}", args.export, args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|header| -> Result<(String, String)> {
            let (key, value) = header
                .split_once(':')
                .with_context(|| format!("Header must be KEY:VALUE, got '{}'", header))?;
            Ok((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn render<T: Serialize>(doc: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serialize_yaml(doc),
        OutputFormat::Json => serialize_json(doc),
    }
}

/// Render the scanned endpoints as the requested document.
pub fn export(args: &CliArgs, endpoints: &[ScannedEndpoint]) -> Result<String> {
    match args.export {
        ExportKind::Postman => {
            let options = PostmanOptions {
                name: args.name.clone(),
                headers: parse_headers(&args.headers)?,
                ..PostmanOptions::default()
            };
            let collection = export_collection(endpoints, &options)
                .context("Failed to build Postman collection")?;
            render(&collection, args.output_format)
        }
        ExportKind::Openapi => {
            let options = OpenApiOptions {
                title: args.name.clone(),
                ..OpenApiOptions::default()
            };
            let document =
                export_document(endpoints, &options).context("Failed to build OpenAPI document")?;
            render(&document, args.output_format)
        }
    }
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting route discovery...");

    // Step 1: Load the route graph
    let manifest = RouteManifest::from_path(&args.manifest_path)
        .with_context(|| format!("Failed to load manifest {}", args.manifest_path.display()))?;

    // Step 2: Walk the graph and resolve schemas
    let options = ScanOptions {
        max_walk_depth: args.max_depth,
        ..ScanOptions::default()
    };
    let endpoints = Scanner::new(options).scan_manifest(manifest)?;
    if endpoints.is_empty() {
        warn!("No routes found in the manifest");
    }

    // Step 3: Build and serialize the document
    let content = export(&args, &endpoints)?;

    // Step 4: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
    } else {
        println!("{}", content);
    }

    info!("Discovery complete!");
    info!("Summary:");
    info!("  - Endpoints found: {}", endpoints.len());
    info!(
        "  - With request schema: {}",
        endpoints.iter().filter(|e| e.has_schema()).count()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["route-scout", "routes.json"]).unwrap();
        assert_eq!(args.export, ExportKind::Postman);
        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.name, "Discovered API");
        assert_eq!(args.max_depth, 64);
        assert!(args.output_path.is_none());
    }

    #[test]
    fn test_openapi_yaml_flags() {
        let args = CliArgs::try_parse_from([
            "route-scout",
            "routes.yaml",
            "--export",
            "openapi",
            "-f",
            "yaml",
            "-o",
            "out/openapi.yaml",
            "-H",
            "X-Api-Key: {{apiKey}}",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.export, ExportKind::Openapi);
        assert_eq!(args.output_format, OutputFormat::Yaml);
        assert!(args.verbose);
        let headers = parse_headers(&args.headers).unwrap();
        assert_eq!(headers["X-Api-Key"], "{{apiKey}}");
    }

    #[test]
    fn test_malformed_header_is_rejected() {
        assert!(parse_headers(&["no-separator".to_string()]).is_err());
    }

    #[test]
    fn test_missing_manifest_is_rejected() {
        let args = CliArgs::try_parse_from(["route-scout", "/definitely/not/here.json"]).unwrap();
        assert!(parse_args_from_parsed(args).is_err());
    }
}
