//! One discovery scan: walk the route graph, locate each endpoint's schema and
//! normalize it.

use crate::error::{HostError, WalkError};
use crate::manifest::RouteManifest;
use crate::host::HostValue;
use crate::locator::{SchemaExtractor, SchemaLocator, SchemaSource};
use crate::normalizer::{SchemaNormalizer, DEFAULT_MAX_SCHEMA_DEPTH};
use crate::path_compiler::CompiledPath;
use crate::route_tree::{HttpMethod, NodeId, RouteGraph};
use crate::schema::CanonicalSchema;
use crate::walker::{DiscoveredEndpoint, RouteTreeWalker, DEFAULT_MAX_WALK_DEPTH};
use log::{debug, info};
use std::fmt;
use std::sync::Arc;

/// Settings for a discovery scan
#[derive(Clone)]
pub struct ScanOptions {
    /// Route graph depth that aborts the scan
    pub max_walk_depth: usize,
    /// Schema nesting depth past which nodes become unknown
    pub max_schema_depth: usize,
    /// Last-resort schema extractor
    pub extractor: Option<SchemaExtractor>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_walk_depth: DEFAULT_MAX_WALK_DEPTH,
            max_schema_depth: DEFAULT_MAX_SCHEMA_DEPTH,
            extractor: None,
        }
    }
}

impl fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanOptions")
            .field("max_walk_depth", &self.max_walk_depth)
            .field("max_schema_depth", &self.max_schema_depth)
            .field("extractor", &self.extractor.is_some())
            .finish()
    }
}

impl ScanOptions {
    /// Register the custom extractor used when no built-in probe matches.
    pub fn with_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&HostValue) -> Result<Option<HostValue>, HostError> + Send + Sync + 'static,
    {
        self.extractor = Some(Arc::new(extractor));
        self
    }
}

/// An endpoint together with its normalized schema.
#[derive(Debug, Clone)]
pub struct ScannedEndpoint {
    pub endpoint: DiscoveredEndpoint,
    /// `Unknown { validates: false }` when nothing was found
    pub schema: CanonicalSchema,
    /// Which probe found the schema, `None` when nothing did
    pub source: Option<SchemaSource>,
}

impl ScannedEndpoint {
    pub fn method(&self) -> HttpMethod {
        self.endpoint.method
    }

    pub fn path(&self) -> &CompiledPath {
        &self.endpoint.path
    }

    pub fn template(&self) -> &str {
        self.endpoint.template()
    }

    pub fn has_schema(&self) -> bool {
        self.source.is_some()
    }
}

/// Runs discovery scans with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    options: ScanOptions,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Scan the graph starting at `root`.
    ///
    /// Schema problems never fail the scan; the affected endpoint is reported with an
    /// unknown schema.
    ///
    /// # Errors
    ///
    /// Returns the [`WalkError`] if traversal fails; no endpoints are returned then.
    pub fn scan(&self, graph: &RouteGraph, root: NodeId) -> Result<Vec<ScannedEndpoint>, WalkError> {
        info!("Scanning route graph...");
        let endpoints = RouteTreeWalker::new(graph)
            .with_max_depth(self.options.max_walk_depth)
            .walk(root)?;
        info!("Discovered {} endpoints", endpoints.len());

        let locator = SchemaLocator::with_extractor(self.options.extractor.clone());
        let normalizer = SchemaNormalizer::new().with_max_depth(self.options.max_schema_depth);

        let scanned: Vec<ScannedEndpoint> = endpoints
            .into_iter()
            .map(|endpoint| {
                let located = locator.locate(&endpoint.handler_chain);
                let (schema, source) = match located {
                    Some(located) => (normalizer.normalize(&located.raw), Some(located.source)),
                    None => {
                        debug!(
                            "No schema detected for {} {}",
                            endpoint.method,
                            endpoint.template()
                        );
                        (CanonicalSchema::unknown(), None)
                    }
                };
                ScannedEndpoint {
                    endpoint,
                    schema,
                    source,
                }
            })
            .collect();

        let with_schema = scanned.iter().filter(|e| e.has_schema()).count();
        info!(
            "Located schemas for {} of {} endpoints",
            with_schema,
            scanned.len()
        );
        Ok(scanned)
    }

    /// Build the graph described by a manifest and scan it from the manifest's root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Manifest`](crate::error::Error::Manifest) for an invalid graph and
    /// [`Error::Walk`](crate::error::Error::Walk) if traversal fails.
    pub fn scan_manifest(&self, manifest: RouteManifest) -> crate::error::Result<Vec<ScannedEndpoint>> {
        let (graph, root) = manifest.into_graph()?;
        info!("Loaded route graph with {} nodes", graph.len());
        Ok(self.scan(&graph, root)?)
    }
}
