//! Route manifests: a serialized route graph the binary can scan.
//!
//! Nodes refer to their children by index, so a manifest can describe shared
//! sub-routers and cycles exactly as a live application would mount them:
//!
//! ```json
//! {
//!   "root": 0,
//!   "nodes": [
//!     { "name": "app", "children": [1] },
//!     { "path": "/users", "methods": { "get": true }, "handler": { "zodSchema": null } }
//!   ]
//! }
//! ```

use crate::error::ManifestError;
use crate::host::HostValue;
use crate::route_tree::{NodeId, RouteGraph, RouteNode};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteManifest {
    /// Index of the node the scan starts from
    #[serde(default)]
    pub root: usize,
    pub nodes: Vec<ManifestNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Literal path template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Compiled pattern, used when `path` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regexp: Option<ManifestPattern>,
    /// Method name to enabled flag; present only on routes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<BTreeMap<String, bool>>,
    /// Handler object; the string `"[Function]"` stands for a function value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<serde_json::Value>,
    #[serde(default)]
    pub children: Vec<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestPattern {
    pub source: String,
    #[serde(default)]
    pub keys: Vec<String>,
}

impl RouteManifest {
    /// Load a manifest, choosing YAML for `.yaml`/`.yml` files and JSON otherwise.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        debug!("Loading route manifest from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Build the route graph and return it with the root node.
    ///
    /// # Errors
    ///
    /// Fails if the root or any child index is out of range.
    pub fn into_graph(self) -> Result<(RouteGraph, NodeId), ManifestError> {
        let count = self.nodes.len();
        if self.root >= count {
            return Err(ManifestError::UnknownRoot(self.root));
        }

        let mut graph = RouteGraph::new();
        let mut mounts = Vec::with_capacity(count);
        let mut ids = Vec::with_capacity(count);

        for (index, node) in self.nodes.into_iter().enumerate() {
            if let Some(&child) = node.children.iter().find(|&&child| child >= count) {
                return Err(ManifestError::UnknownChild { node: index, child });
            }
            mounts.push(node.children.clone());
            ids.push(graph.add(node.into_route_node()));
        }

        for (parent, children) in mounts.into_iter().enumerate() {
            for child in children {
                graph.mount(ids[parent], ids[child]);
            }
        }

        debug!("Built route graph with {} nodes", graph.len());
        Ok((graph, ids[self.root]))
    }
}

impl ManifestNode {
    fn into_route_node(self) -> RouteNode {
        let mut node = RouteNode::new();
        if let Some(name) = self.name {
            node = node.with_name(name);
        }
        if let Some(path) = self.path {
            node = node.with_path(path);
        } else if let Some(pattern) = self.regexp {
            node = node.with_pattern(pattern.source, pattern.keys);
        }
        if let Some(methods) = &self.methods {
            node = node.with_method_flags(methods.iter().map(|(name, enabled)| (name.as_str(), *enabled)));
        }
        if let Some(handler) = self.handler {
            node = node.with_handler(HostValue::from_json(handler));
        }
        node
    }
}
