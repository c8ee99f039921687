//! In-memory representation of a host application's route/layer graph.
//!
//! Nodes live in an arena ([`RouteGraph`]) and refer to their children by [`NodeId`].
//! Any node may be mounted under any other node, including one of its own ancestors,
//! so the graph is a tree only by convention. The walker is responsible for cutting
//! cycles.

use crate::host::HostValue;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a node inside a [`RouteGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// HTTP methods a route node can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Parse a method name, ignoring case. Returns `None` for anything else
    /// (including catch-all markers such as `_all`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            "patch" => Some(HttpMethod::Patch),
            "options" => Some(HttpMethod::Options),
            "head" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Lower-case method name, as used for OpenAPI path item keys
    pub fn as_lowercase(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a node matches the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    /// Literal template, possibly with `:name` parameters
    Literal(String),
    /// Compiled pattern; `keys` are the names of its capture groups, in order
    Pattern { source: String, keys: Vec<String> },
}

/// A single layer of the route graph.
#[derive(Debug, Clone, Default)]
pub struct RouteNode {
    /// Layer name, only used for logging
    pub name: Option<String>,
    pub matcher: Option<PathMatcher>,
    /// Declared methods and whether each is enabled; `Some` marks a concrete route
    pub methods: Option<Vec<(HttpMethod, bool)>>,
    pub handler: Option<HostValue>,
    children: Vec<NodeId>,
}

impl RouteNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_path(mut self, template: impl Into<String>) -> Self {
        self.matcher = Some(PathMatcher::Literal(template.into()));
        self
    }

    pub fn with_pattern(mut self, source: impl Into<String>, keys: Vec<String>) -> Self {
        self.matcher = Some(PathMatcher::Pattern {
            source: source.into(),
            keys,
        });
        self
    }

    /// Declare the node as a route enabled for every listed method.
    pub fn with_methods(mut self, methods: &[HttpMethod]) -> Self {
        self.methods = Some(methods.iter().map(|m| (*m, true)).collect());
        self
    }

    /// Declare the node as a route from raw `name -> enabled` flags.
    ///
    /// Names that are not a known HTTP method are dropped.
    pub fn with_method_flags<'a, I>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let methods = flags
            .into_iter()
            .filter_map(|(name, enabled)| match HttpMethod::from_name(name) {
                Some(method) => Some((method, enabled)),
                None => {
                    debug!("Ignoring unsupported method flag: {}", name);
                    None
                }
            })
            .collect();
        self.methods = Some(methods);
        self
    }

    pub fn with_handler(mut self, handler: HostValue) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node declares a concrete route
    pub fn is_route(&self) -> bool {
        self.methods.is_some()
    }
}

/// Arena of route nodes.
#[derive(Debug, Clone, Default)]
pub struct RouteGraph {
    nodes: Vec<RouteNode>,
}

impl RouteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its identity.
    pub fn add(&mut self, node: RouteNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Mount `child` under `parent`, after any existing children.
    ///
    /// Returns `false` if either id does not belong to this graph.
    pub fn mount(&mut self, parent: NodeId, child: NodeId) -> bool {
        if child.0 >= self.nodes.len() {
            return false;
        }
        match self.nodes.get_mut(parent.0) {
            Some(node) => {
                node.children.push(child);
                true
            }
            None => false,
        }
    }

    /// Add a node and mount it under `parent` in one step.
    pub fn add_child(&mut self, parent: NodeId, node: RouteNode) -> NodeId {
        let id = self.add(node);
        self.mount(parent, id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&RouteNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_name_is_case_insensitive() {
        assert_eq!(HttpMethod::from_name("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::from_name("patch"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::from_name("_all"), None);
    }

    #[test]
    fn test_method_flags_drop_unknown_names() {
        let node = RouteNode::new().with_method_flags([("get", true), ("_all", true), ("post", false)]);
        assert_eq!(
            node.methods,
            Some(vec![(HttpMethod::Get, true), (HttpMethod::Post, false)])
        );
    }

    #[test]
    fn test_mount_allows_back_references() {
        let mut graph = RouteGraph::new();
        let root = graph.add(RouteNode::new());
        let child = graph.add_child(root, RouteNode::new().with_path("/a"));
        assert!(graph.mount(child, root));
        assert_eq!(graph.node(child).unwrap().children(), &[root]);
    }

    #[test]
    fn test_mount_rejects_foreign_ids() {
        let mut graph = RouteGraph::new();
        let root = graph.add(RouteNode::new());
        assert!(!graph.mount(root, NodeId(7)));
        assert!(!graph.mount(NodeId(7), root));
    }
}
