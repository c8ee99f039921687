//! Depth-first traversal of the route graph.
//!
//! The walker flattens a [`RouteGraph`] into [`DiscoveredEndpoint`]s. Cycles are cut per
//! descent path: a node that is already on the path from the root is skipped, while a
//! sub-router mounted in two different places is visited once for each of them.

use crate::error::WalkError;
use crate::host::HostValue;
use crate::path_compiler::{CompiledPath, PathCompiler};
use crate::route_tree::{HttpMethod, NodeId, PathMatcher, RouteGraph};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// Default bound on traversal depth
pub const DEFAULT_MAX_WALK_DEPTH: usize = 64;

/// A handler met on the way down to an endpoint.
#[derive(Debug, Clone)]
pub struct HandlerRef {
    /// Node that owns the handler
    pub node: NodeId,
    /// Layer name of that node, if any
    pub name: Option<String>,
    pub handler: HostValue,
}

/// One `(method, path)` pair exposed by the application.
#[derive(Debug, Clone)]
pub struct DiscoveredEndpoint {
    pub method: HttpMethod,
    pub path: CompiledPath,
    /// Handlers from the root down to the route itself; the route's own handler is last
    pub handler_chain: Vec<HandlerRef>,
}

impl DiscoveredEndpoint {
    pub fn template(&self) -> &str {
        &self.path.template
    }

    /// Identity of the endpoint within one scan
    pub fn key(&self) -> (HttpMethod, String) {
        (self.method, self.path.template.clone())
    }

    /// The route's own handler, when it has one
    pub fn terminal_handler(&self) -> Option<&HandlerRef> {
        self.handler_chain.last()
    }
}

/// Route tree walker with a fixed depth bound.
pub struct RouteTreeWalker<'g> {
    graph: &'g RouteGraph,
    max_depth: usize,
}

/// Mutable state of one walk.
#[derive(Default)]
struct WalkState {
    /// Nodes on the current descent path
    active: HashSet<NodeId>,
    segments: Vec<PathMatcher>,
    chain: Vec<HandlerRef>,
    endpoints: Vec<DiscoveredEndpoint>,
    index: HashMap<(HttpMethod, String), usize>,
}

impl<'g> RouteTreeWalker<'g> {
    pub fn new(graph: &'g RouteGraph) -> Self {
        Self {
            graph,
            max_depth: DEFAULT_MAX_WALK_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Walk the graph from `root` in pre-order.
    ///
    /// Endpoints come out in discovery order. When the same `(method, path)` is
    /// registered twice, the later registration replaces the earlier one in place.
    ///
    /// # Errors
    ///
    /// Fails with [`WalkError::DepthExceeded`] when a descent path is longer than the
    /// configured bound; no endpoints are returned in that case.
    pub fn walk(&self, root: NodeId) -> Result<Vec<DiscoveredEndpoint>, WalkError> {
        debug!("Walking route graph of {} nodes from {}", self.graph.len(), root);
        let mut state = WalkState::default();
        self.visit(root, 0, &mut state)?;
        debug!("Walk finished with {} endpoints", state.endpoints.len());
        Ok(state.endpoints)
    }

    fn visit(&self, id: NodeId, depth: usize, state: &mut WalkState) -> Result<(), WalkError> {
        let node = self.graph.node(id).ok_or(WalkError::UnknownNode(id))?;

        // back-edges are cut before the depth guard is consulted
        if state.active.contains(&id) {
            debug!(
                "Skipping node {} ({}): already on the current path",
                id,
                node.name.as_deref().unwrap_or("anonymous")
            );
            return Ok(());
        }

        if depth > self.max_depth {
            warn!("Route graph exceeds depth {} at node {}", self.max_depth, id);
            return Err(WalkError::DepthExceeded {
                limit: self.max_depth,
                node: id,
            });
        }
        state.active.insert(id);

        let pushed_segment = match &node.matcher {
            Some(matcher) => {
                state.segments.push(matcher.clone());
                true
            }
            None => false,
        };
        let pushed_handler = match &node.handler {
            Some(handler) => {
                state.chain.push(HandlerRef {
                    node: id,
                    name: node.name.clone(),
                    handler: handler.clone(),
                });
                true
            }
            None => false,
        };

        if let Some(methods) = &node.methods {
            let path = PathCompiler::compile(&state.segments);
            for (method, enabled) in methods {
                if *enabled {
                    let endpoint = DiscoveredEndpoint {
                        method: *method,
                        path: path.clone(),
                        handler_chain: state.chain.clone(),
                    };
                    Self::record(state, endpoint);
                }
            }
        }

        let result = node
            .children()
            .iter()
            .try_for_each(|child| self.visit(*child, depth + 1, state));

        if pushed_handler {
            state.chain.pop();
        }
        if pushed_segment {
            state.segments.pop();
        }
        state.active.remove(&id);

        result
    }

    fn record(state: &mut WalkState, endpoint: DiscoveredEndpoint) {
        let key = endpoint.key();
        match state.index.get(&key) {
            Some(&slot) => {
                debug!("Replacing duplicate route {} {}", key.0, key.1);
                state.endpoints[slot] = endpoint;
            }
            None => {
                debug!("Discovered route {} {}", key.0, key.1);
                state.index.insert(key, state.endpoints.len());
                state.endpoints.push(endpoint);
            }
        }
    }
}
