//! Route Scout - discovers HTTP endpoints and request schemas from a live route graph.
//!
//! The input is the host application's route/layer graph, already materialized in
//! memory as a [`route_tree::RouteGraph`] whose handlers are duck-typed
//! [`host::HostValue`] objects. A scan walks the graph, recovers each endpoint's path
//! template, finds the validation schema attached to its handlers and normalizes it into
//! a small canonical model that the exporters and the persistence step consume.
//!
//! # Architecture
//!
//! 1. [`route_tree`] - Route graph arena, nodes and HTTP methods
//! 2. [`path_compiler`] - Joins path segments into a template, recovers literal paths from patterns
//! 3. [`walker`] - Depth-first traversal with cycle and depth guards
//! 4. [`locator`] - Finds a raw schema on a handler chain
//! 5. [`normalizer`] - Turns Zod/Joi-like schema objects into [`schema::CanonicalSchema`]
//! 6. [`discovery`] - Runs one scan end to end
//! 7. [`exporter`] - Postman collection and OpenAPI documents
//! 8. [`serializer`] - YAML/JSON output
//! 9. [`storage`] / [`persist`] - Idempotent persistence of scanned requests
//!
//! # Example Usage
//!
//! ```
//! use route_scout::discovery::Scanner;
//! use route_scout::exporter::postman::{export_collection, PostmanOptions};
//! use route_scout::host::HostValue;
//! use route_scout::route_tree::{HttpMethod, RouteGraph, RouteNode};
//! use serde_json::json;
//!
//! let mut graph = RouteGraph::new();
//! let root = graph.add(RouteNode::new().with_name("app"));
//! graph.add_child(
//!     root,
//!     RouteNode::new()
//!         .with_path("/users")
//!         .with_methods(&[HttpMethod::Post])
//!         .with_handler(HostValue::from_json(json!({
//!             "zodSchema": {
//!                 "_def": { "typeName": "ZodObject" },
//!                 "shape": { "name": { "_def": { "typeName": "ZodString" } } }
//!             }
//!         }))),
//! );
//!
//! let endpoints = Scanner::default().scan(&graph, root).unwrap();
//! let collection = export_collection(&endpoints, &PostmanOptions::default()).unwrap();
//! assert_eq!(collection.item[0].name, "POST /users");
//! ```
//!
//! # Command-Line Interface
//!
//! The [`cli`] module drives the same pipeline from a route manifest file.

pub mod cli;
pub mod discovery;
pub mod error;
pub mod exporter;
pub mod host;
pub mod locator;
pub mod manifest;
pub mod normalizer;
pub mod path_compiler;
pub mod persist;
pub mod route_tree;
pub mod schema;
pub mod serializer;
pub mod storage;
pub mod walker;
