use pretty_assertions::assert_eq;
use route_scout::{
    discovery::{ScanOptions, ScannedEndpoint, Scanner},
    exporter::{
        openapi::{export_document, OpenApiOptions},
        postman::{export_collection, PostmanOptions},
    },
    host::HostValue,
    locator::SchemaSource,
    manifest::RouteManifest,
    persist::{persist_scan, PersistAction, PersistOptions},
    route_tree::{HttpMethod, RouteGraph, RouteNode},
    schema::{CanonicalSchema, PrimitiveKind},
    serializer::{serialize_json, serialize_yaml, write_to_file},
    storage::{InMemoryStorage, StorageProvider},
};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn fixture_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/users_manifest.json"))
}

fn scan_fixture() -> Vec<ScannedEndpoint> {
    let (graph, root) = RouteManifest::from_path(fixture_path())
        .expect("Failed to load fixture manifest")
        .into_graph()
        .expect("Fixture manifest should build a graph");
    Scanner::default()
        .scan(&graph, root)
        .expect("Fixture scan should succeed")
}

fn find<'a>(endpoints: &'a [ScannedEndpoint], method: HttpMethod, path: &str) -> &'a ScannedEndpoint {
    endpoints
        .iter()
        .find(|e| e.method() == method && e.template() == path)
        .unwrap_or_else(|| panic!("missing endpoint {} {}", method, path))
}

#[test]
fn test_manifest_scan_discovers_all_endpoints() {
    let endpoints = scan_fixture();

    let mut keys: Vec<String> = endpoints
        .iter()
        .map(|e| format!("{} {}", e.method(), e.template()))
        .collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "DELETE /api/users/:id",
            "GET /api/users",
            "GET /api/users/:id",
            "GET /health",
            "POST /api/users",
            "POST /v1/orders",
        ]
    );
}

#[test]
fn test_users_scenario_schemas() {
    let endpoints = scan_fixture();

    let post = find(&endpoints, HttpMethod::Post, "/api/users");
    assert_eq!(post.source, Some(SchemaSource::Direct));
    assert_eq!(post.schema.required_fields(), vec!["name"]);
    assert!(post.schema.field("age").unwrap().schema.is_optional());

    let health = find(&endpoints, HttpMethod::Get, "/health");
    assert_eq!(health.schema, CanonicalSchema::Unknown { validates: false });
}

#[test]
fn test_keyed_schema_found_through_schema_property() {
    let endpoints = scan_fixture();
    let orders = find(&endpoints, HttpMethod::Post, "/v1/orders");

    assert_eq!(orders.source, Some(SchemaSource::SchemaProperty));
    assert_eq!(
        orders.schema,
        CanonicalSchema::object([
            ("sku", CanonicalSchema::primitive(PrimitiveKind::String)),
            (
                "quantity",
                CanonicalSchema::optional(CanonicalSchema::primitive(PrimitiveKind::Number)),
            ),
        ])
    );
}

#[test]
fn test_postman_export_end_to_end() {
    let endpoints = scan_fixture();
    let collection = export_collection(&endpoints, &PostmanOptions::default()).unwrap();

    let names: Vec<_> = collection.item.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "GET /api/users",
            "POST /api/users",
            "DELETE /api/users/:id",
            "GET /api/users/:id",
            "GET /health",
            "POST /v1/orders",
        ]
    );

    let post = &collection.item[1].request;
    let body: serde_json::Value = serde_json::from_str(&post.body.raw).unwrap();
    assert_eq!(body, json!({ "name": "" }));

    let health = &collection.item[4].request;
    assert_eq!(health.body.raw, "{}");
    assert_eq!(health.url.raw, "{{baseUrl}}/health");
}

#[test]
fn test_openapi_export_end_to_end() {
    let endpoints = scan_fixture();
    let document = export_document(&endpoints, &OpenApiOptions::default()).unwrap();
    let value = serde_json::to_value(&document).unwrap();

    assert_eq!(value["openapi"], "3.0.0");
    assert_eq!(
        value["paths"]["/api/users"]["post"]["requestBody"]["content"]["application/json"]["schema"]
            ["required"],
        json!(["name"])
    );
    assert_eq!(
        value["paths"]["/api/users/{id}"]["delete"]["summary"],
        "DELETE /api/users/:id"
    );
    assert_eq!(
        value["paths"]["/health"]["get"]["responses"]["200"]["description"],
        "Successful response"
    );
    assert!(value["paths"]["/health"]["get"].get("requestBody").is_none());
}

#[test]
fn test_exports_are_byte_identical_across_scans() {
    let first = scan_fixture();
    let second = scan_fixture();

    let postman = |endpoints: &[ScannedEndpoint]| {
        serialize_json(&export_collection(endpoints, &PostmanOptions::default()).unwrap()).unwrap()
    };
    let openapi = |endpoints: &[ScannedEndpoint]| {
        serialize_yaml(&export_document(endpoints, &OpenApiOptions::default()).unwrap()).unwrap()
    };

    assert_eq!(postman(&first), postman(&second));
    assert_eq!(openapi(&first), openapi(&second));
}

#[test]
fn test_cycle_terminates_without_hitting_depth_guard() {
    let mut graph = RouteGraph::new();
    let root = graph.add(RouteNode::new().with_name("app"));
    let router = graph.add_child(root, RouteNode::new().with_path("/loop"));
    graph.add_child(
        router,
        RouteNode::new()
            .with_path("/ping")
            .with_methods(&[HttpMethod::Get]),
    );
    graph.mount(router, router);
    graph.mount(router, root);

    let options = ScanOptions {
        max_walk_depth: 4,
        ..ScanOptions::default()
    };
    let endpoints = Scanner::new(options).scan(&graph, root).unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].template(), "/loop/ping");
}

#[test]
fn test_unrecognized_handler_with_extractor() {
    let mut graph = RouteGraph::new();
    let root = graph.add(RouteNode::new());
    graph.add_child(
        root,
        RouteNode::new()
            .with_path("/legacy")
            .with_methods(&[HttpMethod::Put])
            .with_handler(HostValue::from_json(json!({
                "meta": { "body": { "_def": { "typeName": "ZodBoolean" } } }
            }))),
    );

    let options = ScanOptions::default().with_extractor(|handler| {
        let body = handler
            .as_object()
            .and_then(|o| o.get_object("meta").ok().flatten())
            .and_then(|meta| meta.get("body").ok().flatten());
        Ok(body)
    });
    let endpoints = Scanner::new(options).scan(&graph, root).unwrap();
    assert_eq!(endpoints[0].source, Some(SchemaSource::CustomExtractor));
    assert_eq!(
        endpoints[0].schema,
        CanonicalSchema::primitive(PrimitiveKind::Boolean)
    );
}

#[test]
fn test_write_export_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("out").join("collection.json");

    let endpoints = scan_fixture();
    let content =
        serialize_json(&export_collection(&endpoints, &PostmanOptions::default()).unwrap()).unwrap();
    write_to_file(&content, &output).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["item"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_rescan_and_persist_is_idempotent() {
    let storage = InMemoryStorage::new();
    let options = PersistOptions::default();

    let first = persist_scan(&storage, "user-1", &scan_fixture(), &options)
        .await
        .unwrap();
    assert_eq!(first.count(PersistAction::Created), 6);

    let second = persist_scan(&storage, "user-1", &scan_fixture(), &options)
        .await
        .unwrap();
    assert_eq!(second.count(PersistAction::Updated), 6);
    assert_eq!(second.count(PersistAction::Created), 0);

    let requests = storage.get_requests(first.collection_id).await.unwrap();
    assert_eq!(requests.len(), 6);
    assert_eq!(storage.get_collections("user-1").await.unwrap().len(), 1);
}
