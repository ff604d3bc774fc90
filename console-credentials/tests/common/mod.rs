//! Common test utilities for console-credentials integration tests.

use console_core::config::ApiSettings;
use console_core::ApiClient;
use console_credentials::CredentialsClient;
use serde_json::{json, Map, Value};
use std::sync::Once;
use wiremock::MockServer;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,console_credentials=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn credentials_client(server: &MockServer) -> CredentialsClient {
    let settings = ApiSettings::new(server.uri()).with_token("test-token");
    CredentialsClient::new(ApiClient::new(&settings).expect("client should build"))
}

pub fn obj(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// Backend representation of a stored credential.
#[allow(dead_code)]
pub fn credential_json(id: &str, provider: &str, kind: &str, scope_kind: &str) -> Value {
    json!({
        "id": id,
        "provider": provider,
        "kind": kind,
        "schema_version": 1,
        "name": "fixture",
        "scope_kind": scope_kind,
        "scope_version": 1,
        "scope": {},
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    })
}
