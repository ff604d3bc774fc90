//! Bootstrap with span export enabled.
//!
//! Separate test binary: the global subscriber can be installed once per process.

use console_core::ApiClient;
use console_core::config::Settings;
use console_core::observability::{TRACEPARENT_HEADER, init_tracing};
use serde_json::{Value, json};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread")]
async fn bootstrap_with_otlp_endpoint_propagates_trace_context() {
    let mut settings = Settings::load().expect("settings load without a configuration file");
    // Nothing listens here; the exporter connects lazily and export errors are only reported.
    settings.otlp_endpoint = Some("http://127.0.0.1:4317".to_string());
    init_tracing(&settings);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header_exists(TRACEPARENT_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    settings.api.base_url = server.uri();
    let client = ApiClient::new(&settings.api).expect("client should build");

    let span = tracing::info_span!("otlp_bootstrap");
    let _guard = span.enter();
    let health: Value = client.get_json("/health", &[]).await.expect("health check");
    assert_eq!(health["status"], "ok");
}
