//! Process bootstrap: settings, global subscriber, API client.
//!
//! Lives in its own test binary because it installs the global subscriber.

use console_core::ApiClient;
use console_core::config::Settings;
use console_core::observability::init_tracing;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn bootstrap_without_otlp_endpoint() {
    let mut settings = Settings::load().expect("settings load without a configuration file");
    settings.otlp_endpoint = None;
    init_tracing(&settings);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    settings.api.base_url = server.uri();
    let client = ApiClient::new(&settings.api).expect("client should build");

    let span = tracing::info_span!("bootstrap");
    let _guard = span.enter();
    let health: Value = client.get_json("/health", &[]).await.expect("health check");
    assert_eq!(health["status"], "ok");
}
