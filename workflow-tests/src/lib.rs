//! End-to-end workflow test infrastructure.
//!
//! Drives the console clients against a wiremock server that keeps relation
//! membership in memory, so a fetch after an apply sees what the apply changed.
//!
//! ## Usage
//!
//! ```bash
//! cargo test -p workflow-tests
//! ```

use anyhow::Result;
use console_core::config::ApiSettings;
use console_core::{ApiClient, MembershipSet, ResourceId};
use console_credentials::CredentialsClient;
use console_relations::{RelationSpec, RestRelation};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Once};
use uuid::Uuid;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Path prefix the mock backend serves under.
pub const API_PREFIX: &str = "/api/v1";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                "info,workflow_tests=debug,console_relations=debug,console_credentials=debug",
            )
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Fresh random id in the backend's UUID form.
pub fn new_id() -> ResourceId {
    ResourceId::from(Uuid::new_v4())
}

/// Context for workflow tests: one mock backend and a client pointed at it.
///
/// Each test should create its own context.
pub struct WorkflowTestContext {
    pub server: MockServer,
    pub client: ApiClient,
}

impl WorkflowTestContext {
    pub async fn new() -> Result<Self> {
        init_tracing();

        let server = MockServer::start().await;
        let settings = ApiSettings::new(format!("{}{}", server.uri(), API_PREFIX))
            .with_token("workflow-token");
        let client = ApiClient::new(&settings)?;

        Ok(Self { server, client })
    }

    pub fn relation(&self, spec: RelationSpec) -> RestRelation {
        RestRelation::new(self.client.clone(), spec)
    }

    pub fn credentials(&self) -> CredentialsClient {
        CredentialsClient::new(self.client.clone())
    }

    /// Serve `spec` for `parent` from in-memory state seeded with `initial`.
    pub async fn mount_relation(
        &self,
        spec: RelationSpec,
        parent: &ResourceId,
        initial: &[&str],
    ) -> RelationBackend {
        let backend = RelationBackend::new(spec, parent.clone(), initial);
        backend.mount(&self.server).await;
        backend
    }

    /// Serve `GET /servers` with the given summaries.
    pub async fn mount_servers(&self, servers: Value) {
        Mock::given(method("GET"))
            .and(path(format!("{}/servers", API_PREFIX)))
            .respond_with(ResponseTemplate::new(200).set_body_json(servers))
            .mount(&self.server)
            .await;
    }
}

#[derive(Debug, Default)]
struct BackendState {
    members: MembershipSet,
    failing_detaches: HashSet<String>,
    requests: HashMap<&'static str, usize>,
}

/// In-memory relation behind the mock server.
///
/// Attach and detach are idempotent. Detaches of ids marked with
/// [`RelationBackend::fail_detach_of`] return 500 until [`RelationBackend::heal`].
#[derive(Clone)]
pub struct RelationBackend {
    spec: RelationSpec,
    parent: ResourceId,
    state: Arc<Mutex<BackendState>>,
}

#[derive(Deserialize)]
struct AttachBody(HashMap<String, Vec<String>>);

impl RelationBackend {
    fn new(spec: RelationSpec, parent: ResourceId, initial: &[&str]) -> Self {
        let state = BackendState {
            members: initial.iter().copied().collect(),
            ..Default::default()
        };
        Self {
            spec,
            parent,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn members(&self) -> MembershipSet {
        self.lock().members.clone()
    }

    pub fn fail_detach_of(&self, id: &str) {
        self.lock().failing_detaches.insert(id.to_string());
    }

    pub fn heal(&self) {
        self.lock().failing_detaches.clear();
    }

    /// Number of requests served per operation (`fetch`, `attach`, `detach`).
    pub fn request_count(&self, operation: &str) -> usize {
        self.lock().requests.get(operation).copied().unwrap_or(0)
    }

    /// Simulate a concurrent editor changing membership.
    pub fn set_members(&self, ids: &[&str]) {
        self.lock().members = ids.iter().copied().collect();
    }

    async fn mount(&self, server: &MockServer) {
        let parent_path = format!("{}{}", API_PREFIX, self.spec.parent_path(&self.parent));
        let collection_path =
            format!("{}{}", API_PREFIX, self.spec.collection_path(&self.parent));

        let fetch = self.clone();
        Mock::given(method("GET"))
            .and(path(parent_path))
            .respond_with(move |_: &Request| fetch.respond_fetch())
            .mount(server)
            .await;

        let attach = self.clone();
        Mock::given(method("POST"))
            .and(path(collection_path.clone()))
            .respond_with(move |request: &Request| attach.respond_attach(request))
            .mount(server)
            .await;

        let detach = self.clone();
        Mock::given(method("DELETE"))
            .and(path_regex(format!("^{}/[^/]+$", collection_path)))
            .respond_with(move |request: &Request| detach.respond_detach(request))
            .mount(server)
            .await;
    }

    fn respond_fetch(&self) -> ResponseTemplate {
        let mut state = self.lock();
        *state.requests.entry("fetch").or_default() += 1;
        let members: Vec<Value> = state
            .members
            .iter()
            .map(|id| json!({ "id": id, "name": format!("member-{id}") }))
            .collect();

        let mut body = Map::new();
        body.insert("id".to_string(), json!(self.parent));
        body.insert(self.spec.embedded_field.to_string(), Value::Array(members));
        ResponseTemplate::new(200).set_body_json(Value::Object(body))
    }

    fn respond_attach(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.lock();
        *state.requests.entry("attach").or_default() += 1;

        let ids = match serde_json::from_slice::<AttachBody>(&request.body) {
            Ok(AttachBody(mut fields)) => fields.remove(self.spec.ids_field),
            Err(_) => None,
        };
        match ids {
            Some(ids) => {
                tracing::debug!(
                    relation = self.spec.name,
                    count = ids.len(),
                    "Mock backend attaching members"
                );
                state.members.extend(ids);
                ResponseTemplate::new(200).set_body_json(json!({ "id": self.parent }))
            }
            None => {
                tracing::warn!(
                    relation = self.spec.name,
                    "Mock backend rejected malformed attach body"
                );
                ResponseTemplate::new(400).set_body_string(format!(
                    "expected {{\"{}\": [...]}}",
                    self.spec.ids_field
                ))
            }
        }
    }

    fn respond_detach(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.lock();
        *state.requests.entry("detach").or_default() += 1;

        let member = request
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();

        if state.failing_detaches.contains(&member) {
            tracing::info!(
                relation = self.spec.name,
                member = %member,
                "Mock backend failing scripted detach"
            );
            return ResponseTemplate::new(500).set_body_string("detach failed");
        }
        state.members.remove(&member);
        tracing::debug!(
            relation = self.spec.name,
            member = %member,
            "Mock backend detached member"
        );
        ResponseTemplate::new(204)
    }
}
