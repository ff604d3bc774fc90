//! Single-valued attachments such as a cluster's bastion server or load balancers.
//!
//! A slot holds at most one member. The desired state is a [`FieldPatch`], so
//! "leave as is", "detach" and "attach this id" stay distinct.

use async_trait::async_trait;
use console_core::{ApiClient, FieldPatch, ResourceId, TransportError};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: &'static str,
    pub parent_collection: &'static str,
    pub slot: &'static str,
    /// Key of the member id in the attach request body.
    pub id_field: &'static str,
    /// Key of the embedded member object in the parent resource.
    pub embedded_field: &'static str,
}

impl SlotSpec {
    pub fn parent_path(&self, parent: &ResourceId) -> String {
        format!("/{}/{}", self.parent_collection, parent)
    }

    pub fn slot_path(&self, parent: &ResourceId) -> String {
        format!("/{}/{}/{}", self.parent_collection, parent, self.slot)
    }

    pub fn attach_body(&self, id: &ResourceId) -> Value {
        let mut body = Map::new();
        body.insert(self.id_field.to_string(), Value::String(id.to_string()));
        Value::Object(body)
    }
}

pub const CLUSTER_CAPTAIN_DOMAIN: SlotSpec = SlotSpec {
    name: "cluster_captain_domain",
    parent_collection: "clusters",
    slot: "captain-domain",
    id_field: "domain_id",
    embedded_field: "captain_domain",
};

pub const CLUSTER_CONTROL_PLANE_RECORD_SET: SlotSpec = SlotSpec {
    name: "cluster_control_plane_record_set",
    parent_collection: "clusters",
    slot: "control-plane-record-set",
    id_field: "record_set_id",
    embedded_field: "control_plane_record_set",
};

pub const CLUSTER_APPS_LOAD_BALANCER: SlotSpec = SlotSpec {
    name: "cluster_apps_load_balancer",
    parent_collection: "clusters",
    slot: "apps-load-balancer",
    id_field: "load_balancer_id",
    embedded_field: "apps_load_balancer",
};

pub const CLUSTER_GLUEOPS_LOAD_BALANCER: SlotSpec = SlotSpec {
    name: "cluster_glueops_load_balancer",
    parent_collection: "clusters",
    slot: "glueops-load-balancer",
    id_field: "load_balancer_id",
    embedded_field: "glueops_load_balancer",
};

pub const CLUSTER_BASTION: SlotSpec = SlotSpec {
    name: "cluster_bastion",
    parent_collection: "clusters",
    slot: "bastion",
    id_field: "server_id",
    embedded_field: "bastion_server",
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotChange {
    Keep,
    Attach(ResourceId),
    Detach,
}

/// Decide the single call (if any) that moves a slot from `current` to `desired`.
pub fn plan_slot(current: Option<&ResourceId>, desired: &FieldPatch<ResourceId>) -> SlotChange {
    match (desired, current) {
        (FieldPatch::Unset, _) => SlotChange::Keep,
        (FieldPatch::Clear, None) => SlotChange::Keep,
        (FieldPatch::Clear, Some(_)) => SlotChange::Detach,
        (FieldPatch::Value(id), Some(current)) if current == id => SlotChange::Keep,
        (FieldPatch::Value(id), _) => SlotChange::Attach(id.clone()),
    }
}

#[async_trait]
pub trait SlotApi: Send + Sync {
    /// Slot name used in logs and metrics.
    fn slot(&self) -> &str;

    /// Attach `id`, replacing whatever the slot held.
    async fn attach(&self, parent: &ResourceId, id: &ResourceId) -> Result<(), TransportError>;

    async fn detach(&self, parent: &ResourceId) -> Result<(), TransportError>;
}

/// Issue at most one call for `change`.
pub async fn apply_slot<A: SlotApi + ?Sized>(
    api: &A,
    parent: &ResourceId,
    change: &SlotChange,
) -> Result<(), TransportError> {
    let (operation, result) = match change {
        SlotChange::Keep => {
            tracing::debug!(slot = api.slot(), parent = %parent, "Slot unchanged");
            return Ok(());
        }
        SlotChange::Attach(id) => ("attach", api.attach(parent, id).await),
        SlotChange::Detach => ("detach", api.detach(parent).await),
    };

    metrics::record_relation_call(api.slot(), operation, result.is_ok());
    match &result {
        Ok(()) => tracing::info!(slot = api.slot(), parent = %parent, operation, "Slot updated"),
        Err(e) => tracing::warn!(
            slot = api.slot(),
            parent = %parent,
            operation,
            error = %e,
            "Slot update failed"
        ),
    }
    result
}

#[derive(Debug, Clone)]
pub struct RestSlot {
    client: ApiClient,
    spec: SlotSpec,
}

impl RestSlot {
    pub fn new(client: ApiClient, spec: SlotSpec) -> Self {
        Self { client, spec }
    }

    /// Id of the member currently held by the slot, read from the parent resource.
    pub async fn fetch_current(
        &self,
        parent: &ResourceId,
    ) -> Result<Option<ResourceId>, TransportError> {
        let resource: Value = self
            .client
            .get_json(&self.spec.parent_path(parent), &[])
            .await?;

        Ok(resource
            .get(self.spec.embedded_field)
            .and_then(|member| member.get("id"))
            .and_then(Value::as_str)
            .map(ResourceId::from))
    }
}

#[async_trait]
impl SlotApi for RestSlot {
    fn slot(&self) -> &str {
        self.spec.name
    }

    #[instrument(
        skip(self, parent, id),
        fields(slot = self.spec.name, parent = %parent, member = %id)
    )]
    async fn attach(&self, parent: &ResourceId, id: &ResourceId) -> Result<(), TransportError> {
        self.client
            .post(&self.spec.slot_path(parent), &self.spec.attach_body(id))
            .await
    }

    #[instrument(skip(self, parent), fields(slot = self.spec.name, parent = %parent))]
    async fn detach(&self, parent: &ResourceId) -> Result<(), TransportError> {
        self.client.delete(&self.spec.slot_path(parent)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ResourceId {
        ResourceId::from(s)
    }

    #[test]
    fn unset_keeps_whatever_is_attached() {
        assert_eq!(plan_slot(Some(&id("b-1")), &FieldPatch::Unset), SlotChange::Keep);
        assert_eq!(plan_slot(None, &FieldPatch::Unset), SlotChange::Keep);
    }

    #[test]
    fn clear_detaches_only_when_occupied() {
        assert_eq!(plan_slot(Some(&id("b-1")), &FieldPatch::Clear), SlotChange::Detach);
        assert_eq!(plan_slot(None, &FieldPatch::Clear), SlotChange::Keep);
    }

    #[test]
    fn value_attaches_unless_already_current() {
        assert_eq!(
            plan_slot(Some(&id("b-1")), &FieldPatch::Value(id("b-1"))),
            SlotChange::Keep
        );
        assert_eq!(
            plan_slot(Some(&id("b-1")), &FieldPatch::Value(id("b-2"))),
            SlotChange::Attach(id("b-2"))
        );
        assert_eq!(
            plan_slot(None, &FieldPatch::Value(id("b-2"))),
            SlotChange::Attach(id("b-2"))
        );
    }

    struct CountingSlot {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl SlotApi for CountingSlot {
        fn slot(&self) -> &str {
            "counting"
        }

        async fn attach(&self, _: &ResourceId, _: &ResourceId) -> Result<(), TransportError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        async fn detach(&self, _: &ResourceId) -> Result<(), TransportError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(TransportError::status(409, "in use"))
        }
    }

    #[test]
    fn apply_slot_issues_at_most_one_call() {
        let api = CountingSlot {
            calls: Default::default(),
        };
        let parent = id("c-1");

        tokio_test::block_on(apply_slot(&api, &parent, &SlotChange::Keep)).unwrap();
        assert_eq!(api.calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        tokio_test::block_on(apply_slot(&api, &parent, &SlotChange::Attach(id("s-1")))).unwrap();
        assert_eq!(api.calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        let err = tokio_test::block_on(apply_slot(&api, &parent, &SlotChange::Detach)).unwrap_err();
        assert_eq!(err.status_code(), Some(409));
        assert_eq!(api.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn slot_paths_and_bodies() {
        let parent = id("c-1");
        assert_eq!(CLUSTER_BASTION.slot_path(&parent), "/clusters/c-1/bastion");
        assert_eq!(
            CLUSTER_APPS_LOAD_BALANCER.attach_body(&id("lb-1")),
            serde_json::json!({ "load_balancer_id": "lb-1" })
        );
    }
}
