//! Relation catalogue and the REST adapter shared by every relation.
//!
//! The backend exposes each relation with the same shape:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | fetch | `GET /{parent_collection}/{id}?include={embedded_field}` |
//! | bulk attach | `POST /{parent_collection}/{id}/{relation}` with `{ {ids_field}: [...] }` |
//! | single detach | `DELETE /{parent_collection}/{id}/{relation}/{member_id}` |

use async_trait::async_trait;
use console_core::{ApiClient, MembershipSet, ResourceId, TransportError};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::reconcile::RelationApi;

/// Static description of one many-to-many relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationSpec {
    pub name: &'static str,
    pub parent_collection: &'static str,
    pub relation: &'static str,
    pub ids_field: &'static str,
    /// Key of the embedded member array in the parent resource.
    pub embedded_field: &'static str,
}

impl RelationSpec {
    pub fn parent_path(&self, parent: &ResourceId) -> String {
        format!("/{}/{}", self.parent_collection, parent)
    }

    pub fn collection_path(&self, parent: &ResourceId) -> String {
        format!("/{}/{}/{}", self.parent_collection, parent, self.relation)
    }

    pub fn member_path(&self, parent: &ResourceId, member: &ResourceId) -> String {
        format!(
            "/{}/{}/{}/{}",
            self.parent_collection, parent, self.relation, member
        )
    }

    /// Bulk attach request body.
    pub fn attach_body(&self, ids: &[ResourceId]) -> Value {
        let ids = ids
            .iter()
            .map(|id| Value::String(id.to_string()))
            .collect();
        let mut body = Map::new();
        body.insert(self.ids_field.to_string(), Value::Array(ids));
        Value::Object(body)
    }
}

pub const NODE_POOL_SERVERS: RelationSpec = RelationSpec {
    name: "node_pool_servers",
    parent_collection: "node-pools",
    relation: "servers",
    ids_field: "server_ids",
    embedded_field: "servers",
};

pub const NODE_POOL_TAINTS: RelationSpec = RelationSpec {
    name: "node_pool_taints",
    parent_collection: "node-pools",
    relation: "taints",
    ids_field: "taint_ids",
    embedded_field: "taints",
};

pub const NODE_POOL_LABELS: RelationSpec = RelationSpec {
    name: "node_pool_labels",
    parent_collection: "node-pools",
    relation: "labels",
    ids_field: "label_ids",
    embedded_field: "labels",
};

pub const NODE_POOL_ANNOTATIONS: RelationSpec = RelationSpec {
    name: "node_pool_annotations",
    parent_collection: "node-pools",
    relation: "annotations",
    ids_field: "annotation_ids",
    embedded_field: "annotations",
};

pub const TAINT_NODE_POOLS: RelationSpec = RelationSpec {
    name: "taint_node_pools",
    parent_collection: "taints",
    relation: "node-pools",
    ids_field: "node_pool_ids",
    embedded_field: "node_pools",
};

pub const LABEL_NODE_POOLS: RelationSpec = RelationSpec {
    name: "label_node_pools",
    parent_collection: "labels",
    relation: "node-pools",
    ids_field: "node_pool_ids",
    embedded_field: "node_pools",
};

pub const ANNOTATION_NODE_POOLS: RelationSpec = RelationSpec {
    name: "annotation_node_pools",
    parent_collection: "annotations",
    relation: "node-pools",
    ids_field: "node_pool_ids",
    embedded_field: "node_pools",
};

pub const CLUSTER_NODE_POOLS: RelationSpec = RelationSpec {
    name: "cluster_node_pools",
    parent_collection: "clusters",
    relation: "node-pools",
    ids_field: "node_pool_ids",
    embedded_field: "node_pools",
};

pub const ALL_RELATIONS: &[RelationSpec] = &[
    NODE_POOL_SERVERS,
    NODE_POOL_TAINTS,
    NODE_POOL_LABELS,
    NODE_POOL_ANNOTATIONS,
    TAINT_NODE_POOLS,
    LABEL_NODE_POOLS,
    ANNOTATION_NODE_POOLS,
    CLUSTER_NODE_POOLS,
];

/// Server-confirmed membership of a relation.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    async fn fetch_members(&self, parent: &ResourceId) -> Result<MembershipSet, TransportError>;
}

/// [`RelationApi`] and [`MembershipSource`] over the console REST backend.
#[derive(Debug, Clone)]
pub struct RestRelation {
    client: ApiClient,
    spec: RelationSpec,
}

impl RestRelation {
    pub fn new(client: ApiClient, spec: RelationSpec) -> Self {
        Self { client, spec }
    }

    pub fn spec(&self) -> &RelationSpec {
        &self.spec
    }
}

#[async_trait]
impl RelationApi for RestRelation {
    fn relation(&self) -> &str {
        self.spec.name
    }

    #[instrument(
        skip(self, parent, ids),
        fields(relation = self.spec.name, parent = %parent, count = ids.len())
    )]
    async fn attach_many(
        &self,
        parent: &ResourceId,
        ids: &[ResourceId],
    ) -> Result<(), TransportError> {
        self.client
            .post(&self.spec.collection_path(parent), &self.spec.attach_body(ids))
            .await
    }

    #[instrument(
        skip(self, parent, id),
        fields(relation = self.spec.name, parent = %parent, member = %id)
    )]
    async fn detach_one(
        &self,
        parent: &ResourceId,
        id: &ResourceId,
    ) -> Result<(), TransportError> {
        self.client.delete(&self.spec.member_path(parent, id)).await
    }
}

#[async_trait]
impl MembershipSource for RestRelation {
    /// A missing or `null` embedded array is an empty membership.
    async fn fetch_members(&self, parent: &ResourceId) -> Result<MembershipSet, TransportError> {
        let resource: Value = self
            .client
            .get_json(
                &self.spec.parent_path(parent),
                &[("include", self.spec.embedded_field)],
            )
            .await?;

        match resource.get(self.spec.embedded_field) {
            None | Some(Value::Null) => Ok(MembershipSet::new()),
            Some(Value::Array(items)) => Ok(MembershipSet::from_summaries(items)),
            Some(other) => Err(TransportError::Decode(format!(
                "expected `{}` to be an array, got {}",
                self.spec.embedded_field, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paths_follow_backend_routes() {
        let parent = ResourceId::from("np-1");
        let member = ResourceId::from("s-9");
        assert_eq!(NODE_POOL_SERVERS.parent_path(&parent), "/node-pools/np-1");
        assert_eq!(
            NODE_POOL_SERVERS.collection_path(&parent),
            "/node-pools/np-1/servers"
        );
        assert_eq!(
            NODE_POOL_SERVERS.member_path(&parent, &member),
            "/node-pools/np-1/servers/s-9"
        );
        assert_eq!(
            TAINT_NODE_POOLS.member_path(&ResourceId::from("t-1"), &parent),
            "/taints/t-1/node-pools/np-1"
        );
    }

    #[test]
    fn attach_body_uses_relation_ids_field() {
        let ids = vec![ResourceId::from("a"), ResourceId::from("b")];
        assert_eq!(
            NODE_POOL_LABELS.attach_body(&ids),
            json!({ "label_ids": ["a", "b"] })
        );
        assert_eq!(
            CLUSTER_NODE_POOLS.attach_body(&ids),
            json!({ "node_pool_ids": ["a", "b"] })
        );
    }

    #[test]
    fn relation_names_are_unique() {
        let mut names: Vec<_> = ALL_RELATIONS.iter().map(|r| r.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_RELATIONS.len());
    }
}
