//! Minimal attach/detach edits for a many-to-many relation.

use async_trait::async_trait;
use console_core::{MembershipSet, ResourceId, TransportError};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use crate::metrics;

/// Edit that turns an `initial` membership into a `desired` one.
///
/// `to_attach` and `to_detach` are always disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub to_attach: Vec<ResourceId>,
    pub to_detach: Vec<ResourceId>,
}

impl Diff {
    /// True when applying this diff would issue no calls.
    pub fn is_empty(&self) -> bool {
        self.to_attach.is_empty() && self.to_detach.is_empty()
    }
}

/// `desired \ initial` to attach, `initial \ desired` to detach.
///
/// Each list follows the iteration order of the set it was drawn from.
pub fn diff(initial: &MembershipSet, desired: &MembershipSet) -> Diff {
    Diff {
        to_attach: desired.difference(initial),
        to_detach: initial.difference(desired),
    }
}

/// Backend operations for one relation.
///
/// Implementations must treat attaching an attached id and detaching a detached id
/// as successful no-ops; [`apply`] does not special-case either.
#[async_trait]
pub trait RelationApi: Send + Sync {
    /// Relation name used in logs and metrics.
    fn relation(&self) -> &str;

    /// Attach every id in `ids` to `parent` in one request.
    async fn attach_many(
        &self,
        parent: &ResourceId,
        ids: &[ResourceId],
    ) -> Result<(), TransportError>;

    /// Detach a single member from `parent`.
    async fn detach_one(&self, parent: &ResourceId, id: &ResourceId)
        -> Result<(), TransportError>;
}

/// What a successful [`apply`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub attached: Vec<ResourceId>,
    pub detached: Vec<ResourceId>,
}

impl ApplyReport {
    pub fn is_noop(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty()
    }
}

#[derive(Debug)]
pub struct DetachFailure {
    pub id: ResourceId,
    pub error: TransportError,
}

/// Outcome of an apply where at least one detach failed.
///
/// The relation matches neither the initial nor the desired membership; the caller
/// must re-fetch it before deriving a new diff.
#[derive(Debug)]
pub struct PartialReconciliation {
    pub parent: ResourceId,
    /// Ids attached by the bulk attach (empty if there was nothing to attach).
    pub attached: Vec<ResourceId>,
    pub detached: Vec<ResourceId>,
    pub failed: Vec<DetachFailure>,
}

impl PartialReconciliation {
    /// Ids whose detach failed and still need a retry.
    pub fn failed_ids(&self) -> Vec<&ResourceId> {
        self.failed.iter().map(|f| &f.id).collect()
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The bulk attach failed; no detach was issued.
    #[error("attaching {} member(s) to {parent} failed: {source}", .ids.len())]
    AttachFailed {
        parent: ResourceId,
        ids: Vec<ResourceId>,
        /// Detaches withheld because the attach did not go through.
        skipped_detaches: Vec<ResourceId>,
        #[source]
        source: TransportError,
    },

    #[error(
        "{} of {} detach(es) from {} failed",
        .0.failed.len(),
        .0.failed.len() + .0.detached.len(),
        .0.parent
    )]
    Partial(PartialReconciliation),
}

impl ReconcileError {
    /// Ids the caller cannot assume to be in their desired state.
    pub fn unresolved(&self) -> Vec<&ResourceId> {
        match self {
            ReconcileError::AttachFailed {
                ids,
                skipped_detaches,
                ..
            } => ids.iter().chain(skipped_detaches.iter()).collect(),
            ReconcileError::Partial(partial) => partial.failed_ids(),
        }
    }
}

/// Issue `diff` against `api`: one bulk attach, then one detach per id, in sequence.
///
/// An empty diff issues nothing. A failed detach does not stop the remaining ones;
/// every outcome is collected into [`ReconcileError::Partial`].
#[instrument(skip(api, parent, diff), fields(relation = %api.relation(), parent = %parent))]
pub async fn apply<A: RelationApi + ?Sized>(
    api: &A,
    parent: &ResourceId,
    diff: &Diff,
) -> Result<ApplyReport, ReconcileError> {
    let relation = api.relation();

    if diff.is_empty() {
        tracing::debug!("Membership unchanged, skipping reconcile");
        metrics::record_noop(relation);
        return Ok(ApplyReport::default());
    }

    if !diff.to_attach.is_empty() {
        let result = api.attach_many(parent, &diff.to_attach).await;
        metrics::record_relation_call(relation, "attach", result.is_ok());

        if let Err(source) = result {
            tracing::warn!(
                error = %source,
                to_attach = diff.to_attach.len(),
                skipped_detaches = diff.to_detach.len(),
                "Bulk attach failed"
            );
            return Err(ReconcileError::AttachFailed {
                parent: parent.clone(),
                ids: diff.to_attach.clone(),
                skipped_detaches: diff.to_detach.clone(),
                source,
            });
        }
    }

    let mut detached = Vec::with_capacity(diff.to_detach.len());
    let mut failed = Vec::new();

    for id in &diff.to_detach {
        let result = api.detach_one(parent, id).await;
        metrics::record_relation_call(relation, "detach", result.is_ok());

        match result {
            Ok(()) => detached.push(id.clone()),
            Err(error) => {
                tracing::warn!(member = %id, error = %error, "Detach failed");
                failed.push(DetachFailure {
                    id: id.clone(),
                    error,
                });
            }
        }
    }

    if !failed.is_empty() {
        return Err(ReconcileError::Partial(PartialReconciliation {
            parent: parent.clone(),
            attached: diff.to_attach.clone(),
            detached,
            failed,
        }));
    }

    tracing::info!(
        attached = diff.to_attach.len(),
        detached = detached.len(),
        "Relation reconciled"
    );

    Ok(ApplyReport {
        attached: diff.to_attach.clone(),
        detached,
    })
}

/// A relation's backend operations bound to [`diff`] and [`apply`].
///
/// Stateless between calls: the caller owns the initial snapshot and refreshes it
/// from the server after every apply.
pub struct Reconciler<A> {
    api: A,
}

impl<A: RelationApi> Reconciler<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn reconcile(
        &self,
        parent: &ResourceId,
        initial: &MembershipSet,
        desired: &MembershipSet,
    ) -> Result<ApplyReport, ReconcileError> {
        apply(&self.api, parent, &diff(initial, desired)).await
    }
}
