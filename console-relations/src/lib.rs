//! Reconciliation of console resource relations.
//!
//! Every "attach/detach X to Y" feature is a configuration of the same pair:
//! [`reconcile::diff`] computes the minimal edit between the server-confirmed and the
//! desired membership, and [`reconcile::apply`] issues it against an API that only
//! offers bulk attach and single detach.

pub mod editor;
pub mod eligibility;
pub mod metrics;
pub mod reconcile;
pub mod relation;
pub mod slot;

pub use editor::{EditorError, MembershipEditor};
pub use eligibility::{can_attach_to_pool, eligible_servers, NodeRole, ServerSummary};
pub use reconcile::{
    apply, diff, ApplyReport, DetachFailure, Diff, PartialReconciliation, ReconcileError,
    Reconciler, RelationApi,
};
pub use relation::{MembershipSource, RelationSpec, RestRelation};
pub use slot::{apply_slot, plan_slot, RestSlot, SlotApi, SlotChange, SlotSpec};
