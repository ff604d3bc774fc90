//! Selection state for a "manage members" dialog.
//!
//! The editor owns the server-confirmed `initial` snapshot and the user's `selected`
//! set. After every save attempt, successful or not, the snapshot is stale and must be
//! replaced from the server before the next save.

use console_core::{MembershipSet, ResourceId, TransportError};
use thiserror::Error;

use crate::reconcile::{self, ApplyReport, Diff, ReconcileError, RelationApi};
use crate::relation::MembershipSource;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("membership of {0} changed since it was loaded; refresh before saving again")]
    StaleSnapshot(ResourceId),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone)]
pub struct MembershipEditor {
    parent: ResourceId,
    initial: MembershipSet,
    selected: MembershipSet,
    stale: bool,
}

impl MembershipEditor {
    pub fn new(parent: impl Into<ResourceId>, initial: MembershipSet) -> Self {
        Self {
            parent: parent.into(),
            selected: initial.clone(),
            initial,
            stale: false,
        }
    }

    /// Build an editor from the server's current membership.
    pub async fn load<S: MembershipSource + ?Sized>(
        source: &S,
        parent: impl Into<ResourceId>,
    ) -> Result<Self, TransportError> {
        let parent = parent.into();
        let initial = source.fetch_members(&parent).await?;
        Ok(Self::new(parent, initial))
    }

    pub fn parent(&self) -> &ResourceId {
        &self.parent
    }

    pub fn initial(&self) -> &MembershipSet {
        &self.initial
    }

    pub fn selected(&self) -> &MembershipSet {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Flip one member; returns whether it is now selected.
    pub fn toggle(&mut self, id: impl Into<ResourceId>) -> bool {
        self.selected.toggle(id)
    }

    /// Select every candidate, or clear the selection when `all` is false.
    pub fn select_all<I>(&mut self, candidates: I, all: bool)
    where
        I: IntoIterator,
        I::Item: Into<ResourceId>,
    {
        if all {
            self.selected.extend(candidates);
        } else {
            self.selected = MembershipSet::new();
        }
    }

    /// Discard local edits.
    pub fn reset(&mut self) {
        self.selected = self.initial.clone();
    }

    pub fn is_dirty(&self) -> bool {
        self.selected != self.initial
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn diff(&self) -> Diff {
        reconcile::diff(&self.initial, &self.selected)
    }

    /// Reconcile the selection against `api`.
    ///
    /// A clean editor issues no calls and stays fresh. Otherwise the snapshot is marked
    /// stale before the calls go out, whatever their outcome.
    pub async fn save<A: RelationApi + ?Sized>(
        &mut self,
        api: &A,
    ) -> Result<ApplyReport, EditorError> {
        if self.stale {
            return Err(EditorError::StaleSnapshot(self.parent.clone()));
        }

        let diff = self.diff();
        if !diff.is_empty() {
            self.stale = true;
        }
        Ok(reconcile::apply(api, &self.parent, &diff).await?)
    }

    /// Replace the snapshot with server-confirmed membership and reset the selection
    /// to it.
    pub fn refresh(&mut self, initial: MembershipSet) {
        self.selected = initial.clone();
        self.initial = initial;
        self.stale = false;
    }

    /// Re-fetch membership from `source` and [`refresh`](Self::refresh).
    pub async fn reload<S: MembershipSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<(), EditorError> {
        let initial = source.fetch_members(&self.parent).await?;
        self.refresh(initial);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> MembershipSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn new_editor_is_clean() {
        let editor = MembershipEditor::new("np-1", set(&["a", "b"]));
        assert!(!editor.is_dirty());
        assert!(!editor.is_stale());
        assert!(editor.diff().is_empty());
    }

    #[test]
    fn toggling_back_and_forth_is_not_dirty() {
        let mut editor = MembershipEditor::new("np-1", set(&["a", "b"]));
        assert!(!editor.toggle("a"));
        assert!(editor.is_dirty());
        assert!(editor.toggle("a"));
        assert!(!editor.is_dirty());
    }

    #[test]
    fn select_all_then_none() {
        let mut editor = MembershipEditor::new("np-1", set(&["a"]));
        editor.select_all(["a", "b", "c"], true);
        assert_eq!(editor.selected(), &set(&["a", "b", "c"]));
        assert_eq!(editor.diff().to_attach, vec![ResourceId::from("b"), ResourceId::from("c")]);

        editor.select_all(Vec::<ResourceId>::new(), false);
        assert!(editor.selected().is_empty());
        assert_eq!(editor.diff().to_detach, vec![ResourceId::from("a")]);
    }

    #[test]
    fn refresh_replaces_snapshot_and_selection() {
        let mut editor = MembershipEditor::new("np-1", set(&["a"]));
        editor.toggle("b");
        editor.refresh(set(&["c"]));
        assert_eq!(editor.initial(), &set(&["c"]));
        assert_eq!(editor.selected(), &set(&["c"]));
        assert!(!editor.is_dirty());
    }

    #[test]
    fn reset_discards_edits() {
        let mut editor = MembershipEditor::new("np-1", set(&["a"]));
        editor.toggle("b");
        editor.reset();
        assert!(!editor.is_dirty());
    }
}
