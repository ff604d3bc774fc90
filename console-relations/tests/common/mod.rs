//! Common test utilities for console-relations integration tests.

use async_trait::async_trait;
use console_core::{MembershipSet, ResourceId, TransportError};
use console_relations::{MembershipSource, RelationApi};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,console_relations=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn set(ids: &[&str]) -> MembershipSet {
    ids.iter().copied().collect()
}

pub fn ids(ids: &[&str]) -> Vec<ResourceId> {
    ids.iter().copied().map(ResourceId::from).collect()
}

/// Recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Attach(Vec<ResourceId>),
    Detach(ResourceId),
}

/// In-memory relation that records every call and applies it to its own membership.
///
/// Attach and detach are idempotent, like the real backend. Failures are scripted per
/// member id or for the bulk attach.
#[allow(dead_code)]
pub struct RecordingRelation {
    pub name: &'static str,
    calls: Mutex<Vec<Call>>,
    members: Mutex<MembershipSet>,
    failing_detaches: Mutex<HashSet<String>>,
    fail_attach: Mutex<bool>,
    attach_calls: AtomicUsize,
    detach_calls: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingRelation {
    pub fn new(members: MembershipSet) -> Self {
        Self {
            name: "test_relation",
            calls: Mutex::new(Vec::new()),
            members: Mutex::new(members),
            failing_detaches: Mutex::new(HashSet::new()),
            fail_attach: Mutex::new(false),
            attach_calls: AtomicUsize::new(0),
            detach_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_detach_of(self, id: &str) -> Self {
        self.failing_detaches.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn fail_attach(self) -> Self {
        *self.fail_attach.lock().unwrap() = true;
        self
    }

    /// Let every call succeed from now on.
    pub fn heal(&self) {
        self.failing_detaches.lock().unwrap().clear();
        *self.fail_attach.lock().unwrap() = false;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.attach_calls.load(Ordering::SeqCst) + self.detach_calls.load(Ordering::SeqCst)
    }

    pub fn attach_calls(&self) -> usize {
        self.attach_calls.load(Ordering::SeqCst)
    }

    pub fn detach_calls(&self) -> usize {
        self.detach_calls.load(Ordering::SeqCst)
    }

    pub fn members(&self) -> MembershipSet {
        self.members.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelationApi for RecordingRelation {
    fn relation(&self) -> &str {
        self.name
    }

    async fn attach_many(
        &self,
        _parent: &ResourceId,
        ids: &[ResourceId],
    ) -> Result<(), TransportError> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(Call::Attach(ids.to_vec()));
        if *self.fail_attach.lock().unwrap() {
            return Err(TransportError::status(500, "attach failed"));
        }
        self.members.lock().unwrap().extend(ids.iter().cloned());
        Ok(())
    }

    async fn detach_one(
        &self,
        _parent: &ResourceId,
        id: &ResourceId,
    ) -> Result<(), TransportError> {
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(Call::Detach(id.clone()));
        if self.failing_detaches.lock().unwrap().contains(id.as_str()) {
            return Err(TransportError::status(502, format!("detach of {id} failed")));
        }
        self.members.lock().unwrap().remove(id.as_str());
        Ok(())
    }
}

#[async_trait]
impl MembershipSource for RecordingRelation {
    async fn fetch_members(&self, _parent: &ResourceId) -> Result<MembershipSet, TransportError> {
        Ok(self.members())
    }
}
