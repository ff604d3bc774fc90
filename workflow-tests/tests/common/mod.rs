//! Common test utilities for workflow integration tests.

use workflow_tests::WorkflowTestContext;

/// Create a new workflow test context with its own mock backend.
///
/// This is the main entry point for workflow tests.
pub async fn setup() -> WorkflowTestContext {
    WorkflowTestContext::new()
        .await
        .expect("Failed to create workflow test context")
}
