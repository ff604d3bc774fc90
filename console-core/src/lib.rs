//! console-core: Shared primitives for the infrastructure console.
pub mod client;
pub mod config;
pub mod error;
pub mod ids;
pub mod observability;
pub mod patch;

pub use client::{ApiClient, TransportError};
pub use error::AppError;
pub use ids::{MembershipSet, ResourceId};
pub use patch::{FieldPatch, patch_body, present_fields};

pub use reqwest;
pub use serde;
pub use serde_json;
pub use tracing;
