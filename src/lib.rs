//! Staff purchase reimbursement requests: record model, approval lifecycle,
//! access gate and query API over a document store.

pub mod access;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod lookup;
pub mod projection;
pub mod request;
pub mod service;
pub mod store;
pub mod types;

pub use access::{AccessPolicy, Caller, PermissiveAccessPolicy, Principal, Role, RoleClaimPolicy};
pub use error::{ErrorKind, RequestError};
pub use lifecycle::{RequestState, StateUpdate};
pub use projection::{ProjectionMode, RequestView};
pub use request::{Attachment, NewRequest, RequestRecord};
pub use service::{HealthStatus, RequestService};
pub use store::{DocumentStore, SledStore, StoreError};
