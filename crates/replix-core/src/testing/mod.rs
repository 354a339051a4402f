//! Testing infrastructure for Replix Core
//!
//! - **TestContext**: temporary directory removed on drop
//! - **MockReplicaClient**: scripted replicas for exercising both
//!   replication modes without a network
//!
//! # Usage
//!
//! ```rust,no_run
//! use replix_core::testing::{MockReplicaClient, ReplicaBehavior};
//!
//! let client = MockReplicaClient::new().with("http://replica-2", ReplicaBehavior::Reject);
//! ```

mod context;
mod replica;

pub use context::TestContext;
pub use replica::{MockReplicaClient, ReplicaBehavior};
