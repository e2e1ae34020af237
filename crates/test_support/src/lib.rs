//! Shared helpers for tests that need a real Postgres.
//!
//! Containers are started through `testcontainers` against whatever Docker API
//! socket is reachable (Docker or Podman). Tests call
//! [`runtime::ensure_container_runtime`] first and skip when it fails.

pub mod postgres;
pub mod runtime;

use uuid::Uuid;

/// A uniquely named container network so parallel tests never share one.
#[derive(Debug, Clone)]
pub struct TestNetwork {
    name: String,
}

impl TestNetwork {
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            name: unique_name(prefix),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

pub(crate) fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}
