//! Container runtime adapter contract.
//!
//! The facade talks to the container engine only through [`ContainerRuntime`].
//! Implementations must be safe for concurrent use; the Docker engine adapter
//! lives in [`docker`]. Failures are reported as they happen and never retried
//! here.

mod docker;

pub use docker::DockerRuntime;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::container::{CreateRequest, CreatedContainer, ResourceRecord, StatsSnapshot};
use crate::error::RuntimeError;

/// How many log lines to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tail {
    /// Every line.
    #[default]
    All,
    /// The last `n` lines.
    Lines(u64),
}

impl std::fmt::Display for Tail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Lines(n) => write!(f, "{n}"),
        }
    }
}

/// Options for fetching container logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    pub stdout: bool,
    pub stderr: bool,
    pub tail: Tail,
    /// Unix timestamp to start from.
    pub since: Option<i64>,
    /// Unix timestamp to end at.
    pub until: Option<i64>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            stdout: true,
            stderr: true,
            tail: Tail::All,
            since: None,
            until: None,
        }
    }
}

/// Options for removing a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Kill a running container before removal.
    pub force: bool,
    /// Remove anonymous volumes attached to the container.
    pub volumes: bool,
}

/// Lifecycle and query operations the facade needs from a container engine.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Returns true if the engine answers.
    async fn ping(&self) -> bool;

    /// Lists containers carrying `label_filter` (`key=value`).
    ///
    /// Stopped containers are included when `all` is set.
    async fn list(&self, label_filter: &str, all: bool)
    -> Result<Vec<ResourceRecord>, RuntimeError>;

    /// Creates (but does not start) a container with exactly `labels`.
    async fn create(
        &self,
        request: &CreateRequest,
        labels: HashMap<String, String>,
    ) -> Result<CreatedContainer, RuntimeError>;

    /// Reads the current state of a container by id or name.
    ///
    /// Unknown containers yield `RuntimeError::ContainerNotFound`.
    async fn inspect(&self, id: &str) -> Result<ResourceRecord, RuntimeError>;

    async fn start(&self, id: &str) -> Result<(), RuntimeError>;

    /// Stops a container, killing it after `timeout_secs`.
    async fn stop(&self, id: &str, timeout_secs: u32) -> Result<(), RuntimeError>;

    /// Restarts a container, killing it after `timeout_secs`.
    async fn restart(&self, id: &str, timeout_secs: u32) -> Result<(), RuntimeError>;

    async fn remove(&self, id: &str, options: RemoveOptions) -> Result<(), RuntimeError>;

    /// Returns raw log bytes.
    async fn logs(&self, id: &str, options: &LogOptions) -> Result<Vec<u8>, RuntimeError>;

    /// Returns one stats sample.
    async fn stats(&self, id: &str) -> Result<StatsSnapshot, RuntimeError>;
}
