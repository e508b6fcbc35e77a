//! Authorization of operations on existing containers.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::ManagedLabels;
use crate::container::ResourceRecord;
use crate::error::{ContainerError, RuntimeError};
use crate::runtime::ContainerRuntime;

/// Gatekeeper for every non-create operation.
///
/// Fetches the container from the runtime and releases it only when it carries
/// the managed label. The fetch-then-act sequence is not atomic: a container
/// removed or relabelled concurrently may change between the check and the
/// caller's operation.
#[derive(Clone)]
pub struct OwnershipGuard {
    runtime: Arc<dyn ContainerRuntime>,
    labels: ManagedLabels,
}

impl std::fmt::Debug for OwnershipGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnershipGuard")
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl OwnershipGuard {
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>, labels: ManagedLabels) -> Self {
        Self { runtime, labels }
    }

    #[must_use]
    pub fn labels(&self) -> &ManagedLabels {
        &self.labels
    }

    /// Returns the current record of `id` if this service manages it.
    ///
    /// # Errors
    ///
    /// - `ContainerError::NotFound` if the runtime does not know `id`
    /// - `ContainerError::NotManaged` if the container lacks the managed label
    /// - `ContainerError::Runtime` if the runtime fails otherwise
    #[instrument(skip(self), fields(container_id = %id))]
    pub async fn authorize(&self, id: &str) -> Result<ResourceRecord, ContainerError> {
        let record = match self.runtime.inspect(id).await {
            Ok(record) => record,
            Err(RuntimeError::ContainerNotFound(_)) => {
                debug!("Container not found");
                return Err(ContainerError::NotFound { id: id.to_string() });
            }
            Err(source) => return Err(ContainerError::runtime("inspect", id, source)),
        };

        if !self.labels.is_managed(&record.labels) {
            warn!("Refusing access to unmanaged container");
            return Err(ContainerError::NotManaged { id: id.to_string() });
        }

        debug!(full_id = %record.id, "Container access granted");
        Ok(record)
    }
}
