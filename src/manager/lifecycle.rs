//! The container control-plane facade.
//!
//! Creation goes validator → tagger → runtime. Every other operation goes
//! guard → runtime, using the id the guard resolved.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument};

use crate::container::{
    ContainerList, ContainerLogs, ContainerStats, CreateRequest, CreatedContainer, ResourceRecord,
    decode_logs,
};
use crate::error::{ContainerError, RuntimeError};
use crate::ownership::{ManagedLabels, OwnershipGuard};
use crate::policy::PolicyConfig;
use crate::runtime::{ContainerRuntime, LogOptions, RemoveOptions};
use crate::security::RequestValidator;

/// Restricted facade over a [`ContainerRuntime`].
///
/// Holds no mutable state; clone it or share it behind an `Arc` across
/// concurrent requests.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use guarded_docker_api::container::CreateRequest;
/// use guarded_docker_api::manager::ContainerManager;
/// use guarded_docker_api::policy::PolicyConfig;
/// use guarded_docker_api::runtime::DockerRuntime;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let runtime = Arc::new(DockerRuntime::connect()?);
/// let manager = ContainerManager::new(runtime, Arc::new(PolicyConfig::default()));
///
/// let created = manager.create(&CreateRequest::new("redis:7"), None).await?;
/// manager.start(&created.id).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ContainerManager {
    runtime: Arc<dyn ContainerRuntime>,
    policy: Arc<PolicyConfig>,
    validator: RequestValidator,
    guard: OwnershipGuard,
}

impl std::fmt::Debug for ContainerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerManager")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ContainerManager {
    /// Creates a manager enforcing `policy` on `runtime`.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>, policy: Arc<PolicyConfig>) -> Self {
        let validator = RequestValidator::new(Arc::clone(&policy));
        let guard = OwnershipGuard::new(Arc::clone(&runtime), ManagedLabels::from_policy(&policy));
        Self {
            runtime,
            policy,
            validator,
            guard,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    #[must_use]
    pub fn instance_id(&self) -> &str {
        self.policy.instance_id()
    }

    #[must_use]
    pub fn labels(&self) -> &ManagedLabels {
        self.guard.labels()
    }

    /// Returns true if the runtime answers.
    pub async fn ping(&self) -> bool {
        self.runtime.ping().await
    }

    /// Lists managed containers, including stopped ones when `all` is set.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::Runtime` if the runtime query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, all: bool) -> Result<ContainerList, ContainerError> {
        let filter = self.labels().filter();
        let records = self
            .runtime
            .list(&filter, all)
            .await
            .map_err(|source| {
                error!(error = %source, "Failed to list containers");
                ContainerError::Runtime {
                    operation: "list",
                    id: None,
                    source,
                }
            })?;
        debug!(count = records.len(), "Listed managed containers");
        Ok(ContainerList::from(records))
    }

    /// Validates, tags and creates a container. The container is not started.
    ///
    /// `raw` is the unfiltered request payload scanned for dangerous options.
    /// Nothing reaches the runtime unless validation succeeds.
    ///
    /// # Errors
    ///
    /// - `ContainerError::Rejected` if the request fails validation
    /// - `ContainerError::ImageNotFound` if the runtime lacks the image
    /// - `ContainerError::Runtime` if the runtime fails otherwise
    #[instrument(skip_all, fields(image = %request.image))]
    pub async fn create(
        &self,
        request: &CreateRequest,
        raw: Option<&Map<String, Value>>,
    ) -> Result<CreatedContainer, ContainerError> {
        self.validator.validate(request, raw)?;

        let labels = self.labels().tag(request.labels.as_ref());
        let created = match self.runtime.create(request, labels).await {
            Ok(created) => created,
            Err(RuntimeError::ImageNotFound(image)) => {
                return Err(ContainerError::ImageNotFound { image });
            }
            Err(source) => {
                error!(error = %source, "Failed to create container");
                return Err(ContainerError::Runtime {
                    operation: "create",
                    id: None,
                    source,
                });
            }
        };

        info!(container_id = %created.id, name = %created.name, "Container created");
        Ok(created)
    }

    /// Resolves `id` to a managed container record.
    ///
    /// # Errors
    ///
    /// See [`OwnershipGuard::authorize`].
    pub async fn guard(&self, id: &str) -> Result<ResourceRecord, ContainerError> {
        self.guard.authorize(id).await
    }

    /// Returns the current record of a managed container.
    ///
    /// # Errors
    ///
    /// See [`OwnershipGuard::authorize`].
    pub async fn inspect(&self, id: &str) -> Result<ResourceRecord, ContainerError> {
        self.guard(id).await
    }

    /// # Errors
    ///
    /// Guard errors, or `ContainerError::Runtime` if the runtime fails.
    #[instrument(skip(self), fields(container_id = %id))]
    pub async fn start(&self, id: &str) -> Result<(), ContainerError> {
        let record = self.guard(id).await?;
        self.runtime
            .start(&record.id)
            .await
            .map_err(|e| runtime_failure("start", id, e))?;
        info!("Container started");
        Ok(())
    }

    /// # Errors
    ///
    /// Guard errors, or `ContainerError::Runtime` if the runtime fails.
    #[instrument(skip(self), fields(container_id = %id))]
    pub async fn stop(&self, id: &str, timeout_secs: u32) -> Result<(), ContainerError> {
        let record = self.guard(id).await?;
        self.runtime
            .stop(&record.id, timeout_secs)
            .await
            .map_err(|e| runtime_failure("stop", id, e))?;
        info!("Container stopped");
        Ok(())
    }

    /// # Errors
    ///
    /// Guard errors, or `ContainerError::Runtime` if the runtime fails.
    #[instrument(skip(self), fields(container_id = %id))]
    pub async fn restart(&self, id: &str, timeout_secs: u32) -> Result<(), ContainerError> {
        let record = self.guard(id).await?;
        self.runtime
            .restart(&record.id, timeout_secs)
            .await
            .map_err(|e| runtime_failure("restart", id, e))?;
        info!("Container restarted");
        Ok(())
    }

    /// # Errors
    ///
    /// Guard errors, or `ContainerError::Runtime` if the runtime fails.
    #[instrument(skip(self), fields(container_id = %id))]
    pub async fn remove(&self, id: &str, options: RemoveOptions) -> Result<(), ContainerError> {
        let record = self.guard(id).await?;
        self.runtime
            .remove(&record.id, options)
            .await
            .map_err(|e| runtime_failure("remove", id, e))?;
        info!("Container removed");
        Ok(())
    }

    /// Fetches logs, replacing undecodable bytes.
    ///
    /// # Errors
    ///
    /// Guard errors, or `ContainerError::Runtime` if the runtime fails.
    #[instrument(skip(self, options), fields(container_id = %id))]
    pub async fn logs(
        &self,
        id: &str,
        options: &LogOptions,
    ) -> Result<ContainerLogs, ContainerError> {
        let record = self.guard(id).await?;
        let bytes = self
            .runtime
            .logs(&record.id, options)
            .await
            .map_err(|e| runtime_failure("get logs for", id, e))?;
        Ok(ContainerLogs {
            logs: decode_logs(&bytes),
            container_id: record.id,
        })
    }

    /// Samples resource usage once.
    ///
    /// # Errors
    ///
    /// Guard errors, or `ContainerError::Runtime` if the runtime fails.
    #[instrument(skip(self), fields(container_id = %id))]
    pub async fn stats(&self, id: &str) -> Result<ContainerStats, ContainerError> {
        let record = self.guard(id).await?;
        let snapshot = self
            .runtime
            .stats(&record.id)
            .await
            .map_err(|e| runtime_failure("get stats for", id, e))?;
        Ok(ContainerStats::from_snapshot(record.id, &snapshot))
    }
}

fn runtime_failure(operation: &'static str, id: &str, source: RuntimeError) -> ContainerError {
    error!(operation, container_id = %id, error = %source, "Runtime operation failed");
    ContainerError::runtime(operation, id, source)
}
