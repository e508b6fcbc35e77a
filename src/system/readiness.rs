//! Startup readiness checks.

use tracing::{debug, warn};

use crate::error::StartupError;
use crate::policy::PolicyConfig;
use crate::runtime::ContainerRuntime;

/// Results of all startup checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readiness {
    /// Instance id stamped onto created containers
    pub instance_id: String,
    /// Label key marking managed containers
    pub managed_label: String,
    /// Number of configured protected host paths
    pub blocked_paths: usize,
    /// Whether the image allow-list restricts anything
    pub images_restricted: bool,
}

/// Check the policy, then ping the runtime.
///
/// Returns the first failing check as an error.
pub async fn check_all(
    runtime: &dyn ContainerRuntime,
    policy: &PolicyConfig,
) -> Result<Readiness, StartupError> {
    check_policy(policy)?;
    check_runtime(runtime).await?;

    Ok(Readiness {
        instance_id: policy.instance_id().to_string(),
        managed_label: policy.managed_label_key(),
        blocked_paths: policy.blocked_volume_paths().len(),
        images_restricted: !policy.allowed_images().is_empty(),
    })
}

/// Check that the policy can produce usable ownership labels.
pub fn check_policy(policy: &PolicyConfig) -> Result<(), StartupError> {
    if policy.instance_id().is_empty() {
        return Err(StartupError::InvalidPolicy(
            "instance id must not be empty".to_string(),
        ));
    }

    let prefix = policy.label_prefix();
    if prefix.is_empty() {
        return Err(StartupError::InvalidPolicy(
            "label prefix must not be empty".to_string(),
        ));
    }
    if prefix.chars().any(|c| c.is_whitespace() || c == '=') {
        return Err(StartupError::InvalidPolicy(format!(
            "label prefix '{prefix}' must not contain whitespace or '='"
        )));
    }

    if policy.blocked_volume_paths().is_empty() {
        warn!("No blocked volume paths configured; every host path may be bind-mounted");
    }

    debug!("Policy check passed");
    Ok(())
}

/// Check that the runtime answers a ping.
pub async fn check_runtime(runtime: &dyn ContainerRuntime) -> Result<(), StartupError> {
    if runtime.ping().await {
        debug!("Runtime reachable");
        Ok(())
    } else {
        Err(StartupError::RuntimeUnreachable)
    }
}
