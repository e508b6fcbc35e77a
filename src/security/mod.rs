//! Request validation for container creation.
//!
//! [`RequestValidator`] decides whether a creation request is safe to forward
//! to the runtime. It is a pure function of the request, the raw payload and
//! the [`PolicyConfig`]: no side effects, no runtime calls.
//!
//! # Check Order
//!
//! Checks run in a fixed order and the first failure is returned:
//!
//! 1. Image allow-list
//! 2. Volume host path containment
//! 3. Dangerous raw options (`privileged`, host namespaces, devices, ...)
//! 4. Capability allow-list
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use guarded_docker_api::container::CreateRequest;
//! use guarded_docker_api::policy::PolicyConfig;
//! use guarded_docker_api::security::RequestValidator;
//!
//! let policy = Arc::new(PolicyConfig::default().with_allowed_images(["nginx"]));
//! let validator = RequestValidator::new(policy);
//!
//! assert!(validator.validate(&CreateRequest::new("nginx:1.25"), None).is_ok());
//! assert!(validator.validate(&CreateRequest::new("nginx2"), None).is_err());
//! ```

mod image;
mod options;
mod volumes;

pub use image::{check_image, is_image_allowed};
pub use options::{DANGEROUS_OPTION_KEYS, check_capabilities, check_dangerous_options};
pub use volumes::{check_host_path, resolve_host_path};

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::container::CreateRequest;
use crate::error::Rejection;
use crate::policy::PolicyConfig;

/// Validates creation requests against the security policy.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    policy: Arc<PolicyConfig>,
}

impl RequestValidator {
    /// Creates a validator reading the given policy.
    #[must_use]
    pub fn new(policy: Arc<PolicyConfig>) -> Self {
        Self { policy }
    }

    /// The policy this validator enforces.
    #[must_use]
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Validates a request, returning the first applicable rejection.
    ///
    /// `raw` is the unfiltered payload the request was parsed from; when it is
    /// absent only the typed checks (image, volumes) run.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] of the first failing check.
    #[instrument(skip_all, fields(image = %request.image))]
    pub fn validate(
        &self,
        request: &CreateRequest,
        raw: Option<&Map<String, Value>>,
    ) -> Result<(), Rejection> {
        let result = self.run_checks(request, raw);
        match &result {
            Ok(()) => debug!("Create request accepted"),
            Err(rejection) => warn!(code = rejection.code(), %rejection, "Create request rejected"),
        }
        result
    }

    fn run_checks(
        &self,
        request: &CreateRequest,
        raw: Option<&Map<String, Value>>,
    ) -> Result<(), Rejection> {
        check_image(&request.image, self.policy.allowed_images())?;

        if let Some(volumes) = &request.volumes {
            for host_path in volumes.keys() {
                check_host_path(host_path, self.policy.blocked_volume_paths())?;
            }
        }

        if let Some(raw) = raw {
            check_dangerous_options(raw)?;
            check_capabilities(raw, self.policy.allowed_capabilities())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{MountMode, VolumeBinding};
    use serde_json::json;

    fn validator(policy: PolicyConfig) -> RequestValidator {
        RequestValidator::new(Arc::new(policy))
    }

    fn with_volume(image: &str, host: &str) -> CreateRequest {
        let mut request = CreateRequest::new(image);
        request.volumes = Some(
            [(host.to_string(), VolumeBinding {
                bind: "/data".into(),
                mode: MountMode::Rw,
            })]
            .into_iter()
            .collect(),
        );
        request
    }

    #[test]
    fn test_image_checked_before_volumes() {
        let v = validator(PolicyConfig::default().with_allowed_images(["nginx"]));
        let err = v
            .validate(&with_volume("busybox", "/"), None)
            .expect_err("should reject");
        assert_eq!(err.code(), "image-not-allowed");
    }

    #[test]
    fn test_volumes_checked_before_raw_options() {
        let v = validator(PolicyConfig::default());
        let raw = json!({"privileged": true});
        let err = v
            .validate(&with_volume("redis", "/etc"), raw.as_object())
            .expect_err("should reject");
        assert_eq!(err.code(), "volume-path-blocked");
    }

    #[test]
    fn test_raw_options_checked_before_capabilities() {
        let v = validator(PolicyConfig::default());
        let raw = json!({"cap_add": ["NET_ADMIN"], "devices": ["/dev/kvm"]});
        let err = v
            .validate(&CreateRequest::new("redis"), raw.as_object())
            .expect_err("should reject");
        assert_eq!(err.code(), "dangerous-option-used");
    }

    #[test]
    fn test_without_raw_payload_only_typed_checks_run() {
        let v = validator(PolicyConfig::default());
        assert!(v.validate(&CreateRequest::new("redis"), None).is_ok());
    }

    #[test]
    fn test_validation_is_repeatable() {
        let v = validator(PolicyConfig::default());
        let request = with_volume("redis", "/");
        let first = v.validate(&request, None);
        let second = v.validate(&request, None);
        assert_eq!(first, second);
    }
}
