//! Security policy configuration.

use std::collections::BTreeSet;
use std::path::PathBuf;

use uuid::Uuid;

/// Default prefix for the ownership label keys.
pub const DEFAULT_LABEL_PREFIX: &str = "guarded-docker-api";

/// Host paths that may never be bind-mounted, nor contain a bind-mount source.
///
/// `/` is included, so with the defaults every host bind mount is refused and
/// operators opt in by supplying their own blocked set.
pub const DEFAULT_BLOCKED_VOLUME_PATHS: &[&str] = &[
    "/",
    "/etc",
    "/var/run/docker.sock",
    "/var/run",
    "/proc",
    "/sys",
    "/dev",
    "/boot",
    "/root",
    "/home",
];

/// Suffix of the label key marking a container as managed.
const MANAGED_SUFFIX: &str = "managed";

/// Suffix of the label key carrying the creating instance id.
const INSTANCE_SUFFIX: &str = "instance";

/// Returns a fresh random instance id (8 hex characters).
#[must_use]
pub fn generate_instance_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Security configuration consulted by the validator and the ownership guard.
///
/// Built once at startup and shared behind an `Arc`; there are no mutating
/// methods once a value exists, only consuming builders.
///
/// # Example
///
/// ```
/// use guarded_docker_api::policy::PolicyConfig;
///
/// let policy = PolicyConfig::default()
///     .with_instance_id("node-a")
///     .with_allowed_images(["nginx", "redis"])
///     .with_allowed_capabilities(["net_bind_service"]);
///
/// assert_eq!(policy.managed_label_key(), "guarded-docker-api.managed");
/// assert!(policy.allowed_capabilities().contains("NET_BIND_SERVICE"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    allowed_images: BTreeSet<String>,
    blocked_volume_paths: BTreeSet<PathBuf>,
    allowed_capabilities: BTreeSet<String>,
    instance_id: String,
    label_prefix: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_images: BTreeSet::new(),
            blocked_volume_paths: DEFAULT_BLOCKED_VOLUME_PATHS
                .iter()
                .map(PathBuf::from)
                .collect(),
            allowed_capabilities: BTreeSet::new(),
            instance_id: generate_instance_id(),
            label_prefix: String::from(DEFAULT_LABEL_PREFIX),
        }
    }
}

impl PolicyConfig {
    /// Creates a policy with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the instance id stamped onto created containers.
    #[must_use]
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    /// Sets the prefix of the ownership label keys.
    #[must_use]
    pub fn with_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = prefix.into();
        self
    }

    /// Replaces the image allow-list. An empty list allows every image.
    #[must_use]
    pub fn with_allowed_images<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_images = images.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the blocked host path set.
    #[must_use]
    pub fn with_blocked_volume_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.blocked_volume_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one path to the blocked host path set.
    #[must_use]
    pub fn with_blocked_volume_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.blocked_volume_paths.insert(path.into());
        self
    }

    /// Replaces the capability allow-list. An empty list allows no capability.
    ///
    /// Entries are stored upper-cased.
    #[must_use]
    pub fn with_allowed_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_capabilities = capabilities
            .into_iter()
            .map(|c| c.as_ref().trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        self
    }

    /// Image allow-list (empty means every image is allowed).
    #[must_use]
    pub fn allowed_images(&self) -> &BTreeSet<String> {
        &self.allowed_images
    }

    /// Protected host paths, as configured (not yet resolved).
    #[must_use]
    pub fn blocked_volume_paths(&self) -> &BTreeSet<PathBuf> {
        &self.blocked_volume_paths
    }

    /// Capability allow-list (empty means no capability may be added).
    #[must_use]
    pub fn allowed_capabilities(&self) -> &BTreeSet<String> {
        &self.allowed_capabilities
    }

    /// Identifier of this running copy of the service.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Prefix shared by the ownership label keys.
    #[must_use]
    pub fn label_prefix(&self) -> &str {
        &self.label_prefix
    }

    /// Label key marking a container as managed, `<prefix>.managed`.
    #[must_use]
    pub fn managed_label_key(&self) -> String {
        format!("{}.{MANAGED_SUFFIX}", self.label_prefix)
    }

    /// Label key carrying the creating instance id, `<prefix>.instance`.
    #[must_use]
    pub fn instance_label_key(&self) -> String {
        format!("{}.{INSTANCE_SUFFIX}", self.label_prefix)
    }
}
