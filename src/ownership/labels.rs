//! Ownership labels stamped onto created containers.

use std::collections::HashMap;

use crate::policy::PolicyConfig;

/// Value of the managed label on containers this service created.
pub const MANAGED_VALUE: &str = "true";

/// The reserved label pair identifying managed containers.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use guarded_docker_api::ownership::ManagedLabels;
/// use guarded_docker_api::policy::PolicyConfig;
///
/// let labels = ManagedLabels::from_policy(&PolicyConfig::default().with_instance_id("a1"));
/// let mut caller = HashMap::new();
/// caller.insert(labels.managed_key().to_string(), "false".to_string());
///
/// let tagged = labels.tag(Some(&caller));
/// assert!(labels.is_managed(&tagged));
/// assert_eq!(tagged[labels.instance_key()], "a1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedLabels {
    managed_key: String,
    instance_key: String,
    instance_id: String,
}

impl ManagedLabels {
    /// Derives the label keys and instance id from the policy.
    #[must_use]
    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self {
            managed_key: policy.managed_label_key(),
            instance_key: policy.instance_label_key(),
            instance_id: policy.instance_id().to_string(),
        }
    }

    #[must_use]
    pub fn managed_key(&self) -> &str {
        &self.managed_key
    }

    #[must_use]
    pub fn instance_key(&self) -> &str {
        &self.instance_key
    }

    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Merges caller labels with the reserved pair.
    ///
    /// The reserved keys always carry this service's values, whatever the
    /// caller supplied for them.
    #[must_use]
    pub fn tag(&self, caller: Option<&HashMap<String, String>>) -> HashMap<String, String> {
        let mut labels = caller.cloned().unwrap_or_default();
        labels.insert(self.managed_key.clone(), MANAGED_VALUE.to_string());
        labels.insert(self.instance_key.clone(), self.instance_id.clone());
        labels
    }

    /// Returns true iff the managed key is present with value `"true"`.
    ///
    /// The instance id is not consulted: containers created by another
    /// instance sharing the runtime are managed too.
    #[must_use]
    pub fn is_managed(&self, labels: &HashMap<String, String>) -> bool {
        labels.get(&self.managed_key).map(String::as_str) == Some(MANAGED_VALUE)
    }

    /// Runtime label filter selecting managed containers, `<key>=true`.
    #[must_use]
    pub fn filter(&self) -> String {
        format!("{}={MANAGED_VALUE}", self.managed_key)
    }
}
