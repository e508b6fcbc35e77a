//! Runtime-reported container views and facade responses.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of id characters in a short id.
pub const SHORT_ID_LEN: usize = 12;

/// A published host binding as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostBinding {
    #[serde(rename = "HostIp")]
    pub host_ip: String,
    #[serde(rename = "HostPort")]
    pub host_port: String,
}

/// Current state of a container, read from the runtime.
///
/// Never cached: every inspect produces a fresh record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub short_id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub created: DateTime<Utc>,
    /// Container port to published bindings; ports without bindings are omitted.
    pub ports: BTreeMap<String, Vec<HostBinding>>,
    pub labels: HashMap<String, String>,
}

impl ResourceRecord {
    /// Creates a record with the given id and empty state.
    ///
    /// The short id is derived from `id` and the creation time is now.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            short_id: short_id(&id),
            id,
            name: String::new(),
            image: String::new(),
            status: String::new(),
            created: Utc::now(),
            ports: BTreeMap::new(),
            labels: HashMap::new(),
        }
    }

    /// Sets the container name, dropping the runtime's leading `/`.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.trim_start_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Sets the creation time from an RFC 3339 timestamp.
    ///
    /// Unparseable timestamps keep the current value.
    #[must_use]
    pub fn with_created(mut self, created: &str) -> Self {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(created) {
            self.created = parsed.with_timezone(&Utc);
        }
        self
    }

    #[must_use]
    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    /// Adds published bindings for a container port; empty lists are ignored.
    #[must_use]
    pub fn with_port(mut self, port: impl Into<String>, bindings: Vec<HostBinding>) -> Self {
        if !bindings.is_empty() {
            self.ports.insert(port.into(), bindings);
        }
        self
    }
}

/// Returns the first [`SHORT_ID_LEN`] characters of a container id.
#[must_use]
pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedContainer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Managed containers visible to this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerList {
    pub containers: Vec<ResourceRecord>,
    pub count: usize,
}

impl From<Vec<ResourceRecord>> for ContainerList {
    fn from(containers: Vec<ResourceRecord>) -> Self {
        Self {
            count: containers.len(),
            containers,
        }
    }
}

/// Decoded log output of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLogs {
    pub logs: String,
    pub container_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = ResourceRecord::new("0123456789abcdef0123")
            .with_name("/web")
            .with_image("nginx:1.25")
            .with_status("running")
            .with_created("2024-05-01T10:20:30.123456789Z")
            .with_port("80/tcp", vec![HostBinding {
                host_ip: "0.0.0.0".into(),
                host_port: "8080".into(),
            }])
            .with_port("443/tcp", Vec::new());

        assert_eq!(record.short_id, "0123456789ab");
        assert_eq!(record.name, "web");
        assert_eq!(record.created.to_rfc3339(), "2024-05-01T10:20:30.123456789+00:00");
        assert_eq!(record.ports.len(), 1);
        assert!(!record.ports.contains_key("443/tcp"));
    }

    #[test]
    fn test_unparseable_created_keeps_now() {
        let before = Utc::now();
        let record = ResourceRecord::new("abc").with_created("yesterday");
        assert!(record.created >= before);
    }

    #[test]
    fn test_short_id_of_short_input() {
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_ports_serialize_with_runtime_keys() {
        let binding = HostBinding {
            host_ip: "127.0.0.1".into(),
            host_port: "8080".into(),
        };
        let json = serde_json::to_value(&binding).expect("serialize");
        assert_eq!(json["HostIp"], "127.0.0.1");
        assert_eq!(json["HostPort"], "8080");
    }

    #[test]
    fn test_list_counts_entries() {
        let list = ContainerList::from(vec![ResourceRecord::new("a"), ResourceRecord::new("b")]);
        assert_eq!(list.count, 2);
    }
}
