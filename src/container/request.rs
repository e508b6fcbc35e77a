//! Typed container creation request.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::security::DANGEROUS_OPTION_KEYS;

/// Request body for creating a container.
///
/// Only the fields below are accepted. Options that grant host access
/// (`privileged`, `network_mode`, `cap_add`, ...) are not part of this model;
/// they are read from the raw payload by the validator instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRequest {
    /// Image reference, e.g. `nginx:1.25`.
    pub image: String,
    pub name: Option<String>,
    pub command: Option<CommandLine>,
    pub entrypoint: Option<CommandLine>,
    pub environment: Option<BTreeMap<String, String>>,
    /// Container port (`80/tcp`) to host binding(s).
    pub ports: Option<BTreeMap<String, PortSpec>>,
    /// Host path to container binding.
    pub volumes: Option<BTreeMap<String, VolumeBinding>>,
    pub labels: Option<HashMap<String, String>>,
    pub restart_policy: Option<RestartPolicy>,
    pub working_dir: Option<String>,
    pub user: Option<String>,
    pub hostname: Option<String>,
    /// Network to attach the container to.
    pub network: Option<String>,
    pub mem_limit: Option<MemoryLimit>,
    /// CPU CFS period in microseconds.
    pub cpu_period: Option<i64>,
    /// CPU CFS quota in microseconds.
    pub cpu_quota: Option<i64>,
}

impl CreateRequest {
    /// Creates a request for the given image with every other field unset.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// Parses the typed request out of a raw JSON payload.
    ///
    /// Dangerous option keys are skipped here so that the validator can
    /// reject them with a precise reason; any other unknown key fails the parse.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the remaining payload does not fit the model.
    pub fn from_payload(raw: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let typed: Map<String, Value> = raw
            .iter()
            .filter(|(key, _)| !DANGEROUS_OPTION_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        serde_json::from_value(Value::Object(typed))
    }
}

/// A command or entrypoint, already split into argv form.
///
/// Accepts either a list of arguments or a single string that is split with
/// shell quoting rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CommandRepr")]
pub struct CommandLine(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum CommandRepr {
    Shell(String),
    Exec(Vec<String>),
}

impl TryFrom<CommandRepr> for CommandLine {
    type Error = String;

    fn try_from(repr: CommandRepr) -> Result<Self, Self::Error> {
        match repr {
            CommandRepr::Exec(args) => Ok(Self(args)),
            CommandRepr::Shell(line) => shlex::split(&line)
                .map(Self)
                .ok_or_else(|| format!("unbalanced quoting in command: {line}")),
        }
    }
}

/// Host side of a port mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    /// `{"80/tcp": 8080}`
    HostPort(u16),
    /// `{"80/tcp": {"host_ip": "127.0.0.1", "host_port": 8080}}`
    Binding(PortBinding),
    /// `{"80/tcp": [{"host_port": 8080}, {"host_port": 8081}]}`
    Bindings(Vec<PortBinding>),
}

impl PortSpec {
    /// Flattens this mapping into the host bindings it describes.
    #[must_use]
    pub fn bindings(&self) -> Vec<PortBinding> {
        match self {
            Self::HostPort(port) => vec![PortBinding::new(*port)],
            Self::Binding(binding) => vec![binding.clone()],
            Self::Bindings(bindings) => bindings.clone(),
        }
    }
}

/// One host address/port pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortBinding {
    #[serde(default = "default_host_ip")]
    pub host_ip: String,
    pub host_port: u16,
}

fn default_host_ip() -> String {
    String::from("0.0.0.0")
}

impl PortBinding {
    /// Binds `port` on all host interfaces.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            host_ip: default_host_ip(),
            host_port: port,
        }
    }
}

/// Access mode of a bind mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountMode {
    Ro,
    #[default]
    Rw,
}

impl std::fmt::Display for MountMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ro => write!(f, "ro"),
            Self::Rw => write!(f, "rw"),
        }
    }
}

/// Container side of a bind mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeBinding {
    /// Mount point inside the container.
    pub bind: String,
    #[serde(default)]
    pub mode: MountMode,
}

/// Restart policy name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicyName {
    #[default]
    No,
    Always,
    OnFailure,
    UnlessStopped,
}

/// Restart policy of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestartPolicy {
    #[serde(default)]
    pub name: RestartPolicyName,
    #[serde(default)]
    pub maximum_retry_count: i64,
}

/// Memory limit in bytes.
///
/// Deserializes from an integer byte count or a string with an optional
/// `b`, `k`, `m` or `g` unit (`"512m"`, `"1g"`, `"64kb"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MemoryRepr")]
pub struct MemoryLimit(pub i64);

#[derive(Deserialize)]
#[serde(untagged)]
enum MemoryRepr {
    Bytes(i64),
    Text(String),
}

impl TryFrom<MemoryRepr> for MemoryLimit {
    type Error = String;

    fn try_from(repr: MemoryRepr) -> Result<Self, Self::Error> {
        let bytes = match repr {
            MemoryRepr::Bytes(bytes) => Some(bytes),
            MemoryRepr::Text(text) => parse_memory(&text),
        };
        match bytes {
            Some(bytes) if bytes >= 0 => Ok(Self(bytes)),
            _ => Err(String::from(
                "invalid mem_limit: expected bytes or a number with unit b, k, m or g",
            )),
        }
    }
}

fn parse_memory(text: &str) -> Option<i64> {
    let lower = text.trim().to_ascii_lowercase();
    let unit_start = lower
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lower.len());
    let (digits, unit) = lower.split_at(unit_start);
    let value: i64 = digits.parse().ok()?;
    let multiplier: i64 = match unit {
        "" | "b" => 1,
        "k" | "kb" => 1024,
        "m" | "mb" => 1024 * 1024,
        "g" | "gb" => 1024 * 1024 * 1024,
        _ => return None,
    };
    value.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_minimal_request() {
        let request = CreateRequest::from_payload(&payload(json!({"image": "redis"})))
            .expect("minimal request should parse");
        assert_eq!(request, CreateRequest::new("redis"));
    }

    #[test]
    fn test_full_request() {
        let request = CreateRequest::from_payload(&payload(json!({
            "image": "nginx:1.25",
            "name": "web",
            "command": "nginx -g 'daemon off;'",
            "entrypoint": ["/docker-entrypoint.sh"],
            "environment": {"A": "1"},
            "ports": {
                "80/tcp": 8080,
                "443/tcp": {"host_ip": "127.0.0.1", "host_port": 8443},
                "9000/udp": [{"host_port": 9000}, {"host_port": 9001}]
            },
            "volumes": {"/srv/data": {"bind": "/data", "mode": "ro"}},
            "labels": {"team": "web"},
            "restart_policy": {"name": "on-failure", "maximum_retry_count": 3},
            "mem_limit": "512m",
            "cpu_period": 100000,
            "cpu_quota": 50000
        })))
        .expect("full request should parse");

        assert_eq!(
            request.command,
            Some(CommandLine(vec![
                "nginx".into(),
                "-g".into(),
                "daemon off;".into()
            ]))
        );
        let ports = request.ports.expect("ports");
        assert_eq!(ports["80/tcp"].bindings(), vec![PortBinding::new(8080)]);
        assert_eq!(ports["443/tcp"].bindings()[0].host_ip, "127.0.0.1");
        assert_eq!(ports["9000/udp"].bindings().len(), 2);
        let volumes = request.volumes.expect("volumes");
        assert_eq!(volumes["/srv/data"].mode, MountMode::Ro);
        assert_eq!(
            request.restart_policy.map(|p| p.name),
            Some(RestartPolicyName::OnFailure)
        );
        assert_eq!(request.mem_limit, Some(MemoryLimit(512 * 1024 * 1024)));
    }

    #[test]
    fn test_dangerous_keys_are_left_to_validator() {
        let request = CreateRequest::from_payload(&payload(json!({
            "image": "redis",
            "privileged": true,
            "cap_add": ["NET_ADMIN"]
        })));
        assert!(request.is_ok(), "dangerous keys must not fail the parse");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = CreateRequest::from_payload(&payload(json!({
            "image": "redis",
            "shm_size": "1g"
        })));
        assert!(result.is_err());
    }

    #[test]
    fn test_volume_mode_defaults_to_rw() {
        let request = CreateRequest::from_payload(&payload(json!({
            "image": "redis",
            "volumes": {"/srv": {"bind": "/data"}}
        })))
        .expect("request should parse");
        let volumes = request.volumes.expect("volumes");
        assert_eq!(volumes["/srv"].mode, MountMode::Rw);
    }

    #[test]
    fn test_memory_limit_parsing() {
        assert_eq!(parse_memory("1024"), Some(1024));
        assert_eq!(parse_memory("64k"), Some(64 * 1024));
        assert_eq!(parse_memory("64KB"), Some(64 * 1024));
        assert_eq!(parse_memory("2g"), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_memory("12x"), None);
        assert_eq!(parse_memory("m"), None);
        assert_eq!(parse_memory("99999999999999g"), None);
    }

    #[test]
    fn test_unbalanced_command_rejected() {
        let result = CreateRequest::from_payload(&payload(json!({
            "image": "redis",
            "command": "echo 'oops"
        })));
        assert!(result.is_err());
    }
}
