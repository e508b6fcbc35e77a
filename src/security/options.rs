//! Checks on raw payload options that grant host access.
//!
//! These keys are not part of the typed request model, so they are inspected
//! on the raw JSON payload where they cannot be silently dropped.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::Rejection;

/// Raw payload keys handled by this module rather than the typed model.
pub const DANGEROUS_OPTION_KEYS: &[&str] = &[
    "privileged",
    "network_mode",
    "pid_mode",
    "ipc_mode",
    "cap_add",
    "devices",
    "security_opt",
    "sysctls",
];

const HOST_MODE: &str = "host";
const CONTAINER_MODE_PREFIX: &str = "container:";
const CONTAINER_NETWORK_MESSAGE: &str = "Network mode 'container' is not allowed";

/// Scans the raw payload for options that must never be honored.
///
/// Checks run in a fixed order and stop at the first hit.
///
/// # Errors
///
/// Returns `Rejection::DangerousOption` naming the offending option.
pub fn check_dangerous_options(raw: &Map<String, Value>) -> Result<(), Rejection> {
    if raw.get("privileged") == Some(&Value::Bool(true)) {
        return Err(dangerous("privileged", "Privileged mode is not allowed"));
    }
    if is_host(raw.get("network_mode")) {
        return Err(dangerous("network_mode", "Network mode 'host' is not allowed"));
    }
    // The typed `network` field ends up as the container's network mode.
    if is_host(raw.get("network")) {
        return Err(dangerous("network", "Network mode 'host' is not allowed"));
    }
    // `container:<id>` joins another container's namespace, managed or not.
    for key in ["network_mode", "network"] {
        if is_container_mode(raw.get(key)) {
            return Err(dangerous(key, CONTAINER_NETWORK_MESSAGE));
        }
    }
    if is_host(raw.get("pid_mode")) {
        return Err(dangerous("pid_mode", "PID mode 'host' is not allowed"));
    }
    if is_host(raw.get("ipc_mode")) {
        return Err(dangerous("ipc_mode", "IPC mode 'host' is not allowed"));
    }
    if raw.get("devices").is_some_and(is_truthy) {
        return Err(dangerous("devices", "Device mappings are not allowed"));
    }
    if raw.get("security_opt").is_some_and(is_truthy) {
        return Err(dangerous("security_opt", "Security options are not allowed"));
    }
    if raw.get("sysctls").is_some_and(is_truthy) {
        return Err(dangerous("sysctls", "Sysctl settings are not allowed"));
    }
    Ok(())
}

/// Checks requested capability additions against the allow-list.
///
/// With an empty allow-list any addition is refused outright; otherwise each
/// requested capability, upper-cased, must be listed.
///
/// # Errors
///
/// Returns `Rejection::CapabilityNotAllowed`.
pub fn check_capabilities(
    raw: &Map<String, Value>,
    allowed: &BTreeSet<String>,
) -> Result<(), Rejection> {
    let Some(requested) = raw.get("cap_add").filter(|v| is_truthy(v)) else {
        return Ok(());
    };

    if allowed.is_empty() {
        return Err(Rejection::CapabilityNotAllowed { capability: None });
    }

    let entries: Vec<&Value> = match requested {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    for entry in entries {
        let capability = match entry {
            Value::String(name) => name.clone(),
            other => other.to_string(),
        };
        let allowed_here = matches!(entry, Value::String(_))
            && allowed.contains(&capability.to_uppercase());
        if !allowed_here {
            return Err(Rejection::CapabilityNotAllowed {
                capability: Some(capability),
            });
        }
    }

    Ok(())
}

fn dangerous(option: &'static str, message: &'static str) -> Rejection {
    Rejection::DangerousOption { option, message }
}

fn is_host(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(mode)) if mode == HOST_MODE)
}

fn is_container_mode(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(mode)) if mode.starts_with(CONTAINER_MODE_PREFIX))
}

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
