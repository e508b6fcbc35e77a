//! Process configuration from command-line flags and environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::policy::{DEFAULT_BLOCKED_VOLUME_PATHS, DEFAULT_LABEL_PREFIX, PolicyConfig};

/// Guarded Docker API - restricted container management over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Settings {
    /// Address to listen on
    #[arg(long, env = "GUARDED_DOCKER_API_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Identifier of this instance, stamped onto created containers (random if unset)
    #[arg(long, env = "GUARDED_DOCKER_API_INSTANCE_ID")]
    pub instance_id: Option<String>,

    /// Prefix of the ownership label keys
    #[arg(long, env = "GUARDED_DOCKER_API_LABEL_PREFIX", default_value = DEFAULT_LABEL_PREFIX)]
    pub label_prefix: String,

    /// Images that may be created, comma separated (empty allows every image)
    #[arg(long, env = "GUARDED_DOCKER_API_ALLOWED_IMAGES", value_delimiter = ',')]
    pub allowed_images: Vec<String>,

    /// Host paths that may not be bind-mounted, comma separated
    #[arg(
        long,
        env = "GUARDED_DOCKER_API_BLOCKED_VOLUME_PATHS",
        value_delimiter = ',',
        default_values = DEFAULT_BLOCKED_VOLUME_PATHS
    )]
    pub blocked_volume_paths: Vec<String>,

    /// Capabilities that may be added, comma separated (empty allows none)
    #[arg(long, env = "GUARDED_DOCKER_API_ALLOWED_CAPABILITIES", value_delimiter = ',')]
    pub allowed_capabilities: Vec<String>,

    /// Origins allowed to call the API from a browser, comma separated (* allows any)
    #[arg(
        long,
        env = "GUARDED_DOCKER_API_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,

    /// Skip startup checks (policy sanity and Docker reachability)
    #[arg(long, default_value = "false")]
    pub skip_checks: bool,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,
}

impl Settings {
    /// Builds the immutable policy from these settings.
    #[must_use]
    pub fn policy(&self) -> PolicyConfig {
        let mut policy = PolicyConfig::new()
            .with_label_prefix(self.label_prefix.trim())
            .with_allowed_images(non_empty(&self.allowed_images))
            .with_blocked_volume_paths(non_empty(&self.blocked_volume_paths).map(PathBuf::from))
            .with_allowed_capabilities(&self.allowed_capabilities);

        if let Some(id) = &self.instance_id {
            policy = policy.with_instance_id(id.trim());
        }
        policy
    }
}

fn non_empty(values: &[String]) -> impl Iterator<Item = String> + '_ {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}
