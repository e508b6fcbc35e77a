//! Docker engine adapter built on bollard.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions, LogsOptions,
    RemoveContainerOptions, RestartContainerOptions, StartContainerOptions, Stats, StatsOptions,
    StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::models::{
    ContainerInspectResponse, HostConfig, PortBinding as DockerPortBinding, PortMap,
    RestartPolicy as DockerRestartPolicy, RestartPolicyNameEnum,
};
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, instrument, trace, warn};

use super::{ContainerRuntime, LogOptions, RemoveOptions};
use crate::container::{
    CreateRequest, CreatedContainer, HostBinding, InterfaceCounters, ResourceRecord,
    RestartPolicyName, StatsSnapshot,
};
use crate::error::RuntimeError;

/// [`ContainerRuntime`] backed by a Docker engine.
///
/// The underlying client is a pooled HTTP connection and can be shared freely.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects using the local defaults (`DOCKER_HOST` or the platform socket).
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Connection` if the client cannot be configured.
    pub fn connect() -> Result<Self, RuntimeError> {
        Docker::connect_with_local_defaults()
            .map(Self::new)
            .map_err(|e| RuntimeError::Connection(e.to_string()))
    }

    /// Wraps an existing bollard client.
    #[must_use]
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> bool {
        match self.docker.ping().await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Docker ping failed");
                false
            }
        }
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        label_filter: &str,
        all: bool,
    ) -> Result<Vec<ResourceRecord>, RuntimeError> {
        let mut filters = HashMap::new();
        filters.insert(String::from("label"), vec![label_filter.to_string()]);

        let summaries = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all,
                filters,
                ..Default::default()
            }))
            .await
            .map_err(|e| map_error(e, None))?;

        let mut records = Vec::with_capacity(summaries.len());
        for id in summaries.into_iter().filter_map(|s| s.id) {
            match self.inspect(&id).await {
                Ok(record) => records.push(record),
                // Removed between list and inspect.
                Err(RuntimeError::ContainerNotFound(_)) => {
                    trace!(container_id = %id, "Container vanished during listing");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    #[instrument(skip_all, fields(image = %request.image))]
    async fn create(
        &self,
        request: &CreateRequest,
        labels: HashMap<String, String>,
    ) -> Result<CreatedContainer, RuntimeError> {
        let options = request.name.clone().map(|name| CreateContainerOptions {
            name,
            platform: None,
        });
        let config = container_config(request, labels);

        let response = self
            .docker
            .create_container(options, config)
            .await
            .map_err(|e| match e {
                DockerError::DockerResponseServerError {
                    status_code: 404, ..
                } => RuntimeError::ImageNotFound(request.image.clone()),
                other => map_error(other, None),
            })?;
        debug!(container_id = %response.id, "Docker container created");

        let name = match self.inspect(&response.id).await {
            Ok(record) => record.name,
            Err(e) => {
                warn!(error = %e, "Could not read back created container name");
                request.name.clone().unwrap_or_default()
            }
        };

        Ok(CreatedContainer {
            id: response.id,
            name,
            warnings: response.warnings,
        })
    }

    #[instrument(skip(self))]
    async fn inspect(&self, id: &str) -> Result<ResourceRecord, RuntimeError> {
        self.docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map(|response| record_from_inspect(id, response))
            .map_err(|e| map_error(e, Some(id)))
    }

    #[instrument(skip(self))]
    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_error(e, Some(id)))
    }

    #[instrument(skip(self))]
    async fn stop(&self, id: &str, timeout_secs: u32) -> Result<(), RuntimeError> {
        self.docker
            .stop_container(id, Some(StopContainerOptions {
                t: i64::from(timeout_secs),
            }))
            .await
            .map_err(|e| map_error(e, Some(id)))
    }

    #[instrument(skip(self))]
    async fn restart(&self, id: &str, timeout_secs: u32) -> Result<(), RuntimeError> {
        self.docker
            .restart_container(id, Some(RestartContainerOptions {
                t: timeout_secs as isize,
            }))
            .await
            .map_err(|e| map_error(e, Some(id)))
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: &str, options: RemoveOptions) -> Result<(), RuntimeError> {
        self.docker
            .remove_container(id, Some(RemoveContainerOptions {
                v: options.volumes,
                force: options.force,
                link: false,
            }))
            .await
            .map_err(|e| map_error(e, Some(id)))
    }

    #[instrument(skip(self))]
    async fn logs(&self, id: &str, options: &LogOptions) -> Result<Vec<u8>, RuntimeError> {
        let options = LogsOptions::<String> {
            follow: false,
            stdout: options.stdout,
            stderr: options.stderr,
            since: options.since.unwrap_or(0),
            until: options.until.unwrap_or(0),
            timestamps: false,
            tail: options.tail.to_string(),
        };

        let chunks: Vec<_> = self
            .docker
            .logs(id, Some(options))
            .try_collect()
            .await
            .map_err(|e| map_error(e, Some(id)))?;

        Ok(chunks
            .into_iter()
            .flat_map(|chunk| chunk.into_bytes())
            .collect())
    }

    #[instrument(skip(self))]
    async fn stats(&self, id: &str) -> Result<StatsSnapshot, RuntimeError> {
        let mut stream = Box::pin(self.docker.stats(
            id,
            Some(StatsOptions {
                stream: false,
                one_shot: false,
            }),
        ));
        match stream.next().await {
            Some(Ok(stats)) => Ok(snapshot_from_stats(&stats)),
            Some(Err(e)) => Err(map_error(e, Some(id))),
            None => Err(RuntimeError::Api(format!("no stats sample for {id}"))),
        }
    }
}

/// Translates a bollard error, treating 404 on a container operation as not found.
fn map_error(error: DockerError, id: Option<&str>) -> RuntimeError {
    match (error, id) {
        (
            DockerError::DockerResponseServerError {
                status_code: 404, ..
            },
            Some(id),
        ) => RuntimeError::ContainerNotFound(id.to_string()),
        (
            DockerError::DockerResponseServerError {
                status_code,
                message,
            },
            _,
        ) => RuntimeError::Api(format!("{status_code}: {message}")),
        (other, _) => RuntimeError::Connection(other.to_string()),
    }
}

/// Builds the engine create configuration for a validated request.
fn container_config(request: &CreateRequest, labels: HashMap<String, String>) -> Config<String> {
    let env = request.environment.as_ref().map(|vars| {
        vars.iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    });

    let (exposed_ports, port_bindings) = match &request.ports {
        Some(ports) => {
            let mut exposed = HashMap::new();
            let mut bindings: PortMap = HashMap::new();
            for (container_port, spec) in ports {
                exposed.insert(container_port.clone(), HashMap::new());
                let host = spec
                    .bindings()
                    .into_iter()
                    .map(|b| DockerPortBinding {
                        host_ip: Some(b.host_ip),
                        host_port: Some(b.host_port.to_string()),
                    })
                    .collect();
                bindings.insert(container_port.clone(), Some(host));
            }
            (Some(exposed), Some(bindings))
        }
        None => (None, None),
    };

    let binds = request.volumes.as_ref().map(|volumes| {
        volumes
            .iter()
            .map(|(host, binding)| format!("{host}:{}:{}", binding.bind, binding.mode))
            .collect()
    });

    let restart_policy = request
        .restart_policy
        .as_ref()
        .map(|policy| DockerRestartPolicy {
            name: Some(match policy.name {
                RestartPolicyName::No => RestartPolicyNameEnum::NO,
                RestartPolicyName::Always => RestartPolicyNameEnum::ALWAYS,
                RestartPolicyName::OnFailure => RestartPolicyNameEnum::ON_FAILURE,
                RestartPolicyName::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
            }),
            maximum_retry_count: Some(policy.maximum_retry_count),
        });

    let host_config = HostConfig {
        binds,
        port_bindings,
        restart_policy,
        network_mode: request.network.clone(),
        memory: request.mem_limit.map(|m| m.0),
        cpu_period: request.cpu_period,
        cpu_quota: request.cpu_quota,
        ..Default::default()
    };

    Config {
        image: Some(request.image.clone()),
        cmd: request.command.as_ref().map(|c| c.0.clone()),
        entrypoint: request.entrypoint.as_ref().map(|c| c.0.clone()),
        env,
        labels: Some(labels),
        exposed_ports,
        working_dir: request.working_dir.clone(),
        user: request.user.clone(),
        hostname: request.hostname.clone(),
        host_config: Some(host_config),
        ..Default::default()
    }
}

fn record_from_inspect(requested_id: &str, response: ContainerInspectResponse) -> ResourceRecord {
    let id = response.id.unwrap_or_else(|| requested_id.to_string());
    let config = response.config.unwrap_or_default();
    let status = response
        .state
        .and_then(|state| state.status)
        .map(|status| status.to_string())
        .unwrap_or_default();

    let mut record = ResourceRecord::new(id)
        .with_name(response.name.as_deref().unwrap_or_default())
        .with_image(config.image.unwrap_or_default())
        .with_status(status)
        .with_created(response.created.as_deref().unwrap_or_default())
        .with_labels(config.labels.unwrap_or_default());

    let ports = response
        .network_settings
        .and_then(|settings| settings.ports)
        .unwrap_or_default();
    for (container_port, bindings) in ports {
        let bindings = bindings
            .unwrap_or_default()
            .into_iter()
            .map(|b| HostBinding {
                host_ip: b.host_ip.unwrap_or_default(),
                host_port: b.host_port.unwrap_or_default(),
            })
            .collect();
        record = record.with_port(container_port, bindings);
    }
    record
}

fn snapshot_from_stats(stats: &Stats) -> StatsSnapshot {
    StatsSnapshot {
        cpu_total_usage: stats.cpu_stats.cpu_usage.total_usage,
        precpu_total_usage: stats.precpu_stats.cpu_usage.total_usage,
        system_cpu_usage: stats.cpu_stats.system_cpu_usage,
        presystem_cpu_usage: stats.precpu_stats.system_cpu_usage,
        online_cpus: stats.cpu_stats.online_cpus,
        percpu_count: stats
            .cpu_stats
            .cpu_usage
            .percpu_usage
            .as_ref()
            .map(Vec::len),
        memory_usage: stats.memory_stats.usage,
        memory_limit: stats.memory_stats.limit,
        networks: stats
            .networks
            .as_ref()
            .map(|networks| {
                networks
                    .values()
                    .map(|n| InterfaceCounters {
                        rx_bytes: n.rx_bytes,
                        tx_bytes: n.tx_bytes,
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{
        CommandLine, MemoryLimit, MountMode, PortSpec, RestartPolicy, VolumeBinding,
    };
    use bollard::models::{ContainerConfig, ContainerState, ContainerStateStatusEnum};

    #[test]
    fn test_container_config_translation() {
        let mut request = CreateRequest::new("nginx:1.25");
        request.command = Some(CommandLine(vec!["nginx".into()]));
        request.environment = Some([("A".to_string(), "1".to_string())].into_iter().collect());
        request.ports = Some([("80/tcp".to_string(), PortSpec::HostPort(8080))].into_iter().collect());
        request.volumes = Some(
            [("/srv/www".to_string(), VolumeBinding {
                bind: "/usr/share/nginx/html".into(),
                mode: MountMode::Ro,
            })]
            .into_iter()
            .collect(),
        );
        request.restart_policy = Some(RestartPolicy {
            name: RestartPolicyName::UnlessStopped,
            maximum_retry_count: 0,
        });
        request.mem_limit = Some(MemoryLimit(1024));

        let labels: HashMap<String, String> =
            [("x.managed".to_string(), "true".to_string())].into_iter().collect();
        let config = container_config(&request, labels.clone());

        assert_eq!(config.image.as_deref(), Some("nginx:1.25"));
        assert_eq!(config.env, Some(vec!["A=1".to_string()]));
        assert_eq!(config.labels, Some(labels));
        let host = config.host_config.expect("host config");
        assert_eq!(
            host.binds,
            Some(vec!["/srv/www:/usr/share/nginx/html:ro".to_string()])
        );
        assert_eq!(host.memory, Some(1024));
        assert!(host.privileged.is_none());
        let bindings = host.port_bindings.expect("port bindings");
        let published = bindings["80/tcp"].as_ref().expect("80/tcp bindings");
        assert_eq!(published[0].host_port.as_deref(), Some("8080"));
        assert_eq!(published[0].host_ip.as_deref(), Some("0.0.0.0"));
        assert_eq!(
            host.restart_policy.and_then(|p| p.name),
            Some(RestartPolicyNameEnum::UNLESS_STOPPED)
        );
    }

    #[test]
    fn test_record_from_inspect() {
        let response = ContainerInspectResponse {
            id: Some("0123456789abcdef".into()),
            name: Some("/web".into()),
            created: Some("2024-01-02T03:04:05.000000006Z".into()),
            state: Some(ContainerState {
                status: Some(ContainerStateStatusEnum::RUNNING),
                ..Default::default()
            }),
            config: Some(ContainerConfig {
                image: Some("nginx".into()),
                labels: Some([("a".to_string(), "b".to_string())].into_iter().collect()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let record = record_from_inspect("web", response);
        assert_eq!(record.id, "0123456789abcdef");
        assert_eq!(record.short_id, "0123456789ab");
        assert_eq!(record.name, "web");
        assert_eq!(record.status, "running");
        assert_eq!(record.image, "nginx");
        assert_eq!(record.labels["a"], "b");
    }

    #[test]
    fn test_not_found_mapping() {
        let err = map_error(
            DockerError::DockerResponseServerError {
                status_code: 404,
                message: "No such container: abc".into(),
            },
            Some("abc"),
        );
        assert!(matches!(err, RuntimeError::ContainerNotFound(id) if id == "abc"));

        let err = map_error(
            DockerError::DockerResponseServerError {
                status_code: 500,
                message: "boom".into(),
            },
            Some("abc"),
        );
        assert!(matches!(err, RuntimeError::Api(_)));
    }
}
