//! In-memory container runtime for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use guarded_docker_api::container::{
    CreateRequest, CreatedContainer, InterfaceCounters, ResourceRecord, StatsSnapshot,
};
use guarded_docker_api::error::RuntimeError;
use guarded_docker_api::runtime::{ContainerRuntime, LogOptions, RemoveOptions};
use guarded_docker_api::{ContainerManager, PolicyConfig};

pub const INSTANCE_ID: &str = "test0001";
pub const MANAGED_KEY: &str = "guarded-docker-api.managed";
pub const INSTANCE_KEY: &str = "guarded-docker-api.instance";

/// A call the fake runtime received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create {
        image: String,
        labels: HashMap<String, String>,
    },
    Start(String),
    Stop(String, u32),
    Restart(String, u32),
    Remove(String, RemoveOptions),
    Logs(String),
    Stats(String),
}

#[derive(Debug, Default)]
pub struct FakeRuntime {
    containers: Mutex<HashMap<String, ResourceRecord>>,
    calls: Mutex<Vec<Call>>,
    unreachable: AtomicBool,
    missing_images: Mutex<Vec<String>>,
    log_bytes: Mutex<Vec<u8>>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seeds a container with the given labels.
    pub fn insert(&self, id: &str, labels: &[(&str, &str)]) {
        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let record = ResourceRecord::new(id)
            .with_name(&format!("/{id}"))
            .with_image("alpine:3")
            .with_status("created")
            .with_labels(labels);
        self.lock_containers().insert(id.to_string(), record);
    }

    /// Seeds a container created by this service.
    pub fn insert_managed(&self, id: &str) {
        self.insert(id, &[(MANAGED_KEY, "true"), (INSTANCE_KEY, INSTANCE_ID)]);
    }

    pub fn set_unreachable(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }

    pub fn set_missing_image(&self, image: &str) {
        self.missing_images.lock().unwrap().push(image.to_string());
    }

    pub fn set_logs(&self, bytes: &[u8]) {
        *self.log_bytes.lock().unwrap() = bytes.to_vec();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn create_calls(&self) -> Vec<(String, HashMap<String, String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Create { image, labels } => Some((image, labels)),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock_containers().contains_key(id)
    }

    fn lock_containers(&self) -> std::sync::MutexGuard<'_, HashMap<String, ResourceRecord>> {
        self.containers.lock().unwrap()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn known(&self, id: &str) -> Result<ResourceRecord, RuntimeError> {
        self.check_reachable()?;
        self.lock_containers()
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::ContainerNotFound(id.to_string()))
    }

    fn check_reachable(&self) -> Result<(), RuntimeError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(RuntimeError::Connection("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> bool {
        !self.unreachable.load(Ordering::SeqCst)
    }

    async fn list(
        &self,
        label_filter: &str,
        _all: bool,
    ) -> Result<Vec<ResourceRecord>, RuntimeError> {
        self.check_reachable()?;
        let (key, value) = label_filter.split_once('=').unwrap_or((label_filter, ""));
        let mut records: Vec<_> = self
            .lock_containers()
            .values()
            .filter(|r| r.labels.get(key).map(String::as_str) == Some(value))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn create(
        &self,
        request: &CreateRequest,
        labels: HashMap<String, String>,
    ) -> Result<CreatedContainer, RuntimeError> {
        self.check_reachable()?;
        self.record(Call::Create {
            image: request.image.clone(),
            labels: labels.clone(),
        });
        if self.missing_images.lock().unwrap().contains(&request.image) {
            return Err(RuntimeError::ImageNotFound(request.image.clone()));
        }

        let id = format!("{:0>64}", self.lock_containers().len() + 1);
        let name = request.name.clone().unwrap_or_else(|| format!("fake-{}", &id[58..]));
        let record = ResourceRecord::new(&id)
            .with_name(&name)
            .with_image(&request.image)
            .with_status("created")
            .with_labels(labels);
        self.lock_containers().insert(id.clone(), record);

        Ok(CreatedContainer {
            id,
            name,
            warnings: Vec::new(),
        })
    }

    async fn inspect(&self, id: &str) -> Result<ResourceRecord, RuntimeError> {
        self.known(id)
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        self.known(id)?;
        self.record(Call::Start(id.to_string()));
        if let Some(record) = self.lock_containers().get_mut(id) {
            record.status = "running".to_string();
        }
        Ok(())
    }

    async fn stop(&self, id: &str, timeout_secs: u32) -> Result<(), RuntimeError> {
        self.known(id)?;
        self.record(Call::Stop(id.to_string(), timeout_secs));
        Ok(())
    }

    async fn restart(&self, id: &str, timeout_secs: u32) -> Result<(), RuntimeError> {
        self.known(id)?;
        self.record(Call::Restart(id.to_string(), timeout_secs));
        Ok(())
    }

    async fn remove(&self, id: &str, options: RemoveOptions) -> Result<(), RuntimeError> {
        self.known(id)?;
        self.record(Call::Remove(id.to_string(), options));
        self.lock_containers().remove(id);
        Ok(())
    }

    async fn logs(&self, id: &str, _options: &LogOptions) -> Result<Vec<u8>, RuntimeError> {
        self.known(id)?;
        self.record(Call::Logs(id.to_string()));
        Ok(self.log_bytes.lock().unwrap().clone())
    }

    async fn stats(&self, id: &str) -> Result<StatsSnapshot, RuntimeError> {
        self.known(id)?;
        self.record(Call::Stats(id.to_string()));
        Ok(StatsSnapshot {
            cpu_total_usage: 200,
            precpu_total_usage: 100,
            system_cpu_usage: Some(2_000),
            presystem_cpu_usage: Some(1_000),
            online_cpus: Some(2),
            percpu_count: None,
            memory_usage: Some(256),
            memory_limit: Some(1_024),
            networks: vec![
                InterfaceCounters {
                    rx_bytes: 10,
                    tx_bytes: 20,
                },
                InterfaceCounters {
                    rx_bytes: 5,
                    tx_bytes: 7,
                },
            ],
        })
    }
}

/// Default policy with a fixed instance id.
pub fn policy() -> PolicyConfig {
    PolicyConfig::default().with_instance_id(INSTANCE_ID)
}

pub fn manager(runtime: &Arc<FakeRuntime>, policy: PolicyConfig) -> ContainerManager {
    ContainerManager::new(runtime.clone(), Arc::new(policy))
}
