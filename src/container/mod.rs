//! Container models shared by the facade, the runtime adapter and the HTTP layer.
//!
//! - [`CreateRequest`] is the typed creation request.
//! - [`ResourceRecord`] is the runtime's view of an existing container.
//! - [`ContainerStats`] and [`decode_logs`] translate raw runtime output.

mod record;
mod request;
mod stats;

pub use record::{
    ContainerList, ContainerLogs, CreatedContainer, HostBinding, ResourceRecord, SHORT_ID_LEN,
    short_id,
};
pub use request::{
    CommandLine, CreateRequest, MemoryLimit, MountMode, PortBinding, PortSpec, RestartPolicy,
    RestartPolicyName, VolumeBinding,
};
pub use stats::{
    ContainerStats, InterfaceCounters, StatsSnapshot, cpu_percent, decode_logs, memory_percent,
    network_totals,
};
