//! Label-based ownership of runtime containers.
//!
//! Every container created through this service is stamped with a reserved
//! label pair:
//!
//! ```text
//! <prefix>.managed  = "true"
//! <prefix>.instance = <instance id>
//! ```
//!
//! [`ManagedLabels`] computes that pair and tests for it; [`OwnershipGuard`]
//! uses it as the sole authorization boundary for start, stop, restart,
//! remove, inspect, logs and stats.

mod guard;
mod labels;

pub use guard::OwnershipGuard;
pub use labels::{MANAGED_VALUE, ManagedLabels};
