//! Startup readiness validation.
//!
//! This module checks that the configured policy is usable and that the
//! container runtime is reachable before the server accepts requests.

mod readiness;

pub use readiness::{Readiness, check_all, check_policy, check_runtime};
