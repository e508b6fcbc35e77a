//! Guarded Docker API - a restricted control plane in front of the Docker engine.
//!
//! Callers may create and manage containers, but only through a surface that
//! refuses privilege escalation and host exposure, and only on containers this
//! service created itself.
//!
//! # Architecture
//!
//! - [`policy`]: immutable security configuration
//! - [`security`]: the create-request validator
//! - [`ownership`]: ownership labels and the guard scoping every other operation
//! - [`runtime`]: the runtime adapter trait and its Docker implementation
//! - [`manager`]: the facade composing the above
//! - [`server`]: the HTTP surface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use guarded_docker_api::{ContainerManager, PolicyConfig, runtime::DockerRuntime, server, system};
//!
//! #[tokio::main]
//! async fn main() -> miette::Result<()> {
//!     let policy = Arc::new(PolicyConfig::default().with_allowed_images(["nginx", "redis"]));
//!     let runtime = Arc::new(DockerRuntime::connect()?);
//!
//!     // Validate policy and runtime reachability
//!     system::check_all(runtime.as_ref(), &policy).await?;
//!
//!     // Serve the API to any browser origin
//!     let cors = server::cors_layer(&[])?;
//!     let manager = Arc::new(ContainerManager::new(runtime, policy));
//!     server::run("127.0.0.1:8000".parse().unwrap(), manager, cors).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod container;
pub mod error;
pub mod manager;
pub mod ownership;
pub mod policy;
pub mod runtime;
pub mod security;
pub mod server;
pub mod settings;
pub mod system;

// Re-export commonly used types
pub use container::{CreateRequest, ResourceRecord};
pub use error::{ContainerError, Error, Rejection, Result};
pub use manager::ContainerManager;
pub use policy::PolicyConfig;
pub use security::RequestValidator;
