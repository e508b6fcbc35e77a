//! Error types for the guarded Docker API.
//!
//! Uses thiserror for deriving std::error::Error and miette for rich diagnostics.
//! Transport status codes are not part of these types; the HTTP layer maps them.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the application.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Startup checks failed
    #[error("Startup checks failed")]
    #[diagnostic(code(gda::startup))]
    Startup(#[from] StartupError),

    /// HTTP server error
    #[error("HTTP server error")]
    #[diagnostic(code(gda::server))]
    Server(#[from] ServerError),

    /// Container runtime error
    #[error("Container runtime error")]
    #[diagnostic(code(gda::runtime))]
    Runtime(#[from] RuntimeError),

    /// I/O error
    #[error("I/O error: {0}")]
    #[diagnostic(code(gda::io))]
    Io(#[from] std::io::Error),
}

/// Why a host path was refused as a volume source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The path could not be interpreted at all.
    InvalidPath,
    /// The path is a protected path.
    Protected,
    /// The path lies inside a protected path.
    InsideProtected,
    /// A protected path lies inside the requested path.
    ExposesProtected,
}

/// A create request refused by the validator.
///
/// Every variant carries a stable reason code (see [`Rejection::code`]) and a
/// human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum Rejection {
    /// Image is not covered by the allow-list.
    #[error("Image '{image}' is not in the allowed images list")]
    #[diagnostic(code(gda::validation::image_not_allowed))]
    ImageNotAllowed { image: String },

    /// Host path of a volume binding touches a protected path.
    #[error("{}", volume_message(path, *reason))]
    #[diagnostic(
        code(gda::validation::volume_path_blocked),
        help("bind mounts may neither contain nor live inside a protected host path")
    )]
    VolumePathBlocked {
        path: String,
        blocked: Option<PathBuf>,
        reason: BlockReason,
    },

    /// A raw option that grants host access was set.
    #[error("{message}")]
    #[diagnostic(code(gda::validation::dangerous_option))]
    DangerousOption {
        option: &'static str,
        message: &'static str,
    },

    /// Capability additions were requested but are not permitted.
    #[error("{}", capability_message(capability.as_deref()))]
    #[diagnostic(code(gda::validation::capability_not_allowed))]
    CapabilityNotAllowed { capability: Option<String> },
}

fn volume_message(path: &str, reason: BlockReason) -> String {
    match reason {
        BlockReason::InvalidPath => format!("Invalid volume path: {path}"),
        BlockReason::Protected => format!("Volume mount to '{path}' is not allowed"),
        BlockReason::InsideProtected => {
            format!("Volume mount to '{path}' is not allowed (overlaps with protected path)")
        }
        BlockReason::ExposesProtected => {
            format!("Volume mount to '{path}' is not allowed (would expose protected paths)")
        }
    }
}

fn capability_message(capability: Option<&str>) -> String {
    match capability {
        Some(cap) => format!("Capability '{cap}' is not allowed"),
        None => String::from("Adding capabilities is not allowed"),
    }
}

impl Rejection {
    /// Returns the stable, machine-distinguishable reason code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ImageNotAllowed { .. } => "image-not-allowed",
            Self::VolumePathBlocked { .. } => "volume-path-blocked",
            Self::DangerousOption { .. } => "dangerous-option-used",
            Self::CapabilityNotAllowed { .. } => "capability-not-allowed",
        }
    }
}

/// Errors reported by a container runtime adapter.
#[derive(Error, Debug, Diagnostic)]
pub enum RuntimeError {
    /// The runtime has no container with this id or name.
    #[error("no such container: {0}")]
    #[diagnostic(code(gda::runtime::container_not_found))]
    ContainerNotFound(String),

    /// The runtime has no image with this reference.
    #[error("no such image: {0}")]
    #[diagnostic(code(gda::runtime::image_not_found))]
    ImageNotFound(String),

    /// The runtime could not be reached.
    #[error("failed to connect to container runtime: {0}")]
    #[diagnostic(
        code(gda::runtime::connection),
        help("Check that the Docker daemon is running and DOCKER_HOST points at it")
    )]
    Connection(String),

    /// The runtime answered with an error.
    #[error("container runtime request failed: {0}")]
    #[diagnostic(code(gda::runtime::api))]
    Api(String),
}

/// Errors surfaced by the control-plane facade.
#[derive(Error, Debug, Diagnostic)]
pub enum ContainerError {
    /// The create request failed validation.
    #[error("Security validation failed: {0}")]
    #[diagnostic(code(gda::container::rejected))]
    Rejected(#[from] Rejection),

    /// No container with this id exists.
    #[error("Container '{id}' not found")]
    #[diagnostic(code(gda::container::not_found))]
    NotFound { id: String },

    /// The container exists but was not created through this service.
    #[error("Container '{id}' is not managed by this API")]
    #[diagnostic(code(gda::container::not_managed))]
    NotManaged { id: String },

    /// The requested image does not exist in the runtime.
    #[error("Image '{image}' not found")]
    #[diagnostic(code(gda::container::image_not_found))]
    ImageNotFound { image: String },

    /// The runtime failed while performing an operation.
    #[error("Failed to {operation} container{}", id.as_deref().map(|i| format!(" '{i}'")).unwrap_or_default())]
    #[diagnostic(code(gda::container::runtime))]
    Runtime {
        operation: &'static str,
        id: Option<String>,
        #[source]
        source: RuntimeError,
    },
}

impl ContainerError {
    /// Returns the stable, machine-distinguishable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rejected(rejection) => rejection.code(),
            Self::NotFound { .. } => "resource-not-found",
            Self::NotManaged { .. } => "resource-not-managed",
            Self::ImageNotFound { .. } => "image-not-found",
            Self::Runtime { .. } => "runtime-error",
        }
    }

    pub(crate) fn runtime(operation: &'static str, id: &str, source: RuntimeError) -> Self {
        Self::Runtime {
            operation,
            id: Some(id.to_string()),
            source,
        }
    }
}

/// Errors raised by the startup readiness checks.
#[derive(Error, Debug, Diagnostic)]
pub enum StartupError {
    /// The configured policy cannot be used.
    #[error("Invalid policy configuration: {0}")]
    #[diagnostic(
        code(gda::startup::policy),
        help("Check the GUARDED_DOCKER_API_* environment variables and command-line flags")
    )]
    InvalidPolicy(String),

    /// The runtime did not answer a ping.
    #[error("Cannot connect to the container runtime")]
    #[diagnostic(
        code(gda::startup::runtime_unreachable),
        help("Start the Docker daemon or pass --skip-checks to start anyway")
    )]
    RuntimeUnreachable,
}

/// Errors related to the HTTP server.
#[derive(Error, Debug, Diagnostic)]
pub enum ServerError {
    /// Failed to bind the listening socket
    #[error("Failed to bind {address}")]
    #[diagnostic(code(gda::server::bind))]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// A configured CORS origin is not a valid header value
    #[error("Invalid CORS origin: {origin}")]
    #[diagnostic(
        code(gda::server::cors_origin),
        help("Origins look like https://example.com; use * to allow any origin")
    )]
    InvalidCorsOrigin { origin: String },

    /// Serving connections failed
    #[error("Failed to serve HTTP: {0}")]
    #[diagnostic(code(gda::server::serve))]
    Serve(#[source] std::io::Error),
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
