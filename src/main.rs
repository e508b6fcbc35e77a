//! Guarded Docker API - Entry Point
//!
//! This is the main entry point for the HTTP server binary.

use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use guarded_docker_api::runtime::DockerRuntime;
use guarded_docker_api::settings::Settings;
use guarded_docker_api::{ContainerManager, server, system};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    // Initialize tracing
    let filter = if settings.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    info!("Guarded Docker API v{}", env!("CARGO_PKG_VERSION"));

    let policy = Arc::new(settings.policy());
    let runtime = Arc::new(DockerRuntime::connect().into_diagnostic()?);

    // Check readiness unless skipped
    if settings.skip_checks {
        warn!("Skipping startup checks (--skip-checks). Requests may fail until Docker is reachable.");
    } else {
        info!("Checking policy and Docker connectivity...");

        match system::check_all(runtime.as_ref(), &policy).await {
            Ok(ready) => {
                info!(
                    "Ready: instance {}, ownership label {}, {} blocked paths, image allow-list active: {}",
                    ready.instance_id, ready.managed_label, ready.blocked_paths, ready.images_restricted
                );
            }
            Err(e) => {
                error!("Startup checks failed");
                return Err(e).into_diagnostic();
            }
        }
    }

    let cors = server::cors_layer(&settings.cors_origins).into_diagnostic()?;
    let manager = Arc::new(ContainerManager::new(runtime, policy));
    server::run(settings.bind, manager, cors).await.into_diagnostic()
}
