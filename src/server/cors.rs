//! Cross-origin resource sharing for browser clients.

use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tracing::debug;

use crate::error::ServerError;

/// Origin entry that admits every origin.
pub const ANY_ORIGIN: &str = "*";

/// Builds the CORS layer for the configured origins.
///
/// An empty list or a `*` entry admits any origin without credentials. An
/// explicit list admits only those origins, with credentials, echoing the
/// requested method and headers.
///
/// # Errors
///
/// Returns `ServerError::InvalidCorsOrigin` if an origin is not a valid header value.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, ServerError> {
    let origins: Vec<&str> = origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .collect();

    if origins.is_empty() || origins.contains(&ANY_ORIGIN) {
        debug!("CORS allows any origin");
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let allowed = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| ServerError::InvalidCorsOrigin {
                origin: (*origin).to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!(origins = ?origins, "CORS restricted to configured origins");

    Ok(CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}
