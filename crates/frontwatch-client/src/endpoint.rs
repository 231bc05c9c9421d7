//! Channel URL derivation.

use frontwatch_core::constants::EVENTS_PATH;
use url::Url;

use crate::error::ClientError;

/// Derive the event channel URL from a page origin.
///
/// `https`/`wss` origins map to `wss`, every other scheme to `ws`. Host and
/// explicit port are kept; path, query and fragment are replaced by `/ws`.
///
/// `https://dash.example.com/admin?tab=1` → `wss://dash.example.com/ws`
pub fn events_endpoint(origin: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidEndpoint {
        origin: origin.to_string(),
        reason,
    };

    let page = Url::parse(origin.trim()).map_err(|e| invalid(e.to_string()))?;
    let host = page
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("origin has no host".into()))?;

    let scheme = match page.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    let authority = match page.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Url::parse(&format!("{scheme}://{authority}{EVENTS_PATH}")).map_err(|e| invalid(e.to_string()))
}
