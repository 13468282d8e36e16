use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

/// Bucket shared by every request that carries no proxy headers.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort identifier of the client that sent the request, used as the
/// rate limiting key.
///
/// The headers are trusted as-is since the service runs behind Cloudflare.
/// Requests that reach it directly without proxy headers all end up in the
/// [`UNKNOWN_CLIENT`] bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentifier(pub String);

pub fn client_identifier(headers: &HeaderMap) -> String {
    let forwarded_for = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(','))
        .map(str::trim)
        .find(|ip| !ip.is_empty());

    let connecting_ip = || {
        headers
            .get("cf-connecting-ip")
            .and_then(|header| header.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded_for
        .or_else(connecting_ip)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

impl<S> FromRequestParts<S> for ClientIdentifier
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identifier = client_identifier(&parts.headers);
        if identifier == UNKNOWN_CLIENT {
            tracing::debug!("No proxy headers found, using the shared `unknown` client bucket");
        }
        Ok(ClientIdentifier(identifier))
    }
}
