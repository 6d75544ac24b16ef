//! HTTP-Upgrade-to-WebSocket handshake (RFC 6455 section 4).
//!
//! [`WsUpgrade`] is an axum extractor that pulls the client's
//! `Sec-WebSocket-Key` and hyper's upgrade handle out of the request; if the
//! key header is absent the extraction fails and no upgrade is attempted.
//! [`WsUpgrade::upgrade`] then builds the `101 Switching Protocols` response
//! with the computed accept key and hands back a future that resolves to the
//! raw upgraded stream once hyper has switched protocols.

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::Response,
};
use base64::prelude::*;
use hyper::upgrade::{OnUpgrade, Upgraded};
use hyper_util::rt::TokioIo;
use sha1::{Digest, Sha1};

use super::{Connection, WebSocketError};

/// GUID appended to the client key per RFC 6455 section 1.3.
const WEBSOCKET_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Compute the `Sec-WebSocket-Accept` value for a client key.
pub fn accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(WEBSOCKET_GUID);
    BASE64_STANDARD.encode(sha1.finalize())
}

/// An incoming WebSocket upgrade request.
pub struct WsUpgrade {
    key: String,
    on_upgrade: OnUpgrade,
}

impl<S> FromRequestParts<S> for WsUpgrade
where
    S: Sync,
{
    type Rejection = StatusCode;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let key = parts
                .headers
                .get(header::SEC_WEBSOCKET_KEY)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
                .ok_or(StatusCode::BAD_REQUEST)?;

            let on_upgrade = parts
                .extensions
                .remove::<OnUpgrade>()
                .ok_or(StatusCode::BAD_REQUEST)?;

            Ok(Self { key, on_upgrade })
        }
    }
}

impl WsUpgrade {
    /// Build the `101 Switching Protocols` response and the future completing
    /// the protocol switch. The response must be returned to the client
    /// before the future resolves.
    pub fn upgrade(self) -> (Response, UpgradeFut) {
        let response = Response::builder()
            .status(StatusCode::SWITCHING_PROTOCOLS)
            .header(header::UPGRADE, "websocket")
            .header(header::CONNECTION, "Upgrade")
            .header(header::SEC_WEBSOCKET_ACCEPT, accept_key(&self.key))
            .body(Body::empty())
            .expect("bug: failed to build upgrade response");

        (
            response,
            UpgradeFut {
                inner: self.on_upgrade,
            },
        )
    }
}

/// Completes the upgrade once the 101 response has been flushed, yielding an
/// exclusively owned [`Connection`] over the raw stream.
pub struct UpgradeFut {
    inner: OnUpgrade,
}

impl UpgradeFut {
    pub async fn into_connection(self) -> Result<Connection<TokioIo<Upgraded>>, WebSocketError> {
        let upgraded = self.inner.await?;
        Ok(Connection::new(TokioIo::new(upgraded)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_key_matches_rfc6455_sample() {
        // Handshake vector from RFC 6455 section 1.3.
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }
}
