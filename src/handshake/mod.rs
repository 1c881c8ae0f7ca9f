// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The opening HTTP/1.1 Upgrade handshake, for both
//! [`client`](client::Client) and [`server`](server::Server) roles.

pub mod client;
pub mod server;

mod access_control;

pub use access_control::{AllowAny, AllowList, Policy};

use crate::error::HandshakeError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha1::{Digest, Sha1};

const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Maximum number of headers `httparse` will tokenize per message.
pub(crate) const MAX_NUM_HEADERS: usize = 32;

/// `base64(sha1(key || GUID))`, the value a server returns in
/// `Sec-WebSocket-Accept` and a client checks it against.
pub(crate) fn generate_accept_key(key: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key);
    hasher.update(GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Find the first header named `name` (case-insensitive), rejecting a
/// second occurrence.
pub(crate) fn with_first_header<'a>(
    headers: &[httparse::Header<'a>],
    name: &str
) -> Result<&'a [u8], HandshakeError> {
    let mut found: Option<&'a [u8]> = None;
    for h in headers {
        if h.name.eq_ignore_ascii_case(name) {
            if found.is_some() {
                return Err(HandshakeError::Header(duplicate_header_msg(name)));
            }
            found = Some(h.value);
        }
    }
    found.ok_or_else(|| HandshakeError::Header(missing_header_msg(name)))
}

fn missing_header_msg(name: &str) -> &'static str {
    match name {
        "Host" => "missing Host header",
        "Upgrade" => "missing Upgrade header",
        "Connection" => "missing Connection header",
        "Sec-WebSocket-Key" => "missing Sec-WebSocket-Key header",
        "Sec-WebSocket-Version" => "missing Sec-WebSocket-Version header",
        "Sec-WebSocket-Accept" => "missing Sec-WebSocket-Accept header",
        _ => "missing header"
    }
}

fn duplicate_header_msg(name: &str) -> &'static str {
    match name {
        "Host" => "duplicate Host header",
        "Sec-WebSocket-Accept" => "duplicate Sec-WebSocket-Accept header",
        _ => "duplicate header"
    }
}

/// Check that a header's value case-insensitively contains `expected`
/// as a comma-separated token (used for `Upgrade`/`Connection`).
pub(crate) fn header_token_contains(value: &[u8], expected: &str) -> bool {
    std::str::from_utf8(value)
        .map(|s| s.split(',').any(|tok| tok.trim().eq_ignore_ascii_case(expected)))
        .unwrap_or(false)
}

/// Status code → reason phrase, trimmed to the codes this engine
/// actually emits (101, 400, 404, 500); extended status negotiation is
/// out of scope.
pub(crate) fn reason_phrase(code: u16) -> &'static str {
    match code {
        101 => "Switching Protocols",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Internal Server Error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_key_matches_rfc6455_example() {
        let key = b"dGhlIHNhbXBsZSBub25jZQ==";
        assert_eq!(generate_accept_key(key), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn token_match_is_case_insensitive_and_comma_aware() {
        assert!(header_token_contains(b"Upgrade, keep-alive", "upgrade"));
        assert!(!header_token_contains(b"keep-alive", "upgrade"));
    }
}
