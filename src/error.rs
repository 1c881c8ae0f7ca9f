// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The engine's error type and the I/O suspension signal.

use std::fmt;

/// Signal returned by an [`crate::io::Io`] implementor instead of an error
/// when the operation did not complete because the underlying transport
/// has no more bytes to give (read side) or cannot accept more right now
/// (write side). Recoverable: the host re-invokes the same session call.
#[derive(Debug)]
pub struct WouldBlock;

impl fmt::Display for WouldBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("would block")
    }
}

impl std::error::Error for WouldBlock {}

/// Error returned by an [`crate::io::Io`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// The operation would block; re-invoke the same call once the
    /// transport is ready.
    #[error("would block")]
    WouldBlock,
    /// The peer closed the connection in the middle of a read.
    #[error("end of file")]
    Eof,
    /// Any other transport failure.
    #[error(transparent)]
    Other(#[from] std::io::Error)
}

/// All fatal errors the engine can raise. Once returned, the session that
/// produced it must not be used again — see §7 of the design: framing and
/// validation errors are fatal, only [`IoError::WouldBlock`] is
/// recoverable.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The underlying transport failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection mid-frame.
    #[error("end of file")]
    Eof,

    /// The opening handshake could not be completed.
    #[error("handshake failed: {0}")]
    Handshake(#[source] HandshakeError),

    /// A frame carried an opcode outside 0x0-0xA, or a reserved opcode.
    #[error("bad opcode")]
    BadOpCode,

    /// A structurally invalid frame: a fragmented control frame, a
    /// continuation with no prior fragment, a data frame opened while a
    /// continuation is pending, or similar.
    #[error("fault frame")]
    FaultFrame,

    /// A length was encoded using more bytes than necessary (e.g. the
    /// 126 escape used for a length that fits in 7 bits), or exceeded the
    /// platform/protocol maximum.
    #[error("bad length")]
    BadLen,

    /// A server received an unmasked frame.
    #[error("expected masked frame")]
    ExpectMask,

    /// A client received a masked frame.
    #[error("unexpected masked frame")]
    UnexpectedMask,

    /// A frame or message exceeded the configured `max_payload`.
    #[error("payload too long: {len} > {max}")]
    TooLong {
        /// The length that was rejected.
        len: u64,
        /// The configured maximum.
        max: u64
    },

    /// A TEXT payload, or a CLOSE reason, was not valid UTF-8.
    #[error("invalid utf-8")]
    NonUtf8,

    /// A TEXT payload ended mid code point with no further fragment to
    /// complete it.
    #[error("incomplete utf-8 sequence")]
    Utf8Incomplete,

    /// A CLOSE frame carried a code outside 1000-4999, or one of the
    /// reserved-never-on-the-wire codes (1004, 1005, 1006, 1015, and the
    /// 1016-2999 reserved sub-range).
    #[error("bad close code: {0}")]
    BadCloseCode(u16)
}

/// Errors specific to the opening HTTP/1.1 Upgrade handshake.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HandshakeError {
    /// The message collector filled the I/O buffer before finding the
    /// `CRLF CRLF` end-of-headers delimiter.
    #[error("handshake message too large")]
    MessageTooLarge,

    /// The HTTP request line was malformed.
    #[error("bad request line")]
    RequestLine,

    /// The request-URI did not case-insensitively match the configured
    /// resource.
    #[error("bad request uri")]
    RequestUri,

    /// The HTTP response/status line was malformed.
    #[error("bad response line")]
    ResponseLine,

    /// A required header was missing, duplicated, or carried an
    /// unexpected value.
    #[error("bad header: {0}")]
    Header(&'static str),

    /// `httparse` failed to tokenize the message.
    #[error("malformed http message: {0}")]
    Parse(#[from] httparse::Error),

    /// The server rejected the request (a non-101 status was written, or
    /// received by a client).
    #[error("rejected with status {0}")]
    Rejected(u16)
}

impl From<HandshakeError> for Error {
    fn from(e: HandshakeError) -> Self {
        Error::Handshake(e)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
