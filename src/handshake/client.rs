// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The client side of the opening handshake.

use super::{generate_accept_key, header_token_contains, with_first_header, MAX_NUM_HEADERS};
use crate::connection::Outcome;
use crate::error::{Error, HandshakeError, IoError};
use crate::io::Io;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::debug;
use rand::RngCore;

const NONCE_LEN: usize = 32;
const BUF_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    WritingRequest,
    CollectingResponse,
    Done
}

/// What the server said back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerResponse {
    /// `101 Switching Protocols` with a matching `Sec-WebSocket-Accept`.
    Accepted,
    /// Any other status code.
    Rejected(u16)
}

/// Drives the client (user-agent) side of the opening handshake.
pub struct Client<IO> {
    io: IO,
    host: String,
    resource: String,
    origin: Option<String>,
    state: State,
    buf: Vec<u8>,
    written: usize,
    read: usize,
    nonce: String
}

impl<IO: Io> Client<IO> {
    /// Create a client that will request `resource` from `host` over
    /// `io`.
    pub fn new(io: IO, host: impl Into<String>, resource: impl Into<String>) -> Self {
        Client {
            io,
            host: host.into(),
            resource: resource.into(),
            origin: None,
            state: State::Init,
            buf: Vec::with_capacity(BUF_SIZE),
            written: 0,
            read: 0,
            nonce: String::new()
        }
    }

    /// Set the `Origin` header sent with the request.
    pub fn set_origin(&mut self, origin: impl Into<String>) -> &mut Self {
        self.origin = Some(origin.into());
        self
    }

    /// Drive the handshake to completion, writing the request and
    /// collecting/validating the response. Call again if this returns
    /// [`Outcome::WouldBlock`].
    pub fn handshake(&mut self) -> Result<Outcome<ServerResponse>, Error> {
        loop {
            match self.state {
                State::Init => {
                    self.encode_request();
                    self.state = State::WritingRequest;
                }
                State::WritingRequest => {
                    while self.written < self.buf.len() {
                        match self.io.send(&self.buf[self.written..]) {
                            Ok(n) => self.written += n,
                            Err(IoError::WouldBlock) => return Ok(Outcome::WouldBlock),
                            Err(IoError::Eof) => return Err(Error::Eof),
                            Err(IoError::Other(e)) => return Err(Error::Io(e))
                        }
                    }
                    self.buf.clear();
                    self.read = 0;
                    self.state = State::CollectingResponse;
                }
                State::CollectingResponse => {
                    if find_end_of_headers(&self.buf[..self.read]).is_none() {
                        if self.read == self.buf.capacity() {
                            return Err(HandshakeError::MessageTooLarge.into());
                        }
                        if self.buf.len() < self.buf.capacity() {
                            self.buf.resize(self.buf.capacity(), 0);
                        }
                        match self.io.recv(&mut self.buf[self.read..]) {
                            Ok(0) => return Err(Error::Eof),
                            Ok(n) => self.read += n,
                            Err(IoError::WouldBlock) => return Ok(Outcome::WouldBlock),
                            Err(IoError::Eof) => return Err(Error::Eof),
                            Err(IoError::Other(e)) => return Err(Error::Io(e))
                        }
                        continue;
                    }
                    let response = self.decode_response()?;
                    self.state = State::Done;
                    return Ok(Outcome::Ready(response));
                }
                State::Done => {
                    let response = self.decode_response()?;
                    return Ok(Outcome::Ready(response));
                }
            }
        }
    }

    fn encode_request(&mut self) {
        let mut raw_nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut raw_nonce);
        self.nonce = BASE64.encode(raw_nonce);

        let mut req = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: {}\r\n",
            self.resource, self.host, self.nonce
        );
        if let Some(origin) = &self.origin {
            req.push_str("Origin: ");
            req.push_str(origin);
            req.push_str("\r\n");
        }
        req.push_str("Sec-WebSocket-Version: 13\r\n\r\n");

        debug!("client request:\n{}", req);
        self.buf.clear();
        self.buf.extend_from_slice(req.as_bytes());
        self.written = 0;
    }

    fn decode_response(&self) -> Result<ServerResponse, Error> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_NUM_HEADERS];
        let mut response = httparse::Response::new(&mut headers);
        match response.parse(&self.buf[..self.read]) {
            Ok(httparse::Status::Complete(_)) => (),
            Ok(httparse::Status::Partial) => return Err(HandshakeError::ResponseLine.into()),
            Err(e) => return Err(HandshakeError::Parse(e).into())
        };
        if response.version != Some(1) {
            return Err(HandshakeError::ResponseLine.into());
        }
        let code = response.code.ok_or(HandshakeError::ResponseLine)?;
        if code != 101 {
            return Ok(ServerResponse::Rejected(code));
        }

        let upgrade = with_first_header(response.headers, "Upgrade")?;
        if !header_token_contains(upgrade, "websocket") {
            return Err(HandshakeError::Header("Upgrade is not websocket").into());
        }
        let connection = with_first_header(response.headers, "Connection")?;
        if !header_token_contains(connection, "upgrade") {
            return Err(HandshakeError::Header("Connection does not contain upgrade").into());
        }
        let accept = with_first_header(response.headers, "Sec-WebSocket-Accept")?;
        let expected = generate_accept_key(self.nonce.as_bytes());
        if accept != expected.as_bytes() {
            return Err(HandshakeError::Header("Sec-WebSocket-Accept mismatch").into());
        }
        Ok(ServerResponse::Accepted)
    }

    /// Consume the client, returning the underlying transport — used to
    /// build a [`crate::connection::Session`] once accepted.
    pub fn into_inner(self) -> IO {
        self.io
    }
}

pub(crate) fn find_end_of_headers(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}
