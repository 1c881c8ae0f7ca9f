// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The server side of the opening handshake.

use super::{generate_accept_key, header_token_contains, reason_phrase, with_first_header, AllowAny, Policy, MAX_NUM_HEADERS};
use crate::connection::Outcome;
use crate::error::{Error, HandshakeError, IoError};
use crate::handshake::client::find_end_of_headers;
use crate::io::Io;
use log::debug;

const BUF_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Collecting,
    Writing,
    Done
}

/// The validated (or rejected) request, available once the handshake
/// call returns `Ready`.
#[derive(Debug, Clone)]
pub struct ClientRequest {
    ws_key: Vec<u8>,
    resource: String
}

impl ClientRequest {
    /// The client's `Sec-WebSocket-Key`.
    pub fn key(&self) -> &[u8] {
        &self.ws_key
    }

    /// The request-URI the client asked for.
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

/// Drives the server side of the opening handshake: validates the
/// request, composes and writes a response, and surfaces the parsed
/// request (or a deferred validation error, after the rejection
/// response has already been written).
pub struct Server<IO> {
    io: IO,
    resource: String,
    host_policy: Box<dyn Policy>,
    state: State,
    buf: Vec<u8>,
    read: usize,
    written: usize,
    request: Option<ClientRequest>,
    deferred_err: Option<HandshakeError>
}

impl<IO: Io> Server<IO> {
    /// Create a server that expects requests for `resource`.
    pub fn new(io: IO, resource: impl Into<String>) -> Self {
        Server {
            io,
            resource: resource.into(),
            host_policy: Box::new(AllowAny),
            state: State::Init,
            buf: Vec::with_capacity(BUF_SIZE),
            read: 0,
            written: 0,
            request: None,
            deferred_err: None
        }
    }

    /// Restrict acceptable `Host` header values. Default is
    /// [`AllowAny`].
    pub fn set_host_policy(&mut self, policy: impl Policy + 'static) -> &mut Self {
        self.host_policy = Box::new(policy);
        self
    }

    /// Drive the handshake to completion: collect the request, validate
    /// it, write a response (`101` on success, `400`/`404`/`500` on
    /// failure — a failure is still reported to the caller only after
    /// the response bytes have been written). Call again if this
    /// returns [`Outcome::WouldBlock`].
    pub fn handshake(&mut self) -> Result<Outcome<ClientRequest>, Error> {
        loop {
            match self.state {
                State::Init => {
                    self.state = State::Collecting;
                }
                State::Collecting => {
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
                    self.decode_and_compose_response();
                    self.written = 0;
                    self.state = State::Writing;
                }
                State::Writing => {
                    while self.written < self.buf.len() {
                        match self.io.send(&self.buf[self.written..]) {
                            Ok(n) => self.written += n,
                            Err(IoError::WouldBlock) => return Ok(Outcome::WouldBlock),
                            Err(IoError::Eof) => return Err(Error::Eof),
                            Err(IoError::Other(e)) => return Err(Error::Io(e))
                        }
                    }
                    self.state = State::Done;
                    if let Some(err) = self.deferred_err.take() {
                        return Err(err.into());
                    }
                    return Ok(Outcome::Ready(self.request.take().expect("set on success path")));
                }
                State::Done => {
                    if let Some(err) = self.deferred_err.take() {
                        return Err(err.into());
                    }
                    return Ok(Outcome::Ready(self.request.take().expect("set on success path")));
                }
            }
        }
    }

    /// Parse the buffered request and build the response into `self.buf`
    /// in place, deferring any validation error so the response is
    /// still written (mirroring the C reference's `srv_req`).
    fn decode_and_compose_response(&mut self) {
        match self.decode_request() {
            Ok(req) => {
                let accept = generate_accept_key(&req.ws_key);
                self.request = Some(req);
                self.buf.clear();
                self.buf.extend_from_slice(
                    format!(
                        "HTTP/1.1 101 {}\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {}\r\n\r\n",
                        reason_phrase(101),
                        accept
                    )
                    .as_bytes()
                );
            }
            Err(err) => {
                let status = match err {
                    HandshakeError::RequestUri => 404,
                    HandshakeError::MessageTooLarge | HandshakeError::RequestLine | HandshakeError::Header(_) | HandshakeError::Parse(_) => 400,
                    _ => 500
                };
                debug!("rejecting handshake with {}: {:?}", status, err);
                self.buf.clear();
                self.buf.extend_from_slice(
                    format!("HTTP/1.1 {} {}\r\nConnection: close\r\nContent-Length: 0\r\n\r\n", status, reason_phrase(status)).as_bytes()
                );
                self.deferred_err = Some(err);
            }
        }
    }

    fn decode_request(&self) -> Result<ClientRequest, HandshakeError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_NUM_HEADERS];
        let mut request = httparse::Request::new(&mut headers);
        match request.parse(&self.buf[..self.read]) {
            Ok(httparse::Status::Complete(_)) => (),
            Ok(httparse::Status::Partial) => return Err(HandshakeError::RequestLine),
            Err(e) => return Err(HandshakeError::Parse(e))
        };
        if request.method != Some("GET") {
            return Err(HandshakeError::RequestLine);
        }
        if request.version != Some(1) {
            return Err(HandshakeError::RequestLine);
        }
        let path = request.path.ok_or(HandshakeError::RequestLine)?;
        if !path.eq_ignore_ascii_case(&self.resource) {
            return Err(HandshakeError::RequestUri);
        }

        let host = with_first_header(request.headers, "Host")?;
        if !self.host_policy.is_allowed(host) {
            return Err(HandshakeError::Header("Host not allowed"));
        }
        let upgrade = with_first_header(request.headers, "Upgrade")?;
        if !header_token_contains(upgrade, "websocket") {
            return Err(HandshakeError::Header("Upgrade is not websocket"));
        }
        let connection = with_first_header(request.headers, "Connection")?;
        if !header_token_contains(connection, "upgrade") {
            return Err(HandshakeError::Header("Connection does not contain upgrade"));
        }
        let version = with_first_header(request.headers, "Sec-WebSocket-Version")?;
        if version != b"13" {
            return Err(HandshakeError::Header("unsupported Sec-WebSocket-Version"));
        }
        let ws_key = with_first_header(request.headers, "Sec-WebSocket-Key")?.to_vec();

        Ok(ClientRequest { ws_key, resource: path.to_string() })
    }

    /// Consume the server, returning the underlying transport — used to
    /// build a [`crate::connection::Session`] once accepted.
    pub fn into_inner(self) -> IO {
        self.io
    }
}
