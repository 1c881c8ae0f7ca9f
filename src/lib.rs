// Copyright (c) 2019 Parity Technologies (UK) Ltd.
// Copyright (c) 2016 twist developers
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! A transport-agnostic, synchronous implementation of the [RFC 6455][rfc6455]
//! websocket protocol, for both client and server roles.
//!
//! The crate does no I/O of its own: a caller implements [`Io`] over
//! whatever byte transport it has (a socket, a pipe, something
//! entirely synthetic for tests) and drives the opening handshake with
//! [`handshake::client::Client`] or [`handshake::server::Server`], then
//! hands the transport to a [`connection::Session`] for the framed
//! message exchange.
//!
//! ```no_run
//! use ws_engine::connection::{Builder, Role};
//! use ws_engine::handshake::server::Server;
//! use ws_engine::io::StdIo;
//! use std::net::TcpStream;
//!
//! # fn run(stream: TcpStream) -> Result<(), ws_engine::error::Error> {
//! let mut server = Server::new(StdIo(stream), "/chat");
//! let request = loop {
//!     if let Some(req) = server.handshake()?.ready() {
//!         break req;
//!     }
//! };
//! let mut session = Builder::new().finish(Role::Server, server.into_inner());
//! session.send_text(b"welcome")?.ready();
//! # Ok(())
//! # }
//! ```
//!
//! [rfc6455]: https://tools.ietf.org/html/rfc6455

#![deny(missing_docs)]

pub mod base;
pub mod connection;
pub mod error;
pub mod handshake;
pub mod io;
mod util;

pub use base::OpCode;
pub use connection::{Builder, Outcome, Role, Session};
pub use error::{Error, HandshakeError, IoError};
pub use io::Io;
pub use util::utf8;
