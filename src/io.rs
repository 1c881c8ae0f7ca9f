// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The byte-oriented transport seam the engine is built against.
//!
//! This plays the role the C reference gives to its `send`/`recv`
//! function pointers plus an opaque context pointer: a host hands the
//! session something that can move bytes, and the session never learns
//! or cares what it actually is (a socket, a pipe, an in-memory buffer
//! for tests).

use crate::error::IoError;

/// A blocking or non-blocking byte transport.
///
/// Implementors report [`IoError::WouldBlock`] instead of blocking when
/// no bytes are currently available (read) or acceptable (write); every
/// session call that touches `Io` is built to be re-entered from
/// scratch after such a signal, carrying all progress in the session
/// itself rather than on the stack.
pub trait Io {
    /// Write as many bytes of `buf` as can be written without blocking,
    /// returning the count. A partial write (`0 < n < buf.len()`) is
    /// valid; the caller will call again with the remainder.
    fn send(&mut self, buf: &[u8]) -> Result<usize, IoError>;

    /// Read as many bytes into `buf` as are currently available,
    /// returning the count. `Ok(0)` means end of file.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, IoError>;
}

impl<T: Io + ?Sized> Io for &mut T {
    fn send(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        (**self).send(buf)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        (**self).recv(buf)
    }
}

/// An `Io` over any `std::io::Read + std::io::Write` transport, for
/// hosts that already have one (a `TcpStream`, a `File`, a test pipe)
/// and want blocking semantics: `WouldBlock` is only produced if the
/// underlying stream itself is in non-blocking mode and returns
/// `std::io::ErrorKind::WouldBlock`.
pub struct StdIo<T>(pub T);

impl<T: std::io::Read + std::io::Write> Io for StdIo<T> {
    fn send(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        match self.0.write(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(IoError::WouldBlock),
            Err(e) => Err(IoError::Other(e))
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        match self.0.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(IoError::WouldBlock),
            Err(e) => Err(IoError::Other(e))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::VecDeque;

    /// An in-memory duplex transport used by the integration tests to
    /// drive a client and server session against each other without a
    /// real socket, one byte (or one chunk) at a time.
    pub struct Duplex {
        pub inbound: VecDeque<u8>,
        pub outbound: VecDeque<u8>,
        /// When set, `send`/`recv` move at most this many bytes per
        /// call, to exercise partial-I/O resumption.
        pub chunk: usize
    }

    impl Duplex {
        pub fn new(chunk: usize) -> Self {
            Duplex { inbound: VecDeque::new(), outbound: VecDeque::new(), chunk }
        }
    }

    impl Io for Duplex {
        fn send(&mut self, buf: &[u8]) -> Result<usize, IoError> {
            let n = buf.len().min(self.chunk.max(1));
            self.outbound.extend(&buf[..n]);
            Ok(n)
        }

        fn recv(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
            if self.inbound.is_empty() {
                return Err(IoError::WouldBlock);
            }
            let n = buf.len().min(self.chunk.max(1)).min(self.inbound.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.inbound.pop_front().unwrap();
            }
            Ok(n)
        }
    }
}
