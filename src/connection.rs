// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The session: a single connection's worth of framing state, driven by
//! repeated calls into a caller-supplied [`Io`].
//!
//! Every method here is built to be re-entered: if the transport signals
//! [`IoError::WouldBlock`] partway through, the session keeps whatever
//! progress it made in its own fields and the caller simply calls the
//! same method again (with a data method, the same buffer) once the
//! transport is ready.

use crate::base::{apply_mask, OpCode};
use std::convert::TryFrom;
use crate::error::{Error, IoError};
use crate::io::Io;
use crate::util::utf8;
use log::{debug, trace};
use rand::RngCore;

/// Which end of the connection a session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The client (user agent) that initiated the connection. Frames it
    /// sends must be masked; frames it receives must not be.
    Client,
    /// The server that accepted the connection. The reverse of `Client`.
    Server
}

impl Role {
    fn is_server(self) -> bool {
        self == Role::Server
    }
}

/// The result of a session call that may need to be retried.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The operation completed.
    Ready(T),
    /// The underlying transport was not ready; call the same method
    /// again (with a data method, with the same buffer) once it is.
    WouldBlock
}

impl<T> Outcome<T> {
    /// Unwrap a ready value, or propagate `WouldBlock` as `Ok(None)`.
    pub fn ready(self) -> Option<T> {
        match self {
            Outcome::Ready(v) => Some(v),
            Outcome::WouldBlock => None
        }
    }
}

/// Minimum buffer size: a full extended header (14 bytes) plus the
/// largest control frame payload (125 bytes).
pub const MIN_BUFFER_SIZE: usize = 14 + 125;

/// Default buffer size used by [`Builder`] when none is given.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

static_assertions::const_assert!(MIN_BUFFER_SIZE < DEFAULT_BUFFER_SIZE);

/// Session configuration, set once before the handshake begins.
#[derive(Debug, Clone)]
pub struct Config {
    buffer_size: usize,
    max_payload: Option<u64>,
    utf8_check: bool
}

impl Default for Config {
    fn default() -> Self {
        Config { buffer_size: DEFAULT_BUFFER_SIZE, max_payload: None, utf8_check: true }
    }
}

/// Builds a [`Session`] for a given role and [`Io`].
#[derive(Debug, Clone, Default)]
pub struct Builder {
    config: Config
}

impl Builder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Builder::default()
    }

    /// Set the size of each I/O buffer. Clamped up to [`MIN_BUFFER_SIZE`]
    /// if smaller.
    pub fn buffer_size(mut self, n: usize) -> Self {
        self.config.buffer_size = n.max(MIN_BUFFER_SIZE);
        self
    }

    /// Cap per-frame payload length; frames longer than this are
    /// rejected with [`Error::TooLong`]. `None` disables the cap.
    pub fn max_payload(mut self, n: Option<u64>) -> Self {
        self.config.max_payload = n;
        self
    }

    /// Enable or disable UTF-8 validation of TEXT payloads and CLOSE
    /// reasons. Enabled by default.
    pub fn utf8_check(mut self, on: bool) -> Self {
        self.config.utf8_check = on;
        self
    }

    /// Build the session around `io`, playing `role`.
    pub fn finish<IO: Io>(self, role: Role, io: IO) -> Session<IO> {
        Session::new(role, io, self.config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    Header,
    ExtLen16,
    ExtLen64,
    MaskState,
    PayloadStart,
    PayloadStream,
    ControlDispatch
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Idle,
    Header,
    Payload
}

/// The kind of data carried by a delivered [`Event::Data`] chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// UTF-8 text.
    Text,
    /// Arbitrary bytes.
    Binary
}

/// The kind of control frame carried by [`Event::Control`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// A close request; see [`ControlFrame::close_code`] for the code.
    Close,
    /// A ping; the host should answer with [`Session::pong`] carrying
    /// the same payload.
    Ping,
    /// A pong, typically unsolicited or answering a prior ping.
    Pong
}

/// A fully-buffered control frame (never larger than 125 bytes, so it
/// is carried inline with no allocation).
#[derive(Debug, Clone)]
pub struct ControlFrame {
    kind: ControlKind,
    len: usize,
    payload: [u8; 125],
    close_code: Option<u16>
}

impl ControlFrame {
    /// The control frame's kind.
    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    /// The raw payload bytes (for `Close`, this excludes the 2-byte
    /// close code — see [`ControlFrame::close_code`] — and is whatever
    /// reason text the peer supplied).
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.len]
    }

    /// The close code, if this is a `Close` frame that carried one.
    pub fn close_code(&self) -> Option<u16> {
        self.close_code
    }
}

/// What a [`Session::receive`] call produced.
#[derive(Debug)]
pub enum Event {
    /// A chunk of a data message. `len` bytes were written at the front
    /// of the caller's destination buffer. `fin` is set on the chunk
    /// that completes the message.
    Data {
        /// Whether this chunk belongs to a text or binary message.
        opcode: DataType,
        /// Set on the chunk that completes the message.
        fin: bool,
        /// Number of bytes written at the front of the caller's destination buffer.
        len: usize
    },
    /// A complete control frame.
    Control(ControlFrame)
}

/// A single WebSocket connection's protocol state, generic over its
/// transport.
pub struct Session<IO> {
    role: Role,
    io: IO,
    config: Config,

    // RX
    rx_state: RxState,
    rx_hdr_accum: [u8; 8],
    rx_hdr_filled: usize,
    rx_fin: bool,
    rx_opcode: OpCode,
    rx_len_code: u8,
    rx_payload_len: u64,
    rx_remaining: u64,
    rx_mask: [u8; 4],
    rx_mask_idx: usize,
    continuation_op: Option<OpCode>,
    current_op: Option<OpCode>,
    utf8_partial: Vec<u8>,

    // control frame staging (reuses rx_mask/rx_mask_idx)
    ctrl_buf: [u8; 125],
    ctrl_filled: usize,

    // TX
    tx_state: TxState,
    tx_buf: Vec<u8>,
    tx_hdr_buf: [u8; 14],
    tx_hdr_filled: usize,
    tx_hdr_total: usize,
    tx_mask: [u8; 4],
    tx_mask_idx: usize,
    tx_msg_offset: u64,
    tx_len: u64,
    tx_chunk_len: usize,
    tx_chunk_sent: usize
}

impl<IO: Io> Session<IO> {
    fn new(role: Role, io: IO, config: Config) -> Self {
        let buffer_size = config.buffer_size;
        Session {
            role,
            io,
            config,
            rx_state: RxState::Header,
            rx_hdr_accum: [0; 8],
            rx_hdr_filled: 0,
            rx_fin: false,
            rx_opcode: OpCode::Continue,
            rx_len_code: 0,
            rx_payload_len: 0,
            rx_remaining: 0,
            rx_mask: [0; 4],
            rx_mask_idx: 0,
            continuation_op: None,
            current_op: None,
            utf8_partial: Vec::with_capacity(3),
            ctrl_buf: [0; 125],
            ctrl_filled: 0,
            tx_state: TxState::Idle,
            tx_buf: vec![0; buffer_size],
            tx_hdr_buf: [0; 14],
            tx_hdr_filled: 0,
            tx_hdr_total: 0,
            tx_mask: [0; 4],
            tx_mask_idx: 0,
            tx_msg_offset: 0,
            tx_len: 0,
            tx_chunk_len: 0,
            tx_chunk_sent: 0
        }
    }

    /// The role this session plays.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Tear the session down, returning the underlying transport.
    pub fn into_inner(self) -> IO {
        self.io
    }

    // ---- receive path -------------------------------------------------

    /// Drive the receive state machine, delivering at most one chunk of
    /// progress into `out` (or surfacing a control frame) per call.
    pub fn receive(&mut self, out: &mut [u8]) -> Result<Outcome<Event>, Error> {
        loop {
            match self.rx_state {
                RxState::Header => {
                    if !fill_accum(&mut self.io, &mut self.rx_hdr_accum, &mut self.rx_hdr_filled, 2)? {
                        return Ok(Outcome::WouldBlock);
                    }
                    self.parse_header()?;
                    self.rx_hdr_filled = 0;
                }
                RxState::ExtLen16 => {
                    if !fill_accum(&mut self.io, &mut self.rx_hdr_accum, &mut self.rx_hdr_filled, 2)? {
                        return Ok(Outcome::WouldBlock);
                    }
                    let len = u16::from_be_bytes([self.rx_hdr_accum[0], self.rx_hdr_accum[1]]);
                    if len < 126 {
                        return Err(Error::BadLen);
                    }
                    self.rx_payload_len = len as u64;
                    self.rx_hdr_filled = 0;
                    self.rx_state = self.state_after_length();
                }
                RxState::ExtLen64 => {
                    if !fill_accum(&mut self.io, &mut self.rx_hdr_accum, &mut self.rx_hdr_filled, 8)? {
                        return Ok(Outcome::WouldBlock);
                    }
                    let mut b = [0u8; 8];
                    b.copy_from_slice(&self.rx_hdr_accum[..8]);
                    let len = u64::from_be_bytes(b);
                    if len < 65536 || len > i64::MAX as u64 {
                        return Err(Error::BadLen);
                    }
                    self.rx_payload_len = len;
                    self.rx_hdr_filled = 0;
                    self.rx_state = self.state_after_length();
                }
                RxState::MaskState => {
                    if !fill_accum(&mut self.io, &mut self.rx_hdr_accum, &mut self.rx_hdr_filled, 4)? {
                        return Ok(Outcome::WouldBlock);
                    }
                    self.rx_mask.copy_from_slice(&self.rx_hdr_accum[..4]);
                    self.rx_mask_idx = 0;
                    self.rx_hdr_filled = 0;
                    self.rx_state = if self.rx_payload_len == 0 && self.rx_opcode.is_control() {
                        self.ctrl_filled = 0;
                        RxState::ControlDispatch
                    } else {
                        RxState::PayloadStart
                    };
                }
                RxState::PayloadStart => {
                    if let Some(max) = self.config.max_payload {
                        if self.rx_payload_len > max {
                            return Err(Error::TooLong { len: self.rx_payload_len, max });
                        }
                    }
                    self.rx_remaining = self.rx_payload_len;
                    self.ctrl_filled = 0;
                    self.rx_state = RxState::PayloadStream;
                }
                RxState::PayloadStream => {
                    if self.rx_opcode.is_control() {
                        match self.stream_control()? {
                            Outcome::Ready(()) => self.rx_state = RxState::ControlDispatch,
                            Outcome::WouldBlock => return Ok(Outcome::WouldBlock)
                        }
                    } else {
                        return self.stream_data(out);
                    }
                }
                RxState::ControlDispatch => {
                    let frame = self.finish_control()?;
                    self.rx_state = RxState::Header;
                    return Ok(Outcome::Ready(Event::Control(frame)));
                }
            }
        }
    }

    fn state_after_length(&mut self) -> RxState {
        if self.role.is_server() {
            RxState::MaskState
        } else if self.rx_payload_len == 0 && self.rx_opcode.is_control() {
            self.ctrl_filled = 0;
            RxState::ControlDispatch
        } else {
            RxState::PayloadStart
        }
    }

    fn parse_header(&mut self) -> Result<(), Error> {
        let b0 = self.rx_hdr_accum[0];
        let b1 = self.rx_hdr_accum[1];

        let fin = b0 & 0x80 != 0;
        let rsv = b0 & 0x70;
        if rsv != 0 {
            return Err(Error::FaultFrame);
        }
        let opcode = OpCode::try_from(b0 & 0x0F).map_err(|_| Error::BadOpCode)?;
        if opcode == OpCode::Reserved {
            return Err(Error::BadOpCode);
        }

        let masked = b1 & 0x80 != 0;
        if self.role.is_server() && !masked {
            return Err(Error::ExpectMask);
        }
        if !self.role.is_server() && masked {
            return Err(Error::UnexpectedMask);
        }
        let len_code = b1 & 0x7F;

        if opcode.is_control() {
            if !fin {
                return Err(Error::FaultFrame);
            }
            if len_code >= 126 {
                return Err(Error::BadLen);
            }
            if opcode == OpCode::Close && len_code <= 1 {
                return Err(Error::BadLen);
            }
        }

        match opcode {
            OpCode::Continue => {
                let op = self.continuation_op.ok_or(Error::FaultFrame)?;
                self.current_op = Some(op);
                if fin {
                    self.continuation_op = None;
                }
            }
            OpCode::Text | OpCode::Binary => {
                if self.continuation_op.is_some() {
                    return Err(Error::FaultFrame);
                }
                if len_code == 0 {
                    return Err(Error::BadLen);
                }
                if !fin {
                    self.continuation_op = Some(opcode);
                }
                self.current_op = Some(opcode);
            }
            OpCode::Close | OpCode::Ping | OpCode::Pong => {
                self.current_op = Some(opcode);
            }
            OpCode::Reserved => unreachable!("rejected above")
        }

        self.rx_fin = fin;
        self.rx_opcode = opcode;
        self.rx_len_code = len_code;

        debug!("rx header: opcode={} fin={} masked={} len_code={}", opcode, fin, masked, len_code);

        self.rx_state = if len_code == 126 {
            RxState::ExtLen16
        } else if len_code == 127 {
            RxState::ExtLen64
        } else {
            self.rx_payload_len = len_code as u64;
            self.state_after_length()
        };
        Ok(())
    }

    fn stream_control(&mut self) -> Result<Outcome<()>, Error> {
        let target = self.rx_payload_len as usize;
        if !fill_buf(&mut self.io, &mut self.ctrl_buf[..target], &mut self.ctrl_filled)? {
            return Ok(Outcome::WouldBlock);
        }
        if self.role.is_server() {
            apply_mask(&mut self.ctrl_buf[..target], &self.rx_mask, &mut self.rx_mask_idx);
        }
        Ok(Outcome::Ready(()))
    }

    fn finish_control(&mut self) -> Result<ControlFrame, Error> {
        let opcode = self.rx_opcode;
        let kind = match opcode {
            OpCode::Close => ControlKind::Close,
            OpCode::Ping => ControlKind::Ping,
            OpCode::Pong => ControlKind::Pong,
            _ => unreachable!("only control opcodes reach finish_control")
        };
        let len = self.ctrl_filled;
        let mut close_code = None;
        let mut reason_start = 0;
        if kind == ControlKind::Close && len >= 2 {
            let code = u16::from_be_bytes([self.ctrl_buf[0], self.ctrl_buf[1]]);
            if !is_valid_close_code(code) {
                return Err(Error::BadCloseCode(code));
            }
            close_code = Some(code);
            reason_start = 2;
        }
        if self.config.utf8_check && reason_start < len && !utf8::is_valid(&self.ctrl_buf[reason_start..len]) {
            return Err(Error::NonUtf8);
        }
        let mut payload = [0u8; 125];
        let payload_len = len - reason_start;
        payload[..payload_len].copy_from_slice(&self.ctrl_buf[reason_start..len]);
        trace!("rx control frame: kind={:?} len={}", kind, payload_len);
        Ok(ControlFrame { kind, len: payload_len, payload, close_code })
    }

    fn stream_data(&mut self, out: &mut [u8]) -> Result<Outcome<Event>, Error> {
        let partial_len = self.utf8_partial.len();
        if out.is_empty() {
            return Err(Error::BadLen);
        }
        let capacity = out.len().saturating_sub(partial_len);
        if capacity == 0 {
            return Err(Error::BadLen);
        }
        out[..partial_len].copy_from_slice(&self.utf8_partial);

        let want = capacity.min(self.rx_remaining as usize);
        let n = if want == 0 {
            0
        } else {
            match self.io.recv(&mut out[partial_len..partial_len + want]) {
                Ok(0) => return Err(Error::Eof),
                Ok(n) => n,
                Err(IoError::WouldBlock) => return Ok(Outcome::WouldBlock),
                Err(IoError::Eof) => return Err(Error::Eof),
                Err(IoError::Other(e)) => return Err(Error::Io(e))
            }
        };
        self.rx_remaining -= n as u64;
        if self.role.is_server() {
            apply_mask(&mut out[partial_len..partial_len + n], &self.rx_mask, &mut self.rx_mask_idx);
        }

        let total = partial_len + n;
        let check_utf8 = self.config.utf8_check && self.current_op == Some(OpCode::Text);
        let delivered = if check_utf8 {
            match utf8::validate_prefix(&out[..total]) {
                utf8::Outcome::Valid => {
                    self.utf8_partial.clear();
                    total
                }
                utf8::Outcome::Incomplete { valid_prefix, .. } => {
                    self.utf8_partial = out[valid_prefix..total].to_vec();
                    valid_prefix
                }
                utf8::Outcome::Invalid { .. } => return Err(Error::NonUtf8)
            }
        } else {
            total
        };

        if self.rx_remaining == 0 {
            let final_fragment = self.rx_fin && self.continuation_op.is_none();
            if !self.utf8_partial.is_empty() && final_fragment {
                return Err(Error::Utf8Incomplete);
            }
            self.rx_state = RxState::Header;
            let data_type = match self.current_op {
                Some(OpCode::Text) => DataType::Text,
                _ => DataType::Binary
            };
            trace!("rx data chunk: {} bytes, fin={}", delivered, self.rx_fin);
            Ok(Outcome::Ready(Event::Data { opcode: data_type, fin: self.rx_fin, len: delivered }))
        } else {
            let data_type = match self.current_op {
                Some(OpCode::Text) => DataType::Text,
                _ => DataType::Binary
            };
            Ok(Outcome::Ready(Event::Data { opcode: data_type, fin: false, len: delivered }))
        }
    }

    // ---- transmit path --------------------------------------------------

    /// Send `buf` as a single TEXT frame. Re-invoke with the exact same
    /// `buf` if this returns [`Outcome::WouldBlock`].
    pub fn send_text(&mut self, buf: &[u8]) -> Result<Outcome<()>, Error> {
        if self.tx_state == TxState::Idle && self.config.utf8_check {
            match utf8::validate_prefix(buf) {
                utf8::Outcome::Valid => {}
                utf8::Outcome::Incomplete { .. } => return Err(Error::Utf8Incomplete),
                utf8::Outcome::Invalid { .. } => return Err(Error::NonUtf8)
            }
        }
        self.send_message(OpCode::Text, buf)
    }

    /// Send `buf` as a single BINARY frame.
    pub fn send_binary(&mut self, buf: &[u8]) -> Result<Outcome<()>, Error> {
        self.send_message(OpCode::Binary, buf)
    }

    /// Send a PING control frame; `buf` must be at most 125 bytes.
    pub fn ping(&mut self, buf: &[u8]) -> Result<Outcome<()>, Error> {
        self.send_control(OpCode::Ping, buf)
    }

    /// Send a PONG control frame; `buf` must be at most 125 bytes.
    pub fn pong(&mut self, buf: &[u8]) -> Result<Outcome<()>, Error> {
        self.send_control(OpCode::Pong, buf)
    }

    /// Send a CLOSE control frame with the given code and reason.
    /// `reason` must be at most 123 bytes so that `2 + reason.len() ≤ 125`.
    pub fn close(&mut self, code: u16, reason: &[u8]) -> Result<Outcome<()>, Error> {
        if reason.len() > 123 {
            return Err(Error::TooLong { len: reason.len() as u64 + 2, max: 125 });
        }
        if self.tx_state == TxState::Idle && self.config.utf8_check && !reason.is_empty() && !utf8::is_valid(reason) {
            return Err(Error::NonUtf8);
        }
        let mut payload = [0u8; 125];
        payload[..2].copy_from_slice(&code.to_be_bytes());
        payload[2..2 + reason.len()].copy_from_slice(reason);
        let len = 2 + reason.len();
        self.send_control_payload(OpCode::Close, &payload[..len])
    }

    fn send_control(&mut self, opcode: OpCode, buf: &[u8]) -> Result<Outcome<()>, Error> {
        if buf.len() > 125 {
            return Err(Error::TooLong { len: buf.len() as u64, max: 125 });
        }
        self.send_control_payload(opcode, buf)
    }

    fn send_control_payload(&mut self, opcode: OpCode, buf: &[u8]) -> Result<Outcome<()>, Error> {
        self.send_message(opcode, buf)
    }

    fn send_message(&mut self, opcode: OpCode, buf: &[u8]) -> Result<Outcome<()>, Error> {
        if self.tx_state == TxState::Idle {
            self.begin_message(opcode, buf)?;
        }
        loop {
            match self.tx_state {
                TxState::Idle => unreachable!("set to Header by begin_message"),
                TxState::Header => {
                    while self.tx_hdr_filled < self.tx_hdr_total {
                        match self.io.send(&self.tx_hdr_buf[self.tx_hdr_filled..self.tx_hdr_total]) {
                            Ok(n) => self.tx_hdr_filled += n,
                            Err(IoError::WouldBlock) => return Ok(Outcome::WouldBlock),
                            Err(IoError::Eof) => return Err(Error::Eof),
                            Err(IoError::Other(e)) => return Err(Error::Io(e))
                        }
                    }
                    self.tx_state = TxState::Payload;
                }
                TxState::Payload => {
                    if self.tx_chunk_len == 0 {
                        if self.tx_msg_offset == self.tx_len {
                            self.tx_state = TxState::Idle;
                            trace!("tx message complete: {} bytes", self.tx_len);
                            return Ok(Outcome::Ready(()));
                        }
                        let offset = self.tx_msg_offset as usize;
                        let want = ((self.tx_len - self.tx_msg_offset) as usize).min(self.tx_buf.len());
                        self.tx_buf[..want].copy_from_slice(&buf[offset..offset + want]);
                        if !self.role.is_server() {
                            apply_mask(&mut self.tx_buf[..want], &self.tx_mask, &mut self.tx_mask_idx);
                        }
                        self.tx_chunk_len = want;
                        self.tx_chunk_sent = 0;
                    }
                    match self.io.send(&self.tx_buf[self.tx_chunk_sent..self.tx_chunk_len]) {
                        Ok(n) => {
                            self.tx_chunk_sent += n;
                            self.tx_msg_offset += n as u64;
                            if self.tx_chunk_sent == self.tx_chunk_len {
                                self.tx_chunk_len = 0;
                            }
                        }
                        Err(IoError::WouldBlock) => return Ok(Outcome::WouldBlock),
                        Err(IoError::Eof) => return Err(Error::Eof),
                        Err(IoError::Other(e)) => return Err(Error::Io(e))
                    }
                }
            }
        }
    }

    fn begin_message(&mut self, opcode: OpCode, buf: &[u8]) -> Result<(), Error> {
        let n = buf.len() as u64;
        let mut hdr = [0u8; 14];
        let mut i;
        hdr[0] = 0x80 | u8::from(opcode);
        let mask_bit = if self.role.is_server() { 0 } else { 0x80 };
        if n < 126 {
            hdr[1] = mask_bit | n as u8;
            i = 2;
        } else if n < 65536 {
            hdr[1] = mask_bit | 126;
            hdr[2..4].copy_from_slice(&(n as u16).to_be_bytes());
            i = 4;
        } else {
            hdr[1] = mask_bit | 127;
            hdr[2..10].copy_from_slice(&n.to_be_bytes());
            i = 10;
        }
        if !self.role.is_server() {
            let mut mask = [0u8; 4];
            rand::thread_rng().fill_bytes(&mut mask);
            hdr[i..i + 4].copy_from_slice(&mask);
            self.tx_mask = mask;
            self.tx_mask_idx = 0;
            i += 4;
        }
        self.tx_hdr_buf = hdr;
        self.tx_hdr_filled = 0;
        self.tx_hdr_total = i;
        self.tx_msg_offset = 0;
        self.tx_len = n;
        self.tx_chunk_len = 0;
        self.tx_chunk_sent = 0;
        self.tx_state = TxState::Header;
        Ok(())
    }
}

/// Read bytes from `io` into `accum[filled..need]`, returning `Ok(true)`
/// once `need` bytes have been accumulated, `Ok(false)` on a would-block
/// signal (with whatever was read so far preserved in `accum`/`filled`).
fn fill_accum<IO: Io>(io: &mut IO, accum: &mut [u8; 8], filled: &mut usize, need: usize) -> Result<bool, Error> {
    while *filled < need {
        match io.recv(&mut accum[*filled..need]) {
            Ok(0) => return Err(Error::Eof),
            Ok(n) => *filled += n,
            Err(IoError::WouldBlock) => return Ok(false),
            Err(IoError::Eof) => return Err(Error::Eof),
            Err(IoError::Other(e)) => return Err(Error::Io(e))
        }
    }
    Ok(true)
}

/// Like [`fill_accum`] but for the variable-length control frame buffer.
fn fill_buf<IO: Io>(io: &mut IO, target: &mut [u8], filled: &mut usize) -> Result<bool, Error> {
    while *filled < target.len() {
        match io.recv(&mut target[*filled..]) {
            Ok(0) => return Err(Error::Eof),
            Ok(n) => *filled += n,
            Err(IoError::WouldBlock) => return Ok(false),
            Err(IoError::Eof) => return Err(Error::Eof),
            Err(IoError::Other(e)) => return Err(Error::Io(e))
        }
    }
    Ok(true)
}

/// RFC 6455 §7.4.1 defined codes plus the IANA-registered (3000-3999)
/// and private-use (4000-4999) ranges. Tightened per design decision:
/// 1004, 1005, 1006 and 1015 are never valid on the wire, and the
/// 1016-2999 sub-range is reserved and rejected rather than merely
/// accepted as the untightened reference does.
fn is_valid_close_code(code: u16) -> bool {
    matches!(code, 1000..=1003 | 1007..=1014 | 3000..=4999)
}
