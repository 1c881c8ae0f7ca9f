//! Integration tests driving a full client/server handshake followed by
//! a framed message exchange over an in-memory, non-blocking duplex
//! transport — the synchronous analogue of the teacher crate's
//! tokio-driven `tests.rs`, minus the real socket and the executor.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ws_engine::connection::{Builder, DataType, Event, Outcome, Role};
use ws_engine::error::IoError;
use ws_engine::handshake::client::{Client, ServerResponse};
use ws_engine::handshake::server::Server;
use ws_engine::io::Io;

/// One direction of a pipe: bytes written here become readable on the
/// paired `PipeEnd`. `chunk` caps how many bytes move per call, so a
/// chunk of 1 exercises byte-at-a-time partial I/O.
struct PipeEnd {
    outbound: Rc<RefCell<VecDeque<u8>>>,
    inbound: Rc<RefCell<VecDeque<u8>>>,
    chunk: usize
}

fn pipe(chunk: usize) -> (PipeEnd, PipeEnd) {
    let a_to_b = Rc::new(RefCell::new(VecDeque::new()));
    let b_to_a = Rc::new(RefCell::new(VecDeque::new()));
    let a = PipeEnd { outbound: a_to_b.clone(), inbound: b_to_a.clone(), chunk };
    let b = PipeEnd { outbound: b_to_a, inbound: a_to_b, chunk };
    (a, b)
}

impl Io for PipeEnd {
    fn send(&mut self, buf: &[u8]) -> Result<usize, IoError> {
        let n = buf.len().min(self.chunk.max(1));
        self.outbound.borrow_mut().extend(&buf[..n]);
        Ok(n)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        let mut inbound = self.inbound.borrow_mut();
        if inbound.is_empty() {
            return Err(IoError::WouldBlock);
        }
        let n = buf.len().min(self.chunk.max(1)).min(inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = inbound.pop_front().unwrap();
        }
        Ok(n)
    }
}

#[test]
fn full_handshake_then_text_exchange_both_directions() {
    let (client_io, server_io) = pipe(3);
    let mut client = Client::new(client_io, "example.com", "/chat");
    let mut server = Server::new(server_io, "/chat");

    // Drive both state machines to completion, ping-ponging between
    // them since each only makes progress on bytes the other produced.
    let (mut client_done, mut server_done) = (false, false);
    let mut response = None;
    let mut request = None;
    while !client_done || !server_done {
        if !client_done {
            match client.handshake().unwrap() {
                Outcome::Ready(r) => {
                    response = Some(r);
                    client_done = true;
                }
                Outcome::WouldBlock => {}
            }
        }
        if !server_done {
            match server.handshake().unwrap() {
                Outcome::Ready(r) => {
                    request = Some(r);
                    server_done = true;
                }
                Outcome::WouldBlock => {}
            }
        }
    }
    assert_eq!(response.unwrap(), ServerResponse::Accepted);
    assert_eq!(request.unwrap().resource(), "/chat");

    let mut client_session = Builder::new().finish(Role::Client, client.into_inner());
    let mut server_session = Builder::new().finish(Role::Server, server.into_inner());

    client_session.send_text(b"hello from client").unwrap().ready().unwrap();
    let mut out = [0u8; 64];
    let mut received = Vec::new();
    loop {
        match server_session.receive(&mut out).unwrap() {
            Outcome::Ready(Event::Data { opcode, fin, len }) => {
                assert_eq!(opcode, DataType::Text);
                received.extend_from_slice(&out[..len]);
                if fin {
                    break;
                }
            }
            Outcome::Ready(Event::Control(_)) => panic!("unexpected control frame"),
            Outcome::WouldBlock => continue
        }
    }
    assert_eq!(received, b"hello from client");

    server_session.send_text(b"hello from server").unwrap().ready().unwrap();
    let mut received = Vec::new();
    loop {
        match client_session.receive(&mut out).unwrap() {
            Outcome::Ready(Event::Data { opcode, fin, len }) => {
                assert_eq!(opcode, DataType::Text);
                received.extend_from_slice(&out[..len]);
                if fin {
                    break;
                }
            }
            Outcome::Ready(Event::Control(_)) => panic!("unexpected control frame"),
            Outcome::WouldBlock => continue
        }
    }
    assert_eq!(received, b"hello from server");
}

#[test]
fn ping_is_answered_with_pong_carrying_the_same_payload() {
    let (client_io, server_io) = pipe(16);
    let mut client = Client::new(client_io, "example.com", "/");
    let mut server = Server::new(server_io, "/");
    let _ = drive_client_handshake_and_server(&mut client, &mut server);

    let mut client_session = Builder::new().finish(Role::Client, client.into_inner());
    let mut server_session = Builder::new().finish(Role::Server, server.into_inner());

    client_session.ping(b"are you there").unwrap().ready().unwrap();

    let mut out = [0u8; 64];
    let control = loop {
        match server_session.receive(&mut out).unwrap() {
            Outcome::Ready(Event::Control(c)) => break c,
            Outcome::Ready(Event::Data { .. }) => panic!("unexpected data frame"),
            Outcome::WouldBlock => continue
        }
    };
    assert_eq!(control.payload(), b"are you there");
    server_session.pong(control.payload()).unwrap().ready().unwrap();

    let control = loop {
        match client_session.receive(&mut out).unwrap() {
            Outcome::Ready(Event::Control(c)) => break c,
            Outcome::Ready(Event::Data { .. }) => panic!("unexpected data frame"),
            Outcome::WouldBlock => continue
        }
    };
    assert_eq!(control.payload(), b"are you there");
}

#[test]
fn fragmented_binary_message_reassembles_over_the_wire() {
    let (client_io, server_io) = pipe(5);
    let mut client = Client::new(client_io, "example.com", "/");
    let mut server = Server::new(server_io, "/");
    drive_client_handshake_and_server(&mut client, &mut server);

    let mut server_session = Builder::new().finish(Role::Server, server.into_inner());
    let mut client_session = Builder::new().finish(Role::Client, client.into_inner());

    client_session.send_binary(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap().ready().unwrap();

    let mut out = [0u8; 4];
    let mut received = Vec::new();
    loop {
        match server_session.receive(&mut out).unwrap() {
            Outcome::Ready(Event::Data { opcode, fin, len }) => {
                assert_eq!(opcode, DataType::Binary);
                received.extend_from_slice(&out[..len]);
                if fin {
                    break;
                }
            }
            Outcome::Ready(Event::Control(_)) => panic!("unexpected control frame"),
            Outcome::WouldBlock => continue
        }
    }
    assert_eq!(received, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
}

#[test]
fn close_handshake_carries_code_and_reason() {
    let (client_io, server_io) = pipe(7);
    let mut client = Client::new(client_io, "example.com", "/");
    let mut server = Server::new(server_io, "/");
    drive_client_handshake_and_server(&mut client, &mut server);

    let mut client_session = Builder::new().finish(Role::Client, client.into_inner());
    let mut server_session = Builder::new().finish(Role::Server, server.into_inner());

    client_session.close(1000, b"bye").unwrap().ready().unwrap();

    let mut out = [0u8; 64];
    let control = loop {
        match server_session.receive(&mut out).unwrap() {
            Outcome::Ready(Event::Control(c)) => break c,
            Outcome::Ready(Event::Data { .. }) => panic!("unexpected data frame"),
            Outcome::WouldBlock => continue
        }
    };
    assert_eq!(control.close_code(), Some(1000));
    assert_eq!(control.payload(), b"bye");
}

fn drive_client_handshake_and_server(
    client: &mut Client<PipeEnd>,
    server: &mut Server<PipeEnd>
) -> (ServerResponse, ws_engine::handshake::server::ClientRequest) {
    let (mut client_done, mut server_done) = (false, false);
    let mut response = None;
    let mut request = None;
    while !client_done || !server_done {
        if !client_done {
            if let Outcome::Ready(r) = client.handshake().unwrap() {
                response = Some(r);
                client_done = true;
            }
        }
        if !server_done {
            if let Outcome::Ready(r) = server.handshake().unwrap() {
                request = Some(r);
                server_done = true;
            }
        }
    }
    (response.unwrap(), request.unwrap())
}

/// Invariant 1 (spec §8): encoding arbitrary non-empty bytes as a
/// single binary frame and decoding them back, client-to-server,
/// always yields the original bytes unchanged. A zero-length payload
/// is excluded: a zero-length DATA frame is rejected on the wire (see
/// `parse_header`), matching `ws.c`.
#[quickcheck_macros::quickcheck]
fn binary_round_trip_client_to_server(payload: Vec<u8>) -> bool {
    if payload.is_empty() {
        return true;
    }

    let (client_io, server_io) = pipe(64);
    let mut client_session = Builder::new().finish(Role::Client, client_io);
    let mut server_session = Builder::new().finish(Role::Server, server_io);

    if client_session.send_binary(&payload).unwrap().ready().is_none() {
        return false;
    }

    let mut out = vec![0u8; payload.len().max(1)];
    let mut received = Vec::new();
    loop {
        match server_session.receive(&mut out).unwrap() {
            Outcome::Ready(Event::Data { opcode, fin, len }) => {
                if opcode != DataType::Binary {
                    return false;
                }
                received.extend_from_slice(&out[..len]);
                if fin {
                    break;
                }
            }
            Outcome::Ready(Event::Control(_)) => return false,
            Outcome::WouldBlock => continue
        }
    }
    received == payload
}
