//! End-to-end scenarios driving two [`Connection`]s against each other
//! through an in-memory, optionally lossy, fake [`NetworkInterface`].
//!
//! `LossyPipe` is not a network simulator - it is a `VecDeque`-backed stand-in
//! with a deterministic drop pattern, just enough to exercise the reliable
//! channel and large-block paths under loss without opening a real socket.

use std::{
    cell::RefCell,
    collections::VecDeque,
    net::{SocketAddr, SocketAddrV4},
    rc::Rc,
};

use bytes::Bytes;
use netcode::{
    io::{error::SocketError, interface::NetworkInterface},
    protocol::{
        block::Block,
        config::{ChannelConfig, ConnectionConfig},
        connection::Connection,
        message::{MessageFactory, MessagePayload},
    },
};

struct LossyPipe {
    address: SocketAddr,
    peer: SocketAddr,
    inbox: Rc<RefCell<VecDeque<Bytes>>>,
    outbox: Rc<RefCell<VecDeque<Bytes>>>,
    max_packet_size: usize,
    sent: u64,
    drop_every_nth: Option<u64>,
}

fn pipe(max_packet_size: usize, drop_every_nth: Option<u64>) -> (LossyPipe, LossyPipe) {
    let a_addr = SocketAddr::V4(SocketAddrV4::new(std::net::Ipv4Addr::new(10, 0, 0, 1), 1));
    let b_addr = SocketAddr::V4(SocketAddrV4::new(std::net::Ipv4Addr::new(10, 0, 0, 2), 2));
    let a_to_b = Rc::new(RefCell::new(VecDeque::new()));
    let b_to_a = Rc::new(RefCell::new(VecDeque::new()));

    let a = LossyPipe {
        address: a_addr,
        peer: b_addr,
        inbox: b_to_a.clone(),
        outbox: a_to_b.clone(),
        max_packet_size,
        sent: 0,
        drop_every_nth,
    };
    let b = LossyPipe {
        address: b_addr,
        peer: a_addr,
        inbox: a_to_b,
        outbox: b_to_a,
        max_packet_size,
        sent: 0,
        drop_every_nth,
    };
    (a, b)
}

impl NetworkInterface for LossyPipe {
    fn send_packet(&mut self, address: SocketAddr, packet: Bytes) -> Result<(), SocketError> {
        assert_eq!(address, self.peer, "LossyPipe only has one peer");
        if packet.len() > self.max_packet_size {
            return Err(SocketError::PacketTooLarge {
                len: packet.len(),
                max: self.max_packet_size,
            });
        }
        self.sent += 1;
        if let Some(n) = self.drop_every_nth {
            if n != 0 && self.sent % n == 0 {
                return Ok(());
            }
        }
        self.outbox.borrow_mut().push_back(packet);
        Ok(())
    }

    fn receive_packet(&mut self) -> Option<(SocketAddr, Bytes)> {
        self.inbox.borrow_mut().pop_front().map(|p| (self.peer, p))
    }

    fn update(&mut self, _time: f64) {}

    fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }
}

/// Advances `(connection, interface)` one tick: writes and sends a packet,
/// then drains and applies every packet waiting in the interface's inbox.
fn tick(connection: &mut Connection, socket: &mut LossyPipe, peer: SocketAddr, time: f64) {
    let packet = connection.write_packet(time);
    let mut buffer = vec![0u8; socket.max_packet_size()];
    let len = connection.serialize_packet(&packet, &mut buffer);
    buffer.truncate(len);
    socket.send_packet(peer, buffer.into()).unwrap();

    while let Some((_from, payload)) = socket.receive_packet() {
        if let Some(packet) = connection.deserialize_packet(&payload) {
            connection.read_packet(packet);
        }
    }
}

fn connection(config: ConnectionConfig) -> Connection {
    init_tracing();
    let factories = config
        .channels
        .iter()
        .map(|c| MessageFactory::new(c.max_message_kind))
        .collect();
    Connection::new(config, factories).unwrap()
}

fn init_tracing() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Scenario S4: 1000 small messages, no loss, expect exact in-order receipt.
#[test]
fn small_message_round_trip_no_loss() {
    let config = ConnectionConfig::default();
    let mut a = connection(config.clone());
    let mut b = connection(config);
    let (mut a_sock, mut b_sock) = pipe(2048, None);

    for i in 0..1000u16 {
        let factory = MessageFactory::new(31);
        let message = factory.create_app(1, Bytes::copy_from_slice(&i.to_le_bytes()));
        a.send_message(0, message).unwrap();
    }

    let mut received = Vec::new();
    for step in 0..2000u32 {
        let time = f64::from(step) * 0.01;
        tick(&mut a, &mut a_sock, a_sock.peer, time);
        tick(&mut b, &mut b_sock, b_sock.peer, time);
        while let Some(message) = b.receive_message(0) {
            received.push(message);
        }
        if received.len() == 1000 {
            break;
        }
    }

    assert_eq!(received.len(), 1000);
    for (i, message) in received.iter().enumerate() {
        match message.payload() {
            MessagePayload::App { payload, .. } => {
                let counter = u16::from_le_bytes([payload[0], payload[1]]);
                assert_eq!(counter, i as u16);
            }
            MessagePayload::Block(_) => panic!("expected an app message"),
        }
    }
}

/// Scenario S5: same as S4, but every other packet in each direction is
/// dropped. Expect completion within a bounded number of ticks.
#[test]
fn small_message_round_trip_under_fifty_percent_loss() {
    let config = ConnectionConfig::default();
    let mut a = connection(config.clone());
    let mut b = connection(config);
    let (mut a_sock, mut b_sock) = pipe(2048, Some(2));

    for i in 0..1000u16 {
        let factory = MessageFactory::new(31);
        let message = factory.create_app(1, Bytes::copy_from_slice(&i.to_le_bytes()));
        a.send_message(0, message).unwrap();
    }

    let mut received = Vec::new();
    for step in 0..10_000u32 {
        let time = f64::from(step) * 0.01;
        tick(&mut a, &mut a_sock, a_sock.peer, time);
        tick(&mut b, &mut b_sock, b_sock.peer, time);
        while let Some(message) = b.receive_message(0) {
            received.push(message);
        }
        if received.len() == 1000 {
            break;
        }
    }

    assert_eq!(received.len(), 1000, "every message eventually arrives despite 50% loss");
    for (i, message) in received.iter().enumerate() {
        assert_eq!(message.id(), i as u16);
    }
}

fn block_channel_config() -> ChannelConfig {
    ChannelConfig {
        resend_rate_millis: 16,
        block_fragment_size: 1024,
        max_small_block_size: 64,
        max_large_block_size: 64 * 1024,
        ..Default::default()
    }
}

fn expected_block_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((10 + i) % 256) as u8).collect()
}

/// Scenario S6: a 10 KiB + 55 byte block, fragment_size = 1024, no loss.
/// Expect complete, byte-exact reassembly.
#[test]
fn large_block_transfer_no_loss() {
    let config = ConnectionConfig {
        max_packet_size: 1400,
        channels: vec![block_channel_config()],
        ..ConnectionConfig::default()
    };
    let mut a = connection(config.clone());
    let mut b = connection(config);
    let (mut a_sock, mut b_sock) = pipe(2048, None);

    let data = expected_block_bytes(10 * 1024 + 55);
    a.send_block(0, Block::new(data.clone())).unwrap();

    let mut reassembled = None;
    for step in 0..5000u32 {
        let time = f64::from(step) / 60.0;
        tick(&mut a, &mut a_sock, a_sock.peer, time);
        tick(&mut b, &mut b_sock, b_sock.peer, time);
        if let Some(message) = b.receive_message(0) {
            reassembled = Some(message);
            break;
        }
    }

    let message = reassembled.expect("block should have been fully reassembled");
    match message.payload() {
        MessagePayload::Block(block) => assert_eq!(block.as_bytes(), &data[..]),
        MessagePayload::App { .. } => panic!("expected a block message"),
    }
}

/// Scenario S6, 50% loss variant: same block transfer, with every other
/// packet in each direction dropped. Expect complete, byte-exact
/// reassembly within a bounded number of ticks.
#[test]
fn large_block_transfer_under_fifty_percent_loss() {
    let config = ConnectionConfig {
        max_packet_size: 1400,
        channels: vec![block_channel_config()],
        ..ConnectionConfig::default()
    };
    let mut a = connection(config.clone());
    let mut b = connection(config);
    let (mut a_sock, mut b_sock) = pipe(2048, Some(2));

    let data = expected_block_bytes(10 * 1024 + 55);
    a.send_block(0, Block::new(data.clone())).unwrap();

    let mut reassembled = None;
    for step in 0..20_000u32 {
        let time = f64::from(step) / 60.0;
        tick(&mut a, &mut a_sock, a_sock.peer, time);
        tick(&mut b, &mut b_sock, b_sock.peer, time);
        if let Some(message) = b.receive_message(0) {
            reassembled = Some(message);
            break;
        }
    }

    let message = reassembled.expect("block should have been fully reassembled despite loss");
    match message.payload() {
        MessagePayload::Block(block) => assert_eq!(block.as_bytes(), &data[..]),
        MessagePayload::App { .. } => panic!("expected a block message"),
    }
}
