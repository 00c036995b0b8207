//! UDP front-end framing for the conversational loop: fixed datagram
//! layout, an acknowledgment handshake, and a receive/transmit worker
//! pair each running its own thread over a shared bounded queue. See
//! `spec.md` §4.9 and §6.

mod frame;
mod queue;

pub use frame::{Frame, Prefix};

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use queue::BoundedQueue;

/// Total datagram size, matching the original's `DATA_CAPACITY`.
pub const DATA_CAPACITY: usize = 1536;
pub const MAX_PAYLOAD: usize = DATA_CAPACITY - 4 - 1;
pub const ACK: &[u8] = b"OK";

#[derive(Error, Debug)]
pub enum NetError {
    #[error("socket error: {0}")]
    Socket(String),
    #[error("bind failed: {0}")]
    Bind(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("recv failed: {0}")]
    Recv(String),
    #[error("malformed datagram: {0}")]
    Frame(String),
}

pub type Result<T> = std::result::Result<T, NetError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub queue_capacity: usize,
    pub send_interval_ms: u64,
    pub ack_timeout_ms: u64,
    pub recv_timeout_ms: u64,
}

impl Default for NetConfig {
    fn default() -> Self {
        NetConfig {
            queue_capacity: 32,
            send_interval_ms: 250,
            ack_timeout_ms: 2000,
            recv_timeout_ms: 100,
        }
    }
}

struct Shared {
    socket: UdpSocket,
    queue: BoundedQueue<Frame>,
    stop: AtomicBool,
    live: AtomicBool,
    error: Mutex<Option<String>>,
}

impl Shared {
    fn set_error(&self, message: impl Into<String>) {
        *self.error.lock() = Some(message.into());
    }
}

fn join_worker(worker: &Mutex<Option<JoinHandle<()>>>, stop: &AtomicBool) {
    stop.store(true, Ordering::Release);
    if let Some(handle) = worker.lock().take() {
        let _ = handle.join();
    }
}

/// Listens on a UDP port, queuing every well-formed datagram it
/// receives and acknowledging it with the literal `OK`.
pub struct Receiver {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Receiver {
    pub fn start(port: u16, config: &NetConfig) -> Result<Receiver> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).map_err(|e| NetError::Bind(e.to_string()))?;
        socket
            .set_read_timeout(Some(Duration::from_millis(config.recv_timeout_ms)))
            .map_err(|e| NetError::Socket(e.to_string()))?;

        let shared = Arc::new(Shared {
            socket,
            queue: BoundedQueue::new(config.queue_capacity),
            stop: AtomicBool::new(false),
            live: AtomicBool::new(true),
            error: Mutex::new(None),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("gnosis-net-receiver".into())
            .spawn(move || receive_loop(worker_shared))
            .expect("failed to spawn receiver thread");

        info!(port, "receiver started");
        Ok(Receiver {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn live(&self) -> bool {
        self.shared.live.load(Ordering::Acquire)
    }

    pub fn error(&self) -> Option<String> {
        self.shared.error.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.is_empty()
    }

    pub fn pull(&self) -> Option<Frame> {
        self.shared.queue.pull()
    }

    pub fn stop(&self) {
        join_worker(&self.worker, &self.shared.stop);
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop(shared: Arc<Shared>) {
    let mut buf = [0u8; DATA_CAPACITY];
    while !shared.stop.load(Ordering::Acquire) {
        if shared.queue.is_full() {
            thread::sleep(Duration::from_millis(10));
            continue;
        }
        match shared.socket.recv_from(&mut buf) {
            Ok((len, peer)) => {
                if let Err(e) = shared.socket.send_to(ACK, peer) {
                    shared.set_error(format!("ack failed: {e}"));
                    continue;
                }
                match Frame::decode(&buf[..len]) {
                    Ok(frame) => {
                        if !shared.queue.push(frame) {
                            warn!("receive queue full, dropping datagram");
                        }
                    }
                    Err(e) => warn!(error = %e, "dropped malformed datagram"),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => shared.set_error(format!("recv failed: {e}")),
        }
    }
    shared.live.store(false, Ordering::Release);
    debug!("receiver thread stopped");
}

/// Sends queued frames to a fixed peer, retrying on a fixed throttle
/// until the peer's `OK` acknowledgment arrives or the timeout elapses.
pub struct Transmitter {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Transmitter {
    pub fn start(peer: impl ToSocketAddrs, config: &NetConfig) -> Result<Transmitter> {
        let peer_addr: SocketAddr = peer
            .to_socket_addrs()
            .map_err(|e| NetError::Socket(e.to_string()))?
            .next()
            .ok_or_else(|| NetError::Socket("no address resolved for peer".into()))?;

        let socket = UdpSocket::bind(("0.0.0.0", 0)).map_err(|e| NetError::Bind(e.to_string()))?;
        socket
            .set_read_timeout(Some(Duration::from_millis(config.ack_timeout_ms)))
            .map_err(|e| NetError::Socket(e.to_string()))?;

        let shared = Arc::new(Shared {
            socket,
            queue: BoundedQueue::new(config.queue_capacity),
            stop: AtomicBool::new(false),
            live: AtomicBool::new(true),
            error: Mutex::new(None),
        });

        let worker_shared = Arc::clone(&shared);
        let send_interval = Duration::from_millis(config.send_interval_ms);
        let ack_timeout = Duration::from_millis(config.ack_timeout_ms);
        let handle = thread::Builder::new()
            .name("gnosis-net-transmitter".into())
            .spawn(move || transmit_loop(worker_shared, peer_addr, send_interval, ack_timeout))
            .expect("failed to spawn transmitter thread");

        info!(peer = %peer_addr, "transmitter started");
        Ok(Transmitter {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn live(&self) -> bool {
        self.shared.live.load(Ordering::Acquire)
    }

    pub fn error(&self) -> Option<String> {
        self.shared.error.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.is_empty()
    }

    /// Queues `frame` for delivery. Returns `false` if the outgoing
    /// queue is already at capacity.
    pub fn push(&self, frame: Frame) -> bool {
        self.shared.queue.push(frame)
    }

    pub fn clear(&self) {
        self.shared.queue.clear();
    }

    pub fn stop(&self) {
        join_worker(&self.worker, &self.shared.stop);
    }
}

impl Drop for Transmitter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn transmit_loop(shared: Arc<Shared>, peer: SocketAddr, send_interval: Duration, ack_timeout: Duration) {
    let mut ack_buf = [0u8; ACK.len()];
    while !shared.stop.load(Ordering::Acquire) {
        thread::sleep(send_interval);
        let Some(frame) = shared.queue.pull() else {
            continue;
        };
        let encoded = frame.encode();
        if let Err(e) = shared.socket.send_to(&encoded, peer) {
            shared.set_error(format!("send failed: {e}"));
            shared.queue.push(frame); // :retry on the next tick
            continue;
        }

        let deadline = Instant::now() + ack_timeout;
        let mut acked = false;
        while Instant::now() < deadline {
            match shared.socket.recv_from(&mut ack_buf) {
                Ok((len, _)) if &ack_buf[..len] == ACK => {
                    acked = true;
                    break;
                }
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                    break;
                }
                Err(e) => {
                    shared.set_error(format!("recv ack failed: {e}"));
                    break;
                }
            }
        }
        if !acked {
            warn!("ack not received within timeout, will retry");
            shared.queue.push(frame);
        }
    }
    shared.live.store(false, Ordering::Release);
    debug!("transmitter thread stopped");
}

/// A bidirectional UDP endpoint pairing one [`Receiver`] bound to
/// `port` with one [`Transmitter`] aimed at `peer`.
pub struct Channel {
    receiver: Receiver,
    transmitter: Transmitter,
}

const CHANNEL_START_TIMEOUT: Duration = Duration::from_millis(1000);

impl Channel {
    pub fn open(port: u16, peer: impl ToSocketAddrs, config: &NetConfig) -> Result<Channel> {
        let receiver = Receiver::start(port, config)?;
        let transmitter = Transmitter::start(peer, config)?;

        let started = Instant::now();
        while started.elapsed() < CHANNEL_START_TIMEOUT {
            if receiver.live() && transmitter.live() {
                break;
            }
            thread::yield_now();
        }
        Ok(Channel { receiver, transmitter })
    }

    pub fn live(&self) -> bool {
        self.receiver.live() && self.transmitter.live()
    }

    pub fn error(&self) -> Option<String> {
        match (self.receiver.error(), self.transmitter.error()) {
            (None, None) => None,
            (a, b) => Some(format!("{}; {}", a.unwrap_or_default(), b.unwrap_or_default())),
        }
    }

    pub fn empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn done(&self) -> bool {
        self.transmitter.is_empty()
    }

    pub fn pull(&self) -> Option<Frame> {
        self.receiver.pull()
    }

    pub fn push(&self, frame: Frame) -> bool {
        self.transmitter.push(frame)
    }

    pub fn stop(&self) {
        self.transmitter.stop();
        self.receiver.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiver_and_transmitter_exchange_an_acked_frame() {
        let config = NetConfig {
            queue_capacity: 4,
            send_interval_ms: 10,
            ack_timeout_ms: 500,
            recv_timeout_ms: 20,
        };

        let receiver = Receiver::start(0, &config).unwrap();
        let receiver_port = receiver.shared.socket.local_addr().unwrap().port();

        let transmitter = Transmitter::start(("127.0.0.1", receiver_port), &config).unwrap();
        let frame = Frame::new(*b"0001", Prefix::OriginalText, b"ping".to_vec()).unwrap();
        assert!(transmitter.push(frame.clone()));

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut received = None;
        while Instant::now() < deadline {
            if let Some(f) = receiver.pull() {
                received = Some(f);
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(received, Some(frame));
    }

    #[test]
    fn transmitter_queue_respects_capacity() {
        let config = NetConfig {
            queue_capacity: 1,
            send_interval_ms: 10_000, // :never drains within this test
            ..NetConfig::default()
        };
        let transmitter = Transmitter::start(("127.0.0.1", 59999), &config).unwrap();
        let a = Frame::new(*b"0001", Prefix::Info, b"a".to_vec()).unwrap();
        let b = Frame::new(*b"0002", Prefix::Info, b"b".to_vec()).unwrap();
        assert!(transmitter.push(a));
        assert!(!transmitter.push(b));
    }
}
