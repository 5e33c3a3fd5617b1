//! Non-blocking datagram sockets.
//!
//! The resolver engine never waits for its socket. It sends queries right
//! away and receives a single datagram whenever it is told the socket is
//! readable. Both operations return [`io::ErrorKind::WouldBlock`] if they
//! can’t complete immediately.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

//------------ DgramSocket ---------------------------------------------------

/// A non-blocking datagram socket.
pub trait DgramSocket {
    /// Sends a datagram to `target`.
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Receives a single datagram.
    ///
    /// Returns the length of the datagram and where it came from. Returns
    /// an error of kind `WouldBlock` if no datagram is waiting.
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

impl<T: DgramSocket + ?Sized> DgramSocket for Arc<T> {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        (**self).send_to(buf, target)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        (**self).recv_from(buf)
    }
}

/// The std socket must have been put into non-blocking mode.
impl DgramSocket for UdpSocket {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf)
    }
}

#[cfg(feature = "net")]
impl DgramSocket for tokio::net::UdpSocket {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.try_send_to(buf, target)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.try_recv_from(buf)
    }
}

//------------ MemorySocket --------------------------------------------------

/// A datagram socket in memory.
///
/// Sent datagrams are collected for inspection and received datagrams are
/// taken from a queue filled via [`deliver`][Self::deliver]. Clones share
/// both queues. This is useful for testing code using the resolver without
/// any network access.
#[derive(Clone, Debug, Default)]
pub struct MemorySocket {
    inner: Arc<Mutex<MemoryQueues>>,
}

#[derive(Debug, Default)]
struct MemoryQueues {
    sent: VecDeque<(Vec<u8>, SocketAddr)>,
    inbox: VecDeque<(Vec<u8>, SocketAddr)>,
    fail_send: bool,
}

impl MemorySocket {
    /// Creates a new socket with empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a datagram from `source` for receiving.
    pub fn deliver(&self, data: impl Into<Vec<u8>>, source: SocketAddr) {
        self.inner.lock().inbox.push_back((data.into(), source))
    }

    /// Takes the oldest sent datagram and its destination.
    pub fn take_sent(&self) -> Option<(Vec<u8>, SocketAddr)> {
        self.inner.lock().sent.pop_front()
    }

    /// Returns the number of sent datagrams not yet taken.
    pub fn sent_len(&self) -> usize {
        self.inner.lock().sent.len()
    }

    /// Makes all following sends fail if `fail` is true.
    pub fn set_fail_send(&self, fail: bool) {
        self.inner.lock().fail_send = fail
    }
}

impl DgramSocket for MemorySocket {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        let mut inner = self.inner.lock();
        if inner.fail_send {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "send failure",
            ));
        }
        inner.sent.push_back((buf.into(), target));
        Ok(buf.len())
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let (data, source) = match self.inner.lock().inbox.pop_front() {
            Some(item) => item,
            None => return Err(io::ErrorKind::WouldBlock.into()),
        };
        // Like a real datagram socket, excess data is discarded.
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok((len, source))
    }
}

//============ Testing =======================================================
