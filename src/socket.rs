
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, trace, warn};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;

use wire::chunk::{self, Chunk};
use wire::collector::ChunkCollector;
use wire::packet::{IncomingPacket, OutgoingPacket};
use wire::signal::{self, RejectionReason, Signal, SignalKind};

use crate::error::{Error, IoError, Result};

const RECV_BUFFER_SIZE: usize = 2048;
const PRUNE_INTERVAL: Duration = Duration::from_secs(1);
const EVENT_CHANNEL_SIZE: usize = 64;

/// A parsed control message together with its source address.
#[derive(Debug, Clone)]
pub struct IncomingSignal {
    pub sender: SocketAddr,
    pub signal: Signal,
}

/// A single UDP endpoint speaking the SLIM protocol.
///
/// One dispatch task services the socket: each arriving datagram is
/// classified by its leading magic as a chunk or a signal, chunks feed the
/// reassembly collector, and the two event streams surface reassembled
/// packets and parsed signals. Malformed traffic never reaches either
/// stream; where the offending snowflake is known a rejection signal is
/// returned to the source instead.
///
/// The socket is single-use: once closed it cannot be bound again.
pub struct SlimSocket {
    socket: Mutex<Option<Arc<UdpSocket>>>,
    remote: Mutex<Option<SocketAddr>>,
    collector: Arc<Mutex<ChunkCollector>>,
    packet_tx: broadcast::Sender<IncomingPacket>,
    signal_tx: broadcast::Sender<IncomingSignal>,
    close_notify: CancellationToken,
    closed: AtomicBool,
}

impl Default for SlimSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl SlimSocket {
    pub fn new() -> Self {
        let (packet_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (signal_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        SlimSocket {
            socket: Mutex::new(None),
            remote: Mutex::new(None),
            collector: Arc::new(Mutex::new(ChunkCollector::new())),
            packet_tx,
            signal_tx,
            close_notify: CancellationToken::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Binds in server mode to the given local address and starts the
    /// dispatch loop.
    pub async fn start(&self, local: SocketAddr) -> Result<()> {
        self.bind(local, None).await
    }

    /// Binds in client mode to an ephemeral local port, remembering
    /// `remote` as the peer this socket talks to.
    pub async fn connect(&self, remote: SocketAddr) -> Result<()> {
        let local = if remote.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        self.bind(local, Some(remote)).await
    }

    async fn bind(&self, local: SocketAddr, remote: Option<SocketAddr>) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ErrAlreadyClosed);
        }
        let mut slot = self.socket.lock().await;
        if slot.is_some() {
            return Err(Error::ErrAlreadyBound);
        }
        let socket = Arc::new(
            UdpSocket::bind(local)
                .await
                .map_err(|e| Error::ErrBindFailed(IoError(e)))?,
        );
        debug!("bound to {:?}", socket.local_addr());
        *slot = Some(Arc::clone(&socket));
        drop(slot);
        *self.remote.lock().await = remote;

        self.spawn_dispatch_loop(socket);
        Ok(())
    }

    fn spawn_dispatch_loop(&self, socket: Arc<UdpSocket>) {
        let collector = Arc::clone(&self.collector);
        let packet_tx = self.packet_tx.clone();
        let signal_tx = self.signal_tx.clone();
        let close_notify = self.close_notify.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            let mut prune_tick = interval(PRUNE_INTERVAL);

            loop {
                tokio::select! {
                    biased;

                    _ = close_notify.cancelled() => {
                        debug!("exiting dispatch loop");
                        break;
                    }
                    _ = prune_tick.tick() => {
                        let evicted = { collector.lock().await.prune() };
                        for (sender, snowflake) in evicted {
                            debug!("reassembly of {snowflake} timed out");
                            let rejection = Signal::rejected(snowflake, Some(RejectionReason::Timeout));
                            if let Err(err) = socket.send_to(&rejection.marshal(), sender).await {
                                warn!("failed to send timeout rejection to {sender}: {err}");
                            }
                        }
                    }
                    result = socket.recv_from(&mut buf) => {
                        let (n, sender) = match result {
                            Ok(v) => v,
                            Err(err) => {
                                warn!("exiting dispatch loop: {err}");
                                break;
                            }
                        };
                        Self::handle_datagram(&socket, &collector, &packet_tx, &signal_tx, &buf[..n], sender).await;
                    }
                }
            }
        });
    }

    async fn handle_datagram(
        socket: &UdpSocket,
        collector: &Mutex<ChunkCollector>,
        packet_tx: &broadcast::Sender<IncomingPacket>,
        signal_tx: &broadcast::Sender<IncomingSignal>,
        data: &[u8],
        sender: SocketAddr,
    ) {
        if chunk::is_chunk(data) {
            let raw = Bytes::copy_from_slice(data);
            let result = match Chunk::unmarshal(&raw) {
                Ok(chunk) => collector.lock().await.add_chunk(sender, chunk),
                Err(err) => Err(err),
            };
            match result {
                Ok(None) => {}
                Ok(Some(packet)) => {
                    trace!("reassembled packet {} from {sender}", packet.snowflake());
                    // acknowledge before the packet event goes out
                    let ack = Signal::acknowledged(packet.snowflake());
                    if let Err(err) = socket.send_to(&ack.marshal(), sender).await {
                        warn!("failed to acknowledge {}: {err}", packet.snowflake());
                    }
                    let _ = packet_tx.send(packet);
                }
                Err(err) => {
                    debug!("dropping chunk from {sender}: {err}");
                    if let Some((snowflake, reason)) = err.rejection() {
                        let rejection = Signal::rejected(snowflake, Some(reason));
                        if let Err(err) = socket.send_to(&rejection.marshal(), sender).await {
                            warn!("failed to send rejection to {sender}: {err}");
                        }
                    }
                }
            }
        } else if signal::is_signal(data) {
            let raw = Bytes::copy_from_slice(data);
            match Signal::unmarshal(&raw) {
                Ok(signal) => {
                    trace!("received {} signal from {sender}", signal.kind());
                    if signal.kind() == SignalKind::Ping {
                        if let Err(err) = socket.send_to(&Signal::pong().marshal(), sender).await {
                            warn!("failed to send pong to {sender}: {err}");
                        }
                    }
                    let _ = signal_tx.send(IncomingSignal { sender, signal });
                }
                Err(err) => debug!("dropping signal from {sender}: {err}"),
            }
        } else {
            trace!("dropping {}-byte datagram from {sender}: unknown format", data.len());
        }
    }

    async fn handle(&self) -> Result<Arc<UdpSocket>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ErrAlreadyClosed);
        }
        self.socket
            .lock()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or(Error::ErrNotBound)
    }

    pub async fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.handle().await?.local_addr()?)
    }

    /// The peer a client-mode socket was connected to.
    pub async fn remote_addr(&self) -> Option<SocketAddr> {
        *self.remote.lock().await
    }

    /// Packs, chunkifies, and sends a packet, one datagram per chunk.
    pub async fn send(&self, target: SocketAddr, packet: &OutgoingPacket) -> Result<()> {
        let socket = self.handle().await?;
        for chunk in packet.chunkify() {
            socket
                .send_to(&chunk.marshal(), target)
                .await
                .map_err(|e| Error::ErrSendFailed(IoError(e)))?;
        }
        Ok(())
    }

    /// Sends a packed signal in a single datagram.
    pub async fn send_signal(&self, target: SocketAddr, signal: &Signal) -> Result<()> {
        let socket = self.handle().await?;
        socket
            .send_to(&signal.marshal(), target)
            .await
            .map_err(|e| Error::ErrSendFailed(IoError(e)))?;
        Ok(())
    }

    /// A stream of reassembled incoming packets. Every receiver sees every
    /// packet delivered after it subscribed; a slow receiver lags on its
    /// own queue without affecting the dispatch loop or other receivers.
    pub fn packet_stream(&self) -> broadcast::Receiver<IncomingPacket> {
        self.packet_tx.subscribe()
    }

    /// A stream of parsed incoming signals, in arrival order.
    pub fn signal_stream(&self) -> broadcast::Receiver<IncomingSignal> {
        self.signal_tx.subscribe()
    }

    /// Spawns a consumer task invoking `callback` for every reassembled
    /// packet delivered from now on. Each listener runs in its own task; a
    /// panicking or lagging callback cannot stall the dispatch loop or
    /// starve other listeners.
    pub fn listen<F>(&self, mut callback: F)
    where
        F: FnMut(IncomingPacket) + Send + 'static,
    {
        let mut stream = self.packet_tx.subscribe();
        tokio::spawn(async move {
            loop {
                match stream.recv().await {
                    Ok(packet) => callback(packet),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("packet listener lagged, {missed} packets skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Tears the socket down, discarding pending reassemblies. Idempotent;
    /// afterwards `start`/`connect`/`send` fail with
    /// [`Error::ErrAlreadyClosed`].
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.close_notify.cancel();
        *self.socket.lock().await = None;
        self.collector.lock().await.clear();
        debug!("socket closed");
        Ok(())
    }
}
