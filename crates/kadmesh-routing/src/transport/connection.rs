//! Stream multiplexing over one secured connection.
//!
//! A reader task demultiplexes incoming frames into per-stream channels; a
//! writer task drains a single outbound queue. Either task ending marks the
//! connection closed and stops the other.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::messages::{decode, encode, Frame, Message, StreamKind};
use super::secure::{SecureChannel, SecureReader, SecureWriter};
use super::TransportError;
use crate::domain::PeerId;
use crate::ports::MessageStream;

type StreamMap = Arc<Mutex<HashMap<u32, mpsc::UnboundedSender<Message>>>>;

/// Which side established the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionDirection {
    /// We dialed.
    Outbound,
    /// We accepted.
    Inbound,
}

/// Stream opened by the remote side.
pub struct IncomingStream {
    /// Stream purpose announced in the open frame.
    pub kind: StreamKind,
    /// The stream itself.
    pub stream: MuxStream,
}

/// Authenticated, multiplexed connection to one peer.
pub struct Connection {
    remote: PeerId,
    direction: ConnectionDirection,
    outbound: mpsc::UnboundedSender<Frame>,
    streams: StreamMap,
    next_stream_id: AtomicU32,
    closed: Arc<watch::Sender<bool>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Connection {
    /// Start the reader and writer tasks for an authenticated channel.
    ///
    /// Returns the connection and the queue of streams opened by the remote.
    pub fn spawn<S>(
        remote: PeerId,
        direction: ConnectionDirection,
        channel: SecureChannel<S>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<IncomingStream>)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let streams: StreamMap = Arc::new(Mutex::new(HashMap::new()));
        let (closed_tx, _) = watch::channel(false);
        let closed = Arc::new(closed_tx);

        let first_stream_id = match direction {
            ConnectionDirection::Outbound => 1,
            ConnectionDirection::Inbound => 2,
        };

        let reader = tokio::spawn(read_loop(
            channel.reader,
            first_stream_id % 2,
            Arc::clone(&streams),
            outbound_tx.clone(),
            incoming_tx,
            Arc::clone(&closed),
        ));
        let writer = tokio::spawn(write_loop(channel.writer, outbound_rx, Arc::clone(&closed)));

        let connection = Arc::new(Self {
            remote,
            direction,
            outbound: outbound_tx,
            streams,
            next_stream_id: AtomicU32::new(first_stream_id),
            closed,
            tasks: Mutex::new(vec![reader, writer]),
        });
        (connection, incoming_rx)
    }

    /// Authenticated remote identity.
    pub fn remote(&self) -> &PeerId {
        &self.remote
    }

    /// Which side established the connection.
    pub fn direction(&self) -> ConnectionDirection {
        self.direction
    }

    /// Open a new stream of the given kind.
    ///
    /// # Errors
    ///
    /// `ConnectionClosed` once the connection is gone.
    pub fn open_stream(&self, kind: StreamKind) -> Result<MuxStream, TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed);
        }
        let stream_id = self.next_stream_id.fetch_add(2, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams.lock().insert(stream_id, tx);
        self.outbound
            .send(Frame::Open { stream_id, kind })
            .map_err(|_| TransportError::ConnectionClosed)?;
        Ok(MuxStream::new(
            stream_id,
            self.outbound.clone(),
            rx,
            Arc::clone(&self.streams),
        ))
    }

    /// Whether the connection has shut down.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolve once the connection has shut down.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        wait_closed(&mut rx).await;
    }

    /// Shut the connection down and drop the socket.
    pub fn close(&self) {
        self.closed.send_replace(true);
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.streams.lock().clear();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("remote", &self.remote)
            .field("direction", &self.direction)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

async fn wait_closed(rx: &mut watch::Receiver<bool>) {
    // Errors only once the sender is gone, which also means closed.
    let _ = rx.wait_for(|closed| *closed).await;
}

async fn read_loop<R>(
    mut reader: SecureReader<R>,
    local_parity: u32,
    streams: StreamMap,
    outbound: mpsc::UnboundedSender<Frame>,
    incoming: mpsc::UnboundedSender<IncomingStream>,
    closed: Arc<watch::Sender<bool>>,
) where
    R: AsyncRead + Unpin + Send,
{
    let mut closed_rx = closed.subscribe();
    loop {
        let received = tokio::select! {
            received = reader.recv() => received,
            _ = wait_closed(&mut closed_rx) => break,
        };
        let bytes = match received {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("remote closed connection");
                break;
            }
            Err(e) => {
                debug!(error = %e, "connection read failed");
                break;
            }
        };
        let frame: Frame = match decode(&bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "malformed frame; closing connection");
                break;
            }
        };

        match frame {
            Frame::Open { stream_id, kind } => {
                let (tx, rx) = mpsc::unbounded_channel();
                let claimed = {
                    let mut streams = streams.lock();
                    // Remote ids carry the other parity and must be fresh.
                    let owned = stream_id % 2 != local_parity && !streams.contains_key(&stream_id);
                    if owned {
                        streams.insert(stream_id, tx);
                    }
                    owned
                };
                if !claimed {
                    warn!(stream_id, "remote opened a stream id it does not own; closing connection");
                    break;
                }
                let stream = MuxStream::new(stream_id, outbound.clone(), rx, Arc::clone(&streams));
                if incoming.send(IncomingStream { kind, stream }).is_err() {
                    trace!(stream_id, "no acceptor for incoming stream");
                }
            }
            Frame::Data { stream_id, message } => {
                let tx = streams.lock().get(&stream_id).cloned();
                match tx {
                    Some(tx) => {
                        let _ = tx.send(message);
                    }
                    None => trace!(stream_id, "data for unknown stream"),
                }
            }
            Frame::Close { stream_id } => {
                streams.lock().remove(&stream_id);
            }
        }
    }

    streams.lock().clear();
    closed.send_replace(true);
}

async fn write_loop<W>(
    mut writer: SecureWriter<W>,
    mut frames: mpsc::UnboundedReceiver<Frame>,
    closed: Arc<watch::Sender<bool>>,
) where
    W: AsyncWrite + Unpin + Send,
{
    let mut closed_rx = closed.subscribe();
    loop {
        let frame = tokio::select! {
            frame = frames.recv() => frame,
            _ = wait_closed(&mut closed_rx) => break,
        };
        let Some(frame) = frame else { break };

        let sent = match encode(&frame) {
            Ok(bytes) => writer.send(&bytes).await,
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            debug!(error = %e, "connection write failed");
            break;
        }
    }
    closed.send_replace(true);
}

/// One bidirectional stream of a [`Connection`].
///
/// Dropping the stream tells the remote side it is finished.
pub struct MuxStream {
    id: u32,
    outbound: mpsc::UnboundedSender<Frame>,
    inbound: mpsc::UnboundedReceiver<Message>,
    streams: StreamMap,
}

impl MuxStream {
    fn new(
        id: u32,
        outbound: mpsc::UnboundedSender<Frame>,
        inbound: mpsc::UnboundedReceiver<Message>,
        streams: StreamMap,
    ) -> Self {
        Self {
            id,
            outbound,
            inbound,
            streams,
        }
    }

    /// Stream identifier.
    pub fn id(&self) -> u32 {
        self.id
    }
}

#[async_trait]
impl MessageStream for MuxStream {
    async fn send_msg(&mut self, message: Message) -> Result<(), TransportError> {
        self.outbound
            .send(Frame::Data {
                stream_id: self.id,
                message,
            })
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn recv_msg(&mut self) -> Result<Option<Message>, TransportError> {
        Ok(self.inbound.recv().await)
    }
}

impl Drop for MuxStream {
    fn drop(&mut self) {
        self.streams.lock().remove(&self.id);
        let _ = self.outbound.send(Frame::Close { stream_id: self.id });
    }
}
