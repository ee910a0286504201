
pub mod state;

use crate::config::SocketConfig;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::peer::webrtc::WebRtcConnector;
use crate::peer::{ChannelEvent, ChannelEventSender, DataChannel, PeerConnection, PeerConnector};
use crate::signaling::{self, HttpSignaling, SignalingTransport};
use bytes::Bytes;
use log::{debug, error, trace, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

pub use state::SocketState;

const EVENT_CHANNEL_CAPACITY: usize = 64;

type Handler = Box<dyn FnMut() + Send + 'static>;
type MessageHandler = Box<dyn FnMut(Message) + Send + 'static>;
type FailedHandler = Box<dyn FnMut(&Error) + Send + 'static>;

/// SocketEvent is a lifecycle notification delivered to every subscriber of
/// [`Socket::subscribe`].
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Open,
    Message(Message),
    Close,
    Failed(Error),
}

/// Socket is a WebUDP client: a best-effort, unordered, unreliable message
/// channel to a remote peer, negotiated with a single signaling round trip.
///
/// `connect` returns immediately. Progress is reported through the
/// `on_open`, `on_message`, `on_close` and `on_failed` handlers (one handler
/// per slot, the last registration wins) and through [`Socket::subscribe`]
/// for any number of listeners. Handlers run with no socket lock held and may
/// call back into the socket.
///
/// `send` only delivers while the socket is [`SocketState::Open`]; in every
/// other state the data is dropped without error, matching the datagram
/// semantics of the channel. Nothing is queued or retransmitted.
///
/// All methods that start background work must be called from within a
/// tokio runtime.
pub struct Socket<C: PeerConnector = WebRtcConnector, T: SignalingTransport = HttpSignaling> {
    config: SocketConfig,
    connector: Arc<C>,
    transport: Arc<T>,
    shared: Arc<Shared<C::Peer>>,
}

/// Connection is the state of the current connection cycle.
struct Connection<P: PeerConnection> {
    generation: u64,
    state: SocketState,
    peer: Option<Arc<P>>,
    channel: Option<Arc<P::Channel>>,
    events: Option<ChannelEventSender>,
    task: Option<JoinHandle<()>>,
}

impl<P: PeerConnection> Connection<P> {
    fn release(&mut self) -> Option<Arc<P>> {
        self.channel = None;
        self.events = None;
        self.peer.take()
    }
}

struct Shared<P: PeerConnection> {
    connection: Mutex<Connection<P>>,
    on_open: Mutex<Option<Handler>>,
    on_message: Mutex<Option<MessageHandler>>,
    on_close: Mutex<Option<Handler>>,
    on_failed: Mutex<Option<FailedHandler>>,
    events: broadcast::Sender<SocketEvent>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// fire calls the handler in `slot` without holding the slot lock, so the
/// handler may replace itself. A replacement registered during the call wins.
fn fire<H: ?Sized>(slot: &Mutex<Option<Box<H>>>, call: impl FnOnce(&mut H)) {
    let handler = lock(slot).take();
    if let Some(mut handler) = handler {
        call(handler.as_mut());
        let mut slot = lock(slot);
        if slot.is_none() {
            *slot = Some(handler);
        }
    }
}

impl<P: PeerConnection> Shared<P> {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            connection: Mutex::new(Connection {
                generation: 0,
                state: SocketState::Idle,
                peer: None,
                channel: None,
                events: None,
                task: None,
            }),
            on_open: Mutex::new(None),
            on_message: Mutex::new(None),
            on_close: Mutex::new(None),
            on_failed: Mutex::new(None),
            events,
        }
    }

    fn emit(&self, event: SocketEvent) {
        // no subscribers is not an error
        let _ = self.events.send(event);
    }

    /// attach_peer hands the new peer connection to the cycle, so that a
    /// `close()` or drop from here on closes it even if the driver is aborted.
    fn attach_peer(&self, generation: u64, peer: Arc<P>) -> Result<()> {
        let mut conn = lock(&self.connection);
        if conn.generation != generation || conn.state != SocketState::Negotiating {
            return Err(Error::ErrNegotiationAborted);
        }
        conn.peer = Some(peer);
        Ok(())
    }

    /// attach_channel stores the data channel, unless the cycle was closed or
    /// superseded while it was being created.
    fn attach_channel(&self, generation: u64, channel: Arc<P::Channel>) -> Result<()> {
        let mut conn = lock(&self.connection);
        if conn.generation != generation || conn.state != SocketState::Negotiating {
            return Err(Error::ErrNegotiationAborted);
        }
        conn.channel = Some(channel);
        Ok(())
    }

    fn handle_open(&self, generation: u64) {
        let opened = {
            let mut conn = lock(&self.connection);
            if conn.generation == generation
                && conn.state == SocketState::Negotiating
                && conn.channel.is_some()
            {
                conn.state = SocketState::Open;
                true
            } else {
                false
            }
        };

        if opened {
            debug!("socket {}: negotiating -> open", generation);
            self.emit(SocketEvent::Open);
            fire(&self.on_open, |handler| handler());
        }
    }

    fn handle_message(&self, generation: u64, message: Message) {
        let open = {
            let conn = lock(&self.connection);
            conn.generation == generation && conn.state == SocketState::Open
        };

        if open {
            self.emit(SocketEvent::Message(message.clone()));
            fire(&self.on_message, |handler| handler(message));
        } else {
            trace!("socket {}: message on inactive channel dropped", generation);
        }
    }

    /// handle_close moves an active cycle to `Closed`. Repeated close
    /// notifications for the same cycle are ignored.
    fn handle_close(&self, generation: u64) {
        let previous = {
            let mut conn = lock(&self.connection);
            if conn.generation == generation && conn.state.is_connecting() {
                let previous = conn.state;
                conn.state = SocketState::Closed;
                conn.release();
                Some(previous)
            } else {
                None
            }
        };

        if let Some(previous) = previous {
            debug!("socket {}: {} -> closed", generation, previous);
            self.emit(SocketEvent::Close);
            fire(&self.on_close, |handler| handler());
        }
    }

    fn handle_failure(&self, generation: u64, err: Error) {
        let failed = {
            let mut conn = lock(&self.connection);
            if conn.generation == generation && conn.state == SocketState::Negotiating {
                conn.state = SocketState::Failed;
                conn.release();
                true
            } else {
                false
            }
        };

        if failed {
            warn!("socket {}: negotiation failed: {}", generation, err);
            self.emit(SocketEvent::Failed(err.clone()));
            fire(&self.on_failed, |handler| handler(&err));
        } else {
            debug!("socket {}: stale negotiation ended: {}", generation, err);
        }
    }
}

impl Socket {
    /// new creates an idle socket using the webrtc-rs engine and HTTP
    /// signaling.
    pub fn new(config: SocketConfig) -> Self {
        Self::with_parts(config, WebRtcConnector::new(), HttpSignaling::new())
    }
}

impl Default for Socket {
    fn default() -> Self {
        Self::new(SocketConfig::default())
    }
}

impl<C: PeerConnector, T: SignalingTransport> Socket<C, T> {
    /// with_parts creates an idle socket on top of a custom engine and
    /// signaling transport.
    pub fn with_parts(config: SocketConfig, connector: C, transport: T) -> Self {
        Self {
            config,
            connector: Arc::new(connector),
            transport: Arc::new(transport),
            shared: Arc::new(Shared::new()),
        }
    }

    /// config returns the configuration every connection cycle is built from.
    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// state returns the lifecycle state of the current cycle.
    pub fn state(&self) -> SocketState {
        lock(&self.shared.connection).state
    }

    /// is_open reports whether `send` currently reaches the peer. It turns
    /// false as soon as `close()` is called, before the state leaves `Open`.
    pub fn is_open(&self) -> bool {
        let conn = lock(&self.shared.connection);
        conn.state == SocketState::Open && conn.channel.is_some()
    }

    /// connect starts negotiating with the signaling endpoint at `address`
    /// and returns immediately; the outcome arrives through `on_open` or
    /// `on_failed`.
    ///
    /// A socket can connect again once it is `Closed` or `Failed`. Calling
    /// connect while a cycle is `Negotiating` or `Open` returns
    /// [`Error::ErrSocketAlreadyConnected`].
    pub fn connect(&self, address: impl Into<String>) -> Result<()> {
        let address = address.into();
        let mut conn = lock(&self.shared.connection);
        if conn.state.is_connecting() {
            return Err(Error::ErrSocketAlreadyConnected);
        }

        let previous = conn.state;
        conn.generation += 1;
        conn.state = SocketState::Negotiating;
        conn.release();

        let (tx, rx) = mpsc::unbounded_channel();
        let events = ChannelEventSender::new(tx);
        conn.events = Some(events.clone());

        let driver = Driver {
            shared: Arc::clone(&self.shared),
            connector: Arc::clone(&self.connector),
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
            address,
            generation: conn.generation,
        };
        debug!(
            "socket {}: {} -> negotiating with {}",
            conn.generation, previous, driver.address
        );
        conn.task = Some(tokio::spawn(driver.run(events, rx)));

        Ok(())
    }

    /// send forwards binary `data` to the peer if the socket is open and
    /// silently drops it otherwise.
    pub async fn send(&self, data: impl Into<Bytes>) -> Result<()> {
        self.send_message(Message::binary(data)).await
    }

    /// send_text forwards a text message to the peer if the socket is open
    /// and silently drops it otherwise.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send_message(Message::text(text)).await
    }

    async fn send_message(&self, message: Message) -> Result<()> {
        let channel = {
            let conn = lock(&self.shared.connection);
            if conn.state == SocketState::Open {
                conn.channel.clone()
            } else {
                None
            }
        };

        match channel {
            Some(channel) => match channel.send(&message).await {
                // closed underneath us before the close event was applied
                Err(Error::ErrDataChannelClosed) => {
                    trace!("channel closing, dropped {} bytes", message.len());
                    Ok(())
                }
                result => result,
            },
            None => {
                trace!("socket not open, dropped {} bytes", message.len());
                Ok(())
            }
        }
    }

    /// close closes the channel.
    ///
    /// On an open socket the channel is detached at once, so later sends are
    /// dropped, and then asked to close. The resulting close notification
    /// moves the socket to `Closed` and fires `on_close`. While
    /// negotiating, the negotiation task is aborted and the socket closes at
    /// once. A socket that never connected, or whose cycle already ended,
    /// returns [`Error::ErrSocketNotConnected`].
    pub fn close(&self) -> Result<()> {
        let mut conn = lock(&self.shared.connection);
        match conn.state {
            SocketState::Open => {
                let generation = conn.generation;
                let Some(channel) = conn.channel.take() else {
                    debug!("socket {}: close already requested", generation);
                    return Ok(());
                };
                let events = conn.events.clone();
                drop(conn);

                debug!("socket {}: closing channel", generation);
                tokio::spawn(async move {
                    if let Err(err) = channel.close().await {
                        warn!("socket {}: channel close: {}", generation, err);
                    }
                    // the engine may or may not report its own close
                    if let Some(events) = events {
                        events.send(ChannelEvent::Close);
                    }
                });
                Ok(())
            }
            SocketState::Negotiating => {
                let generation = conn.generation;
                let task = conn.task.take();
                let peer = conn.release();
                conn.state = SocketState::Closed;
                drop(conn);

                if let Some(task) = task {
                    task.abort();
                }
                if let Some(peer) = peer {
                    tokio::spawn(close_peer(generation, peer));
                }

                debug!("socket {}: negotiating -> closed (aborted)", generation);
                self.shared.emit(SocketEvent::Close);
                fire(&self.shared.on_close, |handler| handler());
                Ok(())
            }
            SocketState::Idle | SocketState::Closed | SocketState::Failed => {
                Err(Error::ErrSocketNotConnected)
            }
        }
    }

    /// on_open sets the handler called once per cycle when the channel opens.
    pub fn on_open<F>(&self, f: F)
    where
        F: FnMut() + Send + 'static,
    {
        *lock(&self.shared.on_open) = Some(Box::new(f));
    }

    /// on_message sets the handler called with every message received while
    /// the socket is open. Messages may arrive out of order or not at all.
    pub fn on_message<F>(&self, f: F)
    where
        F: FnMut(Message) + Send + 'static,
    {
        *lock(&self.shared.on_message) = Some(Box::new(f));
    }

    /// on_close sets the handler called once when an open or negotiating
    /// cycle closes, locally or remotely.
    pub fn on_close<F>(&self, f: F)
    where
        F: FnMut() + Send + 'static,
    {
        *lock(&self.shared.on_close) = Some(Box::new(f));
    }

    /// on_failed is called with the cause when a negotiation fails. A failed
    /// negotiation does not fire `on_close`.
    pub fn on_failed<F>(&self, f: F)
    where
        F: FnMut(&Error) + Send + 'static,
    {
        *lock(&self.shared.on_failed) = Some(Box::new(f));
    }

    /// subscribe returns a receiver of every lifecycle event raised from now
    /// on. A receiver that falls behind by more than 64 events loses the
    /// oldest ones.
    pub fn subscribe(&self) -> broadcast::Receiver<SocketEvent> {
        self.shared.events.subscribe()
    }
}

impl<C: PeerConnector, T: SignalingTransport> Drop for Socket<C, T> {
    fn drop(&mut self) {
        let (task, peer, generation) = {
            let mut conn = lock(&self.shared.connection);
            (conn.task.take(), conn.release(), conn.generation)
        };
        if let Some(task) = task {
            task.abort();
        }
        if let (Some(peer), Ok(handle)) = (peer, tokio::runtime::Handle::try_current()) {
            handle.spawn(close_peer(generation, peer));
        }
    }
}

async fn close_peer<P: PeerConnection>(generation: u64, peer: Arc<P>) {
    if let Err(err) = peer.close().await {
        warn!("socket {}: peer connection close: {}", generation, err);
    }
}

/// Driver runs one connection cycle: it creates the peer connection and
/// channel, performs the signaling exchange, then applies channel events in
/// the order the engine raised them until the channel closes.
struct Driver<C: PeerConnector, T: SignalingTransport> {
    shared: Arc<Shared<C::Peer>>,
    connector: Arc<C>,
    transport: Arc<T>,
    config: SocketConfig,
    address: String,
    generation: u64,
}

impl<C: PeerConnector, T: SignalingTransport> Driver<C, T> {
    async fn run(self, events: ChannelEventSender, mut rx: mpsc::UnboundedReceiver<ChannelEvent>) {
        let generation = self.generation;

        let peer = match self.connector.new_peer_connection(&self.config).await {
            Ok(peer) => Arc::new(peer),
            Err(err) => {
                self.shared.handle_failure(generation, err);
                return;
            }
        };
        // no await between creation and attach, so an abort cannot leak the peer
        if let Err(err) = self.shared.attach_peer(generation, Arc::clone(&peer)) {
            debug!("socket {}: peer created for ended cycle: {}", generation, err);
            close_peer(generation, peer).await;
            return;
        }

        if let Err(err) = self.negotiate(&peer, events).await {
            self.shared.handle_failure(generation, err);
            close_peer(generation, peer).await;
            return;
        }

        // events raised while negotiating were queued and are applied now
        while let Some(event) = rx.recv().await {
            match event {
                ChannelEvent::Open => self.shared.handle_open(generation),
                ChannelEvent::Message(message) => self.shared.handle_message(generation, message),
                ChannelEvent::Error(err) => {
                    error!("socket {}: data channel error: {}", generation, err)
                }
                ChannelEvent::Close => {
                    self.shared.handle_close(generation);
                    break;
                }
            }
        }

        close_peer(generation, peer).await;
    }

    async fn negotiate(&self, peer: &Arc<C::Peer>, events: ChannelEventSender) -> Result<()> {
        let channel = peer
            .create_data_channel(&self.config.data_channel_init(), events)
            .await?;
        self.shared
            .attach_channel(self.generation, Arc::new(channel))?;

        let descriptor =
            signaling::negotiate(peer.as_ref(), self.transport.as_ref(), &self.address).await?;
        debug!(
            "socket {}: negotiated with {} (candidate {})",
            self.generation, descriptor.address, descriptor.candidate.candidate
        );
        Ok(())
    }
}
