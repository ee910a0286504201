//! The peer connection engine seam.
//!
//! The socket never talks to ICE, DTLS or SCTP itself. It drives an engine
//! through [`PeerConnector`], [`PeerConnection`] and [`DataChannel`], and the
//! engine reports data channel lifecycle through a [`ChannelEventSender`].
//! [`webrtc::WebRtcConnector`] is the default engine.

#[cfg(test)]
pub(crate) mod mock;
pub mod webrtc;

use crate::config::{DataChannelInit, SocketConfig};
use crate::error::Result;
use crate::message::Message;
use crate::signaling::{IceCandidate, SessionDescription};
use log::trace;
use std::future::Future;
use tokio::sync::mpsc;

/// ChannelEvent is a lifecycle notification raised by the data channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel is ready to carry messages.
    Open,
    /// A message arrived from the peer.
    Message(Message),
    /// The engine reported a channel error; the channel may still be usable.
    Error(String),
    /// The channel or its transport closed.
    Close,
}

/// ChannelEventSender forwards channel events to the socket that owns the
/// channel. Events sent after the socket moved on to another connection are
/// discarded.
#[derive(Debug, Clone)]
pub struct ChannelEventSender {
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

impl ChannelEventSender {
    /// new wraps the sending half of the queue the socket reads events from.
    pub fn new(tx: mpsc::UnboundedSender<ChannelEvent>) -> Self {
        Self { tx }
    }

    /// send queues `event` for the socket. It never blocks and is safe to
    /// call from engine callbacks.
    pub fn send(&self, event: ChannelEvent) {
        if self.tx.send(event).is_err() {
            trace!("channel event dropped, socket no longer listening");
        }
    }
}

/// PeerConnector creates a fresh peer connection for every `connect`.
pub trait PeerConnector: Send + Sync + 'static {
    type Peer: PeerConnection;

    /// new_peer_connection creates a peer connection configured with the ICE
    /// servers of `config`.
    fn new_peer_connection(
        &self,
        config: &SocketConfig,
    ) -> impl Future<Output = Result<Self::Peer>> + Send;
}

/// PeerConnection is the subset of `RTCPeerConnection` a WebUDP client needs.
pub trait PeerConnection: Send + Sync + 'static {
    type Channel: DataChannel;

    /// create_data_channel creates the channel and registers its open,
    /// message, error and close handlers so they report into `events`.
    fn create_data_channel(
        &self,
        init: &DataChannelInit,
        events: ChannelEventSender,
    ) -> impl Future<Output = Result<Self::Channel>> + Send;

    /// create_offer generates a local offer covering the data channel.
    fn create_offer(&self) -> impl Future<Output = Result<SessionDescription>> + Send;

    /// set_local_description applies the local offer and starts ICE
    /// gathering.
    fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> impl Future<Output = Result<()>> + Send;

    /// local_description returns the description currently applied, which
    /// may differ from the one passed to `set_local_description` once
    /// candidates were gathered.
    fn local_description(&self) -> impl Future<Output = Option<SessionDescription>> + Send;

    /// set_remote_description applies the answer returned by the host.
    fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> impl Future<Output = Result<()>> + Send;

    /// add_ice_candidate adds the candidate the host listens on.
    fn add_ice_candidate(&self, candidate: IceCandidate) -> impl Future<Output = Result<()>> + Send;

    /// close tears down the connection and every background task it runs.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

/// DataChannel is the negotiated unordered, unreliable channel.
pub trait DataChannel: Send + Sync + 'static {
    /// send hands one message to the transport. Delivery is not confirmed.
    fn send(&self, message: &Message) -> impl Future<Output = Result<()>> + Send;

    /// close closes the channel; the engine reports `ChannelEvent::Close`
    /// once it is done.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}
