//! In-memory engine and signaling transport for tests.

use super::{ChannelEvent, ChannelEventSender, DataChannel, PeerConnection, PeerConnector};
use crate::config::{DataChannelInit, SocketConfig};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::signaling::{
    IceCandidate, SessionDescription, SignalingAnswer, SignalingReply, SignalingTransport,
};
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub(crate) const MOCK_OFFER_SDP: &str = "v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\ns=-\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n";
pub(crate) const MOCK_ANSWER_SDP: &str = "v=0\r\no=- 2 2 IN IP4 127.0.0.1\r\ns=-\r\nm=application 9555 UDP/DTLS/SCTP webrtc-datachannel\r\n";
pub(crate) const MOCK_CANDIDATE: &str = "candidate:1 1 UDP 2130706431 127.0.0.1 9555 typ host";

#[derive(Default)]
struct MockState {
    calls: Vec<&'static str>,
    fail_on: Option<&'static str>,
    stall_on: Option<&'static str>,
    auto_open: bool,
    open_early: bool,
    channels: Vec<ChannelEventSender>,
    inits: Vec<DataChannelInit>,
    remote: Option<SessionDescription>,
    candidate: Option<IceCandidate>,
    peers_closed: usize,
}

/// MockNetwork is the far side of every mock peer connection: it records
/// what the socket asked the engine to do and lets the test raise channel
/// events.
#[derive(Clone)]
pub(crate) struct MockNetwork {
    state: Arc<Mutex<MockState>>,
    sent_tx: mpsc::UnboundedSender<Message>,
}

impl MockNetwork {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        (
            Self {
                state: Arc::new(Mutex::new(MockState::default())),
                sent_tx,
            },
            sent_rx,
        )
    }

    /// auto_open opens the channel as soon as the remote candidate is added.
    pub(crate) fn auto_open(self, auto_open: bool) -> Self {
        self.state.lock().unwrap().auto_open = auto_open;
        self
    }

    /// open_early raises the open event as soon as the channel exists,
    /// before any signaling happened.
    pub(crate) fn open_early(self, open_early: bool) -> Self {
        self.state.lock().unwrap().open_early = open_early;
        self
    }

    pub(crate) fn fail_on(self, call: &'static str) -> Self {
        self.state.lock().unwrap().fail_on = Some(call);
        self
    }

    /// stall_on makes `call` never complete once it was recorded.
    pub(crate) fn stall_on(self, call: &'static str) -> Self {
        self.state.lock().unwrap().stall_on = Some(call);
        self
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn channel_count(&self) -> usize {
        self.state.lock().unwrap().channels.len()
    }

    pub(crate) fn inits(&self) -> Vec<DataChannelInit> {
        self.state.lock().unwrap().inits.clone()
    }

    pub(crate) fn remote_description(&self) -> Option<SessionDescription> {
        self.state.lock().unwrap().remote.clone()
    }

    pub(crate) fn remote_candidate(&self) -> Option<IceCandidate> {
        self.state.lock().unwrap().candidate.clone()
    }

    pub(crate) fn peers_closed(&self) -> usize {
        self.state.lock().unwrap().peers_closed
    }

    /// raise sends `event` from the channel created by the `index`th connect.
    pub(crate) fn raise(&self, index: usize, event: ChannelEvent) {
        let sender = self.state.lock().unwrap().channels[index].clone();
        sender.send(event);
    }

    /// fail_transport reports the latest peer connection as failed, which the
    /// engine surfaces as a channel close.
    pub(crate) fn fail_transport(&self) {
        self.raise_latest(ChannelEvent::Close);
    }

    /// raise_latest sends `event` from the most recently created channel.
    pub(crate) fn raise_latest(&self, event: ChannelEvent) {
        let index = self.channel_count() - 1;
        self.raise(index, event);
    }

    pub(crate) fn connector(&self) -> MockConnector {
        MockConnector {
            network: self.clone(),
        }
    }

    async fn stall_if(&self, call: &'static str) {
        let stall = self.state.lock().unwrap().stall_on == Some(call);
        if stall {
            std::future::pending::<()>().await;
        }
    }

    fn record(&self, call: &'static str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.fail_on == Some(call) {
            Err(Error::ErrEngine(format!("{call} rejected")))
        } else {
            Ok(())
        }
    }
}

pub(crate) struct MockConnector {
    network: MockNetwork,
}

impl PeerConnector for MockConnector {
    type Peer = MockPeer;

    async fn new_peer_connection(&self, _config: &SocketConfig) -> Result<MockPeer> {
        self.network.record("new_peer_connection")?;
        Ok(MockPeer {
            network: self.network.clone(),
            local: Mutex::new(None),
        })
    }
}

pub(crate) struct MockPeer {
    network: MockNetwork,
    local: Mutex<Option<SessionDescription>>,
}

impl MockPeer {
    pub(crate) fn new(network: MockNetwork) -> Self {
        Self {
            network,
            local: Mutex::new(None),
        }
    }
}

impl PeerConnection for MockPeer {
    type Channel = MockChannel;

    async fn create_data_channel(
        &self,
        init: &DataChannelInit,
        events: ChannelEventSender,
    ) -> Result<MockChannel> {
        self.network.record("create_data_channel")?;
        self.network.stall_if("create_data_channel").await;
        let open_early = {
            let mut state = self.network.state.lock().unwrap();
            state.inits.push(init.clone());
            state.channels.push(events.clone());
            state.open_early
        };
        if open_early {
            events.send(ChannelEvent::Open);
        }
        Ok(MockChannel {
            network: self.network.clone(),
            events,
        })
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        self.network.record("create_offer")?;
        Ok(SessionDescription::offer(MOCK_OFFER_SDP))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.network.record("set_local_description")?;
        *self.local.lock().unwrap() = Some(description);
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.network.record("set_remote_description")?;
        self.network.state.lock().unwrap().remote = Some(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.network.record("add_ice_candidate")?;
        let open = {
            let mut state = self.network.state.lock().unwrap();
            state.candidate = Some(candidate);
            state.auto_open
        };
        if open {
            self.network.raise_latest(ChannelEvent::Open);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.network.state.lock().unwrap().peers_closed += 1;
        Ok(())
    }
}

pub(crate) struct MockChannel {
    network: MockNetwork,
    events: ChannelEventSender,
}

impl DataChannel for MockChannel {
    async fn send(&self, message: &Message) -> Result<()> {
        self.network.record("channel.send")?;
        let _ = self.network.sent_tx.send(message.clone());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.network.record("channel.close")?;
        self.events.send(ChannelEvent::Close);
        Ok(())
    }
}

/// MockSignaling answers every offer with a fixed reply, or never answers
/// when built with `stalled`.
#[derive(Clone)]
pub(crate) struct MockSignaling {
    reply: Option<SignalingReply>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockSignaling {
    pub(crate) fn reply(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            reply: Some(SignalingReply {
                status,
                body: body.into(),
            }),
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    /// answering replies with a well-formed WebUDP answer.
    pub(crate) fn answering() -> Self {
        let body = serde_json::to_vec(&mock_answer()).unwrap();
        Self::reply(200, body)
    }

    pub(crate) fn stalled() -> Self {
        Self {
            reply: None,
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    pub(crate) fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

pub(crate) fn mock_answer() -> SignalingAnswer {
    SignalingAnswer {
        answer: SessionDescription::answer(MOCK_ANSWER_SDP),
        candidate: IceCandidate {
            candidate: MOCK_CANDIDATE.to_owned(),
            sdp_mid: Some("data".to_owned()),
            sdp_mline_index: Some(0),
            username_fragment: None,
        },
    }
}

impl SignalingTransport for MockSignaling {
    async fn post_offer(&self, address: &str, sdp: String) -> Result<SignalingReply> {
        self.requests
            .lock()
            .unwrap()
            .push((address.to_owned(), sdp));
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => std::future::pending().await,
        }
    }
}
