use super::{ChannelEvent, ChannelEventSender, DataChannel, PeerConnection, PeerConnector};
use crate::config::{DataChannelInit, SocketConfig};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::signaling::{IceCandidate, SdpType, SessionDescription};
use log::{debug, error};
use std::sync::Arc;
use webrtc::api::APIBuilder;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// WebRtcConnector builds peer connections with the webrtc-rs stack.
#[derive(Default, Debug, Clone, Copy)]
pub struct WebRtcConnector;

impl WebRtcConnector {
    pub fn new() -> Self {
        Self
    }
}

impl PeerConnector for WebRtcConnector {
    type Peer = WebRtcPeerConnection;

    async fn new_peer_connection(&self, config: &SocketConfig) -> Result<WebRtcPeerConnection> {
        let api = APIBuilder::new().build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers()
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone(),
                    credential: server.credential.clone(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = api.new_peer_connection(rtc_config).await?;
        debug!("peer connection created");

        Ok(WebRtcPeerConnection {
            peer_connection: Arc::new(peer_connection),
            wait_for_gathering: config.wait_for_gathering(),
        })
    }
}

pub struct WebRtcPeerConnection {
    peer_connection: Arc<RTCPeerConnection>,
    wait_for_gathering: bool,
}

impl PeerConnection for WebRtcPeerConnection {
    type Channel = WebRtcDataChannel;

    async fn create_data_channel(
        &self,
        init: &DataChannelInit,
        events: ChannelEventSender,
    ) -> Result<WebRtcDataChannel> {
        let options = RTCDataChannelInit {
            ordered: Some(init.ordered),
            max_retransmits: Some(init.max_retransmits),
            ..Default::default()
        };
        let data_channel = self
            .peer_connection
            .create_data_channel(&init.label, Some(options))
            .await?;

        let tx = events.clone();
        data_channel.on_open(Box::new(move || {
            tx.send(ChannelEvent::Open);
            Box::pin(async {})
        }));

        let tx = events.clone();
        data_channel.on_close(Box::new(move || {
            tx.send(ChannelEvent::Close);
            Box::pin(async {})
        }));

        let tx = events.clone();
        data_channel.on_error(Box::new(move |err: webrtc::Error| {
            tx.send(ChannelEvent::Error(err.to_string()));
            Box::pin(async {})
        }));

        let tx = events.clone();
        data_channel.on_message(Box::new(move |msg: DataChannelMessage| {
            tx.send(ChannelEvent::Message(Message {
                is_string: msg.is_string,
                data: msg.data,
            }));
            Box::pin(async {})
        }));

        let tx = events;
        self.peer_connection
            .on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
                debug!("peer connection state: {}", state);
                if let Some(event) = peer_state_event(state) {
                    tx.send(event);
                }
                Box::pin(async {})
            }));

        Ok(WebRtcDataChannel { data_channel })
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(from_rtc(offer))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        let mut gathering_complete = self.peer_connection.gathering_complete_promise().await;
        self.peer_connection
            .set_local_description(to_rtc(description)?)
            .await?;
        if self.wait_for_gathering {
            let _ = gathering_complete.recv().await;
            debug!("ice gathering complete");
        }
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.peer_connection.local_description().await.map(from_rtc)
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc(description)?)
            .await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_mline_index,
                username_fragment: candidate.username_fragment,
            })
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

pub struct WebRtcDataChannel {
    data_channel: Arc<RTCDataChannel>,
}

impl WebRtcDataChannel {
    pub fn label(&self) -> &str {
        self.data_channel.label()
    }
}

impl DataChannel for WebRtcDataChannel {
    async fn send(&self, message: &Message) -> Result<()> {
        if self.data_channel.ready_state() != RTCDataChannelState::Open {
            return Err(Error::ErrDataChannelClosed);
        }
        let n = if message.is_string {
            let text = String::from_utf8(message.data.to_vec())
                .map_err(|e| Error::ErrEngine(e.to_string()))?;
            self.data_channel.send_text(text).await?
        } else {
            self.data_channel.send(&message.data).await?
        };
        if n != message.len() {
            error!("data channel accepted {} of {} bytes", n, message.len());
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.data_channel.close().await?;
        Ok(())
    }
}

/// peer_state_event maps a peer connection state change to the channel event
/// it implies. A failed peer connection never reports a channel close on its
/// own.
fn peer_state_event(state: RTCPeerConnectionState) -> Option<ChannelEvent> {
    match state {
        RTCPeerConnectionState::Failed => Some(ChannelEvent::Close),
        _ => None,
    }
}

fn to_rtc(description: SessionDescription) -> Result<RTCSessionDescription> {
    let SessionDescription { sdp_type, sdp } = description;
    let rtc = match sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(sdp)?,
        other => {
            return Err(Error::ErrEngine(format!(
                "unsupported session description type: {other}"
            )));
        }
    };
    Ok(rtc)
}

fn from_rtc(description: RTCSessionDescription) -> SessionDescription {
    SessionDescription {
        sdp_type: SdpType::from(description.sdp_type.to_string().as_str()),
        sdp: description.sdp,
    }
}
