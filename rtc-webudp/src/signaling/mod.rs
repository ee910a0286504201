
pub mod exchange;
pub mod http;

use crate::error::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

pub use exchange::{NegotiationDescriptor, negotiate};
pub use http::HttpSignaling;

/// SdpType describes the role of a session description in the offer/answer
/// exchange.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    #[default]
    #[serde(skip)]
    Unspecified,
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

const SDP_TYPE_OFFER_STR: &str = "offer";
const SDP_TYPE_PRANSWER_STR: &str = "pranswer";
const SDP_TYPE_ANSWER_STR: &str = "answer";
const SDP_TYPE_ROLLBACK_STR: &str = "rollback";

impl From<&str> for SdpType {
    fn from(raw: &str) -> Self {
        match raw {
            SDP_TYPE_OFFER_STR => SdpType::Offer,
            SDP_TYPE_PRANSWER_STR => SdpType::Pranswer,
            SDP_TYPE_ANSWER_STR => SdpType::Answer,
            SDP_TYPE_ROLLBACK_STR => SdpType::Rollback,
            _ => SdpType::Unspecified,
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            SdpType::Offer => SDP_TYPE_OFFER_STR,
            SdpType::Pranswer => SDP_TYPE_PRANSWER_STR,
            SdpType::Answer => SDP_TYPE_ANSWER_STR,
            SdpType::Rollback => SDP_TYPE_ROLLBACK_STR,
            SdpType::Unspecified => "Unspecified",
        };
        write!(f, "{s}")
    }
}

/// SessionDescription is the engine-agnostic form of an SDP offer or answer,
/// serialized the way browsers serialize `RTCSessionDescriptionInit`.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// IceCandidate is one remote ICE candidate, serialized like
/// `RTCIceCandidateInit`.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,
    #[serde(
        rename = "usernameFragment",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username_fragment: Option<String>,
}

/// SignalingAnswer is the body a WebUDP signaling endpoint responds with:
/// the remote answer plus the single candidate the host listens on.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingAnswer {
    pub answer: SessionDescription,
    pub candidate: IceCandidate,
}

/// SignalingReply is the raw outcome of posting an offer: the HTTP status and
/// the unparsed response body.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct SignalingReply {
    pub status: u16,
    pub body: Bytes,
}

impl SignalingReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// into_answer checks the status and parses the body. A non-success
    /// status, an unparsable body or a description that is not an answer are
    /// all exchange failures.
    pub fn into_answer(self) -> Result<SignalingAnswer> {
        if !self.is_success() {
            return Err(Error::ErrSignalingStatus(self.status));
        }

        let answer: SignalingAnswer = serde_json::from_slice(&self.body)?;
        if answer.answer.sdp_type != SdpType::Answer {
            return Err(Error::ErrSignalingResponse(format!(
                "expected an answer, got {}",
                answer.answer.sdp_type
            )));
        }
        if answer.candidate.candidate.is_empty() {
            return Err(Error::ErrSignalingResponse(
                "empty ice candidate".to_owned(),
            ));
        }

        Ok(answer)
    }
}

/// SignalingTransport performs the single request/response round trip of a
/// negotiation: the local SDP text goes out as the request body, and the
/// status and body of the response come back untouched.
pub trait SignalingTransport: Send + Sync + 'static {
    fn post_offer(
        &self,
        address: &str,
        sdp: String,
    ) -> impl Future<Output = Result<SignalingReply>> + Send;
}
