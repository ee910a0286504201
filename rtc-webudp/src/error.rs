use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("socket: not connected")]
    ErrSocketNotConnected,
    #[error("socket: connect already in progress or open")]
    ErrSocketAlreadyConnected,
    #[error("socket: negotiation aborted by close")]
    ErrNegotiationAborted,
    #[error("signaling: endpoint returned status {0}")]
    ErrSignalingStatus(u16),
    #[error("signaling: malformed response: {0}")]
    ErrSignalingResponse(String),
    #[error("signaling: transport failure: {0}")]
    ErrSignalingTransport(String),
    #[error("signaling: invalid address: {0}")]
    ErrSignalingAddress(String),
    #[error("peer connection: local description not set")]
    ErrNoLocalDescription,
    #[error("data channel: closed")]
    ErrDataChannelClosed,
    #[error("engine: {0}")]
    ErrEngine(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::ErrSignalingResponse(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            Error::ErrSignalingAddress(e.to_string())
        } else {
            Error::ErrSignalingTransport(e.to_string())
        }
    }
}

impl From<webrtc::Error> for Error {
    fn from(e: webrtc::Error) -> Self {
        Error::ErrEngine(e.to_string())
    }
}
