use std::fmt;

/// SocketState is the lifecycle of a [`Socket`](super::Socket).
///
/// ```text
///          connect              channel open
/// Idle ─────────────> Negotiating ───────────> Open
///                      │      │                 │
///                      │      │ close /         │ close /
///        negotiation   │      │ channel close   │ channel close
///        failure       v      v                 v
///                    Failed  Closed <───────────┘
/// ```
///
/// `connect` from `Failed` or `Closed` starts a new cycle in `Negotiating`.
///
/// Only `Open` lets data through; `send` in any other state drops the data.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SocketState {
    /// No connection has been attempted yet.
    #[default]
    Idle,

    /// The peer connection exists and the signaling exchange is running or
    /// the channel is waiting to open.
    Negotiating,

    /// The data channel is open.
    Open,

    /// The data channel closed, locally or remotely.
    Closed,

    /// The signaling exchange failed; the cause was reported through
    /// `on_failed`.
    Failed,
}

const SOCKET_STATE_IDLE_STR: &str = "idle";
const SOCKET_STATE_NEGOTIATING_STR: &str = "negotiating";
const SOCKET_STATE_OPEN_STR: &str = "open";
const SOCKET_STATE_CLOSED_STR: &str = "closed";
const SOCKET_STATE_FAILED_STR: &str = "failed";

impl SocketState {
    /// is_connecting reports whether a connection cycle is in progress, in
    /// which case another `connect` is refused.
    pub fn is_connecting(&self) -> bool {
        matches!(self, SocketState::Negotiating | SocketState::Open)
    }
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            SocketState::Idle => SOCKET_STATE_IDLE_STR,
            SocketState::Negotiating => SOCKET_STATE_NEGOTIATING_STR,
            SocketState::Open => SOCKET_STATE_OPEN_STR,
            SocketState::Closed => SOCKET_STATE_CLOSED_STR,
            SocketState::Failed => SOCKET_STATE_FAILED_STR,
        };
        write!(f, "{s}")
    }
}
