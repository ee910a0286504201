/// Label given to the data channel when none is configured.
pub const DEFAULT_DATA_CHANNEL_LABEL: &str = "webudp";

/// IceServer describes a single STUN or TURN server used by the ICE agent.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct IceServer {
    /// urls lists the `stun:`, `turn:` or `turns:` urls of the server.
    pub urls: Vec<String>,
    /// username authenticates against a TURN server; empty for STUN.
    pub username: String,
    /// credential is the TURN password; empty for STUN.
    pub credential: String,
}

impl IceServer {
    /// Creates an unauthenticated server entry from a single url such as
    /// `stun:stun.l.google.com:19302`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            ..Default::default()
        }
    }
}

/// DataChannelInit carries the reliability options of the data channel.
///
/// A WebUDP channel is always unordered with zero retransmissions, which makes
/// it behave like a datagram socket: messages may be dropped or reordered but
/// are never retransmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChannelInit {
    /// label names the channel; a WebUDP host expects `webudp`.
    pub label: String,
    /// ordered requests in-order delivery.
    pub ordered: bool,
    /// max_retransmits bounds how often a lost message is resent.
    pub max_retransmits: u16,
}

/// SocketConfig configures the peer connection created on every `connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    pub(crate) ice_servers: Vec<IceServer>,
    pub(crate) label: String,
    pub(crate) wait_for_gathering: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![],
            label: DEFAULT_DATA_CHANNEL_LABEL.to_owned(),
            wait_for_gathering: false,
        }
    }
}

impl SocketConfig {
    /// ice_servers returns the STUN and TURN servers handed to the ICE agent.
    pub fn ice_servers(&self) -> &[IceServer] {
        &self.ice_servers
    }

    /// label returns the data channel label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// wait_for_gathering reports whether the local offer is held back until
    /// ICE candidate gathering completes.
    pub fn wait_for_gathering(&self) -> bool {
        self.wait_for_gathering
    }

    /// data_channel_init returns the options the data channel is created with.
    pub fn data_channel_init(&self) -> DataChannelInit {
        DataChannelInit {
            label: self.label.clone(),
            ordered: false,
            max_retransmits: 0,
        }
    }
}

/// SocketConfigBuilder builds a [`SocketConfig`].
///
/// ```
/// use rtc_webudp::config::{IceServer, SocketConfigBuilder};
///
/// let config = SocketConfigBuilder::new()
///     .with_ice_servers(vec![IceServer::new("stun:stun.l.google.com:19302")])
///     .build();
/// assert_eq!(config.label(), "webudp");
/// ```
#[derive(Default, Debug, Clone)]
pub struct SocketConfigBuilder {
    config: SocketConfig,
}

impl SocketConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServer>) -> Self {
        self.config.ice_servers = ice_servers;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    /// with_wait_for_gathering makes the offer carry every gathered host and
    /// server reflexive candidate. Not needed against an ICE-lite WebUDP host,
    /// which learns the client address from its connectivity checks.
    pub fn with_wait_for_gathering(mut self, wait: bool) -> Self {
        self.config.wait_for_gathering = wait;
        self
    }

    pub fn build(self) -> SocketConfig {
        self.config
    }
}
