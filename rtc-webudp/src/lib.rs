//! A WebUDP client socket.
//!
//! [`Socket`] opens an unordered, unreliable WebRTC data channel to a WebUDP
//! host. Instead of a signaling server, the offer/answer handshake is a single
//! HTTP POST: the local SDP goes out, and the host answers with its session
//! description and the one ICE candidate it listens on.
//!
//! ```no_run
//! use rtc_webudp::{Socket, SocketConfig};
//!
//! # async fn example() -> rtc_webudp::Result<()> {
//! let socket = Socket::new(SocketConfig::default());
//! socket.on_message(|message| println!("received {} bytes", message.len()));
//! socket.connect("http://127.0.0.1:9555")?;
//! # Ok(())
//! # }
//! ```
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod message;
pub mod peer;
pub mod signaling;
pub mod socket;

pub use config::{IceServer, SocketConfig, SocketConfigBuilder};
pub use error::{Error, Result};
pub use message::Message;
pub use socket::{Socket, SocketEvent, SocketState};
