use super::{SignalingReply, SignalingTransport};
use crate::error::Result;
use log::trace;

/// HttpSignaling posts the offer SDP as plain text to the signaling address
/// and hands back whatever the endpoint answered. No timeout is applied; a
/// stalled endpoint stalls the negotiation.
#[derive(Default, Debug, Clone)]
pub struct HttpSignaling {
    client: reqwest::Client,
}

impl HttpSignaling {
    pub fn new() -> Self {
        Self::default()
    }

    /// with_client reuses an existing client, e.g. one with custom root
    /// certificates or a proxy.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl SignalingTransport for HttpSignaling {
    async fn post_offer(&self, address: &str, sdp: String) -> Result<SignalingReply> {
        trace!("POST {} ({} bytes of sdp)", address, sdp.len());

        let response = self
            .client
            .post(address)
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(sdp)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        trace!("signaling response {} ({} bytes)", status, body.len());

        Ok(SignalingReply { status, body })
    }
}
