use super::{IceCandidate, SessionDescription, SignalingTransport};
use crate::error::{Error, Result};
use crate::peer::PeerConnection;
use log::debug;

/// NegotiationDescriptor records what one signaling exchange applied to the
/// engine. It only lives for the duration of a `connect`.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct NegotiationDescriptor {
    pub address: String,
    pub local: SessionDescription,
    pub remote: SessionDescription,
    pub candidate: IceCandidate,
}

/// negotiate performs exactly one offer/answer round trip against `address`:
///
/// 1. create a local offer and apply it as the local description,
/// 2. post the resulting SDP text to the signaling address,
/// 3. parse the `{answer, candidate}` response,
/// 4. apply the answer as the remote description and add the candidate.
///
/// The steps run strictly in order and the first failure aborts the exchange
/// without retry.
pub async fn negotiate<P, T>(
    peer: &P,
    transport: &T,
    address: &str,
) -> Result<NegotiationDescriptor>
where
    P: PeerConnection,
    T: SignalingTransport,
{
    let offer = peer.create_offer().await?;
    peer.set_local_description(offer).await?;
    let local = peer
        .local_description()
        .await
        .ok_or(Error::ErrNoLocalDescription)?;
    debug!("local description set, signaling {}", address);

    let reply = transport.post_offer(address, local.sdp.clone()).await?;
    let response = reply.into_answer()?;
    debug!("received answer from {}", address);

    peer.set_remote_description(response.answer.clone()).await?;
    peer.add_ice_candidate(response.candidate.clone()).await?;
    debug!("remote description and candidate applied");

    Ok(NegotiationDescriptor {
        address: address.to_owned(),
        local,
        remote: response.answer,
        candidate: response.candidate,
    })
}
