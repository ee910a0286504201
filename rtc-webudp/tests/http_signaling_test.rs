//! Runs HttpSignaling against a local hyper signaling endpoint.

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use rtc_webudp::Error;
use rtc_webudp::signaling::{HttpSignaling, SdpType, SignalingTransport};
use std::net::SocketAddr;
use tokio::sync::mpsc;

const OFFER_SDP: &str = "v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\ns=-\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n";
const WEBUDP_RESPONSE: &str = r#"{"answer":{"sdp":"v=0\r\n","type":"answer"},"candidate":{"sdpMLineIndex":0,"sdpMid":"data","candidate":"candidate:1 1 UDP 2130706431 127.0.0.1 9555 typ host"}}"#;

struct Received {
    method: Method,
    path: String,
    content_type: Option<String>,
    body: String,
}

async fn spawn_signaling_server(
    status: StatusCode,
    body: &'static str,
) -> (SocketAddr, mpsc::UnboundedReceiver<Received>) {
    let (tx, rx) = mpsc::unbounded_channel();

    let make_svc = make_service_fn(move |_| {
        let tx = tx.clone();
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req: Request<Body>| {
                let tx = tx.clone();
                async move {
                    let method = req.method().clone();
                    let path = req.uri().path().to_owned();
                    let content_type = req
                        .headers()
                        .get(hyper::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    let bytes = hyper::body::to_bytes(req.into_body()).await?;
                    let _ = tx.send(Received {
                        method,
                        path,
                        content_type,
                        body: String::from_utf8_lossy(&bytes).into_owned(),
                    });

                    Ok::<_, hyper::Error>(
                        Response::builder()
                            .status(status)
                            .header("Content-Type", "application/json")
                            .body(Body::from(body))
                            .unwrap(),
                    )
                }
            }))
        }
    });

    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let server = Server::bind(&addr).serve(make_svc);
    let local_addr = server.local_addr();
    tokio::spawn(async move {
        if let Err(e) = server.await {
            eprintln!("signaling server error: {e}");
        }
    });

    (local_addr, rx)
}

#[tokio::test]
async fn test_http_signaling_posts_offer_text() -> anyhow::Result<()> {
    let (addr, mut received) = spawn_signaling_server(StatusCode::OK, WEBUDP_RESPONSE).await;
    let address = format!("http://{addr}/offer");

    let reply = HttpSignaling::new()
        .post_offer(&address, OFFER_SDP.to_owned())
        .await?;
    assert_eq!(reply.status, 200);

    let answer = reply.into_answer()?;
    assert_eq!(answer.answer.sdp_type, SdpType::Answer);
    assert_eq!(answer.candidate.sdp_mid.as_deref(), Some("data"));

    let request = received.recv().await.unwrap();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/offer");
    assert_eq!(request.body, OFFER_SDP);
    assert_eq!(
        request.content_type.as_deref(),
        Some("text/plain;charset=UTF-8")
    );

    Ok(())
}

#[tokio::test]
async fn test_http_signaling_reports_error_status() -> anyhow::Result<()> {
    let (addr, _received) =
        spawn_signaling_server(StatusCode::INTERNAL_SERVER_ERROR, "internal error").await;

    let reply = HttpSignaling::new()
        .post_offer(&format!("http://{addr}/offer"), OFFER_SDP.to_owned())
        .await?;

    assert_eq!(reply.status, 500);
    assert!(!reply.is_success());
    assert_eq!(reply.into_answer(), Err(Error::ErrSignalingStatus(500)));

    Ok(())
}

#[tokio::test]
async fn test_http_signaling_unreachable_endpoint() {
    // nothing listens on the discard port of the loopback interface
    let result = HttpSignaling::new()
        .post_offer("http://127.0.0.1:9/offer", OFFER_SDP.to_owned())
        .await;

    match result {
        Err(Error::ErrSignalingTransport(_)) => {}
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_signaling_invalid_address() {
    let result = HttpSignaling::new()
        .post_offer("not a signaling address", OFFER_SDP.to_owned())
        .await;

    match result {
        Err(Error::ErrSignalingAddress(_)) => {}
        other => panic!("expected address error, got {other:?}"),
    }
}
