//! Socket-level helpers for the end-to-end tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use snowball_shared::{ops, Packet};

use crate::api::http;
use crate::app::App;

pub(crate) type WsClient =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub(crate) const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) async fn spawn_ws_server(app: Arc<App>) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let router = http::router(app);

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, handle)
}

pub(crate) async fn ws_connect(addr: SocketAddr) -> WsClient {
    let url = format!("ws://{}/ws", addr);
    let (ws, _resp) = connect_async(url).await.unwrap();
    ws
}

pub(crate) async fn ws_send(ws: &mut WsClient, packet: &Packet) {
    let json = packet.to_json().unwrap();
    ws.send(WsMessage::Text(json)).await.unwrap();
}

pub(crate) async fn ws_send_raw(ws: &mut WsClient, text: &str) {
    ws.send(WsMessage::Text(text.to_string())).await.unwrap();
}

/// Send the auth packet and wait for the acknowledgement.
pub(crate) async fn ws_authenticate(ws: &mut WsClient, token: &str) -> Packet {
    ws_send(ws, &Packet::raw(ops::AUTH, json!({ "token": token }))).await;
    ws_expect_packet(ws, ops::AUTH).await
}

/// Next frame from the server: a packet, or the close code.
pub(crate) enum Frame {
    Packet(Packet),
    Closed(Option<u16>),
}

pub(crate) async fn ws_recv(ws: &mut WsClient) -> Frame {
    loop {
        match ws.next().await {
            Some(Ok(WsMessage::Text(text))) => return Frame::Packet(Packet::from_json(&text).unwrap()),
            Some(Ok(WsMessage::Binary(bin))) => {
                let text = String::from_utf8(bin).unwrap();
                return Frame::Packet(Packet::from_json(&text).unwrap());
            }
            Some(Ok(WsMessage::Close(frame))) => {
                return Frame::Closed(frame.map(|f| u16::from(f.code)));
            }
            Some(Ok(_)) => {}
            Some(Err(_)) | None => return Frame::Closed(None),
        }
    }
}

/// Wait for the first packet with `op`, skipping others.
pub(crate) async fn ws_expect_packet(ws: &mut WsClient, op: &str) -> Packet {
    tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            match ws_recv(ws).await {
                Frame::Packet(packet) if packet.op == op => return packet,
                Frame::Packet(_) => {}
                Frame::Closed(code) => panic!("socket closed with {code:?} while waiting for {op}"),
            }
        }
    })
    .await
    .unwrap()
}

/// Wait for the close frame, skipping packets.
pub(crate) async fn ws_expect_close(ws: &mut WsClient, timeout: Duration) -> Option<u16> {
    tokio::time::timeout(timeout, async {
        loop {
            if let Frame::Closed(code) = ws_recv(ws).await {
                return code;
            }
        }
    })
    .await
    .unwrap()
}
