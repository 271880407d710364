//! End-to-end tests: a real server on a loopback port driven by WebSocket
//! clients.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use auction_gateway::api::build_app;
use auction_gateway::app_state::AppState;
use auction_gateway::config::GatewayConfig;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let config = GatewayConfig {
        settlement_grace_ms: 50,
        round_tick_interval_ms: 200,
        ..GatewayConfig::default()
    };
    let app = build_app(AppState::start(&config));
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("loopback bind");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let Ok((ws, _)) = connect_async(format!("ws://{addr}/ws")).await else {
        panic!("ws handshake");
    };
    ws
}

async fn send(ws: &mut Client, frame: Value) {
    let Ok(()) = ws.send(Message::text(frame.to_string())).await else {
        panic!("ws send");
    };
}

async fn next_frame(ws: &mut Client) -> Value {
    loop {
        let Ok(Some(Ok(msg))) = tokio::time::timeout(Duration::from_secs(5), ws.next()).await
        else {
            panic!("no frame within 5s");
        };
        if let Message::Text(text) = msg {
            let Ok(value) = serde_json::from_str(text.as_str()) else {
                panic!("server frames are json");
            };
            return value;
        }
    }
}

/// Reads frames until one of type `kind` arrives and returns its payload.
async fn wait_for(ws: &mut Client, kind: &str) -> Value {
    loop {
        let frame = next_frame(ws).await;
        if frame["type"] == kind {
            return frame["payload"].clone();
        }
    }
}

/// Connects and returns the client with its assigned participant id.
async fn participant(addr: SocketAddr) -> (Client, String) {
    let mut ws = connect(addr).await;
    let welcome = wait_for(&mut ws, "welcome").await;
    let Some(id) = welcome["participantId"].as_str() else {
        panic!("welcome carries an id");
    };
    let id = id.to_string();
    (ws, id)
}

#[tokio::test]
async fn connect_greets_with_clock_and_state() {
    let addr = spawn_server().await;
    let mut ws = connect(addr).await;

    let greeting = next_frame(&mut ws).await;
    assert_eq!(greeting["type"], "clock-reply");
    assert!(greeting["payload"]["serverNow"].is_i64());
    assert!(greeting["payload"].get("echo").is_none());

    assert_eq!(next_frame(&mut ws).await["type"], "welcome");
    assert_eq!(next_frame(&mut ws).await["type"], "roster-update");
    assert_eq!(wait_for(&mut ws, "admin-update").await["adminId"], Value::Null);
    assert_eq!(wait_for(&mut ws, "duration-update").await["seconds"], 10);
}

#[tokio::test]
async fn clock_probe_echoes_client_time() {
    let addr = spawn_server().await;
    let (mut ws, _) = participant(addr).await;

    send(
        &mut ws,
        json!({"type": "clock-probe", "payload": {"echo": 1234.5}}),
    )
    .await;
    let reply = loop {
        let payload = wait_for(&mut ws, "clock-reply").await;
        if payload.get("echo").is_some() {
            break payload;
        }
    };
    assert_eq!(reply["echo"], 1234.5);
    assert!(reply["serverNow"].is_i64());
}

#[tokio::test]
async fn full_round_settles_with_ranked_offers() {
    let addr = spawn_server().await;
    let (mut admin, admin_id) = participant(addr).await;
    let (mut alice, alice_id) = participant(addr).await;
    let (mut bob, bob_id) = participant(addr).await;

    send(&mut admin, json!({"type": "claim-admin"})).await;
    loop {
        if wait_for(&mut alice, "admin-update").await["adminId"] == admin_id.as_str() {
            break;
        }
    }

    send(
        &mut alice,
        json!({"type": "join-lobby", "payload": {"displayName": "Alice"}}),
    )
    .await;
    send(
        &mut bob,
        json!({"type": "join-lobby", "payload": {"displayName": "Bob"}}),
    )
    .await;
    loop {
        let roster = wait_for(&mut admin, "roster-update").await;
        if roster.as_array().is_some_and(|r| r.len() == 2) {
            break;
        }
    }

    send(
        &mut admin,
        json!({
            "type": "call-item",
            "payload": {"label": "Player A", "durationOverrideSeconds": 1}
        }),
    )
    .await;
    let started = wait_for(&mut alice, "round-started").await;
    assert_eq!(started["label"], "Player A");
    assert_eq!(started["durationSeconds"], 1);
    let Some(deadline) = started["deadline"].as_i64() else {
        panic!("deadline in epoch millis");
    };
    let Some(server_now) = started["serverNow"].as_i64() else {
        panic!("serverNow in epoch millis");
    };
    assert!(deadline - server_now <= 1000);

    send(&mut alice, json!({"type": "submit-bid", "payload": {"amount": 5}})).await;
    send(&mut alice, json!({"type": "submit-bid", "payload": {"amount": 40}})).await;
    send(&mut bob, json!({"type": "submit-bid", "payload": {"amount": 25}})).await;
    // Administrator bids are refused silently.
    send(&mut admin, json!({"type": "submit-bid", "payload": {"amount": 99}})).await;

    assert_eq!(wait_for(&mut bob, "bid-accepted").await["amount"], 25.0);

    let settled = wait_for(&mut bob, "round-settled").await;
    assert_eq!(settled["label"], "Player A");
    assert_eq!(
        settled["offers"],
        json!([
            {"participantId": alice_id, "name": "Alice", "amount": 40.0},
            {"participantId": bob_id, "name": "Bob", "amount": 25.0},
        ])
    );
    assert_eq!(settled["winner"]["participantId"], alice_id.as_str());

    let Ok(snapshot) = reqwest::get(format!("http://{addr}/api/v1/session")).await else {
        panic!("snapshot request");
    };
    let Ok(body) = snapshot.json::<Value>().await else {
        panic!("snapshot json");
    };
    assert_eq!(body["phase"], "idle");
    assert_eq!(body["adminId"], admin_id.as_str());
}

#[tokio::test]
async fn malformed_frames_do_not_close_the_connection() {
    let addr = spawn_server().await;
    let (mut ws, _) = participant(addr).await;

    let Ok(()) = ws.send(Message::text("{not json")).await else {
        panic!("ws send");
    };
    send(&mut ws, json!({"type": "cancel-round", "payload": {}})).await;
    send(&mut ws, json!({"type": "submit-bid", "payload": {"amount": "lots"}})).await;

    send(
        &mut ws,
        json!({"type": "join-lobby", "payload": {"displayName": "  "}}),
    )
    .await;
    let roster = loop {
        let roster = wait_for(&mut ws, "roster-update").await;
        if roster.as_array().is_some_and(|r| !r.is_empty()) {
            break roster;
        }
    };
    let Some(name) = roster[0]["displayName"].as_str() else {
        panic!("roster entries carry a name");
    };
    assert!(name.starts_with("Participant-"));
}

#[tokio::test]
async fn health_endpoint_is_served() {
    let addr = spawn_server().await;
    let Ok(response) = reqwest::get(format!("http://{addr}/health")).await else {
        panic!("health request");
    };
    assert!(response.status().is_success());
    let Ok(body) = response.json::<Value>().await else {
        panic!("health json");
    };
    assert_eq!(body["status"], "healthy");
}
