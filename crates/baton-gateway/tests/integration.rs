//! Gateway integration tests — start a real gateway and interact via WS + HTTP.
//!
//! Run with: `cargo test -p baton-gateway --test integration`

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use baton_core::config::Config;
use baton_core::names::FixedNames;
use baton_core::protocol::{NewSessionResponse, UpdateMessage};
use baton_gateway::{GatewayState, SessionSettings};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Find an available port.
fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Start a gateway with deterministic participant names and a slow ticker.
async fn start_test_gateway(names: &[&str]) -> (Arc<GatewayState>, u16) {
    let port = find_free_port();

    let config: Config = serde_json::from_value(json!({
        "server": { "port": port, "bind": "127.0.0.1" },
    }))
    .unwrap();
    let settings = SessionSettings {
        tick_interval: Duration::from_secs(3600),
        name_attempts: 4,
        names: Arc::new(FixedNames::new(names)),
    };
    let state = Arc::new(GatewayState::with_settings(Arc::new(config), settings));

    // Start gateway in background
    let state_clone = state.clone();
    tokio::spawn(async move {
        let _ = baton_gateway::start_gateway(state_clone, port).await;
    });

    // Wait for gateway to be ready
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .is_ok()
        {
            break;
        }
    }

    (state, port)
}

async fn new_session(port: u16) -> String {
    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/new-session"))
        .send()
        .await
        .expect("new-session request failed");
    assert!(resp.status().is_success());
    resp.json::<NewSessionResponse>().await.unwrap().session_id
}

async fn connect(port: u16, session_id: &str) -> Ws {
    let url = format!("ws://127.0.0.1:{port}/s/{session_id}/ws");
    // Disable Nagle so small command frames are not coalesced across sleeps
    let (ws, _) = tokio_tungstenite::connect_async_with_config(&url, None, true)
        .await
        .expect("WS connect failed");
    ws
}

/// Read the next `update` frame.
async fn next_update(ws: &mut Ws) -> UpdateMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for update")
            .expect("stream ended")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Read updates until one satisfies `pred`.
async fn update_until(ws: &mut Ws, pred: impl Fn(&UpdateMessage) -> bool) -> UpdateMessage {
    for _ in 0..20 {
        let update = next_update(ws).await;
        if pred(&update) {
            return update;
        }
    }
    panic!("no matching update within 20 frames");
}

async fn send_command(ws: &mut Ws, command: &str) {
    let frame = json!({ "type": "command", "command": command });
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_state, port) = start_test_gateway(&["A"]).await;

    let resp = reqwest::get(format!("http://127.0.0.1:{port}/health"))
        .await
        .expect("Health request failed");

    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let (_state, port) = start_test_gateway(&["A"]).await;

    let url = format!("ws://127.0.0.1:{port}/s/does-not-exist/ws");
    let err = connect_async(&url).await.expect_err("connect should fail");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(resp) => assert_eq!(resp.status(), 404),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_first_participant_becomes_controller() {
    let (_state, port) = start_test_gateway(&["A", "B"]).await;
    let session_id = new_session(port).await;

    let mut a = connect(port, &session_id).await;
    let update = next_update(&mut a).await;
    assert_eq!(update.kind, "update");
    assert_eq!(update.your_id, "A");
    assert_eq!(update.snapshot.active_client, "A");
    assert_eq!(update.snapshot.clients, vec!["A"]);
    assert_eq!(update.snapshot.time, 0);

    let mut b = connect(port, &session_id).await;
    let update = next_update(&mut b).await;
    assert_eq!(update.your_id, "B");
    assert_eq!(update.snapshot.active_client, "A");

    // A learns about B through the broadcast
    update_until(&mut a, |u| u.snapshot.clients.len() == 2).await;
}

#[tokio::test]
async fn test_start_pause_measures_elapsed() {
    let (_state, port) = start_test_gateway(&["A"]).await;
    let session_id = new_session(port).await;

    let mut a = connect(port, &session_id).await;
    next_update(&mut a).await;

    send_command(&mut a, "start").await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    send_command(&mut a, "pause").await;

    let paused = update_until(&mut a, |u| u.snapshot.time > 100).await;
    assert!(
        (200..2000).contains(&paused.snapshot.time),
        "elapsed {}",
        paused.snapshot.time
    );

    // Frozen once paused
    tokio::time::sleep(Duration::from_millis(200)).await;
    send_command(&mut a, "pause").await;
    send_command(&mut a, "start").await;
    let resumed = next_update(&mut a).await;
    assert!(resumed.snapshot.time >= paused.snapshot.time);
}

#[tokio::test]
async fn test_next_rotates_through_roster() {
    let (_state, port) = start_test_gateway(&["A", "B", "C"]).await;
    let session_id = new_session(port).await;

    let mut a = connect(port, &session_id).await;
    next_update(&mut a).await;
    let mut b = connect(port, &session_id).await;
    next_update(&mut b).await;
    let mut c = connect(port, &session_id).await;
    next_update(&mut c).await;
    update_until(&mut a, |u| u.snapshot.clients.len() == 3).await;

    send_command(&mut a, "start").await;
    send_command(&mut a, "next").await;
    update_until(&mut b, |u| u.snapshot.active_client == "B").await;

    // A no longer controls the session
    send_command(&mut a, "reset").await;

    send_command(&mut b, "next").await;
    update_until(&mut c, |u| u.snapshot.active_client == "C").await;

    send_command(&mut c, "next").await;
    let update = update_until(&mut a, |u| u.snapshot.lap_history.len() == 3).await;
    assert_eq!(update.snapshot.active_client, "A");
    let laps: Vec<&str> = update
        .snapshot
        .lap_history
        .iter()
        .map(|l| l.client.as_str())
        .collect();
    assert_eq!(laps, vec!["A", "B", "C"]);
    assert_eq!(update.snapshot.last_lap_client, "");
    assert_eq!(update.snapshot.lap_time, 0);
    assert_eq!(update.snapshot.time, 0);
}

#[tokio::test]
async fn test_controller_disconnect_hands_off_to_front() {
    let (state, port) = start_test_gateway(&["A", "B", "C"]).await;
    let session_id = new_session(port).await;

    let mut a = connect(port, &session_id).await;
    next_update(&mut a).await;
    let mut b = connect(port, &session_id).await;
    next_update(&mut b).await;
    let mut c = connect(port, &session_id).await;
    next_update(&mut c).await;

    a.close(None).await.ok();
    drop(a);

    let update = update_until(&mut b, |u| u.snapshot.clients == ["B", "C"]).await;
    assert_eq!(update.snapshot.active_client, "B");

    let update = update_until(&mut c, |u| u.snapshot.clients == ["B", "C"]).await;
    assert_eq!(update.snapshot.active_client, "B");
    assert_eq!(update.your_id, "C");

    let session = state.sessions.lookup(&session_id).await.unwrap();
    assert_eq!(session.snapshot().await.unwrap().active_client, "B");
}

#[tokio::test]
async fn test_bad_frames_do_not_drop_connection() {
    let (_state, port) = start_test_gateway(&["A"]).await;
    let session_id = new_session(port).await;

    let mut a = connect(port, &session_id).await;
    next_update(&mut a).await;

    a.send(Message::Text("not json".to_string().into())).await.unwrap();
    a.send(Message::Text(r#"{"type":"chat"}"#.to_string().into())).await.unwrap();
    send_command(&mut a, "teleport").await;
    send_command(&mut a, "start").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    send_command(&mut a, "pause").await;

    // Still connected and still in control
    let update = update_until(&mut a, |u| u.snapshot.time > 0).await;
    assert_eq!(update.snapshot.active_client, "A");
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (_state, port) = start_test_gateway(&["A", "B"]).await;
    let first = new_session(port).await;
    let second = new_session(port).await;
    assert_ne!(first, second);

    let mut x = connect(port, &first).await;
    next_update(&mut x).await;
    let mut y = connect(port, &second).await;
    let update = next_update(&mut y).await;

    // Each session has its own roster and controller
    assert_eq!(update.snapshot.clients.len(), 1);
    assert_eq!(update.snapshot.active_client, update.your_id);
}
