//! End-to-end tests: a real server on a random port, clients speaking JSON
//! frames over WebSocket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use stakemate::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = StakemateServerBuilder::new()
        .bind("127.0.0.1:0")
        .vault(SecretVault::new(MasterKey::from_bytes([3u8; 32])))
        .build(ChessRules::new())
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

/// A connected client that numbers its own requests.
struct Client {
    ws: ClientWs,
    next_id: u64,
    connection_id: u64,
}

impl Client {
    /// Connects and consumes the `welcome` event.
    async fn connect(addr: &str) -> Self {
        let mut client = Self {
            ws: connect(addr).await,
            next_id: 1,
            connection_id: 0,
        };
        let welcome = client.recv().await;
        assert_eq!(welcome["type"], "event");
        assert_eq!(welcome["seq"], 1);
        assert_eq!(welcome["event"]["type"], "welcome");
        assert_eq!(welcome["event"]["protocol_version"], 1);
        client.connection_id = welcome["event"]["connection_id"]
            .as_u64()
            .expect("numeric connection id");
        client
    }

    async fn send_text(&mut self, text: String) {
        self.ws.send(Message::text(text)).await.expect("send");
    }

    async fn recv(&mut self) -> Value {
        let msg = tokio::time::timeout(Duration::from_secs(2), self.ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("recv");
        serde_json::from_str(msg.to_text().expect("text frame")).expect("json frame")
    }

    /// Sends a request; returns the events that arrived before its response,
    /// then the reply.
    async fn request(&mut self, request: Value) -> (Vec<Value>, Value) {
        let id = self.next_id;
        self.next_id += 1;
        self.send_text(json!({ "id": id, "request": request }).to_string())
            .await;

        let mut events = Vec::new();
        loop {
            let frame = self.recv().await;
            match frame["type"].as_str() {
                Some("event") => events.push(frame["event"].clone()),
                Some("response") => {
                    assert_eq!(frame["id"], id);
                    return (events, frame["reply"].clone());
                }
                other => panic!("unexpected frame type {other:?}"),
            }
        }
    }

    /// Waits for the next event frame.
    async fn event(&mut self) -> Value {
        let frame = self.recv().await;
        assert_eq!(frame["type"], "event", "expected event, got {frame}");
        frame["event"].clone()
    }

    async fn play(&mut self, code: &str, uci: &str) -> Value {
        let (_, reply) = self
            .request(json!({
                "type": "make_move",
                "code": code,
                "move": { "from": &uci[0..2], "to": &uci[2..4] },
            }))
            .await;
        reply
    }
}

/// A creates, B joins, both escrow. Every pending push is consumed.
async fn started_match(addr: &str) -> (Client, Client, String) {
    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;

    let (_, reply) = a
        .request(json!({ "type": "create_room", "display_name": "Ann" }))
        .await;
    assert_eq!(reply["type"], "created");
    let code = reply["code"].as_str().expect("code").to_owned();

    let (_, reply) = b
        .request(json!({ "type": "join_room", "code": code, "display_name": "Bob" }))
        .await;
    assert_eq!(reply["type"], "ok");
    assert_eq!(a.event().await["type"], "room_info");

    let (_, reply) = a
        .request(json!({ "type": "submit_secret", "code": code, "secret": "alpha" }))
        .await;
    assert_eq!(reply["type"], "ok");
    assert_eq!(b.event().await["type"], "room_info");

    let (events, reply) = b
        .request(json!({ "type": "submit_secret", "code": code, "secret": "beta" }))
        .await;
    assert_eq!(reply["type"], "ok");
    assert_eq!(events[0]["type"], "match_started");
    assert_eq!(a.event().await["type"], "match_started");
    assert_eq!(a.event().await["type"], "room_info");

    (a, b, code)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_welcome_assigns_distinct_connection_ids() {
    let addr = start_server().await;
    let a = Client::connect(&addr).await;
    let b = Client::connect(&addr).await;
    assert_ne!(a.connection_id, b.connection_id);
}

#[tokio::test]
async fn test_create_room_pushes_room_info_before_reply() {
    let addr = start_server().await;
    let mut a = Client::connect(&addr).await;

    let (events, reply) = a
        .request(json!({ "type": "create_room", "display_name": "  Ann  " }))
        .await;

    assert_eq!(reply["type"], "created");
    let code = reply["code"].as_str().unwrap();
    assert_eq!(code.len(), 6);

    assert_eq!(events.len(), 1);
    let snapshot = &events[0]["snapshot"];
    assert_eq!(events[0]["type"], "room_info");
    assert_eq!(snapshot["code"], code);
    assert_eq!(snapshot["status"], "waiting");
    assert_eq!(snapshot["players"][0]["display_name"], "Ann");
    assert_eq!(snapshot["players"][0]["side"], "first");
    assert_eq!(snapshot["players"][0]["has_secret"], false);
    assert_eq!(snapshot["winner"], Value::Null);
}

#[tokio::test]
async fn test_error_reply_shape() {
    let addr = start_server().await;
    let mut a = Client::connect(&addr).await;

    let (events, reply) = a
        .request(json!({ "type": "join_room", "code": "ZZZZ" }))
        .await;
    assert!(events.is_empty());
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["kind"], "room_not_found");
    assert_eq!(reply["code"], 404);
    assert!(reply["message"].as_str().is_some());
}

#[tokio::test]
async fn test_room_info_for_unknown_room_is_null() {
    let addr = start_server().await;
    let mut a = Client::connect(&addr).await;

    let (_, reply) = a.request(json!({ "type": "room_info", "code": "QQQQQQ" })).await;
    assert_eq!(reply, json!({ "type": "room_info", "snapshot": null }));
}

#[tokio::test]
async fn test_malformed_frame_gets_bad_request_with_recovered_id() {
    let addr = start_server().await;
    let mut a = Client::connect(&addr).await;

    a.send_text(r#"{"id": 41, "request": {"type": "fly_to_moon"}}"#.into())
        .await;
    let frame = a.recv().await;
    assert_eq!(frame["type"], "response");
    assert_eq!(frame["id"], 41);
    assert_eq!(frame["reply"]["kind"], "bad_request");
    assert_eq!(frame["reply"]["code"], 400);

    a.send_text("not json at all".into()).await;
    let frame = a.recv().await;
    assert_eq!(frame["id"], 0);
    assert_eq!(frame["reply"]["kind"], "bad_request");

    // The connection survives malformed frames.
    let (_, reply) = a.request(json!({ "type": "leave_room" })).await;
    assert_eq!(reply["kind"], "not_in_room");
}

#[tokio::test]
async fn test_checkmate_reveals_secret_to_winner_only() {
    let addr = start_server().await;
    let (mut a, mut b, code) = started_match(&addr).await;

    let script = [("a", "e2e4"), ("b", "f7f6"), ("a", "d2d4"), ("b", "g7g5")];
    for (who, mv) in script {
        let (mover, other) = if who == "a" { (&mut a, &mut b) } else { (&mut b, &mut a) };
        let reply = mover.play(&code, mv).await;
        assert_eq!(reply["type"], "ok", "{mv}: {reply}");
        assert_eq!(other.event().await["type"], "move_applied");
        assert_eq!(other.event().await["type"], "room_info");
    }

    let (events, reply) = a
        .request(json!({
            "type": "make_move",
            "code": code,
            "move": { "from": "d1", "to": "h5" },
        }))
        .await;
    assert_eq!(reply["type"], "ok");

    let types: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        ["move_applied", "match_ended", "secret_revealed", "room_info"]
    );
    assert_eq!(events[0]["notation"], "Qh5");
    assert_eq!(events[0]["side"], "first");
    assert_eq!(events[1]["reason"], "checkmate");
    assert_eq!(events[1]["winner"], "first");
    assert_eq!(events[2]["secret"], "beta");
    assert_eq!(events[3]["snapshot"]["status"], "finished");

    assert_eq!(b.event().await["type"], "move_applied");
    let ended = b.event().await;
    assert_eq!(ended["type"], "match_ended");
    assert_eq!(ended["winner"], "first");
    // The loser's next push is room_info, never a reveal.
    assert_eq!(b.event().await["type"], "room_info");
}

#[tokio::test]
async fn test_rejected_move_is_private() {
    let addr = start_server().await;
    let (mut a, mut b, code) = started_match(&addr).await;

    let reply = b.play(&code, "e7e5").await;
    assert_eq!(reply["kind"], "not_your_turn");
    assert_eq!(reply["code"], 403);

    let reply = a.play(&code, "e2e5").await;
    assert_eq!(reply["kind"], "illegal_move");

    // A legal move afterwards is the first thing B sees.
    assert_eq!(a.play(&code, "e2e4").await["type"], "ok");
    let pushed = b.event().await;
    assert_eq!(pushed["type"], "move_applied");
    assert_eq!(pushed["move"], json!({ "from": "e2", "to": "e4" }));
}

#[tokio::test]
async fn test_closing_socket_leaves_room() {
    let addr = start_server().await;
    let (a, mut b, _code) = started_match(&addr).await;

    drop(a);

    let info = b.event().await;
    assert_eq!(info["type"], "room_info");
    assert_eq!(info["snapshot"]["status"], "waiting");
    assert_eq!(info["snapshot"]["players"].as_array().unwrap().len(), 1);
    assert_eq!(info["snapshot"]["players"][0]["display_name"], "Bob");
}

#[tokio::test]
async fn test_event_sequence_numbers_increase() {
    let addr = start_server().await;
    let mut a = Client::connect(&addr).await;

    a.send_text(json!({ "id": 1, "request": { "type": "create_room" } }).to_string())
        .await;
    let event = a.recv().await;
    assert_eq!(event["type"], "event");
    assert_eq!(event["seq"], 2);
    let response = a.recv().await;
    assert_eq!(response["type"], "response");
    assert!(response.get("seq").is_none());

    a.send_text(json!({ "id": 2, "request": { "type": "leave_room" } }).to_string())
        .await;
    assert_eq!(a.recv().await["reply"]["type"], "ok");
}
