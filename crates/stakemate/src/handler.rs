//! Per-connection handler: welcome, request loop, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbox. The flow is:
//!   1. Register with the coordinator → `welcome` is queued
//!   2. Loop: receive frames → decode → coordinator → queue the reply
//!   3. On exit the guard unregisters the connection, which leaves its room
//!
//! Replies and pushes share the outbox, so a client always sees the events
//! a request caused before the reply to that request.

use std::sync::Arc;

use serde::Deserialize;
use stakemate_protocol::{
    ClientFrame, Codec, ConnectionId, ErrorKind, Reply, ServerFrame,
};
use stakemate_room::RulesEngine;
use stakemate_transport::{Connection, WebSocketConnection, WebSocketWriter};
use tokio::sync::mpsc;

use crate::StakemateError;
use crate::coordinator::Outbound;
use crate::server::ServerState;

/// Drop guard that disconnects the connection when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async cleanup.
struct ConnectionGuard<R: RulesEngine, C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<R, C>>,
}

impl<R: RulesEngine, C: Codec> Drop for ConnectionGuard<R, C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.coordinator.disconnect(conn_id).await;
        });
    }
}

/// Just enough of a client frame to answer a malformed one.
#[derive(Deserialize)]
struct FrameId {
    id: u64,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<R, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<R, C>>,
) -> Result<(), StakemateError>
where
    R: RulesEngine,
    C: Codec + Clone,
{
    let conn_id = conn.id();
    tracing::debug!(conn = %conn_id, "handling new connection");

    let (writer, mut reader) = conn.split();
    let (outbox, inbox) = mpsc::unbounded_channel();
    tokio::spawn(write_loop::<R::Move, C>(
        conn_id,
        writer,
        inbox,
        state.codec.clone(),
    ));

    state.coordinator.connect(conn_id, outbox.clone()).await;
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    loop {
        let text = match reader.recv().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!(conn = %conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => return Err(e.into()),
        };

        let frame: ClientFrame<R::Move> = match state.codec.decode(&text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(conn = %conn_id, error = %e, "failed to decode frame");
                let id = state
                    .codec
                    .decode::<FrameId>(&text)
                    .map(|f| f.id)
                    .unwrap_or(0);
                let reply = Reply::error(
                    ErrorKind::BadRequest,
                    format!("malformed request: {e}"),
                );
                let _ = outbox.send(Outbound::Reply { id, reply });
                continue;
            }
        };

        let reply = state.coordinator.handle(conn_id, frame.request).await;
        if outbox.send(Outbound::Reply { id: frame.id, reply }).is_err() {
            tracing::debug!(conn = %conn_id, "writer gone, dropping connection");
            break;
        }
    }

    // _guard drops here → disconnect fires.
    Ok(())
}

/// Drains a connection's outbox onto the socket.
///
/// Runs until every sender is gone (the handler has exited and the
/// coordinator has forgotten the connection) or the socket fails.
async fn write_loop<M, C>(
    conn_id: ConnectionId,
    mut writer: WebSocketWriter,
    mut inbox: mpsc::UnboundedReceiver<Outbound<M>>,
    codec: C,
) where
    M: serde::Serialize,
    C: Codec,
{
    let mut seq: u64 = 1;
    while let Some(outbound) = inbox.recv().await {
        let frame = match outbound {
            Outbound::Reply { id, reply } => ServerFrame::Response { id, reply },
            Outbound::Event(event) => ServerFrame::Event {
                seq: next_seq(&mut seq),
                event,
            },
        };
        let text = match codec.encode(&frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(conn = %conn_id, error = %e, "failed to encode frame");
                continue;
            }
        };
        if let Err(e) = writer.send(text).await {
            tracing::debug!(conn = %conn_id, error = %e, "send failed");
            return;
        }
    }
    let _ = writer.close().await;
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
