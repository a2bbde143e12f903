use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::identity::IdentityProvider;
use crate::persistence::{GameId, GameRepository};
use crate::protocol::{self, ClientCommand, ServerMessage};
use crate::session::{Connection, ConnectionId, SessionError, SessionRegistry};

/// Runs the LEAVE path for every room a connection joined when its socket
/// task ends, however it ends.
struct CleanupGuard<G, I>
where
    G: GameRepository + 'static,
    I: IdentityProvider + 'static,
{
    registry: Arc<SessionRegistry<G, I>>,
    conn: ConnectionId,
    joined: HashSet<GameId>,
}

impl<G, I> Drop for CleanupGuard<G, I>
where
    G: GameRepository + 'static,
    I: IdentityProvider + 'static,
{
    fn drop(&mut self) {
        if self.joined.is_empty() {
            return;
        }
        let registry = Arc::clone(&self.registry);
        let conn = self.conn;
        let joined = std::mem::take(&mut self.joined);
        tracing::info!(%conn, rooms = joined.len(), "Socket closed, scheduling room cleanup");
        tokio::spawn(async move {
            registry.disconnect(conn, joined).await;
        });
    }
}

/// Parse and run one text frame. Failures are reported to the sender as
/// ERROR; the socket stays open either way.
async fn handle_frame<G, I>(
    registry: &SessionRegistry<G, I>,
    connection: &Connection,
    joined: &mut HashSet<GameId>,
    text: &str,
) where
    G: GameRepository + 'static,
    I: IdentityProvider + 'static,
{
    let result = match protocol::parse_command(text) {
        Ok(cmd) => {
            let game_id = cmd.game_id();
            let change = MembershipChange::of(&cmd);
            let result = registry.dispatch(connection, cmd).await;
            if let Some(change) = change {
                track_membership(joined, game_id, change, &result);
            }
            result
        }
        Err(e) => Err(e),
    };

    if let Err(err) = result {
        tracing::debug!(conn = %connection.id(), error = %err, "Command rejected");
        connection.send(ServerMessage::error(&err));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MembershipChange {
    Join,
    Leave,
}

impl MembershipChange {
    fn of(cmd: &ClientCommand) -> Option<Self> {
        match cmd {
            ClientCommand::Connect { .. } => Some(Self::Join),
            ClientCommand::Leave { .. } => Some(Self::Leave),
            _ => None,
        }
    }
}

/// Keep `joined` in step with the rooms that still hold this connection.
///
/// A successful CONNECT adds the room. A LEAVE only drops it once the room
/// no longer has the connection, i.e. on success or `NotConnected`; any
/// other LEAVE failure leaves the registration in place for the guard.
fn track_membership(
    joined: &mut HashSet<GameId>,
    game_id: GameId,
    change: MembershipChange,
    result: &Result<(), SessionError>,
) {
    match (change, result) {
        (MembershipChange::Join, Ok(())) => {
            joined.insert(game_id);
        }
        (MembershipChange::Leave, Ok(()) | Err(SessionError::NotConnected(_))) => {
            joined.remove(&game_id);
        }
        _ => {}
    }
}

pub async fn ws_handler<G, I>(
    ws: WebSocketUpgrade,
    State(registry): State<Arc<SessionRegistry<G, I>>>,
) -> impl IntoResponse
where
    G: GameRepository + 'static,
    I: IdentityProvider + 'static,
{
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

async fn handle_socket<G, I>(socket: WebSocket, registry: Arc<SessionRegistry<G, I>>)
where
    G: GameRepository + 'static,
    I: IdentityProvider + 'static,
{
    let (mut sender, mut receiver) = socket.split();
    let (outbox, outbox_rx) = mpsc::unbounded_channel();
    let connection = Connection::new(outbox);
    let mut guard = CleanupGuard {
        registry: Arc::clone(&registry),
        conn: connection.id(),
        joined: HashSet::new(),
    };
    tracing::info!(conn = %connection.id(), "Socket opened");

    let writer = tokio::spawn(async move {
        let mut outgoing = UnboundedReceiverStream::new(outbox_rx);
        while let Some(msg) = outgoing.next().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode server message");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // One command runs to completion before the next frame is read.
    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };
        handle_frame(&*registry, &connection, &mut guard.joined, text.as_str()).await;
    }

    tracing::info!(conn = %connection.id(), "Socket closed");
    writer.abort();
    drop(guard);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentityStore;
    use crate::persistence::MemoryGameStore;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    type Registry = SessionRegistry<MemoryGameStore, MemoryIdentityStore>;

    struct Fixture {
        registry: Arc<Registry>,
        game_id: GameId,
        white: String,
        black: String,
    }

    async fn fixture() -> Fixture {
        let repo = Arc::new(MemoryGameStore::new());
        let identity = Arc::new(MemoryIdentityStore::new());
        let white = identity.issue_token("alice").await;
        let black = identity.issue_token("bob").await;
        let game_id = repo
            .create_game("socket game", Some("alice"), Some("bob"))
            .await
            .unwrap();
        let registry = SessionRegistry::new(repo, identity, Duration::from_secs(600));
        Fixture {
            registry: Arc::new(registry),
            game_id,
            white,
            black,
        }
    }

    fn client() -> (Connection, UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(tx), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn frame(kind: &str, game_id: GameId, token: &str) -> String {
        format!(r#"{{"type":"{kind}","gameId":{game_id},"authToken":"{token}"}}"#)
    }

    async fn next_message(rx: &mut UnboundedReceiver<ServerMessage>) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("outbox closed")
    }

    #[test]
    fn test_track_membership() {
        let mut joined = HashSet::new();

        track_membership(&mut joined, 1, MembershipChange::Join, &Err(SessionError::Auth));
        assert!(joined.is_empty());
        track_membership(&mut joined, 1, MembershipChange::Join, &Ok(()));
        assert!(joined.contains(&1));

        for err in [
            SessionError::Auth,
            SessionError::Internal("Room closed".into()),
            SessionError::Persistence("disk full".into()),
        ] {
            track_membership(&mut joined, 1, MembershipChange::Leave, &Err(err));
            assert!(joined.contains(&1));
        }

        track_membership(&mut joined, 1, MembershipChange::Leave, &Ok(()));
        assert!(joined.is_empty());

        joined.insert(2);
        track_membership(
            &mut joined,
            2,
            MembershipChange::Leave,
            &Err(SessionError::NotConnected(2)),
        );
        assert!(joined.is_empty());
    }

    #[test]
    fn test_membership_change_of_command() {
        let cmd = protocol::parse_command(&frame("CONNECT", 1, "t")).unwrap();
        assert_eq!(MembershipChange::of(&cmd), Some(MembershipChange::Join));
        let cmd = protocol::parse_command(&frame("LEAVE", 1, "t")).unwrap();
        assert_eq!(MembershipChange::of(&cmd), Some(MembershipChange::Leave));
        let cmd = protocol::parse_command(&frame("RESIGN", 1, "t")).unwrap();
        assert_eq!(MembershipChange::of(&cmd), None);
    }

    #[tokio::test]
    async fn test_malformed_frame_reports_error_and_keeps_going() {
        let f = fixture().await;
        let (a, mut a_rx) = client();
        let mut joined = HashSet::new();

        handle_frame(&*f.registry, &a, &mut joined, "{not json").await;
        let msgs = drain(&mut a_rx);
        assert_eq!(msgs.len(), 1);
        let ServerMessage::Error { error_message } = &msgs[0] else {
            panic!("expected ERROR, got {msgs:?}");
        };
        assert!(error_message.starts_with("Error: bad request"));
        assert!(joined.is_empty());

        handle_frame(&*f.registry, &a, &mut joined, &frame("CONNECT", f.game_id, &f.white)).await;
        assert!(matches!(drain(&mut a_rx)[..], [ServerMessage::LoadGame { .. }]));
        assert!(joined.contains(&f.game_id));
    }

    #[tokio::test]
    async fn test_successful_move_keeps_membership() {
        let f = fixture().await;
        let (a, mut a_rx) = client();
        let mut joined = HashSet::new();

        handle_frame(&*f.registry, &a, &mut joined, &frame("CONNECT", f.game_id, &f.white)).await;
        let mv = format!(
            r#"{{"type":"MAKE_MOVE","gameId":{},"authToken":"{}","move":{{"start":{{"row":2,"col":5}},"end":{{"row":4,"col":5}}}}}}"#,
            f.game_id, f.white
        );
        handle_frame(&*f.registry, &a, &mut joined, &mv).await;
        drain(&mut a_rx);
        assert!(joined.contains(&f.game_id));
    }

    #[tokio::test]
    async fn test_guard_drop_runs_leave_path() {
        let f = fixture().await;
        let (a, _a_rx) = client();
        let (b, mut b_rx) = client();
        let mut a_joined = HashSet::new();
        let mut b_joined = HashSet::new();

        handle_frame(&*f.registry, &a, &mut a_joined, &frame("CONNECT", f.game_id, &f.white)).await;
        handle_frame(&*f.registry, &b, &mut b_joined, &frame("CONNECT", f.game_id, &f.black)).await;
        drain(&mut b_rx);

        drop(CleanupGuard {
            registry: Arc::clone(&f.registry),
            conn: a.id(),
            joined: a_joined,
        });
        assert_eq!(next_message(&mut b_rx).await, ServerMessage::notification("alice left"));
    }

    #[tokio::test]
    async fn test_rejected_leave_still_cleaned_up_on_close() {
        let f = fixture().await;
        let (a, mut a_rx) = client();
        let (b, mut b_rx) = client();
        let mut a_joined = HashSet::new();
        let mut b_joined = HashSet::new();

        handle_frame(&*f.registry, &a, &mut a_joined, &frame("CONNECT", f.game_id, &f.white)).await;
        handle_frame(&*f.registry, &b, &mut b_joined, &frame("CONNECT", f.game_id, &f.black)).await;
        drain(&mut a_rx);
        drain(&mut b_rx);

        handle_frame(&*f.registry, &a, &mut a_joined, &frame("LEAVE", f.game_id, "stale")).await;
        assert_eq!(drain(&mut a_rx), vec![ServerMessage::error(&SessionError::Auth)]);
        assert!(a_joined.contains(&f.game_id));
        assert!(drain(&mut b_rx).is_empty());

        drop(CleanupGuard {
            registry: Arc::clone(&f.registry),
            conn: a.id(),
            joined: a_joined,
        });
        assert_eq!(next_message(&mut b_rx).await, ServerMessage::notification("alice left"));
    }

    #[tokio::test]
    async fn test_explicit_leave_is_not_repeated_on_close() {
        let f = fixture().await;
        let (a, _a_rx) = client();
        let (b, mut b_rx) = client();
        let mut a_joined = HashSet::new();
        let mut b_joined = HashSet::new();

        handle_frame(&*f.registry, &a, &mut a_joined, &frame("CONNECT", f.game_id, &f.white)).await;
        handle_frame(&*f.registry, &b, &mut b_joined, &frame("CONNECT", f.game_id, &f.black)).await;
        drain(&mut b_rx);

        handle_frame(&*f.registry, &a, &mut a_joined, &frame("LEAVE", f.game_id, &f.white)).await;
        assert!(a_joined.is_empty());
        assert_eq!(drain(&mut b_rx), vec![ServerMessage::notification("alice left")]);
    }
}
