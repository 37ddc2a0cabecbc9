//! Document session tests over the loopback transport

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use scribe_client::{
    spawn, AuthError, AuthProvider, DocumentSession, DocumentSnapshot, LoopbackConnector,
    LoopbackPeer, SessionConfig, SessionContext, SessionError, SessionEvent, Tokens, UserId,
};
use scribe_editor::{EditEvent, EditorError, Permission, Selection};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

#[derive(Clone)]
struct FakeAuth {
    result: Result<Tokens, AuthError>,
    calls: Arc<AtomicUsize>,
}

impl FakeAuth {
    fn granting(access: &str) -> Self {
        Self {
            result: Ok(tokens(access, true)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn rejecting() -> Self {
        Self {
            result: Err(AuthError::Rejected("refresh token expired".to_string())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AuthProvider for FakeAuth {
    async fn refresh(&self, _refresh_token: &str) -> Result<Tokens, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

fn tokens(access: &str, valid: bool) -> Tokens {
    let expires_at = if valid {
        Utc::now() + chrono::Duration::hours(1)
    } else {
        Utc::now() - chrono::Duration::minutes(1)
    };
    Tokens {
        access: access.to_string(),
        refresh: "refresh-1".to_string(),
        expires_at,
    }
}

fn snapshot(text: &str, permission: u8) -> DocumentSnapshot {
    serde_json::from_value(json!({
        "title": "Draft",
        "editorContent": {"blocks": [{"key": "a", "type": "unstyled", "text": text}]},
        "collaborators": [{"user": 1, "username": "owner", "permission": 0}],
        "permission": permission
    }))
    .unwrap()
}

type TestSession = DocumentSession<LoopbackConnector, FakeAuth>;

fn setup(
    valid_token: bool,
    auth: FakeAuth,
    interval_ms: u64,
) -> (TestSession, LoopbackConnector, mpsc::UnboundedReceiver<LoopbackPeer>) {
    let (connector, peers) = LoopbackConnector::new();
    let config = SessionConfig {
        flush_interval_ms: interval_ms,
        ..SessionConfig::default()
    };
    let context = SessionContext {
        user_id: "1".to_string(),
        tokens: tokens("access-1", valid_token),
        permission: Permission::Owner,
    };
    let session = DocumentSession::new(config, context, connector.clone(), auth);
    (session, connector, peers)
}

async fn next_json(peer: &mut LoopbackPeer) -> Value {
    let frame = timeout(WAIT, peer.from_client.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("channel closed");
    serde_json::from_str(&frame).unwrap()
}

#[tokio::test]
async fn test_flush_sends_one_content_message() {
    let (mut session, _connector, mut peers) = setup(true, FakeAuth::granting("x"), 1000);
    session.load("doc-1", "ticket=t1", snapshot("hi", 0)).await.unwrap();
    let mut peer = peers.try_recv().unwrap();
    assert_eq!(peer.endpoint.url(), "ws://127.0.0.1:8000/ws/document/doc-1/?ticket=t1");

    session.handle(EditEvent::InsertChar('!')).await.unwrap();
    session.handle(EditEvent::InsertChar('?')).await.unwrap();

    let report = session.flush().await.unwrap();
    assert_eq!(report.operations, 2);
    assert!(!report.title_sent);

    let msg = next_json(&mut peer).await;
    assert_eq!(
        msg,
        json!({
            "type": "update_document_content",
            "access_token": "access-1",
            "body": {"data": [
                {"type": "insert", "block": "a", "position": 2, "text": "!"},
                {"type": "insert", "block": "a", "position": 3, "text": "?"}
            ]}
        })
    );

    // Nothing pending: no message
    assert!(session.flush().await.unwrap().is_empty());
    assert!(peer.from_client.try_recv().is_err());
}

#[tokio::test]
async fn test_title_sent_once_without_line_breaks() {
    let (mut session, _connector, mut peers) = setup(true, FakeAuth::granting("x"), 1000);
    session.load("doc-1", "ticket=t1", snapshot("", 0)).await.unwrap();
    let mut peer = peers.try_recv().unwrap();

    session.set_title("Q3\nplanning").unwrap();
    assert_eq!(session.title(), Some("Q3planning"));

    let report = session.flush().await.unwrap();
    assert!(report.title_sent);
    assert_eq!(report.operations, 0);

    let msg = next_json(&mut peer).await;
    assert_eq!(msg["type"], "update_document_title");
    assert_eq!(msg["body"]["title"], "Q3planning");

    assert!(session.flush().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_inbound_content_keeps_local_cursor() {
    let (mut session, _connector, _peers) = setup(true, FakeAuth::granting("x"), 1000);
    session.load("doc-1", "ticket=t1", snapshot("hello", 0)).await.unwrap();
    let mut events = session.subscribe();

    session.receive(
        r#"{"type": "update_document_content", "body": {"data": [
            {"type": "insert", "block": "a", "position": 0, "text": ">> "}
        ]}}"#,
    );

    let editor = session.editor().unwrap();
    assert_eq!(editor.document().plain_text(), ">> hello");
    assert_eq!(editor.selection(), &Selection::collapsed("a", 5));
    assert_eq!(editor.pending_count(), 0);
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::ContentChanged { .. })
    ));
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let (mut session, _connector, _peers) = setup(true, FakeAuth::granting("x"), 1000);
    session.load("doc-1", "ticket=t1", snapshot("hello", 0)).await.unwrap();

    session.receive("not json");
    session.receive(r#"{"type": "delete_everything", "body": {}}"#);
    session.receive(r#"{"type": "update_document_content", "body": {"data": "oops"}}"#);

    assert_eq!(session.editor().unwrap().document().plain_text(), "hello");
}

#[tokio::test]
async fn test_remote_title_is_not_echoed() {
    let (mut session, _connector, mut peers) = setup(true, FakeAuth::granting("x"), 1000);
    session.load("doc-1", "ticket=t1", snapshot("", 0)).await.unwrap();
    let mut peer = peers.try_recv().unwrap();

    session.receive(r#"{"type": "update_document_title", "body": {"title": "Renamed"}}"#);
    assert_eq!(session.title(), Some("Renamed"));

    assert!(session.flush().await.unwrap().is_empty());
    assert!(peer.from_client.try_recv().is_err());
}

#[tokio::test]
async fn test_collaborators_tracked_and_invited() {
    let (mut session, _connector, mut peers) = setup(true, FakeAuth::granting("x"), 1000);
    session.load("doc-1", "ticket=t1", snapshot("", 0)).await.unwrap();
    let mut peer = peers.try_recv().unwrap();

    session.receive(
        r#"{"type": "add_new_collaborators", "body": {"user": 2, "username": "dana", "permission": 2}}"#,
    );
    let names: Vec<String> = session
        .collaborators()
        .iter()
        .map(|c| c.display_name())
        .collect();
    assert_eq!(names, vec!["owner", "dana"]);

    session.add_collaborator(UserId::from("erin")).await.unwrap();
    let msg = next_json(&mut peer).await;
    assert_eq!(msg["type"], "add_new_collaborator");
    assert_eq!(msg["body"]["user"], "erin");
}

#[tokio::test]
async fn test_editor_cannot_invite_and_viewer_cannot_retitle() {
    let (mut session, _connector, _peers) = setup(true, FakeAuth::granting("x"), 1000);
    session.load("doc-1", "ticket=t1", snapshot("", 2)).await.unwrap();
    assert!(matches!(
        session.add_collaborator(UserId::Id(9)).await,
        Err(SessionError::PermissionDenied(_))
    ));

    session.load("doc-2", "ticket=t2", snapshot("", 3)).await.unwrap();
    assert!(matches!(
        session.set_title("Mine now"),
        Err(SessionError::Editor(EditorError::ReadOnly))
    ));
    assert!(matches!(
        session.handle(EditEvent::InsertChar('x')).await,
        Err(SessionError::Editor(EditorError::ReadOnly))
    ));
}

#[tokio::test]
async fn test_channel_unavailable_keeps_queue() {
    let (mut session, connector, _peers) = setup(true, FakeAuth::granting("x"), 1000);
    connector.set_available(false);
    session.load("doc-1", "ticket=t1", snapshot("ab", 0)).await.unwrap();
    assert!(!session.is_connected());

    session.handle(EditEvent::InsertChar('c')).await.unwrap();
    assert!(matches!(
        session.flush().await,
        Err(SessionError::ChannelUnavailable)
    ));
    assert_eq!(session.editor().unwrap().pending_count(), 1);
}

#[tokio::test]
async fn test_editor_cannot_retitle() {
    let (mut session, _connector, _peers) = setup(true, FakeAuth::granting("x"), 1000);
    session.load("doc-1", "ticket=t1", snapshot("", 2)).await.unwrap();

    assert!(matches!(
        session.set_title("Renamed"),
        Err(SessionError::Editor(EditorError::ReadOnly))
    ));
    assert_eq!(session.title(), Some("Draft"));
    session.handle(EditEvent::InsertChar('x')).await.unwrap();

    session.load("doc-2", "ticket=t2", snapshot("", 1)).await.unwrap();
    session.set_title("Renamed").unwrap();
    assert_eq!(session.title(), Some("Renamed"));
}

#[tokio::test]
async fn test_flush_connects_once_channel_is_back() {
    let (mut session, connector, mut peers) = setup(true, FakeAuth::granting("x"), 1000);
    connector.set_available(false);
    session.load("doc-1", "ticket=t1", snapshot("ab", 0)).await.unwrap();
    session.handle(EditEvent::InsertChar('c')).await.unwrap();
    assert!(session.flush().await.is_err());

    connector.set_available(true);
    let report = session.flush().await.unwrap();
    assert_eq!(report.operations, 1);
    assert!(session.is_connected());

    let mut peer = peers.try_recv().unwrap();
    assert_eq!(peer.endpoint.ticket, "ticket=t1");
    let msg = next_json(&mut peer).await;
    assert_eq!(msg["body"]["data"][0]["text"], "c");
}

#[tokio::test]
async fn test_flush_reopens_after_peer_hangs_up() {
    let (mut session, _connector, mut peers) = setup(true, FakeAuth::granting("x"), 1000);
    session.load("doc-1", "ticket=t1", snapshot("", 0)).await.unwrap();
    drop(peers.try_recv().unwrap());

    assert_eq!(timeout(WAIT, session.next_frame()).await.unwrap(), None);
    assert!(!session.is_connected());

    session.handle(EditEvent::InsertChar('a')).await.unwrap();
    session.flush().await.unwrap();

    let mut peer = peers.try_recv().unwrap();
    assert_eq!(next_json(&mut peer).await["body"]["data"][0]["text"], "a");
}

#[tokio::test]
async fn test_reconnect_uses_new_ticket_and_keeps_document() {
    let (mut session, _connector, mut peers) = setup(true, FakeAuth::granting("x"), 1000);
    session.load("doc-1", "ticket=t1", snapshot("hi", 0)).await.unwrap();
    let mut first = peers.try_recv().unwrap();
    session.handle(EditEvent::InsertChar('!')).await.unwrap();

    session.reconnect("ticket=t2").await.unwrap();
    assert_eq!(timeout(WAIT, first.from_client.recv()).await.unwrap(), None);

    let mut second = peers.try_recv().unwrap();
    assert_eq!(
        second.endpoint.url(),
        "ws://127.0.0.1:8000/ws/document/doc-1/?ticket=t2"
    );
    assert_eq!(session.editor().unwrap().document().plain_text(), "hi!");

    session.flush().await.unwrap();
    assert_eq!(next_json(&mut second).await["body"]["data"][0]["text"], "!");
}

#[tokio::test]
async fn test_reconnect_without_document() {
    let (mut session, _connector, _peers) = setup(true, FakeAuth::granting("x"), 1000);
    assert!(matches!(
        session.reconnect("ticket=t2").await,
        Err(SessionError::NoDocument)
    ));
}

#[tokio::test]
async fn test_expired_token_refreshed_once() {
    let auth = FakeAuth::granting("access-2");
    let (mut session, _connector, mut peers) = setup(false, auth.clone(), 1000);
    session.load("doc-1", "ticket=t1", snapshot("", 0)).await.unwrap();
    let mut peer = peers.try_recv().unwrap();

    session.handle(EditEvent::InsertChar('a')).await.unwrap();
    session.flush().await.unwrap();
    session.handle(EditEvent::InsertChar('b')).await.unwrap();
    session.flush().await.unwrap();

    assert_eq!(auth.calls(), 1);
    assert_eq!(next_json(&mut peer).await["access_token"], "access-2");
    assert_eq!(next_json(&mut peer).await["access_token"], "access-2");
}

#[tokio::test]
async fn test_failed_refresh_abandons_send() {
    let auth = FakeAuth::rejecting();
    let (mut session, _connector, mut peers) = setup(false, auth.clone(), 1000);
    session.load("doc-1", "ticket=t1", snapshot("", 0)).await.unwrap();
    let mut peer = peers.try_recv().unwrap();

    session.handle(EditEvent::InsertChar('a')).await.unwrap();
    let result = session.flush().await;

    assert!(matches!(result, Err(SessionError::ReauthenticationRequired)));
    assert_eq!(auth.calls(), 1);
    assert_eq!(session.editor().unwrap().pending_count(), 1);
    assert!(peer.from_client.try_recv().is_err());
}

#[tokio::test]
async fn test_switching_documents_flushes_first() {
    let (mut session, _connector, mut peers) = setup(true, FakeAuth::granting("x"), 1000);
    session.load("doc-1", "ticket=t1", snapshot("one", 0)).await.unwrap();
    let mut first = peers.try_recv().unwrap();

    session.handle(EditEvent::InsertChar('!')).await.unwrap();
    session.load("doc-2", "ticket=t2", snapshot("two", 0)).await.unwrap();

    let msg = next_json(&mut first).await;
    assert_eq!(msg["body"]["data"][0]["text"], "!");
    assert_eq!(timeout(WAIT, first.from_client.recv()).await.unwrap(), None);

    let second = peers.try_recv().unwrap();
    assert_eq!(second.endpoint.document_id, "doc-2");
    assert_eq!(session.document_id(), Some("doc-2"));
    assert_eq!(session.editor().unwrap().pending_count(), 0);
}

#[tokio::test]
async fn test_scheduler_flushes_on_tick_and_applies_inbound() {
    let (session, _connector, mut peers) = setup(true, FakeAuth::granting("x"), 20);
    let mut events = session.subscribe();
    let (handle, task) = spawn(session);

    handle.open("doc-1", "ticket=t1", snapshot("hi", 0)).await.unwrap();
    handle.edit(EditEvent::InsertChar('!')).await.unwrap();

    let mut peer = timeout(WAIT, peers.recv()).await.unwrap().unwrap();
    let msg = next_json(&mut peer).await;
    assert_eq!(msg["type"], "update_document_content");
    assert_eq!(msg["body"]["data"][0]["text"], "!");

    peer.to_client
        .send(r#"{"type": "update_document_title", "body": {"title": "Shared"}}"#.to_string())
        .unwrap();
    let renamed = timeout(WAIT, async {
        loop {
            if let Ok(SessionEvent::TitleChanged(title)) = events.recv().await {
                return title;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(renamed, "Shared");

    handle.close().await.unwrap();
    let session = timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert_eq!(session.document_id(), None);
}

#[tokio::test]
async fn test_scheduler_stops_when_reauthentication_required() {
    let (session, _connector, _peers) = setup(false, FakeAuth::rejecting(), 20);
    let (handle, task) = spawn(session);

    handle.open("doc-1", "ticket=t1", snapshot("", 0)).await.unwrap();
    handle.edit(EditEvent::InsertChar('a')).await.unwrap();

    let result = timeout(WAIT, task).await.unwrap().unwrap();
    assert!(matches!(result, Err(SessionError::ReauthenticationRequired)));
    assert!(matches!(handle.flush().await, Err(SessionError::Stopped)));
}

#[tokio::test]
async fn test_scheduler_reconnect_rekeys_channel() {
    let (session, _connector, mut peers) = setup(true, FakeAuth::granting("x"), 20);
    let (handle, task) = spawn(session);

    handle.open("doc-1", "ticket=t1", snapshot("", 0)).await.unwrap();
    let _first = timeout(WAIT, peers.recv()).await.unwrap().unwrap();

    handle.reconnect("ticket=t2").await.unwrap();
    handle.edit(EditEvent::InsertChar('z')).await.unwrap();

    let mut second = timeout(WAIT, peers.recv()).await.unwrap().unwrap();
    assert_eq!(second.endpoint.ticket, "ticket=t2");
    assert_eq!(next_json(&mut second).await["body"]["data"][0]["text"], "z");

    handle.close().await.unwrap();
    timeout(WAIT, task).await.unwrap().unwrap().unwrap();
}
