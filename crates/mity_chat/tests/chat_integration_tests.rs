//! Chat session flows over the mock connector and a loopback WebSocket server.

use std::collections::HashSet;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use mity_chat::{
    ChatError, ChatSession, ConnectionState, Endpoint, Envelope, MessageRole, MockConnector, Question,
    QuestionOption, SessionEvent, WsConnector,
};

fn mock_session(connector: &MockConnector, project: &str) -> ChatSession {
    ChatSession::new(
        project,
        Box::new(connector.clone()),
        Endpoint::new("http://127.0.0.1:8888"),
    )
}

fn assistant(content: &str) -> Envelope {
    Envelope::Message {
        role: MessageRole::Assistant,
        content: content.to_string(),
        attachments: Vec::new(),
    }
}

fn question(id: &str) -> Envelope {
    Envelope::Question(Question {
        question_id: id.to_string(),
        text: "Which platforms?".to_string(),
        options: vec![QuestionOption::new("web", "Web"), QuestionOption::new("cli", "CLI")],
        multi_select: false,
    })
}

#[tokio::test]
async fn test_transcript_follows_arrival_order() {
    let connector = MockConnector::new();
    let mut chat = mock_session(&connector, "demo-app");
    chat.open().await.unwrap();

    chat.send_message("first", Vec::new()).unwrap();
    connector.push_envelope(&assistant("second"));
    assert_eq!(chat.next_event().await, SessionEvent::Updated { kind: "message" });
    assert!(!chat.store().is_loading());

    chat.send_message("third", Vec::new()).unwrap();
    assert!(chat.store().is_loading());
    connector.push_envelope(&assistant("fourth"));
    chat.next_event().await;

    let transcript = chat.store().transcript();
    let contents: Vec<&str> = transcript.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third", "fourth"]);

    let ids: HashSet<&str> = transcript.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids.len(), transcript.len());
}

#[tokio::test]
async fn test_second_question_replaces_first() {
    let connector = MockConnector::new();
    let mut chat = mock_session(&connector, "demo-app");
    chat.open().await.unwrap();
    chat.send_message("hi", Vec::new()).unwrap();

    connector.push_envelope(&question("q1"));
    connector.push_envelope(&question("q2"));
    chat.next_event().await;
    chat.next_event().await;

    assert_eq!(chat.store().current_question().unwrap().question_id, "q2");
    assert!(!chat.store().is_loading());

    connector.clear_sent();
    assert!(!chat.answer_question("q1", ["web"]).unwrap());
    assert!(connector.sent_payloads().is_empty());
    assert!(chat.store().current_question().is_none());
}

#[tokio::test]
async fn test_server_error_keeps_session_open() {
    let connector = MockConnector::new();
    let mut chat = mock_session(&connector, "demo-app");
    chat.open().await.unwrap();

    connector.push_frame(r#"{"type":"error","message":"Agent crashed"}"#);
    assert_eq!(
        chat.next_event().await,
        SessionEvent::ServerError("Agent crashed".to_string())
    );
    assert_eq!(chat.store().error(), Some("Agent crashed"));
    assert!(chat.is_connected());
}

#[tokio::test]
async fn test_disconnect_then_reconnect() {
    let connector = MockConnector::new();
    let mut chat = mock_session(&connector, "demo-app");
    chat.open().await.unwrap();

    connector.fail_transport("connection reset");
    assert_eq!(chat.next_event().await, SessionEvent::Disconnected);
    assert_eq!(chat.connection_state(), ConnectionState::Closed);
    assert!(!chat.store().is_connected());
    assert_eq!(chat.last_error(), Some("connection reset"));

    assert!(chat.send_message("lost", Vec::new()).is_err());
    assert!(connector.sent_payloads().is_empty());

    chat.open().await.unwrap();
    assert!(chat.store().is_connected());
    chat.send_message("back again", Vec::new()).unwrap();
    assert_eq!(connector.sent_payloads().len(), 1);
    assert_eq!(connector.connect_count(), 2);
}

#[tokio::test]
async fn test_sessions_for_different_projects_use_distinct_targets() {
    let connector = MockConnector::new();
    let mut first = mock_session(&connector, "alpha");
    let mut second = mock_session(&connector, "beta");
    first.open().await.unwrap();
    drop(first);
    second.open().await.unwrap();

    assert_eq!(
        connector.connected_targets(),
        vec![
            "ws://127.0.0.1:8888/api/spec/ws/alpha".to_string(),
            "ws://127.0.0.1:8888/api/spec/ws/beta".to_string(),
        ]
    );
    assert_eq!(connector.close_count(), 1);
}

#[tokio::test]
async fn test_websocket_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (path_tx, path_rx) = oneshot::channel::<String>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let _ = path_tx.send(req.uri().path().to_string());
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback).await.unwrap();

        let first = loop {
            match ws.next().await.unwrap().unwrap() {
                WsMessage::Text(text) => break text.as_str().to_string(),
                _ => continue,
            }
        };

        ws.send(WsMessage::Text(
            r#"{"type":"message","role":"assistant","content":"What are we building?"}"#.into(),
        ))
        .await
        .unwrap();
        ws.send(WsMessage::Text(r#"{"type":"complete","spec_path":"/x/spec.md"}"#.into()))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
        first
    });

    let mut chat = ChatSession::new(
        "demo-app",
        Box::new(WsConnector::new()),
        Endpoint::new(format!("http://{}", addr)),
    );
    chat.open().await.unwrap();
    chat.send_message("A reading list tracker", Vec::new()).unwrap();

    assert_eq!(chat.next_event().await, SessionEvent::Updated { kind: "message" });
    assert_eq!(
        chat.next_event().await,
        SessionEvent::Completed { spec_path: "/x/spec.md".to_string() }
    );
    assert_eq!(chat.next_event().await, SessionEvent::Disconnected);

    assert_eq!(path_rx.await.unwrap(), "/api/spec/ws/demo-app");
    let first: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(first["type"], "message");
    assert_eq!(first["role"], "user");
    assert_eq!(first["content"], "A reading list tracker");
    assert_eq!(chat.store().transcript().len(), 2);
}

#[tokio::test]
async fn test_https_endpoint_attempts_tls_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Plain TCP peer that hangs up before any TLS handshake completes.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let mut chat = ChatSession::new(
        "demo-app",
        Box::new(WsConnector::new()),
        Endpoint::new(format!("https://{}", addr)),
    );
    let err = chat.open().await.unwrap_err();
    server.await.unwrap();

    match err {
        ChatError::ConnectFailed { target, reason } => {
            assert_eq!(target, format!("wss://{}/api/spec/ws/demo-app", addr));
            assert!(!reason.contains("not compiled in"), "unexpected reason: {}", reason);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(chat.connection_state(), ConnectionState::Closed);
}
