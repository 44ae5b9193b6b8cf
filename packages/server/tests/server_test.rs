use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use futures::{SinkExt, StreamExt};
use resistance_server::{
    app,
    models::{game::GamePhase, view::GameView},
    services::game_service,
    state::AppState,
    utils::{
        test_setup::{create_room_with_players, seat_token, setup_test_env},
        websocket::ServerMessage,
    },
};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tower::ServiceExt;

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_token(uri: &str, token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_room_lifecycle_over_http() {
    let app: Router = app::create_app(AppState::new());

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/room/create",
            r#"{"name":"table","max_players":6}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let room_id = body_json(response).await["room_id"]
        .as_str()
        .unwrap()
        .to_string();

    // ルーム参加
    let mut tokens = Vec::new();
    for i in 1..=2 {
        let body = format!(r#"{{"player_id":"p{}","player_name":"Player{}"}}"#, i, i);
        let response = app
            .clone()
            .oneshot(post_json(&format!("/api/room/{}/join", room_id), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let joined = body_json(response).await;
        tokens.push(joined["player_token"].as_str().unwrap().to_string());
    }

    // 同じ名前では参加できない
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/room/{}/join", room_id),
            r#"{"player_id":"p9","player_name":"Player1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .uri(format!("/api/room/{}", room_id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let room = body_json(response).await;
    assert_eq!(room["host_id"], "p1");
    assert_eq!(room["players"].as_array().unwrap().len(), 2);

    // 全員抜けるとルームは消える
    for (i, token) in tokens.iter().enumerate() {
        let response = app
            .clone()
            .oneshot(with_token(
                &format!("/api/room/{}/leave/p{}", room_id, i + 1),
                token,
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let request = Request::builder()
        .uri(format!("/api/room/{}", room_id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_match_over_http() {
    setup_test_env();
    let state = AppState::new();
    let app = app::create_app(state.clone());
    let room_id = create_room_with_players(&state, 5).await.unwrap();
    let mut tokens = Vec::new();
    for i in 1..=5 {
        tokens.push(seat_token(&state, &room_id, &format!("p{}", i)).await.unwrap());
    }

    let response = app
        .clone()
        .oneshot(with_token(
            &format!("/api/game/{}/start", room_id),
            &tokens[0],
            r#"{"requester_id":"p1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for i in 1..=5 {
        let body = format!(
            r#"{{"player_id":"p{}","action":{{"type":"confirmRole"}}}}"#,
            i
        );
        let response = app
            .clone()
            .oneshot(with_token(
                &format!("/api/game/{}/actions", room_id),
                &tokens[i - 1],
                &body,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    let request = Request::builder()
        .uri(format!("/api/game/{}/state/p2", room_id))
        .header("authorization", format!("Bearer {}", tokens[1]))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let view: GameView = serde_json::from_slice(&body).unwrap();
    assert_eq!(view.phase, GamePhase::Discussion);
    assert_eq!(view.viewer_id, "p2");
    assert!(view
        .players
        .iter()
        .filter(|p| p.id != "p2")
        .all(|p| p.spy_number.is_none()));

    let request = Request::builder()
        .uri(format!("/api/game/{}/chat", room_id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_json(response).await.as_array().unwrap().is_empty());

    let response = app
        .oneshot(with_token(
            "/api/game/999/actions",
            &tokens[0],
            r#"{"player_id":"p1","action":{"type":"passTurn"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

async fn next_server_message<S>(socket: &mut S) -> ServerMessage
where
    S: futures::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .expect("websocket error");
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(&text).expect("server frame");
        }
    }
}

#[tokio::test]
async fn test_websocket_round_trip() {
    setup_test_env();
    let state = AppState::new();
    let room_id = create_room_with_players(&state, 5).await.unwrap();
    game_service::start_game(state.clone(), &room_id, "p1")
        .await
        .unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app::create_app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let p3 = seat_token(&state, &room_id, "p3").await.unwrap();
    let p4 = seat_token(&state, &room_id, "p4").await.unwrap();

    // 非メンバーやトークン不一致は拒否される
    for url in [
        format!("ws://{}/api/room/{}/ws/stranger?token={}", addr, room_id, p3),
        format!("ws://{}/api/room/{}/ws/p3", addr, room_id),
        format!("ws://{}/api/room/{}/ws/p3?token={}", addr, room_id, p4),
    ] {
        assert!(connect_async(url).await.is_err());
    }

    let (mut socket, _) = connect_async(format!(
        "ws://{}/api/room/{}/ws/p3?token={}",
        addr, room_id, p3
    ))
    .await
    .unwrap();

    // 接続直後に現在の状態が届く
    match next_server_message(&mut socket).await {
        ServerMessage::GameState { state: view } => {
            assert_eq!(view.viewer_id, "p3");
            assert_eq!(view.phase, GamePhase::RoleReveal);
        }
        other => panic!("unexpected frame {:?}", other),
    }

    socket
        .send(WsMessage::Text(
            r#"{"message_type":"action","action":{"type":"confirmRole"}}"#.to_string(),
        ))
        .await
        .unwrap();
    match next_server_message(&mut socket).await {
        ServerMessage::GameState { state: view } => {
            let me = view.players.iter().find(|p| p.id == "p3").unwrap();
            assert!(me.confirmed_role);
        }
        other => panic!("unexpected frame {:?}", other),
    }

    socket
        .send(WsMessage::Text("not json".to_string()))
        .await
        .unwrap();
    assert!(matches!(
        next_server_message(&mut socket).await,
        ServerMessage::Error { .. }
    ));

    socket
        .send(WsMessage::Text(
            r#"{"message_type":"chat","content":"hi all"}"#.to_string(),
        ))
        .await
        .unwrap();
    match next_server_message(&mut socket).await {
        ServerMessage::Chat { message } => {
            assert_eq!(message.content, "hi all");
            assert_eq!(message.player_id, "p3");
        }
        other => panic!("unexpected frame {:?}", other),
    }

    socket.close(None).await.unwrap();
}
