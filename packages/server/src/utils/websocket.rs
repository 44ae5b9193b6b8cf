use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    models::{action::GameAction, chat::ChatMessage, view::GameView},
    services::{game_service, room_service},
    state::AppState,
};

/// Inbound frame from a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ClientMessage {
    Action { action: GameAction },
    Chat { content: String },
}

/// Outbound frame to a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ServerMessage {
    GameState { state: GameView },
    Chat { message: ChatMessage },
    Error { content: String },
}

/// Browsers cannot set headers on an upgrade, so the seat token rides in the query.
#[derive(Debug, Default, Deserialize)]
pub struct SeatQuery {
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn handler(
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, String)>,
    Query(query): Query<SeatQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Err(e) =
        room_service::authorize(&state, &room_id, &player_id, query.token.as_deref()).await
    {
        warn!("room {}: refused websocket for {}: {}", room_id, player_id, e);
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, player_id))
}

pub async fn handle_socket(ws: WebSocket, state: AppState, room_id: String, player_id: String) {
    info!("room {}: websocket connected for {}", room_id, player_id);
    let (connection_id, mut rx) = state.register_connection(&room_id, &player_id).await;

    // 再接続時は現在の状態をすぐに送る
    if let Ok(view) = game_service::get_game_view(&state, &room_id, &player_id).await {
        state
            .send_to_player(&room_id, &player_id, &ServerMessage::GameState { state: view })
            .await;
    }

    let (mut sender, mut receiver) = ws.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                debug!("websocket send failed: {}", e);
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_room = room_id.clone();
    let recv_player = player_id.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_frame(&recv_state, &recv_room, &recv_player, &text).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // どちらかが終了したらもう片方も止める
    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }

    state
        .unregister_connection(&room_id, &player_id, connection_id)
        .await;
    info!("room {}: websocket closed for {}", room_id, player_id);
}

async fn handle_frame(state: &AppState, room_id: &str, player_id: &str, text: &str) {
    let result = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Action { action }) => {
            game_service::submit_action(state.clone(), room_id, player_id, action).await
        }
        Ok(ClientMessage::Chat { content }) => {
            game_service::post_chat(state.clone(), room_id, player_id, content).await
        }
        Err(e) => {
            // 不正なメッセージフォーマットは送信者にのみ通知する
            let reply = ServerMessage::Error {
                content: format!("malformed message: {}", e),
            };
            state.send_to_player(room_id, player_id, &reply).await;
            return;
        }
    };

    if let Err(e) = result {
        let reply = ServerMessage::Error {
            content: e.to_string(),
        };
        state.send_to_player(room_id, player_id, &reply).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::action::MissionVote;
    use serde_json::json;

    #[test]
    fn client_frames_decode() {
        let frame: ClientMessage = serde_json::from_value(json!({
            "message_type": "action",
            "action": { "type": "voteForMission", "vote": "fail" }
        }))
        .unwrap();
        match frame {
            ClientMessage::Action { action } => assert_eq!(
                action,
                GameAction::VoteForMission {
                    vote: MissionVote::Fail
                }
            ),
            other => panic!("unexpected frame {:?}", other),
        }

        let frame: ClientMessage =
            serde_json::from_value(json!({ "message_type": "chat", "content": "hi" })).unwrap();
        assert!(matches!(frame, ClientMessage::Chat { content } if content == "hi"));

        assert!(serde_json::from_value::<ClientMessage>(json!({ "message_type": "shout" })).is_err());
    }

    #[test]
    fn error_frame_is_tagged() {
        let value = serde_json::to_value(ServerMessage::Error {
            content: "nope".to_string(),
        })
        .unwrap();
        assert_eq!(value, json!({ "message_type": "error", "content": "nope" }));
    }
}
