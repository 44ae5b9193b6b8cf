use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    services::room_service,
    state::AppState,
    utils::{auth::bearer_token, websocket},
};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub max_players: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub player_id: String,
    pub player_name: String,
}

/// The token is shown only here; later calls present it as a bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub player_id: String,
    pub player_token: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        // ルーム作成
        // curl -X POST http://localhost:8080/api/room/create
        .route("/create", post(create_room))
        // ルーム一覧取得
        // curl http://localhost:8080/api/room/rooms
        .route("/rooms", get(get_rooms))
        // 特定のルーム情報取得
        // curl http://localhost:8080/api/room/{roomid}
        .route("/:roomid", get(get_room_info))
        // ルーム参加
        // curl -X POST -H 'Content-Type: application/json' \
        //   -d '{"player_id":"p1","player_name":"Alice"}' http://localhost:8080/api/room/{roomid}/join
        .route("/:roomid/join", post(join_room))
        // ルーム脱退
        // curl -X POST -H 'Authorization: Bearer {token}' http://localhost:8080/api/room/{roomid}/leave/{playerid}
        .route("/:roomid/leave/:playerid", post(leave_room))
        // ルーム削除
        // curl -X DELETE http://localhost:8080/api/room/{roomid}/delete
        .route("/:roomid/delete", delete(delete_room))
        // WebSocket接続
        // websocat 'ws://localhost:8080/api/room/{roomid}/ws/{playerid}?token={token}'
        .route("/:roomid/ws/:playerid", get(websocket::handler))
        .with_state(state)
}

pub async fn create_room(
    State(state): State<AppState>,
    body: Option<Json<CreateRoomRequest>>,
) -> impl IntoResponse {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let room_id = room_service::create_room(state, request.name, request.max_players).await;
    (
        StatusCode::OK,
        Json(CreateRoomResponse {
            room_id: room_id.to_string(),
        }),
    )
}

async fn get_rooms(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = room_service::get_rooms(&state).await;
    (StatusCode::OK, Json(rooms))
}

async fn get_room_info(State(state): State<AppState>, Path(room_id): Path<String>) -> Response {
    match room_service::get_room_info(&state, &room_id).await {
        Ok(room) => (StatusCode::OK, Json(room)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<JoinRoomRequest>,
) -> Response {
    match room_service::join_room(state, &room_id, &request.player_id, &request.player_name).await
    {
        Ok(player_token) => (
            StatusCode::OK,
            Json(JoinRoomResponse {
                player_id: request.player_id,
                player_token,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn leave_room(
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Err(e) =
        room_service::authorize(&state, &room_id, &player_id, bearer_token(&headers)).await
    {
        return e.into_response();
    }
    match room_service::leave_room(state, &room_id, &player_id).await {
        Ok(()) => (StatusCode::OK, Json("Successfully left room")).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn delete_room(State(state): State<AppState>, Path(room_id): Path<String>) -> Response {
    if room_service::delete_room(state, &room_id).await {
        (
            StatusCode::OK,
            Json(format!("Room {} deleted successfully", room_id)),
        )
            .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(format!("Room {} not found", room_id)),
        )
            .into_response()
    }
}
