use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::utils::auth::bearer_token;
use crate::{
    models::action::GameAction,
    services::{game_service, room_service},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct StartGameRequest {
    pub requester_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionRequest {
    pub player_id: String,
    pub action: GameAction,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest(
            "/:roomid",
            Router::new()
                // ゲームの基本操作
                .route("/start", post(start_game))
                .route("/state/:playerid", get(get_game_state))
                .route("/chat", get(get_chat_log))
                // ゲームアクション
                .route("/actions", post(submit_action)),
        )
        .with_state(state)
}

pub async fn start_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<StartGameRequest>,
) -> Response {
    let requester_id = request.requester_id;
    if let Err(e) =
        room_service::authorize(&state, &room_id, &requester_id, bearer_token(&headers)).await
    {
        return e.into_response();
    }
    match game_service::start_game(state, &room_id, &requester_id).await {
        Ok(()) => (StatusCode::OK, Json("Game started")).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_game_state(
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    // 自分の席の視点しか読めない
    if let Err(e) =
        room_service::authorize(&state, &room_id, &player_id, bearer_token(&headers)).await
    {
        return e.into_response();
    }
    match game_service::get_game_view(&state, &room_id, &player_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_chat_log(State(state): State<AppState>, Path(room_id): Path<String>) -> Response {
    match game_service::get_chat_log(&state, &room_id).await {
        Ok(messages) => (StatusCode::OK, Json(messages)).into_response(),
        Err(e) => e.into_response(),
    }
}

// 受理されなかったアクションも202を返す（理由はクライアントに伝えない）
async fn submit_action(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ActionRequest>,
) -> Response {
    if let Err(e) =
        room_service::authorize(&state, &room_id, &request.player_id, bearer_token(&headers))
            .await
    {
        return e.into_response();
    }
    match game_service::submit_action(state, &room_id, &request.player_id, request.action).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{game::GamePhase, view::GameView};
    use crate::utils::test_setup::{create_room_with_players, seat_token, setup_test_env};
    use axum::{body::to_bytes, body::Body, http::Request};
    use tower::ServiceExt;

    fn post_json(uri: String, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with_token(uri: String, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_start_game() {
        setup_test_env();
        let state = AppState::new();
        let room_id = create_room_with_players(&state, 5).await.unwrap();
        let p1 = seat_token(&state, &room_id, "p1").await.unwrap();
        let p2 = seat_token(&state, &room_id, "p2").await.unwrap();

        let response = routes(state.clone())
            .oneshot(post_json(
                format!("/{}/start", room_id),
                Some(&p2),
                r#"{"requester_id":"p2"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // ホストのIDを名乗ってもトークンが違えば拒否
        let response = routes(state.clone())
            .oneshot(post_json(
                format!("/{}/start", room_id),
                Some(&p2),
                r#"{"requester_id":"p1"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(state.game_handle(&room_id).await.is_none());

        let response = routes(state.clone())
            .oneshot(post_json(
                format!("/{}/start", room_id),
                Some(&p1),
                r#"{"requester_id":"p1"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.game_handle(&room_id).await.is_some());
    }

    #[tokio::test]
    async fn test_start_game_with_too_few_players() {
        setup_test_env();
        let state = AppState::new();
        let room_id = create_room_with_players(&state, 4).await.unwrap();
        let p1 = seat_token(&state, &room_id, "p1").await.unwrap();

        let response = routes(state)
            .oneshot(post_json(
                format!("/{}/start", room_id),
                Some(&p1),
                r#"{"requester_id":"p1"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_action_and_state() {
        setup_test_env();
        let state = AppState::new();
        let room_id = create_room_with_players(&state, 5).await.unwrap();
        let p3 = seat_token(&state, &room_id, "p3").await.unwrap();
        game_service::start_game(state.clone(), &room_id, "p1")
            .await
            .unwrap();

        let response = routes(state.clone())
            .oneshot(post_json(
                format!("/{}/actions", room_id),
                Some(&p3),
                r#"{"player_id":"p3","action":{"type":"confirmRole"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        // 不正なアクションも202
        let response = routes(state.clone())
            .oneshot(post_json(
                format!("/{}/actions", room_id),
                Some(&p3),
                r#"{"player_id":"p3","action":{"type":"approveTeam"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = routes(state.clone())
            .oneshot(get_with_token(format!("/{}/state/p3", room_id), Some(&p3)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let view: GameView = serde_json::from_slice(&body).unwrap();
        assert_eq!(view.phase, GamePhase::RoleReveal);
        assert!(view
            .players
            .iter()
            .any(|p| p.id == "p3" && p.confirmed_role));

        let response = routes(state)
            .oneshot(get_with_token("/999/state/p3".to_string(), Some(&p3)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_seat_routes_require_the_seat_token() {
        setup_test_env();
        let state = AppState::new();
        let room_id = create_room_with_players(&state, 5).await.unwrap();
        let p2 = seat_token(&state, &room_id, "p2").await.unwrap();
        game_service::start_game(state.clone(), &room_id, "p1")
            .await
            .unwrap();

        for token in [None, Some("not-a-seat-token"), Some(p2.as_str())] {
            // p3 の視点（仲間のスパイ情報を含む）は p3 のトークンなしでは読めない
            let response = routes(state.clone())
                .oneshot(get_with_token(format!("/{}/state/p3", room_id), token))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let response = routes(state.clone())
                .oneshot(post_json(
                    format!("/{}/actions", room_id),
                    token,
                    r#"{"player_id":"p3","action":{"type":"confirmRole"}}"#,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        // 他人のなりすましは状態を変えない
        let view = game_service::get_game_view(&state, &room_id, "p3")
            .await
            .unwrap();
        assert!(view.players.iter().all(|p| !p.confirmed_role));

        let response = routes(state)
            .oneshot(get_with_token(format!("/{}/state/nobody", room_id), Some(&p2)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
