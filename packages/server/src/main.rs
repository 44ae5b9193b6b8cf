use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use env_logger::{Builder, Env};
use log::{error, info, warn};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use resistance_server::{
    app,
    models::config::GameRules,
    services::scheduler,
    state::AppState,
    utils::config::CONFIG,
};

// ログ設定（RUST_LOGで上書き可能）
fn init_logger() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(true)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() {
    // 環境変数をロード
    let dotenv_result = dotenv();

    init_logger();

    if let Err(e) = dotenv_result {
        warn!(".envファイルの読み込みに失敗しました: {}", e);
    }

    let state = AppState::with_rules(GameRules::from_env());
    let ticker = scheduler::spawn(state.clone());

    // CORSレイヤーの設定
    let cors = match CONFIG.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(e) => {
            warn!("invalid CORS_ORIGIN {:?}: {}", CONFIG.cors_origin, e);
            CorsLayer::new()
        }
    }
    .allow_methods([Method::GET, Method::POST, Method::DELETE])
    .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION]);

    // ルーティングの設定
    let app = app::create_app(state.clone()).layer(cors).layer(
        TraceLayer::new_for_http() // HTTPトレースログを有効化
            .make_span_with(|request: &http::Request<_>| {
                tracing::info_span!(
                    "HTTP request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
    );

    // サーバーの起動
    let listener = match tokio::net::TcpListener::bind(CONFIG.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {}: {}", CONFIG.addr, e);
            ticker.abort();
            return;
        }
    };

    info!("サーバーを起動しました: http://{}", CONFIG.addr);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server error: {}", e);
    }

    ticker.abort();
    state.teardown().await;
    info!("server stopped");
}
