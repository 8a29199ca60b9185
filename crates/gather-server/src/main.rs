use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use gather_api::middleware::require_auth;
use gather_api::{AppState, AppStateInner, chat, groups, membership};
use gather_db::SqliteStore;
use gather_governance::Governance;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gather=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("GATHER_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("GATHER_DB_PATH").unwrap_or_else(|_| "gather.db".into());
    let host = std::env::var("GATHER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("GATHER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and the governance service on top of it
    let db = Arc::new(gather_db::Database::open(&PathBuf::from(&db_path))?);
    let governance = Governance::new(Arc::new(SqliteStore::new(db)));

    let state: AppState = Arc::new(AppStateInner {
        governance,
        jwt_secret,
    });

    // Routes — every endpoint runs behind the actor-identity middleware
    let app = Router::new()
        .route(
            "/groups",
            post(groups::create_group).get(groups::list_groups),
        )
        .route(
            "/groups/{group_id}",
            get(groups::get_group)
                .patch(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/groups/{group_id}/join", post(membership::request_join))
        .route(
            "/groups/{group_id}/requests/{user_id}/approve",
            post(membership::approve_join),
        )
        .route(
            "/groups/{group_id}/requests/{user_id}/decline",
            post(membership::decline_join),
        )
        .route("/groups/{group_id}/invites", post(membership::invite))
        .route(
            "/groups/{group_id}/invites/respond",
            post(membership::respond_invite),
        )
        .route(
            "/groups/{group_id}/moderators",
            post(membership::add_moderator),
        )
        .route(
            "/groups/{group_id}/moderators/{user_id}",
            delete(membership::remove_moderator),
        )
        .route(
            "/groups/{group_id}/members/{user_id}",
            delete(membership::remove_member),
        )
        .route(
            "/groups/{group_id}/conversation",
            post(chat::ensure_conversation),
        )
        .route(
            "/groups/{group_id}/conversation/messages",
            get(chat::get_messages).post(chat::post_message),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Gather server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
