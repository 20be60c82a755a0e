use std::sync::Arc;

use dotenvy::dotenv;
use ring::rand::{SecureRandom, SystemRandom};
use tower_http::trace::TraceLayer;

use session_auth_axum::{AppContext, MemoryStore, RedisStore, SessionAuth, SessionAuthLayer};

mod handlers;
mod server;

use handlers::{Directory, User};
use server::{init_tracing, serve};

const DEFAULT_PORT: u16 = 3001;

/// `SESSION_SECRET` when it is 16 or 32 bytes long, a random key otherwise
fn session_secret() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if let Ok(secret) = std::env::var("SESSION_SECRET") {
        if matches!(secret.len(), 16 | 32) {
            return Ok(secret.into_bytes());
        }
        tracing::warn!("SESSION_SECRET must be 16 or 32 bytes long, ignoring it");
    }

    tracing::warn!("Using a random session secret; sessions will not survive a restart");
    let mut secret = vec![0u8; 32];
    SystemRandom::new()
        .fill(&mut secret)
        .map_err(|_| "failed to generate session secret")?;
    Ok(secret)
}

async fn session_auth(directory: &Directory) -> Result<SessionAuth<User>, Box<dyn std::error::Error>> {
    let handler = directory.retrieve_user_handler();
    let backend = std::env::var("SESSION_BACKEND").unwrap_or_else(|_| "cookie".to_string());

    let builder = match backend.as_str() {
        "memory" => SessionAuth::server_side(Arc::new(MemoryStore::new()), handler),
        "redis" => {
            let url = std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
            SessionAuth::server_side(Arc::new(RedisStore::connect(&url).await?), handler)
        }
        _ => SessionAuth::cookie(session_secret()?, handler),
    };

    tracing::info!("Using {backend} session backend");
    Ok(builder.exclude_all(["^/login$", "^/health$", "^/openapi.json$"]).build()?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_tracing("demo-session");

    let debug = std::env::var("DEMO_DEBUG").is_ok_and(|v| v == "true");
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let directory = Directory::default();
    let auth = session_auth(&directory).await?;

    let app = handlers::router(directory, &auth)
        .route_layer(SessionAuthLayer::new(auth))
        .layer(AppContext::new().with_debug(debug).layer())
        .layer(TraceLayer::new_for_http());

    serve(port, app).await?;
    Ok(())
}
