use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::RwLock;

use session_auth_axum::{
    AuthUser, HttpError, Identity, RetrieveUserHandler, Session, SessionAuth, SessionData,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct User {
    id: String,
    name: String,
    email: String,
}

impl Identity for User {}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    name: String,
    email: String,
}

/// Users known to the demo, keyed by id
#[derive(Clone, Default)]
pub(crate) struct Directory {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl Directory {
    pub(crate) fn retrieve_user_handler(&self) -> RetrieveUserHandler<User> {
        let users = self.users.clone();
        RetrieveUserHandler::from_async(move |data: SessionData| {
            let users = users.clone();
            async move {
                let id = data.get::<String>("id").ok().flatten()?;
                users.read().await.get(&id).cloned()
            }
        })
    }
}

#[derive(Clone)]
struct DemoState {
    directory: Directory,
    openapi: Value,
}

pub(crate) fn router(directory: Directory, auth: &SessionAuth<User>) -> Router {
    let openapi = json!({
        "components": auth.openapi_components(),
        "security": [auth.security_requirement()],
    });

    Router::new()
        .route("/login", post(login))
        .route("/user/{user_id}", get(get_user).delete(logout))
        .route("/health", get(health))
        .route("/openapi.json", get(openapi_doc))
        .with_state(DemoState { directory, openapi })
}

async fn login(
    State(state): State<DemoState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<(StatusCode, Json<User>), HttpError> {
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: form.name,
        email: form.email,
    };
    state
        .directory
        .users
        .write()
        .await
        .insert(user.id.clone(), user.clone());

    session
        .insert("id", &user.id)
        .map_err(|e| HttpError::internal(e.to_string()))?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    Path(user_id): Path<String>,
    AuthUser(user): AuthUser<User>,
) -> Result<Json<User>, HttpError> {
    if user.id != user_id {
        return Err(HttpError::new(
            StatusCode::FORBIDDEN,
            "session belongs to another user",
        ));
    }
    Ok(Json(user))
}

async fn logout(session: Session, AuthUser(user): AuthUser<User>) -> StatusCode {
    session.clear();
    tracing::info!(user_id = %user.id, "User logged out");
    StatusCode::NO_CONTENT
}

async fn health(user: Option<AuthUser<User>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "user": user.map(|AuthUser(user)| user.id),
    }))
}

async fn openapi_doc(State(state): State<DemoState>) -> Json<Value> {
    Json(state.openapi)
}
