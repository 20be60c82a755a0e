#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::{Body, to_bytes};
use axum::extract::Path;
use axum::routing::{get, post};
use axum::{Json, Router};
use http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use http::{Method, Request, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower::ServiceExt;

use session_auth_axum::{
    AppContext, AuthUser, HttpError, Identity, MemoryStore, RetrieveUserHandler, Session,
    SessionAuth, SessionAuthLayer, SessionData,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Identity for User {}

pub fn known_user() -> User {
    User {
        id: uuid::Uuid::new_v4().to_string(),
        name: "Moishe Zuchmir".to_string(),
        email: "moishe@zuchmir.com".to_string(),
    }
}

pub fn other_user() -> User {
    User {
        id: uuid::Uuid::new_v4().to_string(),
        name: "Sigfried Lamago".to_string(),
        email: "llamago@zigi.com".to_string(),
    }
}

/// Resolves only `known`, counting every invocation
pub fn resolver(known: User, calls: Arc<AtomicUsize>) -> RetrieveUserHandler<User> {
    RetrieveUserHandler::from_fn(move |data: SessionData| {
        calls.fetch_add(1, Ordering::SeqCst);
        let id = data.get::<String>("id").ok().flatten()?;
        (id == known.id).then(|| known.clone())
    })
}

pub fn cookie_auth(handler: RetrieveUserHandler<User>) -> SessionAuth<User> {
    SessionAuth::cookie(random_secret(), handler)
        .exclude_all(["login", "health"])
        .build()
        .unwrap()
}

pub fn memory_auth(handler: RetrieveUserHandler<User>) -> SessionAuth<User> {
    SessionAuth::server_side(Arc::new(MemoryStore::new()), handler)
        .exclude_all(["login", "health"])
        .build()
        .unwrap()
}

fn random_secret() -> [u8; 16] {
    *uuid::Uuid::new_v4().as_bytes()
}

async fn login(session: Session, Json(data): Json<Value>) -> Result<StatusCode, HttpError> {
    let data = SessionData::try_from(data).map_err(|e| HttpError::internal(e.to_string()))?;
    session.set(data);
    Ok(StatusCode::CREATED)
}

async fn get_user(Path(_user_id): Path<String>, AuthUser(user): AuthUser<User>) -> Json<User> {
    Json(user)
}

/// Excluded by pattern, yet demands a user
async fn login_me(AuthUser(user): AuthUser<User>) -> Json<User> {
    Json(user)
}

async fn delete_user(session: Session) -> StatusCode {
    session.clear();
    StatusCode::NO_CONTENT
}

async fn health(user: Option<AuthUser<User>>) -> String {
    match user {
        Some(AuthUser(user)) => user.id,
        None => "anonymous".to_string(),
    }
}

async fn explode() -> StatusCode {
    panic!("handler exploded");
}

/// Routes protected by `auth`, hosted by `app`
pub fn router_with(auth: SessionAuth<User>, app: AppContext) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/login/me", get(login_me))
        .route("/user/{user_id}", get(get_user).delete(delete_user))
        .route("/health", get(health))
        .route("/explode", get(explode))
        .route_layer(SessionAuthLayer::new(auth))
        .layer(app.layer())
}

pub fn router(auth: SessionAuth<User>) -> Router {
    router_with(auth, AppContext::new())
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookies: Vec<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// True when some Set-Cookie header expires a cookie
    pub fn clears_cookie(&self) -> bool {
        self.set_cookies.iter().any(|c| c.contains("Max-Age=0"))
    }
}

/// Minimal client replaying cookies between requests, like a browser
pub struct TestClient {
    app: Router,
    cookies: HashMap<String, String>,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            cookies: HashMap::new(),
        }
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    pub async fn delete(&mut self, path: &str) -> TestResponse {
        self.send(Method::DELETE, path, None).await
    }

    pub async fn post_json<T: Serialize>(&mut self, path: &str, body: &T) -> TestResponse {
        self.send(Method::POST, path, Some(serde_json::to_value(body).unwrap()))
            .await
    }

    async fn send(&mut self, method: Method, path: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if !self.cookies.is_empty() {
            let header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(COOKIE, header);
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let set_cookies: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        for cookie in &set_cookies {
            self.apply_set_cookie(cookie);
        }
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse {
            status,
            set_cookies,
            body,
        }
    }

    fn apply_set_cookie(&mut self, cookie: &str) {
        let Some((name, value)) = cookie.split(';').next().and_then(|p| p.split_once('=')) else {
            return;
        };
        if cookie.contains("Max-Age=0") {
            self.cookies.remove(name);
        } else {
            self.cookies.insert(name.to_string(), value.to_string());
        }
    }
}
