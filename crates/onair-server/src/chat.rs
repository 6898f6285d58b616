//! Flat-file chat log served at `/api/chat`.
//!
//! `GET  /api/chat?action=get_messages`  → `[{user, text, timestamp}, …]`
//! `POST /api/chat?action=send_message`  with `user`, `text` as a form or
//! JSON body (`action` may also come from the body) → `{"success": true}`.
//!
//! Every file access holds the store's mutex, so concurrent posts append in
//! arrival order and never clobber each other.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{FromRequest, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use onair_proto::i18n::Locale;
use onair_proto::protocol::ChatMessage;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    EmptyMessage(&'static str),

    #[error("{0}")]
    InvalidRequest(&'static str),

    #[error("chat store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("chat store encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChatError::EmptyMessage(_) | ChatError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ChatError::Io(_) | ChatError::Encode(_) => {
                error!("chat: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({ "error": self.to_string(), "success": false }));
        (status, body).into_response()
    }
}

pub struct ChatStore {
    path: PathBuf,
    locale: Locale,
    lock: Mutex<()>,
}

impl ChatStore {
    pub fn new(path: PathBuf, locale: Locale) -> Self {
        Self {
            path,
            locale,
            lock: Mutex::new(()),
        }
    }

    /// Create the file with a welcome message if it does not exist yet.
    /// Caller holds the lock.
    async fn ensure_file(&self) -> Result<(), ChatError> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let strings = self.locale.strings();
        let welcome = vec![ChatMessage {
            user: strings.chat_system_user.to_string(),
            text: strings.chat_welcome.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }];
        tokio::fs::write(&self.path, serde_json::to_vec(&welcome)?).await?;
        info!("chat: created {}", self.path.display());
        Ok(())
    }

    /// Caller holds the lock. An unreadable log reads as empty.
    async fn read_all(&self) -> Result<Vec<ChatMessage>, ChatError> {
        self.ensure_file().await?;
        let raw = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&raw).unwrap_or_else(|e| {
            warn!("chat: {} is not a message list ({}), treating as empty", self.path.display(), e);
            Vec::new()
        }))
    }

    pub async fn messages(&self) -> Result<Vec<ChatMessage>, ChatError> {
        let _guard = self.lock.lock().await;
        self.read_all().await
    }

    pub async fn send(&self, user: Option<String>, text: Option<String>) -> Result<(), ChatError> {
        let strings = self.locale.strings();
        let text = text.unwrap_or_default();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage(strings.chat_empty_message));
        }
        let user = user
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| strings.chat_guest.to_string());

        let _guard = self.lock.lock().await;
        let mut messages = self.read_all().await?;
        messages.push(ChatMessage {
            user,
            text: escape_html(&text),
            timestamp: chrono::Utc::now().timestamp(),
        });
        tokio::fs::write(&self.path, serde_json::to_vec(&messages)?).await?;
        Ok(())
    }

    fn invalid(&self) -> ChatError {
        ChatError::InvalidRequest(self.locale.strings().chat_invalid_request)
    }
}

/// Escape `& < > " '` so stored text is inert when dropped into HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatParams {
    action: Option<String>,
    user: Option<String>,
    text: Option<String>,
}

async fn chat_get(
    State(store): State<Arc<ChatStore>>,
    Query(query): Query<ChatParams>,
) -> Result<Json<Vec<ChatMessage>>, ChatError> {
    match query.action.as_deref() {
        Some("get_messages") => Ok(Json(store.messages().await?)),
        _ => Err(store.invalid()),
    }
}

async fn chat_post(
    State(store): State<Arc<ChatStore>>,
    Query(query): Query<ChatParams>,
    req: Request,
) -> Result<Json<serde_json::Value>, ChatError> {
    let is_json = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("application/json"));

    // A missing or malformed body reads as empty fields.
    let body = if is_json {
        Json::<ChatParams>::from_request(req, &())
            .await
            .map(|Json(p)| p)
            .unwrap_or_default()
    } else {
        Form::<ChatParams>::from_request(req, &())
            .await
            .map(|Form(p)| p)
            .unwrap_or_default()
    };

    match query.action.or(body.action).as_deref() {
        Some("get_messages") => {
            let messages = store.messages().await?;
            Ok(Json(serde_json::to_value(messages)?))
        }
        Some("send_message") => {
            store.send(body.user, body.text).await?;
            Ok(Json(json!({ "success": true })))
        }
        _ => Err(store.invalid()),
    }
}

pub fn routes(store: Arc<ChatStore>) -> Router {
    Router::new()
        .route("/api/chat", get(chat_get).post(chat_post))
        .with_state(store)
}
