use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{get, patch, post, put},
    Json, Router,
};
use campus_forum::{BlockState, Forum, ForumError, ForumView};
use campus_shared::{QueryId, ReplyId, Role, Target, UserId, VoteType};
use campus_store::{CascadeReport, ForumSettings, HeartState, Query, Reply, User, VoteTally};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerError;

/// Header carrying the caller's user id, set by the portal's session layer.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub forum: Arc<Mutex<Forum>>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/forum", get(list_queries))
        .route("/forum/queries", post(post_query))
        .route("/forum/queries/:id", patch(edit_query).delete(delete_query))
        .route("/forum/queries/:id/replies", post(post_reply))
        .route("/forum/queries/:id/lock", post(toggle_lock))
        .route("/forum/replies/:id", patch(edit_reply).delete(delete_reply))
        .route("/forum/pin", post(toggle_pin))
        .route("/forum/vote", post(cast_vote))
        .route("/forum/heart", post(toggle_heart))
        .route("/forum/users/:id/block", post(toggle_block))
        .route("/forum/global-lock", post(toggle_global_lock))
        .route("/admin/users/:id", put(admin_sync_user))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run a forum operation on the blocking pool.  The store is synchronous.
async fn with_forum<T, F>(state: &AppState, op: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce(&Forum) -> Result<T, ForumError> + Send + 'static,
{
    let forum = state.forum.clone();
    tokio::task::spawn_blocking(move || {
        let forum = forum
            .lock()
            .map_err(|_| ServerError::Internal("forum lock poisoned".into()))?;
        op(&forum).map_err(ServerError::from)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("forum task failed: {e}")))?
}

fn caller(headers: &HeaderMap) -> Result<UserId, ServerError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::Unauthenticated("missing X-User-Id header".into()))?;
    raw.trim()
        .parse()
        .map_err(|_| ServerError::Unauthenticated("malformed X-User-Id header".into()))
}

fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

// ─── Request / response bodies ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    instance: String,
}

#[derive(Deserialize)]
struct TextRequest {
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest {
    text: String,
    parent_id: Option<ReplyId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetRequest {
    target_type: String,
    target_id: String,
}

impl TargetRequest {
    fn target(&self) -> Result<Target, ServerError> {
        Target::parse(&self.target_type, &self.target_id)
            .map_err(|e| ServerError::BadRequest(e.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteRequest {
    #[serde(flatten)]
    target: TargetRequest,
    vote_type: VoteType,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PinResponse {
    is_pinned: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LockResponse {
    is_locked: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncUserRequest {
    display_name: String,
    role: Role,
    department: Option<String>,
}

// ─── Handlers ───

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        instance: state.config.instance_name.clone(),
    })
}

async fn list_queries(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<ForumView>, ServerError> {
    let viewer = caller(&headers)?;
    let view = with_forum(&state, move |forum| forum.list_queries(viewer)).await?;
    Ok(Json(view))
}

async fn post_query(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Result<(StatusCode, Json<Query>), ServerError> {
    let actor = caller(&headers)?;
    let query = with_forum(&state, move |forum| forum.post_query(actor, &req.text)).await?;
    Ok((StatusCode::CREATED, Json(query)))
}

async fn edit_query(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<QueryId>,
    Json(req): Json<TextRequest>,
) -> Result<Json<Query>, ServerError> {
    let actor = caller(&headers)?;
    let query = with_forum(&state, move |forum| forum.edit_query(actor, id, &req.text)).await?;
    Ok(Json(query))
}

async fn delete_query(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<QueryId>,
) -> Result<Json<CascadeReport>, ServerError> {
    let actor = caller(&headers)?;
    let report = with_forum(&state, move |forum| forum.delete_query(actor, id)).await?;
    Ok(Json(report))
}

async fn post_reply(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(query_id): Path<QueryId>,
    Json(req): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<Reply>), ServerError> {
    let actor = caller(&headers)?;
    let reply = with_forum(&state, move |forum| {
        forum.post_reply(actor, query_id, req.parent_id, &req.text)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

async fn edit_reply(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<ReplyId>,
    Json(req): Json<TextRequest>,
) -> Result<Json<Reply>, ServerError> {
    let actor = caller(&headers)?;
    let reply = with_forum(&state, move |forum| forum.edit_reply(actor, id, &req.text)).await?;
    Ok(Json(reply))
}

async fn delete_reply(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<ReplyId>,
) -> Result<Json<CascadeReport>, ServerError> {
    let actor = caller(&headers)?;
    let report = with_forum(&state, move |forum| forum.delete_reply(actor, id)).await?;
    Ok(Json(report))
}

async fn toggle_lock(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<QueryId>,
) -> Result<Json<LockResponse>, ServerError> {
    let actor = caller(&headers)?;
    let is_locked = with_forum(&state, move |forum| forum.toggle_lock(actor, id)).await?;
    Ok(Json(LockResponse { is_locked }))
}

async fn toggle_pin(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<TargetRequest>,
) -> Result<Json<PinResponse>, ServerError> {
    let actor = caller(&headers)?;
    let target = req.target()?;
    let is_pinned = with_forum(&state, move |forum| forum.toggle_pin(actor, target)).await?;
    Ok(Json(PinResponse { is_pinned }))
}

async fn cast_vote(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<VoteRequest>,
) -> Result<Json<VoteTally>, ServerError> {
    let actor = caller(&headers)?;
    let target = req.target.target()?;
    let vote = req.vote_type;
    let tally = with_forum(&state, move |forum| forum.cast_vote(actor, target, vote)).await?;
    Ok(Json(tally))
}

async fn toggle_heart(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<TargetRequest>,
) -> Result<Json<HeartState>, ServerError> {
    let actor = caller(&headers)?;
    let target = req.target()?;
    let heart = with_forum(&state, move |forum| forum.toggle_heart(actor, target)).await?;
    Ok(Json(heart))
}

async fn toggle_block(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(target): Path<UserId>,
) -> Result<Json<BlockState>, ServerError> {
    let actor = caller(&headers)?;
    let block = with_forum(&state, move |forum| forum.toggle_block(actor, target)).await?;
    Ok(Json(block))
}

async fn toggle_global_lock(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<ForumSettings>, ServerError> {
    let actor = caller(&headers)?;
    let settings = with_forum(&state, move |forum| forum.toggle_global_lock(actor)).await?;
    Ok(Json(settings))
}

/// Mirror a user from the identity service.  Block state is left untouched.
async fn admin_sync_user(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(req): Json<SyncUserRequest>,
) -> Result<Json<User>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let display_name = req.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(ServerError::BadRequest("displayName cannot be empty".into()));
    }

    let user = User {
        id,
        display_name,
        role: req.role,
        department: req.department.filter(|d| !d.trim().is_empty()),
        is_forum_blocked: false,
        blocked_by: None,
        created_at: Utc::now(),
    };
    let stored = with_forum(&state, move |forum| {
        forum.sync_user(&user)?;
        Ok(forum.database().get_user(user.id)?)
    })
    .await?;

    info!(user = %stored.id, role = %stored.role, "Admin synced user");
    Ok(Json(stored))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
