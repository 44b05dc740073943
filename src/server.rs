//! HTTP shell around the plugin: settings page, editor panel, save
//! endpoints, and the content-filter endpoint.
//!
//! Bearer-token auth stands in for the host's session handling and supplies
//! the manage/edit permission facts. The render endpoint is visitor-facing
//! and unauthenticated; it never fails a request, it returns the content
//! unchanged instead.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::admin::{AdminContext, SettingsAdmin, SettingsSubmission};
use crate::inject::{ContentInjector, RenderContext};
use crate::panel::{EditorSubmission, PostEditorPanel, SaveContext};
use crate::settings::SettingsService;
use crate::store::Database;
use crate::token::{constant_time_compare, TokenService};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    panel: PostEditorPanel,
    admin: SettingsAdmin,
    injector: ContentInjector,
    api_key: Option<String>,
    uptime: Instant,
}

impl AppState {
    pub fn new(db: Database, tokens: TokenService, api_key: Option<String>) -> Self {
        let settings = SettingsService::new(db.clone());
        Self {
            panel: PostEditorPanel::new(settings.clone(), db.clone(), tokens.clone()),
            admin: SettingsAdmin::new(settings.clone(), tokens),
            injector: ContentInjector::new(settings, db),
            api_key,
            uptime: Instant::now(),
        }
    }
}

/// Body of `POST /posts/{id}/links`.
#[derive(Debug, Deserialize)]
struct EditorSaveRequest {
    token: String,
    #[serde(default)]
    links: BTreeMap<i64, String>,
    #[serde(default)]
    autosave: bool,
}

/// Body of `POST /render`.
#[derive(Debug, Deserialize)]
struct RenderRequest {
    post_id: i64,
    content: String,
    #[serde(default)]
    context: RenderContext,
}

/// Check bearer token auth. Returns `None` if authorized, `Some(response)`
/// if rejected.
fn check_auth(headers: &HeaderMap, api_key: &Option<String>) -> Option<(StatusCode, Json<Value>)> {
    let key = match api_key {
        Some(k) => k,
        None => return None, // No auth configured — allow all.
    };

    let header = match headers.get("authorization").and_then(|h| h.to_str().ok()) {
        Some(h) => h,
        None => {
            return Some((
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "missing Authorization header"})),
            ));
        }
    };

    match header.strip_prefix("Bearer ") {
        Some(token) if constant_time_compare(token, key) => None, // Authorized.
        _ => Some((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid token"})),
        )),
    }
}

fn internal_error(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    warn!("request failed: {e:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal error"})),
    )
}

/// `GET /health` — Health check with uptime.
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.uptime.elapsed().as_secs(),
    }))
}

/// `GET /admin/settings` — The settings form.
async fn settings_page(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Html<String>, (StatusCode, Json<Value>)> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    state.admin.render().map(Html).map_err(internal_error)
}

/// `POST /admin/settings` — Save definitions and display position.
async fn settings_save(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(submission): Json<SettingsSubmission>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let outcome = state
        .admin
        .handle_save(&submission, &AdminContext { can_manage: true })
        .map_err(internal_error)?;

    Ok(Json(json!(outcome)))
}

/// `GET /posts/{id}/panel` — The per-post editor panel fragment.
async fn panel_page(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Html<String>, (StatusCode, Json<Value>)> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    state.panel.render(post_id).map(Html).map_err(internal_error)
}

/// `POST /posts/{id}/links` — The host's post-save event for one post.
async fn links_save(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(request): Json<EditorSaveRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let submission = EditorSubmission {
        token: request.token,
        links: request.links,
    };
    let ctx = SaveContext {
        can_edit: true,
        is_autosave: request.autosave,
    };
    let outcome = state
        .panel
        .handle_save(post_id, &submission, &ctx)
        .map_err(internal_error)?;

    Ok(Json(json!(outcome)))
}

/// `POST /render` — Apply the content filter. Visitor-facing: a failure
/// degrades to passing the content through unchanged.
async fn render_content(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> Json<Value> {
    let content = match state
        .injector
        .filter(request.post_id, &request.content, &request.context)
    {
        Ok(filtered) => filtered,
        Err(e) => {
            warn!("content filter failed for post {}: {e:#}", request.post_id);
            request.content
        }
    };

    Json(json!({ "content": content }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/admin/settings", get(settings_page).post(settings_save))
        .route("/posts/:post_id/panel", get(panel_page))
        .route("/posts/:post_id/links", post(links_save))
        .route("/render", post(render_content))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
