//! Placeholder application routes.
//!
//! The real pages and CRUD handlers live outside this crate. These stand in
//! for them so the gate has something to forward to: they render nothing,
//! persist nothing, and only exercise the parts of the contract handlers
//! rely on (the [`GateContext`] extension and the concern budgets).

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::GateError;
use crate::gate::{Concern, GateContext};
use crate::http::server::AppState;
use crate::session::{Identity, Role};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/{*section}", get(dashboard))
        .route("/api/contact", post(contact))
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/users", get(list_users))
        .route("/api/dashboard/stats", get(dashboard_stats))
        .fallback(not_found)
}

async fn home() -> Html<&'static str> {
    Html("<h1>Home</h1>")
}

async fn login() -> Html<&'static str> {
    Html("<h1>Sign in</h1>")
}

async fn dashboard(Extension(ctx): Extension<GateContext>) -> Html<String> {
    let who = ctx
        .identity
        .as_ref()
        .map(|i| i.display_name.clone().unwrap_or_else(|| i.email.clone()))
        .unwrap_or_default();
    Html(format!("<h1>Dashboard</h1><p>{who}</p>"))
}

async fn contact(
    State(state): State<AppState>,
    Extension(ctx): Extension<GateContext>,
) -> Result<Json<Value>, GateError> {
    state.gatekeeper.limit(Concern::Contact, &ctx.client)?;
    Ok(Json(json!({ "success": true })))
}

async fn list_posts(Extension(ctx): Extension<GateContext>) -> Result<Json<Value>, GateError> {
    require_role(&ctx, Role::Admin)?;
    Ok(Json(json!([])))
}

async fn create_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<GateContext>,
) -> Result<impl IntoResponse, GateError> {
    let user = require_role(&ctx, Role::User)?;
    state.gatekeeper.limit(Concern::Writes, &user.id)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": Uuid::new_v4(), "author": user.id })),
    ))
}

async fn list_users(Extension(ctx): Extension<GateContext>) -> Result<Json<Value>, GateError> {
    require_role(&ctx, Role::Admin)?;
    Ok(Json(json!([])))
}

async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(ctx): Extension<GateContext>,
) -> Result<Json<Value>, GateError> {
    let user = require_role(&ctx, Role::Admin)?;
    state.gatekeeper.limit(Concern::Dashboard, &user.id)?;
    Ok(Json(json!({ "users": 0, "posts": [], "published": 0 })))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Handler-side authorization on top of the gate's route-level check.
fn require_role(ctx: &GateContext, role: Role) -> Result<&Identity, GateError> {
    let identity = ctx.identity.as_ref().ok_or(GateError::Unauthenticated)?;
    if identity.role.satisfies(role) {
        Ok(identity)
    } else {
        Err(GateError::Forbidden)
    }
}
