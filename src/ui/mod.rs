// Admin console UI
// Uses Askama templates for server-side rendering

mod auth;
mod categories;
mod dashboard;
pub mod guard;
mod metadata;
pub mod notice;
mod templates;
mod upload;

use askama::Template;
use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::warn;

use crate::auth::AuthSession;
use crate::config::SessionConfig;
use crate::error::ServiceError;
use crate::models::AuthUser;
use crate::AppState;

pub use notice::Notice;
pub use templates::*;

// Helper to render templates and handle errors
fn render_template<T: Template>(template: T) -> Response {
    render_with_status(StatusCode::OK, template)
}

fn render_with_status<T: Template>(status: StatusCode, template: T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            warn!(error = %e, "Template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Template error: {}", e)).into_response()
        }
    }
}

pub fn create_router(state: &AppState) -> Router<Arc<AppState>> {
    let body_limit = state.config.server.max_request_size;

    Router::new()
        // Public routes
        .route("/", get(index))
        .route("/health", get(health))
        .route("/auth/login", get(auth::login_page).post(auth::login_submit))
        .route("/auth/logout", get(auth::logout).post(auth::logout))
        // Admin routes
        .route("/admin", get(|| async { Redirect::to("/admin/dashboard") }))
        .route("/admin/dashboard", get(dashboard::dashboard))
        .route(
            "/admin/categories",
            get(categories::list_page).post(categories::create),
        )
        .route("/admin/categories/:id", post(categories::update))
        .route("/admin/categories/:id/delete", post(categories::delete))
        .route("/admin/categories/:id/media", get(categories::media_page))
        .route(
            "/admin/templates",
            get(metadata::list_page).post(metadata::create),
        )
        .route("/admin/templates/:id", post(metadata::update))
        .route("/admin/templates/:id/delete", post(metadata::delete))
        .route("/admin/upload", get(upload::upload_page).post(upload::submit))
        .route(
            "/admin/upload/files",
            post(upload::add_files).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/admin/upload/files/:id/remove", post(upload::remove_file))
        .route("/admin/upload/clear", post(upload::clear))
        .route("/admin/upload/status", get(upload::status))
        .route("/admin/upload/previews/:id", get(upload::preview))
}

/// Common query of list pages: `?notice=..`, `?new`, `?edit=id`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    pub notice: Option<String>,
    pub new: Option<String>,
    pub edit: Option<String>,
}

impl PageQuery {
    pub fn notice(&self) -> Option<Notice> {
        self.notice.as_deref().and_then(Notice::from_code)
    }
}

/// Reads the session id out of the auth cookie. Never rejects: a missing or
/// stale cookie yields a session that is simply not signed in.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let id = jar
            .get(&state.config.session.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty());
        Ok(state.gateway.session(id))
    }
}

pub(crate) fn session_cookie(config: &SessionConfig, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.cookie_name.clone(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.secure_cookie);
    if let Some(domain) = &config.cookie_domain {
        cookie = cookie.domain(domain.clone());
    }
    cookie.build()
}

/// A cookie that makes the browser forget the auth cookie.
pub(crate) fn removal_cookie(config: &SessionConfig) -> Cookie<'static> {
    let mut builder = Cookie::build((config.cookie_name.clone(), "")).path("/");
    if let Some(domain) = &config.cookie_domain {
        builder = builder.domain(domain.clone());
    }
    let mut cookie = builder.build();
    cookie.make_removal();
    cookie
}

/// End the visit: forget the session and its staged uploads, drop the auth
/// cookie and send the visitor to the login page.
pub(crate) fn sign_in_again(state: &AppState, session: &AuthSession, notice: Notice) -> Response {
    if let Some(id) = session.id() {
        state.gateway.evict(id);
        state.uploads.discard(id);
    }
    let jar = CookieJar::new().add(removal_cookie(&state.config.session));
    (jar, Redirect::to(&notice.redirect_path(&state.config.session.login_path))).into_response()
}

/// The signed-in user of an admin page, or the redirect that ends the visit.
pub(crate) fn signed_in(state: &AppState, session: &AuthSession) -> Result<AuthUser, Response> {
    session
        .current_user()
        .map_err(|_| sign_in_again(state, session, Notice::SessionExpired))
}

pub(crate) fn shell_for(
    state: &AppState,
    user: AuthUser,
    section: &'static str,
    notice: Option<Notice>,
) -> Shell {
    let is_admin = user.in_group(state.gateway.admin_group());
    Shell::new(user.email, is_admin, section).with_notice(notice)
}

/// Redirect after a failed mutation: lost sessions go to the login page,
/// everything else becomes a notice on `path`.
pub(crate) fn failure_redirect(
    state: &AppState,
    session: &AuthSession,
    err: &ServiceError,
    path: &str,
    fallback: Notice,
) -> Response {
    if err.is_session_lost() {
        return sign_in_again(state, session, Notice::SessionExpired);
    }
    let notice = if err.is_unauthorized() {
        Notice::AdminRequired
    } else {
        warn!(error = %err, path = %path, "Request failed");
        fallback
    };
    Redirect::to(&notice.redirect_path(path)).into_response()
}

async fn index() -> Response {
    render_template(IndexTemplate {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
