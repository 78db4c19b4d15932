//! Redirects anonymous visitors away from the admin area.
//!
//! The guard only looks for the auth cookie. Whether the session behind it is
//! still alive is decided by the pages themselves.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tracing::debug;

use crate::config::SessionConfig;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    RedirectToLogin,
}

pub fn guard_decision(path: &str, has_cookie: bool, config: &SessionConfig) -> GuardDecision {
    let prefix = config.admin_prefix.trim_end_matches('/');
    let under_admin = path == prefix
        || path
            .strip_prefix(prefix)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false);

    if under_admin && !has_cookie {
        GuardDecision::RedirectToLogin
    } else {
        GuardDecision::Pass
    }
}

pub async fn route_guard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let session = &state.config.session;
    let has_cookie = jar
        .get(&session.cookie_name)
        .map(|c| !c.value().is_empty())
        .unwrap_or(false);

    match guard_decision(request.uri().path(), has_cookie, session) {
        GuardDecision::Pass => next.run(request).await,
        GuardDecision::RedirectToLogin => {
            debug!(path = %request.uri().path(), "No session cookie, redirecting to login");
            Redirect::to(&session.login_path).into_response()
        }
    }
}
