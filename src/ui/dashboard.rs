use axum::{
    extract::{Query, State},
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use super::{render_template, shell_for, signed_in, DashboardTemplate, PageQuery};
use crate::auth::AuthSession;
use crate::error::ServiceError;
use crate::AppState;

pub(super) async fn dashboard(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Query(query): Query<PageQuery>,
) -> Response {
    let user = match signed_in(&state, &session) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let categories = state.categories(&session);
    let templates = state.templates(&session);
    let (categories, templates) = tokio::join!(categories.list(), templates.list());

    let count = |what: &str, len: Result<usize, ServiceError>| match len {
        Ok(n) => n.to_string(),
        Err(e) => {
            warn!(error = %e, "Failed to count {}", what);
            "-".to_string()
        }
    };

    render_template(DashboardTemplate {
        shell: shell_for(&state, user, "dashboard", query.notice()),
        categories: count("categories", categories.map(|c| c.len())),
        templates: count("templates", templates.map(|t| t.len())),
    })
}
