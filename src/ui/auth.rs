use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tracing::warn;

use super::{removal_cookie, render_template, render_with_status, session_cookie, LoginTemplate, Notice, PageQuery};
use crate::auth::AuthSession;
use crate::error::{AuthError, ValidationErrors};
use crate::forms::LoginForm;
use crate::AppState;

const AFTER_SIGN_IN: &str = "/admin/dashboard";

pub(super) async fn login_page(session: AuthSession, Query(query): Query<PageQuery>) -> Response {
    if session.current_user().is_ok() {
        return Redirect::to(AFTER_SIGN_IN).into_response();
    }
    render_template(LoginTemplate::new(
        String::new(),
        &ValidationErrors::default(),
        query.notice(),
    ))
}

pub(super) async fn login_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if let Err(errors) = form.validate() {
        return render_with_status(
            StatusCode::BAD_REQUEST,
            LoginTemplate::new(form.email, &errors, None),
        );
    }

    match state.gateway.sign_in(&form.email, &form.password).await {
        Ok(signed_in) => {
            // a previous session on this browser is replaced
            if let Some(old) = jar.get(&state.config.session.cookie_name) {
                let old = old.value().to_string();
                state.uploads.discard(&old);
                let _ = state.gateway.sign_out(&old).await;
            }
            let jar = jar.add(session_cookie(&state.config.session, signed_in.session_id));
            (jar, Redirect::to(&Notice::SignedIn.redirect_path(AFTER_SIGN_IN))).into_response()
        }
        Err(e) => {
            let (status, message) = match &e {
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
                }
                AuthError::ChallengeRequired(_) => (StatusCode::FORBIDDEN, e.to_string()),
                _ => {
                    warn!(error = %e, "Sign-in unavailable");
                    (
                        StatusCode::BAD_GATEWAY,
                        "Sign-in is currently unavailable, please try again".to_string(),
                    )
                }
            };
            let mut template = LoginTemplate::new(form.email, &ValidationErrors::default(), None);
            template.error = message;
            render_with_status(status, template)
        }
    }
}

/// Ends the local session first; a failed remote revocation is only logged.
pub(super) async fn logout(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    jar: CookieJar,
) -> Response {
    if let Some(id) = session.id() {
        state.uploads.discard(id);
        if let Err(e) = state.gateway.sign_out(id).await {
            warn!(error = %e, "Remote sign-out failed");
        }
    }

    let jar = jar.add(removal_cookie(&state.config.session));
    (
        jar,
        Redirect::to(&Notice::SignedOut.redirect_path(&state.config.session.login_path)),
    )
        .into_response()
}
