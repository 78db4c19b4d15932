//! Metadata template pages. The field list is a repeatable row group; adding
//! or removing a row re-renders the dialog without saving.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Form;
use std::sync::Arc;
use tracing::warn;

use super::{
    failure_redirect, render_with_status, shell_for, sign_in_again, signed_in, FieldRowView,
    Notice, PageQuery, SelectOption, TemplateDialog, TemplateRow, TemplatesTemplate,
};
use crate::auth::{AuthSession, SessionAuthority};
use crate::error::{ServiceError, ValidationErrors};
use crate::forms::{FieldRow, TemplateForm};
use crate::models::{AuthUser, FieldType, Template};
use crate::services::api_client::segment;
use crate::AppState;

const LIST: &str = "/admin/templates";

fn row_view(row: &FieldRow) -> FieldRowView {
    FieldRowView {
        name: row.name.clone(),
        label: row.label.clone(),
        types: FieldType::ALL
            .iter()
            .map(|t| SelectOption {
                value: t.as_str().to_string(),
                label: t.as_str().to_string(),
                selected: row.is_type(t),
            })
            .collect(),
        required: row.required,
        name_error: String::new(),
        label_error: String::new(),
        type_error: String::new(),
    }
}

fn dialog_for(id: Option<&str>, name: &str, description: &str, rows: &[FieldRow]) -> TemplateDialog {
    let (action, title) = match id {
        Some(id) => (format!("{}/{}", LIST, segment(id)), "Edit Template".to_string()),
        None => (LIST.to_string(), "Create Template".to_string()),
    };
    TemplateDialog {
        action,
        title,
        name: name.to_string(),
        description: description.to_string(),
        rows: rows.iter().map(row_view).collect(),
        name_error: String::new(),
        description_error: String::new(),
        fields_error: String::new(),
    }
}

fn field_summary(template: &Template) -> String {
    match template.fields.len() {
        1 => "1 field".to_string(),
        n => format!("{} fields", n),
    }
}

enum DialogRequest {
    None,
    Blank,
    Edit(String),
    /// A submitted form shown again, with or without errors
    Submitted {
        id: Option<String>,
        form: TemplateForm,
        rows: Vec<FieldRow>,
        errors: ValidationErrors,
    },
}

async fn render_page(
    state: &AppState,
    session: &AuthSession,
    user: AuthUser,
    mut notice: Option<Notice>,
    request: DialogRequest,
) -> Response {
    let service = state.templates(session);

    let templates = match service.list().await {
        Ok(templates) => templates,
        Err(e) if e.is_session_lost() => return sign_in_again(state, session, Notice::SessionExpired),
        Err(e) => {
            warn!(error = %e, "Failed to load templates");
            notice = Some(Notice::TemplatesLoadFailed);
            Vec::new()
        }
    };

    let is_admin = user.in_group(state.gateway.admin_group());
    let mut status = StatusCode::OK;
    let dialog = match request {
        _ if !is_admin => None,
        DialogRequest::None => None,
        DialogRequest::Blank => Some(dialog_for(None, "", "", &[FieldRow::blank()])),
        DialogRequest::Edit(id) => match service.get(&id).await {
            Ok(template) => {
                let rows: Vec<FieldRow> = template.fields.iter().map(FieldRow::from).collect();
                Some(dialog_for(
                    Some(&template.id),
                    &template.name,
                    template.description.as_deref().unwrap_or_default(),
                    &rows,
                ))
            }
            Err(e) if e.is_session_lost() => return sign_in_again(state, session, Notice::SessionExpired),
            Err(e) => {
                warn!(error = %e, template = %id, "Failed to load template");
                notice = Some(Notice::TemplateNotFound);
                None
            }
        },
        DialogRequest::Submitted {
            id,
            form,
            rows,
            errors,
        } => {
            if !errors.is_empty() {
                status = StatusCode::BAD_REQUEST;
            }
            let dialog = dialog_for(
                id.as_deref(),
                &form.name,
                form.description.as_deref().unwrap_or_default(),
                &rows,
            );
            Some(dialog.errors(&errors))
        }
    };

    let rows = templates
        .iter()
        .map(|t| TemplateRow {
            id: segment(&t.id),
            name: t.name.clone(),
            description: t.description.clone().unwrap_or_default(),
            field_summary: field_summary(t),
        })
        .collect();

    render_with_status(
        status,
        TemplatesTemplate {
            shell: shell_for(state, user, "templates", notice),
            templates: rows,
            dialog,
        },
    )
}

pub(super) async fn list_page(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Query(query): Query<PageQuery>,
) -> Response {
    let user = match signed_in(&state, &session) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let request = match (&query.new, &query.edit) {
        (_, Some(id)) => DialogRequest::Edit(id.clone()),
        (Some(_), None) => DialogRequest::Blank,
        (None, None) => DialogRequest::None,
    };
    render_page(&state, &session, user, query.notice(), request).await
}

async fn save(state: Arc<AppState>, session: AuthSession, id: Option<String>, form: TemplateForm) -> Response {
    let user = match signed_in(&state, &session) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    if let Err(e) = session.require_admin() {
        return failure_redirect(&state, &session, &ServiceError::from(e), LIST, Notice::TemplateSaveFailed);
    }

    if form.is_row_edit() {
        let rows = form.edited_rows();
        let request = DialogRequest::Submitted {
            id,
            form,
            rows,
            errors: ValidationErrors::default(),
        };
        return render_page(&state, &session, user, None, request).await;
    }

    let rows = form.rows();
    let input = match form.clone().into_input() {
        Ok(input) => input,
        Err(errors) => {
            let request = DialogRequest::Submitted {
                id,
                form,
                rows,
                errors,
            };
            return render_page(&state, &session, user, None, request).await;
        }
    };

    let service = state.templates(&session);
    let result = match &id {
        Some(id) => service.update(id, &input).await.map(|_| Notice::TemplateUpdated),
        None => service.create(&input).await.map(|_| Notice::TemplateCreated),
    };

    match result {
        Ok(notice) => Redirect::to(&notice.redirect_path(LIST)).into_response(),
        Err(ServiceError::Validation(errors)) => {
            let request = DialogRequest::Submitted {
                id,
                form,
                rows,
                errors,
            };
            render_page(&state, &session, user, None, request).await
        }
        Err(e) => failure_redirect(&state, &session, &e, LIST, Notice::TemplateSaveFailed),
    }
}

pub(super) async fn create(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Form(form): Form<TemplateForm>,
) -> Response {
    save(state, session, None, form).await
}

pub(super) async fn update(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    Form(form): Form<TemplateForm>,
) -> Response {
    save(state, session, Some(id), form).await
}

pub(super) async fn delete(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
) -> Response {
    if let Err(redirect) = signed_in(&state, &session) {
        return redirect;
    }
    match state.templates(&session).delete(&id).await {
        Ok(()) => Redirect::to(&Notice::TemplateDeleted.redirect_path(LIST)).into_response(),
        Err(e) => failure_redirect(&state, &session, &e, LIST, Notice::TemplateDeleteFailed),
    }
}
