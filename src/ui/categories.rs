use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use std::sync::Arc;
use tracing::warn;

use super::{
    failure_redirect, render_template, render_with_status, shell_for, sign_in_again, signed_in,
    CategoriesTemplate, CategoryDialog, CategoryMediaTemplate, CategoryRow, MediaRow, Notice,
    PageQuery, SelectOption,
};
use crate::auth::{AuthSession, SessionAuthority};
use crate::error::{ServiceError, ValidationErrors};
use crate::forms::CategoryForm;
use crate::models::{AuthUser, Category, Template};
use crate::services::api_client::segment;
use crate::AppState;

const LIST: &str = "/admin/categories";

fn template_options(templates: &[Template], selected: Option<&str>) -> Vec<SelectOption> {
    templates
        .iter()
        .map(|t| SelectOption {
            value: t.id.clone(),
            label: t.name.clone(),
            selected: selected == Some(t.id.as_str()),
        })
        .collect()
}

fn dialog_for(category: Option<&Category>, form: &CategoryForm, templates: &[Template]) -> CategoryDialog {
    let (action, title) = match category {
        Some(c) => (format!("{}/{}", LIST, segment(&c.id)), "Edit Category".to_string()),
        None => (LIST.to_string(), "Create Category".to_string()),
    };
    CategoryDialog {
        action,
        title,
        name: form.name.clone(),
        description: form.description.clone().unwrap_or_default(),
        templates: template_options(templates, form.template_id.as_deref()),
        name_error: String::new(),
        description_error: String::new(),
        template_error: String::new(),
    }
}

fn form_from(category: &Category) -> CategoryForm {
    CategoryForm {
        name: category.name.clone(),
        description: category.description.clone(),
        template_id: category.template_id.clone(),
    }
}

/// Which dialog the list page shows, if any
enum DialogRequest {
    None,
    Blank,
    Edit(String),
    Invalid {
        category: Option<Category>,
        form: CategoryForm,
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
    let categories_service = state.categories(session);
    let templates_service = state.templates(session);
    let (categories, templates) = tokio::join!(categories_service.list(), templates_service.list());

    let categories = match categories {
        Ok(categories) => categories,
        Err(e) if e.is_session_lost() => return sign_in_again(state, session, Notice::SessionExpired),
        Err(e) => {
            warn!(error = %e, "Failed to load categories");
            notice = Some(Notice::CategoriesLoadFailed);
            Vec::new()
        }
    };
    let templates = templates.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load templates");
        Vec::new()
    });

    let is_admin = user.in_group(state.gateway.admin_group());
    let mut status = StatusCode::OK;
    let dialog = match request {
        _ if !is_admin => None,
        DialogRequest::None => None,
        DialogRequest::Blank => Some(dialog_for(None, &CategoryForm::default(), &templates)),
        DialogRequest::Edit(id) => match categories_service.get(&id).await {
            Ok(category) => Some(dialog_for(Some(&category), &form_from(&category), &templates)),
            Err(e) if e.is_session_lost() => return sign_in_again(state, session, Notice::SessionExpired),
            Err(e) => {
                warn!(error = %e, category = %id, "Failed to load category");
                notice = Some(Notice::CategoryNotFound);
                None
            }
        },
        DialogRequest::Invalid {
            category,
            form,
            errors,
        } => {
            status = StatusCode::BAD_REQUEST;
            Some(dialog_for(category.as_ref(), &form, &templates).errors(&errors))
        }
    };

    let rows = categories
        .iter()
        .map(|c| CategoryRow {
            id: segment(&c.id),
            name: c.name.clone(),
            description: c.description.clone().unwrap_or_default(),
            template_name: c.template_name(&templates).unwrap_or_default().to_string(),
        })
        .collect();

    render_with_status(
        status,
        CategoriesTemplate {
            shell: shell_for(state, user, "categories", notice),
            categories: rows,
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

async fn save(state: Arc<AppState>, session: AuthSession, id: Option<String>, form: CategoryForm) -> Response {
    let user = match signed_in(&state, &session) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    // admins only, before anything is validated or sent
    if let Err(e) = session.require_admin() {
        return failure_redirect(&state, &session, &ServiceError::from(e), LIST, Notice::CategorySaveFailed);
    }

    let category = id.as_ref().map(|id| Category {
        id: id.clone(),
        name: form.name.clone(),
        description: None,
        template_id: None,
    });

    let input = match form.clone().into_input() {
        Ok(input) => input,
        Err(errors) => {
            let request = DialogRequest::Invalid {
                category,
                form,
                errors,
            };
            return render_page(&state, &session, user, None, request).await;
        }
    };

    let service = state.categories(&session);
    let result = match &id {
        Some(id) => service.update(id, &input).await.map(|_| Notice::CategoryUpdated),
        None => service.create(&input).await.map(|_| Notice::CategoryCreated),
    };

    match result {
        Ok(notice) => Redirect::to(&notice.redirect_path(LIST)).into_response(),
        Err(ServiceError::Validation(errors)) => {
            let request = DialogRequest::Invalid {
                category,
                form,
                errors,
            };
            render_page(&state, &session, user, None, request).await
        }
        Err(e) => failure_redirect(&state, &session, &e, LIST, Notice::CategorySaveFailed),
    }
}

pub(super) async fn create(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Form(form): Form<CategoryForm>,
) -> Response {
    save(state, session, None, form).await
}

pub(super) async fn update(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    Form(form): Form<CategoryForm>,
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
    match state.categories(&session).delete(&id).await {
        Ok(()) => Redirect::to(&Notice::CategoryDeleted.redirect_path(LIST)).into_response(),
        Err(e) => failure_redirect(&state, &session, &e, LIST, Notice::CategoryDeleteFailed),
    }
}

pub(super) async fn media_page(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let user = match signed_in(&state, &session) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let categories = state.categories(&session);
    let media = state.media(&session);
    let (category, items) = tokio::join!(categories.get(&id), media.list_by_category(&id));

    let category = match category {
        Ok(category) => category,
        Err(e) => return failure_redirect(&state, &session, &e, LIST, Notice::CategoryNotFound),
    };

    let mut notice = query.notice();
    let items = match items {
        Ok(items) => items,
        Err(e) if e.is_session_lost() => return sign_in_again(&state, &session, Notice::SessionExpired),
        Err(e) => {
            warn!(error = %e, category = %id, "Failed to load media");
            notice = Some(Notice::MediaLoadFailed);
            Vec::new()
        }
    };

    render_template(CategoryMediaTemplate {
        shell: shell_for(&state, user, "categories", notice),
        category_name: category.name,
        items: items
            .into_iter()
            .map(|item| MediaRow {
                title: item.title.unwrap_or_else(|| "Untitled".to_string()),
                filename: item.filename.unwrap_or_default(),
                description: item.description.unwrap_or_default(),
                url: item.url.unwrap_or_default(),
            })
            .collect(),
    })
}
