use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    render_with_status, shell_for, sign_in_again, signed_in, format_size, Notice, PageQuery,
    SelectOption, StagedFileRow, UploadTemplate,
};
use crate::auth::AuthSession;
use crate::error::{AuthError, ServiceError, ValidationErrors};
use crate::forms::UploadMetadataForm;
use crate::models::{AuthUser, UploadFile};
use crate::upload::{BatchError, BatchState, FileStatus, FileView};
use crate::AppState;

const PAGE: &str = "/admin/upload";

/// What the metadata form should show again
#[derive(Default)]
struct FormState {
    category_id: String,
    title: String,
    description: String,
    errors: ValidationErrors,
}

impl From<UploadMetadataForm> for FormState {
    fn from(form: UploadMetadataForm) -> Self {
        Self {
            category_id: form.category_id,
            title: form.title,
            description: form.description.unwrap_or_default(),
            errors: ValidationErrors::default(),
        }
    }
}

fn file_row(view: FileView) -> StagedFileRow {
    let (progress, error) = match &view.status {
        FileStatus::Uploading { progress } => (*progress, String::new()),
        FileStatus::Succeeded => (100, String::new()),
        FileStatus::Failed { error } => (0, error.clone()),
        FileStatus::Queued => (0, String::new()),
    };
    StagedFileRow {
        id: view.id.to_string(),
        name: view.name,
        size: format_size(view.size),
        preview_url: view.preview_url,
        state: view.status.label(),
        progress,
        error,
    }
}

async fn render_page(
    state: &AppState,
    session: &AuthSession,
    user: AuthUser,
    mut notice: Option<Notice>,
    messages: Vec<String>,
    form: FormState,
    status: StatusCode,
) -> Response {
    let Some(session_id) = session.id() else {
        return sign_in_again(state, session, Notice::SessionExpired);
    };

    let (files, running, report) = {
        let batch = state.uploads.batch(session_id);
        let batch = batch.lock();
        let report = if batch.state() == BatchState::Finished {
            batch.last_report().map(|r| (r.all_succeeded(), r.failed()))
        } else {
            None
        };
        (batch.snapshot(), batch.is_running(), report)
    };

    let categories = match state.categories(session).list().await {
        Ok(categories) => categories,
        Err(e) if e.is_session_lost() => return sign_in_again(state, session, Notice::SessionExpired),
        Err(e) => {
            warn!(error = %e, "Failed to load categories");
            notice = Some(Notice::CategoriesLoadFailed);
            Vec::new()
        }
    };

    let (summary, summary_is_error) = match report {
        Some((true, _)) => ("All files uploaded successfully".to_string(), false),
        Some((false, failed)) => (
            format!("Some files failed to upload ({} failed)", failed),
            true,
        ),
        None => (String::new(), false),
    };

    let policy = state.uploads.policy();
    let field_error = |field: &str| form.errors.first(field).unwrap_or_default().to_string();

    render_with_status(
        status,
        UploadTemplate {
            shell: shell_for(state, user, "upload", notice).with_messages(messages),
            files: files.into_iter().map(file_row).collect(),
            running,
            summary,
            summary_is_error,
            accept: policy.accept_attribute(),
            max_size: format_size(policy.max_file_size()),
            categories: categories
                .iter()
                .map(|c| SelectOption {
                    value: c.id.clone(),
                    label: c.name.clone(),
                    selected: c.id == form.category_id,
                })
                .collect(),
            category_error: field_error("category_id"),
            title_error: field_error("title"),
            description_error: field_error("description"),
            title: form.title,
            description: form.description,
        },
    )
}

pub(super) async fn upload_page(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Query(query): Query<PageQuery>,
) -> Response {
    let user = match signed_in(&state, &session) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    render_page(
        &state,
        &session,
        user,
        query.notice(),
        Vec::new(),
        FormState::default(),
        StatusCode::OK,
    )
    .await
}

/// Stage dropped files. Rejected files are listed on the page, one line per
/// reason; the rest join the batch.
pub(super) async fn add_files(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    mut multipart: Multipart,
) -> Response {
    let user = match signed_in(&state, &session) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    let Some(session_id) = session.id() else {
        return sign_in_again(&state, &session, Notice::SessionExpired);
    };

    let mut files = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Malformed upload form");
                return (StatusCode::BAD_REQUEST, e.body_text()).into_response();
            }
        };
        let Some(name) = field.file_name().map(str::to_string).filter(|n| !n.is_empty()) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        match field.bytes().await {
            Ok(bytes) => files.push(UploadFile::new(name, content_type.as_deref(), bytes)),
            Err(e) => {
                warn!(error = %e, file = %name, "Failed to read uploaded file");
                return (StatusCode::BAD_REQUEST, e.body_text()).into_response();
            }
        }
    }

    let admission = state.uploads.policy().admit(files);
    let messages = admission.messages();
    for rejection in &admission.rejections {
        info!(file = %rejection.file_name, reason = %rejection.reason, "File rejected");
    }

    let added = state.uploads.batch(session_id).lock().add(admission.accepted);
    if let Err(BatchError::Running) = added {
        return Redirect::to(&Notice::UploadRunning.redirect_path(PAGE)).into_response();
    }

    if messages.is_empty() {
        return Redirect::to(PAGE).into_response();
    }
    render_page(
        &state,
        &session,
        user,
        None,
        messages,
        FormState::default(),
        StatusCode::OK,
    )
    .await
}

pub(super) async fn remove_file(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Response {
    if let Err(redirect) = signed_in(&state, &session) {
        return redirect;
    }
    let Some(batch) = session.id().and_then(|sid| state.uploads.existing(sid)) else {
        return Redirect::to(PAGE).into_response();
    };
    let removed = batch.lock().remove(&id);
    match removed {
        Err(BatchError::Running) => Redirect::to(&Notice::UploadRunning.redirect_path(PAGE)).into_response(),
        _ => Redirect::to(PAGE).into_response(),
    }
}

pub(super) async fn clear(State(state): State<Arc<AppState>>, session: AuthSession) -> Response {
    if let Err(redirect) = signed_in(&state, &session) {
        return redirect;
    }
    let cleared = match session.id().and_then(|sid| state.uploads.existing(sid)) {
        Some(batch) => batch.lock().clear(),
        None => Ok(()),
    };
    match cleared {
        Ok(()) => Redirect::to(&Notice::BatchCleared.redirect_path(PAGE)).into_response(),
        Err(_) => Redirect::to(&Notice::UploadRunning.redirect_path(PAGE)).into_response(),
    }
}

/// Start the batch. The uploads run in a background task; the page polls.
pub(super) async fn submit(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Form(form): Form<UploadMetadataForm>,
) -> Response {
    let user = match signed_in(&state, &session) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    let Some(session_id) = session.id().map(str::to_string) else {
        return sign_in_again(&state, &session, Notice::SessionExpired);
    };

    let metadata = match form.clone().into_metadata() {
        Ok(metadata) => metadata,
        Err(errors) => {
            let form = FormState {
                errors,
                ..FormState::from(form)
            };
            return render_page(&state, &session, user, None, Vec::new(), form, StatusCode::BAD_REQUEST)
                .await;
        }
    };

    let batch = state.uploads.batch(&session_id);
    let begun = batch.lock().begin(&metadata);
    let submission = match begun {
        Ok(submission) => submission,
        Err(BatchError::Empty) => {
            return Redirect::to(&Notice::UploadNoFiles.redirect_path(PAGE)).into_response()
        }
        Err(BatchError::Running) => {
            return Redirect::to(&Notice::UploadRunning.redirect_path(PAGE)).into_response()
        }
        Err(BatchError::Invalid(errors)) => {
            let form = FormState {
                errors,
                ..FormState::from(form)
            };
            return render_page(&state, &session, user, None, Vec::new(), form, StatusCode::BAD_REQUEST)
                .await;
        }
    };

    info!(
        email = %user.email,
        files = submission.len(),
        category = %metadata.category_id,
        "Upload batch started"
    );

    let uploader = state.media(&session);
    tokio::spawn(async move {
        let report = submission.run(&uploader).await;
        batch.lock().settle(report);
    });

    Redirect::to(&Notice::UploadStarted.redirect_path(PAGE)).into_response()
}

#[derive(Serialize)]
pub(super) struct BatchStatus {
    state: BatchState,
    files: Vec<FileView>,
}

/// JSON answer for a session that is gone; its staged batch goes with it.
fn session_lost(state: &AppState, session: &AuthSession, err: AuthError) -> Response {
    if let Some(id) = session.id() {
        state.uploads.discard(id);
    }
    ServiceError::from(err).into_response()
}

pub(super) async fn status(State(state): State<Arc<AppState>>, session: AuthSession) -> Response {
    if let Err(e) = session.current_user() {
        return session_lost(&state, &session, e);
    }
    let status = match session.id().and_then(|sid| state.uploads.existing(sid)) {
        Some(batch) => {
            let batch = batch.lock();
            BatchStatus {
                state: batch.state(),
                files: batch.snapshot(),
            }
        }
        None => BatchStatus {
            state: BatchState::Idle,
            files: Vec::new(),
        },
    };
    Json(status).into_response()
}

/// Preview bytes, served only to the session that staged the file.
pub(super) async fn preview(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Response {
    if let Err(e) = session.current_user() {
        return session_lost(&state, &session, e);
    }
    let staged_here = session
        .id()
        .and_then(|sid| state.uploads.existing(sid))
        .map(|batch| {
            let staged = batch.lock().contains(&id);
            staged
        })
        .unwrap_or(false);
    if !staged_here {
        return StatusCode::NOT_FOUND.into_response();
    }
    match state.uploads.previews().get(&id) {
        Some(preview) => (
            [
                (header::CONTENT_TYPE, preview.content_type),
                (header::CACHE_CONTROL, "private, no-store".to_string()),
            ],
            preview.bytes,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
