//! In-process doubles for the collaborators of the console.

use async_trait::async_trait;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::auth::claims::tests::id_token;
use crate::auth::{IdentityProvider, SessionAuthority, TokenSet};
use crate::error::AuthError;
use crate::models::{
    AuthUser, Category, CategoryInput, MediaItem, MediaMetadata, Template, TemplateInput,
};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const VIEWER_EMAIL: &str = "viewer@example.com";
pub const PASSWORD: &str = "correct-horse";

const FAR_FUTURE: i64 = 4_102_444_800;

#[derive(Default)]
struct FakeState {
    requests: AtomicUsize,
    next_id: AtomicUsize,
    categories: Mutex<Vec<Category>>,
    templates: Mutex<Vec<Template>>,
    media: Mutex<Vec<(MediaMetadata, usize)>>,
}

impl FakeState {
    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// The gallery REST API, served from memory on an ephemeral port.
///
/// Uploads whose filename contains `fail` are answered with a 500.
pub struct FakeApi {
    pub base_url: String,
    state: Arc<FakeState>,
}

impl FakeApi {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());

        let app = Router::new()
            .route("/admin/categories", get(list_categories).post(create_category))
            .route(
                "/admin/categories/:id",
                get(get_category).put(update_category).delete(delete_category),
            )
            .route("/admin/templates", get(list_templates).post(create_template))
            .route(
                "/admin/templates/:id",
                get(get_template).put(update_template).delete(delete_template),
            )
            .route("/admin/media", post(upload_media))
            .route("/admin/media/:category_id", get(list_media))
            .layer(DefaultBodyLimit::disable())
            .layer(middleware::from_fn_with_state(state.clone(), count_and_authorize))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<MediaMetadata> {
        self.state.media.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn seed_category(&self, name: &str) -> Category {
        let category = Category {
            id: self.state.next_id("cat"),
            name: name.to_string(),
            description: None,
            template_id: None,
        };
        self.state.categories.lock().push(category.clone());
        category
    }
}

async fn count_and_authorize(
    State(state): State<Arc<FakeState>>,
    request: Request,
    next: Next,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer ") && v.len() > "Bearer ".len())
        .unwrap_or(false);
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(request).await
}

async fn list_categories(State(state): State<Arc<FakeState>>) -> Json<Vec<Category>> {
    Json(state.categories.lock().clone())
}

async fn get_category(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
) -> Result<Json<Category>, StatusCode> {
    state
        .categories
        .lock()
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn create_category(
    State(state): State<Arc<FakeState>>,
    Json(input): Json<CategoryInput>,
) -> (StatusCode, Json<Category>) {
    let category = Category {
        id: state.next_id("cat"),
        name: input.name,
        description: input.description,
        template_id: input.template_id,
    };
    state.categories.lock().push(category.clone());
    (StatusCode::CREATED, Json(category))
}

async fn update_category(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>, StatusCode> {
    let mut categories = state.categories.lock();
    let category = categories
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    category.name = input.name;
    category.description = input.description;
    category.template_id = input.template_id;
    Ok(Json(category.clone()))
}

async fn delete_category(State(state): State<Arc<FakeState>>, Path(id): Path<String>) -> StatusCode {
    let mut categories = state.categories.lock();
    let before = categories.len();
    categories.retain(|c| c.id != id);
    if categories.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn list_templates(State(state): State<Arc<FakeState>>) -> Json<Vec<Template>> {
    Json(state.templates.lock().clone())
}

async fn get_template(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
) -> Result<Json<Template>, StatusCode> {
    state
        .templates
        .lock()
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn create_template(
    State(state): State<Arc<FakeState>>,
    Json(input): Json<TemplateInput>,
) -> (StatusCode, Json<Template>) {
    let template = Template {
        id: state.next_id("tpl"),
        name: input.name,
        description: input.description,
        fields: input.fields,
    };
    state.templates.lock().push(template.clone());
    (StatusCode::CREATED, Json(template))
}

async fn update_template(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    Json(input): Json<TemplateInput>,
) -> Result<Json<Template>, StatusCode> {
    let mut templates = state.templates.lock();
    let template = templates
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    template.name = input.name;
    template.description = input.description;
    template.fields = input.fields;
    Ok(Json(template.clone()))
}

async fn delete_template(State(state): State<Arc<FakeState>>, Path(id): Path<String>) -> StatusCode {
    let mut templates = state.templates.lock();
    let before = templates.len();
    templates.retain(|t| t.id != id);
    if templates.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn upload_media(State(state): State<Arc<FakeState>>, mut multipart: Multipart) -> StatusCode {
    let mut metadata: Option<MediaMetadata> = None;
    let mut size = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name() {
            Some("file") => size = field.bytes().await.ok().map(|b| b.len()),
            Some("metadata") => {
                metadata = field
                    .text()
                    .await
                    .ok()
                    .and_then(|text| serde_json::from_str(&text).ok())
            }
            _ => {}
        }
    }

    let (Some(metadata), Some(size)) = (metadata, size) else {
        return StatusCode::BAD_REQUEST;
    };
    if metadata.filename.contains("fail") {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    state.media.lock().push((metadata, size));
    StatusCode::CREATED
}

async fn list_media(
    State(state): State<Arc<FakeState>>,
    Path(category_id): Path<String>,
) -> Json<Vec<MediaItem>> {
    let items = state
        .media
        .lock()
        .iter()
        .enumerate()
        .filter(|(_, (m, _))| m.category_id == category_id)
        .map(|(i, (m, _))| MediaItem {
            id: Some(format!("media-{}", i + 1)),
            title: Some(m.title.clone()),
            description: m.description.clone(),
            filename: Some(m.filename.clone()),
            url: None,
            category_id: Some(m.category_id.clone()),
        })
        .collect();
    Json(items)
}

/// Session double with a fixed role.
pub struct FixedAuthority {
    admin: bool,
}

impl SessionAuthority for FixedAuthority {
    fn bearer_token(&self) -> Result<String, AuthError> {
        Ok("test-id-token".to_string())
    }

    fn require_admin(&self) -> Result<AuthUser, AuthError> {
        if self.admin {
            Ok(AuthUser {
                email: ADMIN_EMAIL.to_string(),
                groups: vec!["Admin".to_string()],
            })
        } else {
            Err(AuthError::AdminRequired)
        }
    }
}

pub fn admin() -> Arc<dyn SessionAuthority> {
    Arc::new(FixedAuthority { admin: true })
}

pub fn viewer() -> Arc<dyn SessionAuthority> {
    Arc::new(FixedAuthority { admin: false })
}

/// Identity provider that knows one admin and one viewer.
pub struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn initiate_auth(&self, email: &str, password: &str) -> Result<TokenSet, AuthError> {
        let groups: &[&str] = match email {
            ADMIN_EMAIL => &["Admin"],
            VIEWER_EMAIL => &[],
            _ => return Err(AuthError::InvalidCredentials),
        };
        if password != PASSWORD {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(TokenSet {
            id_token: id_token(email, groups, FAR_FUTURE),
            access_token: "access".to_string(),
        })
    }

    async fn global_sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Signs the admin in with an id token that expired long ago.
pub struct ExpiredIdentity;

#[async_trait]
impl IdentityProvider for ExpiredIdentity {
    async fn initiate_auth(&self, email: &str, password: &str) -> Result<TokenSet, AuthError> {
        if email != ADMIN_EMAIL || password != PASSWORD {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(TokenSet {
            id_token: id_token(email, &["Admin"], 1_000_000_000),
            access_token: "access".to_string(),
        })
    }

    async fn global_sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        Ok(())
    }
}
