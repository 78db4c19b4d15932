//! Clients for the gallery REST API.
//!
//! Each service is built for one session and asks it for credentials and
//! role checks on every call.

pub mod api_client;
pub mod categories;
pub mod media;
pub mod templates;

pub use api_client::ApiClient;
pub use categories::CategoryService;
pub use media::{MediaService, MediaUploader, ProgressFn};
pub use templates::TemplateService;
