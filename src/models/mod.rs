//! Entities exchanged with the gallery API and the identity provider.

mod category;
mod media;
mod template;
mod user;

pub use category::{Category, CategoryInput};
pub use media::{MediaItem, MediaMetadata, UploadFile, UploadMetadata};
pub use template::{FieldType, Template, TemplateField, TemplateInput};
pub use user::AuthUser;
