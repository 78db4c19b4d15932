// Askama template definitions

use askama::Template;

use super::notice::Notice;
use crate::error::ValidationErrors;

/// Header, navigation and banner data shared by every admin page
pub struct Shell {
    pub email: String,
    pub is_admin: bool,
    pub section: &'static str,
    pub notice_message: String,
    pub notice_is_error: bool,
    pub messages: Vec<String>,
}

impl Shell {
    pub fn new(email: String, is_admin: bool, section: &'static str) -> Self {
        Self {
            email,
            is_admin,
            section,
            notice_message: String::new(),
            notice_is_error: false,
            messages: Vec::new(),
        }
    }

    pub fn with_notice(mut self, notice: Option<Notice>) -> Self {
        if let Some(notice) = notice {
            self.notice_message = notice.message().to_string();
            self.notice_is_error = notice.is_error();
        }
        self
    }

    /// Extra error lines shown under the banner
    pub fn with_messages(mut self, messages: Vec<String>) -> Self {
        self.messages = messages;
        self
    }
}

pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

fn error_for(errors: &ValidationErrors, field: &str) -> String {
    errors.first(field).unwrap_or_default().to_string()
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub version: String,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub email_error: String,
    pub password_error: String,
    pub error: String,
    pub notice_message: String,
    pub notice_is_error: bool,
    pub version: String,
}

impl LoginTemplate {
    pub fn new(email: String, errors: &ValidationErrors, notice: Option<Notice>) -> Self {
        Self {
            email,
            email_error: error_for(errors, "email"),
            password_error: error_for(errors, "password"),
            error: String::new(),
            notice_message: notice.map(|n| n.message().to_string()).unwrap_or_default(),
            notice_is_error: notice.map(|n| n.is_error()).unwrap_or(false),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub shell: Shell,
    pub categories: String,
    pub templates: String,
}

pub struct CategoryRow {
    /// Path-escaped
    pub id: String,
    pub name: String,
    pub description: String,
    pub template_name: String,
}

pub struct CategoryDialog {
    pub action: String,
    pub title: String,
    pub name: String,
    pub description: String,
    pub templates: Vec<SelectOption>,
    pub name_error: String,
    pub description_error: String,
    pub template_error: String,
}

impl CategoryDialog {
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.name_error = error_for(errors, "name");
        self.description_error = error_for(errors, "description");
        self.template_error = error_for(errors, "template_id");
        self
    }
}

#[derive(Template)]
#[template(path = "categories.html")]
pub struct CategoriesTemplate {
    pub shell: Shell,
    pub categories: Vec<CategoryRow>,
    pub dialog: Option<CategoryDialog>,
}

pub struct MediaRow {
    pub title: String,
    pub filename: String,
    pub description: String,
    pub url: String,
}

#[derive(Template)]
#[template(path = "category_media.html")]
pub struct CategoryMediaTemplate {
    pub shell: Shell,
    pub category_name: String,
    pub items: Vec<MediaRow>,
}

pub struct TemplateRow {
    /// Path-escaped
    pub id: String,
    pub name: String,
    pub description: String,
    pub field_summary: String,
}

pub struct FieldRowView {
    pub name: String,
    pub label: String,
    pub types: Vec<SelectOption>,
    pub required: bool,
    pub name_error: String,
    pub label_error: String,
    pub type_error: String,
}

pub struct TemplateDialog {
    pub action: String,
    pub title: String,
    pub name: String,
    pub description: String,
    pub rows: Vec<FieldRowView>,
    pub name_error: String,
    pub description_error: String,
    pub fields_error: String,
}

impl TemplateDialog {
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.name_error = error_for(errors, "name");
        self.description_error = error_for(errors, "description");
        self.fields_error = error_for(errors, "fields");
        for (index, row) in self.rows.iter_mut().enumerate() {
            row.name_error = error_for(errors, &format!("fields.{}.name", index));
            row.label_error = error_for(errors, &format!("fields.{}.label", index));
            row.type_error = error_for(errors, &format!("fields.{}.type", index));
        }
        self
    }
}

#[derive(Template)]
#[template(path = "metadata_templates.html")]
pub struct TemplatesTemplate {
    pub shell: Shell,
    pub templates: Vec<TemplateRow>,
    pub dialog: Option<TemplateDialog>,
}

pub struct StagedFileRow {
    pub id: String,
    pub name: String,
    pub size: String,
    pub preview_url: String,
    pub state: &'static str,
    pub progress: u8,
    pub error: String,
}

#[derive(Template)]
#[template(path = "upload.html")]
pub struct UploadTemplate {
    pub shell: Shell,
    pub files: Vec<StagedFileRow>,
    pub running: bool,
    pub summary: String,
    pub summary_is_error: bool,
    pub accept: String,
    pub max_size: String,
    pub categories: Vec<SelectOption>,
    pub title: String,
    pub description: String,
    pub category_error: String,
    pub title_error: String,
    pub description_error: String,
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b >= MIB {
        format!("{:.1} MB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}
