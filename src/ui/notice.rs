/// One-shot banners carried across redirects as `?notice=<code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    SignedIn,
    SignedOut,
    SessionExpired,
    AdminRequired,
    CategoryCreated,
    CategoryUpdated,
    CategoryDeleted,
    CategorySaveFailed,
    CategoryDeleteFailed,
    CategoriesLoadFailed,
    CategoryNotFound,
    TemplateCreated,
    TemplateUpdated,
    TemplateDeleted,
    TemplateSaveFailed,
    TemplateDeleteFailed,
    TemplatesLoadFailed,
    TemplateNotFound,
    MediaLoadFailed,
    UploadStarted,
    UploadNoFiles,
    UploadRunning,
    BatchCleared,
}

impl Notice {
    const ALL: [Notice; 23] = [
        Notice::SignedIn,
        Notice::SignedOut,
        Notice::SessionExpired,
        Notice::AdminRequired,
        Notice::CategoryCreated,
        Notice::CategoryUpdated,
        Notice::CategoryDeleted,
        Notice::CategorySaveFailed,
        Notice::CategoryDeleteFailed,
        Notice::CategoriesLoadFailed,
        Notice::CategoryNotFound,
        Notice::TemplateCreated,
        Notice::TemplateUpdated,
        Notice::TemplateDeleted,
        Notice::TemplateSaveFailed,
        Notice::TemplateDeleteFailed,
        Notice::TemplatesLoadFailed,
        Notice::TemplateNotFound,
        Notice::MediaLoadFailed,
        Notice::UploadStarted,
        Notice::UploadNoFiles,
        Notice::UploadRunning,
        Notice::BatchCleared,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Notice::SignedIn => "signed_in",
            Notice::SignedOut => "signed_out",
            Notice::SessionExpired => "session_expired",
            Notice::AdminRequired => "admin_required",
            Notice::CategoryCreated => "category_created",
            Notice::CategoryUpdated => "category_updated",
            Notice::CategoryDeleted => "category_deleted",
            Notice::CategorySaveFailed => "category_save_failed",
            Notice::CategoryDeleteFailed => "category_delete_failed",
            Notice::CategoriesLoadFailed => "categories_load_failed",
            Notice::CategoryNotFound => "category_not_found",
            Notice::TemplateCreated => "template_created",
            Notice::TemplateUpdated => "template_updated",
            Notice::TemplateDeleted => "template_deleted",
            Notice::TemplateSaveFailed => "template_save_failed",
            Notice::TemplateDeleteFailed => "template_delete_failed",
            Notice::TemplatesLoadFailed => "templates_load_failed",
            Notice::TemplateNotFound => "template_not_found",
            Notice::MediaLoadFailed => "media_load_failed",
            Notice::UploadStarted => "upload_started",
            Notice::UploadNoFiles => "upload_no_files",
            Notice::UploadRunning => "upload_running",
            Notice::BatchCleared => "batch_cleared",
        }
    }

    /// Unknown codes are ignored rather than echoed back.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.code() == code)
    }

    pub fn message(&self) -> &'static str {
        match self {
            Notice::SignedIn => "Successfully logged in",
            Notice::SignedOut => "You have been signed out",
            Notice::SessionExpired => "Your session has expired, please sign in again",
            Notice::AdminRequired => "Unauthorized: Admin access required",
            Notice::CategoryCreated => "Category created successfully",
            Notice::CategoryUpdated => "Category updated successfully",
            Notice::CategoryDeleted => "Category deleted successfully",
            Notice::CategorySaveFailed => "Failed to save category",
            Notice::CategoryDeleteFailed => "Failed to delete category",
            Notice::CategoriesLoadFailed => "Failed to load categories",
            Notice::CategoryNotFound => "Category not found",
            Notice::TemplateCreated => "Template created successfully",
            Notice::TemplateUpdated => "Template updated successfully",
            Notice::TemplateDeleted => "Template deleted successfully",
            Notice::TemplateSaveFailed => "Failed to save template",
            Notice::TemplateDeleteFailed => "Failed to delete template",
            Notice::TemplatesLoadFailed => "Failed to load templates",
            Notice::TemplateNotFound => "Template not found",
            Notice::MediaLoadFailed => "Failed to load media",
            Notice::UploadStarted => "Upload started",
            Notice::UploadNoFiles => "Please select at least one file to upload",
            Notice::UploadRunning => "An upload is in progress",
            Notice::BatchCleared => "Staged files cleared",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::SessionExpired
                | Notice::AdminRequired
                | Notice::CategorySaveFailed
                | Notice::CategoryDeleteFailed
                | Notice::CategoriesLoadFailed
                | Notice::CategoryNotFound
                | Notice::TemplateSaveFailed
                | Notice::TemplateDeleteFailed
                | Notice::TemplatesLoadFailed
                | Notice::TemplateNotFound
                | Notice::MediaLoadFailed
                | Notice::UploadNoFiles
                | Notice::UploadRunning
        )
    }

    /// `path?notice=code`
    pub fn redirect_path(&self, path: &str) -> String {
        format!("{}?notice={}", path, self.code())
    }
}
