//! Console forms and the validation rules attached to API payloads.
//!
//! The `*Form` types mirror what the browser posts; `into_*` turns them into
//! API payloads, validating on the way. Payload `validate` methods are also
//! called by the resource services so nothing invalid reaches the network.

pub mod validation;

use serde::Deserialize;
use std::collections::HashSet;

use crate::error::{ValidationErrorBuilder, ValidationErrors};
use crate::models::{CategoryInput, FieldType, TemplateField, TemplateInput, UploadMetadata};
use validation::{
    non_blank, validate_description, validate_email, validate_name, validate_password,
    validate_required, validate_title,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrorBuilder::new();
        errors.check("email", validate_email(&self.email));
        errors.check("password", validate_password(&self.password));
        errors.finish()
    }
}

impl CategoryInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrorBuilder::new();
        errors.check("name", validate_name(&self.name, "Category name"));
        errors.check("description", validate_description(&self.description));
        if let Some(template_id) = &self.template_id {
            errors.check(
                "template_id",
                validate_required(template_id, "Template reference must not be blank"),
            );
        }
        errors.finish()
    }
}

impl TemplateField {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrorBuilder::new();
        errors.check("name", validate_name(&self.name, "Field name"));
        errors.check("label", validate_name(&self.label, "Label"));
        errors.finish()
    }
}

impl TemplateInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrorBuilder::new();
        errors.check("name", validate_name(&self.name, "Template name"));
        errors.check("description", validate_description(&self.description));

        if self.fields.is_empty() {
            errors.add("fields", "At least one field is required");
        }

        let mut seen = HashSet::new();
        for (index, field) in self.fields.iter().enumerate() {
            if let Err(field_errors) = field.validate() {
                errors.merge_prefixed(&format!("fields.{}.", index), field_errors);
            }
            if !seen.insert(field.name.trim().to_lowercase()) {
                errors.add(format!("fields.{}.name", index), "Field names must be unique");
            }
        }

        errors.finish()
    }
}

impl UploadMetadata {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrorBuilder::new();
        errors.check(
            "category_id",
            validate_required(&self.category_id, "Category is required"),
        );
        errors.check("title", validate_title(&self.title));
        errors.check("description", validate_description(&self.description));
        errors.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
}

impl CategoryForm {
    pub fn into_input(self) -> Result<CategoryInput, ValidationErrors> {
        let input = CategoryInput {
            name: self.name.trim().to_string(),
            description: non_blank(self.description),
            template_id: non_blank(self.template_id),
        };
        input.validate()?;
        Ok(input)
    }
}

/// One row of the repeatable field list, as typed by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRow {
    pub name: String,
    pub label: String,
    pub field_type: String,
    pub required: bool,
}

impl FieldRow {
    pub fn blank() -> Self {
        Self {
            field_type: FieldType::default().as_str().to_string(),
            ..Self::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.label.trim().is_empty()
    }

    pub fn is_type(&self, field_type: &FieldType) -> bool {
        self.field_type == field_type.as_str()
    }
}

impl From<&TemplateField> for FieldRow {
    fn from(field: &TemplateField) -> Self {
        Self {
            name: field.name.clone(),
            label: field.label.clone(),
            field_type: field.field_type.as_str().to_string(),
            required: field.required,
        }
    }
}

/// Template form; the field list arrives as parallel repeated keys
/// (`field_name=a&field_name=b&...`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub field_name: Vec<String>,
    #[serde(default)]
    pub field_label: Vec<String>,
    #[serde(default)]
    pub field_type: Vec<String>,
    #[serde(default)]
    pub field_required: Vec<String>,
    /// Set by the "Add Field" button
    #[serde(default)]
    pub add_row: Option<String>,
    /// Index of the row whose "Remove" button was pressed
    #[serde(default)]
    pub remove_row: Option<usize>,
}

impl TemplateForm {
    /// Field rows in submission order, blank rows dropped.
    pub fn rows(&self) -> Vec<FieldRow> {
        self.all_rows()
            .into_iter()
            .filter(|row| !row.is_blank())
            .collect()
    }

    fn all_rows(&self) -> Vec<FieldRow> {
        let count = self
            .field_name
            .len()
            .max(self.field_label.len())
            .max(self.field_type.len());

        (0..count)
            .map(|i| FieldRow {
                name: self.field_name.get(i).cloned().unwrap_or_default(),
                label: self.field_label.get(i).cloned().unwrap_or_default(),
                field_type: self
                    .field_type
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| FieldType::default().as_str().to_string()),
                required: self
                    .field_required
                    .get(i)
                    .map(|v| matches!(v.as_str(), "true" | "on" | "yes"))
                    .unwrap_or(false),
            })
            .collect()
    }

    /// Whether the submission only edits the row list and must not be saved
    pub fn is_row_edit(&self) -> bool {
        self.add_row.is_some() || self.remove_row.is_some()
    }

    /// Rows to show again after an add/remove click.
    pub fn edited_rows(&self) -> Vec<FieldRow> {
        let mut rows = self.all_rows();
        if let Some(index) = self.remove_row {
            if index < rows.len() {
                rows.remove(index);
            }
        }
        if self.add_row.is_some() || rows.is_empty() {
            rows.push(FieldRow::blank());
        }
        rows
    }

    pub fn into_input(self) -> Result<TemplateInput, ValidationErrors> {
        let mut errors = ValidationErrorBuilder::new();
        let mut fields = Vec::new();

        for (index, row) in self.rows().into_iter().enumerate() {
            let field_type = row.field_type.parse::<FieldType>().unwrap_or_else(|message| {
                errors.add(format!("fields.{}.type", index), message);
                FieldType::default()
            });
            fields.push(TemplateField {
                name: row.name.trim().to_string(),
                label: row.label.trim().to_string(),
                field_type,
                required: row.required,
            });
        }

        let input = TemplateInput {
            name: self.name.trim().to_string(),
            description: non_blank(self.description),
            fields,
        };

        if let Err(payload_errors) = input.validate() {
            errors.merge_prefixed("", payload_errors);
        }
        errors.finish()?;
        Ok(input)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadMetadataForm {
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl UploadMetadataForm {
    pub fn into_metadata(self) -> Result<UploadMetadata, ValidationErrors> {
        let metadata = UploadMetadata {
            category_id: self.category_id.trim().to_string(),
            title: self.title.trim().to_string(),
            description: non_blank(self.description),
        };
        metadata.validate()?;
        Ok(metadata)
    }
}
