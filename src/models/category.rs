use serde::{Deserialize, Serialize};

use super::Template;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

impl Category {
    /// Name of the linked template. A dangling reference is tolerated.
    pub fn template_name<'a>(&self, templates: &'a [Template]) -> Option<&'a str> {
        let id = self.template_id.as_deref()?;
        Some(
            templates
                .iter()
                .find(|t| t.id == id)
                .map(|t| t.name.as_str())
                .unwrap_or("Unknown Template"),
        )
    }
}

/// Payload for creating or updating a category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

impl From<&Category> for CategoryInput {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            description: category.description.clone(),
            template_id: category.template_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldType, TemplateField};

    fn template(id: &str, name: &str) -> Template {
        Template {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            fields: vec![TemplateField {
                name: "camera".to_string(),
                label: "Camera".to_string(),
                field_type: FieldType::String,
                required: false,
            }],
        }
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let input = CategoryInput {
            name: "Landscapes".to_string(),
            description: None,
            template_id: Some("tpl-1".to_string()),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["templateId"], "tpl-1");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_template_name_resolution() {
        let templates = vec![template("tpl-1", "Photo EXIF")];
        let mut category = Category {
            id: "c1".to_string(),
            name: "Landscapes".to_string(),
            description: None,
            template_id: Some("tpl-1".to_string()),
        };
        assert_eq!(category.template_name(&templates), Some("Photo EXIF"));

        category.template_id = Some("gone".to_string());
        assert_eq!(category.template_name(&templates), Some("Unknown Template"));

        category.template_id = None;
        assert_eq!(category.template_name(&templates), None);
    }
}
