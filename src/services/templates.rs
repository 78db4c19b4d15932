use std::sync::Arc;
use tracing::info;

use super::api_client::{segment, ApiClient};
use crate::auth::SessionAuthority;
use crate::error::ServiceError;
use crate::models::{Template, TemplateInput};

/// Metadata templates. Same access rules as categories.
pub struct TemplateService {
    api: ApiClient,
    session: Arc<dyn SessionAuthority>,
}

impl TemplateService {
    pub fn new(api: ApiClient, session: Arc<dyn SessionAuthority>) -> Self {
        Self { api, session }
    }

    pub async fn list(&self) -> Result<Vec<Template>, ServiceError> {
        let token = self.session.bearer_token()?;
        self.api.get(&token, "/admin/templates").await
    }

    pub async fn get(&self, id: &str) -> Result<Template, ServiceError> {
        let token = self.session.bearer_token()?;
        self.api
            .get(&token, &format!("/admin/templates/{}", segment(id)))
            .await
    }

    pub async fn create(&self, input: &TemplateInput) -> Result<Template, ServiceError> {
        let user = self.session.require_admin()?;
        input.validate()?;

        let token = self.session.bearer_token()?;
        let template: Template = self.api.post(&token, "/admin/templates", input).await?;

        info!(
            email = %user.email,
            template = %template.id,
            fields = input.fields.len(),
            "Template created"
        );
        Ok(template)
    }

    pub async fn update(&self, id: &str, input: &TemplateInput) -> Result<Template, ServiceError> {
        let user = self.session.require_admin()?;
        input.validate()?;

        let token = self.session.bearer_token()?;
        let template: Template = self
            .api
            .put(&token, &format!("/admin/templates/{}", segment(id)), input)
            .await?;

        info!(email = %user.email, template = %id, "Template updated");
        Ok(template)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let user = self.session.require_admin()?;

        let token = self.session.bearer_token()?;
        self.api
            .delete(&token, &format!("/admin/templates/{}", segment(id)))
            .await?;

        info!(email = %user.email, template = %id, "Template deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldType, TemplateField};
    use crate::testing::{admin, viewer, FakeApi};

    fn input(fields: Vec<TemplateField>) -> TemplateInput {
        TemplateInput {
            name: "Photo EXIF".to_string(),
            description: None,
            fields,
        }
    }

    fn field(name: &str, field_type: FieldType) -> TemplateField {
        TemplateField {
            name: name.to_string(),
            label: format!("{} label", name),
            field_type,
            required: true,
        }
    }

    #[tokio::test]
    async fn test_empty_fields_rejected_before_network() {
        let fake = FakeApi::start().await;
        let service = TemplateService::new(ApiClient::new(&fake.base_url), admin());

        let err = service.create(&input(Vec::new())).await.unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.first("fields"), Some("At least one field is required"));
        assert_eq!(fake.requests(), 0);
    }

    #[tokio::test]
    async fn test_non_admin_mutations_issue_no_requests() {
        let fake = FakeApi::start().await;
        let service = TemplateService::new(ApiClient::new(&fake.base_url), viewer());
        let payload = input(vec![field("camera", FieldType::String)]);

        assert!(service.create(&payload).await.unwrap_err().is_unauthorized());
        assert!(service.update("tpl-1", &payload).await.unwrap_err().is_unauthorized());
        assert!(service.delete("tpl-1").await.unwrap_err().is_unauthorized());
        assert_eq!(fake.requests(), 0);
    }

    #[tokio::test]
    async fn test_create_keeps_field_order_and_types() {
        let fake = FakeApi::start().await;
        let service = TemplateService::new(ApiClient::new(&fake.base_url), admin());

        let created = service
            .create(&input(vec![
                field("camera", FieldType::String),
                field("iso", FieldType::Number),
                field("taken_at", FieldType::Date),
            ]))
            .await
            .unwrap();

        let fetched = service.get(&created.id).await.unwrap();
        let names: Vec<_> = fetched.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["camera", "iso", "taken_at"]);
        assert_eq!(fetched.fields[1].field_type, FieldType::Number);
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let fake = FakeApi::start().await;
        let service = TemplateService::new(ApiClient::new(&fake.base_url), admin());
        let created = service
            .create(&input(vec![field("camera", FieldType::String)]))
            .await
            .unwrap();

        let updated = service
            .update(&created.id, &input(vec![field("flash", FieldType::Boolean)]))
            .await
            .unwrap();
        assert_eq!(updated.fields.len(), 1);
        assert_eq!(updated.fields[0].field_type, FieldType::Boolean);

        service.delete(&created.id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }
}
