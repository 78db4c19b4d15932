use std::sync::Arc;
use tracing::info;

use super::api_client::{segment, ApiClient};
use crate::auth::SessionAuthority;
use crate::error::ServiceError;
use crate::models::{Category, CategoryInput};

/// Categories of the gallery. Mutations are reserved to admins.
pub struct CategoryService {
    api: ApiClient,
    session: Arc<dyn SessionAuthority>,
}

impl CategoryService {
    pub fn new(api: ApiClient, session: Arc<dyn SessionAuthority>) -> Self {
        Self { api, session }
    }

    pub async fn list(&self) -> Result<Vec<Category>, ServiceError> {
        let token = self.session.bearer_token()?;
        self.api.get(&token, "/admin/categories").await
    }

    pub async fn get(&self, id: &str) -> Result<Category, ServiceError> {
        let token = self.session.bearer_token()?;
        self.api
            .get(&token, &format!("/admin/categories/{}", segment(id)))
            .await
    }

    pub async fn create(&self, input: &CategoryInput) -> Result<Category, ServiceError> {
        let user = self.session.require_admin()?;
        input.validate()?;

        let token = self.session.bearer_token()?;
        let category: Category = self.api.post(&token, "/admin/categories", input).await?;

        info!(email = %user.email, category = %category.id, "Category created");
        Ok(category)
    }

    pub async fn update(&self, id: &str, input: &CategoryInput) -> Result<Category, ServiceError> {
        let user = self.session.require_admin()?;
        input.validate()?;

        let token = self.session.bearer_token()?;
        let category: Category = self
            .api
            .put(&token, &format!("/admin/categories/{}", segment(id)), input)
            .await?;

        info!(email = %user.email, category = %id, "Category updated");
        Ok(category)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let user = self.session.require_admin()?;

        let token = self.session.bearer_token()?;
        self.api
            .delete(&token, &format!("/admin/categories/{}", segment(id)))
            .await?;

        info!(email = %user.email, category = %id, "Category deleted");
        Ok(())
    }
}
