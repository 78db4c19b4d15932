pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod forms;
pub mod models;
pub mod services;
pub mod ui;
pub mod upload;

#[cfg(test)]
mod testing;

use axum::{middleware, Router};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tower_http::trace::TraceLayer;
use tracing::info;

use auth::{AuthGateway, AuthSession, IdentityProvider};
use config::Config;
use services::{ApiClient, CategoryService, MediaService, TemplateService};
use upload::Uploads;

pub struct AppState {
    pub config: Config,
    pub gateway: AuthGateway,
    pub api: ApiClient,
    pub uploads: Uploads,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn IdentityProvider>) -> Self {
        let gateway = AuthGateway::new(provider, &config.identity);
        let api = ApiClient::new(&config.api.endpoint);
        let uploads = Uploads::new(&config.upload);
        Self {
            config,
            gateway,
            api,
            uploads,
        }
    }

    pub fn categories(&self, session: &AuthSession) -> CategoryService {
        CategoryService::new(self.api.clone(), Arc::new(session.clone()))
    }

    pub fn templates(&self, session: &AuthSession) -> TemplateService {
        TemplateService::new(self.api.clone(), Arc::new(session.clone()))
    }

    pub fn media(&self, session: &AuthSession) -> MediaService {
        MediaService::new(self.api.clone(), Arc::new(session.clone()))
    }

    /// Drop expired sessions and every staged batch whose session is gone.
    /// Returns the number of sessions evicted.
    pub fn sweep_sessions(&self) -> usize {
        let expired = self.gateway.evict_expired();
        let gateway = &self.gateway;
        let batches = self.uploads.retain_sessions(|id| gateway.is_active(id));
        if !expired.is_empty() || batches > 0 {
            info!(sessions = expired.len(), batches, "Swept stale sessions");
        }
        expired.len()
    }
}

/// Spawn the background task that periodically sweeps stale sessions.
pub fn spawn_session_sweeper(state: Arc<AppState>) {
    let every = Duration::from_secs(state.config.session.sweep_interval_secs);
    info!(interval_secs = every.as_secs(), "Starting session sweeper");

    tokio::spawn(async move {
        let mut tick = interval(every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            state.sweep_sessions();
        }
    });
}

/// The console router with the admin route guard and request tracing.
pub fn create_router(state: Arc<AppState>) -> Router {
    ui::create_router(&state)
        .layer(middleware::from_fn_with_state(state.clone(), ui::guard::route_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
