use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::agent::DispatchContext;
use crate::config::Config;
use crate::llm_client::ChatModel;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    /// Model backend for the hiring-manager agent. `LlmClient` in production.
    pub llm: Arc<dyn ChatModel>,
    pub config: Config,
}

impl AppState {
    pub fn dispatch_context(&self) -> DispatchContext<'_> {
        DispatchContext {
            db: &self.db,
            model: self.llm.as_ref(),
            timeout: Duration::from_secs(self.config.agent_timeout_secs),
        }
    }
}
