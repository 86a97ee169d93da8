use async_trait::async_trait;

use crate::clients::openai_client;
use crate::errors::ModelError;
use crate::service::model::{ModelClient, ModelRequest, ModelSelection};

/// Production `ModelClient` backed by the OpenAI chat-completions API.
pub struct OpenAIService {
    api_key: String,
}

impl OpenAIService {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl ModelClient for OpenAIService {
    async fn select_operation(
        &self,
        request: &ModelRequest,
    ) -> Result<Option<ModelSelection>, ModelError> {
        openai_client::select_operation(&self.api_key, request).await
    }
}
