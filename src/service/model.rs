use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;

use crate::errors::ModelError;
use crate::schema::{Domain, OperationSchema};

/// Everything the model needs to pick one operation: the reference
/// instant, the domain's schemas in registry order, the utterance, and
/// (for update-capable requests) the rendered snapshot text.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub reference: NaiveDateTime,
    pub domain: Domain,
    pub utterance: String,
    pub schemas: Vec<OperationSchema>,
    pub snapshot_text: Option<String>,
}

/// The model's choice: one registered operation name plus its raw,
/// untrusted argument payload.
#[derive(Debug, Clone)]
pub struct ModelSelection {
    pub name: String,
    pub arguments: Value,
}

/// Narrow boundary to the chat-completion service. Production uses the
/// OpenAI client; tests swap in a deterministic fake. `Ok(None)` means
/// the model declined to select any operation.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn select_operation(
        &self,
        request: &ModelRequest,
    ) -> Result<Option<ModelSelection>, ModelError>;
}
