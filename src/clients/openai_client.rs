use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ModelError;
use crate::service::model::{ModelRequest, ModelSelection};
use crate::service::temporal::format_canonical;

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct FunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct Tool {
    #[serde(rename = "type")]
    tool_type: String,
    function: FunctionDef,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    tools: Vec<Tool>,
    tool_choice: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    // The tools API returns arguments as a JSON-encoded string.
    arguments: String,
}

/// Asks the chat-completions tools API to pick exactly one of the
/// registered operations. The system message carries the reference
/// datetime (and the snapshot text when supplied), so the model resolves
/// relative dates against the caller's "now", never the wall clock.
pub async fn select_operation(
    api_key: &str,
    request: &ModelRequest,
) -> Result<Option<ModelSelection>, ModelError> {
    let mut system_message = format!(
        "Current datetime: {}",
        format_canonical(request.reference)
    );
    if let Some(snapshot) = &request.snapshot_text {
        system_message.push_str("\n\n");
        system_message.push_str(snapshot);
    }

    let tools = request
        .schemas
        .iter()
        .map(|schema| Tool {
            tool_type: "function".to_string(),
            function: FunctionDef {
                name: schema.name.to_string(),
                description: schema.description.to_string(),
                parameters: schema.parameters_json(),
            },
        })
        .collect();

    let body = OpenAIRequest {
        model: "gpt-4o-mini".to_string(),
        messages: vec![
            OpenAIMessage {
                role: "system".to_string(),
                content: system_message,
            },
            OpenAIMessage {
                role: "user".to_string(),
                content: request.utterance.clone(),
            },
        ],
        tools,
        tool_choice: "auto".to_string(),
        max_tokens: 1500,
        temperature: 0.2,
    };

    let client = reqwest::Client::new();
    let response = client
        .post("https://api.openai.com/v1/chat/completions")
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ModelError::Cancelled
            } else {
                ModelError::Request(e.to_string())
            }
        })?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ModelError::Request(e.to_string()))?;

    if !status.is_success() {
        return Err(ModelError::Request(format!(
            "request failed with status {}: {}",
            status, text
        )));
    }

    let parsed: OpenAIResponse = serde_json::from_str(&text)
        .map_err(|e| ModelError::Malformed(format!("{}; raw body: {}", e, text)))?;

    let Some(choice) = parsed.choices.first() else {
        return Ok(None);
    };
    let Some(call) = choice.message.tool_calls.first() else {
        return Ok(None);
    };

    let arguments: Value = serde_json::from_str(&call.function.arguments)
        .map_err(|e| ModelError::Malformed(format!("tool arguments: {}", e)))?;

    Ok(Some(ModelSelection {
        name: call.function.name.clone(),
        arguments,
    }))
}
