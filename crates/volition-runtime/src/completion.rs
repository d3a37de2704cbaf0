//! The completion-capability boundary.
//!
//! The decision core treats the large language model as an external,
//! fallible oracle reached through [`CompletionBackend`].  The bundled
//! implementation, [`OpenAiCompatClient`], talks to any server exposing an
//! OpenAI-compatible `/v1/chat/completions` endpoint, such as
//! [Ollama](https://ollama.com) (`http://localhost:11434`), and injects the
//! [`DecisionReply`] JSON Schema via `response_format` so the model is forced
//! toward strictly typed output.
//!
//! No timeout is imposed here; configure one on the underlying HTTP client
//! if the deployment needs it.  Any transport failure surfaces as
//! [`CompletionError`] and is absorbed by the Decision Synthesizer.

use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Reply contract
// ─────────────────────────────────────────────────────────────────────────────

/// Output rules automatically appended to every system-role message, so the
/// model always receives the reply contract regardless of how the caller
/// builds the conversation.
pub const DECISION_CONTRACT: &str = "\
## Reply contract
- Reply with ONE JSON object and nothing else.
- The object must have: action, parameters, reasoning, confidence, priority, related_roles, related_goals.
- `action` must be chosen from the available actions listed above.
- `confidence` is a number between 0 and 1; `priority` is 1-10 or a level name.
- Do not invent actions; when unsure, pick `respond`.";

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from a completion-capability call.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// The HTTP request to the completion server failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The response from the completion server had an unexpected shape.
    #[error("Unexpected response format: {0}")]
    BadResponse(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Message types (OpenAI-compatible)
// ─────────────────────────────────────────────────────────────────────────────

/// The role of a participant in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Reply shape
// ─────────────────────────────────────────────────────────────────────────────

/// The shape every completion reply must parse into.
///
/// Only `action` is strictly required; `priority` and `confidence` are
/// accepted as loose JSON values because models deliver them as integers,
/// floats, level names, or numeric strings, and the Decision Synthesizer
/// normalizes them afterwards.  Anything that fails to parse into this
/// structure takes the parse-failure path instead.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DecisionReply {
    pub action: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub confidence: Option<Value>,
    #[serde(default)]
    pub priority: Option<Value>,
    #[serde(default)]
    pub related_roles: Vec<String>,
    #[serde(default)]
    pub related_goals: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// CompletionBackend
// ─────────────────────────────────────────────────────────────────────────────

/// The external completion capability: send one conversation, receive the
/// assistant's raw reply text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal request / response shapes
// ─────────────────────────────────────────────────────────────────────────────

/// `response_format` field that enforces structured JSON Schema output.
#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: Value,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAiCompatClient
// ─────────────────────────────────────────────────────────────────────────────

/// Async client for an OpenAI-compatible chat-completions endpoint.
///
/// Construct once and reuse across synthesis cycles.
pub struct OpenAiCompatClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a client pointing at `base_url` (e.g. `"http://localhost:11434"`)
    /// using `model` (e.g. `"llama3"`).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

/// Append [`DECISION_CONTRACT`] to every system message, prepending a fresh
/// system message when the conversation has none.
pub(crate) fn with_contract(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut augmented: Vec<ChatMessage> = messages
        .iter()
        .map(|m| {
            if m.role == Role::System {
                ChatMessage {
                    role: Role::System,
                    content: format!("{}\n\n{}", m.content, DECISION_CONTRACT),
                }
            } else {
                m.clone()
            }
        })
        .collect();

    if !augmented.iter().any(|m| m.role == Role::System) {
        augmented.insert(
            0,
            ChatMessage {
                role: Role::System,
                content: DECISION_CONTRACT.to_string(),
            },
        );
    }
    augmented
}

#[async_trait]
impl CompletionBackend for OpenAiCompatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        let augmented = with_contract(messages);

        let url = format!("{}/v1/chat/completions", self.base_url);
        let schema =
            serde_json::to_value(schema_for!(DecisionReply)).unwrap_or(Value::Null);
        let body = ChatRequest {
            model: &self.model,
            messages: &augmented,
            stream: false,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: schema,
            },
        };

        let response: ChatResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CompletionError::BadResponse("empty choices array".into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_message_serializes_role_lowercase() {
        let msg = ChatMessage {
            role: Role::System,
            content: "hello".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"system\""));
    }

    #[test]
    fn contract_is_appended_to_existing_system_message() {
        let messages = vec![ChatMessage {
            role: Role::System,
            content: "You are the decision core.".into(),
        }];
        let augmented = with_contract(&messages);
        let sys = augmented.iter().find(|m| m.role == Role::System).unwrap();
        assert!(sys.content.contains("You are the decision core."));
        assert!(sys.content.contains("Reply contract"));
    }

    #[test]
    fn contract_is_prepended_when_no_system_message() {
        let messages = vec![ChatMessage {
            role: Role::User,
            content: "What next?".into(),
        }];
        let augmented = with_contract(&messages);
        assert_eq!(augmented.len(), 2);
        assert_eq!(augmented[0].role, Role::System);
        assert!(augmented[0].content.contains("Reply contract"));
    }

    #[test]
    fn reply_parses_with_only_action() {
        let reply: DecisionReply = serde_json::from_str(r#"{"action": "respond"}"#).unwrap();
        assert_eq!(reply.action, "respond");
        assert!(reply.parameters.is_empty());
        assert!(reply.priority.is_none());
        assert!(reply.related_roles.is_empty());
    }

    #[test]
    fn reply_without_action_fails_to_parse() {
        let result: Result<DecisionReply, _> =
            serde_json::from_str(r#"{"reasoning": "no action here"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn reply_accepts_loose_priority_and_confidence() {
        let reply: DecisionReply = serde_json::from_str(
            r#"{"action": "respond", "priority": "high", "confidence": "0.9"}"#,
        )
        .unwrap();
        assert_eq!(reply.priority, Some(json!("high")));
        assert_eq!(reply.confidence, Some(json!("0.9")));
    }

    #[test]
    fn reply_schema_names_every_contract_field() {
        let schema = serde_json::to_value(schema_for!(DecisionReply)).unwrap();
        let schema_str = schema.to_string();
        for field in [
            "action",
            "parameters",
            "reasoning",
            "confidence",
            "priority",
            "related_roles",
            "related_goals",
        ] {
            assert!(schema_str.contains(field), "schema missing field: {field}");
        }
    }

    #[test]
    fn client_constructs_without_panic() {
        let _client = OpenAiCompatClient::new("http://localhost:11434", "llama3");
    }
}
