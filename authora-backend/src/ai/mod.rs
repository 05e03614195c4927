pub mod openai;
pub mod types;

pub use openai::OpenAIClient;
pub use types::AiError;

use crate::config::AiConfig;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        f.write_str(role)
    }
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: MessageRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

/// Mock AI client for tests: returns pre-configured responses from a queue
/// and records every request it receives.
#[derive(Clone, Default)]
pub struct MockAiClient {
    responses: Arc<Mutex<VecDeque<Result<String, AiError>>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockAiClient {
    pub fn new(responses: Vec<Result<String, AiError>>) -> Self {
        MockAiClient {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pop the next response; an exhausted queue behaves like an unreachable provider.
    fn next_response(&self, messages: Vec<Message>) -> Result<String, AiError> {
        self.requests.lock().unwrap().push(messages);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AiError::new("(mock exhausted)")))
    }

    /// Requests captured so far, oldest first
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

/// Language model client used by the intent parser
pub enum AiClient {
    OpenAI(OpenAIClient),
    Mock(MockAiClient),
}

impl AiClient {
    pub fn from_config(config: &AiConfig) -> Result<Self, String> {
        let client = OpenAIClient::new(&config.api_key, Some(&config.endpoint), Some(&config.model))?;
        Ok(AiClient::OpenAI(client))
    }

    /// Ask for a single JSON object answer at zero temperature
    pub async fn generate_json(&self, messages: Vec<Message>) -> Result<String, AiError> {
        match self {
            AiClient::OpenAI(client) => client.generate_json(messages).await,
            AiClient::Mock(client) => client.next_response(messages),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }

    #[tokio::test]
    async fn test_mock_records_and_drains() {
        let mock = MockAiClient::new(vec![Ok("{}".to_string())]);
        let client = AiClient::Mock(mock.clone());

        assert_eq!(client.generate_json(vec![Message::user("hi")]).await.unwrap(), "{}");
        assert!(client.generate_json(vec![]).await.is_err());
        assert_eq!(mock.requests().len(), 2);
        assert_eq!(mock.requests()[0][0].content, "hi");
    }
}
