use crate::ai::types::AiError;
use crate::ai::Message;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    auth_headers: header::HeaderMap,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OpenAICompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAICompletionResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str, endpoint: Option<&str>, model: Option<&str>) -> Result<Self, String> {
        let endpoint_url = endpoint.unwrap_or(DEFAULT_ENDPOINT).to_string();

        let mut auth_headers = header::HeaderMap::new();
        auth_headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        if !api_key.is_empty() {
            let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?;
            auth_headers.insert(header::AUTHORIZATION, auth_value);
        }

        let model = match model {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => DEFAULT_MODEL.to_string(),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            auth_headers,
            endpoint: endpoint_url,
            model,
        })
    }

    /// Chat completion in JSON mode at temperature 0. Returns the raw message content.
    pub async fn generate_json(&self, messages: Vec<Message>) -> Result<String, AiError> {
        let api_messages: Vec<OpenAIMessage> = messages
            .into_iter()
            .map(|m| OpenAIMessage {
                role: m.role.to_string(),
                content: m.content,
            })
            .collect();

        let request = OpenAICompletionRequest {
            model: self.model.clone(),
            messages: api_messages,
            temperature: 0.0,
            response_format: ResponseFormat { format_type: "json_object" },
        };

        log::info!(
            "[OPENAI] Sending request to {} with model {} ({} messages)",
            self.endpoint,
            self.model,
            request.messages.len()
        );
        log::debug!(
            "[OPENAI] Full request:\n{}",
            serde_json::to_string_pretty(&request).unwrap_or_default()
        );

        // Retry configuration for transient errors
        const MAX_RETRIES: u32 = 2;
        const BASE_DELAY_MS: u64 = 1000;

        let mut last_error: Option<(String, Option<u16>)> = None;
        let mut response_text: Option<String> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay_ms = BASE_DELAY_MS * (1 << (attempt - 1));
                log::warn!(
                    "[OPENAI] Retry attempt {}/{} after {}ms delay",
                    attempt,
                    MAX_RETRIES,
                    delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            let response = match self
                .client
                .post(&self.endpoint)
                .headers(self.auth_headers.clone())
                .json(&request)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    let msg = format!("OpenAI API request failed: {}", e);
                    if attempt < MAX_RETRIES {
                        log::warn!("[OPENAI] Request failed (attempt {}): {}, will retry", attempt + 1, msg);
                        last_error = Some((msg, None));
                        continue;
                    }
                    return Err(AiError::new(msg));
                }
            };

            let status = response.status();
            let status_code = status.as_u16();

            // 429 (rate limit), 502, 503, 504 (gateway errors)
            let is_retryable = matches!(status_code, 429 | 502 | 503 | 504);

            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();

                if is_retryable && attempt < MAX_RETRIES {
                    log::warn!(
                        "[OPENAI] Received retryable status {} (attempt {}), will retry",
                        status,
                        attempt + 1
                    );
                    last_error = Some((format!("HTTP {}: {}", status, error_text), Some(status_code)));
                    continue;
                }

                let error_msg = match serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                    Ok(error_response) => format!("OpenAI API error: {}", error_response.error.message),
                    Err(_) => {
                        let truncated: String = error_text.chars().take(200).collect();
                        format!("OpenAI API returned error status: {}, body: {}", status, truncated)
                    }
                };

                return Err(AiError::with_status(error_msg, status_code));
            }

            response_text = Some(
                response
                    .text()
                    .await
                    .map_err(|e| AiError::new(format!("Failed to read OpenAI response: {}", e)))?,
            );
            break;
        }

        let response_text = response_text.ok_or_else(|| {
            let (msg, code) = last_error.unwrap_or_else(|| ("Max retries exceeded".to_string(), None));
            match code {
                Some(c) => AiError::with_status(msg, c),
                None => AiError::new(msg),
            }
        })?;

        log::debug!("[OPENAI] Raw response:\n{}", response_text);

        let response_data: OpenAICompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| AiError::new(format!("Failed to parse OpenAI response: {}", e)))?;

        let choice = response_data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::new("OpenAI API returned no choices"))?;

        log::info!(
            "[OPENAI] Response - content_len: {}, finish_reason: {:?}",
            choice.message.content.as_ref().map(|c| c.len()).unwrap_or(0),
            choice.finish_reason
        );

        choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AiError::new("OpenAI API returned empty content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let client = OpenAIClient::new("sk-test", None, Some("")).unwrap();
        assert_eq!(client.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(client.model, DEFAULT_MODEL);
        assert!(client.auth_headers.contains_key(header::AUTHORIZATION));
    }

    #[test]
    fn test_request_uses_json_mode() {
        let request = OpenAICompletionRequest {
            model: "m".to_string(),
            messages: vec![],
            temperature: 0.0,
            response_format: ResponseFormat { format_type: "json_object" },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["temperature"], 0.0);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let client = OpenAIClient::new("sk-test", Some("http://127.0.0.1:9/v1/chat/completions"), None).unwrap();
        let result = client.generate_json(vec![Message::user("hi")]).await;
        assert!(result.is_err());
    }
}
