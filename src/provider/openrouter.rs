// src/provider/openrouter.rs — OpenRouter chat-completions provider
//
// OpenRouter speaks the OpenAI chat-completions protocol; the only additions
// are the attribution headers (HTTP-Referer, X-Title).

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelProvider, Role, TokenUsage};
use crate::infra::config::ModelsConfig;
use crate::infra::errors::OptimizerError;

const PROVIDER_ID: &str = "openrouter";

pub struct OpenRouterProvider {
    api_key: String,
    base_url: String,
    referer: String,
    title: String,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(api_key: String, config: &ModelsConfig) -> Self {
        Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            referer: config.referer.clone(),
            title: config.title.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> OptimizerError {
        OptimizerError::Provider {
            provider: PROVIDER_ID.into(),
            message: message.into(),
        }
    }
}

/// Build the OpenAI-style request body.
pub(crate) fn request_body(request: &ChatRequest) -> serde_json::Value {
    let mut messages = Vec::new();
    if let Some(system) = &request.system {
        messages.push(serde_json::json!({
            "role": Role::System.as_str(),
            "content": system,
        }));
    }
    for m in &request.messages {
        messages.push(serde_json::json!({
            "role": m.role.as_str(),
            "content": m.content,
        }));
    }

    let mut body = serde_json::json!({
        "model": request.model,
        "messages": messages,
    });
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    if let Some(temp) = request.temperature {
        body["temperature"] = serde_json::json!(temp);
    }
    body
}

/// Extract content and usage from a chat-completions response.
/// A missing or null `content` yields an empty response, not an error.
pub(crate) fn parse_response(resp: &serde_json::Value) -> ChatResponse {
    let content = resp["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    let usage = TokenUsage {
        input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    };

    ChatResponse { content, usage }
}

#[async_trait]
impl ModelProvider for OpenRouterProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, OptimizerError> {
        let body = request_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(self.error(format!("HTTP {}: {}", status, error_body)));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.error(format!("Failed to parse response: {}", e)))?;

        let parsed = parse_response(&resp);
        tracing::debug!(
            model = %request.model,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "chat completion received"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Message;

    #[test]
    fn test_request_body_includes_system_first() {
        let request = ChatRequest {
            model: "openai/gpt-5-chat".into(),
            messages: vec![Message::user("improve it")],
            max_tokens: Some(2000),
            temperature: Some(0.7),
            system: Some("expert".into()),
        };
        let body = request_body(&request);
        assert_eq!(body["model"], "openai/gpt-5-chat");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "expert");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["max_tokens"], 2000);
        assert!(body["temperature"].as_f64().is_some());
    }

    #[test]
    fn test_request_body_omits_unset_options() {
        let request = ChatRequest {
            model: "m".into(),
            messages: vec![Message::user("hi")],
            ..Default::default()
        };
        let body = request_body(&request);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_parse_response_content_and_usage() {
        let resp = serde_json::json!({
            "choices": [{"message": {"content": "### Suggestion 1: smooth"}}],
            "usage": {"prompt_tokens": 812, "completion_tokens": 420}
        });
        let parsed = parse_response(&resp);
        assert_eq!(parsed.content, "### Suggestion 1: smooth");
        assert_eq!(parsed.usage.total(), 1232);
    }

    #[test]
    fn test_parse_response_null_content_is_empty() {
        let resp = serde_json::json!({"choices": [{"message": {"content": null}}]});
        assert!(parse_response(&resp).is_empty());
        assert!(parse_response(&serde_json::json!({})).is_empty());
    }
}
