use async_trait::async_trait;
use scaleburn_core::{ChatMessage, ClientConfig, RequestOutcome, Result, ScaleBurnError};
use serde::{Deserialize, Serialize};

use crate::client::{Completion, CompletionClient};

/// Client for an OpenAI-compatible `/v1` endpoint (vLLM, TGI, llama.cpp server...).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ScaleBurnError::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.endpoint_url(),
            model: config.model_name.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models", self.base_url);
        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ScaleBurnError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ScaleBurnError::Server(format!(
                "Failed to list models: {}",
                resp.status()
            )));
        }

        let models: ModelsResponse = resp
            .json()
            .await
            .map_err(|e| ScaleBurnError::Server(e.to_string()))?;

        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
            stream: false,
        };

        let resp = self
            .authorize(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| ScaleBurnError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ScaleBurnError::Server(format!(
                "Chat failed: {} - {}",
                status, body
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ScaleBurnError::Http(e.to_string()))?;

        let chat_resp: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            ScaleBurnError::Server(format!(
                "Failed to parse response: {} - Body: {}",
                e,
                truncate(&body, 500)
            ))
        })?;

        let usage = chat_resp
            .usage
            .ok_or_else(|| ScaleBurnError::Server("Response has no usage block".to_string()))?;

        let content = chat_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(Completion {
            content,
            usage: RequestOutcome::new(usage.prompt_tokens, usage.completion_tokens),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion> {
        self.chat(messages, temperature, max_tokens).await
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(prompt: u64, completion: u64) -> serde_json::Value {
        json!({
            "id": "cmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "print('Hello World')"},
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": prompt,
                "completion_tokens": completion,
                "total_tokens": prompt + completion
            }
        })
    }

    #[tokio::test]
    async fn test_chat_parses_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "temperature": 0.2,
                "max_tokens": 1,
                "messages": [{"role": "user", "content": "?"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(42, 1)))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&format!("{}/v1/", server.uri()), "test-model");
        let completion = client
            .complete(&[ChatMessage::user("?")], 0.2, 1)
            .await
            .unwrap();

        assert_eq!(completion.usage, RequestOutcome::new(42, 1));
        assert_eq!(completion.content, "print('Hello World')");
    }

    #[tokio::test]
    async fn test_chat_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(1, 1)))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            OpenAiClient::new(&format!("{}/v1", server.uri()), "m").with_api_key("sk-test");
        assert!(client.complete(&[ChatMessage::user("hi")], 1.0, 8).await.is_ok());
    }

    #[tokio::test]
    async fn test_chat_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&format!("{}/v1", server.uri()), "m");
        let err = client
            .complete(&[ChatMessage::user("hi")], 1.0, 8)
            .await
            .unwrap_err();

        assert!(matches!(err, ScaleBurnError::Server(_)));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_chat_without_usage_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&format!("{}/v1", server.uri()), "m");
        let err = client
            .complete(&[ChatMessage::user("hi")], 1.0, 8)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("usage"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let client = OpenAiClient::new("http://127.0.0.1:1/v1", "m");
        let err = client
            .complete(&[ChatMessage::user("hi")], 1.0, 8)
            .await
            .unwrap_err();
        assert!(matches!(err, ScaleBurnError::Http(_)));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [
                    {"id": "llama-3-8b", "object": "model"},
                    {"id": "qwen2", "object": "model"}
                ]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&format!("{}/v1", server.uri()), "m");
        assert_eq!(client.list_models().await.unwrap(), vec!["llama-3-8b", "qwen2"]);
    }

    #[test]
    fn test_from_config() {
        let config = ClientConfig {
            host: "gpu-box".to_string(),
            port: 8000,
            api_key: Some("k".to_string()),
            model_name: "llama".to_string(),
            info: String::new(),
            timeout_secs: 30,
        };
        let client = OpenAiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://gpu-box:8000/v1");
        assert_eq!(client.model(), "llama");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
