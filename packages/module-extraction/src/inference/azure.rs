//! Azure OpenAI implementation of [`StructuredModel`].
//!
//! # Example
//!
//! ```rust,ignore
//! use module_extraction::inference::AzureOpenAI;
//! use module_extraction::security::ModelCredentials;
//!
//! let creds = ModelCredentials::new(key, "https://my-resource.openai.azure.com/", "gpt-4o");
//! let model = AzureOpenAI::new(creds)?;
//! ```

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ModelRequest, StructuredModel};
use crate::error::{InferenceError, InferenceResult};
use crate::security::ModelCredentials;

/// Chat-completions client for one Azure OpenAI deployment.
#[derive(Clone)]
pub struct AzureOpenAI {
    client: Client,
    credentials: ModelCredentials,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'static str,
    strict: bool,
    schema: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl AzureOpenAI {
    pub fn new(credentials: ModelCredentials) -> InferenceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| InferenceError::Provider(e.to_string()))?;
        Ok(Self { client, credentials })
    }

    /// Chat completions URL for the configured deployment.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.credentials.endpoint.trim_end_matches('/'),
            self.credentials.deployment,
            self.credentials.api_version
        )
    }

    /// Map a failed response to an error, separating quota failures.
    fn classify(status: StatusCode, body: &str) -> InferenceError {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().and_then(|e| e.error);
        let code = parsed
            .as_ref()
            .and_then(|e| e.code.clone())
            .unwrap_or_default()
            .to_lowercase();
        let message = parsed
            .and_then(|e| e.message)
            .unwrap_or_else(|| body.chars().take(300).collect());

        let quota = status == StatusCode::TOO_MANY_REQUESTS
            || code.contains("insufficient_quota")
            || code.contains("rate_limit")
            || code == "429";

        if quota {
            InferenceError::QuotaExceeded(format!("{}: {}", status, message))
        } else {
            InferenceError::Provider(format!("{}: {}", status, message))
        }
    }
}

#[async_trait]
impl StructuredModel for AzureOpenAI {
    async fn generate(&self, request: &ModelRequest) -> InferenceResult<String> {
        let body = ChatRequest {
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "documentation_modules",
                    strict: true,
                    schema: &request.schema,
                },
            },
        };

        let response = self
            .client
            .post(self.endpoint_url())
            .header("api-key", self.credentials.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::classify(status, &text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Provider(format!("invalid completion body: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| InferenceError::Parse("no content in completion".into()))?;

        debug!(deployment = %self.credentials.deployment, chars = content.len(), "Completion received");
        Ok(content)
    }

    fn name(&self) -> &str {
        "azure_openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ModelRequest {
        ModelRequest {
            system: "system".into(),
            user: "user".into(),
            schema: json!({"type": "object"}),
            temperature: 0.1,
            max_tokens: 2000,
        }
    }

    fn model(server: &MockServer) -> AzureOpenAI {
        AzureOpenAI::new(ModelCredentials::new("azure-key", server.uri(), "gpt-4o")).unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4o/chat/completions"))
            .and(query_param("api-version", "2024-02-15-preview"))
            .and(header("api-key", "azure-key"))
            .and(body_partial_json(json!({
                "max_tokens": 2000,
                "response_format": {"type": "json_schema", "json_schema": {"strict": true}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"modules\": []}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let content = model(&server).generate(&request()).await.unwrap();
        assert_eq!(content, "{\"modules\": []}");
    }

    #[tokio::test]
    async fn test_429_is_quota() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"code": "429", "message": "Rate limit is exceeded."}
            })))
            .mount(&server)
            .await;

        let err = model(&server).generate(&request()).await.unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn test_insufficient_quota_code_is_quota() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": "insufficient_quota", "message": "Quota exhausted"}
            })))
            .mount(&server)
            .await;

        let err = model(&server).generate(&request()).await.unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn test_server_error_is_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream failure"))
            .mount(&server)
            .await;

        let err = model(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Provider(ref m) if m.contains("upstream failure")));
    }

    #[test]
    fn test_endpoint_url() {
        let model = AzureOpenAI::new(ModelCredentials::new("k", "https://r.openai.azure.com/", "dep")).unwrap();
        assert_eq!(
            model.endpoint_url(),
            "https://r.openai.azure.com/openai/deployments/dep/chat/completions?api-version=2024-02-15-preview"
        );
    }
}
