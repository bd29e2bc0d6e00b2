use crate::analysis::error::{AnalysisError, Result};
use crate::config::Config;
use crate::models::{
    Content, GeminiTool, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    GoogleErrorEnvelope, GoogleSearch, Part,
};
use reqwest::StatusCode;
use tracing::debug;

/// Thin client for the Gemini `generateContent` endpoint with Google Search
/// grounding switched on.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_request(&self, system_instruction: &str, user_text: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(user_text.to_string()),
                }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(system_instruction.to_string()),
                }],
            },
            tools: vec![GeminiTool {
                google_search: GoogleSearch::default(),
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }

    /// Sends one request. Exactly one HTTP call is made; failures are not
    /// retried.
    pub async fn generate(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let url = format!("{}/{}:generateContent", self.api_base, self.model);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!("Failed to read error body for {}: {}", status, e);
                    String::new()
                }
            };
            return Err(AnalysisError::Service {
                status: Some(status.as_u16()),
                message: service_error_message(status, &body),
            });
        }

        Ok(response.json().await?)
    }
}

/// Google's own error message when the body is its JSON envelope, otherwise a
/// short status line. Bodies from proxies are never shown to users.
fn service_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<GoogleErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.trim().is_empty() => envelope.error.message,
        _ => {
            debug!("Unrecognised error body for {}: {}", status, body);
            format!(
                "The analysis service returned HTTP {}{}.",
                status.as_u16(),
                status
                    .canonical_reason()
                    .map(|reason| format!(" ({})", reason))
                    .unwrap_or_default()
            )
        }
    }
}
