use async_trait::async_trait;
use serde_json::json;

use loomflow_types::{FlowError, Result};

use crate::generator::TextGenerator;

const PROVIDER: &str = "generative-language";

// ---------------------------------------------------------------------------
// GenerativeLanguageClient
// ---------------------------------------------------------------------------

/// HTTP client for the generative-language `generateContent` endpoint.
#[derive(Debug)]
pub struct GenerativeLanguageClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl GenerativeLanguageClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    /// Override the endpoint base, e.g. to point at a local test server.
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Build a client from `GEMINI_API_KEY` (fallback `GOOGLE_API_KEY`).
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .map_err(|_| FlowError::ExternalService {
                provider: PROVIDER.into(),
                message: "no GEMINI_API_KEY or GOOGLE_API_KEY in environment".into(),
            })?;
        Ok(Self::new(key))
    }

    fn build_request_body(temperature: f64, prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": temperature },
        })
    }

    fn parse_response(json: serde_json::Value) -> Result<String> {
        let candidate = json["candidates"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| FlowError::ExternalService {
                provider: PROVIDER.into(),
                message: "response carried no candidates".into(),
            })?;

        let parts = candidate["content"]["parts"]
            .as_array()
            .ok_or_else(|| FlowError::ExternalService {
                provider: PROVIDER.into(),
                message: "candidate carried no content parts".into(),
            })?;

        let text: String = parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(FlowError::ExternalService {
                provider: PROVIDER.into(),
                message: "candidate contained no text".into(),
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GenerativeLanguageClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, model: &str, temperature: f64, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = Self::build_request_body(temperature, prompt);

        tracing::debug!(model = %model, temperature, "generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| FlowError::ExternalService {
                provider: PROVIDER.into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(FlowError::ExternalService {
                provider: PROVIDER.into(),
                message: format!("HTTP {}: {}", status.as_u16(), detail),
            });
        }

        let payload: serde_json::Value =
            response.json().await.map_err(|e| FlowError::ExternalService {
                provider: PROVIDER.into(),
                message: e.to_string(),
            })?;

        Self::parse_response(payload)
    }
}
