use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::input::InputPart;
use crate::prompt::GenerationRequest;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Gemini API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited by API. Retry after some time.")]
    RateLimited,

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GenerateError>;

#[derive(Debug, Clone)]
pub struct GenerationClientConfig {
    pub timeout_secs: u64,
}

impl Default for GenerationClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// What a syntactically successful generation call amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The model produced usable text
    Text(String),
    /// The model declined or returned nothing (blocked prompt, safety stop,
    /// empty candidates)
    Refusal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationClient {
    client: Client,
    api_key: String,
    config: GenerationClientConfig,
}

impl GenerationClient {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_config(api_key, GenerationClientConfig::default())
    }

    pub fn with_config(api_key: String, config: GenerationClientConfig) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(GenerateError::NetworkError)?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    /// Shared HTTP client, for other API clients that reuse the pool
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    fn build_payload(request: &GenerationRequest) -> Value {
        // Parts array: instruction first, content parts after in caller order
        let mut parts = vec![json!({"text": request.instruction})];

        for part in &request.parts {
            match part {
                InputPart::Text(text) => parts.push(json!({"text": text})),
                InputPart::Image(image) => parts.push(json!({
                    "inline_data": {
                        "mime_type": image.mime_type,
                        "data": image.base64_data()
                    }
                })),
            }
        }

        json!({
            "contents": [{
                "parts": parts
            }]
        })
    }

    /// Issue the generation call. One attempt per invocation, no retry.
    pub async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_URL, model, self.api_key
        );

        let payload = Self::build_payload(request);

        debug!(
            "Sending generation request to Gemini API (model: {}, {} content parts)",
            model,
            request.parts.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerateError::Timeout(self.config.timeout_secs)
                } else {
                    GenerateError::NetworkError(e)
                }
            })?;

        let status = response.status();
        debug!("Received response with status: {}", status);

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerateError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerateError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await?;
        let data: GenerateContentResponse = serde_json::from_str(&body)?;

        let outcome = classify_response(data);
        if let GenerationOutcome::Text(text) = &outcome {
            info!("Generation produced {} characters", text.chars().count());
        }

        Ok(outcome)
    }
}

/// Sort a parsed response into usable text vs a refusal
fn classify_response(response: GenerateContentResponse) -> GenerationOutcome {
    if let Some(feedback) = &response.prompt_feedback
        && let Some(reason) = &feedback.block_reason
    {
        warn!("Prompt blocked by API: {}", reason);
        return GenerationOutcome::Refusal;
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        warn!("Response carried no candidates");
        return GenerationOutcome::Refusal;
    };

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        warn!("Candidate withheld for safety");
        return GenerationOutcome::Refusal;
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        warn!("Model returned no usable text");
        return GenerationOutcome::Refusal;
    }

    GenerationOutcome::Text(text)
}
