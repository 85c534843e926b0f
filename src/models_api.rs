use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const CATALOG_PAGE_SIZE: u32 = 50;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No models supporting content generation are available")]
    NoEligibleModels,

    #[error("Gemini API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ResolveError>;

/// One catalog entry as reported by the provider
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelDescriptor {
    /// Model id as used in request URLs (strips "models/" prefix if present)
    pub fn identifier(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Decode one catalog page body
fn parse_catalog_page(body: &str) -> Result<ListModelsResponse> {
    Ok(serde_json::from_str(body)?)
}

/// Pick one eligible model: flash 1.5 first, then any flash, then pro,
/// then the first eligible entry in catalog order
pub fn select_model(models: &[ModelDescriptor]) -> Result<&ModelDescriptor> {
    let eligible: Vec<&ModelDescriptor> = models
        .iter()
        .filter(|m| m.supports_generation())
        .collect();

    let Some(&fallback) = eligible.first() else {
        return Err(ResolveError::NoEligibleModels);
    };

    let priorities: [fn(&str) -> bool; 3] = [
        |id| id.contains("flash") && id.contains("1.5"),
        |id| id.contains("flash"),
        |id| id.contains("pro"),
    ];

    for priority in priorities {
        if let Some(model) = eligible.iter().copied().find(|m| priority(m.identifier())) {
            return Ok(model);
        }
    }

    Ok(fallback)
}

pub struct ModelsClient {
    client: Client,
    api_key: String,
}

impl ModelsClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    /// Fetch the full model catalog, following pagination
    pub async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}?key={}&pageSize={}",
                GEMINI_API_URL, self.api_key, CATALOG_PAGE_SIZE
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", token));
            }

            debug!("Fetching model catalog page ({} entries so far)", models.len());

            let response = self.client.get(&url).send().await?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                return Err(ResolveError::ApiError {
                    status: status.as_u16(),
                    message: error_text,
                });
            }

            let body = response.text().await?;
            let page = parse_catalog_page(&body)?;
            models.extend(page.models);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!("Model catalog lists {} entries", models.len());
        Ok(models)
    }

    /// List the catalog and pick one model by priority
    pub async fn resolve(&self) -> Result<ModelDescriptor> {
        let models = self.list_models().await?;
        let selected = select_model(&models)?.clone();
        info!("Resolved model: {}", selected.identifier());
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, methods: &[&str]) -> ModelDescriptor {
        ModelDescriptor {
            name: name.to_string(),
            display_name: None,
            supported_generation_methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_model_descriptor_deserialization() {
        let json = r#"{
            "name": "models/gemini-1.5-flash",
            "displayName": "Gemini 1.5 Flash",
            "supportedGenerationMethods": ["generateContent", "countTokens"]
        }"#;

        let model: ModelDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(model.name, "models/gemini-1.5-flash");
        assert_eq!(model.display_name, Some("Gemini 1.5 Flash".to_string()));
        assert!(model.supports_generation());
    }

    #[test]
    fn test_model_descriptor_defaults_missing_fields() {
        let json = r#"{"name": "models/embedding-001"}"#;

        let model: ModelDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(model.display_name, None);
        assert!(model.supported_generation_methods.is_empty());
        assert!(!model.supports_generation());
    }

    #[test]
    fn test_list_response_deserialization() {
        let json = r#"{
            "models": [
                {"name": "models/gemini-1.5-pro", "supportedGenerationMethods": ["generateContent"]}
            ],
            "nextPageToken": "token-123"
        }"#;

        let page = parse_catalog_page(json).unwrap();
        assert_eq!(page.models.len(), 1);
        assert_eq!(page.next_page_token, Some("token-123".to_string()));
    }

    #[test]
    fn test_parse_catalog_page_rejects_malformed_body() {
        let result = parse_catalog_page("<!DOCTYPE html><html>error page</html>");
        assert!(matches!(result, Err(ResolveError::JsonError(_))));
    }

    #[test]
    fn test_identifier_strips_prefix() {
        let model = descriptor("models/gemini-1.5-flash", &["generateContent"]);
        assert_eq!(model.identifier(), "gemini-1.5-flash");

        let bare = descriptor("gemini-1.5-flash", &["generateContent"]);
        assert_eq!(bare.identifier(), "gemini-1.5-flash");
    }

    #[test]
    fn test_select_prefers_flash_15_regardless_of_order() {
        let models = vec![
            descriptor("models/gemini-1.0-pro", &["generateContent"]),
            descriptor("models/gemini-2.0-flash", &["generateContent"]),
            descriptor("models/gemini-1.5-flash", &["generateContent"]),
        ];
        assert_eq!(
            select_model(&models).unwrap().name,
            "models/gemini-1.5-flash"
        );

        let reversed: Vec<ModelDescriptor> = models.into_iter().rev().collect();
        assert_eq!(
            select_model(&reversed).unwrap().name,
            "models/gemini-1.5-flash"
        );
    }

    #[test]
    fn test_select_falls_back_to_any_flash() {
        let models = vec![
            descriptor("models/gemini-1.0-pro", &["generateContent"]),
            descriptor("models/gemini-2.0-flash", &["generateContent"]),
        ];
        assert_eq!(
            select_model(&models).unwrap().name,
            "models/gemini-2.0-flash"
        );
    }

    #[test]
    fn test_select_falls_back_to_first_pro() {
        let models = vec![
            descriptor("models/gemini-1.0-pro", &["generateContent"]),
            descriptor("models/gemini-1.5-pro", &["generateContent"]),
        ];
        assert_eq!(select_model(&models).unwrap().name, "models/gemini-1.0-pro");
    }

    #[test]
    fn test_select_falls_back_to_first_eligible() {
        let models = vec![
            descriptor("models/chat-bison-001", &["generateContent"]),
            descriptor("models/text-bison-001", &["generateContent"]),
        ];
        assert_eq!(select_model(&models).unwrap().name, "models/chat-bison-001");
    }

    #[test]
    fn test_select_ignores_ineligible_flash() {
        let models = vec![
            descriptor("models/gemini-1.5-flash", &["embedContent"]),
            descriptor("models/gemini-1.0-pro", &["generateContent"]),
        ];
        assert_eq!(select_model(&models).unwrap().name, "models/gemini-1.0-pro");
    }

    #[test]
    fn test_select_empty_catalog() {
        let result = select_model(&[]);
        assert!(matches!(result, Err(ResolveError::NoEligibleModels)));
    }

    #[test]
    fn test_select_no_eligible_models() {
        let models = vec![
            descriptor("models/embedding-001", &["embedContent"]),
            descriptor("models/aqa", &[]),
        ];
        let result = select_model(&models);
        assert!(matches!(result, Err(ResolveError::NoEligibleModels)));
    }
}
