use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Supported Gemini models available for comparison.
pub const SUPPORTED_MODELS: &[(&str, &str)] = &[
    ("gemini-3-pro-preview", "gemini-3-pro-preview"),
    ("gemini-3-flash-preview", "gemini-3-flash-preview"),
    ("gemini-2.5-flash", "gemini-2.5-flash"),
    ("gemini-2.5-pro", "gemini-2.5-pro"),
];

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

// The Gemini SDKs default to long deadlines for video understanding; the
// HTTP client owns timeout handling, not the pipeline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// A model chosen for one comparison run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedModel {
    pub name: String,
    pub id: String,
}

pub fn supported_model_names() -> Vec<&'static str> {
    SUPPORTED_MODELS.iter().map(|(name, _)| *name).collect()
}

/// Resolve the requested model subset, defaulting to every supported model.
pub fn select_models(requested: Option<&[String]>) -> Result<Vec<SelectedModel>, ModelError> {
    match requested {
        None => Ok(SUPPORTED_MODELS
            .iter()
            .map(|(name, id)| SelectedModel {
                name: name.to_string(),
                id: id.to_string(),
            })
            .collect()),
        Some(names) => names
            .iter()
            .map(|name| {
                SUPPORTED_MODELS
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(name, id)| SelectedModel {
                        name: name.to_string(),
                        id: id.to_string(),
                    })
                    .ok_or_else(|| ModelError::UnknownModel(name.clone()))
            })
            .collect(),
    }
}

/// Seam over the model API so the pipeline can run without network access.
#[async_trait]
pub trait ModelRunner: Send + Sync {
    /// Run one multimodal model against a video and prompt, returning the
    /// raw text response.
    async fn run_video_prompt(
        &self,
        model_id: &str,
        video: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, ModelError>;

    /// Run the designated judge model against a text-only prompt.
    async fn run_judge(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Client for the Gemini generateContent REST API.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    judge_model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, judge_model: String) -> Result<Self, ModelError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ModelError::Http)?;
        Ok(Self {
            http,
            api_key,
            judge_model,
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    async fn generate(
        &self,
        model_id: &str,
        parts: serde_json::Value,
    ) -> Result<String, ModelError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, model_id
        );
        let body = serde_json::json!({
            "contents": [{ "parts": parts }]
        });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ModelError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                detail: truncate(&detail, 300),
            });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(ModelError::Http)?;
        extract_text(parsed)
    }
}

#[async_trait]
impl ModelRunner for GeminiClient {
    async fn run_video_prompt(
        &self,
        model_id: &str,
        video: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, ModelError> {
        let parts = serde_json::json!([
            {
                "inline_data": {
                    "mime_type": mime_type,
                    "data": base64::engine::general_purpose::STANDARD.encode(video),
                }
            },
            { "text": prompt }
        ]);
        self.generate(model_id, parts).await
    }

    async fn run_judge(&self, prompt: &str) -> Result<String, ModelError> {
        let parts = serde_json::json!([{ "text": prompt }]);
        self.generate(&self.judge_model, parts).await
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

fn extract_text(response: GenerateContentResponse) -> Result<String, ModelError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(text)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API returned {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Unknown model: {0}")]
    UnknownModel(String),
}
