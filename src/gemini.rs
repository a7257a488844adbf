use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::error::ExtractError;
use crate::gateway::VisionModel;
use crate::intake::ImageUpload;

/// [`VisionModel`] backed by the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl GeminiClient {
    pub fn from_config(config: &Config) -> Result<Self, ExtractError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExtractError::Transport(e.to_string()))?;
        Ok(GeminiClient {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.clone(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl VisionModel for GeminiClient {
    async fn generate(&self, image: &ImageUpload, prompt: &str) -> Result<String, ExtractError> {
        let api_key = self.api_key.as_deref().ok_or(ExtractError::MissingApiKey)?;

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": image.media_type().mime(), "data": image.base64() } }
                ]
            }]
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExtractError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(ExtractError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        reply_text(&text)
    }
}

/// Concatenates the text parts of the first candidate.
fn reply_text(body: &str) -> Result<String, ExtractError> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        log::error!("unreadable generateContent response ({}): {}", e, body);
        ExtractError::MalformedReply
    })?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        log::error!("model returned no text: {}", body);
        return Err(ExtractError::MalformedReply);
    }
    Ok(text)
}
