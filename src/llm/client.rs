use crate::ingestion::ParserError;
use crate::llm::types::*;
use log::debug;
use reqwest::{Client, StatusCode};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

// Error text never carries the request URL.
impl From<reqwest::Error> for ParserError {
    fn from(e: reqwest::Error) -> Self {
        ParserError::RunFailed(e.without_url().to_string())
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint, e.g. a regional or proxy URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sends one generateContent request and returns the text of the first candidate.
    pub async fn generate_content(
        &self,
        model: &str,
        system_prompt: &str,
        contents: Vec<Content>,
        generation_config: GenerationConfig,
    ) -> Result<String, ParserError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let payload = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::system(system_prompt)),
            generation_config,
        };

        let res = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await?;
        let status = res.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let err_text = res.text().await?;
            return Err(ParserError::UsageLimitExceeded(format!(
                "Gemini API quota exhausted (status {}): {}",
                status, err_text
            )));
        }
        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(ParserError::RunFailed(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body_text = res.text().await?;
        let body: GenerateContentResponse = serde_json::from_str(&body_text).map_err(|e| {
            ParserError::UnexpectedBehavior(format!("Unreadable Gemini response: {}", e))
        })?;

        extract_text(body)
    }
}

/// Pulls the answer text out of a response, classifying the ways it can be missing.
pub fn extract_text(body: GenerateContentResponse) -> Result<String, ParserError> {
    if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ParserError::UnexpectedBehavior(format!(
            "Prompt blocked: {}",
            reason
        )));
    }

    let candidate = body
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| ParserError::UnexpectedBehavior("No candidates returned".to_string()))?;

    if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
        return Err(ParserError::UsageLimitExceeded(
            "Response truncated at the output token limit".to_string(),
        ));
    }
    debug!("Gemini finish reason: {:?}", candidate.finish_reason);

    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| match part {
            Part::Text { text } => Some(text),
            _ => None,
        })
        .collect();

    if text.trim().is_empty() {
        return Err(ParserError::UnexpectedBehavior(
            "Model returned no text content".to_string(),
        ));
    }
    Ok(text)
}
