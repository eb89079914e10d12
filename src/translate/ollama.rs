use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TranslateConfig;
use crate::error::{Result, SubgenError};
use super::{BatchRequest, TranslationProvider};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BatchTranslation {
    translations: Vec<String>,
}

/// Translation provider backed by an Ollama `/api/generate` endpoint
pub struct OllamaProvider {
    client: Client,
    config: TranslateConfig,
}

impl OllamaProvider {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Check that the endpoint is reachable and the model is pulled
    pub async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/api/show", self.config.endpoint.trim_end_matches('/'));

        let response = self
            .authorized(self.client.post(&url))
            .json(&json!({ "name": self.config.model }))
            .send()
            .await
            .map_err(|e| SubgenError::TranslationProvider(format!("Failed to connect to Ollama: {}", e)))?;

        if response.status().is_success() {
            info!("Ollama model '{}' is available", self.config.model);
            Ok(())
        } else {
            Err(SubgenError::TranslationProvider(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                self.config.model, self.config.model
            )))
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl TranslationProvider for OllamaProvider {
    async fn translate_batch(&self, request: &BatchRequest) -> Result<Vec<String>> {
        let body = GenerateRequest {
            model: self.config.model.clone(),
            prompt: build_batch_prompt(request),
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));
        debug!("Sending translation request to: {}", url);

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SubgenError::TranslationProvider(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SubgenError::TranslationProvider(format!(
                "Ollama API error {}: {}",
                status, error_text
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SubgenError::TranslationProvider(format!("Failed to parse response: {}", e)))?;

        debug!("Raw Ollama response: {}", generated.response);

        parse_translations(&generated.response).ok_or_else(|| {
            SubgenError::TranslationProvider("Response did not contain a translations list".to_string())
        })
    }
}

/// Build the batch prompt. Lines are numbered so the model can keep one
/// output per input; context lines are marked as reference only.
pub fn build_batch_prompt(request: &BatchRequest) -> String {
    let target_name = language_code_to_name(&request.target_language);
    let source_name = request
        .source_language
        .as_deref()
        .map(language_code_to_name)
        .unwrap_or_else(|| "the source language".to_string());

    let mut prompt = format!(
        "You are a professional subtitle translator.\n\
         \n\
         Translate each numbered line from {} to {} (language code: {}).\n\
         Return ONLY JSON in the form {{\"translations\": [\"...\", \"...\"]}} with exactly {} entries, \
         one per numbered line, in the same order.\n\
         Do not merge, split, skip, or explain lines.\n\
         \n",
        source_name,
        target_name,
        request.target_language,
        request.texts.len()
    );

    if !request.context.is_empty() {
        prompt.push_str("[Previous lines for reference - DO NOT translate these]\n");
        for line in &request.context {
            prompt.push_str(&format!("- {}\n", line.trim()));
        }
        prompt.push('\n');
    }

    prompt.push_str("[Lines to translate]\n");
    for (i, line) in request.texts.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, line.trim()));
    }

    prompt
}

/// Extract the translations list from a model reply.
///
/// Accepts plain JSON, JSON wrapped in a markdown code block, JSON embedded in
/// surrounding prose, and a bare JSON array of strings.
pub fn parse_translations(raw: &str) -> Option<Vec<String>> {
    let text = raw.trim();

    if let Some(list) = parse_json_candidate(text) {
        return Some(list);
    }

    let cleaned = remove_markdown_code_blocks(text);
    if cleaned != text {
        if let Some(list) = parse_json_candidate(&cleaned) {
            return Some(list);
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Some(list) = parse_json_candidate(&text[start..=end]) {
                return Some(list);
            }
        }
    }

    None
}

fn parse_json_candidate(text: &str) -> Option<Vec<String>> {
    if let Ok(parsed) = serde_json::from_str::<BatchTranslation>(text) {
        return Some(parsed.translations);
    }
    serde_json::from_str::<Vec<String>>(text).ok()
}

fn remove_markdown_code_blocks(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // Drop the language tag line, e.g. ```json
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };

    body.trim_end().trim_end_matches("```").trim().to_string()
}

/// Convert language code to full language name for clearer prompts
pub fn language_code_to_name(code: &str) -> String {
    let name = match code.to_lowercase().as_str() {
        "en" => "English",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "ru" => "Russian",
        "it" => "Italian",
        "pt" => "Portuguese",
        "pl" => "Polish",
        "nl" => "Dutch",
        "tr" => "Turkish",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "th" => "Thai",
        "vi" => "Vietnamese",
        "sv" => "Swedish",
        "da" => "Danish",
        "no" => "Norwegian",
        "fi" => "Finnish",
        "he" => "Hebrew",
        "hu" => "Hungarian",
        "cs" => "Czech",
        "uk" => "Ukrainian",
        "id" => "Indonesian",
        _ => return code.to_string(),
    };
    name.to_string()
}
