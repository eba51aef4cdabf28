//! AI cover generation

use crate::thumbnails::download_image;
use crate::types::RasterImage;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";

/// Generation is slow; the shared client's timeout is too short for it
const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("AI generation failed: {0}")]
    Upstream(String),
    #[error("Unexpected response from image API: {0}")]
    Malformed(String),
    #[error("Failed to download generated image: {0}")]
    Download(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// e.g. "1024x1792"
    pub size: String,
    /// "standard" or "hd"
    pub quality: String,
}

/// Something that can paint a cover from a text prompt
#[async_trait]
pub trait ImageProducer: Send + Sync {
    async fn produce(&self, request: &GenerationRequest) -> Result<RasterImage, GenerationError>;
}

pub struct OpenAiImageProducer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiImageProducer {
    pub fn new(client: reqwest::Client, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: OPENAI_IMAGES_URL.to_string(),
            api_key,
            model: model.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(&self, request: &GenerationRequest) -> Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "n": 1,
            "size": request.size,
            "response_format": "url",
        });
        // Only dall-e-3 accepts a quality setting
        if self.model == "dall-e-3" {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("quality".to_owned(), Value::from(request.quality.as_str()));
            }
        }
        body
    }
}

#[async_trait]
impl ImageProducer for OpenAiImageProducer {
    async fn produce(&self, request: &GenerationRequest) -> Result<RasterImage, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                GenerationError::Config(
                    "OpenAI API key not configured. Add \"openai_api_key\" to the API keys file"
                        .to_string(),
                )
            })?;

        log::info!(
            "Generating AI cover (model={}, size={})",
            self.model,
            request.size
        );
        log::debug!("Prompt: {}", request.prompt);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .timeout(GENERATION_TIMEOUT)
            .json(&self.payload(request))
            .send()
            .await
            .map_err(|e| GenerationError::Upstream(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| GenerationError::Upstream(e.to_string()))?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or_else(|| format!("HTTP {status}"));
            log::error!("OpenAI API request failed: {}", message);
            return Err(GenerationError::Upstream(message));
        }

        let image_url = extract_image_url(&raw)?;
        let image = download_image(&self.client, &image_url)
            .await
            .map_err(|e| GenerationError::Download(e.to_string()))?;

        log::info!(
            "AI cover generated successfully ({}x{})",
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_image_url(raw_json: &str) -> Result<String, GenerationError> {
    let value: Value =
        serde_json::from_str(raw_json).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    value
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(|first| first.get("url"))
        .and_then(|url| url.as_str())
        .map(str::to_owned)
        .ok_or_else(|| GenerationError::Malformed("missing `data[0].url`".to_string()))
}

/// Default prompt for a cover titled `title`.
pub fn build_default_prompt(title: &str) -> String {
    format!(
        "Design a professional, visually striking book cover for a book titled \"{title}\". \
         The cover should have elegant typography for the title, a compelling and thematic \
         illustration or design, and a cohesive color palette. The style should be modern \
         and suitable for an ebook. No author name needed. Portrait orientation, high quality."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "a lighthouse".to_string(),
            size: "1024x1792".to_string(),
            quality: "hd".to_string(),
        }
    }

    #[test]
    fn test_quality_only_sent_for_dall_e_3() {
        let producer = OpenAiImageProducer::new(reqwest::Client::new(), None, "dall-e-3");
        let body = producer.payload(&request());
        assert_eq!(body["quality"], "hd");
        assert_eq!(body["n"], 1);
        assert_eq!(body["response_format"], "url");

        let producer = OpenAiImageProducer::new(reqwest::Client::new(), None, "dall-e-2");
        assert!(producer.payload(&request()).get("quality").is_none());
    }

    #[test]
    fn test_error_message_extraction() {
        let raw = r#"{"error": {"message": "Billing hard limit reached", "type": "x"}}"#;
        assert_eq!(
            parse_error_message(raw).as_deref(),
            Some("Billing hard limit reached")
        );
        assert_eq!(parse_error_message("<html>"), None);
    }

    #[test]
    fn test_image_url_extraction() {
        let raw = r#"{"data": [{"url": "https://img.example/1.png"}]}"#;
        assert_eq!(extract_image_url(raw).unwrap(), "https://img.example/1.png");
        assert!(matches!(
            extract_image_url(r#"{"data": []}"#),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn test_default_prompt_mentions_title() {
        let prompt = build_default_prompt("Dune");
        assert!(prompt.contains("\"Dune\""));
        assert!(prompt.contains("Portrait orientation"));
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let producer = OpenAiImageProducer::new(reqwest::Client::new(), Some(String::new()), "dall-e-3")
            .with_endpoint("http://127.0.0.1:9/unreachable");
        match producer.produce(&request()).await {
            Err(GenerationError::Config(msg)) => assert!(msg.contains("openai_api_key")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }
}
