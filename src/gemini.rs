use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use tracing::info;

/// Text model used for idea generation.
pub const TEXT_MODEL: &str = "gemini-2.0-flash";

/// Image model used to render the idea.
pub const IMAGE_MODEL: &str = "imagen-4.0-generate-preview-06-06";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// On-disk prompt override; the embedded default applies when absent.
pub const IDEA_PROMPT_PATH: &str = "prompts/idea_prompt.txt";

const DEFAULT_IDEA_PROMPT: &str = "You design small, playful desk objects for hobbyist 3D \
printing. Suggest one original object that prints well without supports. Respond with a single \
sentence describing the object, usable directly as an image generation prompt.";

/// Thin client for the generation API. Both calls forward verbatim; the
/// pipeline only consumes the returned text or the written image file.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        GeminiClient {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Reads either key name; set one of them in the environment.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("GOOGLE_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| anyhow::anyhow!("Set GOOGLE_API_KEY or GEMINI_API_KEY in the environment."))?;
        Ok(Self::new(key))
    }

    /// Generate a one-line model idea. Always returns a non-empty trimmed
    /// string or an error.
    pub async fn generate_idea(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/{}:generateContent?key={}", API_BASE, TEXT_MODEL, self.api_key);
        let response = self
            .http
            .post(&url)
            .json(&idea_request_body(prompt))
            .send()
            .await
            .context("Idea generation request failed")?
            .error_for_status()
            .context("Idea generation request rejected")?;

        let body: Value = response
            .json()
            .await
            .context("Idea generation returned malformed JSON")?;
        extract_idea_text(&body)
    }

    /// Render `prompt` and write exactly one image file to `out_path`.
    pub async fn generate_image(&self, prompt: &str, out_path: &Path) -> Result<PathBuf> {
        let url = format!("{}/{}:predict?key={}", API_BASE, IMAGE_MODEL, self.api_key);
        let response = self
            .http
            .post(&url)
            .json(&image_request_body(prompt, 1, "1:1"))
            .send()
            .await
            .context("Image generation request failed")?
            .error_for_status()
            .context("Image generation request rejected")?;

        let body: Value = response
            .json()
            .await
            .context("Image generation returned malformed JSON")?;
        let bytes = extract_image_bytes(&body)?;

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(out_path, bytes)
            .context(format!("Failed to write image to {}", out_path.display()))?;
        info!("Wrote generated image to {}", out_path.display());
        Ok(out_path.to_path_buf())
    }
}

/// The idea prompt: the on-disk override when present, the default otherwise.
pub fn load_idea_prompt() -> String {
    match std::fs::read_to_string(IDEA_PROMPT_PATH) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => DEFAULT_IDEA_PROMPT.to_string(),
    }
}

fn idea_request_body(prompt: &str) -> Value {
    json!({
        "contents": [{"role": "user", "parts": [{"text": prompt}]}],
        // kept minimal for compatibility across API revisions
        "generationConfig": {"temperature": 0.6},
    })
}

fn image_request_body(prompt: &str, n_images: u32, aspect_ratio: &str) -> Value {
    json!({
        "instances": [{"prompt": prompt}],
        "parameters": {"sampleCount": n_images, "aspectRatio": aspect_ratio},
    })
}

fn extract_idea_text(body: &Value) -> Result<String> {
    let text = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.pointer("/content/parts"))
        .and_then(|parts| parts.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let text = text.trim().to_string();
    if text.is_empty() {
        anyhow::bail!("Idea model returned no text");
    }
    Ok(text)
}

fn extract_image_bytes(body: &Value) -> Result<Vec<u8>> {
    let encoded = body
        .get("predictions")
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("bytesBase64Encoded"))
        .and_then(|b| b.as_str())
        .ok_or_else(|| anyhow::anyhow!("No images returned from the image model."))?;

    BASE64
        .decode(encoded)
        .context("Image payload was not valid base64")
}

#[cfg(test)]
#[path = "gemini_test.rs"]
mod gemini_test;
