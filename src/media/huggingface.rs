use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::MediaConfig;
use crate::error::ImageError;
use crate::llm::{redact_sensitive_detail, truncate_detail};
use crate::media::{
    GUIDANCE_SCALE, GeneratedImage, IMAGE_HEIGHT, IMAGE_WIDTH, INFERENCE_STEPS, ImageGenerator,
};

const SERVICE: &str = "huggingface";

#[derive(Debug, Serialize)]
struct TextToImageRequest<'a> {
    inputs: &'a str,
    parameters: TextToImageParameters,
}

#[derive(Debug, Serialize)]
struct TextToImageParameters {
    height: u32,
    width: u32,
    num_inference_steps: u32,
    guidance_scale: f32,
}

/// Hugging Face inference text-to-image client.
pub struct HuggingFaceImageGenerator {
    client: reqwest::Client,
    token: Option<SecretString>,
    endpoint: String,
    timeout: Duration,
}

impl HuggingFaceImageGenerator {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: config.hf_token.clone(),
            endpoint: format!("{}/{}", config.inference_base_url, config.image_model),
            timeout: config.image_timeout,
        }
    }

    fn timeout_error(&self) -> ImageError {
        ImageError::Timeout {
            service: SERVICE.to_string(),
            timeout: self.timeout,
        }
    }
}

#[async_trait]
impl ImageGenerator for HuggingFaceImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ImageError> {
        if prompt.trim().is_empty() {
            return Err(ImageError::EmptyPrompt);
        }
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| ImageError::MissingCredential {
                service: SERVICE.to_string(),
                key: "HF_TOKEN".to_string(),
            })?;

        let body = TextToImageRequest {
            inputs: prompt,
            parameters: TextToImageParameters {
                height: IMAGE_HEIGHT,
                width: IMAGE_WIDTH,
                num_inference_steps: INFERENCE_STEPS,
                guidance_scale: GUIDANCE_SCALE,
            },
        };

        let send = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token.expose_secret())
            .header(reqwest::header::ACCEPT, "image/*")
            .json(&body)
            .send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(|e| ImageError::RequestFailed {
                service: SERVICE.to_string(),
                reason: redact_sensitive_detail(&e.to_string()),
            })?;

        let status = response.status();
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_default();

        let bytes = tokio::time::timeout(self.timeout, response.bytes())
            .await
            .map_err(|_| self.timeout_error())??;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return Err(ImageError::HttpStatus {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                body: truncate_detail(&redact_sensitive_detail(&text), 512),
            });
        }

        let image = encode_image(&bytes, &mime_type, prompt)?;
        tracing::info!(
            service = SERVICE,
            mime_type = %image.mime_type,
            bytes = bytes.len(),
            "image generated"
        );
        Ok(image)
    }
}

/// Wrap raw image bytes, rejecting bodies that are not images.
fn encode_image(bytes: &[u8], mime_type: &str, prompt: &str) -> Result<GeneratedImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::InvalidResponse {
            service: SERVICE.to_string(),
            reason: "empty image body".to_string(),
        });
    }
    let mime_type = if mime_type.starts_with("image/") {
        mime_type.to_string()
    } else if mime_type.is_empty() || mime_type == "application/octet-stream" {
        "image/jpeg".to_string()
    } else {
        return Err(ImageError::InvalidResponse {
            service: SERVICE.to_string(),
            reason: format!("expected an image, got {mime_type}"),
        });
    };

    Ok(GeneratedImage {
        mime_type,
        base64: STANDARD.encode(bytes),
        prompt: prompt.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_image_bytes() {
        let image = encode_image(&[0xff, 0xd8, 0xff], "image/png", "fox").unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.base64, "/9j/");
        assert_eq!(image.prompt, "fox");
    }

    #[test]
    fn untyped_bodies_default_to_jpeg() {
        let image = encode_image(&[1, 2, 3], "", "fox").unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[test]
    fn json_body_is_rejected() {
        let err = encode_image(b"{\"error\":\"loading\"}", "application/json", "fox").unwrap_err();
        assert!(matches!(err, ImageError::InvalidResponse { .. }));
        let err = encode_image(&[], "image/png", "fox").unwrap_err();
        assert!(matches!(err, ImageError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn missing_token_and_empty_prompt_fail_fast() {
        let generator = HuggingFaceImageGenerator::new(&MediaConfig::default());
        assert!(matches!(
            generator.generate("  ").await.unwrap_err(),
            ImageError::EmptyPrompt
        ));
        assert!(matches!(
            generator.generate("a fox").await.unwrap_err(),
            ImageError::MissingCredential { .. }
        ));
    }
}
