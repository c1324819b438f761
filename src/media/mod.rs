//! Text-to-image generation and image hosting.

mod freeimage;
mod huggingface;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ImageError;

pub use self::freeimage::FreeImageHost;
pub use self::huggingface::HuggingFaceImageGenerator;

/// Fixed generation parameters. Small output keeps mint payloads bounded.
pub const IMAGE_WIDTH: u32 = 512;
pub const IMAGE_HEIGHT: u32 = 512;
pub const INFERENCE_STEPS: u32 = 20;
pub const GUIDANCE_SCALE: f32 = 7.5;

/// An image produced from a prompt, kept as base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub base64: String,
    /// Prompt actually sent to the model.
    pub prompt: String,
}

impl GeneratedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Public location of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostedImage {
    pub url: String,
    pub display_url: String,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image for `prompt` as given. Callers decide whether to
    /// run it through [`enhance_prompt`] first.
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ImageError>;
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload raw base64 (no `data:` prefix) and return its public URLs.
    async fn upload(&self, base64: &str) -> Result<HostedImage, ImageError>;
}

/// Wrap a story in the artwork-quality template used for NFT images.
pub fn enhance_prompt(story: &str) -> String {
    format!(
        "Create a detailed, high-quality digital artwork based on this story: {}\n\n\
         Requirements:\n\
         - High resolution, detailed artwork\n\
         - Professional digital art style\n\
         - Vibrant colors and good composition\n\
         - Suitable for NFT creation\n\
         - No text or watermarks",
        story.trim()
    )
}

/// Drop a leading `data:image/...;base64,` prefix if present.
pub fn strip_data_url_prefix(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("data:")
        && let Some((header, payload)) = rest.split_once(',')
        && header.ends_with(";base64")
    {
        return payload;
    }
    trimmed
}
