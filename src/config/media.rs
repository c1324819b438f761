use std::time::Duration;

use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_env};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Text-to-image and image-hosting collaborators.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// `HF_TOKEN`. Missing means image generation fails per request.
    pub hf_token: Option<SecretString>,
    pub image_model: String,
    pub inference_base_url: String,
    pub image_timeout: Duration,
    /// `FREEIMAGE_API_KEY`. Missing means uploads fail per request.
    pub freeimage_api_key: Option<SecretString>,
    pub upload_url: String,
}

impl MediaConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let media = &settings.media;

        let timeout_secs = parse_env::<u64>("IMAGE_TIMEOUT_SECS", "a positive integer")?
            .unwrap_or(media.timeout_secs);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "IMAGE_TIMEOUT_SECS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        Ok(Self {
            hf_token: optional_env("HF_TOKEN")?.map(SecretString::from),
            image_model: optional_env("HF_IMAGE_MODEL")?
                .unwrap_or_else(|| media.image_model.clone()),
            inference_base_url: optional_env("HF_INFERENCE_BASE_URL")?
                .unwrap_or_else(|| media.inference_base_url.clone())
                .trim_end_matches('/')
                .to_string(),
            image_timeout: Duration::from_secs(timeout_secs),
            freeimage_api_key: optional_env("FREEIMAGE_API_KEY")?.map(SecretString::from),
            upload_url: optional_env("FREEIMAGE_UPLOAD_URL")?
                .unwrap_or_else(|| media.upload_url.clone()),
        })
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        let media = crate::settings::MediaSettings::default();
        Self {
            hf_token: None,
            image_model: media.image_model,
            inference_base_url: media.inference_base_url,
            image_timeout: Duration::from_secs(media.timeout_secs),
            freeimage_api_key: None,
            upload_url: media.upload_url,
        }
    }
}
