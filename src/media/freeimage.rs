use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::MediaConfig;
use crate::error::ImageError;
use crate::llm::{redact_sensitive_detail, truncate_detail};
use crate::media::{HostedImage, ImageHost, strip_data_url_prefix};

const SERVICE: &str = "freeimage";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct UploadResponse {
    status_code: Option<u16>,
    error: Option<UploadErrorBody>,
    image: Option<UploadedImage>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadedImage {
    url: Option<String>,
    display_url: Option<String>,
}

/// freeimage.host upload client.
pub struct FreeImageHost {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    upload_url: String,
}

impl FreeImageHost {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.freeimage_api_key.clone(),
            upload_url: config.upload_url.clone(),
        }
    }
}

#[async_trait]
impl ImageHost for FreeImageHost {
    async fn upload(&self, base64: &str) -> Result<HostedImage, ImageError> {
        let source = strip_data_url_prefix(base64);
        if source.is_empty() {
            return Err(ImageError::EmptyPayload);
        }
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ImageError::MissingCredential {
                service: SERVICE.to_string(),
                key: "FREEIMAGE_API_KEY".to_string(),
            })?;

        let form = [
            ("key", api_key.expose_secret()),
            ("action", "upload"),
            ("source", source),
            ("format", "json"),
        ];
        let send = self.client.post(&self.upload_url).form(&form).send();
        let response = tokio::time::timeout(UPLOAD_TIMEOUT, send)
            .await
            .map_err(|_| ImageError::Timeout {
                service: SERVICE.to_string(),
                timeout: UPLOAD_TIMEOUT,
            })?
            .map_err(|e| ImageError::RequestFailed {
                service: SERVICE.to_string(),
                reason: redact_sensitive_detail(&e.to_string()),
            })?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ImageError::HttpStatus {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                body: truncate_detail(&redact_sensitive_detail(&text), 512),
            });
        }

        let hosted = parse_upload_response(&text)?;
        tracing::info!(service = SERVICE, url = %hosted.url, "image uploaded");
        Ok(hosted)
    }
}

fn parse_upload_response(body: &str) -> Result<HostedImage, ImageError> {
    let parsed: UploadResponse =
        serde_json::from_str(body).map_err(|e| ImageError::InvalidResponse {
            service: SERVICE.to_string(),
            reason: e.to_string(),
        })?;

    if parsed.status_code != Some(200) {
        let reason = parsed
            .error
            .and_then(|e| e.message)
            .unwrap_or_else(|| "Upload failed".to_string());
        return Err(ImageError::Rejected {
            service: SERVICE.to_string(),
            reason,
        });
    }

    let image = parsed.image.ok_or_else(|| ImageError::InvalidResponse {
        service: SERVICE.to_string(),
        reason: "No image URL returned from response".to_string(),
    })?;
    let url = image
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ImageError::InvalidResponse {
            service: SERVICE.to_string(),
            reason: "No image URL returned from response".to_string(),
        })?;
    let display_url = image
        .display_url
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| url.clone());

    Ok(HostedImage { url, display_url })
}
