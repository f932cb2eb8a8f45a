use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::DomainError;

/// Image content types accepted for embedded uploads.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Limit for images embedded as data URIs.
pub const MAX_EMBEDDED_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// Images per request.
pub const MAX_IMAGES: usize = 5;

/// An image attached to a vision request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImageInput {
    /// Fetched by the service.
    Url { url: Url, name: String },
    /// Embedded as a base64 data URI.
    Upload {
        data_uri: String,
        name: String,
        size: usize,
    },
}

impl ImageInput {
    /// Reference an image by URL.
    pub fn from_url(raw: &str) -> Result<Self, DomainError> {
        let url = Url::parse(raw.trim())
            .map_err(|_| DomainError::Validation("Please enter a valid URL.".to_string()))?;
        let name = url
            .path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("URL Image")
            .to_string();
        Ok(ImageInput::Url { url, name })
    }

    /// Embed raw image bytes (a file or a clipboard paste).
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<Self, DomainError> {
        if !ALLOWED_IMAGE_TYPES.contains(&mime_type) {
            return Err(DomainError::Validation(
                "Unsupported file type. Please use JPEG, PNG, GIF, or WebP.".to_string(),
            ));
        }

        if bytes.len() > MAX_EMBEDDED_IMAGE_BYTES {
            return Err(DomainError::Validation(format!(
                "File size exceeds 4MB limit. Current size: {:.2}MB",
                bytes.len() as f64 / (1024.0 * 1024.0)
            )));
        }

        let encoded = general_purpose::STANDARD.encode(bytes);
        Ok(ImageInput::Upload {
            data_uri: format!("data:{};base64,{}", mime_type, encoded),
            name: name.into(),
            size: bytes.len(),
        })
    }

    /// Read and embed an image file. The content type is guessed from the
    /// extension.
    pub async fn from_file(path: &Path) -> Result<Self, DomainError> {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());

        let metadata = tokio::fs::metadata(path).await?;
        if metadata.len() as usize > MAX_EMBEDDED_IMAGE_BYTES {
            return Err(DomainError::Validation(format!(
                "File size exceeds 4MB limit. Current size: {:.2}MB",
                metadata.len() as f64 / (1024.0 * 1024.0)
            )));
        }

        let bytes = tokio::fs::read(path).await?;
        Self::from_bytes(name, mime.essence_str(), &bytes)
    }

    /// Value of the `image_url.url` field on the wire.
    pub fn wire_url(&self) -> &str {
        match self {
            ImageInput::Url { url, .. } => url.as_str(),
            ImageInput::Upload { data_uri, .. } => data_uri,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ImageInput::Url { name, .. } | ImageInput::Upload { name, .. } => name,
        }
    }
}

/// A vision analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionRequest {
    pub model: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub images: Vec<ImageInput>,
}

impl VisionRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.images.is_empty() {
            return Err(DomainError::Validation(
                "Please upload at least one image to analyze.".to_string(),
            ));
        }

        if self.images.len() > MAX_IMAGES {
            return Err(DomainError::Validation(format!(
                "Maximum {} images allowed.",
                MAX_IMAGES
            )));
        }

        if self.user_prompt.trim().is_empty() {
            return Err(DomainError::Validation(
                "Please enter a prompt to analyze the images.".to_string(),
            ));
        }

        Ok(())
    }

    /// Chat-completions body for this request.
    pub fn to_wire(&self, temperature: f32, max_tokens: u32, top_p: f32) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);

        if let Some(system) = self.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }

        let mut content = vec![serde_json::json!({ "type": "text", "text": self.user_prompt })];
        content.extend(self.images.iter().map(|img| {
            serde_json::json!({ "type": "image_url", "image_url": { "url": img.wire_url() } })
        }));
        messages.push(serde_json::json!({ "role": "user", "content": content }));

        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
            "top_p": top_p,
        })
    }
}

/// Subset of the chat-completions response we read.
#[derive(Debug, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletion {
    /// First non-empty message content.
    pub fn into_text(self) -> Result<String, DomainError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(DomainError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(images: Vec<ImageInput>, prompt: &str) -> VisionRequest {
        VisionRequest {
            model: "meta-llama/llama-4-scout-17b-16e-instruct".into(),
            system_prompt: None,
            user_prompt: prompt.into(),
            images,
        }
    }

    #[test]
    fn test_from_url() {
        let img = ImageInput::from_url("https://example.com/cats/tabby.png").unwrap();
        assert_eq!(img.name(), "tabby.png");
        assert!(ImageInput::from_url("not a url").is_err());
    }

    #[test]
    fn test_from_bytes_builds_data_uri() {
        let img = ImageInput::from_bytes("dot.png", "image/png", &[0x89, 0x50]).unwrap();
        assert_eq!(img.wire_url(), "data:image/png;base64,iVA=");
    }

    #[test]
    fn test_from_bytes_rejects_type_and_size() {
        assert!(ImageInput::from_bytes("a.bmp", "image/bmp", &[0]).is_err());
        let big = vec![0u8; MAX_EMBEDDED_IMAGE_BYTES + 1];
        assert!(ImageInput::from_bytes("a.png", "image/png", &big).is_err());
    }

    #[test]
    fn test_validate() {
        let img = ImageInput::from_url("https://example.com/a.jpg").unwrap();
        assert!(request(vec![], "describe").validate().is_err());
        assert!(request(vec![img.clone()], "  ").validate().is_err());
        assert!(request(vec![img.clone(); 6], "describe").validate().is_err());
        assert!(request(vec![img], "describe").validate().is_ok());
    }

    #[test]
    fn test_wire_body() {
        let img = ImageInput::from_url("https://example.com/a.jpg").unwrap();
        let mut req = request(vec![img], "what is this?");
        req.system_prompt = Some("be brief".into());
        let body = req.to_wire(0.7, 2048, 0.9);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"][0]["type"], "text");
        assert_eq!(
            body["messages"][1]["content"][1]["image_url"]["url"],
            "https://example.com/a.jpg"
        );
        assert_eq!(body["max_tokens"], 2048);
    }

    #[test]
    fn test_empty_completion() {
        let completion: ChatCompletion =
            serde_json::from_str(r#"{"choices":[{"message":{"content":""}}]}"#).unwrap();
        assert!(matches!(completion.into_text(), Err(DomainError::EmptyResponse)));
    }
}
