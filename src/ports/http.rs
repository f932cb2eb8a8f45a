use std::path::Path;

use async_trait::async_trait;

use crate::domain::{Credential, DomainError};

/// HTTP method subset used by the inference API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One part of a multipart form.
#[derive(Debug, Clone)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

/// Request body.
#[derive(Debug, Clone, Default)]
pub enum HttpBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

/// A single outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<Credential>,
    pub body: HttpBody,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            bearer: None,
            body: HttpBody::Empty,
        }
    }

    pub fn post(url: impl Into<String>, body: HttpBody) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            bearer: None,
            body,
        }
    }

    pub fn bearer(mut self, token: Credential) -> Self {
        self.bearer = Some(token);
        self
    }
}

/// Egress rule a download is held to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Egress {
    /// Only hosts on the domain allow-list.
    AllowListed,
    /// A resource the user picked explicitly. Only local-only mode blocks it.
    UserSelected,
}

/// Response as received, success or not. Status interpretation is left to
/// the caller.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_slice(&self.body).map_err(DomainError::from)
    }
}

/// HTTP client port for all network requests.
/// All network traffic must go through this interface.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a request. Transport failures map to `DomainError::Network`;
    /// non-success statuses are returned as responses.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, DomainError>;

    /// Download a resource to a path, returning the number of bytes written.
    /// A policy refusal surfaces as `DomainError::NetworkBlocked`; every other
    /// failure as `DomainError::Download`.
    async fn download_file(
        &self,
        url: &str,
        path: &Path,
        egress: Egress,
        progress_callback: Option<Box<dyn Fn(u64, u64) + Send + Sync>>,
    ) -> Result<u64, DomainError>;

    /// Check if network requests are currently blocked.
    fn is_network_blocked(&self) -> bool;
}
