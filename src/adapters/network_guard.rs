use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{multipart, Client};
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::config::PrivacyConfig;
use crate::domain::DomainError;
use crate::ports::{Egress, FormPart, HttpBody, HttpClient, HttpRequest, HttpResponse, Method};

/// NetworkGuard is the single gate for outbound HTTP.
///
/// Requests are refused in local-only mode and limited to an allow-list of
/// domains (subdomains included) otherwise. Downloads of a source the user
/// picked (`Egress::UserSelected`) skip the allow-list but still honor
/// local-only mode. Constructed explicitly and shared by `Arc`; there is no
/// process-wide instance.
pub struct NetworkGuard {
    client: Client,
    local_only: AtomicBool,
    allowed_domains: RwLock<Vec<String>>,
}

impl NetworkGuard {
    pub fn new(privacy: &PrivacyConfig, request_timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(request_timeout)
            .user_agent(format!("GroqPlayground/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(client, privacy))
    }

    pub(crate) fn with_client(client: Client, privacy: &PrivacyConfig) -> Self {
        info!(
            local_only = privacy.local_only,
            allowed_domains = ?privacy.allowed_domains,
            "NetworkGuard initialized"
        );

        Self {
            client,
            local_only: AtomicBool::new(privacy.local_only),
            allowed_domains: RwLock::new(privacy.allowed_domains.clone()),
        }
    }

    pub fn set_local_only(&self, local_only: bool) {
        let previous = self.local_only.swap(local_only, Ordering::SeqCst);
        if previous != local_only {
            info!(local_only, "NetworkGuard mode changed");
        }
    }

    pub fn set_allowed_domains(&self, domains: Vec<String>) {
        let mut guard = self.allowed_domains.write();
        *guard = domains;
        info!(allowed_domains = ?*guard, "NetworkGuard allowed domains updated");
    }

    /// Apply a new privacy configuration.
    pub fn apply(&self, privacy: &PrivacyConfig) {
        self.set_local_only(privacy.local_only);
        self.set_allowed_domains(privacy.allowed_domains.clone());
    }

    fn is_url_allowed(&self, url: &str) -> Result<(), DomainError> {
        self.check_egress(url, Egress::AllowListed)
    }

    fn check_egress(&self, url: &str, egress: Egress) -> Result<(), DomainError> {
        if self.local_only.load(Ordering::SeqCst) {
            warn!(url, "Network request blocked: local-only mode enabled");
            return Err(DomainError::NetworkBlocked {
                reason: "Local-only mode is enabled. All network requests are blocked.".to_string(),
            });
        }

        let parsed = Url::parse(url).map_err(|e| DomainError::Network(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| DomainError::Network("Invalid URL: no host".to_string()))?;

        if egress == Egress::UserSelected {
            debug!(url, "User-selected download allowed");
            return Ok(());
        }

        let allowed = self.allowed_domains.read();
        if !allowed
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{}", d)))
        {
            warn!(url, host, "Network request blocked: domain not in allow-list");
            return Err(DomainError::NetworkBlocked {
                reason: format!("Domain '{}' is not in the allowed list", host),
            });
        }

        debug!(url, "Network request allowed");
        Ok(())
    }

    fn build_form(parts: Vec<FormPart>) -> Result<multipart::Form, DomainError> {
        let mut form = multipart::Form::new();
        for part in parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File {
                    name,
                    file_name,
                    mime_type,
                    bytes,
                } => {
                    let file = multipart::Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str(&mime_type)
                        .map_err(|e| DomainError::Validation(format!("mime: {}", e)))?;
                    form.part(name, file)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl HttpClient for NetworkGuard {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, DomainError> {
        self.is_url_allowed(&request.url)?;

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.expose());
        }

        builder = match request.body {
            HttpBody::Empty => builder,
            HttpBody::Json(value) => builder.json(&value),
            HttpBody::Multipart(parts) => builder.multipart(Self::build_form(parts)?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| DomainError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| DomainError::Network(e.to_string()))?
            .to_vec();

        debug!(url = %request.url, status, size = body.len(), "HTTP response received");

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }

    async fn download_file(
        &self,
        url: &str,
        path: &Path,
        egress: Egress,
        progress_callback: Option<Box<dyn Fn(u64, u64) + Send + Sync>>,
    ) -> Result<u64, DomainError> {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        self.check_egress(url, egress).map_err(|e| match e {
            blocked @ DomainError::NetworkBlocked { .. } => blocked,
            other => DomainError::Download(other.to_string()),
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DomainError::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Download(format!("HTTP {} for {}", status, url)));
        }

        let total_size = response.content_length().unwrap_or(0);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to temp file first, then rename atomically
        let temp_path = path.with_extension("download");

        let cleanup_temp = || {
            let temp = temp_path.clone();
            async move {
                let _ = tokio::fs::remove_file(&temp).await;
            }
        };

        let mut file = match tokio::fs::File::create(&temp_path).await {
            Ok(f) => f,
            Err(e) => {
                cleanup_temp().await;
                return Err(DomainError::Download(e.to_string()));
            }
        };

        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    drop(file);
                    cleanup_temp().await;
                    return Err(DomainError::Download(e.to_string()));
                }
            };

            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                cleanup_temp().await;
                return Err(DomainError::Download(e.to_string()));
            }

            downloaded += chunk.len() as u64;

            if let Some(callback) = &progress_callback {
                callback(downloaded, total_size);
            }
        }

        if let Err(e) = file.flush().await {
            drop(file);
            cleanup_temp().await;
            return Err(DomainError::Download(e.to_string()));
        }
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            cleanup_temp().await;
            return Err(DomainError::Download(e.to_string()));
        }

        info!(path = ?path, size = downloaded, "File downloaded successfully");
        Ok(downloaded)
    }

    fn is_network_blocked(&self) -> bool {
        self.local_only.load(Ordering::SeqCst)
    }
}
