//! Scripted test doubles for the HTTP and media-host ports.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::adapters::NetworkGuard;
use crate::domain::config::PrivacyConfig;
use crate::domain::{DomainError, LoadGeneration, SourceLocator};
use crate::ports::{
    Egress, FormPart, HttpBody, HttpClient, HttpRequest, HttpResponse, MediaHost, Method,
};

/// What the mock saw of a request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub had_bearer: bool,
    pub json: Option<serde_json::Value>,
    /// Text fields as (name, value); file parts as (name, file_name).
    pub form_fields: Vec<(String, String)>,
}

/// HTTP client that replays scripted responses in order.
#[derive(Default)]
pub struct MockHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, DomainError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: &str) {
        self.responses.lock().push_back(Ok(HttpResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: body.as_bytes().to_vec(),
        }));
    }

    pub fn push_bytes(&self, status: u16, content_type: &str, body: Vec<u8>) {
        self.responses.lock().push_back(Ok(HttpResponse {
            status,
            content_type: Some(content_type.to_string()),
            body,
        }));
    }

    pub fn push_error(&self, error: DomainError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Make every subsequent call wait until the returned handle is notified
    /// (once per call).
    pub fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock() = Some(notify.clone());
        notify
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn record(&self, request: &HttpRequest) {
        let (json, form_fields) = match &request.body {
            HttpBody::Empty => (None, Vec::new()),
            HttpBody::Json(value) => (Some(value.clone()), Vec::new()),
            HttpBody::Multipart(parts) => (
                None,
                parts
                    .iter()
                    .map(|p| match p {
                        FormPart::Text { name, value } => (name.clone(), value.clone()),
                        FormPart::File {
                            name, file_name, ..
                        } => (name.clone(), file_name.clone()),
                    })
                    .collect(),
            ),
        };

        self.requests.lock().push(RecordedRequest {
            method: request.method,
            url: request.url.clone(),
            had_bearer: request.bearer.is_some(),
            json,
            form_fields,
        });
    }

    async fn wait_for_gate(&self) {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn next_response(&self) -> Result<HttpResponse, DomainError> {
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(DomainError::Network("no scripted response".to_string())))
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, DomainError> {
        self.record(&request);
        self.wait_for_gate().await;
        self.next_response()
    }

    async fn download_file(
        &self,
        url: &str,
        path: &Path,
        _egress: Egress,
        progress_callback: Option<Box<dyn Fn(u64, u64) + Send + Sync>>,
    ) -> Result<u64, DomainError> {
        self.record(&HttpRequest::get(url));
        self.wait_for_gate().await;

        let response = self
            .next_response()
            .map_err(|e| DomainError::Download(e.to_string()))?;
        if !response.is_success() {
            return Err(DomainError::Download(format!("HTTP {} for {}", response.status, url)));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &response.body).await?;

        let size = response.body.len() as u64;
        if let Some(callback) = progress_callback {
            callback(size, size);
        }
        Ok(size)
    }

    fn is_network_blocked(&self) -> bool {
        false
    }
}

/// Real guard whose client talks to loopback servers directly.
pub fn loopback_guard(privacy: &PrivacyConfig) -> NetworkGuard {
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    NetworkGuard::with_client(client, privacy)
}

/// Serve `body` once over plain HTTP on a loopback port; returns the base URL.
pub async fn serve_once(body: &'static [u8]) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{}", addr)
}

/// A call the playback controller made on the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    BeginLoad(LoadGeneration, SourceLocator),
    Play,
    Pause,
    Seek(f64),
    SetVolume(f64),
    Unload,
}

/// Media host that records calls; `play` can be held or made to fail.
#[derive(Default)]
pub struct MockMediaHost {
    calls: Mutex<Vec<HostCall>>,
    play_error: Mutex<Option<String>>,
    play_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockMediaHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub fn fail_play(&self, message: &str) {
        *self.play_error.lock() = Some(message.to_string());
    }

    pub fn hold_play(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.play_gate.lock() = Some(notify.clone());
        notify
    }

    /// Generation handed to the most recent `begin_load`.
    pub fn last_generation(&self) -> Option<LoadGeneration> {
        self.calls.lock().iter().rev().find_map(|c| match c {
            HostCall::BeginLoad(generation, _) => Some(*generation),
            _ => None,
        })
    }
}

#[async_trait]
impl MediaHost for MockMediaHost {
    fn begin_load(&self, generation: LoadGeneration, source: &SourceLocator) {
        self.calls
            .lock()
            .push(HostCall::BeginLoad(generation, source.clone()));
    }

    async fn play(&self) -> Result<(), DomainError> {
        self.calls.lock().push(HostCall::Play);

        let gate = self.play_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.play_error.lock().clone() {
            Some(message) => Err(DomainError::Playback(message)),
            None => Ok(()),
        }
    }

    fn pause(&self) {
        self.calls.lock().push(HostCall::Pause);
    }

    fn seek(&self, position_secs: f64) {
        self.calls.lock().push(HostCall::Seek(position_secs));
    }

    fn set_volume(&self, level: f64) {
        self.calls.lock().push(HostCall::SetVolume(level));
    }

    fn unload(&self) {
        self.calls.lock().push(HostCall::Unload);
    }
}
