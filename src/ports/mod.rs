pub mod config;
pub mod http;
pub mod media;
pub mod storage;

pub use config::ConfigStore;
pub use http::{Egress, FormPart, HttpBody, HttpClient, HttpRequest, HttpResponse, Method};
pub use media::{MediaHost, TransientResources};
pub use storage::KeyValueStore;
