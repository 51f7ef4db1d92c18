//! Azure Blob service client
//!
//! Only the three calls the publisher needs: create container, probe blob,
//! put block blob. Requests are authorised with a SAS token appended to the
//! query string.

use super::{BlobTarget, ContentStore};
use crate::core::error::{PublishError, Result};
use crate::security::credential::{SasCredential, mask_sas_in};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, IF_NONE_MATCH};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};

/// REST API version sent with every request
pub const STORAGE_API_VERSION: &str = "2021-08-06";

/// Client for one storage account endpoint
pub struct BlobServiceClient {
    client: Client,
    endpoint: Url,
    credential: Option<SasCredential>,
}

impl BlobServiceClient {
    pub fn new(endpoint: &str, credential: Option<SasCredential>) -> Result<Self> {
        let raw = endpoint.trim().trim_end_matches('/');
        let endpoint = Url::parse(raw)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| {
                PublishError::Config(format!(
                    "storage endpoint must be an http(s) URL, got '{}'",
                    raw
                ))
            })?;

        let client = Client::builder()
            .user_agent(concat!("dsc-publisher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PublishError::Config(format!("failed to build HTTP client: {}", e)))?;

        if credential.is_none() {
            tracing::warn!("no SAS token configured; requests to {} are anonymous", endpoint);
        }

        Ok(Self {
            client,
            endpoint,
            credential,
        })
    }

    /// Endpoint URL with `segments` appended as percent-encoded path segments
    fn resource(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Request URL with the SAS token appended to `query`
    fn url(&self, segments: &[&str], query: Option<&str>) -> Url {
        let mut url = self.resource(segments);
        let sas = self.credential.as_ref().map(|c| c.query());
        let params: Vec<&str> = query.into_iter().chain(sas).collect();
        if !params.is_empty() {
            url.set_query(Some(&params.join("&")));
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str], query: Option<&str>) -> RequestBuilder {
        self.client
            .request(method, self.url(segments, query))
            .headers(common_headers())
    }

    async fn send(&self, request: RequestBuilder, target: &str) -> Result<reqwest::Response> {
        request.send().await.map_err(|e| PublishError::Storage {
            target: target.to_string(),
            message: mask_sas_in(&e.without_url().to_string()),
        })
    }
}

fn common_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ms-version", HeaderValue::from_static(STORAGE_API_VERSION));
    let date = chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    if let Ok(value) = HeaderValue::from_str(&date) {
        headers.insert("x-ms-date", value);
    }
    headers
}

/// Map a failed response status to an error
fn status_error(status: StatusCode, target: &str, body: &str) -> PublishError {
    let detail = error_code(body).unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PublishError::PermissionDenied {
            target: target.to_string(),
            message: detail,
        },
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
            PublishError::DestinationExists {
                destination: target.to_string(),
            }
        }
        _ => PublishError::Storage {
            target: target.to_string(),
            message: format!("HTTP {}: {}", status.as_u16(), detail),
        },
    }
}

/// `<Code>` element of a storage error body
fn error_code(body: &str) -> Option<String> {
    let start = body.find("<Code>")? + "<Code>".len();
    let end = body[start..].find("</Code>")? + start;
    Some(body[start..end].to_string())
}

#[async_trait]
impl ContentStore for BlobServiceClient {
    fn name(&self) -> &str {
        "azure-blob"
    }

    async fn ensure_container(&self, container: &str) -> Result<()> {
        let response = self
            .send(
                self.request(Method::PUT, &[container], Some("restype=container")),
                container,
            )
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                tracing::info!(container, "created container");
                Ok(())
            }
            // ContainerAlreadyExists
            StatusCode::CONFLICT => {
                tracing::debug!(container, "container already exists");
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(status_error(status, container, &body))
            }
        }
    }

    async fn blob_exists(&self, target: &BlobTarget) -> Result<bool> {
        let path = target.to_string();
        let response = self
            .send(self.request(Method::HEAD, &blob_segments(target), None), &path)
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(status_error(status, &path, "")),
        }
    }

    async fn upload_blob(
        &self,
        target: &BlobTarget,
        content: Vec<u8>,
        overwrite: bool,
    ) -> Result<String> {
        let path = target.to_string();
        let size = content.len();
        let mut request = self
            .request(Method::PUT, &blob_segments(target), None)
            .header("x-ms-blob-type", "BlockBlob")
            .header(CONTENT_TYPE, "application/zip")
            .body(content);
        if !overwrite {
            request = request.header(IF_NONE_MATCH, "*");
        }

        let response = self.send(request, &path).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &self.blob_uri(target), &body));
        }

        tracing::info!(blob = %path, bytes = size, "uploaded blob");
        Ok(self.blob_uri(target))
    }

    fn blob_uri(&self, target: &BlobTarget) -> String {
        self.resource(&blob_segments(target)).to_string()
    }
}

fn blob_segments(target: &BlobTarget) -> [&str; 2] {
    [target.container.as_str(), target.blob.as_str()]
}
