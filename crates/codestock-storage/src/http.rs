use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_RANGE;

use crate::error::StorageError;
use crate::execute::{RawResponse, Transport};
use crate::query::RequestDescriptor;

/// [`Transport`] over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, StorageError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("codestock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: RequestDescriptor) -> Result<RawResponse, StorageError> {
        let RequestDescriptor {
            method,
            url,
            headers,
            body,
        } = request;

        let mut req = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req.send().await.map_err(map_reqwest_error)?;

        let status = resp.status();
        let content_range = resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await.map_err(map_reqwest_error)?.to_vec();

        Ok(RawResponse {
            status,
            content_range,
            body,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> StorageError {
    if e.is_timeout() {
        StorageError::Timeout
    } else {
        StorageError::Transport(e.to_string())
    }
}
