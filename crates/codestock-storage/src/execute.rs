use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StorageError;
use crate::query::RequestDescriptor;

/// Status, row-count header, and raw body of one store response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_range: Option<String>,
    pub body: Vec<u8>,
}

/// Sends a rendered request. One call is one network round trip; no retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: RequestDescriptor) -> Result<RawResponse, StorageError>;
}

/// Decoded result of a successful request.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    /// Parsed body; `Null` when the store answered with an empty body.
    pub data: Value,
    /// Total from `Content-Range`, when the store reported one.
    pub count: Option<u64>,
}

impl QueryOutput {
    /// Decode the body as rows. An empty body is zero rows; a lone object is
    /// one row.
    pub fn rows<T: DeserializeOwned>(self) -> Result<Vec<T>, StorageError> {
        let rows = match self.data {
            Value::Null => return Ok(Vec::new()),
            Value::Array(rows) => rows,
            obj @ Value::Object(_) => vec![obj],
            other => {
                return Err(StorageError::MalformedResponse(format!(
                    "expected rows, got {other}"
                )));
            }
        };

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| StorageError::MalformedResponse(e.to_string()))
            })
            .collect()
    }
}

/// Issue `request` and normalize the outcome.
///
/// Non-success statuses become [`StorageError::Upstream`] carrying the raw
/// body text; a success body that is not JSON becomes
/// [`StorageError::MalformedResponse`].
pub async fn execute(
    transport: &dyn Transport,
    request: RequestDescriptor,
) -> Result<QueryOutput, StorageError> {
    let method = request.method.clone();
    let path = request.url.path().to_string();

    let response = transport.send(request).await?;
    let status = response.status;

    if !status.is_success() {
        let body = String::from_utf8_lossy(&response.body).into_owned();
        tracing::warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            "store request failed"
        );
        return Err(StorageError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let data = if response.body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&response.body).map_err(|e| {
            tracing::error!(method = %method, path = %path, "store response is not JSON: {e}");
            StorageError::MalformedResponse(e.to_string())
        })?
    };

    let count = response
        .content_range
        .as_deref()
        .and_then(content_range_total);

    tracing::debug!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        count = ?count,
        "store request complete"
    );

    Ok(QueryOutput { data, count })
}

/// Total from a `Content-Range` value such as `0-24/310` or `*/0`.
/// An unknown total (`*`) yields `None`.
pub fn content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}
