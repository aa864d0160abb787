use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use codestock_core::error::CoreError;
use codestock_storage::error::StorageError;

pub const MSG_NOT_FOUND: &str = "スニペットが見つかりません";
pub const MSG_TOO_LARGE: &str =
    "データサイズが大きすぎます。コードを短くするか、画像URLを使用してください。";
pub const MSG_CONFIG: &str = "サーバー設定エラーです";
pub const MSG_MALFORMED: &str = "データベースからの応答が無効です";
pub const MSG_INTERNAL: &str = "サーバーエラーが発生しました";

/// Unified API error type for all route handlers.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    PayloadTooLarge,
    /// Store credentials are missing or unusable.
    Config(String),
    /// Non-success status from the store, passed through when it is an error
    /// status.
    Upstream { status: u16, detail: String },
    MalformedUpstream(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, MSG_TOO_LARGE.to_string()),
            ApiError::Config(msg) => {
                tracing::error!("store configuration error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_CONFIG.to_string())
            }
            ApiError::Upstream { status, detail } => {
                tracing::warn!(status, "store error: {detail}");
                let code = StatusCode::from_u16(status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (code, format!("データベースエラー: {status}"))
            }
            ApiError::MalformedUpstream(msg) => {
                tracing::error!("malformed store response: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_MALFORMED.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Config(msg) => ApiError::Config(msg),
            StorageError::NotFound { .. } => ApiError::NotFound(MSG_NOT_FOUND.to_string()),
            StorageError::PayloadTooLarge { .. } => ApiError::PayloadTooLarge,
            StorageError::Invalid(core) => core.into(),
            StorageError::Upstream { status, body } => ApiError::Upstream {
                status,
                detail: body,
            },
            StorageError::MalformedResponse(msg) => ApiError::MalformedUpstream(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::MissingField(field) => {
                ApiError::BadRequest(format!("必須項目が入力されていません: {field}"))
            }
            CoreError::EmptyPatch => ApiError::BadRequest("更新する項目がありません".to_string()),
            // No stored row has an id that is not a UUID.
            CoreError::InvalidUuid(_) => ApiError::NotFound(MSG_NOT_FOUND.to_string()),
            CoreError::Serialization(e) => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::BadRequest(format!(
            "リクエストの形式が正しくありません: {}",
            rejection.body_text()
        ))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(format!(
            "検索条件が正しくありません: {}",
            rejection.body_text()
        ))
    }
}
