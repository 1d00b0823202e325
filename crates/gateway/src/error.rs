//! # Gateway エラー型
//!
//! 入力検証エラー（400）とそれ以外の処理エラー（5xx）の2種類に分かれる。
//! 処理エラーの詳細はサーバー側のログにだけ残し、呼び出し元には定型文を返す。

use axum::http::StatusCode;
use axum::Json;
use verus_request_core::ValidationError;
use verus_request_types::ErrorResponse;

/// 処理エラー時に呼び出し元へ返すメッセージ
pub const OPAQUE_ERROR_MESSAGE: &str = "リクエストの処理に失敗しました";

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 入力検証エラー
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// 署名デーモンに到達できない（接続失敗・タイムアウト）
    #[error("署名デーモンに接続できません: {0}")]
    SignerUnavailable(String),
    /// 署名デーモンがJSON-RPCのエラーを返した
    #[error("署名デーモンがエラーを返しました: code={code} message={message}")]
    SignerRejected {
        /// JSON-RPCのエラーコード
        code: i64,
        /// JSON-RPCのエラーメッセージ
        message: String,
    },
    /// 署名デーモンの応答に署名が無い、または形式が不正
    #[error("署名デーモンの応答が不正です: {0}")]
    MalformedSignerResponse(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::SignerUnavailable(_)
            | GatewayError::SignerRejected { .. }
            | GatewayError::MalformedSignerResponse(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            GatewayError::Validation(e) => {
                tracing::warn!(field = %e.field, reason = %e.reason, "入力検証に失敗しました");
                e.to_string()
            }
            other => {
                tracing::error!(error = %other, status = %status, "リクエストの処理に失敗しました");
                OPAQUE_ERROR_MESSAGE.to_string()
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
