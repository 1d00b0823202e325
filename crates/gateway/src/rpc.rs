//! # 署名デーモン JSON-RPC クライアント
//!
//! Basic認証付きのJSON-RPC 1.0で `signdata` を呼び出す。
//! デーモンはエラー時にHTTP 500とJSON-RPCのエラーエンベロープを返すため、
//! ステータスに関係なく本文を先にパースする。

use std::time::Duration;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::signer::MessageSigner;

/// 署名デーモンのJSON-RPCクライアント。
pub struct VerusRpcClient {
    http_client: reqwest::Client,
    url: String,
    user: String,
    password: String,
}

impl VerusRpcClient {
    pub fn new(
        url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("HTTPクライアントの構築に失敗: {e}")))?;
        Ok(Self {
            http_client,
            url: url.into(),
            user: user.into(),
            password: password.into(),
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Self::new(
            config.rpc_url(),
            config.rpc_user.clone(),
            config.rpc_password.clone(),
            config.rpc_timeout(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// JSON-RPCメソッドを呼び出し、`result` を返す。
    pub async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let id = uuid::Uuid::new_v4().to_string();
        let rpc_request = serde_json::json!({
            "jsonrpc": "1.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http_client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&rpc_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::SignerUnavailable(format!("{method}がタイムアウトしました: {e}"))
                } else {
                    GatewayError::SignerUnavailable(format!("RPC送信失敗: {e}"))
                }
            })?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| GatewayError::SignerUnavailable(format!("レスポンス読み取り失敗: {e}")))?;

        let rpc_body: serde_json::Value = match serde_json::from_str(&response_body) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(GatewayError::SignerUnavailable(format!(
                    "署名デーモンがHTTP {status}を返しました"
                )));
            }
            Err(e) => {
                return Err(GatewayError::MalformedSignerResponse(format!(
                    "RPCレスポンスのパースに失敗: {e}"
                )));
            }
        };

        if let Some(error) = rpc_body.get("error").filter(|e| !e.is_null()) {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or_default();
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(GatewayError::SignerRejected { code, message });
        }

        match rpc_body.get("result") {
            Some(result) if !result.is_null() => Ok(result.clone()),
            _ => Err(GatewayError::MalformedSignerResponse(
                "RPCレスポンスにresultがありません".to_string(),
            )),
        }
    }
}

#[async_trait::async_trait]
impl MessageSigner for VerusRpcClient {
    async fn sign_message(
        &self,
        address: &str,
        message_hex: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        tracing::debug!(address = %address, message_len = message_hex.len() / 2, "signdataを呼び出します");
        self.call(
            "signdata",
            serde_json::json!([{ "address": address, "messagehex": message_hex }]),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::Json;

    /// モックデーモンを起動し、URLを返す
    async fn spawn_daemon(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        format!("http://127.0.0.1:{port}")
    }

    fn client(url: &str) -> VerusRpcClient {
        VerusRpcClient::new(url, "rpcuser", "rpcpass", Duration::from_secs(5)).unwrap()
    }

    /// signdataの呼び出し形式（Basic認証・メソッド・パラメータ）を確認
    #[tokio::test]
    async fn test_signdata_request_shape() {
        let daemon = axum::Router::new().route(
            "/",
            axum::routing::post(
                |headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                    // "rpcuser:rpcpass" のBase64
                    assert_eq!(
                        headers.get("authorization").unwrap().to_str().unwrap(),
                        "Basic cnBjdXNlcjpycGNwYXNz"
                    );
                    assert_eq!(body["jsonrpc"], "1.0");
                    assert_eq!(body["method"], "signdata");
                    assert!(body["id"].as_str().is_some());
                    assert_eq!(body["params"][0]["address"], "alice@");
                    assert_eq!(body["params"][0]["messagehex"], "deadbeef");

                    Json(serde_json::json!({
                        "result": { "signature": "AQID", "hash": "00" },
                        "error": null,
                        "id": body["id"].clone(),
                    }))
                },
            ),
        );
        let url = spawn_daemon(daemon).await;

        let result = client(&url).sign_message("alice@", "deadbeef").await;
        assert!(result.is_ok(), "sign_message failed: {:?}", result.err());
        assert_eq!(result.unwrap()["signature"], "AQID");
    }

    /// HTTP 500 + エラーエンベロープはデーモンのエラーとして扱う
    #[tokio::test]
    async fn test_error_envelope_on_http_500() {
        let daemon = axum::Router::new().route(
            "/",
            axum::routing::post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "result": null,
                        "error": { "code": -5, "message": "Invalid identity or identity not in wallet" },
                        "id": "x",
                    })),
                )
            }),
        );
        let url = spawn_daemon(daemon).await;

        match client(&url).sign_message("nobody@", "00").await {
            Err(GatewayError::SignerRejected { code, message }) => {
                assert_eq!(code, -5);
                assert!(message.contains("Invalid identity"));
            }
            other => panic!("SignerRejectedを期待しました: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_result_is_malformed() {
        let daemon = axum::Router::new().route(
            "/",
            axum::routing::post(|| async {
                Json(serde_json::json!({ "result": null, "error": null, "id": "x" }))
            }),
        );
        let url = spawn_daemon(daemon).await;

        assert!(matches!(
            client(&url).sign_message("alice@", "00").await,
            Err(GatewayError::MalformedSignerResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_non_json_error_page() {
        let daemon = axum::Router::new().route(
            "/",
            axum::routing::post(|| async { (StatusCode::UNAUTHORIZED, "unauthorized") }),
        );
        let url = spawn_daemon(daemon).await;

        assert!(matches!(
            client(&url).sign_message("alice@", "00").await,
            Err(GatewayError::SignerUnavailable(_))
        ));
    }

    /// 応答しないデーモンはタイムアウトで署名者エラーになる
    #[tokio::test]
    async fn test_timeout_is_signer_unavailable() {
        let daemon = axum::Router::new().route(
            "/",
            axum::routing::post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({ "result": {}, "error": null }))
            }),
        );
        let url = spawn_daemon(daemon).await;

        let client =
            VerusRpcClient::new(&url, "u", "p", Duration::from_millis(200)).unwrap();
        assert!(matches!(
            client.sign_message("alice@", "00").await,
            Err(GatewayError::SignerUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_daemon() {
        // バインドしてすぐ閉じたポート
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = client(&format!("http://127.0.0.1:{port}"));
        assert!(matches!(
            client.sign_message("alice@", "00").await,
            Err(GatewayError::SignerUnavailable(_))
        ));
    }
}
