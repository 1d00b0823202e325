//! # Verus Request Gateway
//!
//! Verusウォレット向けの「データパケット」リクエストを組み立て、
//! 外部の署名デーモンに署名させ、ディープリンク/QRコードとして返すHTTPサーバー。
//!
//! ## 役割
//! - フォーム入力の検証とリクエスト詳細の組み立て
//! - 署名デーモン（JSON-RPC `signdata`）への署名依頼
//! - 署名済みエンベロープのディープリンク化とQR描画
//!
//! 秘密鍵は持たず、署名の暗号学的検証も行わない。
//!
//! ## API エンドポイント
//! - `POST /generate-data-packet-qr`: 署名済みディープリンク + QR画像
//! - `POST /sign-data-packet`: リクエスト詳細への署名のみ
//! - `GET /health`: 稼働確認

mod config;
mod endpoints;
mod error;
mod qr;
mod rpc;
mod signer;
mod signing;

use std::sync::Arc;

use clap::Parser;

use crate::config::{GatewayConfig, GatewayState};
use crate::endpoints::{handle_generate_qr, handle_health, handle_sign_data_packet};
use crate::rpc::VerusRpcClient;

/// ルーティングを構築する。
fn router(state: Arc<GatewayState>) -> axum::Router {
    axum::Router::new()
        .route(
            "/generate-data-packet-qr",
            axum::routing::post(handle_generate_qr),
        )
        .route("/sign-data-packet", axum::routing::post(handle_sign_data_packet))
        .route("/health", axum::routing::get(handle_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::parse();
    let system_id = config.resolve_system_id()?;
    let signer = VerusRpcClient::from_config(&config)?;

    if config.rpc_user.is_empty() {
        tracing::warn!("VERUS_RPC_USERが未設定です。署名デーモンの認証に失敗する可能性があります");
    }
    tracing::info!(
        rpc_url = %signer.url(),
        rpc_timeout_secs = config.rpc_timeout_secs,
        system_id = %system_id,
        testnet = config.testnet,
        "署名デーモンの設定"
    );

    let state = Arc::new(GatewayState {
        signer: Box::new(signer),
        system_id,
        testnet: config.testnet,
    });

    tracing::info!("Gatewayを {} で起動します", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::Json;
    use verus_request_crypto::IAddress;

    use crate::config::{VRSCTEST_SYSTEM_ID, VRSC_SYSTEM_ID};
    use crate::error::{GatewayError, OPAQUE_ERROR_MESSAGE};
    use crate::signer::testing::MockSigner;

    /// テスト用GatewayStateを構築するヘルパー
    fn test_state(signer: Box<dyn signer::MessageSigner>, testnet: bool) -> Arc<GatewayState> {
        let system_id = if testnet {
            VRSCTEST_SYSTEM_ID
        } else {
            VRSC_SYSTEM_ID
        };
        Arc::new(GatewayState {
            signer,
            system_id: IAddress::parse(system_id).unwrap(),
            testnet,
        })
    }

    /// サーバーを起動し、ベースURLを返す
    async fn spawn(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        format!("http://127.0.0.1:{port}")
    }

    #[tokio::test]
    async fn test_health() {
        let (signer, _) = MockSigner::ok();
        let Json(response) = handle_health(State(test_state(Box::new(signer), true))).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.system_id, VRSCTEST_SYSTEM_ID);
        assert!(response.testnet);
    }

    /// 不正なJSON本文は入力検証エラーになり、署名は呼ばれない
    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let (signer, calls) = MockSigner::ok();
        let state = test_state(Box::new(signer), false);

        let result =
            handle_generate_qr(State(state.clone()), Bytes::from_static(b"{not json")).await;
        assert!(matches!(result, Err(GatewayError::Validation(ref e)) if e.field == "body"));

        let result = handle_sign_data_packet(
            State(state),
            Bytes::from_static(br#"{"signingId":"alice@","flagHasStatements":"maybe"}"#),
        )
        .await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_handler_with_mock_signer() {
        let (signer, calls) = MockSigner::ok();
        let state = test_state(Box::new(signer), false);

        let body = serde_json::json!({
            "signingId": "alice@",
            "signableObjects": "[{\"objectdata\":\"cafe\"}]",
        });
        let result = handle_sign_data_packet(State(state), Bytes::from(body.to_string())).await;

        assert!(result.is_ok(), "handle_sign_data_packet failed: {:?}", result.err());
        let response = result.unwrap().0;
        assert_eq!(calls.lock().unwrap()[0].message_hex, response.message_hex);
    }

    /// モック署名デーモンとGatewayを起動し、HTTP経由で両経路とエラー応答を確認
    #[tokio::test]
    async fn test_end_to_end_with_mock_daemon() {
        let mock_daemon = axum::Router::new().route(
            "/",
            axum::routing::post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["method"], "signdata");
                let address = body["params"][0]["address"].as_str().unwrap_or_default();
                if address == "nobody@" {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(serde_json::json!({
                            "result": null,
                            "error": { "code": -5, "message": "Invalid identity" },
                            "id": body["id"].clone(),
                        })),
                    );
                }
                (
                    StatusCode::OK,
                    Json(serde_json::json!({
                        "result": {
                            "hash": "00",
                            "signature": "Hx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8fHx8=",
                            "identityaddress": "i52mN9h1LQxq1JmJu64fRoFN79u1ibcXG2",
                        },
                        "error": null,
                        "id": body["id"].clone(),
                    })),
                )
            }),
        );
        let daemon_url = spawn(mock_daemon).await;

        let signer =
            VerusRpcClient::new(&daemon_url, "user", "pass", Duration::from_secs(5)).unwrap();
        let gateway_url = spawn(router(test_state(Box::new(signer), false))).await;
        let client = reqwest::Client::new();

        // 埋め込み経路
        let response = client
            .post(format!("{gateway_url}/generate-data-packet-qr"))
            .json(&serde_json::json!({
                "signingId": "alice@",
                "flagHasUrlForDownload": true,
                "downloadUrl": "https://x.test/f",
                "redirects": [{ "type": "1", "uri": "https://a" }],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["deeplink"].as_str().unwrap().starts_with("verus://1/"));
        assert!(body["qrImage"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));

        // 署名のみ経路
        let response = client
            .post(format!("{gateway_url}/sign-data-packet"))
            .json(&serde_json::json!({
                "signingId": "alice@",
                "flagHasUrlForDownload": true,
                "downloadUrl": "https://x.test/f",
                "dataHash": "0".repeat(64),
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["signatureData"]["systemid"], VRSC_SYSTEM_ID);
        assert!(body["messageHex"].as_str().is_some());

        // 入力検証エラーは400でフィールド名を含む
        let response = client
            .post(format!("{gateway_url}/generate-data-packet-qr"))
            .json(&serde_json::json!({
                "signingId": "alice@",
                "signableObjects": [{ "objectdata": "00" }],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("redirects:"));

        // 署名デーモンのエラーは502で詳細を返さない
        let response = client
            .post(format!("{gateway_url}/sign-data-packet"))
            .json(&serde_json::json!({
                "signingId": "nobody@",
                "signableObjects": [{ "objectdata": "00" }],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], OPAQUE_ERROR_MESSAGE);

        // ヘルスチェック
        let response = client
            .get(format!("{gateway_url}/health"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
