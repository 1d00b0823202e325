//! # POST /generate-data-packet-qr
//!
//! 署名済みリクエストのディープリンクとQRコードを生成する。

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use verus_request_types::GenerateQrResponse;

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::signing;

/// POST /generate-data-packet-qr: 検証・組み立て・署名・ディープリンク化・QR描画。
///
/// レスポンス先（`redirects`）は必須。
pub async fn handle_generate_qr(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> Result<Json<GenerateQrResponse>, GatewayError> {
    let payload = super::parse_payload(&body)?;
    let response = signing::generate_qr(&state, &payload).await?;
    Ok(Json(response))
}
