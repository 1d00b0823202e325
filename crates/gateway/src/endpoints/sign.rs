//! # POST /sign-data-packet
//!
//! リクエスト詳細だけに署名し、署名データを返す。

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use verus_request_types::SignDataPacketResponse;

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::signing;

/// POST /sign-data-packet: エンベロープなしで詳細に署名する。
///
/// 返した `signatureData` は後続の `generate-data-packet-qr` で
/// `flagHasSignature` と一緒に渡されることを想定している。
pub async fn handle_sign_data_packet(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> Result<Json<SignDataPacketResponse>, GatewayError> {
    let payload = super::parse_payload(&body)?;
    let response = signing::sign_data_packet(&state, &payload).await?;
    Ok(Json(response))
}
