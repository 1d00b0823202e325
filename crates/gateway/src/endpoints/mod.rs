//! # Gatewayエンドポイント
//!
//! リクエスト本文は生のバイト列として受け取り、ここでパースする。
//! 不正なJSONもフレームワークの拒否ではなく入力検証エラー（400）として返す。

pub mod generate_qr;
pub mod health;
pub mod sign;

pub use generate_qr::handle_generate_qr;
pub use health::handle_health;
pub use sign::handle_sign_data_packet;

use verus_request_core::ValidationError;
use verus_request_types::DataPacketPayload;

/// リクエスト本文をデータパケットの入力ペイロードとしてパースする。
pub(crate) fn parse_payload(body: &[u8]) -> Result<DataPacketPayload, ValidationError> {
    serde_json::from_slice(body)
        .map_err(|e| ValidationError::new("body", format!("JSONとして解釈できません: {e}")))
}
