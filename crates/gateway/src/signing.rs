//! # 署名オーケストレーション
//!
//! 組み立てたリクエストを署名デーモンに署名させる。
//!
//! - 埋め込み経路: 詳細をエンベロープに包んで署名し、ディープリンクとQRコードにする
//! - 署名のみ経路: 詳細だけを署名し、署名データと署名対象hexを返す
//!
//! どちらも入力検証をすべて終えてから署名デーモンを1回だけ呼ぶ。リトライはしない。

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use verus_request_core::signature::SIGNATURE_DATA_VERSION;
use verus_request_core::{
    build_request, GenericRequest, HashType, RequestDetail, VerifiableSignatureData,
};
use verus_request_crypto::IAddress;
use verus_request_types::{DataPacketPayload, GenerateQrResponse, SignDataPacketResponse};

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::qr;
use crate::signer::SignDataResult;

/// 埋め込み経路: 署名済みのディープリンクとQR画像を返す。
pub async fn generate_qr(
    state: &GatewayState,
    payload: &DataPacketPayload,
) -> Result<GenerateQrResponse, GatewayError> {
    let built = build_request(payload)?;
    let redirects = built.require_redirects()?.to_vec();

    let created_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| GatewayError::Internal(format!("時刻取得失敗: {e}")))?
        .as_secs();

    let request = GenericRequest::new(
        vec![RequestDetail::DataPacket(built.details)],
        redirects,
        Some(created_at),
        state.testnet,
    );
    let message_hex = hex::encode(request.signing_bytes());

    let signature = sign(state, &built.signing_id, &message_hex).await?;
    let signed = request.with_signature(signature);

    let deeplink = signed.to_deeplink_uri();
    let qr_image = qr::render_data_url(&deeplink)?;

    tracing::info!(
        signing_id = %built.signing_id,
        deeplink_len = deeplink.len(),
        "署名済みリクエストを生成しました"
    );

    Ok(GenerateQrResponse { deeplink, qr_image })
}

/// 署名のみ経路: 詳細単体の署名データと、署名対象のhexを返す。
///
/// 返した署名は後の埋め込み経路で `signatureData` として渡される想定で、
/// ここでは保存も照合もしない。
pub async fn sign_data_packet(
    state: &GatewayState,
    payload: &DataPacketPayload,
) -> Result<SignDataPacketResponse, GatewayError> {
    let built = build_request(payload)?;
    let message_hex = hex::encode(built.details.signing_bytes());

    let signature = sign(state, &built.signing_id, &message_hex).await?;

    tracing::info!(
        signing_id = %built.signing_id,
        flags = built.details.flags.bits(),
        "リクエスト詳細に署名しました"
    );

    Ok(SignDataPacketResponse {
        signature_data: signature.to_json(),
        message_hex,
    })
}

async fn sign(
    state: &GatewayState,
    signing_id: &str,
    message_hex: &str,
) -> Result<VerifiableSignatureData, GatewayError> {
    let result = state.signer.sign_message(signing_id, message_hex).await?;
    normalize_signature(&result, signing_id, state.system_id)
}

/// 署名デーモンの結果を検証可能な署名データに正規化する。
///
/// - `signature`（Base64）は必須
/// - IDは `identityaddress` → `address` → 署名IDがi-addressならそれ、の順で決める
/// - `hashtype` 省略時はsha256
pub fn normalize_signature(
    result: &serde_json::Value,
    signing_id: &str,
    system_id: IAddress,
) -> Result<VerifiableSignatureData, GatewayError> {
    let result: SignDataResult = serde_json::from_value(result.clone()).map_err(|e| {
        GatewayError::MalformedSignerResponse(format!("signdataの結果を解釈できません: {e}"))
    })?;

    let signature_b64 = result
        .signature
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            GatewayError::MalformedSignerResponse("signatureがありません".to_string())
        })?;
    let signature = base64::engine::general_purpose::STANDARD
        .decode(signature_b64)
        .map_err(|e| {
            GatewayError::MalformedSignerResponse(format!("signatureのBase64デコードに失敗: {e}"))
        })?;
    if signature.is_empty() {
        return Err(GatewayError::MalformedSignerResponse(
            "signatureが空です".to_string(),
        ));
    }

    let identity_id = match result
        .identityaddress
        .as_deref()
        .or(result.address.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(address) => IAddress::parse(address).map_err(|e| {
            GatewayError::MalformedSignerResponse(format!("署名者IDが不正です: {address}: {e}"))
        })?,
        None => IAddress::parse(signing_id.trim()).map_err(|_| {
            GatewayError::MalformedSignerResponse(
                "署名者IDを応答からも署名IDからも決定できません".to_string(),
            )
        })?,
    };

    let hash_type = match result.hashtype.as_deref() {
        None => HashType::Sha256,
        Some(name) => HashType::parse(name)
            .map_err(|e| GatewayError::MalformedSignerResponse(e.to_string()))?,
    };

    Ok(VerifiableSignatureData {
        version: SIGNATURE_DATA_VERSION,
        hash_type,
        system_id,
        identity_id,
        signature_height: result.signatureheight,
        signature,
    })
}
