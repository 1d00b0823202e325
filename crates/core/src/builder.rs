//! # リクエスト組み立て
//!
//! 検証済みの入力から [`DataPacketRequestDetails`] を組み立てる。
//!
//! 検査は次の固定順序で行い、最初の失敗で打ち切る。
//! 1. HAS_SIGNATURE / FOR_USERS_SIGNATURE の相互排他
//! 2. 署名ID
//! 3. フラグの組み立て
//! 4. 署名対象オブジェクト（URLモード または 明示オブジェクト）
//! 5. ステートメント（フラグで制御）
//! 6. リクエストID（フラグで制御）
//! 7. 埋め込む署名（フラグで制御）
//! 8. レスポンス先（存在する場合のみ検証）
//!
//! 署名デーモンへの呼び出しはこのモジュールの外で、すべての検査が通った後に行う。

use verus_request_types::DataPacketPayload;

use crate::codec::{CodecError, Decode, Encode};
use crate::data_descriptor::DataDescriptor;
use crate::details::{DataPacketRequestDetails, RequestFlags, DATA_PACKET_DETAILS_VERSION};
use crate::envelope::ResponseUri;
use crate::url_ref::{CrossChainDataRef, UrlRef};
use crate::validate::{self, ValidationError};
use crate::vdxf::VdxfUniValue;

/// 組み立て済みのリクエスト。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRequest {
    /// 署名に使うID（デーモンへそのまま渡す）
    pub signing_id: String,
    pub details: DataPacketRequestDetails,
    /// レスポンス先（入力順）。指定がなければ `None`
    pub redirects: Option<Vec<ResponseUri>>,
}

impl BuiltRequest {
    /// レスポンス先を必須として取り出す（埋め込み・エンコード経路用）。
    pub fn require_redirects(&self) -> Result<&[ResponseUri], ValidationError> {
        match self.redirects.as_deref() {
            Some(redirects) if !redirects.is_empty() => Ok(redirects),
            _ => Err(ValidationError::new(
                "redirects",
                "リダイレクト先を1つ以上指定してください",
            )),
        }
    }
}

/// ペイロードを検証し、リクエスト詳細を組み立てる。
pub fn build_request(payload: &DataPacketPayload) -> Result<BuiltRequest, ValidationError> {
    validate::check_signature_exclusivity(payload)?;
    let signing_id = validate::parse_signing_id(payload.signing_id.as_deref())?;

    let flags = validate::compose_flags(validate::flag_inputs(payload));

    let signable_objects = if flags.contains(RequestFlags::HAS_URL_FOR_DOWNLOAD) {
        // URLモードでは明示オブジェクトは解釈すらしない
        vec![build_url_descriptor(
            payload.download_url.as_deref(),
            payload.data_hash.as_deref(),
        )?]
    } else {
        validate::parse_signable_objects(payload.signable_objects.as_ref())?.ok_or_else(|| {
            ValidationError::new(
                "signableObjects",
                "署名対象オブジェクトを1つ以上指定してください",
            )
        })?
    };

    let statements = if flags.contains(RequestFlags::HAS_STATEMENTS) {
        Some(
            validate::parse_statements(payload.statements.as_ref())?.ok_or_else(|| {
                ValidationError::new(
                    "statements",
                    "flagHasStatementsが指定されていますがステートメントがありません",
                )
            })?,
        )
    } else {
        None
    };

    let request_id = if flags.contains(RequestFlags::HAS_REQUEST_ID) {
        let parsed = match &payload.request_id {
            Some(input) => validate::parse_compact_address("requestId", input)?,
            None => None,
        };
        Some(parsed.ok_or_else(|| {
            ValidationError::new(
                "requestId",
                "flagHasRequestIdが指定されていますがリクエストIDがありません",
            )
        })?)
    } else {
        None
    };

    let signature = if flags.contains(RequestFlags::HAS_SIGNATURE) {
        Some(
            validate::parse_signature_data(payload.signature_data.as_ref())?.ok_or_else(|| {
                ValidationError::new(
                    "signatureData",
                    "flagHasSignatureが指定されていますが署名データがありません",
                )
            })?,
        )
    } else {
        None
    };

    let redirects = validate::parse_redirects(payload.redirects.as_ref())?;

    Ok(BuiltRequest {
        signing_id,
        details: DataPacketRequestDetails {
            version: DATA_PACKET_DETAILS_VERSION,
            flags,
            signable_objects,
            statements,
            signature,
            request_id,
        },
        redirects,
    })
}

/// ダウンロードURLを包んだ署名対象オブジェクトを作る。
///
/// DataDescriptor の中身はクロスチェーンデータ参照キーの下に URLRef を1つだけ持つ
/// VdxfUniValue。
pub fn build_url_descriptor(
    download_url: Option<&str>,
    data_hash: Option<&str>,
) -> Result<DataDescriptor, ValidationError> {
    let url = download_url.map(str::trim).unwrap_or_default();
    if url.is_empty() {
        return Err(ValidationError::new(
            "downloadUrl",
            "flagHasUrlForDownloadが指定されていますがダウンロードURLがありません",
        ));
    }

    // 空白のみは未指定。それ以外は補正せずに検査する
    let data_hash = match data_hash {
        Some(hash) if !hash.trim().is_empty() => {
            Some(validate::parse_data_hash("dataHash", hash)?)
        }
        _ => None,
    };

    let url_ref = UrlRef::new(url, data_hash)
        .map_err(|e| ValidationError::new("downloadUrl", e.to_string()))?;
    let container = VdxfUniValue::from_data_ref(CrossChainDataRef::Url(url_ref));
    Ok(DataDescriptor::new(container.to_bytes()))
}

/// URLモードの署名対象オブジェクトから URLRef を取り出す。
pub fn decode_url_descriptor(descriptor: &DataDescriptor) -> Result<UrlRef, CodecError> {
    let container = VdxfUniValue::from_bytes(&descriptor.object_data)?;
    container
        .data_ref()
        .and_then(CrossChainDataRef::as_url)
        .cloned()
        .ok_or_else(|| CodecError::Invalid("URL参照が含まれていません".to_string()))
}
