//! # フィールド・フラグの検証
//!
//! フォームから届いた生の値を型付きの値に変換する。
//! 失敗はすべて [`ValidationError`]（問題のフィールド名と理由）として返し、
//! 署名デーモンへの呼び出しより前に検出する。

use serde_json::Value;
use verus_request_types::{
    DataDescriptorJson, DataPacketPayload, JsonListField, RedirectJson, RedirectKindJson,
    SignatureDataJson,
};

use crate::compact_address::CompactIAddress;
use crate::data_descriptor::DataDescriptor;
use crate::details::RequestFlags;
use crate::envelope::{ResponseUri, ResponseUriKind};
use crate::signature::VerifiableSignatureData;

/// 入力検証エラー。
///
/// 呼び出し元の入力に起因するエラーで、HTTPでは400になる。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// 問題のフィールド名（例: `signableObjects[2]`）
    pub field: String,
    /// 人が読める理由
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// 配列フィールド
// ---------------------------------------------------------------------------

/// 配列フィールドの入力を解決する。
///
/// 欠落・`null`・空文字列・`"[]"`・空配列はすべて「なし」(`None`) になる。
/// 文字列はここで一度だけJSONとしてパースする。配列でも文字列でもない値はエラー。
pub fn resolve_list(
    field: &str,
    input: Option<&Value>,
) -> Result<Option<Vec<Value>>, ValidationError> {
    let list = match input {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => serde_json::from_value::<JsonListField>(value.clone()).map_err(|_| {
            ValidationError::new(field, "配列またはJSON文字列である必要があります")
        })?,
    };

    let items = match list {
        JsonListField::Parsed(items) => items,
        JsonListField::Raw(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Null) => return Ok(None),
                Ok(Value::Array(items)) => items,
                Ok(_) => {
                    return Err(ValidationError::new(field, "配列である必要があります"));
                }
                Err(e) => {
                    return Err(ValidationError::new(
                        field,
                        format!("JSONとして解釈できません: {e}"),
                    ));
                }
            }
        }
    };

    if items.is_empty() {
        Ok(None)
    } else {
        Ok(Some(items))
    }
}

// ---------------------------------------------------------------------------
// 単一フィールド
// ---------------------------------------------------------------------------

/// 64文字のhex（大文字小文字を区別しない）を32バイトに変換する。
///
/// 空白の除去などの補正は行わない。長さ違いや非hex文字はエラー。
pub fn parse_data_hash(field: &str, input: &str) -> Result<[u8; 32], ValidationError> {
    if input.len() != 64 {
        return Err(ValidationError::new(
            field,
            format!("64文字のhexである必要があります（{}文字）", input.len()),
        ));
    }
    let mut out = [0u8; 32];
    hex::decode_to_slice(input, &mut out)
        .map_err(|e| ValidationError::new(field, format!("hexとして不正です: {e}")))?;
    Ok(out)
}

/// compact addressを解釈する。
///
/// 前後の空白と末尾の `@` を1つだけ取り除く。取り除いた結果が空なら「なし」。
/// 文字列以外はエラー（`null` は「なし」）。
pub fn parse_compact_address(
    field: &str,
    input: &Value,
) -> Result<Option<CompactIAddress>, ValidationError> {
    let raw = match input {
        Value::Null => return Ok(None),
        Value::String(s) => s,
        _ => return Err(ValidationError::new(field, "文字列である必要があります")),
    };

    let trimmed = raw.trim();
    let cleaned = trimmed.strip_suffix('@').unwrap_or(trimmed).trim();
    if cleaned.is_empty() {
        return Ok(None);
    }

    CompactIAddress::from_address(cleaned)
        .map(Some)
        .map_err(|e| ValidationError::new(field, e.to_string()))
}

/// 署名に使うIDを取り出す（必須、前後の空白は除去）。
pub fn parse_signing_id(input: Option<&str>) -> Result<String, ValidationError> {
    match input.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ValidationError::new("signingId", "署名IDは必須です")),
    }
}

// ---------------------------------------------------------------------------
// フラグ
// ---------------------------------------------------------------------------

/// HAS_SIGNATURE と FOR_USERS_SIGNATURE の相互排他を検査する。
///
/// フラグの組み立てより前に呼ぶこと。
pub fn check_signature_exclusivity(payload: &DataPacketPayload) -> Result<(), ValidationError> {
    if payload.flag_has_signature && payload.flag_for_users_signature {
        return Err(ValidationError::new(
            "flagHasSignature",
            "flagHasSignatureとflagForUsersSignatureは相互に排他的です（同時に指定できません）",
        ));
    }
    Ok(())
}

/// ペイロードの真偽値と、それぞれが表すフラグの組。
pub fn flag_inputs(payload: &DataPacketPayload) -> [(RequestFlags, bool); 6] {
    [
        (RequestFlags::HAS_REQUEST_ID, payload.flag_has_request_id),
        (RequestFlags::HAS_STATEMENTS, payload.flag_has_statements),
        (RequestFlags::HAS_SIGNATURE, payload.flag_has_signature),
        (
            RequestFlags::FOR_USERS_SIGNATURE,
            payload.flag_for_users_signature,
        ),
        (
            RequestFlags::FOR_TRANSMITTAL_TO_USER,
            payload.flag_for_transmittal_to_user,
        ),
        (
            RequestFlags::HAS_URL_FOR_DOWNLOAD,
            payload.flag_has_url_for_download,
        ),
    ]
}

/// 真偽値ごとに対応するビットをORする。ビットは互いに素なので評価順に依存しない。
pub fn compose_flags<I>(inputs: I) -> RequestFlags
where
    I: IntoIterator<Item = (RequestFlags, bool)>,
{
    inputs
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .fold(RequestFlags::empty(), |acc, (flag, _)| acc | flag)
}

// ---------------------------------------------------------------------------
// 配列の中身
// ---------------------------------------------------------------------------

/// 署名対象オブジェクトを構築する。失敗は要素のインデックス付きで返す。
pub fn parse_signable_objects(
    input: Option<&Value>,
) -> Result<Option<Vec<DataDescriptor>>, ValidationError> {
    let Some(items) = resolve_list("signableObjects", input)? else {
        return Ok(None);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let field = format!("signableObjects[{i}]");
            let json: DataDescriptorJson = serde_json::from_value(item)
                .map_err(|e| ValidationError::new(&field, format!("形式が不正です: {e}")))?;
            DataDescriptor::from_json(&json)
                .map_err(|e| ValidationError::new(&field, e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// ステートメント（文字列の配列）を取り出す。
pub fn parse_statements(
    input: Option<&Value>,
) -> Result<Option<Vec<String>>, ValidationError> {
    let Some(items) = resolve_list("statements", input)? else {
        return Ok(None);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) if !s.trim().is_empty() => Ok(s),
            Value::String(_) => Err(ValidationError::new(
                format!("statements[{i}]"),
                "空のステートメントは指定できません",
            )),
            _ => Err(ValidationError::new(
                format!("statements[{i}]"),
                "文字列である必要があります",
            )),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// レスポンス先を取り出す。順序は入力のまま保持する。
pub fn parse_redirects(
    input: Option<&Value>,
) -> Result<Option<Vec<ResponseUri>>, ValidationError> {
    let Some(items) = resolve_list("redirects", input)? else {
        return Ok(None);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let redirect: RedirectJson = serde_json::from_value(item).map_err(|e| {
                ValidationError::new(format!("redirects[{i}]"), format!("形式が不正です: {e}"))
            })?;
            parse_redirect(i, redirect)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn parse_redirect(index: usize, redirect: RedirectJson) -> Result<ResponseUri, ValidationError> {
    let kind = match &redirect.kind {
        RedirectKindJson::Text(s) => s.trim().parse::<u64>().ok(),
        RedirectKindJson::Number(n) => Some(*n),
    }
    .and_then(ResponseUriKind::from_code)
    .ok_or_else(|| {
        ValidationError::new(
            format!("redirects[{index}].type"),
            "\"1\"（リダイレクト）または\"2\"（POST）である必要があります",
        )
    })?;

    let uri = redirect.uri.trim();
    if uri.is_empty() {
        return Err(ValidationError::new(
            format!("redirects[{index}].uri"),
            "URIが空です",
        ));
    }
    if uri.chars().any(char::is_whitespace) {
        return Err(ValidationError::new(
            format!("redirects[{index}].uri"),
            "URIに空白を含めることはできません",
        ));
    }

    Ok(ResponseUri {
        kind,
        uri: uri.to_string(),
    })
}

/// 事前に取得した署名データを取り出す。オブジェクトまたはJSON文字列を受け付ける。
pub fn parse_signature_data(
    input: Option<&Value>,
) -> Result<Option<VerifiableSignatureData>, ValidationError> {
    const FIELD: &str = "signatureData";

    let value = match input {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(raw)) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            serde_json::from_str::<Value>(raw).map_err(|e| {
                ValidationError::new(FIELD, format!("JSONとして解釈できません: {e}"))
            })?
        }
        Some(other) => other.clone(),
    };

    let json: SignatureDataJson = serde_json::from_value(value)
        .map_err(|e| ValidationError::new(FIELD, format!("形式が不正です: {e}")))?;
    VerifiableSignatureData::from_json(&json)
        .map(Some)
        .map_err(|e| ValidationError::new(FIELD, e.to_string()))
}
