//! # Verus リクエストゲートウェイ 共有型定義
//!
//! HTTP境界でやり取りされるJSON構造をRust構造体として提供する。
//! バイナリ表現（DataDescriptor等）は `verus-request-core` が担当し、
//! ここではフォームから届く生の形と、レスポンスの形だけを定義する。
//!
//! ## 命名規則
//! - リクエスト/レスポンスのトップレベル: camelCase（Webフォーム由来）
//! - 署名データ・DataDescriptor等のオブジェクト内部: 小文字連結（デーモンのJSON表現に合わせる）

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// 入力の共用体
// ---------------------------------------------------------------------------

/// 配列フィールドの入力形。
///
/// フォームからは「パース済みの配列」と「JSON文字列」のどちらでも届く。
/// ペイロードには生の値のまま載せ、フラグが実際にそのフィールドを読むときに
/// 検証側で一度だけこの形へ解決する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonListField {
    /// パース済みの配列
    Parsed(Vec<serde_json::Value>),
    /// JSONエンコードされた文字列（例: `"[\"a\",\"b\"]"`）
    Raw(String),
}

/// フォーム由来の真偽値をデシリアライズする。
///
/// JSONの `true`/`false` に加え、`"true"`/`"on"`/`"1"` 等の文字列と `0`/`1` を受け付ける。
/// `null` と欠落は `false`。
fn form_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FormBool {
        Bool(bool),
        Number(i64),
        Text(String),
    }

    match Option::<FormBool>::deserialize(deserializer)? {
        None => Ok(false),
        Some(FormBool::Bool(b)) => Ok(b),
        Some(FormBool::Number(0)) => Ok(false),
        Some(FormBool::Number(1)) => Ok(true),
        Some(FormBool::Number(n)) => Err(serde::de::Error::custom(format!(
            "真偽値として解釈できない数値です: {n}"
        ))),
        Some(FormBool::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" | "yes" => Ok(true),
            "false" | "off" | "0" | "no" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "真偽値として解釈できない文字列です: {other}"
            ))),
        },
    }
}

// ---------------------------------------------------------------------------
// データパケットリクエスト入力
// ---------------------------------------------------------------------------

/// `generate-data-packet-qr` / `sign-data-packet` の入力ペイロード。
///
/// 値の妥当性はここでは検査しない。検査と組み立ては
/// `verus_request_core::builder` が固定順序で行う。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPacketPayload {
    /// 署名に使うVerusID（`name@` または i-address）
    #[serde(default)]
    pub signing_id: Option<String>,
    /// HAS_REQUEST_ID
    #[serde(default, deserialize_with = "form_bool")]
    pub flag_has_request_id: bool,
    /// HAS_STATEMENTS
    #[serde(default, deserialize_with = "form_bool")]
    pub flag_has_statements: bool,
    /// HAS_SIGNATURE
    #[serde(default, deserialize_with = "form_bool")]
    pub flag_has_signature: bool,
    /// FOR_USERS_SIGNATURE
    #[serde(default, deserialize_with = "form_bool")]
    pub flag_for_users_signature: bool,
    /// FOR_TRANSMITTAL_TO_USER
    #[serde(default, deserialize_with = "form_bool")]
    pub flag_for_transmittal_to_user: bool,
    /// HAS_URL_FOR_DOWNLOAD
    #[serde(default, deserialize_with = "form_bool")]
    pub flag_has_url_for_download: bool,
    /// ダウンロードURL（URLモード時のみ使用）
    #[serde(default)]
    pub download_url: Option<String>,
    /// ダウンロード対象のSHA-256（64文字のhex、Optional）
    #[serde(default)]
    pub data_hash: Option<String>,
    /// 明示的な署名対象オブジェクト（DataDescriptorのJSON表現の配列、またはそのJSON文字列）。
    /// URLモードでは読まれないため、形の検査は検証側で行う。
    #[serde(default)]
    pub signable_objects: Option<serde_json::Value>,
    /// ステートメント（文字列の配列）
    #[serde(default)]
    pub statements: Option<serde_json::Value>,
    /// リクエストID（compact address）。文字列以外は不正入力として扱うため生の値で受ける。
    #[serde(default)]
    pub request_id: Option<serde_json::Value>,
    /// レスポンスのリダイレクト先
    #[serde(default)]
    pub redirects: Option<serde_json::Value>,
    /// 事前に取得した署名（`sign-data-packet` の `signatureData`）。オブジェクトまたはJSON文字列。
    #[serde(default)]
    pub signature_data: Option<serde_json::Value>,
}

/// DataDescriptorのJSON表現。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataDescriptorJson {
    /// バージョン（省略時1）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// フラグ（省略時0）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    /// 任意のバイナリペイロード
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectdata: Option<ObjectDataJson>,
    /// ラベル
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// MIMEタイプ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

/// objectdataの入力形。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectDataJson {
    /// hex文字列
    Hex(String),
    /// UTF-8メッセージ（バイト列としてそのまま格納する）
    Message {
        /// メッセージ本文
        message: String,
    },
}

/// リダイレクト指定のJSON表現。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectJson {
    /// `"1"`（リダイレクト）または `"2"`（POST）。数値も受け付ける。
    #[serde(rename = "type")]
    pub kind: RedirectKindJson,
    /// 遷移先URI
    pub uri: String,
}

/// リダイレクト種別の入力形。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RedirectKindJson {
    /// 文字列表記
    Text(String),
    /// 数値表記
    Number(u64),
}

// ---------------------------------------------------------------------------
// 署名データ
// ---------------------------------------------------------------------------

/// 検証可能な署名データのJSON表現。
///
/// `sign-data-packet` が返し、後続の `generate-data-packet-qr` に
/// `signatureData` としてそのまま渡される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureDataJson {
    /// 構造のバージョン
    pub version: u64,
    /// フラグ
    #[serde(default)]
    pub flags: u64,
    /// ハッシュ種別（"sha256" 等）
    pub hashtype: String,
    /// 署名が行われたシステムのi-address
    pub systemid: String,
    /// 署名したIDのi-address
    pub identityid: String,
    /// 署名時のブロック高（存在する場合）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatureheight: Option<u32>,
    /// Base64エンコードされた署名
    pub signatureasvch: String,
}

// ---------------------------------------------------------------------------
// レスポンス
// ---------------------------------------------------------------------------

/// `generate-data-packet-qr` レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrResponse {
    /// ウォレット用ディープリンク
    pub deeplink: String,
    /// `data:image/png;base64,...` 形式のQR画像
    pub qr_image: String,
}

/// `sign-data-packet` レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignDataPacketResponse {
    /// 正規化済みの署名データ
    pub signature_data: SignatureDataJson,
    /// 署名対象としてデーモンに渡したhex
    pub message_hex: String,
}

/// `GET /health` レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// 常に "ok"
    pub status: String,
    /// 署名に使うシステムのi-address
    pub system_id: String,
    /// テストネット運用か
    pub testnet: bool,
}

/// エラーレスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 呼び出し元に返すメッセージ
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_camel_case_fields() {
        let payload: DataPacketPayload = serde_json::from_value(serde_json::json!({
            "signingId": "alice@",
            "flagHasUrlForDownload": true,
            "downloadUrl": "https://x.test/f",
            "redirects": [{"type": "1", "uri": "https://a"}],
        }))
        .unwrap();

        assert_eq!(payload.signing_id.as_deref(), Some("alice@"));
        assert!(payload.flag_has_url_for_download);
        assert!(!payload.flag_has_statements);
        assert_eq!(payload.download_url.as_deref(), Some("https://x.test/f"));
        assert!(matches!(payload.redirects, Some(serde_json::Value::Array(ref v)) if v.len() == 1));
    }

    /// フォーム由来の文字列表記の真偽値を受け付けることを確認
    #[test]
    fn test_form_bool_variants() {
        let payload: DataPacketPayload = serde_json::from_value(serde_json::json!({
            "flagHasRequestId": "on",
            "flagHasStatements": "false",
            "flagHasSignature": 1,
            "flagForUsersSignature": null,
            "flagForTransmittalToUser": "",
            "flagHasUrlForDownload": " TRUE ",
        }))
        .unwrap();

        assert!(payload.flag_has_request_id);
        assert!(!payload.flag_has_statements);
        assert!(payload.flag_has_signature);
        assert!(!payload.flag_for_users_signature);
        assert!(!payload.flag_for_transmittal_to_user);
        assert!(payload.flag_has_url_for_download);
    }

    #[test]
    fn test_form_bool_rejects_garbage() {
        let result: Result<DataPacketPayload, _> =
            serde_json::from_value(serde_json::json!({ "flagHasStatements": "maybe" }));
        assert!(result.is_err());

        let result: Result<DataPacketPayload, _> =
            serde_json::from_value(serde_json::json!({ "flagHasStatements": 7 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_json_list_field_forms() {
        let raw: JsonListField =
            serde_json::from_value(serde_json::json!("[\"a\",\"b\"]")).unwrap();
        assert_eq!(raw, JsonListField::Raw("[\"a\",\"b\"]".to_string()));

        let parsed: JsonListField = serde_json::from_value(serde_json::json!(["a"])).unwrap();
        assert_eq!(parsed, JsonListField::Parsed(vec![serde_json::json!("a")]));
    }

    /// 配列フィールドは形に関係なくペイロードとして受け取れる
    #[test]
    fn test_list_fields_accept_any_shape() {
        let payload: DataPacketPayload = serde_json::from_value(serde_json::json!({
            "signableObjects": { "objectdata": "00" },
            "statements": { "0": "ignored" },
            "redirects": 5,
        }))
        .unwrap();
        assert!(payload.signable_objects.as_ref().is_some_and(|v| v.is_object()));
        assert!(payload.statements.as_ref().is_some_and(|v| v.is_object()));
        assert_eq!(payload.redirects, Some(serde_json::json!(5)));
    }

    #[test]
    fn test_object_data_json_forms() {
        let hex: DataDescriptorJson =
            serde_json::from_value(serde_json::json!({ "objectdata": "deadbeef" })).unwrap();
        assert_eq!(hex.objectdata, Some(ObjectDataJson::Hex("deadbeef".to_string())));

        let msg: DataDescriptorJson =
            serde_json::from_value(serde_json::json!({ "objectdata": { "message": "hi" } }))
                .unwrap();
        assert_eq!(
            msg.objectdata,
            Some(ObjectDataJson::Message {
                message: "hi".to_string()
            })
        );
    }

    #[test]
    fn test_redirect_kind_forms() {
        let text: RedirectJson =
            serde_json::from_value(serde_json::json!({ "type": "2", "uri": "https://a" })).unwrap();
        assert_eq!(text.kind, RedirectKindJson::Text("2".to_string()));

        let number: RedirectJson =
            serde_json::from_value(serde_json::json!({ "type": 1, "uri": "https://a" })).unwrap();
        assert_eq!(number.kind, RedirectKindJson::Number(1));
    }

    #[test]
    fn test_responses_use_camel_case() {
        let response = GenerateQrResponse {
            deeplink: "verus://1/abc".to_string(),
            qr_image: "data:image/png;base64,xyz".to_string(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("qrImage").is_some());

        let sign = SignDataPacketResponse {
            signature_data: SignatureDataJson {
                version: 1,
                flags: 0,
                hashtype: "sha256".to_string(),
                systemid: "i5w5MuNik5NtLcYmNzcvaoixooEebB6MGV".to_string(),
                identityid: "i5w5MuNik5NtLcYmNzcvaoixooEebB6MGV".to_string(),
                signatureheight: None,
                signatureasvch: "AA==".to_string(),
            },
            message_hex: "00".to_string(),
        };
        let value = serde_json::to_value(&sign).unwrap();
        assert!(value.get("signatureData").is_some());
        assert!(value.get("messageHex").is_some());
        assert!(value["signatureData"].get("signatureheight").is_none());
    }
}
