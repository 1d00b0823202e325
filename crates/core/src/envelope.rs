//! # 汎用リクエストエンベロープとディープリンク
//!
//! リクエスト詳細・レスポンス先・署名をまとめ、ウォレットが読むディープリンクにする。
//!
//! ```text
//! VARINT version | VARINT flags
//!   | [VerifiableSignatureData            if SIGNED]
//!   | [VARINT createdAt                   if HAS_CREATED_AT]
//!   | [CompactSize n                      if MULTI_DETAILS]
//!   | (VARINT ordinal | varbytes details) * n
//!   | [CompactSize m | (VARINT type | varstring uri) * m   if HAS_RESPONSE_URIS]
//! ```
//!
//! ディープリンク: `verus://1/<base64url(エンベロープ)>`

use base64::Engine;

use crate::codec::{BufferReader, BufferWriter, CodecError, Decode, Encode};
use crate::details::DataPacketRequestDetails;
use crate::signature::VerifiableSignatureData;

/// バージョン
pub const GENERIC_REQUEST_VERSION: u64 = 1;

/// 署名済み
pub const FLAG_SIGNED: u64 = 0x01;
/// 作成時刻あり
pub const FLAG_HAS_CREATED_AT: u64 = 0x02;
/// 詳細が1件以外
pub const FLAG_MULTI_DETAILS: u64 = 0x04;
/// レスポンス先あり
pub const FLAG_HAS_RESPONSE_URIS: u64 = 0x08;
/// テストネット向け
pub const FLAG_IS_TESTNET: u64 = 0x10;

const KNOWN_FLAGS: u64 = FLAG_SIGNED
    | FLAG_HAS_CREATED_AT
    | FLAG_MULTI_DETAILS
    | FLAG_HAS_RESPONSE_URIS
    | FLAG_IS_TESTNET;

/// データパケットリクエスト詳細の序数
pub const ORDINAL_DATA_PACKET_REQUEST: u64 = 4;

/// ディープリンクのスキーム
pub const DEEPLINK_SCHEME: &str = "verus";
/// ディープリンクのプロトコルバージョン
pub const DEEPLINK_VERSION: u64 = 1;

/// Base64エンジン（URL-safe, パディングなし）
fn b64url() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
}

/// レスポンス先の種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseUriKind {
    /// `"1"`: ウォレットがURIへ遷移する
    Redirect,
    /// `"2"`: ウォレットがURIへPOSTする。両方ある場合はウォレット側でこちらが優先される
    Post,
}

impl ResponseUriKind {
    pub fn code(self) -> u64 {
        match self {
            ResponseUriKind::Redirect => 1,
            ResponseUriKind::Post => 2,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(ResponseUriKind::Redirect),
            2 => Some(ResponseUriKind::Post),
            _ => None,
        }
    }
}

/// レスポンス先。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseUri {
    pub kind: ResponseUriKind,
    pub uri: String,
}

/// エンベロープに格納するリクエスト詳細。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestDetail {
    /// データパケット
    DataPacket(DataPacketRequestDetails),
}

impl RequestDetail {
    pub fn ordinal(&self) -> u64 {
        match self {
            RequestDetail::DataPacket(_) => ORDINAL_DATA_PACKET_REQUEST,
        }
    }

    fn encode_body(&self) -> Vec<u8> {
        match self {
            RequestDetail::DataPacket(details) => details.to_bytes(),
        }
    }
}

/// 汎用リクエストエンベロープ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericRequest {
    pub version: u64,
    pub signature: Option<VerifiableSignatureData>,
    /// 作成時刻（UNIX秒）
    pub created_at: Option<u64>,
    pub details: Vec<RequestDetail>,
    /// レスポンス先（入力順を保持する）
    pub response_uris: Vec<ResponseUri>,
    pub testnet: bool,
}

impl GenericRequest {
    /// 未署名のエンベロープを構築する。
    pub fn new(
        details: Vec<RequestDetail>,
        response_uris: Vec<ResponseUri>,
        created_at: Option<u64>,
        testnet: bool,
    ) -> Self {
        Self {
            version: GENERIC_REQUEST_VERSION,
            signature: None,
            created_at,
            details,
            response_uris,
            testnet,
        }
    }

    pub fn flags(&self) -> u64 {
        let mut flags = 0;
        if self.signature.is_some() {
            flags |= FLAG_SIGNED;
        }
        if self.created_at.is_some() {
            flags |= FLAG_HAS_CREATED_AT;
        }
        if self.details.len() != 1 {
            flags |= FLAG_MULTI_DETAILS;
        }
        if !self.response_uris.is_empty() {
            flags |= FLAG_HAS_RESPONSE_URIS;
        }
        if self.testnet {
            flags |= FLAG_IS_TESTNET;
        }
        flags
    }

    /// 署名対象のバイト列（署名とSIGNEDフラグを除いた形）。
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut unsigned = self.clone();
        unsigned.signature = None;
        unsigned.to_bytes()
    }

    /// 署名を付与する。
    pub fn with_signature(mut self, signature: VerifiableSignatureData) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// ウォレット用ディープリンクURIにエンコードする。
    pub fn to_deeplink_uri(&self) -> String {
        format!(
            "{DEEPLINK_SCHEME}://{DEEPLINK_VERSION}/{}",
            b64url().encode(self.to_bytes())
        )
    }

    /// ディープリンクURIからデコードする。
    pub fn from_deeplink_uri(uri: &str) -> Result<Self, CodecError> {
        let prefix = format!("{DEEPLINK_SCHEME}://{DEEPLINK_VERSION}/");
        let encoded = uri
            .strip_prefix(&prefix)
            .ok_or_else(|| CodecError::Invalid(format!("ディープリンクの形式が不正です: {uri}")))?;
        let bytes = b64url()
            .decode(encoded)
            .map_err(|e| CodecError::Invalid(format!("ディープリンクのBase64デコードに失敗: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

impl Encode for GenericRequest {
    fn encode(&self, writer: &mut BufferWriter) {
        let flags = self.flags();
        writer.write_varint(self.version);
        writer.write_varint(flags);

        if let Some(signature) = &self.signature {
            signature.encode(writer);
        }
        if let Some(created_at) = self.created_at {
            writer.write_varint(created_at);
        }
        if flags & FLAG_MULTI_DETAILS != 0 {
            writer.write_compact_size(self.details.len() as u64);
        }
        for detail in &self.details {
            writer.write_varint(detail.ordinal());
            writer.write_var_slice(&detail.encode_body());
        }
        if !self.response_uris.is_empty() {
            writer.write_compact_size(self.response_uris.len() as u64);
            for response_uri in &self.response_uris {
                writer.write_varint(response_uri.kind.code());
                writer.write_var_string(&response_uri.uri);
            }
        }
    }
}

impl Decode for GenericRequest {
    fn decode(reader: &mut BufferReader<'_>) -> Result<Self, CodecError> {
        let version = reader.read_varint()?;
        if version != GENERIC_REQUEST_VERSION {
            return Err(CodecError::Invalid(format!(
                "エンベロープのバージョンが不正です: {version}"
            )));
        }
        let flags = reader.read_varint()?;
        if flags & !KNOWN_FLAGS != 0 {
            return Err(CodecError::Invalid(format!(
                "エンベロープに未知のフラグがあります: {flags:#x}"
            )));
        }

        let signature = if flags & FLAG_SIGNED != 0 {
            Some(VerifiableSignatureData::decode(reader)?)
        } else {
            None
        };
        let created_at = if flags & FLAG_HAS_CREATED_AT != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };

        let detail_count = if flags & FLAG_MULTI_DETAILS != 0 {
            reader.read_count()?
        } else {
            1
        };
        let mut details = Vec::with_capacity(detail_count);
        for _ in 0..detail_count {
            let ordinal = reader.read_varint()?;
            let body = reader.read_var_slice()?;
            match ordinal {
                ORDINAL_DATA_PACKET_REQUEST => details.push(RequestDetail::DataPacket(
                    DataPacketRequestDetails::from_bytes(body)?,
                )),
                other => {
                    return Err(CodecError::Unsupported(format!(
                        "リクエスト詳細の序数 {other}"
                    )))
                }
            }
        }

        let mut response_uris = Vec::new();
        if flags & FLAG_HAS_RESPONSE_URIS != 0 {
            let count = reader.read_count()?;
            for _ in 0..count {
                let code = reader.read_varint()?;
                let kind = ResponseUriKind::from_code(code).ok_or_else(|| {
                    CodecError::Invalid(format!("不明なレスポンス先種別です: {code}"))
                })?;
                response_uris.push(ResponseUri {
                    kind,
                    uri: reader.read_var_string()?,
                });
            }
        }

        Ok(Self {
            version,
            signature,
            created_at,
            details,
            response_uris,
            testnet: flags & FLAG_IS_TESTNET != 0,
        })
    }
}
