//! # URL参照とクロスチェーンデータ参照
//!
//! ```text
//! URLRef:            VARINT version | VARINT flags | [32B datahash if FLAG_HAS_DATA_HASH] | varstring url
//! CrossChainDataRef: u8 type | body
//! ```

use crate::codec::{check_limited_string, BufferReader, BufferWriter, CodecError, Decode, Encode};

/// URLRefのバージョン
pub const URL_REF_VERSION: u64 = 1;

/// datahashを持つ
pub const FLAG_HAS_DATA_HASH: u64 = 0x01;

/// PBaaSエビデンス参照
pub const TYPE_CROSSCHAIN_DATAREF: u8 = 0;
/// IDマルチマップ参照
pub const TYPE_IDENTITY_DATAREF: u8 = 1;
/// URL参照
pub const TYPE_URL_REF: u8 = 2;

/// ダウンロード先URLと、任意でその内容のSHA-256。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRef {
    /// 構造のバージョン
    pub version: u64,
    /// ダウンロードURL
    pub url: String,
    /// 内容のハッシュ（32バイト）
    pub data_hash: Option<[u8; 32]>,
}

impl UrlRef {
    /// URLとハッシュから構築する。URLは空不可・4096バイト以下。
    pub fn new(url: impl Into<String>, data_hash: Option<[u8; 32]>) -> Result<Self, CodecError> {
        let url = url.into();
        check_url(&url)?;
        Ok(Self {
            version: URL_REF_VERSION,
            url,
            data_hash,
        })
    }

    fn flags(&self) -> u64 {
        if self.data_hash.is_some() {
            FLAG_HAS_DATA_HASH
        } else {
            0
        }
    }
}

fn check_url(url: &str) -> Result<(), CodecError> {
    if url.is_empty() {
        return Err(CodecError::Invalid("URLが空です".to_string()));
    }
    check_limited_string("url", url)
}

impl Encode for UrlRef {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_varint(self.version);
        writer.write_varint(self.flags());
        if let Some(hash) = &self.data_hash {
            writer.write_slice(hash);
        }
        writer.write_var_string(&self.url);
    }
}

impl Decode for UrlRef {
    fn decode(reader: &mut BufferReader<'_>) -> Result<Self, CodecError> {
        let version = reader.read_varint()?;
        if version != URL_REF_VERSION {
            return Err(CodecError::Invalid(format!(
                "URLRefのバージョンが不正です: {version}"
            )));
        }
        let flags = reader.read_varint()?;
        if flags & !FLAG_HAS_DATA_HASH != 0 {
            return Err(CodecError::Invalid(format!(
                "URLRefに未知のフラグがあります: {flags:#x}"
            )));
        }
        let data_hash = if flags & FLAG_HAS_DATA_HASH != 0 {
            Some(reader.read_array::<32>()?)
        } else {
            None
        };
        let url = reader.read_var_string()?;
        check_url(&url)?;
        Ok(Self {
            version,
            url,
            data_hash,
        })
    }
}

/// 複数種の参照のいずれかを運ぶ型付きラッパー。
///
/// ゲートウェイが構築するのはURL参照のみ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrossChainDataRef {
    /// URL参照
    Url(UrlRef),
}

impl CrossChainDataRef {
    /// 種別タグ
    pub fn type_tag(&self) -> u8 {
        match self {
            CrossChainDataRef::Url(_) => TYPE_URL_REF,
        }
    }

    /// URL参照であれば返す。
    pub fn as_url(&self) -> Option<&UrlRef> {
        match self {
            CrossChainDataRef::Url(url_ref) => Some(url_ref),
        }
    }
}

impl Encode for CrossChainDataRef {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_u8(self.type_tag());
        match self {
            CrossChainDataRef::Url(url_ref) => url_ref.encode(writer),
        }
    }
}

impl Decode for CrossChainDataRef {
    fn decode(reader: &mut BufferReader<'_>) -> Result<Self, CodecError> {
        match reader.read_u8()? {
            TYPE_URL_REF => Ok(CrossChainDataRef::Url(UrlRef::decode(reader)?)),
            TYPE_CROSSCHAIN_DATAREF => Err(CodecError::Unsupported(
                "PBaaSエビデンス参照".to_string(),
            )),
            TYPE_IDENTITY_DATAREF => Err(CodecError::Unsupported("IDマルチマップ参照".to_string())),
            other => Err(CodecError::Invalid(format!(
                "不明なデータ参照種別です: {other}"
            ))),
        }
    }
}
