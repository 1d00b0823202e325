//! # 検証可能な署名データ
//!
//! 外部署名デーモンが返した署名を、ウォレットが検証できる形に正規化したもの。
//!
//! ```text
//! VARINT version | VARINT flags | VARINT hashtype | 20B systemid | 20B identityid
//!   | [u32 LE height if FLAG_HAS_HEIGHT] | varbytes signature
//! ```

use base64::Engine;
use verus_request_crypto::IAddress;
use verus_request_types::SignatureDataJson;

use crate::codec::{BufferReader, BufferWriter, CodecError, Decode, Encode};

/// バージョン
pub const SIGNATURE_DATA_VERSION: u64 = 1;

/// 署名時のブロック高を持つ
pub const FLAG_HAS_HEIGHT: u64 = 0x01;

/// Base64エンジン（Standard）
fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// 署名対象に適用されたハッシュ種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashType {
    Sha256,
    Sha256d,
    Blake2b,
    Keccak256,
}

impl HashType {
    fn code(self) -> u64 {
        match self {
            HashType::Sha256 => 1,
            HashType::Sha256d => 2,
            HashType::Blake2b => 3,
            HashType::Keccak256 => 4,
        }
    }

    fn from_code(code: u64) -> Result<Self, CodecError> {
        match code {
            1 => Ok(HashType::Sha256),
            2 => Ok(HashType::Sha256d),
            3 => Ok(HashType::Blake2b),
            4 => Ok(HashType::Keccak256),
            other => Err(CodecError::Invalid(format!("不明なハッシュ種別です: {other}"))),
        }
    }

    /// JSON表現での名前
    pub fn as_str(self) -> &'static str {
        match self {
            HashType::Sha256 => "sha256",
            HashType::Sha256d => "sha256d",
            HashType::Blake2b => "blake2b",
            HashType::Keccak256 => "keccak256",
        }
    }

    /// JSON表現の名前からパースする（大文字小文字は区別しない）。
    pub fn parse(name: &str) -> Result<Self, CodecError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashType::Sha256),
            "sha256d" => Ok(HashType::Sha256d),
            "blake2b" => Ok(HashType::Blake2b),
            "keccak256" | "keccak" => Ok(HashType::Keccak256),
            other => Err(CodecError::Invalid(format!("不明なハッシュ種別です: {other}"))),
        }
    }
}

/// 検証可能な署名データ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiableSignatureData {
    pub version: u64,
    pub hash_type: HashType,
    /// 署名が行われたシステム
    pub system_id: IAddress,
    /// 署名したID
    pub identity_id: IAddress,
    /// 署名時のブロック高
    pub signature_height: Option<u32>,
    /// 署名本体
    pub signature: Vec<u8>,
}

impl VerifiableSignatureData {
    fn flags(&self) -> u64 {
        if self.signature_height.is_some() {
            FLAG_HAS_HEIGHT
        } else {
            0
        }
    }

    /// JSON表現に変換する。
    pub fn to_json(&self) -> SignatureDataJson {
        SignatureDataJson {
            version: self.version,
            flags: self.flags(),
            hashtype: self.hash_type.as_str().to_string(),
            systemid: self.system_id.to_string(),
            identityid: self.identity_id.to_string(),
            signatureheight: self.signature_height,
            signatureasvch: b64().encode(&self.signature),
        }
    }

    /// JSON表現から構築する。
    pub fn from_json(json: &SignatureDataJson) -> Result<Self, CodecError> {
        if json.version != SIGNATURE_DATA_VERSION {
            return Err(CodecError::Invalid(format!(
                "署名データのバージョンが不正です: {}",
                json.version
            )));
        }
        let system_id = IAddress::parse(json.systemid.trim())
            .map_err(|e| CodecError::Invalid(format!("systemidが不正です: {e}")))?;
        let identity_id = IAddress::parse(json.identityid.trim())
            .map_err(|e| CodecError::Invalid(format!("identityidが不正です: {e}")))?;
        let signature = b64()
            .decode(json.signatureasvch.trim())
            .map_err(|e| CodecError::Invalid(format!("signatureasvchのBase64デコードに失敗: {e}")))?;
        if signature.is_empty() {
            return Err(CodecError::Invalid("署名が空です".to_string()));
        }

        Ok(Self {
            version: json.version,
            hash_type: HashType::parse(&json.hashtype)?,
            system_id,
            identity_id,
            signature_height: json.signatureheight,
            signature,
        })
    }
}

impl Encode for VerifiableSignatureData {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_varint(self.version);
        writer.write_varint(self.flags());
        writer.write_varint(self.hash_type.code());
        writer.write_slice(self.system_id.as_bytes());
        writer.write_slice(self.identity_id.as_bytes());
        if let Some(height) = self.signature_height {
            writer.write_u32_le(height);
        }
        writer.write_var_slice(&self.signature);
    }
}

impl Decode for VerifiableSignatureData {
    fn decode(reader: &mut BufferReader<'_>) -> Result<Self, CodecError> {
        let version = reader.read_varint()?;
        if version != SIGNATURE_DATA_VERSION {
            return Err(CodecError::Invalid(format!(
                "署名データのバージョンが不正です: {version}"
            )));
        }
        let flags = reader.read_varint()?;
        if flags & !FLAG_HAS_HEIGHT != 0 {
            return Err(CodecError::Invalid(format!(
                "署名データに未知のフラグがあります: {flags:#x}"
            )));
        }
        let hash_type = HashType::from_code(reader.read_varint()?)?;
        let system_id = IAddress::from_bytes(reader.read_array::<20>()?);
        let identity_id = IAddress::from_bytes(reader.read_array::<20>()?);
        let signature_height = if flags & FLAG_HAS_HEIGHT != 0 {
            Some(reader.read_u32_le()?)
        } else {
            None
        };
        let signature = reader.read_var_slice()?.to_vec();
        Ok(Self {
            version,
            hash_type,
            system_id,
            identity_id,
            signature_height,
            signature,
        })
    }
}
