//! # データパケットリクエスト詳細
//!
//! ウォレットに渡す「データパケット」リクエストの本体と、そのフラグ。
//!
//! ```text
//! VARINT version | VARINT flags | CompactSize n | DataDescriptor * n
//!   | [CompactSize m | varstring * m   if HAS_STATEMENTS]
//!   | [VerifiableSignatureData         if HAS_SIGNATURE]
//!   | [CompactIAddress                 if HAS_REQUEST_ID]
//! ```

use std::ops::BitOr;

use crate::codec::{BufferReader, BufferWriter, CodecError, Decode, Encode};
use crate::compact_address::CompactIAddress;
use crate::data_descriptor::DataDescriptor;
use crate::signature::VerifiableSignatureData;

/// バージョン
pub const DATA_PACKET_DETAILS_VERSION: u64 = 1;

/// リクエストフラグ。
///
/// フォームの真偽値から毎回組み立てる派生値で、永続化しない。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RequestFlags(u64);

impl RequestFlags {
    pub const HAS_REQUEST_ID: Self = Self(0x01);
    pub const HAS_STATEMENTS: Self = Self(0x02);
    pub const HAS_SIGNATURE: Self = Self(0x04);
    pub const FOR_USERS_SIGNATURE: Self = Self(0x08);
    pub const FOR_TRANSMITTAL_TO_USER: Self = Self(0x10);
    pub const HAS_URL_FOR_DOWNLOAD: Self = Self(0x20);

    /// 定義済みの全ビット
    pub const ALL: Self = Self(0x3f);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// 未定義ビットを含む場合は `None`。
    pub const fn from_bits(bits: u64) -> Option<Self> {
        if bits & !Self::ALL.0 != 0 {
            None
        } else {
            Some(Self(bits))
        }
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    /// HAS_SIGNATURE と FOR_USERS_SIGNATURE が同時に立っているか。
    pub const fn has_conflicting_signature_flags(self) -> bool {
        self.contains(Self::HAS_SIGNATURE) && self.contains(Self::FOR_USERS_SIGNATURE)
    }
}

impl BitOr for RequestFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// データパケットリクエストの詳細。
///
/// リクエストごとに新しく組み立て、シリアライズ後は変更しない。
/// 組み立ては `builder` が行い、フラグとOptionalフィールドの対応を保証する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacketRequestDetails {
    pub version: u64,
    pub flags: RequestFlags,
    /// 署名対象オブジェクト（順序を保持する）
    pub signable_objects: Vec<DataDescriptor>,
    /// ステートメント（空でない場合のみ `Some`）
    pub statements: Option<Vec<String>>,
    /// 事前に取得した署名
    pub signature: Option<VerifiableSignatureData>,
    /// リクエストID
    pub request_id: Option<CompactIAddress>,
}

impl DataPacketRequestDetails {
    /// シリアライズされるフラグ値。Optionalフィールドの存在ビットは実際の有無に合わせる。
    pub fn wire_flags(&self) -> RequestFlags {
        let mut flags = self.flags;
        flags.set(RequestFlags::HAS_STATEMENTS, self.statements.is_some());
        flags.set(RequestFlags::HAS_SIGNATURE, self.signature.is_some());
        flags.set(RequestFlags::HAS_REQUEST_ID, self.request_id.is_some());
        flags
    }

    /// 署名対象のバイト列。埋め込み済みの署名とHAS_SIGNATUREを除いた形。
    ///
    /// 署名を持たない詳細では `to_bytes()` と一致する。
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut unsigned = self.clone();
        unsigned.signature = None;
        unsigned.flags.remove(RequestFlags::HAS_SIGNATURE);
        unsigned.to_bytes()
    }
}

impl Encode for DataPacketRequestDetails {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_varint(self.version);
        writer.write_varint(self.wire_flags().bits());

        writer.write_compact_size(self.signable_objects.len() as u64);
        for object in &self.signable_objects {
            object.encode(writer);
        }

        if let Some(statements) = &self.statements {
            writer.write_compact_size(statements.len() as u64);
            for statement in statements {
                writer.write_var_string(statement);
            }
        }
        if let Some(signature) = &self.signature {
            signature.encode(writer);
        }
        if let Some(request_id) = &self.request_id {
            request_id.encode(writer);
        }
    }
}

impl Decode for DataPacketRequestDetails {
    fn decode(reader: &mut BufferReader<'_>) -> Result<Self, CodecError> {
        let version = reader.read_varint()?;
        if version != DATA_PACKET_DETAILS_VERSION {
            return Err(CodecError::Invalid(format!(
                "リクエスト詳細のバージョンが不正です: {version}"
            )));
        }

        let raw_flags = reader.read_varint()?;
        let flags = RequestFlags::from_bits(raw_flags).ok_or_else(|| {
            CodecError::Invalid(format!("未知のリクエストフラグがあります: {raw_flags:#x}"))
        })?;
        if flags.has_conflicting_signature_flags() {
            return Err(CodecError::Invalid(
                "HAS_SIGNATUREとFOR_USERS_SIGNATUREは同時に指定できません".to_string(),
            ));
        }

        let count = reader.read_count()?;
        let mut signable_objects = Vec::with_capacity(count);
        for _ in 0..count {
            signable_objects.push(DataDescriptor::decode(reader)?);
        }

        let statements = if flags.contains(RequestFlags::HAS_STATEMENTS) {
            let count = reader.read_count()?;
            let mut statements = Vec::with_capacity(count);
            for _ in 0..count {
                statements.push(reader.read_var_string()?);
            }
            Some(statements)
        } else {
            None
        };

        let signature = if flags.contains(RequestFlags::HAS_SIGNATURE) {
            Some(VerifiableSignatureData::decode(reader)?)
        } else {
            None
        };

        let request_id = if flags.contains(RequestFlags::HAS_REQUEST_ID) {
            Some(CompactIAddress::decode(reader)?)
        } else {
            None
        };

        Ok(Self {
            version,
            flags,
            signable_objects,
            statements,
            signature,
            request_id,
        })
    }
}
