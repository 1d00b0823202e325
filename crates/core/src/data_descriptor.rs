//! # DataDescriptor
//!
//! 署名対象オブジェクトの最小単位。バージョン・フラグ付きの任意バイナリを保持する。
//!
//! ```text
//! VARINT version | VARINT flags | varbytes objectdata
//!   | [varstring label    if FLAG_LABEL_PRESENT]
//!   | [varstring mimetype if FLAG_MIME_TYPE_PRESENT]
//! ```

use verus_request_types::{DataDescriptorJson, ObjectDataJson};

use crate::codec::{check_limited_string, BufferReader, BufferWriter, CodecError, Decode, Encode};

/// バージョン（現行は1のみ）
pub const DATA_DESCRIPTOR_VERSION: u64 = 1;

/// 暗号化データ
pub const FLAG_ENCRYPTED_DATA: u64 = 0x01;
/// ソルトあり
pub const FLAG_SALT_PRESENT: u64 = 0x02;
/// 暗号化公開鍵あり
pub const FLAG_ENCRYPTION_PUBLIC_KEY_PRESENT: u64 = 0x04;
/// 閲覧鍵あり
pub const FLAG_INCOMING_VIEWING_KEY_PRESENT: u64 = 0x08;
/// 対称鍵あり
pub const FLAG_SYMMETRIC_ENCRYPTION_KEY_PRESENT: u64 = 0x10;
/// ラベルあり
pub const FLAG_LABEL_PRESENT: u64 = 0x20;
/// MIMEタイプあり
pub const FLAG_MIME_TYPE_PRESENT: u64 = 0x40;

/// 暗号化関連のフラグ。このゲートウェイは暗号化済みディスクリプタを構築しない。
const ENCRYPTION_FLAGS: u64 = FLAG_ENCRYPTED_DATA
    | FLAG_SALT_PRESENT
    | FLAG_ENCRYPTION_PUBLIC_KEY_PRESENT
    | FLAG_INCOMING_VIEWING_KEY_PRESENT
    | FLAG_SYMMETRIC_ENCRYPTION_KEY_PRESENT;

const PRESENCE_FLAGS: u64 = FLAG_LABEL_PRESENT | FLAG_MIME_TYPE_PRESENT;

const KNOWN_FLAGS: u64 = ENCRYPTION_FLAGS | PRESENCE_FLAGS;

/// バージョン・フラグ付きのバイナリペイロード。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDescriptor {
    /// 構造のバージョン
    pub version: u64,
    /// フラグ。ラベル/MIMEの存在ビットはシリアライズ時にフィールドの有無から決まる。
    pub flags: u64,
    /// 任意のバイナリペイロード
    pub object_data: Vec<u8>,
    /// ラベル
    pub label: Option<String>,
    /// MIMEタイプ
    pub mime_type: Option<String>,
}

impl DataDescriptor {
    /// 既定のバージョン・フラグでペイロードを包む。
    pub fn new(object_data: Vec<u8>) -> Self {
        Self {
            version: DATA_DESCRIPTOR_VERSION,
            flags: 0,
            object_data,
            label: None,
            mime_type: None,
        }
    }

    /// JSON表現から構築する。
    ///
    /// `version` 省略時は1、`flags` 省略時は0。ラベル/MIMEの存在ビットは自動で付与し、
    /// 保持するフラグはデコード結果と同じ値になる。
    pub fn from_json(json: &DataDescriptorJson) -> Result<Self, CodecError> {
        let version = json.version.unwrap_or(DATA_DESCRIPTOR_VERSION);
        check_version(version)?;

        let flags = json.flags.unwrap_or(0);
        check_flags(flags)?;

        let object_data = match &json.objectdata {
            None => Vec::new(),
            Some(ObjectDataJson::Hex(s)) => hex::decode(s.trim())
                .map_err(|e| CodecError::Invalid(format!("objectdataのhexデコードに失敗: {e}")))?,
            Some(ObjectDataJson::Message { message }) => message.as_bytes().to_vec(),
        };

        let label = non_empty(json.label.as_deref());
        let mime_type = non_empty(json.mimetype.as_deref());

        if flags & FLAG_LABEL_PRESENT != 0 && label.is_none() {
            return Err(CodecError::Invalid(
                "FLAG_LABEL_PRESENTが立っていますがlabelがありません".to_string(),
            ));
        }
        if flags & FLAG_MIME_TYPE_PRESENT != 0 && mime_type.is_none() {
            return Err(CodecError::Invalid(
                "FLAG_MIME_TYPE_PRESENTが立っていますがmimetypeがありません".to_string(),
            ));
        }
        if let Some(label) = &label {
            check_limited_string("label", label)?;
        }
        if let Some(mime_type) = &mime_type {
            check_limited_string("mimetype", mime_type)?;
        }

        let mut descriptor = Self {
            version,
            flags,
            object_data,
            label,
            mime_type,
        };
        descriptor.flags = descriptor.effective_flags();
        Ok(descriptor)
    }

    /// シリアライズされるフラグ値。
    pub fn effective_flags(&self) -> u64 {
        let mut flags = self.flags & !PRESENCE_FLAGS;
        if self.label.is_some() {
            flags |= FLAG_LABEL_PRESENT;
        }
        if self.mime_type.is_some() {
            flags |= FLAG_MIME_TYPE_PRESENT;
        }
        flags
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn check_version(version: u64) -> Result<(), CodecError> {
    if version != DATA_DESCRIPTOR_VERSION {
        return Err(CodecError::Invalid(format!(
            "DataDescriptorのバージョンが不正です: {version}"
        )));
    }
    Ok(())
}

fn check_flags(flags: u64) -> Result<(), CodecError> {
    if flags & !KNOWN_FLAGS != 0 {
        return Err(CodecError::Invalid(format!(
            "DataDescriptorに未知のフラグがあります: {flags:#x}"
        )));
    }
    if flags & ENCRYPTION_FLAGS != 0 {
        return Err(CodecError::Unsupported(format!(
            "暗号化されたDataDescriptorは構築できません (flags: {flags:#x})"
        )));
    }
    Ok(())
}

impl Encode for DataDescriptor {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_varint(self.version);
        writer.write_varint(self.effective_flags());
        writer.write_var_slice(&self.object_data);
        if let Some(label) = &self.label {
            writer.write_var_string(label);
        }
        if let Some(mime_type) = &self.mime_type {
            writer.write_var_string(mime_type);
        }
    }
}

impl Decode for DataDescriptor {
    fn decode(reader: &mut BufferReader<'_>) -> Result<Self, CodecError> {
        let version = reader.read_varint()?;
        check_version(version)?;
        let flags = reader.read_varint()?;
        check_flags(flags)?;
        let object_data = reader.read_var_slice()?.to_vec();
        let label = if flags & FLAG_LABEL_PRESENT != 0 {
            Some(reader.read_limited_string("label")?)
        } else {
            None
        };
        let mime_type = if flags & FLAG_MIME_TYPE_PRESENT != 0 {
            Some(reader.read_limited_string("mimetype")?)
        } else {
            None
        };
        Ok(Self {
            version,
            flags,
            object_data,
            label,
            mime_type,
        })
    }
}
