//! # VDXFキー付き共用体コンテナ
//!
//! 既知のVDXFキーの下に型付きの値を格納する。エントリはバッファ終端まで続く。
//!
//! ```text
//! entry: 20B VDXFキー | VARINT version | varbytes payload
//! ```

use verus_request_crypto::IAddress;

use crate::codec::{BufferReader, BufferWriter, CodecError, Decode, Encode};
use crate::url_ref::CrossChainDataRef;

/// `vrsc::data.type.object.crosschaindataref` のVDXFキー
pub const CROSSCHAIN_DATAREF_KEY: IAddress = IAddress::from_bytes([
    0x30, 0x06, 0x17, 0xab, 0x23, 0xba, 0xc8, 0x8a, 0x76, 0xe4, 0xf2, 0x24, 0x58, 0x9d, 0x21,
    0x64, 0x2f, 0x53, 0x96, 0x3a,
]);

/// エントリのバージョン
pub const VDXF_ENTRY_VERSION: u64 = 1;

/// コンテナ内の値。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VdxfValue {
    /// クロスチェーンデータ参照
    CrossChainDataRef(CrossChainDataRef),
    /// このゲートウェイが解釈しないキーの値
    Raw(Vec<u8>),
}

/// キー付きのエントリ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VdxfEntry {
    /// VDXFキー
    pub key: IAddress,
    /// エントリのバージョン
    pub version: u64,
    /// 値
    pub value: VdxfValue,
}

/// VDXFキー付き共用体コンテナ。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VdxfUniValue {
    pub entries: Vec<VdxfEntry>,
}

impl VdxfUniValue {
    /// クロスチェーンデータ参照1つだけを持つコンテナ。
    pub fn from_data_ref(data_ref: CrossChainDataRef) -> Self {
        Self {
            entries: vec![VdxfEntry {
                key: CROSSCHAIN_DATAREF_KEY,
                version: VDXF_ENTRY_VERSION,
                value: VdxfValue::CrossChainDataRef(data_ref),
            }],
        }
    }

    /// 最初のクロスチェーンデータ参照。
    pub fn data_ref(&self) -> Option<&CrossChainDataRef> {
        self.entries.iter().find_map(|entry| match &entry.value {
            VdxfValue::CrossChainDataRef(data_ref) => Some(data_ref),
            VdxfValue::Raw(_) => None,
        })
    }
}

impl Encode for VdxfUniValue {
    fn encode(&self, writer: &mut BufferWriter) {
        for entry in &self.entries {
            writer.write_slice(entry.key.as_bytes());
            writer.write_varint(entry.version);
            match &entry.value {
                VdxfValue::CrossChainDataRef(data_ref) => {
                    writer.write_var_slice(&data_ref.to_bytes())
                }
                VdxfValue::Raw(bytes) => writer.write_var_slice(bytes),
            }
        }
    }
}

impl Decode for VdxfUniValue {
    fn decode(reader: &mut BufferReader<'_>) -> Result<Self, CodecError> {
        let mut entries = Vec::new();
        while !reader.is_empty() {
            let key = IAddress::from_bytes(reader.read_array::<20>()?);
            let version = reader.read_varint()?;
            let payload = reader.read_var_slice()?;
            let value = if key == CROSSCHAIN_DATAREF_KEY {
                VdxfValue::CrossChainDataRef(CrossChainDataRef::from_bytes(payload)?)
            } else {
                VdxfValue::Raw(payload.to_vec())
            };
            entries.push(VdxfEntry {
                key,
                version,
                value,
            });
        }
        Ok(Self { entries })
    }
}
