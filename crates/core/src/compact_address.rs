//! # CompactIAddress
//!
//! リクエストIDとして使う、IDまたはコンテンツアドレスの短縮表現。
//!
//! ```text
//! VARINT version | VARINT type | (20B i-address | varstring 完全修飾名)
//! ```

use verus_request_crypto::{is_base58_alphabet, IAddress};

use crate::codec::{BufferReader, BufferWriter, CodecError, Decode, Encode};

/// バージョン
pub const COMPACT_ADDRESS_VERSION: u64 = 1;
/// VDXFキー
pub const TYPE_VDXF_KEY: u64 = 1;
/// i-address
pub const TYPE_I_ADDRESS: u64 = 2;
/// 完全修飾名
pub const TYPE_FQN: u64 = 3;

/// i-addressの文字列長（バージョン102のBase58Checkは常に34文字）
const I_ADDRESS_STR_LEN: usize = 34;

/// 名前の最大長（バイト）
const MAX_NAME_LEN: usize = 255;

/// 名前に使えない文字
const FORBIDDEN_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '@'];

/// i-addressまたは完全修飾名。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactIAddress {
    /// i-address
    IAddress(IAddress),
    /// 完全修飾名（例: `alice.vrsc`）
    FullyQualifiedName(String),
}

impl CompactIAddress {
    /// アドレス文字列から構築する。
    ///
    /// Base58Checkとして読めるi-addressならi-address、i-addressの形をしていて
    /// チェックサムが合わないものはエラー、それ以外は名前として検査する。
    pub fn from_address(address: &str) -> Result<Self, CodecError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(CodecError::Invalid("アドレスが空です".to_string()));
        }

        if looks_like_iaddress(address) {
            return IAddress::parse(address)
                .map(CompactIAddress::IAddress)
                .map_err(|e| CodecError::Invalid(format!("i-addressとして不正です: {e}")));
        }

        check_name(address)?;
        Ok(CompactIAddress::FullyQualifiedName(address.to_string()))
    }

    fn type_tag(&self) -> u64 {
        match self {
            CompactIAddress::IAddress(_) => TYPE_I_ADDRESS,
            CompactIAddress::FullyQualifiedName(_) => TYPE_FQN,
        }
    }
}

impl std::fmt::Display for CompactIAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompactIAddress::IAddress(addr) => write!(f, "{addr}"),
            CompactIAddress::FullyQualifiedName(name) => f.write_str(name),
        }
    }
}

fn looks_like_iaddress(s: &str) -> bool {
    s.len() == I_ADDRESS_STR_LEN && s.starts_with('i') && is_base58_alphabet(s)
}

fn check_name(name: &str) -> Result<(), CodecError> {
    if name.len() > MAX_NAME_LEN {
        return Err(CodecError::Invalid(format!(
            "名前が長すぎます: {} bytes (上限: {MAX_NAME_LEN} bytes)",
            name.len()
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| FORBIDDEN_NAME_CHARS.contains(c) || c.is_control())
    {
        return Err(CodecError::Invalid(format!(
            "名前に使用できない文字が含まれています: {c:?}"
        )));
    }
    if name.starts_with('.') || name.ends_with('.') || name.contains("..") {
        return Err(CodecError::Invalid(format!("名前の区切りが不正です: {name}")));
    }
    Ok(())
}

impl Encode for CompactIAddress {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_varint(COMPACT_ADDRESS_VERSION);
        writer.write_varint(self.type_tag());
        match self {
            CompactIAddress::IAddress(addr) => writer.write_slice(addr.as_bytes()),
            CompactIAddress::FullyQualifiedName(name) => writer.write_var_string(name),
        }
    }
}

impl Decode for CompactIAddress {
    fn decode(reader: &mut BufferReader<'_>) -> Result<Self, CodecError> {
        let version = reader.read_varint()?;
        if version != COMPACT_ADDRESS_VERSION {
            return Err(CodecError::Invalid(format!(
                "CompactIAddressのバージョンが不正です: {version}"
            )));
        }
        match reader.read_varint()? {
            TYPE_I_ADDRESS => Ok(CompactIAddress::IAddress(IAddress::from_bytes(
                reader.read_array::<20>()?,
            ))),
            TYPE_FQN => {
                let name = reader.read_var_string()?;
                check_name(&name)?;
                Ok(CompactIAddress::FullyQualifiedName(name))
            }
            TYPE_VDXF_KEY => Err(CodecError::Unsupported("VDXFキー型のアドレス".to_string())),
            other => Err(CodecError::Invalid(format!(
                "不明なアドレス種別です: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VRSC_ID: &str = "i5w5MuNik5NtLcYmNzcvaoixooEebB6MGV";

    #[test]
    fn test_from_iaddress() {
        let addr = CompactIAddress::from_address(VRSC_ID).unwrap();
        assert!(matches!(addr, CompactIAddress::IAddress(_)));
        assert_eq!(addr.to_string(), VRSC_ID);

        let bytes = addr.to_bytes();
        assert_eq!(bytes.len(), 2 + 20);
        assert_eq!(&bytes[..2], &[1, TYPE_I_ADDRESS as u8]);
        assert_eq!(CompactIAddress::from_bytes(&bytes).unwrap(), addr);
    }

    #[test]
    fn test_from_name() {
        let addr = CompactIAddress::from_address("  alice.vrsc ").unwrap();
        assert_eq!(
            addr,
            CompactIAddress::FullyQualifiedName("alice.vrsc".to_string())
        );
        assert_eq!(CompactIAddress::from_bytes(&addr.to_bytes()).unwrap(), addr);
    }

    /// i-addressの形でチェックサムが合わないものは名前扱いせずエラーにする
    #[test]
    fn test_broken_iaddress_is_error() {
        let tampered = VRSC_ID.replace("MGV", "MGW");
        assert!(CompactIAddress::from_address(&tampered).is_err());
    }

    #[test]
    fn test_rejects_forbidden_names() {
        for bad in ["", "   ", "alice@", "a/b", "x:y", "a..b", ".a", "tab\tname"] {
            assert!(
                CompactIAddress::from_address(bad).is_err(),
                "受理されてしまった: {bad:?}"
            );
        }
    }

    #[test]
    fn test_decode_unknown_type() {
        assert!(matches!(
            CompactIAddress::from_bytes(&[1, 7]),
            Err(CodecError::Invalid(_))
        ));
        assert!(matches!(
            CompactIAddress::from_bytes(&[1, 1]),
            Err(CodecError::Unsupported(_))
        ));
    }
}
