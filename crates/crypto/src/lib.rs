//! # Verus リクエスト暗号プリミティブ
//!
//! リクエスト構築で必要になるハッシュ計算とアドレス表現を提供する。
//! 署名そのものは外部の署名デーモンが行うため、このクレートは秘密鍵を扱わない。
//!
//! ## アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | ハッシュ | SHA-256 |
//! | チェックサム | SHA-256d（二重SHA-256）の先頭4バイト |
//! | アドレス表現 | Base58Check |

use std::fmt;

use base58::{FromBase58, ToBase58};
use sha2::{Digest, Sha256};

/// i-address（VerusID / VDXFキー）のバージョンバイト
pub const I_ADDRESS_VERSION: u8 = 102;

/// i-addressのハッシュ部分の長さ（Hash160）
pub const ID_HASH_LEN: usize = 20;

/// Base58Checkのチェックサム長
const CHECKSUM_LEN: usize = 4;

/// 暗号処理のエラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Base58として解釈できない文字列
    #[error("Base58デコードに失敗しました: {0}")]
    InvalidBase58(String),
    /// チェックサム不一致
    #[error("Base58Checkのチェックサムが一致しません")]
    ChecksumMismatch,
    /// デコード結果の長さが不正
    #[error("アドレス長が不正です: {actual} bytes (期待値: {expected} bytes)")]
    InvalidLength {
        /// 期待される長さ
        expected: usize,
        /// 実際の長さ
        actual: usize,
    },
    /// 想定外のバージョンバイト
    #[error("アドレスのバージョンバイトが不正です: {0}")]
    UnexpectedVersion(u8),
}

/// SHA-256ハッシュ計算。
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// 二重SHA-256ハッシュ計算。Base58Checkのチェックサムに使用する。
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// バージョンバイト + ペイロードをBase58Check文字列にエンコードする。
pub fn base58check_encode(version: u8, payload: &[u8]) -> String {
    let mut buf = Vec::with_capacity(1 + payload.len() + CHECKSUM_LEN);
    buf.push(version);
    buf.extend_from_slice(payload);
    let checksum = sha256d(&buf);
    buf.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    buf.to_base58()
}

/// Base58Check文字列をデコードし、(バージョンバイト, ペイロード) を返す。
pub fn base58check_decode(s: &str) -> Result<(u8, Vec<u8>), CryptoError> {
    let raw = s
        .from_base58()
        .map_err(|e| CryptoError::InvalidBase58(format!("{e:?}")))?;

    if raw.len() < 1 + CHECKSUM_LEN {
        return Err(CryptoError::InvalidLength {
            expected: 1 + CHECKSUM_LEN,
            actual: raw.len(),
        });
    }

    let (body, checksum) = raw.split_at(raw.len() - CHECKSUM_LEN);
    if sha256d(body)[..CHECKSUM_LEN] != *checksum {
        return Err(CryptoError::ChecksumMismatch);
    }

    Ok((body[0], body[1..].to_vec()))
}

/// 文字列がBase58アルファベットのみで構成されているか。
pub fn is_base58_alphabet(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
        })
}

// ---------------------------------------------------------------------------
// i-address
// ---------------------------------------------------------------------------

/// チェーン上のID・VDXFキー・システムを指す20バイトの識別子。
///
/// 文字列表現はバージョンバイト102のBase58Check（先頭が `i` になる）。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IAddress([u8; ID_HASH_LEN]);

impl IAddress {
    /// 20バイトのハッシュから構築する。
    pub const fn from_bytes(bytes: [u8; ID_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// ハッシュ部分のバイト列。
    pub fn as_bytes(&self) -> &[u8; ID_HASH_LEN] {
        &self.0
    }

    /// i-address文字列をパースする。
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        let (version, payload) = base58check_decode(s)?;
        if version != I_ADDRESS_VERSION {
            return Err(CryptoError::UnexpectedVersion(version));
        }
        let bytes: [u8; ID_HASH_LEN] =
            payload
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::InvalidLength {
                    expected: ID_HASH_LEN,
                    actual: payload.len(),
                })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for IAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58check_encode(I_ADDRESS_VERSION, &self.0))
    }
}

impl fmt::Debug for IAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IAddress({self})")
    }
}
