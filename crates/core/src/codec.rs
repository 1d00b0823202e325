//! # バイナリコーデック
//!
//! ウォレットリクエストの各オブジェクトが共通で使うシリアライズ部品。
//!
//! ## プリミティブ
//! - `VARINT`: MSB base-128 の可変長整数（バージョン・フラグ・種別・タイムスタンプ）
//! - `CompactSize`: 1/3/5/9バイトの長さプレフィックス（要素数・バイト長）
//! - 可変長バイト列/文字列: `CompactSize` 長 + 本体

/// 可変長フィールド1つあたりの上限（破損データによる巨大確保を防ぐ）。
pub const MAX_VAR_SLICE_LEN: u64 = 4 * 1024 * 1024;

/// URL・ラベル等の制限付き文字列の最大長（バイト）。
pub const MAX_LIMITED_STRING_LEN: usize = 4096;

/// コーデックのエラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// 読み取り中にバッファ終端に達した
    #[error("バッファ終端に達しました: {needed} bytes必要ですが残りは{remaining} bytesです")]
    UnexpectedEof {
        /// 必要なバイト数
        needed: usize,
        /// 残りバイト数
        remaining: usize,
    },
    /// VARINTが64bitに収まらない
    #[error("VARINTがオーバーフローしました")]
    VarIntOverflow,
    /// 長さプレフィックスが上限を超えている
    #[error("長さプレフィックスが上限を超えています: {0} bytes")]
    LengthTooLarge(u64),
    /// UTF-8として不正な文字列
    #[error("文字列がUTF-8として不正です")]
    InvalidUtf8,
    /// デコード後に余分なバイトが残っている
    #[error("デコード後に{0} bytesの余分なデータが残っています")]
    TrailingBytes(usize),
    /// 値が構造の制約を満たさない
    #[error("{0}")]
    Invalid(String),
    /// このゲートウェイが扱わない種別
    #[error("未対応の形式です: {0}")]
    Unsupported(String),
}

// ---------------------------------------------------------------------------
// Encode / Decode
// ---------------------------------------------------------------------------

/// 正規バイト列へのシリアライズ。
pub trait Encode {
    /// ライターに自身を書き込む。
    fn encode(&self, writer: &mut BufferWriter);

    /// 正規バイト列を返す。
    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BufferWriter::new();
        self.encode(&mut writer);
        writer.into_inner()
    }
}

/// 正規バイト列からのデシリアライズ。
pub trait Decode: Sized {
    /// リーダーから1つ読み取る。
    fn decode(reader: &mut BufferReader<'_>) -> Result<Self, CodecError>;

    /// バイト列全体をちょうど1つのオブジェクトとして読み取る。
    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = BufferReader::new(bytes);
        let value = Self::decode(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// 追記専用のバイト列ライター。
#[derive(Debug, Default)]
pub struct BufferWriter {
    buf: Vec<u8>,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u32_le(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// 長さプレフィックスなしでそのまま書き込む。
    pub fn write_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// MSB base-128 VARINT。各バイトの継続ビットを立て、継続時は1を引いて冗長表現を排除する。
    pub fn write_varint(&mut self, value: u64) {
        let mut tmp = [0u8; 10];
        let mut len = 0;
        let mut n = value;
        loop {
            tmp[len] = (n & 0x7f) as u8 | if len > 0 { 0x80 } else { 0x00 };
            if n <= 0x7f {
                break;
            }
            n = (n >> 7) - 1;
            len += 1;
        }
        self.buf.extend(tmp[..=len].iter().rev());
    }

    pub fn write_compact_size(&mut self, value: u64) {
        if value < 253 {
            self.buf.push(value as u8);
        } else if value <= u64::from(u16::MAX) {
            self.buf.push(253);
            self.buf.extend_from_slice(&(value as u16).to_le_bytes());
        } else if value <= u64::from(u32::MAX) {
            self.buf.push(254);
            self.buf.extend_from_slice(&(value as u32).to_le_bytes());
        } else {
            self.buf.push(255);
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    }

    pub fn write_var_slice(&mut self, bytes: &[u8]) {
        self.write_compact_size(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_var_string(&mut self, s: &str) {
        self.write_var_slice(s.as_bytes());
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// 借用バッファ上のカーソル。
#[derive(Debug)]
pub struct BufferReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// 読み残しがないことを確認する。
    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_slice(1)?[0])
    }

    pub fn read_u32_le(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    pub fn read_varint(&mut self) -> Result<u64, CodecError> {
        let mut n: u64 = 0;
        loop {
            let byte = self.read_u8()?;
            if n > (u64::MAX >> 7) {
                return Err(CodecError::VarIntOverflow);
            }
            n = (n << 7) | u64::from(byte & 0x7f);
            if byte & 0x80 == 0 {
                return Ok(n);
            }
            n = n.checked_add(1).ok_or(CodecError::VarIntOverflow)?;
        }
    }

    pub fn read_compact_size(&mut self) -> Result<u64, CodecError> {
        match self.read_u8()? {
            253 => Ok(u64::from(u16::from_le_bytes(self.read_array::<2>()?))),
            254 => Ok(u64::from(u32::from_le_bytes(self.read_array::<4>()?))),
            255 => Ok(u64::from_le_bytes(self.read_array::<8>()?)),
            n => Ok(u64::from(n)),
        }
    }

    /// 要素数プレフィックスを読み、残りバイト数で明らかに足りない値を弾く。
    pub fn read_count(&mut self) -> Result<usize, CodecError> {
        let count = self.read_compact_size()?;
        if count > self.remaining() as u64 {
            return Err(CodecError::LengthTooLarge(count));
        }
        Ok(count as usize)
    }

    pub fn read_var_slice(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_compact_size()?;
        if len > MAX_VAR_SLICE_LEN {
            return Err(CodecError::LengthTooLarge(len));
        }
        self.read_slice(len as usize)
    }

    pub fn read_var_string(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_var_slice()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    /// 長さ上限つきの文字列を読み取る。
    pub fn read_limited_string(&mut self, field: &str) -> Result<String, CodecError> {
        let s = self.read_var_string()?;
        check_limited_string(field, &s)?;
        Ok(s)
    }
}

/// 制限付き文字列の長さ検査。
pub fn check_limited_string(field: &str, s: &str) -> Result<(), CodecError> {
    if s.len() > MAX_LIMITED_STRING_LEN {
        return Err(CodecError::Invalid(format!(
            "{field}が長すぎます: {} bytes (上限: {MAX_LIMITED_STRING_LEN} bytes)",
            s.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint_hex(n: u64) -> String {
        let mut w = BufferWriter::new();
        w.write_varint(n);
        hex::encode(w.into_inner())
    }

    /// 既知のVARINT表現と一致することを確認
    #[test]
    fn test_varint_known_vectors() {
        let vectors: &[(u64, &str)] = &[
            (0, "00"),
            (1, "01"),
            (127, "7f"),
            (128, "8000"),
            (255, "807f"),
            (256, "8100"),
            (16383, "fe7f"),
            (16384, "ff00"),
            (16511, "ff7f"),
            (65535, "82fe7f"),
            (1 << 32, "8efefeff00"),
        ];
        for (n, expected) in vectors {
            assert_eq!(varint_hex(*n), *expected, "VARINT({n})");
            let bytes = hex::decode(expected).unwrap();
            let mut r = BufferReader::new(&bytes);
            assert_eq!(r.read_varint().unwrap(), *n);
            assert!(r.is_empty());
        }
    }

    #[test]
    fn test_varint_max_value() {
        let mut w = BufferWriter::new();
        w.write_varint(u64::MAX);
        let bytes = w.into_inner();
        let mut r = BufferReader::new(&bytes);
        assert_eq!(r.read_varint().unwrap(), u64::MAX);
    }

    #[test]
    fn test_varint_overflow() {
        let bytes = [0xffu8; 12];
        let mut r = BufferReader::new(&bytes);
        assert!(matches!(
            r.read_varint(),
            Err(CodecError::VarIntOverflow) | Err(CodecError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_compact_size_boundaries() {
        let cases: &[(u64, usize)] = &[
            (0, 1),
            (252, 1),
            (253, 3),
            (0xffff, 3),
            (0x10000, 5),
            (0xffff_ffff, 5),
            (0x1_0000_0000, 9),
        ];
        for (n, len) in cases {
            let mut w = BufferWriter::new();
            w.write_compact_size(*n);
            let bytes = w.into_inner();
            assert_eq!(bytes.len(), *len, "CompactSize({n})");
            let mut r = BufferReader::new(&bytes);
            assert_eq!(r.read_compact_size().unwrap(), *n);
        }
    }

    #[test]
    fn test_var_string_and_eof() {
        let mut w = BufferWriter::new();
        w.write_var_string("héllo");
        let bytes = w.into_inner();
        assert_eq!(bytes[0], 6);

        let mut r = BufferReader::new(&bytes);
        assert_eq!(r.read_var_string().unwrap(), "héllo");
        r.finish().unwrap();

        let truncated = &bytes[..4];
        let mut r = BufferReader::new(truncated);
        assert!(matches!(
            r.read_var_string(),
            Err(CodecError::UnexpectedEof { needed: 6, remaining: 3 })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes = [2u8, 0xc3, 0x28];
        let mut r = BufferReader::new(&bytes);
        assert_eq!(r.read_var_string(), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn test_read_count_rejects_oversized() {
        let bytes = [200u8, 1, 2];
        let mut r = BufferReader::new(&bytes);
        assert_eq!(r.read_count(), Err(CodecError::LengthTooLarge(200)));
    }

    #[test]
    fn test_finish_reports_trailing() {
        let bytes = [1u8, 2, 3];
        let mut r = BufferReader::new(&bytes);
        r.read_u8().unwrap();
        assert_eq!(r.finish(), Err(CodecError::TrailingBytes(2)));
    }

    #[test]
    fn test_limited_string() {
        assert!(check_limited_string("url", &"a".repeat(MAX_LIMITED_STRING_LEN)).is_ok());
        assert!(check_limited_string("url", &"a".repeat(MAX_LIMITED_STRING_LEN + 1)).is_err());
    }
}
