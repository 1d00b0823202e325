//! # Verus Request Core
//!
//! データパケットリクエストの検証・組み立てと、ウォレットが読むバイナリ表現を実装する。
//!
//! ## 処理フロー
//! 1. フォームの入力を検証する（[`validate`]）
//! 2. フラグを組み立て、署名対象オブジェクトを決める（[`builder`]）
//! 3. リクエスト詳細を正規バイト列にシリアライズする（[`details`]）
//! 4. 汎用エンベロープに包み、ディープリンクにする（[`envelope`]）
//!
//! 署名そのものは外部の署名デーモンが行う。このクレートはI/Oを持たない。

pub mod builder;
pub mod codec;
pub mod compact_address;
pub mod data_descriptor;
pub mod details;
pub mod envelope;
pub mod signature;
pub mod url_ref;
pub mod validate;
pub mod vdxf;

pub use builder::{build_request, decode_url_descriptor, BuiltRequest};
pub use codec::{CodecError, Decode, Encode};
pub use compact_address::CompactIAddress;
pub use data_descriptor::DataDescriptor;
pub use details::{DataPacketRequestDetails, RequestFlags};
pub use envelope::{GenericRequest, RequestDetail, ResponseUri, ResponseUriKind};
pub use signature::{HashType, VerifiableSignatureData};
pub use url_ref::{CrossChainDataRef, UrlRef};
pub use validate::ValidationError;
pub use vdxf::VdxfUniValue;
