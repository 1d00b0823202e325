//! # 署名者
//!
//! 署名は外部の署名デーモン（IDの鍵を持つウォレットノード）が行う。
//! Gatewayはこのトレイトを通してのみ署名を依頼する。

use serde::Deserialize;

use crate::error::GatewayError;

/// 署名デーモンの `signdata` 結果のうち、Gatewayが読むフィールド。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SignDataResult {
    /// Base64エンコードされた署名
    #[serde(default)]
    pub signature: Option<String>,
    /// 署名したIDのi-address
    #[serde(default)]
    pub identityaddress: Option<String>,
    /// 旧形式の応答でのID
    #[serde(default)]
    pub address: Option<String>,
    /// ハッシュ種別
    #[serde(default)]
    pub hashtype: Option<String>,
    /// 署名時のブロック高
    #[serde(default)]
    pub signatureheight: Option<u32>,
}

/// 署名者の抽象インターフェース。
///
/// 実装はJSON-RPCクライアント（[`crate::rpc::VerusRpcClient`]）とテスト用のモック。
#[async_trait::async_trait]
pub trait MessageSigner: Send + Sync {
    /// `address` の鍵で `message_hex` に署名させ、デーモンの結果オブジェクトを返す。
    ///
    /// リトライは行わない。
    async fn sign_message(
        &self,
        address: &str,
        message_hex: &str,
    ) -> Result<serde_json::Value, GatewayError>;
}
