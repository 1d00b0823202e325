//! # Gateway設定・共有状態
//!
//! コマンドライン引数と環境変数からの設定読み込みと、Gatewayの共有状態の定義。
//! 設定は起動時に一度だけ読み、以降は変更しない。

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use verus_request_crypto::IAddress;

use crate::signer::MessageSigner;

/// VRSC（メインネット）のシステムID
pub const VRSC_SYSTEM_ID: &str = "i5w5MuNik5NtLcYmNzcvaoixooEebB6MGV";
/// VRSCTEST（テストネット）のシステムID
pub const VRSCTEST_SYSTEM_ID: &str = "iJhCezBExJHvtyH3fGhNnt2NhU4Ztkf2yq";

/// Gatewayの起動設定。
#[derive(Debug, Clone, Parser)]
#[command(name = "verus-request-gateway", version, about = "Verus data-packet request gateway")]
pub struct GatewayConfig {
    /// 署名デーモンのホスト（`http://` 等のスキーム付きも可）
    #[arg(long, env = "VERUS_RPC_HOST", default_value = "127.0.0.1")]
    pub rpc_host: String,

    /// 署名デーモンのRPCポート
    #[arg(long, env = "VERUS_RPC_PORT", default_value_t = 27486)]
    pub rpc_port: u16,

    /// RPCユーザー
    #[arg(long, env = "VERUS_RPC_USER", default_value = "")]
    pub rpc_user: String,

    /// RPCパスワード
    #[arg(long, env = "VERUS_RPC_PASSWORD", default_value = "", hide_env_values = true)]
    pub rpc_password: String,

    /// RPC呼び出し1回あたりのタイムアウト（秒）
    #[arg(long, env = "VERUS_RPC_TIMEOUT_SECS", default_value_t = 30)]
    pub rpc_timeout_secs: u64,

    /// テストネット運用
    #[arg(long, env = "VERUS_TESTNET", action = clap::ArgAction::Set, default_value_t = false)]
    pub testnet: bool,

    /// 署名データに記録するシステムID（省略時はネットワークに応じたVRSC/VRSCTEST）
    #[arg(long, env = "VERUS_SYSTEM_ID")]
    pub system_id: Option<String>,

    /// HTTPの待ち受けアドレス
    #[arg(long, env = "GATEWAY_LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: SocketAddr,
}

impl GatewayConfig {
    /// 署名デーモンのURL。
    pub fn rpc_url(&self) -> String {
        if self.rpc_host.contains("://") {
            format!("{}:{}", self.rpc_host.trim_end_matches('/'), self.rpc_port)
        } else {
            format!("http://{}:{}", self.rpc_host, self.rpc_port)
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// 署名データに記録するシステムID。
    pub fn resolve_system_id(&self) -> anyhow::Result<IAddress> {
        let raw = match self.system_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ if self.testnet => VRSCTEST_SYSTEM_ID,
            _ => VRSC_SYSTEM_ID,
        };
        IAddress::parse(raw)
            .map_err(|e| anyhow::anyhow!("VERUS_SYSTEM_IDがi-addressとして不正です: {raw}: {e}"))
    }
}

/// Gatewayの共有状態。
pub struct GatewayState {
    /// 署名者（JSON-RPC署名デーモン、トレイトで抽象化）
    pub signer: Box<dyn MessageSigner>,
    /// 署名データに記録するシステムID
    pub system_id: IAddress,
    /// テストネット運用か
    pub testnet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> GatewayConfig {
        let mut argv = vec!["verus-request-gateway"];
        argv.extend_from_slice(args);
        GatewayConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_rpc_url_forms() {
        let config = parse(&["--rpc-host", "10.0.0.5", "--rpc-port", "18843"]);
        assert_eq!(config.rpc_url(), "http://10.0.0.5:18843");

        let config = parse(&["--rpc-host", "https://node.example/", "--rpc-port", "443"]);
        assert_eq!(config.rpc_url(), "https://node.example:443");
    }

    #[test]
    fn test_system_id_follows_network() {
        let config = parse(&["--testnet", "false"]);
        assert_eq!(config.resolve_system_id().unwrap().to_string(), VRSC_SYSTEM_ID);

        let config = parse(&["--testnet", "true"]);
        assert_eq!(
            config.resolve_system_id().unwrap().to_string(),
            VRSCTEST_SYSTEM_ID
        );
    }

    #[test]
    fn test_system_id_override() {
        let config = parse(&["--system-id", "i52mN9h1LQxq1JmJu64fRoFN79u1ibcXG2"]);
        assert_eq!(
            config.resolve_system_id().unwrap().to_string(),
            "i52mN9h1LQxq1JmJu64fRoFN79u1ibcXG2"
        );

        let config = parse(&["--system-id", "not-an-address"]);
        assert!(config.resolve_system_id().is_err());
    }

    #[test]
    fn test_timeout() {
        let config = parse(&["--rpc-timeout-secs", "5"]);
        assert_eq!(config.rpc_timeout(), Duration::from_secs(5));
    }
}
