use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:25917";
const DEFAULT_PENDING_TIMEOUT_SECS: u64 = 60;

/// 服务器配置，全部来自环境变量
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// 质疑、摸牌决定无人回应时自动结算的等待时间；None 表示不自动结算
    pub pending_timeout: Option<Duration>,
    /// 固定种子，用于复现洗牌和房间号
    pub seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env::var("UNO_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("UNO_BIND_ADDR 不是合法的地址: {}", bind_addr))?;

        let timeout_secs = match env::var("UNO_PENDING_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("UNO_PENDING_TIMEOUT_SECS 不是整数: {}", raw))?,
            Err(_) => DEFAULT_PENDING_TIMEOUT_SECS,
        };
        let pending_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        let seed = match env::var("UNO_SEED") {
            Ok(raw) => Some(raw.trim().parse::<u64>().with_context(|| format!("UNO_SEED 不是整数: {}", raw))?),
            Err(_) => None,
        };

        Ok(Config { bind_addr, pending_timeout, seed })
    }
}
