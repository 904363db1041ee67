//! RPC 调用通道
//!
//! 根据 URI scheme 选择：http/https → HTTP POST，ws/wss → WebSocket 长连接。

#[cfg(feature = "http")]
mod http;
mod ws;

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

#[cfg(feature = "http")]
pub use http::HttpCaller;
pub use ws::WsCaller;

/// 请求 ID 生成器（进程内单调递增）
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_request_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// RPC 调用通道
pub enum Caller {
    #[cfg(feature = "http")]
    Http(HttpCaller),
    Ws(WsCaller),
}

impl Caller {
    /// 按 scheme 创建调用通道
    ///
    /// HTTP 不会预先建立连接；WebSocket 会立即连接，失败时返回 `Error::Connect`。
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let url = Url::parse(&config.uri)?;
        let scheme = url.scheme().to_string();

        match scheme.as_str() {
            #[cfg(feature = "http")]
            "http" | "https" => Ok(Caller::Http(HttpCaller::new(url, config.request_timeout)?)),
            "ws" | "wss" => Ok(Caller::Ws(
                WsCaller::connect(url, config.request_timeout).await?,
            )),
            other => Err(Error::UnsupportedScheme(other.to_string())),
        }
    }

    /// 调用远程方法，返回 result 字段
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        tracing::trace!("→ {} ({} params)", method, params.len());
        match self {
            #[cfg(feature = "http")]
            Caller::Http(h) => h.call(method, params).await,
            Caller::Ws(w) => w.call(method, params).await,
        }
    }

    /// 关闭调用通道（幂等）
    pub async fn close(&self) {
        match self {
            #[cfg(feature = "http")]
            Caller::Http(_) => {}
            Caller::Ws(w) => w.close().await,
        }
    }
}
