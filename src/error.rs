//! 错误类型定义

use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// 库错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 连接错误（通知会话或 ws 调用建立失败）
    #[error("连接错误: {uri}: {source}")]
    Connect {
        uri: String,
        #[source]
        source: tungstenite::Error,
    },

    /// 不支持的 URI scheme
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// URI 解析错误
    #[error("URI 解析错误: {0}")]
    Url(#[from] url::ParseError),

    /// aria2 返回的 JSON-RPC 错误
    #[error("RPC 错误: {message} (code={code})")]
    Rpc { code: i64, message: String },

    /// 通知流读取错误
    #[error("读取通知失败: {0}")]
    Read(#[from] ReadError),

    /// WebSocket 错误
    #[error("WebSocket 错误: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// HTTP 错误
    #[cfg(feature = "http")]
    #[error("HTTP 错误: {0}")]
    Http(#[from] reqwest::Error),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 请求超时
    #[error("请求超时 ({0:?})")]
    Timeout(Duration),

    /// 连接已关闭
    #[error("连接已关闭")]
    Closed,

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 创建 Client 时未开启通知
    #[error("通知未开启: 请在 ClientConfig 中设置 notify = true")]
    NotifyDisabled,

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 通知流读取错误
///
/// 对会话是致命的：分发循环遇到任何一种都会退出并关闭所有事件通道。
#[derive(Error, Debug)]
pub enum ReadError {
    /// 对端关闭连接（包括 unexpected EOF）
    #[error("连接被对端关闭: {0}")]
    ClosedByPeer(String),

    /// 读取超时
    #[error("读取超时 ({0:?})")]
    Timeout(Duration),

    /// 帧格式错误（协议失步，不可原地恢复）
    #[error("通知格式错误: {0}")]
    Malformed(String),

    /// 其他 IO / 协议错误
    #[error("{0}")]
    Other(String),
}

impl ReadError {
    /// 是否属于正常断开（对端关闭 / EOF），而非程序错误
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ReadError::ClosedByPeer(_))
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, Error>;
