//! Client 配置

use std::time::Duration;

/// 默认 aria2 RPC 地址
pub const DEFAULT_URI: &str = "http://localhost:6800/jsonrpc";

/// 每种事件通道的默认缓冲容量
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10;

/// aria2 连接配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// RPC 地址
    /// - HTTP: "http://host:6800/jsonrpc" / "https://..."
    /// - WebSocket: "ws://host:6800/jsonrpc" / "wss://..."
    ///
    /// 通知连接总是走 WebSocket，scheme 会自动换成 ws/wss。
    pub uri: String,

    /// RPC secret（`--rpc-secret`），会以 `token:<secret>` 放在参数首位
    pub token: Option<String>,

    /// 是否允许创建通知会话
    pub notify: bool,

    /// 每种事件通道的缓冲容量（最小为 1）
    pub channel_capacity: usize,

    /// 通知连接读取超时，None 表示一直等待
    pub read_timeout: Option<Duration>,

    /// 单次 RPC 调用超时
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            token: None,
            notify: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            read_timeout: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// 创建指定地址的配置
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            ..Default::default()
        }
    }

    /// 从环境变量或默认值创建配置
    ///
    /// - `ARIA2_URI`: RPC 地址
    /// - `ARIA2_TOKEN`: RPC secret
    pub fn from_env() -> Self {
        let uri = std::env::var("ARIA2_URI")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_URI.to_string());

        let token = std::env::var("ARIA2_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        Self {
            uri,
            token,
            ..Default::default()
        }
    }

    /// 设置 RPC secret
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        };
        self
    }

    /// 开启/关闭通知
    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    /// 设置事件通道容量
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// 设置通知读取超时
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// 设置 RPC 调用超时
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// 实际使用的通道容量（至少为 1）
    pub fn effective_capacity(&self) -> usize {
        self.channel_capacity.max(1)
    }
}
