//! aria2-rpc - aria2 JSON-RPC 客户端
//!
//! 为 aria2 守护进程提供 RPC 调用封装和 WebSocket 通知分发。
//!
//! # 核心功能
//!
//! - **RPC 调用**: 按 URI scheme 选择 HTTP 或 WebSocket，自动注入 `token:<secret>`
//! - **通知分发**: 一条 WebSocket 连接上的 aria2 通知按事件类型扇出到六条有界通道
//! - **订阅方式**: 直接读通道、`listen_multiple` 多事件回调、`listen_once` 单事件回调
//! - **轮询监听**: 无法使用 WebSocket 时按间隔查询任务状态
//!
//! # Feature Flags
//!
//! - `http`: HTTP(S) RPC 调用（默认开启）
//!
//! # 丢弃策略
//!
//! 分发循环从不等待订阅者：某种事件的通道满了（没人读或读得太慢），新事件直接丢弃，
//! 丢弃数可从 [`Notify::stats`] 查到。需要不丢事件时，请持续读取对应通道。

pub mod caller;
pub mod client;
pub mod config;
pub mod error;
pub mod notify;
pub mod protocol;
pub mod transport;
pub mod types;

// Re-exports
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, ReadError, Result};
pub use notify::{Callback, DispatchStats, EventStream, Notify, StopHandle, Tasks};
pub use protocol::{EventKind, NotificationFrame, SubjectId};
pub use transport::{Transport, WsTransport};
pub use types::*;
