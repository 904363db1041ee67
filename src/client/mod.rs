//! aria2 Client 模块
//!
//! 提供 RPC 调用封装、通知会话入口和轮询式状态监听

mod connect;
mod methods;
mod polling;

pub use connect::Client;
