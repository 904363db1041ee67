//! 分发循环
//!
//! 单个后台任务从 `Transport` 读帧，把每个 gid 投递到对应事件的通道。
//!
//! # 丢弃策略
//!
//! 投递使用 `try_send`，**永不阻塞**：通道满了（或者根本没人在读）就直接丢掉这条事件，
//! 不排队、不重试，只计入 `DispatchStats::dropped`。通道满说明当前没有订阅者关心
//! 这种事件；如果在这里等一个慢消费者，其他所有事件类型都会被卡住。
//!
//! 写测试时要注意：不读的通道最多只会留下 `capacity` 条，之后的事件都会丢失。

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;

use super::registry::Senders;
use crate::error::ReadError;
use crate::protocol::{EventKind, NotificationFrame};
use crate::transport::Transport;

/// 分发统计
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: [AtomicU64; EventKind::COUNT],
    dropped: [AtomicU64; EventKind::COUNT],
    unrouted: AtomicU64,
}

impl DispatchStats {
    /// 成功投递的 gid 数
    pub fn delivered(&self, kind: EventKind) -> u64 {
        self.delivered[kind.index()].load(Ordering::Relaxed)
    }

    /// 因通道满被丢弃的 gid 数
    pub fn dropped(&self, kind: EventKind) -> u64 {
        self.dropped[kind.index()].load(Ordering::Relaxed)
    }

    /// 所有事件类型丢弃总数
    pub fn total_dropped(&self) -> u64 {
        EventKind::ALL.iter().map(|k| self.dropped(*k)).sum()
    }

    /// 未知事件类型的 gid 数（被忽略）
    pub fn unrouted(&self) -> u64 {
        self.unrouted.load(Ordering::Relaxed)
    }
}

/// 运行分发循环，直到收到关闭信号或读取失败
///
/// 退出时先 drop 全部写端（通道在此关闭，且只关闭一次），再关闭连接。
pub(crate) async fn run<T: Transport>(
    mut transport: T,
    senders: Senders,
    mut shutdown: watch::Receiver<bool>,
    stats: std::sync::Arc<DispatchStats>,
) {
    tracing::debug!("📡 Dispatch loop started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let result = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            frame = transport.read_frame() => frame,
        };

        match result {
            Ok(frame) => route(&senders, &frame, &stats),
            Err(e) => {
                log_read_error(&e);
                break;
            }
        }
    }

    drop(senders);
    transport.close().await;

    tracing::debug!("📡 Dispatch loop exited");
}

/// 投递一帧
pub(crate) fn route(senders: &Senders, frame: &NotificationFrame, stats: &DispatchStats) {
    let Some(kind) = frame.kind() else {
        stats
            .unrouted
            .fetch_add(frame.subjects.len() as u64, Ordering::Relaxed);
        tracing::debug!(
            "📡 Ignoring unknown notification: method={}, subjects={}",
            frame.method,
            frame.subjects.len()
        );
        return;
    };

    let sender = senders.get(kind);
    for gid in &frame.subjects {
        match sender.try_send(gid.clone()) {
            Ok(()) => {
                stats.delivered[kind.index()].fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(gid)) => {
                stats.dropped[kind.index()].fetch_add(1, Ordering::Relaxed);
                tracing::trace!("📡 Channel full, dropping event: kind={:?}, gid={}", kind, gid);
            }
            Err(TrySendError::Closed(gid)) => {
                stats.dropped[kind.index()].fetch_add(1, Ordering::Relaxed);
                tracing::trace!("📡 Channel closed, dropping event: kind={:?}, gid={}", kind, gid);
            }
        }
    }
}

fn log_read_error(err: &ReadError) {
    if err.is_disconnect() {
        tracing::warn!(
            "Notification connection closed by peer ({}) | if aria2 is behind nginx, please adjust `proxy_read_timeout`",
            err
        );
    } else {
        tracing::error!("Reading notification failed: {}", err);
    }
}
