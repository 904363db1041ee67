//! 轮询式状态监听
//!
//! 只在无法使用 WebSocket 通知时使用。

use std::time::Duration;

use tokio::sync::mpsc;

use super::Client;
use crate::types::Status;

impl Client {
    /// 每隔 `interval` 查询一次任务状态
    ///
    /// 以下情况任务结束、通道关闭：
    /// - RPC 调用失败
    /// - 返回的 gid 为空（任务可能已被移除）
    /// - 接收端被 drop
    pub fn status_listener_by_polling(&self, gid: &str, interval: Duration) -> mpsc::Receiver<Status> {
        let (tx, rx) = mpsc::channel(1);
        let client = self.clone();
        let gid = gid.to_string();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = ticker.tick() => {}
                }

                match client.tell_status(&gid, &[]).await {
                    Ok(status) if status.gid.is_empty() => {
                        tracing::info!("gid {} not found, maybe it was removed", gid);
                        break;
                    }
                    Ok(status) => {
                        if tx.send(status).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Status polling failed: gid={}, error={}", gid, e);
                        break;
                    }
                }
            }

            tracing::debug!("Status polling finished: gid={}", gid);
        });

        rx
    }
}
