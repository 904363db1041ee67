//! WebSocket 调用
//!
//! 一个驱动任务独占连接：请求经 mpsc 队列写出，响应按 id 交给等待中的调用。
//! 这条连接上收到的通知（没有 id）直接忽略，通知请用 `Notify`。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::next_request_id;
use crate::error::{Error, Result};
use crate::protocol::{RpcRequest, RpcResponse};
use crate::transport::WsStream;

/// 等待响应的调用：id → 回传通道
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<RpcResponse>>>>;

/// WebSocket JSON-RPC 调用
pub struct WsCaller {
    outgoing: mpsc::Sender<Message>,
    pending: Pending,
    shutdown: watch::Sender<bool>,
    driver: Mutex<Option<JoinHandle<()>>>,
    timeout: Duration,
}

impl WsCaller {
    pub async fn connect(url: Url, timeout: Duration) -> Result<Self> {
        let (stream, _response) =
            connect_async(url.as_str())
                .await
                .map_err(|source| Error::Connect {
                    uri: url.to_string(),
                    source,
                })?;
        tracing::debug!("🔌 RPC connection established: {}", url);

        let (outgoing, outgoing_rx) = mpsc::channel(64);
        let pending: Pending = Arc::default();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let driver = tokio::spawn(drive(stream, outgoing_rx, pending.clone(), shutdown_rx));

        Ok(Self {
            outgoing,
            pending,
            shutdown,
            driver: Mutex::new(Some(driver)),
            timeout,
        })
    }

    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let request = RpcRequest::new(next_request_id(), method, params);
        let id = request.id;
        let text = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        if self.outgoing.send(Message::text(text)).await.is_err() {
            self.pending.lock().remove(&id);
            return Err(Error::Closed);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => response.into_result(),
            // 连接已结束，pending 被清空
            Ok(Err(_)) => Err(Error::Closed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(Error::Timeout(self.timeout))
            }
        }
    }

    pub async fn close(&self) {
        let handle = self.driver.lock().take();
        let Some(handle) = handle else {
            return;
        };

        self.shutdown.send_replace(true);
        if let Err(e) = handle.await {
            tracing::error!("RPC connection task failed: {}", e);
        }
    }
}

impl Drop for WsCaller {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

async fn drive(
    stream: WsStream,
    mut outgoing: mpsc::Receiver<Message>,
    pending: Pending,
    mut shutdown: watch::Receiver<bool>,
) {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if let Err(e) = write.send(Message::Close(None)).await {
                    tracing::debug!("Sending close frame: {}", e);
                }
                break;
            }
            msg = outgoing.recv() => match msg {
                Some(msg) => {
                    if let Err(e) = write.send(msg).await {
                        tracing::warn!("Writing RPC request failed: {}", e);
                        break;
                    }
                }
                None => break,
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => deliver(&pending, text.as_str()),
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!("RPC connection closed by peer");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("Reading RPC response failed: {}", e);
                    break;
                }
            },
        }
    }

    fail_pending(&mut outgoing, &pending);
}

/// 连接结束：先关闭请求队列，再清空 pending
///
/// 队列关闭后新的调用在发送时就得到 Closed；已入队但未写出的请求随 pending 一起失败。
fn fail_pending(outgoing: &mut mpsc::Receiver<Message>, pending: &Pending) {
    outgoing.close();
    while outgoing.try_recv().is_ok() {}
    pending.lock().clear();
}

fn deliver(pending: &Pending, text: &str) {
    let response: RpcResponse = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("Invalid RPC response: {}", e);
            return;
        }
    };

    let Some(id) = response.numeric_id() else {
        tracing::trace!("Ignoring notification on RPC connection: {:?}", response.method);
        return;
    };

    match pending.lock().remove(&id) {
        Some(tx) => {
            let _ = tx.send(response);
        }
        None => tracing::debug!("No pending call for response id={}", id),
    }
}
