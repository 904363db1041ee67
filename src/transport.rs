//! 通知连接
//!
//! aria2 只在 WebSocket 上推送通知。`Transport` 抽象出分发循环需要的两件事：
//! 读一帧、关闭连接。

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{Error, ReadError};
use crate::protocol::{decode, NotificationFrame};

/// 客户端 WebSocket 连接
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 通知帧来源
///
/// `read_frame` 是分发循环唯一的挂起点；`close` 必须幂等。
#[async_trait]
pub trait Transport: Send + 'static {
    /// 读取下一帧，阻塞直到有帧到达或连接出错
    async fn read_frame(&mut self) -> Result<NotificationFrame, ReadError>;

    /// 关闭连接
    async fn close(&mut self);
}

/// 把 RPC 地址换成 WebSocket 地址
///
/// http/ws → ws，https/wss → wss，其余 scheme 不支持。
pub fn websocket_url(uri: &str) -> crate::Result<Url> {
    let mut url = Url::parse(uri)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(Error::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| Error::UnsupportedScheme(scheme.to_string()))?;
    Ok(url)
}

/// 基于 tokio-tungstenite 的通知连接
pub struct WsTransport {
    stream: WsStream,
    read_timeout: Option<Duration>,
    closed: bool,
}

impl WsTransport {
    /// 建立通知连接
    pub async fn connect(uri: &str, read_timeout: Option<Duration>) -> crate::Result<Self> {
        let url = websocket_url(uri)?;

        let (stream, _response) =
            connect_async(url.as_str())
                .await
                .map_err(|source| Error::Connect {
                    uri: url.to_string(),
                    source,
                })?;

        tracing::debug!("🔌 Notification connection established: {}", url);
        Ok(Self::from_stream(stream, read_timeout))
    }

    /// 使用已建立的连接
    pub fn from_stream(stream: WsStream, read_timeout: Option<Duration>) -> Self {
        Self {
            stream,
            read_timeout,
            closed: false,
        }
    }

    async fn next_message(&mut self) -> Result<Option<Result<Message, tungstenite::Error>>, ReadError> {
        match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, self.stream.next())
                .await
                .map_err(|_| ReadError::Timeout(limit)),
            None => Ok(self.stream.next().await),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn read_frame(&mut self) -> Result<NotificationFrame, ReadError> {
        loop {
            if self.closed {
                return Err(ReadError::ClosedByPeer("transport already closed".to_string()));
            }

            match self.next_message().await? {
                None => return Err(ReadError::ClosedByPeer("stream ended".to_string())),
                Some(Ok(Message::Text(text))) => return decode(text.as_str()),
                Some(Ok(Message::Binary(data))) => {
                    let text = std::str::from_utf8(&data)
                        .map_err(|e| ReadError::Malformed(e.to_string()))?;
                    return decode(text);
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = match frame {
                        Some(f) => format!("code={}, reason={}", u16::from(f.code), f.reason.as_str()),
                        None => "close frame".to_string(),
                    };
                    return Err(ReadError::ClosedByPeer(reason));
                }
                // ping/pong 由 tungstenite 处理
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(classify(e)),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("Closing notification connection: {}", e);
        }
    }
}

/// 区分对端断开和其他错误
fn classify(err: tungstenite::Error) -> ReadError {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            ReadError::ClosedByPeer(err.to_string())
        }
        tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            ReadError::ClosedByPeer(err.to_string())
        }
        tungstenite::Error::Io(ref io) if io.kind() == ErrorKind::UnexpectedEof => {
            ReadError::ClosedByPeer("unexpected EOF".to_string())
        }
        other => ReadError::Other(other.to_string()),
    }
}
