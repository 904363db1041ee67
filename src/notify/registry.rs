//! 事件注册表
//!
//! 每种 `EventKind` 在会话创建时就分配一条有界通道（eager），
//! 用固定长度的表按 `EventKind::index()` 查找，会话期间不会重建。
//!
//! - 写端（`Senders`）只属于分发循环，循环退出时整体 drop，通道随之关闭
//! - 读端包装成 `EventStream`，可以 clone 给多个订阅者，多个订阅者竞争同一条通道

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::protocol::{EventKind, SubjectId};

/// 某种事件的接收端
///
/// 克隆出来的 `EventStream` 共享同一条通道：每个 gid 只会被其中一个拿到。
/// 会话关闭后，已缓冲的 gid 仍可读出，读完后 `recv` 返回 None。
#[derive(Clone)]
pub struct EventStream {
    kind: EventKind,
    rx: Arc<Mutex<mpsc::Receiver<SubjectId>>>,
}

impl EventStream {
    fn new(kind: EventKind, rx: mpsc::Receiver<SubjectId>) -> Self {
        Self {
            kind,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// 通道对应的事件类型
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// 等待下一个 gid，通道关闭且已读空时返回 None
    pub async fn recv(&self) -> Option<SubjectId> {
        self.rx.lock().await.recv().await
    }

    /// 非阻塞读取；没有数据或其他订阅者正在读时返回 None
    pub fn try_recv(&self) -> Option<SubjectId> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream").field("kind", &self.kind).finish()
    }
}

/// 分发循环持有的写端
pub(crate) struct Senders {
    senders: Vec<mpsc::Sender<SubjectId>>,
}

impl Senders {
    pub(crate) fn get(&self, kind: EventKind) -> &mpsc::Sender<SubjectId> {
        &self.senders[kind.index()]
    }
}

/// 会话持有的读端
pub(crate) struct Registry {
    streams: Vec<EventStream>,
}

impl Registry {
    pub(crate) fn get(&self, kind: EventKind) -> &EventStream {
        &self.streams[kind.index()]
    }
}

/// 为所有事件类型创建通道
pub(crate) fn channels(capacity: usize) -> (Senders, Registry) {
    let capacity = capacity.max(1);
    let mut senders = Vec::with_capacity(EventKind::COUNT);
    let mut streams = Vec::with_capacity(EventKind::COUNT);

    for kind in EventKind::ALL {
        let (tx, rx) = mpsc::channel(capacity);
        senders.push(tx);
        streams.push(EventStream::new(kind, rx));
    }

    (Senders { senders }, Registry { streams })
}
