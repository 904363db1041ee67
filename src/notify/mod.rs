//! 通知会话
//!
//! 一个 `Notify` 拥有一条到 aria2 的 WebSocket 连接、一个分发循环和六条事件通道。
//! 订阅方式有三种：
//!
//! - 直接拿通道：`start()` / `pause()` / `stop()` / `complete()` / `error()` / `bt_complete()`
//! - 多事件回调：`listen_multiple`，每种事件一个独立任务
//! - 单事件回调直到 stop：`listen_once`
//!
//! 分发循环对通道使用非阻塞投递，通道满时事件被丢弃，详见 [`dispatch`] 模块说明。
//! 每种事件内部保持到达顺序，不同事件之间没有顺序保证。

pub mod dispatch;
mod registry;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::protocol::{EventKind, SubjectId};
use crate::transport::{Transport, WsTransport};

pub use dispatch::DispatchStats;
pub use registry::EventStream;

/// 事件回调
pub type Callback = Box<dyn FnMut(SubjectId) + Send + 'static>;

/// `listen_multiple` 的参数：事件类型 → 回调
pub type Tasks = HashMap<EventKind, Callback>;

/// `listen_once` 回调收到的停止控制
#[derive(Debug, Default)]
pub struct StopHandle {
    stopped: AtomicBool,
}

impl StopHandle {
    /// 请求停止监听；当前回调返回后不会再收到任何 gid
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// 是否已请求停止
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// 通知会话
pub struct Notify {
    registry: registry::Registry,
    shutdown: watch::Sender<bool>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
    /// 分发循环退出后变为 true
    exited: watch::Receiver<bool>,
    stats: Arc<DispatchStats>,
}

impl Notify {
    /// 连接 aria2 并启动分发循环
    ///
    /// 连接失败时返回 `Error::Connect`，不会创建会话。
    pub async fn connect(config: &ClientConfig) -> crate::Result<Self> {
        let transport = WsTransport::connect(&config.uri, config.read_timeout).await?;
        tracing::info!("🔔 Notify session started: {}", config.uri);
        Ok(Self::spawn(transport, config.effective_capacity()))
    }

    /// 在任意 `Transport` 上启动会话
    ///
    /// 必须在 tokio runtime 中调用。`capacity` 为每种事件通道的缓冲大小（最小 1）。
    pub fn spawn<T: Transport>(transport: T, capacity: usize) -> Self {
        let (senders, registry) = registry::channels(capacity);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (exited_tx, exited) = watch::channel(false);
        let stats = Arc::new(DispatchStats::default());

        let run = dispatch::run(transport, senders, shutdown_rx, stats.clone());
        let handle = tokio::spawn(async move {
            run.await;
            exited_tx.send_replace(true);
        });

        Self {
            registry,
            shutdown,
            dispatch: Mutex::new(Some(handle)),
            exited,
            stats,
        }
    }

    /// 某种事件的通道
    pub fn events(&self, kind: EventKind) -> EventStream {
        self.registry.get(kind).clone()
    }

    /// `aria2.onDownloadStart`
    pub fn start(&self) -> EventStream {
        self.events(EventKind::Start)
    }

    /// `aria2.onDownloadPause`
    pub fn pause(&self) -> EventStream {
        self.events(EventKind::Pause)
    }

    /// `aria2.onDownloadStop`
    pub fn stop(&self) -> EventStream {
        self.events(EventKind::Stop)
    }

    /// `aria2.onDownloadComplete`
    pub fn complete(&self) -> EventStream {
        self.events(EventKind::Complete)
    }

    /// `aria2.onDownloadError`
    pub fn error(&self) -> EventStream {
        self.events(EventKind::Error)
    }

    /// `aria2.onBtDownloadComplete`
    pub fn bt_complete(&self) -> EventStream {
        self.events(EventKind::BtComplete)
    }

    /// 为每个事件类型启动一个独立任务，持续调用回调直到会话关闭
    ///
    /// 同一事件内回调顺序与到达顺序一致；不同事件的任务之间没有顺序。
    /// 同一事件类型在一个 `Tasks` 里只能出现一次；多次调用会让这些任务竞争同一条通道。
    pub fn listen_multiple(&self, tasks: Tasks) -> Vec<JoinHandle<()>> {
        tasks
            .into_iter()
            .map(|(kind, callback)| tokio::spawn(consume(self.events(kind), callback)))
            .collect()
    }

    /// 监听一种事件，直到回调调用 `stop`
    ///
    /// 注意：名字里的 "once" 指的是"听到被叫停为止"，不是"只投递一次"。
    /// 在 `stop` 之前回调可以被调用任意多次；调用 `stop` 后，即使通道里还有缓冲的 gid，
    /// 也不会再调用回调（剩下的 gid 留在通道里）。会话关闭时任务也会结束。
    pub fn listen_once<F>(&self, kind: EventKind, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(SubjectId, &StopHandle) + Send + 'static,
    {
        let stream = self.events(kind);
        tokio::spawn(async move {
            let stop = StopHandle::default();
            while let Some(gid) = stream.recv().await {
                callback(gid, &stop);
                if stop.is_stopped() {
                    tracing::debug!("🔔 listen_once stopped: kind={:?}", kind);
                    return;
                }
            }
        })
    }

    /// 分发统计（包括丢弃计数）
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// 分发循环是否仍在运行
    pub fn is_running(&self) -> bool {
        self.dispatch
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// 关闭会话
    ///
    /// 通知分发循环停止并等待它退出：返回时所有事件通道都已关闭、连接已断开。
    /// 正在阻塞的读取会被打断。多个任务同时调用时，后来者等待同一个循环退出；
    /// 循环已经退出后再调用是 no-op。
    pub async fn close(&self) {
        let handle = self.dispatch.lock().take();
        let Some(handle) = handle else {
            // 循环 panic 时发送端被丢弃，wait_for 返回 Err，同样视为已退出
            let mut exited = self.exited.clone();
            let _ = exited.wait_for(|done| *done).await;
            tracing::debug!("🔔 Notify already closed");
            return;
        };

        self.shutdown.send_replace(true);

        if let Err(e) = handle.await {
            tracing::error!("Dispatch loop failed: {}", e);
        }

        tracing::debug!("🧹 Notify closed");
    }
}

impl Drop for Notify {
    fn drop(&mut self) {
        // 未调用 close 时也让分发循环退出（不等待）
        self.shutdown.send_replace(true);
    }
}

async fn consume(stream: EventStream, mut callback: Callback) {
    while let Some(gid) = stream.recv().await {
        callback(gid);
    }
    tracing::trace!("🔔 Listener finished: kind={:?}", stream.kind());
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::error::ReadError;
    use crate::protocol::NotificationFrame;

    type Feed = mpsc::UnboundedSender<Result<NotificationFrame, ReadError>>;

    /// 由测试喂帧的连接
    struct MockTransport {
        rx: mpsc::UnboundedReceiver<Result<NotificationFrame, ReadError>>,
        closed: Arc<AtomicBool>,
        close_delay: Option<Duration>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn read_frame(&mut self) -> Result<NotificationFrame, ReadError> {
            match self.rx.recv().await {
                Some(result) => result,
                None => Err(ReadError::ClosedByPeer("feed dropped".to_string())),
            }
        }

        async fn close(&mut self) {
            if let Some(delay) = self.close_delay {
                tokio::time::sleep(delay).await;
            }
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn session(capacity: usize) -> (Notify, Feed, Arc<AtomicBool>) {
        session_with_close_delay(capacity, None)
    }

    fn session_with_close_delay(
        capacity: usize,
        close_delay: Option<Duration>,
    ) -> (Notify, Feed, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let transport = MockTransport {
            rx,
            closed: closed.clone(),
            close_delay,
        };
        (Notify::spawn(transport, capacity), tx, closed)
    }

    fn frame(kind: EventKind, gids: &[&str]) -> Result<NotificationFrame, ReadError> {
        Ok(NotificationFrame::new(
            kind,
            gids.iter().map(|g| g.to_string()).collect(),
        ))
    }

    async fn recv(stream: &EventStream) -> Option<SubjectId> {
        timeout(Duration::from_secs(2), stream.recv())
            .await
            .expect("recv timed out")
    }

    /// 发送一个 BtComplete 标记并等它到达，保证之前的帧都已经分发完
    async fn barrier(notify: &Notify, feed: &Feed) {
        feed.send(frame(EventKind::BtComplete, &["barrier"])).unwrap();
        assert_eq!(recv(&notify.bt_complete()).await.as_deref(), Some("barrier"));
    }

    #[tokio::test]
    async fn test_start_then_stop() {
        let (notify, feed, closed) = session(10);

        feed.send(frame(EventKind::Start, &["abc"])).unwrap();
        assert_eq!(recv(&notify.start()).await.as_deref(), Some("abc"));

        feed.send(frame(EventKind::Stop, &["abc"])).unwrap();
        assert_eq!(recv(&notify.stop()).await.as_deref(), Some("abc"));

        for kind in EventKind::ALL {
            assert_eq!(notify.events(kind).try_recv(), None, "kind {:?}", kind);
        }

        notify.close().await;
        assert!(closed.load(Ordering::SeqCst));
        for kind in EventKind::ALL {
            assert_eq!(recv(&notify.events(kind)).await, None);
        }
    }

    #[tokio::test]
    async fn test_per_kind_order_preserved() {
        let (notify, feed, _closed) = session(64);

        let mut expected_start = Vec::new();
        let mut expected_complete = Vec::new();
        for i in 0..20 {
            let gid = format!("g{}", i);
            if i % 3 == 0 {
                feed.send(frame(EventKind::Complete, &[gid.as_str()])).unwrap();
                expected_complete.push(gid);
            } else {
                let second = format!("{}-b", gid);
                feed.send(frame(EventKind::Start, &[gid.as_str(), second.as_str()])).unwrap();
                expected_start.push(gid);
                expected_start.push(second);
            }
        }
        barrier(&notify, &feed).await;

        let mut start = Vec::new();
        while let Some(gid) = notify.start().try_recv() {
            start.push(gid);
        }
        let mut complete = Vec::new();
        while let Some(gid) = notify.complete().try_recv() {
            complete.push(gid);
        }

        assert_eq!(start, expected_start);
        assert_eq!(complete, expected_complete);
        notify.close().await;
    }

    #[tokio::test]
    async fn test_unread_channel_drops_overflow() {
        let (notify, feed, _closed) = session(10);

        for i in 0..15 {
            feed.send(frame(EventKind::Start, &[format!("g{}", i).as_str()])).unwrap();
        }
        // 其他事件不受影响
        feed.send(frame(EventKind::Error, &["e1"])).unwrap();
        barrier(&notify, &feed).await;

        let mut received = Vec::new();
        while let Some(gid) = notify.start().try_recv() {
            received.push(gid);
        }
        let expected: Vec<String> = (0..10).map(|i| format!("g{}", i)).collect();
        assert_eq!(received, expected);

        assert_eq!(notify.stats().delivered(EventKind::Start), 10);
        assert_eq!(notify.stats().dropped(EventKind::Start), 5);
        assert_eq!(notify.error().try_recv().as_deref(), Some("e1"));
        assert!(notify.is_running());

        notify.close().await;
    }

    #[tokio::test]
    async fn test_unknown_method_ignored() {
        let (notify, feed, _closed) = session(10);

        feed.send(Ok(NotificationFrame {
            method: "aria2.onDownloadSomething".to_string(),
            subjects: vec!["x".to_string()],
        }))
        .unwrap();
        barrier(&notify, &feed).await;

        assert_eq!(notify.stats().unrouted(), 1);
        for kind in EventKind::ALL {
            assert_eq!(notify.events(kind).try_recv(), None);
        }
        assert!(notify.is_running());
        notify.close().await;
    }

    #[tokio::test]
    async fn test_listen_once_stops_before_buffered_items() {
        let (notify, feed, _closed) = session(10);

        feed.send(frame(EventKind::Start, &["a", "b", "c"])).unwrap();
        barrier(&notify, &feed).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_callback = seen.clone();
        let handle = notify.listen_once(EventKind::Start, move |gid, stop| {
            let is_b = gid == "b";
            seen_in_callback.lock().push(gid);
            if is_b {
                stop.stop();
            }
        });

        timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(*seen.lock(), vec!["a".to_string(), "b".to_string()]);
        // c 仍留在通道里
        assert_eq!(notify.start().try_recv().as_deref(), Some("c"));

        notify.close().await;
    }

    #[tokio::test]
    async fn test_listen_once_ends_on_close() {
        let (notify, _feed, _closed) = session(10);

        let handle = notify.listen_once(EventKind::Pause, |_gid, _stop| {});
        notify.close().await;

        timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_listen_multiple_start_and_stop() {
        let (notify, feed, _closed) = session(10);
        let (tx, mut rx) = mpsc::unbounded_channel::<(EventKind, SubjectId)>();

        let mut tasks = Tasks::new();
        for kind in [EventKind::Start, EventKind::Stop] {
            let tx = tx.clone();
            tasks.insert(
                kind,
                Box::new(move |gid: String| {
                    let _ = tx.send((kind, gid));
                }),
            );
        }
        let handles = notify.listen_multiple(tasks);
        assert_eq!(handles.len(), 2);

        feed.send(frame(EventKind::Start, &["gid1"])).unwrap();
        feed.send(frame(EventKind::Stop, &["gid1"])).unwrap();

        let mut got = Vec::new();
        for _ in 0..2 {
            got.push(timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap());
        }
        got.sort();
        assert_eq!(
            got,
            vec![
                (EventKind::Start, "gid1".to_string()),
                (EventKind::Stop, "gid1".to_string()),
            ]
        );

        notify.close().await;
        for handle in handles {
            timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_close_while_read_blocked() {
        // feed 保持存活，read_frame 一直阻塞
        let (notify, _feed, closed) = session(10);
        assert!(notify.is_running());

        timeout(Duration::from_secs(2), notify.close())
            .await
            .expect("close should not hang");

        assert!(closed.load(Ordering::SeqCst));
        assert!(!notify.is_running());
        assert_eq!(recv(&notify.start()).await, None);
    }

    #[tokio::test]
    async fn test_close_twice_is_noop() {
        let (notify, feed, _closed) = session(10);

        notify.close().await;
        notify.close().await;

        // 关闭后再喂帧也不会出现任何事件
        let _ = feed.send(frame(EventKind::Start, &["late"]));
        for kind in EventKind::ALL {
            assert_eq!(recv(&notify.events(kind)).await, None);
        }
    }

    #[tokio::test]
    async fn test_concurrent_close_waits_for_teardown() {
        let (notify, _feed, closed) =
            session_with_close_delay(10, Some(Duration::from_millis(200)));

        let first = notify.close();
        let second = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            notify.close().await;
            // 返回时连接已关闭，通道已关闭
            assert!(closed.load(Ordering::SeqCst));
            assert_eq!(notify.start().try_recv(), None);
            assert_eq!(recv(&notify.start()).await, None);
        };

        timeout(Duration::from_secs(2), async { tokio::join!(first, second) })
            .await
            .expect("close should not hang");
        assert!(!notify.is_running());
    }

    #[tokio::test]
    async fn test_buffered_events_readable_after_close() {
        let (notify, feed, _closed) = session(10);

        feed.send(frame(EventKind::Complete, &["done"])).unwrap();
        barrier(&notify, &feed).await;
        notify.close().await;

        assert_eq!(recv(&notify.complete()).await.as_deref(), Some("done"));
        assert_eq!(recv(&notify.complete()).await, None);
    }

    #[tokio::test]
    async fn test_read_error_tears_down_session() {
        let (notify, feed, closed) = session(10);

        feed.send(Err(ReadError::Malformed("bad frame".to_string()))).unwrap();

        assert_eq!(recv(&notify.start()).await, None);
        assert_eq!(recv(&notify.error()).await, None);

        // close 仍然安全，并等待清理完成
        notify.close().await;
        assert!(closed.load(Ordering::SeqCst));
        assert!(!notify.is_running());
    }

    #[tokio::test]
    async fn test_drop_stops_dispatch_loop() {
        let (notify, _feed, closed) = session(10);
        drop(notify);

        timeout(Duration::from_secs(2), async {
            while !closed.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("transport should be closed after drop");
    }
}
