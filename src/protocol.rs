//! aria2 协议定义
//!
//! - 通知：`{"method": "aria2.onDownloadStart", "params": [{"gid": "..."}]}`
//! - 调用：标准 JSON-RPC 2.0 请求/响应

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, ReadError};

/// 任务 ID（aria2 的 gid）
pub type SubjectId = String;

/// 通知事件类型
///
/// aria2 文档中列出的六种通知。未在此列出的 method 会被分发循环忽略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Start,
    Pause,
    Stop,
    Complete,
    Error,
    BtComplete,
}

impl EventKind {
    /// 全部事件类型，顺序与 `index()` 一致
    pub const ALL: [EventKind; 6] = [
        EventKind::Start,
        EventKind::Pause,
        EventKind::Stop,
        EventKind::Complete,
        EventKind::Error,
        EventKind::BtComplete,
    ];

    /// 事件类型数量
    pub const COUNT: usize = Self::ALL.len();

    /// 在固定数组中的下标
    pub fn index(self) -> usize {
        match self {
            EventKind::Start => 0,
            EventKind::Pause => 1,
            EventKind::Stop => 2,
            EventKind::Complete => 3,
            EventKind::Error => 4,
            EventKind::BtComplete => 5,
        }
    }

    /// 对应的通知 method
    pub fn method(self) -> &'static str {
        match self {
            EventKind::Start => "aria2.onDownloadStart",
            EventKind::Pause => "aria2.onDownloadPause",
            EventKind::Stop => "aria2.onDownloadStop",
            EventKind::Complete => "aria2.onDownloadComplete",
            EventKind::Error => "aria2.onDownloadError",
            EventKind::BtComplete => "aria2.onBtDownloadComplete",
        }
    }

    /// 由通知 method 解析，未知 method 返回 None
    pub fn from_method(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.method() == method)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_method(s).ok_or_else(|| Error::Config(format!("unknown event: {}", s)))
    }
}

/// 一条通知帧（只在一次分发迭代中存在）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationFrame {
    /// 通知 method（可能是未知事件）
    pub method: String,
    /// 涉及的任务，非空且有序
    pub subjects: Vec<SubjectId>,
}

impl NotificationFrame {
    /// 构造已知事件的帧
    pub fn new(kind: EventKind, subjects: Vec<SubjectId>) -> Self {
        Self {
            method: kind.method().to_string(),
            subjects,
        }
    }

    /// 事件类型（未知 method 返回 None）
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_method(&self.method)
    }
}

/// 通知中的单个参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub gid: String,
}

/// 通知的线上格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub method: String,
    pub params: Vec<Event>,
}

impl From<&NotificationFrame> for Notification {
    fn from(frame: &NotificationFrame) -> Self {
        Self {
            method: frame.method.clone(),
            params: frame
                .subjects
                .iter()
                .map(|gid| Event { gid: gid.clone() })
                .collect(),
        }
    }
}

/// 解码一条通知
///
/// 缺少 method、params 为空或参数缺少 gid 都视为 `Malformed`：
/// 说明连接已经和协议失步，分发循环会据此结束会话。
pub fn decode(text: &str) -> Result<NotificationFrame, ReadError> {
    let notification: Notification =
        serde_json::from_str(text).map_err(|e| ReadError::Malformed(e.to_string()))?;

    if notification.params.is_empty() {
        return Err(ReadError::Malformed(format!(
            "empty params for {}",
            notification.method
        )));
    }

    Ok(NotificationFrame {
        method: notification.method,
        subjects: notification.params.into_iter().map(|e| e.gid).collect(),
    })
}

/// JSON-RPC 2.0 请求
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC 2.0 错误对象
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// JSON-RPC 2.0 响应
///
/// 通知帧也能解析成这个结构（没有 id），调用方据此区分。
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// 响应 id（仅数值 id）
    pub fn numeric_id(&self) -> Option<u64> {
        match &self.id {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
    }

    /// 转为调用结果
    pub fn into_result<R: DeserializeOwned>(self) -> crate::Result<R> {
        if let Some(err) = self.error {
            return Err(Error::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        let value = self.result.unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }
}

/// aria2 RPC method 名称
pub mod method {
    pub const ADD_URI: &str = "aria2.addUri";
    pub const ADD_TORRENT: &str = "aria2.addTorrent";
    pub const ADD_METALINK: &str = "aria2.addMetalink";
    pub const REMOVE: &str = "aria2.remove";
    pub const FORCE_REMOVE: &str = "aria2.forceRemove";
    pub const PAUSE: &str = "aria2.pause";
    pub const PAUSE_ALL: &str = "aria2.pauseAll";
    pub const FORCE_PAUSE: &str = "aria2.forcePause";
    pub const FORCE_PAUSE_ALL: &str = "aria2.forcePauseAll";
    pub const UNPAUSE: &str = "aria2.unpause";
    pub const UNPAUSE_ALL: &str = "aria2.unpauseAll";
    pub const TELL_STATUS: &str = "aria2.tellStatus";
    pub const GET_URIS: &str = "aria2.getUris";
    pub const GET_FILES: &str = "aria2.getFiles";
    pub const GET_PEERS: &str = "aria2.getPeers";
    pub const GET_SERVERS: &str = "aria2.getServers";
    pub const TELL_ACTIVE: &str = "aria2.tellActive";
    pub const TELL_WAITING: &str = "aria2.tellWaiting";
    pub const TELL_STOPPED: &str = "aria2.tellStopped";
    pub const CHANGE_POSITION: &str = "aria2.changePosition";
    pub const CHANGE_URI: &str = "aria2.changeUri";
    pub const GET_OPTION: &str = "aria2.getOption";
    pub const CHANGE_OPTION: &str = "aria2.changeOption";
    pub const GET_GLOBAL_OPTION: &str = "aria2.getGlobalOption";
    pub const CHANGE_GLOBAL_OPTION: &str = "aria2.changeGlobalOption";
    pub const GET_GLOBAL_STAT: &str = "aria2.getGlobalStat";
    pub const PURGE_DOWNLOAD_RESULT: &str = "aria2.purgeDownloadResult";
    pub const REMOVE_DOWNLOAD_RESULT: &str = "aria2.removeDownloadResult";
    pub const GET_VERSION: &str = "aria2.getVersion";
    pub const GET_SESSION_INFO: &str = "aria2.getSessionInfo";
    pub const SHUTDOWN: &str = "aria2.shutdown";
    pub const FORCE_SHUTDOWN: &str = "aria2.forceShutdown";
    pub const SAVE_SESSION: &str = "aria2.saveSession";
    pub const MULTICALL: &str = "system.multicall";
    pub const LIST_METHODS: &str = "system.listMethods";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_method_lookup() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_method(kind.method()), Some(kind));
        }
        assert_eq!(EventKind::from_method("aria2.onSomethingNew"), None);
        assert_eq!(
            "aria2.onBtDownloadComplete".parse::<EventKind>().unwrap(),
            EventKind::BtComplete
        );
    }

    #[test]
    fn test_event_kind_index_is_dense() {
        let indexes: Vec<usize> = EventKind::ALL.iter().map(|k| k.index()).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_decode_start() {
        let frame =
            decode(r#"{"jsonrpc":"2.0","method":"aria2.onDownloadStart","params":[{"gid":"abc"}]}"#)
                .unwrap();
        assert_eq!(frame.kind(), Some(EventKind::Start));
        assert_eq!(frame.subjects, vec!["abc".to_string()]);
    }

    #[test]
    fn test_decode_multiple_subjects_keeps_order() {
        let frame = decode(
            r#"{"method":"aria2.onDownloadStop","params":[{"gid":"b"},{"gid":"a"},{"gid":"c"}]}"#,
        )
        .unwrap();
        assert_eq!(frame.subjects, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_decode_unknown_method_is_not_an_error() {
        let frame = decode(r#"{"method":"aria2.onFuture","params":[{"gid":"x"}]}"#).unwrap();
        assert_eq!(frame.method, "aria2.onFuture");
        assert_eq!(frame.kind(), None);
    }

    #[test]
    fn test_decode_malformed() {
        let cases = [
            "not json",
            r#"{"params":[{"gid":"x"}]}"#,
            r#"{"method":"aria2.onDownloadStart","params":[]}"#,
            r#"{"method":"aria2.onDownloadStart","params":[{"id":"x"}]}"#,
            r#"{"method":"aria2.onDownloadStart"}"#,
        ];
        for case in cases {
            let err = decode(case).unwrap_err();
            assert!(matches!(err, ReadError::Malformed(_)), "case: {}", case);
        }
    }

    #[test]
    fn test_rpc_response_into_result() {
        let ok: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"7","result":"2089b05ecca3d829"}"#)
                .unwrap();
        assert_eq!(ok.numeric_id(), Some(7));
        let gid: String = ok.into_result().unwrap();
        assert_eq!(gid, "2089b05ecca3d829");

        let err: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":1,"message":"Unauthorized"}}"#,
        )
        .unwrap();
        match err.into_result::<Value>() {
            Err(Error::Rpc { code, message }) => {
                assert_eq!(code, 1);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("Expected Rpc error, got {:?}", other),
        }
    }

    #[test]
    fn test_notification_from_frame() {
        let frame = NotificationFrame::new(EventKind::Complete, vec!["g1".into()]);
        let json = serde_json::to_string(&Notification::from(&frame)).unwrap();
        assert_eq!(
            json,
            r#"{"method":"aria2.onDownloadComplete","params":[{"gid":"g1"}]}"#
        );
    }
}
