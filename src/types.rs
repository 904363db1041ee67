//! aria2 返回的数据类型
//!
//! aria2 的数值字段都以字符串返回，这里保持原样，不做转换。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 下载选项（`dir`、`out`、`max-connection-per-server` 等，值均为字符串）
pub type Options = BTreeMap<String, String>;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    Active,
    Waiting,
    Paused,
    Error,
    Complete,
    Removed,
}

impl FromStr for DownloadState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(DownloadState::Active),
            "waiting" => Ok(DownloadState::Waiting),
            "paused" => Ok(DownloadState::Paused),
            "error" => Ok(DownloadState::Error),
            "complete" => Ok(DownloadState::Complete),
            "removed" => Ok(DownloadState::Removed),
            _ => Err(format!("Invalid download state: {}", s)),
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadState::Active => write!(f, "active"),
            DownloadState::Waiting => write!(f, "waiting"),
            DownloadState::Paused => write!(f, "paused"),
            DownloadState::Error => write!(f, "error"),
            DownloadState::Complete => write!(f, "complete"),
            DownloadState::Removed => write!(f, "removed"),
        }
    }
}

/// `aria2.tellStatus` 结果
///
/// 调用时可以只请求部分 key，所以除 gid 外都是可选的。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Status {
    pub gid: String,
    pub status: Option<DownloadState>,
    pub total_length: Option<String>,
    pub completed_length: Option<String>,
    pub upload_length: Option<String>,
    pub download_speed: Option<String>,
    pub upload_speed: Option<String>,
    pub info_hash: Option<String>,
    pub num_seeders: Option<String>,
    pub seeder: Option<String>,
    pub piece_length: Option<String>,
    pub num_pieces: Option<String>,
    pub connections: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub followed_by: Option<Vec<String>>,
    pub following: Option<String>,
    pub belongs_to: Option<String>,
    pub dir: Option<String>,
    pub files: Option<Vec<FileEntry>>,
}

/// `aria2.getUris` 结果项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UriEntry {
    pub uri: String,
    /// "used" / "waiting"
    pub status: String,
}

/// `aria2.getFiles` 结果项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileEntry {
    pub index: String,
    pub path: String,
    pub length: String,
    pub completed_length: String,
    pub selected: String,
    pub uris: Vec<UriEntry>,
}

/// `aria2.getPeers` 结果项（仅 BitTorrent）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Peers {
    /// 百分号编码的 peer ID
    pub peer_id: String,
    pub ip: String,
    pub port: String,
    /// 十六进制位图
    pub bitfield: String,
    /// "true" / "false"
    pub am_choking: String,
    pub peer_choking: String,
    pub download_speed: String,
    pub upload_speed: String,
    pub seeder: String,
}

/// `aria2.getServers` 结果项：一个文件及其正在连接的服务器
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Servers {
    pub index: String,
    pub servers: Vec<ServerEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerEntry {
    /// 原始 URI
    pub uri: String,
    /// 重定向后实际使用的 URI
    pub current_uri: String,
    pub download_speed: String,
}

/// `aria2.getGlobalStat` 结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalStat {
    pub download_speed: String,
    pub upload_speed: String,
    pub num_active: String,
    pub num_waiting: String,
    pub num_stopped: String,
    pub num_stopped_total: String,
}

/// `aria2.getVersion` 结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Version {
    pub version: String,
    pub enabled_features: Vec<String>,
}

/// `aria2.getSessionInfo` 结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionInfo {
    pub session_id: String,
}

/// `system.multicall` 的单个调用
///
/// method 名为空的项会被 aria2 忽略。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiCallMethod {
    #[serde(rename = "methodName")]
    pub name: String,
    pub params: Vec<serde_json::Value>,
}
