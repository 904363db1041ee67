//! aria2 方法封装
//!
//! 每个方法只负责把参数按位置排好，token 由 `Client::call` 注入。

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use super::Client;
use crate::error::{Error, Result};
use crate::protocol::method;
use crate::types::{
    FileEntry, GlobalStat, MultiCallMethod, Options, Peers, Servers, SessionInfo, Status, UriEntry,
    Version,
};

impl Client {
    /// 添加 HTTP/FTP/SFTP/BitTorrent URI 下载，返回 gid
    pub async fn add_uri(&self, uris: &[String], options: Option<&Options>) -> Result<String> {
        self.call(method::ADD_URI, vec![json!(uris), json!(options)])
            .await
    }

    /// 添加 BitTorrent 下载，`torrent` 为 .torrent 文件内容；`uris` 用于 web-seed
    pub async fn add_torrent(
        &self,
        torrent: &[u8],
        uris: &[String],
        options: Option<&Options>,
    ) -> Result<String> {
        let encoded = STANDARD.encode(torrent);
        self.call(
            method::ADD_TORRENT,
            vec![json!(encoded), json!(uris), json!(options)],
        )
        .await
    }

    /// 添加 Metalink 下载，返回每个条目的 gid
    pub async fn add_metalink(
        &self,
        metalink: &[u8],
        options: Option<&Options>,
    ) -> Result<Vec<String>> {
        let encoded = STANDARD.encode(metalink);
        self.call(method::ADD_METALINK, vec![json!(encoded), json!(options)])
            .await
    }

    pub async fn remove(&self, gid: &str) -> Result<()> {
        self.call_ok(method::REMOVE, vec![json!(gid)]).await
    }

    pub async fn force_remove(&self, gid: &str) -> Result<()> {
        self.call_ok(method::FORCE_REMOVE, vec![json!(gid)]).await
    }

    pub async fn pause(&self, gid: &str) -> Result<()> {
        self.call_ok(method::PAUSE, vec![json!(gid)]).await
    }

    pub async fn pause_all(&self) -> Result<()> {
        self.call_ok(method::PAUSE_ALL, vec![]).await
    }

    pub async fn force_pause(&self, gid: &str) -> Result<()> {
        self.call_ok(method::FORCE_PAUSE, vec![json!(gid)]).await
    }

    pub async fn force_pause_all(&self) -> Result<()> {
        self.call_ok(method::FORCE_PAUSE_ALL, vec![]).await
    }

    pub async fn unpause(&self, gid: &str) -> Result<()> {
        self.call_ok(method::UNPAUSE, vec![json!(gid)]).await
    }

    pub async fn unpause_all(&self) -> Result<()> {
        self.call_ok(method::UNPAUSE_ALL, vec![]).await
    }

    /// 查询任务状态；`keys` 为空时返回全部字段
    pub async fn tell_status(&self, gid: &str, keys: &[&str]) -> Result<Status> {
        self.call(method::TELL_STATUS, vec![json!(gid), json!(keys)])
            .await
    }

    pub async fn get_uris(&self, gid: &str) -> Result<Vec<UriEntry>> {
        self.call(method::GET_URIS, vec![json!(gid)]).await
    }

    pub async fn get_files(&self, gid: &str) -> Result<Vec<FileEntry>> {
        self.call(method::GET_FILES, vec![json!(gid)]).await
    }

    pub async fn get_peers(&self, gid: &str) -> Result<Vec<Peers>> {
        self.call(method::GET_PEERS, vec![json!(gid)]).await
    }

    pub async fn get_servers(&self, gid: &str) -> Result<Vec<Servers>> {
        self.call(method::GET_SERVERS, vec![json!(gid)]).await
    }

    pub async fn tell_active(&self, keys: &[&str]) -> Result<Vec<Status>> {
        self.call(method::TELL_ACTIVE, vec![json!(keys)]).await
    }

    /// `offset` 可以为负数，表示从队尾倒数
    pub async fn tell_waiting(&self, offset: i64, num: u64, keys: &[&str]) -> Result<Vec<Status>> {
        self.call(
            method::TELL_WAITING,
            vec![json!(offset), json!(num), json!(keys)],
        )
        .await
    }

    pub async fn tell_stopped(&self, offset: i64, num: u64, keys: &[&str]) -> Result<Vec<Status>> {
        self.call(
            method::TELL_STOPPED,
            vec![json!(offset), json!(num), json!(keys)],
        )
        .await
    }

    /// 调整队列位置，`how` 为 POS_SET / POS_CUR / POS_END，返回新位置
    pub async fn change_position(&self, gid: &str, pos: i64, how: &str) -> Result<i64> {
        self.call(
            method::CHANGE_POSITION,
            vec![json!(gid), json!(pos), json!(how)],
        )
        .await
    }

    /// 替换文件的 URI，返回 `[删除数, 添加数]`
    ///
    /// `del_uris` / `add_uris` 为空时也按位置发送空数组；`position` 为 None 时追加到末尾。
    /// `file_index` 从 1 开始。
    pub async fn change_uri(
        &self,
        gid: &str,
        file_index: u64,
        del_uris: &[String],
        add_uris: &[String],
        position: Option<u64>,
    ) -> Result<Vec<u64>> {
        let mut params = vec![json!(gid), json!(file_index), json!(del_uris), json!(add_uris)];
        if let Some(position) = position {
            params.push(json!(position));
        }
        self.call_positional(method::CHANGE_URI, params).await
    }

    pub async fn get_option(&self, gid: &str) -> Result<Options> {
        self.call(method::GET_OPTION, vec![json!(gid)]).await
    }

    pub async fn change_option(&self, gid: &str, options: &Options) -> Result<()> {
        self.call_ok(method::CHANGE_OPTION, vec![json!(gid), json!(options)])
            .await
    }

    pub async fn get_global_option(&self) -> Result<Options> {
        self.call(method::GET_GLOBAL_OPTION, vec![]).await
    }

    pub async fn change_global_option(&self, options: &Options) -> Result<()> {
        self.call_ok(method::CHANGE_GLOBAL_OPTION, vec![json!(options)])
            .await
    }

    pub async fn get_global_stat(&self) -> Result<GlobalStat> {
        self.call(method::GET_GLOBAL_STAT, vec![]).await
    }

    pub async fn purge_download_result(&self) -> Result<()> {
        self.call_ok(method::PURGE_DOWNLOAD_RESULT, vec![]).await
    }

    pub async fn remove_download_result(&self, gid: &str) -> Result<()> {
        self.call_ok(method::REMOVE_DOWNLOAD_RESULT, vec![json!(gid)])
            .await
    }

    pub async fn get_version(&self) -> Result<Version> {
        self.call(method::GET_VERSION, vec![]).await
    }

    pub async fn get_session_info(&self) -> Result<SessionInfo> {
        self.call(method::GET_SESSION_INFO, vec![]).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.call_ok(method::SHUTDOWN, vec![]).await
    }

    pub async fn force_shutdown(&self) -> Result<()> {
        self.call_ok(method::FORCE_SHUTDOWN, vec![]).await
    }

    pub async fn save_session(&self) -> Result<()> {
        self.call_ok(method::SAVE_SESSION, vec![]).await
    }

    /// `system.multicall`
    ///
    /// 每个子调用的参数原样发送；设置了 secret 时需要自行在子调用参数首位放 token。
    pub async fn multicall(&self, methods: &[MultiCallMethod]) -> Result<Vec<Value>> {
        if methods.is_empty() {
            return Err(Error::Config("multicall requires at least one method".to_string()));
        }
        self.call(method::MULTICALL, vec![json!(methods)]).await
    }

    pub async fn list_methods(&self) -> Result<Vec<String>> {
        self.call(method::LIST_METHODS, vec![]).await
    }
}
