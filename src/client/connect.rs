//! Client 连接与参数组装

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::caller::Caller;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::notify::Notify;

/// aria2 Client
///
/// 克隆开销很小，所有克隆共享同一个调用通道。
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    caller: Caller,
}

impl Client {
    /// 创建 Client
    ///
    /// ws/wss 地址会立即建立连接；http/https 在第一次调用时才连接。
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let caller = Caller::connect(&config).await?;
        tracing::debug!("aria2 client created: {}", config.uri);

        Ok(Self {
            inner: Arc::new(Inner { config, caller }),
        })
    }

    /// 当前配置
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// 调用任意方法
    ///
    /// 参数会经过 `make_params` 处理（注入 token、去掉空参数）。
    pub async fn call<R: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<R> {
        let params = self.make_params(params);
        let value = self.inner.caller.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// 按原样的位置参数调用，只注入 token
    ///
    /// 用于空数组也占位的方法（如 `aria2.changeUri`）。
    pub async fn call_positional<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<R> {
        let params = with_token(self.inner.config.token.as_deref(), params);
        let value = self.inner.caller.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// 调用不关心返回值（通常是 "OK"）的方法
    pub(crate) async fn call_ok(&self, method: &str, params: Vec<Value>) -> Result<()> {
        let _: Value = self.call(method, params).await?;
        Ok(())
    }

    /// 组装位置参数
    pub fn make_params(&self, params: Vec<Value>) -> Vec<Value> {
        build_params(self.inner.config.token.as_deref(), params)
    }

    /// 创建通知会话
    ///
    /// 需要 `ClientConfig::notify` 为 true，否则返回 `Error::NotifyDisabled`。
    pub async fn notify_listener(&self) -> Result<Notify> {
        if !self.inner.config.notify {
            return Err(Error::NotifyDisabled);
        }
        Notify::connect(&self.inner.config).await
    }

    /// 关闭调用通道（幂等）
    pub async fn close(&self) {
        self.inner.caller.close().await;
    }
}

/// token 放在首位；`null` 和空数组不发送
pub(crate) fn build_params(token: Option<&str>, params: Vec<Value>) -> Vec<Value> {
    let params = params
        .into_iter()
        .filter(|p| match p {
            Value::Null => false,
            Value::Array(items) => !items.is_empty(),
            _ => true,
        })
        .collect();

    with_token(token, params)
}

/// token 放在首位，其余参数不变
pub(crate) fn with_token(token: Option<&str>, params: Vec<Value>) -> Vec<Value> {
    let Some(token) = token else {
        return params;
    };

    let mut out = Vec::with_capacity(params.len() + 1);
    out.push(Value::String(format!("token:{}", token)));
    out.extend(params);
    out
}
