//! HTTP 调用

use std::time::Duration;

use serde_json::Value;
use url::Url;

use super::next_request_id;
use crate::error::Result;
use crate::protocol::{RpcRequest, RpcResponse};

/// HTTP JSON-RPC 调用
///
/// aria2 出错时返回非 2xx 状态码但 body 仍是 JSON-RPC 错误，所以不检查状态码。
pub struct HttpCaller {
    endpoint: Url,
    http: reqwest::Client,
}

impl HttpCaller {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, http })
    }

    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let request = RpcRequest::new(next_request_id(), method, params);

        let response: RpcResponse = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        response.into_result()
    }
}
