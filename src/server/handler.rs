//! 请求处理器
//!
//! 解析一行 JSON-RPC 请求，按方法分发，生成响应

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::inbox::Inbox;
use super::notifier::Notifier;
use crate::protocol::{
    CallToolResult, InitializeResult, JsonRpcRequest, JsonRpcResponse, ListResourcesResult,
    ListToolsResult, ReadResourceResult, Request, Resource, RpcError, Tool, ToolCallParams,
    UriParams, CHECK_MESSAGES_TOOL, MESSAGES_URI,
};

/// 请求处理器
pub struct Handler {
    /// 收件箱
    inbox: Arc<Inbox>,
    /// 通知器（订阅列表）
    notifier: Arc<Notifier>,
}

impl Handler {
    /// 创建处理器
    pub fn new(inbox: Arc<Inbox>, notifier: Arc<Notifier>) -> Self {
        Self { inbox, notifier }
    }

    /// 处理一行输入
    ///
    /// 返回 None 表示不需要响应（空行、客户端通知、`initialized`）。
    pub fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match parse_request(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                tracing::warn!("Failed to parse request: {}", e);
                // 无法解析的请求取不到 id，只能回 null
                Some(JsonRpcResponse::error(None, RpcError::parse_error()))
            }
        }
    }

    /// 处理请求
    pub fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.is_notification();
        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        let decoded = match Request::decode(&method, params) {
            Ok(r) => r,
            Err(_) if is_notification => {
                tracing::debug!("Ignoring client notification: {}", method);
                return None;
            }
            Err(e) => {
                tracing::debug!("Rejected request: method={}, code={}", method, e.code);
                return Some(JsonRpcResponse::error(id, e));
            }
        };

        let result = match decoded {
            Request::Initialize => {
                tracing::info!("🤝 Initialize: id={:?}", id);
                to_result(InitializeResult::default())
            }
            Request::Initialized => {
                tracing::debug!("🤝 Client initialized");
                return None;
            }
            Request::ResourcesList => to_result(ListResourcesResult {
                resources: vec![Resource::messages()],
            }),
            Request::ResourcesRead(params) => self.handle_resources_read(params),
            Request::ResourcesSubscribe(params) => self.handle_subscribe(params),
            Request::ResourcesUnsubscribe(params) => {
                self.notifier.unsubscribe(&params.uri);
                Ok(empty_object())
            }
            Request::ToolsList => to_result(ListToolsResult {
                tools: vec![Tool::check_messages()],
            }),
            Request::ToolsCall(params) => self.handle_tools_call(params),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, e),
        })
    }

    /// 读取资源（取出全部消息）
    fn handle_resources_read(&self, params: UriParams) -> Result<Value, RpcError> {
        if params.uri != MESSAGES_URI {
            return Err(RpcError::invalid_params("Invalid resource URI"));
        }

        let drained = self.inbox.drain();
        to_result(ReadResourceResult::text(params.uri, drained.text))
    }

    /// 调用工具（取出全部消息）
    fn handle_tools_call(&self, params: ToolCallParams) -> Result<Value, RpcError> {
        if params.name != CHECK_MESSAGES_TOOL {
            return Err(RpcError::invalid_params("Unknown tool"));
        }

        let drained = self.inbox.drain();
        to_result(CallToolResult::text(drained.text))
    }

    /// 订阅资源
    fn handle_subscribe(&self, params: UriParams) -> Result<Value, RpcError> {
        if params.uri != MESSAGES_URI {
            return Err(RpcError::invalid_params("Invalid resource URI"));
        }

        self.notifier.subscribe(params.uri);
        Ok(empty_object())
    }
}

/// 请求必须是 JSON 对象；数组等其他形状按解析错误处理
fn parse_request(line: &str) -> serde_json::Result<JsonRpcRequest> {
    let value: Value = serde_json::from_str(line)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("request is not a JSON object"));
    }
    serde_json::from_value(value)
}

fn to_result<T: Serialize>(result: T) -> Result<Value, RpcError> {
    serde_json::to_value(result).map_err(|e| {
        tracing::error!("Failed to serialize result: {}", e);
        RpcError::internal_error("Internal error")
    })
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
