//! MCP 协议定义
//!
//! 通信方式：stdin/stdout + JSONL（每条 JSON-RPC 消息一行 JSON + '\n'）

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// MCP 协议版本
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server 名称
pub const SERVER_NAME: &str = "lazygit-mcp-bridge";

/// Server 版本（跟随 crate 版本）
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// 唯一的资源
pub const MESSAGES_URI: &str = "lazygit://messages";

/// 唯一的工具
pub const CHECK_MESSAGES_TOOL: &str = "check_lazygit_messages";

pub const TEXT_MIME_TYPE: &str = "text/plain";

/// 标准 JSON-RPC 错误码
pub mod error_code {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP 方法名
pub mod method {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "initialized";
    pub const NOTIFICATIONS_INITIALIZED: &str = "notifications/initialized";
    pub const RESOURCES_LIST: &str = "resources/list";
    pub const RESOURCES_READ: &str = "resources/read";
    pub const RESOURCES_SUBSCRIBE: &str = "resources/subscribe";
    pub const RESOURCES_UNSUBSCRIBE: &str = "resources/unsubscribe";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const RESOURCE_UPDATED: &str = "notifications/resources/updated";
    pub const LOG_MESSAGE: &str = "notifications/message";

    /// 客户端通知的前缀（无需响应）
    pub const NOTIFICATION_PREFIX: &str = "notifications/";
}

// ==================== JSON-RPC 信封 ====================

/// JSON-RPC 请求（Client → Server）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// 无 id 且方法名以 `notifications/` 开头，视为客户端通知
    pub fn is_notification(&self) -> bool {
        self.id.is_none() && self.method.starts_with(method::NOTIFICATION_PREFIX)
    }
}

/// JSON-RPC 响应（Server → Client）
///
/// `id` 始终序列化；无法解析的请求没有可用的 id，此时为 `null`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// JSON-RPC 错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn parse_error() -> Self {
        Self::new(error_code::PARSE_ERROR, "Parse error")
    }

    pub fn method_not_found() -> Self {
        Self::new(error_code::METHOD_NOT_FOUND, "Method not found")
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(error_code::INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_code::INTERNAL_ERROR, message)
    }
}

/// JSON-RPC 通知（Server → Client，无 id）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

// ==================== 类型化请求 ====================

/// `uri` 参数（resources/read、subscribe、unsubscribe）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UriParams {
    pub uri: String,
}

/// `tools/call` 参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// 按方法解码后的请求
#[derive(Debug, Clone)]
pub enum Request {
    Initialize,
    Initialized,
    ResourcesList,
    ResourcesRead(UriParams),
    ResourcesSubscribe(UriParams),
    ResourcesUnsubscribe(UriParams),
    ToolsList,
    ToolsCall(ToolCallParams),
}

impl Request {
    /// 根据方法名解码参数
    ///
    /// 未知方法返回 `-32601`，参数形状不符返回 `-32602`。
    pub fn decode(method_name: &str, params: Option<Value>) -> Result<Self, RpcError> {
        match method_name {
            method::INITIALIZE => Ok(Request::Initialize),
            method::INITIALIZED | method::NOTIFICATIONS_INITIALIZED => Ok(Request::Initialized),
            method::RESOURCES_LIST => Ok(Request::ResourcesList),
            method::RESOURCES_READ => {
                decode_params(params, "Invalid resource URI").map(Request::ResourcesRead)
            }
            method::RESOURCES_SUBSCRIBE => {
                decode_params(params, "Invalid resource URI").map(Request::ResourcesSubscribe)
            }
            // 取消订阅没有错误情况，缺少 uri 时按空 uri 处理
            method::RESOURCES_UNSUBSCRIBE => Ok(Request::ResourcesUnsubscribe(
                decode_params(params, "Invalid resource URI").unwrap_or_default(),
            )),
            method::TOOLS_LIST => Ok(Request::ToolsList),
            method::TOOLS_CALL => decode_params(params, "Unknown tool").map(Request::ToolsCall),
            _ => Err(RpcError::method_not_found()),
        }
    }
}

fn decode_params<T: DeserializeOwned>(params: Option<Value>, message: &str) -> Result<T, RpcError> {
    let params = params.unwrap_or(Value::Null);
    serde_json::from_value(params).map_err(|e| {
        tracing::debug!("Invalid params: {}", e);
        RpcError::invalid_params(message)
    })
}

// ==================== 结果类型 ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: Capabilities,
    pub server_info: ServerInfo,
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: Capabilities {
                resources: ResourcesCapability {
                    subscribe: true,
                    list_changed: true,
                },
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    pub resources: ResourcesCapability,
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesCapability {
    pub subscribe: bool,
    pub list_changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// 资源描述
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Resource {
    /// lazygit 消息资源
    pub fn messages() -> Self {
        Self {
            uri: MESSAGES_URI.to_string(),
            name: "Lazygit Messages".to_string(),
            description: Some("Messages from lazygit for code improvement".to_string()),
            mime_type: Some(TEXT_MIME_TYPE.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
}

/// 资源内容
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

impl ReadResourceResult {
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            contents: vec![ResourceContents {
                uri: uri.into(),
                mime_type: TEXT_MIME_TYPE.to_string(),
                text: text.into(),
            }],
        }
    }
}

/// 工具描述
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl Tool {
    /// check_lazygit_messages（无参数）
    pub fn check_messages() -> Self {
        Self {
            name: CHECK_MESSAGES_TOOL.to_string(),
            description: "Check for new messages from lazygit".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// 工具结果中的内容块
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ContentBlock>,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

// ==================== 通知 ====================

/// 推送给客户端的通知（内部使用）
#[derive(Debug, Clone)]
pub enum Notification {
    /// 资源已更新（仅在有订阅时发送）
    ResourceUpdated { uri: String, title: String },
    /// 日志消息
    LogMessage { level: String, message: String },
}

impl Notification {
    /// 转换为 JSON-RPC 通知
    pub fn to_jsonrpc(&self) -> JsonRpcNotification {
        match self {
            Notification::ResourceUpdated { uri, title } => JsonRpcNotification::new(
                method::RESOURCE_UPDATED,
                serde_json::json!({ "uri": uri, "title": title }),
            ),
            Notification::LogMessage { level, message } => JsonRpcNotification::new(
                method::LOG_MESSAGE,
                serde_json::json!({ "level": level, "message": message }),
            ),
        }
    }
}
