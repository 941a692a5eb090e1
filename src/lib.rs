//! lazygit-mcp-bridge - lazygit 与 AI 助手之间的 MCP 桥
//!
//! lazygit 里对某个文件/行写下的批注，经由一个共享的消息文件，
//! 以 MCP（JSON-RPC over stdio）资源和工具的形式交给 AI 助手。
//!
//! # 核心功能
//!
//! - **消息队列**: 最多 10 条，FIFO 淘汰，按内容 + 时间去重
//! - **文件监听**: 消息文件创建/写入即入队，只接收本项目的消息
//! - **MCP Server**: `resources/read` 与 `tools/call` 一次取出全部消息
//! - **通知**: 新消息到达时推送 `notifications/resources/updated` 与 `notifications/message`
//!
//! # Feature Flags
//!
//! - `server`: MCP Server（文件监听 + stdio JSON-RPC）
//! - `client`: Sender（写入消息文件）

pub mod config;
pub mod error;
pub mod protocol;
pub mod store;
pub mod types;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "client")]
pub mod client;

// Re-exports
pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use store::{Drained, MessageStore, MAX_QUEUED_MESSAGES, NO_MESSAGES_TEXT};
pub use types::*;

// Protocol types (always available)
pub use protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Notification, Request, RpcError};

#[cfg(feature = "server")]
pub use server::{Bridge, IngestOutcome};

#[cfg(feature = "client")]
pub use client::{send_message, Annotation};
