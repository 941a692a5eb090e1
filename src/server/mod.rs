//! Server 模块 - 文件监听 + 消息队列 + stdio MCP
//!
//! Server 负责：
//! - 监听 lazygit 写入的消息文件
//! - 校验、去重后放入容量受限的队列
//! - 通过 resources/read 或 tools/call 一次性取出全部消息
//! - 新消息到达时推送通知

mod bridge;
mod handler;
mod inbox;
mod notifier;
mod watcher;

pub use bridge::Bridge;
pub use handler::Handler;
pub use inbox::{IngestOutcome, Inbox};
pub use notifier::{LineSender, Notifier};
pub use watcher::FileWatcher;
