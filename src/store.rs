//! 消息队列
//!
//! 容量受限的 FIFO 队列，按去重键保证唯一。本身不加锁，由 Server 的 `Inbox` 包在 Mutex 里。

use std::collections::VecDeque;

use crate::types::QueuedMessage;

/// 队列容量
pub const MAX_QUEUED_MESSAGES: usize = 10;

/// 队列为空时返回的文本
pub const NO_MESSAGES_TEXT: &str = "No new messages from lazygit";

/// 每条消息末尾的固定提示
const MESSAGE_SUFFIX: &str = "Please improve this code.";

/// 分隔线长度
const SEPARATOR_WIDTH: usize = 50;

/// 一次 drain 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drained {
    /// 格式化后的文本
    pub text: String,
    /// 被取出的消息数
    pub count: usize,
}

/// 消息队列
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: VecDeque<QueuedMessage>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加到队尾，超出容量时丢弃最旧的一条
    pub fn append(&mut self, msg: QueuedMessage) {
        self.messages.push_back(msg);
        while self.messages.len() > MAX_QUEUED_MESSAGES {
            if let Some(evicted) = self.messages.pop_front() {
                tracing::debug!("🗑️ Queue full, evicted oldest message: {}", evicted.comment);
            }
        }
    }

    /// 是否已有相同去重键的消息
    pub fn contains_key(&self, key: &str) -> bool {
        self.messages.iter().any(|m| m.dedup_key() == key)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 按到达顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &QueuedMessage> {
        self.messages.iter()
    }

    /// 格式化全部消息（只读）
    pub fn format_all(&self) -> String {
        if self.messages.is_empty() {
            return NO_MESSAGES_TEXT.to_string();
        }

        let separator = format!("\n{}\n\n", "-".repeat(SEPARATOR_WIDTH));
        self.messages
            .iter()
            .enumerate()
            .map(|(i, msg)| format_message(i + 1, msg))
            .collect::<Vec<_>>()
            .join(&separator)
    }

    /// 格式化全部消息并清空队列
    pub fn drain_all(&mut self) -> Drained {
        let text = self.format_all();
        let count = self.messages.len();
        self.messages.clear();
        Drained { text, count }
    }
}

fn format_message(index: usize, msg: &QueuedMessage) -> String {
    format!(
        "Message {}:\nFile: {}\nComment: {}\nTime: {}\n\n{}",
        index, msg.file, msg.comment, msg.time, MESSAGE_SUFFIX
    )
}
