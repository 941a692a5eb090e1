//! 通知器
//!
//! 维护资源订阅列表，并持有唯一的输出通道。响应和通知都经过这个通道，
//! 由 Server 的写任务逐行写出，保证每行 JSON 不会交错。

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::protocol::{Notification, MESSAGES_URI};
use crate::types::QueuedMessage;

/// 输出通道（每条消息一行 JSON + '\n'）
pub type LineSender = mpsc::Sender<String>;

/// 资源更新通知的标题
const RESOURCE_UPDATED_TITLE: &str = "New lazygit comment received";

/// 通知器
pub struct Notifier {
    /// 已订阅的资源 URI（允许重复）
    subscriptions: RwLock<Vec<String>>,
    /// 当前输出通道，未连接时为 None
    sender: RwLock<Option<LineSender>>,
}

impl Notifier {
    /// 创建新的通知器
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 连接输出通道
    pub fn attach(&self, sender: LineSender) {
        *self.sender.write() = Some(sender);
        tracing::debug!("📡 Output channel attached");
    }

    /// 断开输出通道
    pub fn detach(&self) {
        self.sender.write().take();
        tracing::debug!("📡 Output channel detached");
    }

    /// 订阅资源
    pub fn subscribe(&self, uri: impl Into<String>) {
        let uri = uri.into();
        tracing::info!("📡 Resource subscribed: {}", uri);
        self.subscriptions.write().push(uri);
    }

    /// 取消订阅（移除第一条匹配项），返回是否移除
    pub fn unsubscribe(&self, uri: &str) -> bool {
        let mut subs = self.subscriptions.write();
        let removed = match subs.iter().position(|s| s == uri) {
            Some(pos) => {
                subs.remove(pos);
                true
            }
            None => false,
        };
        tracing::info!("📡 Resource unsubscribed: {} (removed={})", uri, removed);
        removed
    }

    /// 是否有订阅者
    pub fn has_subscribers(&self) -> bool {
        !self.subscriptions.read().is_empty()
    }

    /// 订阅条目数
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// 新消息入队后的通知
    ///
    /// 有订阅者时先发资源更新，之后总是发一条 info 日志通知。
    pub fn notify_new_message(&self, msg: &QueuedMessage) {
        if self.has_subscribers() {
            self.notify(Notification::ResourceUpdated {
                uri: MESSAGES_URI.to_string(),
                title: RESOURCE_UPDATED_TITLE.to_string(),
            });
            tracing::debug!("📡 Sent resource update notification");
        }

        self.notify(Notification::LogMessage {
            level: "info".to_string(),
            message: format!("New message from lazygit: {}", msg.comment),
        });
    }

    /// 发送通知（非阻塞，fire-and-forget）
    pub fn notify(&self, notification: Notification) {
        let message = match serde_json::to_string(&notification.to_jsonrpc()) {
            Ok(json) => format!("{}\n", json),
            Err(e) => {
                tracing::error!("Failed to serialize notification: {}", e);
                return;
            }
        };

        let Some(sender) = self.current_sender() else {
            tracing::trace!("📡 No output channel, dropping notification");
            return;
        };

        if let Err(e) = sender.try_send(message) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!("📡 Channel full, dropping notification");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::debug!("📡 Channel closed, dropping notification");
                }
            }
        }
    }

    /// 发送一行（响应用，等待通道有空位）
    pub async fn send_line(&self, line: String) -> bool {
        // 先取出 sender 的 clone，再释放锁
        match self.current_sender() {
            Some(sender) => sender.send(line).await.is_ok(),
            None => false,
        }
    }

    fn current_sender(&self) -> Option<LineSender> {
        self.sender.read().clone()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            sender: RwLock::new(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QueuedMessage {
        QueuedMessage::new("a.go", "fix nil check", "/repo", "2024-01-01T00:00:00Z")
    }

    #[test]
    fn test_notify_without_subscribers_sends_log_only() {
        let notifier = Notifier::new();
        let (tx, mut rx) = mpsc::channel(10);
        notifier.attach(tx);

        notifier.notify_new_message(&sample());

        let line = rx.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["method"], "notifications/message");
        assert_eq!(value["params"]["level"], "info");
        assert_eq!(value["params"]["message"], "New message from lazygit: fix nil check");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_notify_with_subscriber_sends_update_first() {
        let notifier = Notifier::new();
        let (tx, mut rx) = mpsc::channel(10);
        notifier.attach(tx);
        notifier.subscribe(MESSAGES_URI);

        notifier.notify_new_message(&sample());

        let first: serde_json::Value = serde_json::from_str(rx.try_recv().unwrap().trim_end()).unwrap();
        assert_eq!(first["method"], "notifications/resources/updated");
        assert_eq!(first["params"]["uri"], MESSAGES_URI);
        assert_eq!(first["params"]["title"], RESOURCE_UPDATED_TITLE);

        let second: serde_json::Value = serde_json::from_str(rx.try_recv().unwrap().trim_end()).unwrap();
        assert_eq!(second["method"], "notifications/message");
    }

    #[test]
    fn test_subscriptions_allow_duplicates() {
        let notifier = Notifier::new();
        notifier.subscribe(MESSAGES_URI);
        notifier.subscribe(MESSAGES_URI);
        assert_eq!(notifier.subscription_count(), 2);

        assert!(notifier.unsubscribe(MESSAGES_URI));
        assert!(notifier.has_subscribers());
        assert!(notifier.unsubscribe(MESSAGES_URI));
        assert!(!notifier.has_subscribers());
        assert!(!notifier.unsubscribe(MESSAGES_URI));
    }

    #[test]
    fn test_notify_detached_is_noop() {
        let notifier = Notifier::new();
        let (tx, mut rx) = mpsc::channel(10);
        notifier.attach(tx);
        notifier.detach();

        notifier.notify_new_message(&sample());
        assert!(rx.try_recv().is_err());
    }
}
