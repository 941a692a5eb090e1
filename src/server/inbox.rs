//! 消息收件箱
//!
//! 共享的消息队列 + 入队/取出逻辑。文件监听任务调用 `ingest_file`，
//! 请求处理调用 `drain`；两者都在同一把锁内完成读-改-写。

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::notifier::Notifier;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::store::{Drained, MessageStore};
use crate::types::{IncomingMessage, QueuedMessage};

/// 入队结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// 已入队
    Queued { queue_len: usize },
    /// 与队列中的消息重复
    Duplicate,
    /// 属于其他项目
    ForeignProject { project_root: String },
}

enum Admission {
    Admitted(QueuedMessage, usize),
    Skipped(IngestOutcome),
}

/// 消息收件箱
pub struct Inbox {
    /// 消息文件路径
    message_file: PathBuf,
    /// 当前项目根目录
    project_root: String,
    /// 消息队列
    store: Mutex<MessageStore>,
    /// 通知器
    notifier: Arc<Notifier>,
}

impl Inbox {
    /// 创建收件箱
    pub fn new(config: &BridgeConfig, notifier: Arc<Notifier>) -> Arc<Self> {
        Arc::new(Self {
            message_file: config.message_file.clone(),
            project_root: config.project_root_str(),
            store: Mutex::new(MessageStore::new()),
            notifier,
        })
    }

    pub fn message_file(&self) -> &Path {
        &self.message_file
    }

    /// 当前队列长度
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    /// 读取消息文件并入队
    ///
    /// 读文件和入队在同一把锁内完成，drain 删除文件后不会再读到旧内容。
    /// 文件不存在（已被 drain 删除）或内容不完整时返回错误，由调用方记录日志。
    pub fn ingest_file(&self) -> Result<IngestOutcome> {
        let admission = {
            let mut store = self.store.lock();
            let content = fs::read_to_string(&self.message_file)?;
            let incoming: IncomingMessage = serde_json::from_str(&content)?;
            if let Some(outcome) = self.check_scope(&incoming) {
                return Ok(outcome);
            }
            Self::admit(&mut store, incoming)
        };

        Ok(self.finish(admission))
    }

    /// 解析一条消息并入队，成功后发送通知
    pub fn ingest_str(&self, content: &str) -> Result<IngestOutcome> {
        let incoming: IncomingMessage = serde_json::from_str(content)?;

        if let Some(outcome) = self.check_scope(&incoming) {
            return Ok(outcome);
        }

        let admission = {
            let mut store = self.store.lock();
            Self::admit(&mut store, incoming)
        };

        Ok(self.finish(admission))
    }

    /// 格式化当前队列（不清空）
    pub fn peek(&self) -> String {
        self.store.lock().format_all()
    }

    /// 取出全部消息并清空队列
    ///
    /// 在锁内先吸收磁盘上尚未处理的消息，再取快照、清空、删除消息文件。
    /// drain 之前写入的消息由本次返回；之后写入的留给下一次。
    /// 吸收的消息在锁释放后照常通知。
    pub fn drain(&self) -> Drained {
        let (drained, absorbed) = {
            let mut store = self.store.lock();
            let absorbed = self.absorb_pending(&mut store);

            let drained = store.drain_all();
            if drained.count > 0 {
                tracing::info!("📤 Drained {} message(s)", drained.count);
                self.remove_message_file();
            }
            (drained, absorbed)
        };

        if let Some(msg) = absorbed {
            self.notifier.notify_new_message(&msg);
        }
        drained
    }

    fn check_scope(&self, incoming: &IncomingMessage) -> Option<IngestOutcome> {
        if incoming.belongs_to(&self.project_root) {
            return None;
        }
        tracing::warn!(
            "Message for different project: {} (current: {})",
            incoming.project_root,
            self.project_root
        );
        Some(IngestOutcome::ForeignProject {
            project_root: incoming.project_root.clone(),
        })
    }

    /// 入队成功后记录日志并通知（锁外执行）
    fn finish(&self, admission: Admission) -> IngestOutcome {
        match admission {
            Admission::Admitted(msg, queue_len) => {
                tracing::info!(
                    "📥 Message received for project: {} (queue length: {})",
                    self.project_root,
                    queue_len
                );
                self.notifier.notify_new_message(&msg);
                IngestOutcome::Queued { queue_len }
            }
            Admission::Skipped(outcome) => outcome,
        }
    }

    fn admit(store: &mut MessageStore, incoming: IncomingMessage) -> Admission {
        let msg = QueuedMessage::from(incoming);
        if store.contains_key(msg.dedup_key()) {
            tracing::debug!("Duplicate message ignored: {}", msg.comment);
            return Admission::Skipped(IngestOutcome::Duplicate);
        }

        store.append(msg.clone());
        Admission::Admitted(msg, store.len())
    }

    /// 吸收磁盘上的消息（事件可能还在通道里）
    fn absorb_pending(&self, store: &mut MessageStore) -> Option<QueuedMessage> {
        let content = fs::read_to_string(&self.message_file).ok()?;

        let incoming: IncomingMessage = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("Pending message file not parseable yet: {}", e);
                return None;
            }
        };

        if self.check_scope(&incoming).is_some() {
            return None;
        }

        match Self::admit(store, incoming) {
            Admission::Admitted(msg, _) => {
                tracing::debug!("📥 Absorbed pending message before drain: {}", msg.comment);
                Some(msg)
            }
            Admission::Skipped(_) => None,
        }
    }

    fn remove_message_file(&self) {
        match fs::remove_file(&self.message_file) {
            Ok(()) => tracing::info!("🧹 Message file cleaned up after retrieval"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove message file {:?}: {}",
                self.message_file,
                e
            ),
        }
    }
}
