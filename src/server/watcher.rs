//! 文件监听器
//!
//! 监听消息文件所在目录，消息文件被创建或写入时触发入队

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::inbox::{IngestOutcome, Inbox};

/// 文件监听器
pub struct FileWatcher {
    /// 收件箱
    inbox: Arc<Inbox>,
    /// 消息文件路径
    message_file: PathBuf,
}

impl FileWatcher {
    /// 创建文件监听器
    pub fn new(inbox: Arc<Inbox>) -> Arc<Self> {
        let message_file = inbox.message_file().to_path_buf();
        Arc::new(Self {
            inbox,
            message_file,
        })
    }

    /// 启动文件监听
    ///
    /// 监听目录而不是文件本身：文件可能还不存在，且每次 drain 后会被删除。
    pub async fn start(self: Arc<Self>) -> Result<()> {
        let dir = self
            .message_file
            .parent()
            .map(Path::to_path_buf)
            .context("Message file has no parent directory")?;

        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create message directory {:?}", dir))?;

        let (tx, mut rx) = mpsc::channel::<Event>(100);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = tx.blocking_send(event);
            }
            Err(e) => {
                tracing::warn!("⚠️ Watcher error: {}", e);
            }
        })
        .context("Failed to create watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory {:?}", dir))?;

        tracing::info!("👁️ Watching message file: {:?}", self.message_file);

        // 处理文件变化事件
        let file_watcher = self.clone();
        tokio::spawn(async move {
            // 保持 watcher 存活
            let _watcher: RecommendedWatcher = watcher;

            while let Some(event) = rx.recv().await {
                file_watcher.handle_event(&event).await;
            }
        });

        Ok(())
    }

    /// 处理文件变化
    async fn handle_event(&self, event: &Event) {
        if !is_write_or_create(&event.kind) {
            return;
        }

        if !event.paths.iter().any(|p| p == &self.message_file) {
            return;
        }

        tracing::debug!("📝 Message file change detected: {:?}", event.kind);
        self.trigger_ingest().await;
    }

    /// 触发入队
    pub async fn trigger_ingest(&self) {
        let inbox = self.inbox.clone();
        let result = tokio::task::spawn_blocking(move || inbox.ingest_file()).await;

        match result {
            Ok(Ok(IngestOutcome::Queued { queue_len })) => {
                tracing::debug!("📝 Ingest complete (queue length: {})", queue_len);
            }
            Ok(Ok(outcome)) => {
                tracing::debug!("📝 Ingest skipped: {:?}", outcome);
            }
            Ok(Err(e)) => {
                // drain 删除文件后的迟到事件也会走到这里
                tracing::debug!("Failed to ingest message file: {}", e);
            }
            Err(e) => {
                tracing::error!("spawn_blocking failed: {}", e);
            }
        }
    }
}

/// 只处理创建和内容写入事件
pub(crate) fn is_write_or_create(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}
