//! Bridge 服务
//!
//! stdin 逐行读取请求，stdout 逐行写出响应和通知

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use super::handler::Handler;
use super::inbox::Inbox;
use super::notifier::Notifier;
use super::watcher::FileWatcher;
use crate::config::BridgeConfig;

/// 输出通道容量
const OUTPUT_CHANNEL_CAPACITY: usize = 100;

/// Bridge 服务
///
/// 持有全部进程级状态（队列、订阅、配置），由文件监听任务和请求循环共享。
pub struct Bridge {
    config: BridgeConfig,
    inbox: Arc<Inbox>,
    notifier: Arc<Notifier>,
    watcher: Arc<FileWatcher>,
    handler: Arc<Handler>,
}

impl Bridge {
    /// 创建 Bridge
    pub fn new(config: BridgeConfig) -> Self {
        // 创建通知器
        let notifier = Notifier::new();

        // 创建收件箱
        let inbox = Inbox::new(&config, notifier.clone());

        // 创建文件监听器
        let watcher = FileWatcher::new(inbox.clone());

        // 创建处理器
        let handler = Arc::new(Handler::new(inbox.clone(), notifier.clone()));

        Self {
            config,
            inbox,
            notifier,
            watcher,
            handler,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn inbox(&self) -> &Arc<Inbox> {
        &self.inbox
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// 运行 Server（stdin/stdout）
    ///
    /// 文件监听启动失败不影响请求循环，只是不会再收到新消息。
    pub async fn run(self: Arc<Self>) -> Result<()> {
        tracing::info!(
            "🚀 MCP server started for project: {}",
            self.config.project_root.display()
        );

        if let Err(e) = self.watcher.clone().start().await {
            tracing::warn!("⚠️ File watcher inactive, no messages will be received: {:#}", e);
        }

        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();

        tokio::select! {
            result = self.serve(stdin, stdout) => result?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("收到中断信号，准备退出...");
            }
        }

        tracing::info!("👋 MCP server exiting");
        Ok(())
    }

    /// 在给定的读写流上处理请求，输入结束时返回
    ///
    /// 所有输出（响应 + 通知）经同一个通道交给写任务，逐行写出。
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<String>(OUTPUT_CHANNEL_CAPACITY);
        self.notifier.attach(tx);

        // 启动写任务
        let write_handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if writer.write_all(msg.as_bytes()).await.is_err() {
                    break;
                }
                if writer.flush().await.is_err() {
                    break;
                }
            }
        });

        let result = self.read_requests(reader).await;

        // 断开通道后等写任务把剩余的行写完
        self.notifier.detach();
        if let Err(e) = write_handle.await {
            tracing::error!("Writer task failed: {}", e);
        }

        result
    }

    async fn read_requests<R>(&self, mut reader: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .await
                .context("Failed to read from input")?;
            if read == 0 {
                tracing::debug!("Input closed");
                break;
            }

            // resources/read 和 tools/call 会读写消息文件，放到阻塞线程池
            let handler = self.handler.clone();
            let request_line = line.clone();
            let response = tokio::task::spawn_blocking(move || handler.handle_line(&request_line))
                .await
                .context("Request handler task failed")?;
            let Some(response) = response else {
                continue;
            };

            let resp_json = serde_json::to_string(&response)?;
            if !self.notifier.send_line(format!("{}\n", resp_json)).await {
                tracing::warn!("Output channel closed, stopping");
                break;
            }
        }

        Ok(())
    }
}
