//! 消息发送
//!
//! lazygit 调用 `send` 子命令，把一条批注写入消息文件。
//! 直接覆盖写入（不走 rename），Server 才能收到 create/write 事件。

use std::fs;
use std::path::PathBuf;

use chrono::{Local, SecondsFormat};

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::types::IncomingMessage;

/// 一条待发送的批注
#[derive(Debug, Clone)]
pub struct Annotation {
    /// 文件路径
    pub file: String,
    /// 行号或范围（如 `12` 或 `12-20`）
    pub line: String,
    /// 批注内容
    pub comment: String,
}

impl Annotation {
    pub fn new(file: impl Into<String>, line: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: line.into(),
            comment: comment.into(),
        }
    }

    /// 生成消息，`file` 字段记为 `文件:行号`
    pub fn to_message(&self, project_root: &str, time: String) -> IncomingMessage {
        IncomingMessage {
            file: format!("{}:{}", self.file, self.line),
            comment: self.comment.clone(),
            project_root: project_root.to_string(),
            time,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.file.is_empty() || self.line.is_empty() || self.comment.is_empty() {
            return Err(Error::Config(
                "--file, --line, and --comment are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// 写入消息文件，返回写入的路径
pub fn send_message(config: &BridgeConfig, annotation: &Annotation) -> Result<PathBuf> {
    annotation.validate()?;

    // 确保目录存在
    fs::create_dir_all(config.message_dir())?;

    let time = Local::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let message = annotation.to_message(&config.project_root_str(), time);
    let data = serde_json::to_string_pretty(&message)?;

    fs::write(&config.message_file, data)?;

    tracing::debug!("📨 Message written: {:?}", config.message_file);
    Ok(config.message_file.clone())
}
