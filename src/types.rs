//! 消息类型定义

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 去重摘要的字段分隔符
const DEDUP_DELIMITER: &str = "|";

/// 消息文件中的原始消息（Sender 写入，Server 读取）
///
/// 缺失字段按空字符串处理，未知字段忽略。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// 被批注的文件（不校验）
    #[serde(default)]
    pub file: String,
    /// 批注内容
    #[serde(default)]
    pub comment: String,
    /// 来源项目根目录，空表示不限项目
    #[serde(default)]
    pub project_root: String,
    /// RFC3339 时间戳（由 Sender 生成）
    #[serde(default)]
    pub time: String,
}

impl IncomingMessage {
    /// 是否属于给定项目
    pub fn belongs_to(&self, project_root: &str) -> bool {
        self.project_root.is_empty() || self.project_root == project_root
    }
}

/// 队列中的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub file: String,
    pub comment: String,
    pub project_root: String,
    pub time: String,
    dedup_key: String,
}

impl QueuedMessage {
    pub fn new(
        file: impl Into<String>,
        comment: impl Into<String>,
        project_root: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        let file = file.into();
        let comment = comment.into();
        let time = time.into();
        let dedup_key = dedup_key(&file, &comment, &time);
        Self {
            file,
            comment,
            project_root: project_root.into(),
            time,
            dedup_key,
        }
    }

    /// 去重键
    pub fn dedup_key(&self) -> &str {
        &self.dedup_key
    }
}

impl From<IncomingMessage> for QueuedMessage {
    fn from(msg: IncomingMessage) -> Self {
        Self::new(msg.file, msg.comment, msg.project_root, msg.time)
    }
}

/// 计算去重键：SHA-256(file|comment|time)
pub fn dedup_key(file: &str, comment: &str, time: &str) -> String {
    let input = [file, comment, time].join(DEDUP_DELIMITER);
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
