//! Bridge 配置
//!
//! 消息文件路径遵循 XDG Base Directory：`$XDG_CONFIG_HOME`，否则 `$HOME/.config`。

use std::path::{Path, PathBuf};

/// 消息文件相对配置目录的路径
pub const MESSAGE_FILE_RELATIVE: &str = "jesseduffield/lazygit/mcp-messages.json";

/// 项目根目录标记
const VCS_MARKER: &str = ".git";

/// Bridge 配置（Server 与 Sender 共用）
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// 消息文件路径
    pub message_file: PathBuf,
    /// 当前项目根目录（用于过滤其他项目的消息）
    pub project_root: PathBuf,
}

impl BridgeConfig {
    /// 显式创建配置
    pub fn new<P: Into<PathBuf>, R: Into<PathBuf>>(message_file: P, project_root: R) -> Self {
        Self {
            message_file: message_file.into(),
            project_root: project_root.into(),
        }
    }

    /// 从环境变量和当前工作目录创建配置
    pub fn from_env() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            message_file: default_message_file(),
            project_root: resolve_project_root(&cwd),
        }
    }

    /// 消息文件所在目录（监听目标）
    pub fn message_dir(&self) -> PathBuf {
        self.message_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// 项目根目录的字符串形式（与消息中的 `project_root` 比较）
    pub fn project_root_str(&self) -> String {
        self.project_root.to_string_lossy().to_string()
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// 配置目录
pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }

    let home = std::env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    home.join(".config")
}

/// 默认消息文件路径
pub fn default_message_file() -> PathBuf {
    config_dir().join(MESSAGE_FILE_RELATIVE)
}

/// 从 `start` 向上查找包含 `.git` 的目录，找不到时返回 `start`
pub fn resolve_project_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(VCS_MARKER).exists())
        .unwrap_or(start)
        .to_path_buf()
}
