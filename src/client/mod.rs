//! Sender 模块
//!
//! 供 lazygit 自定义命令使用，把批注写入 Server 监听的消息文件

mod sender;

pub use sender::{send_message, Annotation};
