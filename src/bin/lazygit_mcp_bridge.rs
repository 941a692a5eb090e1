//! lazygit-mcp-bridge - lazygit 与 AI 助手之间的桥
//!
//! 子命令：
//! - `server`: 以 MCP Server 运行（stdin/stdout）
//! - `send`: 从 lazygit 发送一条批注

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lazygit_mcp_bridge::{send_message, Annotation, Bridge, BridgeConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lazygit-mcp-bridge")]
#[command(about = "Bridge between lazygit and AI assistants using MCP", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run as MCP server
    Server,

    /// Send a message from lazygit to AI
    Send {
        /// File path
        #[arg(short, long)]
        file: String,

        /// Line number or range
        #[arg(short, long)]
        line: String,

        /// Comment for AI
        #[arg(short, long)]
        comment: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志（stdout 是协议通道，日志只能写 stderr）
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("lazygit_mcp_bridge=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = BridgeConfig::from_env();

    match cli.command {
        Command::Server => {
            tracing::info!("🚀 lazygit-mcp-bridge v{}", env!("CARGO_PKG_VERSION"));
            let bridge = Arc::new(Bridge::new(config));
            bridge.run().await?;
        }
        Command::Send {
            file,
            line,
            comment,
        } => {
            let annotation = Annotation::new(file, line, comment);
            send_message(&config, &annotation)?;
            println!("Message sent successfully for {}", annotation.file);
        }
    }

    Ok(())
}
