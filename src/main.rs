//! SMS Forward Gateway CLI
//!
//! 接收手机转发的短信并分发到飞书 / 企业微信 / 钉钉 / Bark

use anyhow::Result;
use clap::{Parser, Subcommand};
use sms_forwarder::{serve, AppConfig};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "smsfwd")]
#[command(about = "SMS 转发网关 - 接收短信推送并分发到多个渠道")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动 HTTP 网关
    Serve {
        /// 监听地址（覆盖 BIND_ADDRESS）
        #[arg(long)]
        bind: Option<String>,
        /// Debug 模式：照常校验和写去重记录，但跳过所有推送
        #[arg(long)]
        debug: bool,
    },
    /// 校验配置并列出已启用的渠道
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, debug } => {
            let mut config = AppConfig::from_env()?;
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            if debug {
                config.debug = true;
            }
            serve(config).await
        }
        Commands::Check => {
            let config = AppConfig::from_env()?;
            println!("bind: {}", config.bind_address);
            for (name, configured) in config.channel_summary() {
                let state = if configured { "configured" } else { "-" };
                println!("{name:10} {state}");
            }
            Ok(())
        }
    }
}
