use anyhow::Result;
use clap::Args;
use colored::Colorize;
use scribe_client::{SessionConfig, DEFAULT_CONFIG_NAME};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Websocket URL of the document service
    #[arg(short, long, default_value = "ws://127.0.0.1:8000")]
    pub server_url: String,

    /// Flush interval in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    pub flush_interval_ms: u64,

    /// Force overwrite existing config
    #[arg(long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    if args.flush_interval_ms == 0 {
        anyhow::bail!("--flush-interval-ms must be greater than zero");
    }

    let config = SessionConfig {
        server_url: args.server_url,
        flush_interval_ms: args.flush_interval_ms,
    };
    config.save(cwd)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!("    server:  {}", config.server_url);
    println!("    flush:   every {}ms", config.flush_interval_ms);

    Ok(())
}
