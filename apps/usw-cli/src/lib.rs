use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use usw_api::{Style, StyleId, StyleInfo, UswApiClient, UswApiClientConfig, UswLinkage};

const DESCRIPTION_DISPLAY_LIMIT: usize = 100;

#[derive(Parser)]
#[command(name = "usw")]
#[command(about = "Publish styles to userstyles.world")]
pub struct UswCli {
    /// Service base URL (defaults to USW_BASE_URL, then https://userstyles.world/)
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Show the remote style a token is bound to
    Info {
        #[arg(long, env = "USW_TOKEN")]
        token: String,
    },
    /// Upload a stylesheet to a linked remote style
    Publish {
        #[arg(long)]
        id: u64,
        #[arg(long, env = "USW_TOKEN")]
        token: String,
        /// File holding the style source
        file: PathBuf,
    },
}

pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = UswCli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    runtime.block_on(execute(cli))
}

async fn execute(cli: UswCli) -> anyhow::Result<()> {
    let client = match cli.base_url {
        Some(base_url) => UswApiClient::new(UswApiClientConfig::new(base_url)),
        None => UswApiClient::from_env(),
    }
    .context("configure usw client")?;

    let info = match cli.command {
        Commands::Info { token } => client
            .fetch_style_info(&token)
            .await
            .context("fetch style info")?,
        Commands::Publish { id, token, file } => {
            let source_code = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("read {}", file.display()))?;
            let style = linked_style(id, token, source_code);
            client.upload_style(&style).await.context("upload style")?
        }
    };

    println!("{}", render_info(&info)?);
    Ok(())
}

fn linked_style(id: u64, token: String, source_code: String) -> Style {
    let mut style = Style::new(source_code);
    style.usw = Some(UswLinkage {
        id: Some(StyleId::Number(id)),
        token: Some(token),
        ..UswLinkage::default()
    });
    style
}

fn render_info(info: &StyleInfo) -> anyhow::Result<String> {
    let mut display = info.clone();
    if let Some(Value::String(description)) = display.get_mut("description") {
        *description = clip_string(description, DESCRIPTION_DISPLAY_LIMIT);
    }
    serde_json::to_string_pretty(&display).context("encode style info")
}

/// Shortens `text` to `limit` characters, marking the cut with `...`.
///
/// Characters are Unicode scalar values, so a supplementary-plane emoji
/// counts once where a UTF-16 length would count it twice.
pub fn clip_string(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(limit).collect();
    clipped.push_str("...");
    clipped
}
