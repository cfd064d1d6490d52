use stickers_backend::config;
use stickers_backend::handler::{MessageHandler, Reply};
use stickers_backend::SignalStickers;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::var("STICKERS_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = config::read_config(&config_path)?;

    let _logging_guard = stickers_backend::logging::init_logging(&config.log_dir, "stickers-backend", &config.log_level)?;

    tracing::info!("Stickers Backend starting...");

    for dir in [&config.cache_dir, &config.blob_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {:?}", dir))?;
    }

    let stickers = Arc::new(SignalStickers::from_config(config)?);
    let handler = MessageHandler::from_config(stickers, config);
    tracing::info!("Reading messages from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        for reply in handler.handle_message(&line).await {
            print_reply(reply);
        }
    }

    tracing::info!("Stdin closed, shutting down");
    Ok(())
}

fn print_reply(reply: Reply) {
    match reply {
        Reply::Text(text) => println!("{}", text),
        Reply::Html { text, html } => println!("{}\n{}", text, html),
        Reply::Sticker { filename, data } => println!("[sticker {} ({} bytes)]", filename, data.len()),
        Reply::Image { text, filename, data } => println!("{}\n[image {} ({} bytes)]", text, filename, data.len()),
        Reply::File { path, title } => println!("[file '{}' at {}]", title, path.display()),
    }
}
