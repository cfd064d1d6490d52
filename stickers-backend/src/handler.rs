///! Routes private chat messages to sticker operations.
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::StickersConfig;
use crate::error::StickerError;
use crate::packaging::human_size;
use crate::stickers::SignalStickers;

const HELP: &str = "Send me an emoji to get a sticker representing that emoji.\n\n\
Send me a text to search for sticker packs matching that text.\n\n\
Also, you can send me a URL of a Signal sticker pack, and I will send you the pack, for example, something that looks like:\n\
sgnl://addstickers/?pack_id=59d338...&pack_key=56af35...\n\n\
**Available commands**\n\
/info URL - Get more information about the sticker pack with given URL, example: /info sgnl://addstickers/?pack_id=59d338...&pack_key=56af35...";

const APOLOGY: &str = "❌ Sorry, sticker servers can't be reached right now, try again later";

/// One outgoing chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Plain text with a rich HTML body
    Html { text: String, html: String },
    /// A sticker image sent as a sticker
    Sticker { filename: String, data: Vec<u8> },
    /// Text with an attached image
    Image { text: String, filename: String, data: Vec<u8> },
    /// A file on disk, owned by the receiver once replied
    File { path: PathBuf, title: String },
}

pub struct MessageHandler {
    stickers: Arc<SignalStickers>,
    blob_dir: PathBuf,
    max_pack_size: u64,
    self_address: String,
}

impl MessageHandler {
    pub fn new(stickers: Arc<SignalStickers>, blob_dir: PathBuf, max_pack_size: u64, self_address: String) -> Self {
        Self {
            stickers,
            blob_dir,
            max_pack_size,
            self_address,
        }
    }

    pub fn from_config(stickers: Arc<SignalStickers>, config: &StickersConfig) -> Self {
        Self::new(
            stickers,
            config.blob_dir.clone(),
            config.max_pack_size,
            config.self_address.clone(),
        )
    }

    /// Handle incoming message
    pub async fn handle_message(&self, text: &str) -> Vec<Reply> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        match parse_command(text) {
            Some((command, args)) => self.router(&command, &args).await,
            None if SignalStickers::is_pack(text) => self.send_pack(text).await,
            None if is_single_emoji(text) => self.random_sticker(text).await,
            None => self.search(text).await,
        }
    }

    /// Route commands to appropriate handlers
    async fn router(&self, command: &str, args: &str) -> Vec<Reply> {
        match command {
            "help" => vec![Reply::Text(HELP.to_string())],
            "info" => self.pack_info(args.trim()).await,
            _ => vec![Reply::Text(format!("Unknown command: /{}", command))],
        }
    }

    async fn pack_info(&self, url: &str) -> Vec<Reply> {
        if !SignalStickers::is_pack(url) {
            return vec![Reply::Text("❌ Unknown pack URL".to_string())];
        }

        match self.stickers.get_pack_metadata(url).await {
            Ok(info) => vec![Reply::Image {
                text: info.summary,
                filename: "cover.webp".to_string(),
                data: info.cover,
            }],
            Err(e) => failure_reply(url, e),
        }
    }

    async fn send_pack(&self, url: &str) -> Vec<Reply> {
        let pack = match self.stickers.download_pack(&self.blob_dir, url).await {
            Ok(pack) => pack,
            Err(e) => return failure_reply(url, e),
        };

        let size = match tokio::fs::metadata(&pack.path).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                tracing::error!("Failed to stat pack archive {:?}: {}", pack.path, e);
                remove_archive(&pack.path).await;
                return vec![Reply::Text(APOLOGY.to_string())];
            }
        };

        if size > self.max_pack_size {
            tracing::info!("Pack '{}' is too big to send: {} bytes", pack.title, size);
            remove_archive(&pack.path).await;
            return vec![Reply::Text(format!("❌ Pack too big ({})", human_size(size)))];
        }

        vec![Reply::File {
            path: pack.path,
            title: pack.title,
        }]
    }

    async fn random_sticker(&self, emoji: &str) -> Vec<Reply> {
        match self.stickers.get_random_sticker(emoji).await {
            Ok(Some(found)) => vec![
                Reply::Sticker {
                    filename: format!("{}.webp", emoji),
                    data: found.image,
                },
                Reply::Text(found.pack_url),
            ],
            Ok(None) => vec![Reply::Text(format!("❌ No sticker found for: '{}'", emoji))],
            Err(e) => failure_reply(emoji, e),
        }
    }

    async fn search(&self, query: &str) -> Vec<Reply> {
        match self.stickers.search_html(&self.self_address, query).await {
            Ok(html) if html.is_empty() => vec![Reply::Text(format!("❌ No results for: '{}'", query))],
            Ok(html) => vec![Reply::Html {
                text: format!("Results for: '{}'", query),
                html,
            }],
            Err(e) => failure_reply(query, e),
        }
    }
}

fn failure_reply(request: &str, error: StickerError) -> Vec<Reply> {
    match error {
        StickerError::MalformedPackUrl(_) => vec![Reply::Text("❌ Unknown pack URL".to_string())],
        e => {
            tracing::error!("Request '{}' failed: {}", request, e);
            vec![Reply::Text(APOLOGY.to_string())]
        }
    }
}

async fn remove_archive(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Failed to remove pack archive {:?}: {}", path, e);
    }
}

fn is_single_emoji(text: &str) -> bool {
    emojis::get(text).is_some()
}

/// Parse command from message content
fn parse_command(content: &str) -> Option<(String, String)> {
    let re = Regex::new(r"^\s*/(\S+)\s*(.*)$").ok()?;
    let caps = re.captures(content)?;
    let command = caps.get(1).map_or("", |m| m.as_str()).to_string();
    let args = caps.get(2).map_or("", |m| m.as_str()).to_string();
    Some((command, args))
}
