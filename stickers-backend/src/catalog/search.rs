///! Text search over the catalog and HTML rendering of the results
use stickers_common::CatalogEntry;
use url::form_urlencoded;

use super::tags;
use crate::locator::pack_url;

/// Entries whose title contains `query` or whose tag set contains it, both
/// case-insensitively. Catalog order, at most `max_results` entries.
pub fn search<'a>(entries: &'a [CatalogEntry], query: &str, max_results: usize) -> Vec<&'a CatalogEntry> {
    let query = query.to_lowercase();

    entries
        .iter()
        .filter(|entry| {
            entry.manifest.title.to_lowercase().contains(&query) || tags(entry).contains(&query)
        })
        .take(max_results)
        .collect()
}

/// HTML fragment listing `entries`, empty when there are none
///
/// Each result links back to `self_address` with a prefilled body: one asks
/// for `/info <url>`, the other sends the bare pack link.
pub fn render_html(self_address: &str, entries: &[&CatalogEntry]) -> String {
    let mut html = String::new();

    for entry in entries {
        let url = pack_url(&entry.pack_ref());
        let more_url = format!("mailto:{}?body=/info+{}", self_address, quote_plus(&url));
        let download_url = format!("mailto:{}?body={}", self_address, quote_plus(&url));
        let title = or_placeholder(&entry.manifest.title, "NO TITLE");
        let author = or_placeholder(&entry.manifest.author, "ANONYMOUS");
        let tags = tags(entry).into_iter().collect::<Vec<_>>().join(", ");

        html.push_str(&format!(
            "Title: {}<br/>Author: {}<br/>Tags: {}<br/>\n<a href=\"{}\">MORE</a> | <a href=\"{}\">DOWNLOAD</a><br/><hr/>",
            escape_html(title),
            escape_html(author),
            escape_html(&tags),
            more_url,
            download_url,
        ));
    }

    html
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() { placeholder } else { value }
}

fn quote_plus(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Upstream titles are free text
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
