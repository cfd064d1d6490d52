///! Zip packaging of sticker packs
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use stickers_common::StickerRef;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{StickerError, StickerResult};

/// Longest escaped title used in the archive file name
const MAX_FILE_PREFIX_LEN: usize = 64;
const UNTITLED: &str = "sticker-pack";

/// A pack archive being written in the caller's directory
///
/// The file is created on `create` and survives `finish`; `discard` removes it.
pub struct PackArchive {
    path: PathBuf,
    pack_name: String,
    writer: ZipWriter<File>,
    options: SimpleFileOptions,
    entries: usize,
}

impl PackArchive {
    /// Create a uniquely named `<escaped title>-XXXX.zip` in `dest_dir`
    pub fn create(dest_dir: &Path, title: &str) -> StickerResult<Self> {
        let pack_name = escaped_name(title);
        let (file, path) = tempfile::Builder::new()
            .prefix(&format!("{}-", file_prefix(title)))
            .suffix(".zip")
            .tempfile_in(dest_dir)
            .and_then(|temp| temp.keep().map_err(|e| e.error))
            .map_err(|e| StickerError::packaging(dest_dir, e))?;

        tracing::debug!("Created pack archive {:?}", path);
        Ok(Self {
            path,
            pack_name,
            writer: ZipWriter::new(file),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            entries: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the directory holding the stickers inside the archive
    pub fn pack_name(&self) -> &str {
        &self.pack_name
    }

    /// Append one sticker; entries keep the order of the calls
    pub fn add_sticker(&mut self, sticker: &StickerRef, image: &[u8]) -> StickerResult<()> {
        let name = entry_name(&self.pack_name, sticker);
        self.writer
            .start_file(name, self.options)
            .map_err(|e| StickerError::packaging(&self.path, std::io::Error::other(e)))?;
        self.writer
            .write_all(image)
            .map_err(|e| StickerError::packaging(&self.path, e))?;
        self.entries += 1;
        Ok(())
    }

    /// Write the central directory and hand the file over to the caller
    pub fn finish(self) -> StickerResult<PathBuf> {
        let Self { path, writer, entries, .. } = self;
        let file = writer
            .finish()
            .map_err(|e| StickerError::packaging(&path, std::io::Error::other(e)))?;
        file.sync_all()
            .map_err(|e| StickerError::packaging(&path, e))?;

        tracing::info!("Packed {} stickers into {:?}", entries, path);
        Ok(path)
    }

    /// Drop a partially written archive
    pub fn discard(self) {
        let path = self.path;
        drop(self.writer);
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!("Failed to remove partial archive {:?}: {}", path, e);
        }
    }
}

/// Percent-escaped title, safe as a file name
pub fn escaped_name(title: &str) -> String {
    if title.is_empty() {
        return UNTITLED.to_string();
    }
    urlencoding::encode(title).into_owned()
}

/// `escaped_name` capped for the archive file name, cut between whole
/// escaped characters only
fn file_prefix(title: &str) -> String {
    if title.is_empty() {
        return UNTITLED.to_string();
    }

    let mut prefix = String::new();
    let mut buf = [0u8; 4];
    for c in title.chars() {
        let escaped = urlencoding::encode(c.encode_utf8(&mut buf));
        if prefix.len() + escaped.len() > MAX_FILE_PREFIX_LEN {
            break;
        }
        prefix.push_str(&escaped);
    }
    prefix
}

/// `<pack>/<id>.<emoji short name>+<emoji>.webp`
pub fn entry_name(pack_name: &str, sticker: &StickerRef) -> String {
    format!(
        "{}/{}.{}+{}.webp",
        pack_name,
        sticker.id,
        emoji_name(&sticker.emoji),
        sticker.emoji
    )
}

/// Short name of an emoji, e.g. `cat_face`, empty when unknown
pub fn emoji_name(emoji: &str) -> String {
    match emojis::get(emoji) {
        Some(found) => found
            .name()
            .chars()
            .filter(|c| !matches!(c, ':' | ',' | '"' | '\''))
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect(),
        None => String::new(),
    }
}

/// Human readable size with binary prefixes, e.g. `15.0MiB`
pub fn human_size(bytes: u64) -> String {
    let mut num = bytes as f64;
    for unit in ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"] {
        if num.abs() < 1024.0 {
            return format!("{:.1}{}B", num, unit);
        }
        num /= 1024.0;
    }
    format!("{:.1}YiB", num)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn test_escaped_name() {
        assert_eq!(escaped_name("Cats"), "Cats");
        assert_eq!(escaped_name("Cats & Dogs/2"), "Cats%20%26%20Dogs%2F2");
        assert_eq!(escaped_name(""), UNTITLED);
        assert_eq!(escaped_name(&"x".repeat(200)).len(), 200);
    }

    #[test]
    fn test_file_prefix_keeps_whole_escapes() {
        assert_eq!(file_prefix("Cats & Dogs"), "Cats%20%26%20Dogs");
        assert_eq!(file_prefix(""), UNTITLED);
        assert_eq!(file_prefix(&"x".repeat(200)).len(), MAX_FILE_PREFIX_LEN);

        // Each "é" escapes to six bytes; ten fit, the eleventh would split
        let prefix = file_prefix(&"é".repeat(11));
        assert_eq!(prefix, "%C3%A9".repeat(10));
        assert_eq!(urlencoding::decode(&prefix).unwrap(), "é".repeat(10));
    }

    #[test]
    fn test_long_title_keeps_full_entry_directory() {
        let temp_dir = TempDir::new().unwrap();
        let title = "é".repeat(11);

        let mut archive = PackArchive::create(temp_dir.path(), &title).unwrap();
        assert_eq!(archive.pack_name(), "%C3%A9".repeat(11));
        archive.add_sticker(&StickerRef::new(1, "🐱"), b"image").unwrap();
        let path = archive.finish().unwrap();

        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with(&format!("{}-", "%C3%A9".repeat(10))));

        let mut zip = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let entry = zip.by_index(0).unwrap();
        assert_eq!(entry.name(), format!("{}/1.cat_face+🐱.webp", "%C3%A9".repeat(11)));
    }

    #[test]
    fn test_emoji_name() {
        assert_eq!(emoji_name("🐱"), "cat_face");
        assert_eq!(emoji_name(""), "");
        assert_eq!(emoji_name("not an emoji"), "");
    }

    #[test]
    fn test_entry_name() {
        assert_eq!(entry_name("Cats", &StickerRef::new(1, "🐱")), "Cats/1.cat_face+🐱.webp");
        assert_eq!(entry_name("Cats", &StickerRef::new(7, "")), "Cats/7.+.webp");
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0.0B");
        assert_eq!(human_size(1023), "1023.0B");
        assert_eq!(human_size(1024), "1.0KiB");
        assert_eq!(human_size(1024 * 1024 * 15), "15.0MiB");
        assert_eq!(human_size(1536 * 1024 * 1024), "1.5GiB");
    }

    #[test]
    fn test_archive_entries_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let stickers = [StickerRef::new(3, "🐱"), StickerRef::new(1, ""), StickerRef::new(2, "🐶")];

        let mut archive = PackArchive::create(temp_dir.path(), "Cats & Dogs").unwrap();
        for sticker in &stickers {
            archive.add_sticker(sticker, &[sticker.id as u8; 32]).unwrap();
        }
        let path = archive.finish().unwrap();

        assert_eq!(path.parent(), Some(temp_dir.path()));
        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("Cats%20%26%20Dogs-"));
        assert!(file_name.ends_with(".zip"));

        let mut zip = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(zip.len(), 3);
        for (i, sticker) in stickers.iter().enumerate() {
            let mut entry = zip.by_index(i).unwrap();
            assert_eq!(entry.name(), entry_name("Cats%20%26%20Dogs", sticker));
            assert_eq!(entry.compression(), CompressionMethod::Deflated);
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            assert_eq!(content, vec![sticker.id as u8; 32]);
        }
    }

    #[test]
    fn test_archive_names_are_unique() {
        let temp_dir = TempDir::new().unwrap();
        let first = PackArchive::create(temp_dir.path(), "Cats").unwrap().finish().unwrap();
        let second = PackArchive::create(temp_dir.path(), "Cats").unwrap().finish().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_discard_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let archive = PackArchive::create(temp_dir.path(), "Cats").unwrap();
        let path = archive.path().to_path_buf();
        assert!(path.exists());

        archive.discard();
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_directory_is_packaging_failure() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        match PackArchive::create(&missing, "Cats") {
            Err(StickerError::PackagingFailure { path, .. }) => assert_eq!(path, missing),
            _ => panic!("expected PackagingFailure"),
        }
    }
}
