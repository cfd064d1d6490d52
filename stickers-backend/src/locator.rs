///! Sticker pack deep-link parsing
use stickers_common::PackRef;
use url::{form_urlencoded, Url};

use crate::error::{StickerError, StickerResult};

/// Web form of a pack link, e.g. `https://signal.art/addstickers/#pack_id=...&pack_key=...`
pub const WEB_PREFIX: &str = "https://signal.art/addstickers/";
/// App scheme form of a pack link, e.g. `sgnl://addstickers/?pack_id=...&pack_key=...`
pub const APP_PREFIX: &str = "sgnl://addstickers/";

/// Whether `text` is a pack deep-link (by prefix only)
pub fn is_pack(text: &str) -> bool {
    text.starts_with(WEB_PREFIX) || text.starts_with(APP_PREFIX)
}

/// Extract `pack_id` and `pack_key` from the query string, or from the fragment
/// when the query is empty.
pub fn parse(url: &str) -> StickerResult<PackRef> {
    let malformed = || StickerError::MalformedPackUrl(url.to_string());

    let parsed = Url::parse(url.trim()).map_err(|_| malformed())?;
    let params = match parsed.query().filter(|query| !query.is_empty()) {
        Some(query) => query,
        None => parsed.fragment().unwrap_or_default(),
    };

    let mut pack_id = None;
    let mut pack_key = None;
    for (name, value) in form_urlencoded::parse(params.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        match name.as_ref() {
            "pack_id" => pack_id = Some(value.into_owned()),
            "pack_key" => pack_key = Some(value.into_owned()),
            _ => {}
        }
    }

    match (pack_id, pack_key) {
        (Some(id), Some(key)) => Ok(PackRef::new(id, key)),
        _ => Err(malformed()),
    }
}

/// Build the app-scheme deep-link of a pack
pub fn pack_url(pack: &PackRef) -> String {
    format!(
        "{}?pack_id={}&pack_key={}",
        APP_PREFIX,
        encode_param(&pack.id),
        encode_param(&pack.key)
    )
}

fn encode_param(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACK_ID: &str = "59d3387717104e38a67f838e7ad0208c";
    const PACK_KEY: &str = "56af35841874d6fe82fa2085e8e5ed74dba5d187af007d3b4d8a3711dd722ad7";

    #[test]
    fn test_is_pack() {
        assert!(is_pack("sgnl://addstickers/?pack_id=a&pack_key=b"));
        assert!(is_pack("https://signal.art/addstickers/#pack_id=a&pack_key=b"));
        assert!(is_pack("sgnl://addstickers/"));
        assert!(is_pack("https://signal.art/addstickers/whatever"));

        assert!(!is_pack(""));
        assert!(!is_pack("cat"));
        assert!(!is_pack("http://signal.art/addstickers/#pack_id=a&pack_key=b"));
        assert!(!is_pack(" sgnl://addstickers/?pack_id=a&pack_key=b"));
        assert!(!is_pack("https://signal.art/stickers/#pack_id=a&pack_key=b"));
    }

    #[test]
    fn test_parse_fragment_form() {
        let url = format!("{}#pack_id={}&pack_key={}", WEB_PREFIX, PACK_ID, PACK_KEY);
        assert_eq!(parse(&url).unwrap(), PackRef::new(PACK_ID, PACK_KEY));
    }

    #[test]
    fn test_parse_query_form() {
        let url = format!("{}?pack_key={}&pack_id={}", APP_PREFIX, PACK_KEY, PACK_ID);
        assert_eq!(parse(&url).unwrap(), PackRef::new(PACK_ID, PACK_KEY));
    }

    #[test]
    fn test_parse_prefers_query_over_fragment() {
        let url = "sgnl://addstickers/?pack_id=q1&pack_key=qk#pack_id=f1&pack_key=fk";
        assert_eq!(parse(url).unwrap(), PackRef::new("q1", "qk"));
    }

    #[test]
    fn test_parse_missing_fields() {
        for url in [
            "sgnl://addstickers/",
            "sgnl://addstickers/?pack_id=abc",
            "https://signal.art/addstickers/#pack_key=abc",
            "https://signal.art/addstickers/#pack_id=&pack_key=abc",
            "not a url",
        ] {
            match parse(url) {
                Err(StickerError::MalformedPackUrl(raw)) => assert_eq!(raw, url),
                other => panic!("expected MalformedPackUrl for {url}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_inverts_pack_url() {
        let pairs = [
            ("p1", "k1"),
            (PACK_ID, PACK_KEY),
            ("A-b_c.d~e", "0123456789abcdef"),
        ];
        for (id, key) in pairs {
            let pack = PackRef::new(id, key);
            let url = pack_url(&pack);
            assert!(is_pack(&url));
            assert_eq!(parse(&url).unwrap(), pack);
        }
    }

    #[test]
    fn test_pack_url_format() {
        assert_eq!(
            pack_url(&PackRef::new("p1", "k1")),
            "sgnl://addstickers/?pack_id=p1&pack_key=k1"
        );
    }
}
