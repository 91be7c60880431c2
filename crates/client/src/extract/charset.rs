//! Character set detection for page bodies.
//!
//! Order of precedence: byte order mark, `charset` parameter of the
//! Content-Type header, `<meta charset>` (or `http-equiv`) in the first
//! kilobyte of the body, then UTF-8.

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;

/// How far into the body a `<meta>` charset declaration is looked for.
const SNIFF_LEN: usize = 1024;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta\s[^>]*?charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#).expect("invalid meta charset pattern")
});

/// Encoding named by the `charset` parameter of a Content-Type value.
pub fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        Encoding::for_label(value.trim().trim_matches(['"', '\'']).as_bytes())
    })
}

/// Encoding declared by a `<meta>` tag near the start of `body`.
///
/// A declared UTF-16 cannot be right for a document whose markup was just
/// read as ASCII, so it maps to UTF-8.
pub fn sniff_meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(SNIFF_LEN)];
    let label = META_CHARSET.captures(head)?.get(1)?;
    Encoding::for_label(label.as_bytes()).map(Encoding::output_encoding)
}

/// Decode a page body to text.
///
/// Undecodable sequences become U+FFFD; decoding itself never fails.
pub fn decode_html(body: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type.and_then(charset_from_content_type);
    let encoding = declared.or_else(|| sniff_meta_charset(body)).unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(body);
    tracing::debug!(encoding = used.name(), had_errors, "decoded page body");
    text.into_owned()
}
