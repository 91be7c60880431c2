//! Content-Encoding handling for origin bodies.

use std::io::Read;

use flate2::read::GzDecoder;
use pagetitle_core::Error;
use reqwest::header::{self, HeaderMap};

/// Whether the response declares a gzip body.
pub fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "gzip")
}

/// Inflate a gzip body, keeping at most `limit` decoded bytes.
///
/// Bodies cut short by truncation decode to whatever inflated before the
/// cut. Only a stream that yields nothing at all is an error.
pub fn gunzip(body: &[u8], limit: usize) -> Result<Vec<u8>, Error> {
    let mut decoder = GzDecoder::new(body).take(limit as u64);
    let mut out = Vec::with_capacity(body.len().saturating_mul(4).min(limit));

    match decoder.read_to_end(&mut out) {
        Ok(_) => {
            if out.len() == limit {
                tracing::debug!(limit, "decoded body hit the byte limit; keeping prefix");
            }
            Ok(out)
        }
        Err(e) if !out.is_empty() => {
            tracing::debug!(error = %e, decoded = out.len(), "gzip stream ended early; keeping partial body");
            Ok(out)
        }
        Err(e) => Err(Error::Decode(format!("gzip: {e}"))),
    }
}

/// Body bytes with any gzip encoding removed, at most `limit` of them.
pub fn decode_body(headers: &HeaderMap, body: &[u8], limit: usize) -> Result<Vec<u8>, Error> {
    if is_gzip(headers) {
        tracing::debug!("body is gzipped");
        gunzip(body, limit)
    } else {
        tracing::debug!("body is not gzipped");
        Ok(body[..body.len().min(limit)].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::GzEncoder};
    use reqwest::header::HeaderValue;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn gzip_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        headers
    }

    #[test]
    fn test_is_gzip() {
        assert!(is_gzip(&gzip_headers()));
        assert!(!is_gzip(&HeaderMap::new()));

        let mut br = HeaderMap::new();
        br.insert(header::CONTENT_ENCODING, HeaderValue::from_static("br"));
        assert!(!is_gzip(&br));
    }

    #[test]
    fn test_decode_gzip_body() {
        let html = b"<html><title>Zipped</title></html>";
        let decoded = decode_body(&gzip_headers(), &gzip(html), 1024).unwrap();
        assert_eq!(decoded, html);
    }

    #[test]
    fn test_decode_plain_body_untouched() {
        let html = b"<html><title>Plain</title></html>";
        let decoded = decode_body(&HeaderMap::new(), html, 1024).unwrap();
        assert_eq!(decoded, html);
    }

    #[test]
    fn test_truncated_gzip_keeps_prefix() {
        let mut html = b"<html><head><title>Long</title></head><body>".to_vec();
        for i in 0..20_000u32 {
            html.extend_from_slice(format!("<p>{}</p>", i.wrapping_mul(2_654_435_761)).as_bytes());
        }
        let zipped = gzip(&html);
        let cut = &zipped[..zipped.len() / 2];

        let decoded = gunzip(cut, usize::MAX).unwrap();
        assert!(decoded.starts_with(b"<html><head><title>Long</title>"));
        assert!(decoded.len() < html.len());
    }

    #[test]
    fn test_garbage_gzip_is_error() {
        let result = gunzip(b"definitely not gzip", 1024);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_inflated_body_capped_at_limit() {
        // A few KB of zeros inflates to 8 MiB.
        let bomb = gzip(&vec![0u8; 8 * 1024 * 1024]);
        assert!(bomb.len() < 64 * 1024);

        let decoded = decode_body(&gzip_headers(), &bomb, 4096).unwrap();
        assert_eq!(decoded.len(), 4096);
        assert!(decoded.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_plain_body_capped_at_limit() {
        let decoded = decode_body(&HeaderMap::new(), &[b'x'; 100], 10).unwrap();
        assert_eq!(decoded, b"xxxxxxxxxx");
    }
}
