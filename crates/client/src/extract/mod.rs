//! Page title extraction.
//!
//! Origin pages are uncontrolled input, so parsing is html5ever's
//! error-recovering tree builder via scraper. Extraction never fails: a
//! page without a usable title yields an empty string.

pub mod charset;

use scraper::{Html, Selector};

pub use charset::decode_html;

/// Pulls the title out of a page body.
pub trait TitleExtractor: Send + Sync {
    /// Trimmed text of the first `<title>` element, or `""` if there is none.
    ///
    /// `content_type` is the response header, consulted for a charset.
    fn extract(&self, body: &[u8], content_type: Option<&str>) -> String;
}

/// scraper-based title extractor.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlTitleExtractor;

impl HtmlTitleExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TitleExtractor for HtmlTitleExtractor {
    fn extract(&self, body: &[u8], content_type: Option<&str>) -> String {
        extract_title(&decode_html(body, content_type))
    }
}

/// Extract the trimmed title of an HTML document.
pub fn extract_title(html: &str) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    let document = Html::parse_document(html);

    match document.select(&selector).next() {
        Some(element) => {
            tracing::debug!("page has a title");
            element.text().collect::<String>().trim().to_string()
        }
        None => {
            tracing::debug!("page has no title");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_trims_whitespace() {
        assert_eq!(extract_title("<html><title> Example </title></html>"), "Example");
    }

    #[test]
    fn test_extract_from_head() {
        let html = r#"
            <!DOCTYPE html>
            <html>
            <head>
                <meta charset="utf-8">
                <title>Test Article</title>
            </head>
            <body><h1>Heading</h1></body>
            </html>
        "#;
        assert_eq!(extract_title(html), "Test Article");
    }

    #[test]
    fn test_extract_first_title_wins() {
        let html = "<title>First</title><body><svg><title>Second</title></svg></body>";
        assert_eq!(extract_title(html), "First");
    }

    #[test]
    fn test_extract_decodes_entities() {
        assert_eq!(extract_title("<title>Fish &amp; Chips</title>"), "Fish & Chips");
    }

    #[test]
    fn test_extract_missing_title() {
        assert_eq!(extract_title("<html><body><p>no title here</p></body></html>"), "");
    }

    #[test]
    fn test_extract_empty_document() {
        assert_eq!(extract_title(""), "");
        assert_eq!(extract_title("not really html"), "");
    }

    #[test]
    fn test_extract_unclosed_markup() {
        assert_eq!(extract_title("<html><head><title>Unclosed"), "Unclosed");
        assert_eq!(extract_title("<div><p>stray<title>In Body</title><p>more"), "In Body");
    }

    #[test]
    fn test_extract_whitespace_only_title() {
        assert_eq!(extract_title("<title>   \n\t </title>"), "");
    }

    #[test]
    fn test_extractor_tolerates_invalid_utf8() {
        let title = HtmlTitleExtractor::new().extract(b"<title>Caf\xE9</title>", None);
        assert_eq!(title, "Caf\u{FFFD}");
    }

    #[test]
    fn test_extractor_honours_meta_charset() {
        let html = b"<html><head><meta charset=\"iso-8859-1\"><title>Caf\xE9</title></head></html>";
        assert_eq!(HtmlTitleExtractor::new().extract(html, None), "Café");
    }

    #[test]
    fn test_extractor_honours_header_charset() {
        // GBK bytes for the two characters below
        let html = b"<title>\xD6\xD0\xCE\xC4</title>";
        let title = HtmlTitleExtractor::new().extract(html, Some("text/html; charset=gbk"));
        assert_eq!(title, "中文");
    }
}
