//! Best-effort denylist sanitization for rendered preview HTML.
//!
//! This strips executable content (`<script>` elements and inline `on*=`
//! event-handler attributes) and leaves every other byte of the input
//! untouched. It is an XSS mitigation for a local preview surface, not a
//! sandboxing guarantee: in particular, `javascript:` URLs in `href`/`src`
//! attributes pass through unchanged.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCRIPT_ELEMENT: Regex = Regex::new(r"(?is)<script\b.*?</script\s*>")
        .expect("Invalid SCRIPT_ELEMENT regex pattern");
    static ref EVENT_HANDLER_QUOTED: Regex = Regex::new(r#"(?i)on\w+\s*=\s*["'][^"']*["']"#)
        .expect("Invalid EVENT_HANDLER_QUOTED regex pattern");
    static ref EVENT_HANDLER_BARE: Regex = Regex::new(r"(?i)on\w+\s*=\s*[^\s>]*")
        .expect("Invalid EVENT_HANDLER_BARE regex pattern");
}

/// Remove script elements (with their content) and inline event-handler
/// attributes, quoted or bare. All other markup is preserved verbatim.
pub fn sanitize_html(html: &str) -> String {
    let html = SCRIPT_ELEMENT.replace_all(html, "");
    let html = EVENT_HANDLER_QUOTED.replace_all(&html, "");
    EVENT_HANDLER_BARE.replace_all(&html, "").into_owned()
}
