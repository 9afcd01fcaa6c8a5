use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::highlight::unescape_html;

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"(?is)<h([1-6])\b([^>]*)>(.*?)</h[1-6]>")
        .expect("Invalid HEADING regex pattern");
    static ref ID_ATTR: Regex =
        Regex::new(r#"(?i)id\s*=\s*"([^"]*)""#).expect("Invalid ID_ATTR regex pattern");
    static ref INNER_TAG: Regex = Regex::new(r"<[^>]+>").expect("Invalid INNER_TAG regex pattern");
}

/// One document heading, as shown in the navigation outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub id: String,
    pub text: String,
}

/// Extract the heading outline from rendered HTML, in document order.
/// Headings without an `id` attribute get a positional `heading-N` id.
pub fn extract(html: &str) -> Vec<Heading> {
    HEADING
        .captures_iter(html)
        .enumerate()
        .map(|(index, caps)| {
            let level: u8 = caps[1].parse().unwrap_or(1);
            let id = ID_ATTR
                .captures(&caps[2])
                .map(|id| id[1].to_string())
                .unwrap_or_else(|| format!("heading-{}", index));
            let text = unescape_html(&INNER_TAG.replace_all(&caps[3], ""))
                .trim()
                .to_string();
            Heading { level, id, text }
        })
        .collect()
}
