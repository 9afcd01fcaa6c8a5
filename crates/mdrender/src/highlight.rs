use lazy_static::lazy_static;
use regex::{Captures, Regex};
use syntect::html::{ClassedHTMLGenerator, ClassStyle};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

lazy_static! {
    static ref CODE_BLOCK: Regex =
        Regex::new(r#"(?s)<pre><code class="language-([^"]+)">(.*?)</code></pre>"#)
            .expect("Invalid CODE_BLOCK regex pattern");
}

/// Syntax highlighting for fenced code blocks in rendered HTML.
///
/// Highlighting is strictly optional decoration: an unknown language hint or
/// a highlighting failure leaves the code block exactly as the renderer
/// produced it.
pub struct CodeHighlighter {
    syntax_set: SyntaxSet,
}

impl CodeHighlighter {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
        }
    }

    /// Highlight a single code fragment. Returns `None` when the language
    /// hint is unknown or highlighting fails; callers fall back to the
    /// original code.
    pub fn highlight(&self, code: &str, lang: &str) -> Option<String> {
        let syntax = self.syntax_set.find_syntax_by_token(lang)?;
        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            &self.syntax_set,
            ClassStyle::Spaced,
        );
        for line in LinesWithEndings::from(code) {
            if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
                log::warn!("Syntax highlighting failed for language '{}': {}", lang, e);
                return None;
            }
        }
        Some(generator.finalize())
    }

    /// Rewrite every `<pre><code class="language-...">` block in `html`,
    /// leaving blocks with unknown languages untouched.
    pub fn highlight_code_blocks(&self, html: &str) -> String {
        CODE_BLOCK
            .replace_all(html, |caps: &Captures| {
                let lang = &caps[1];
                let code = unescape_html(&caps[2]);
                match self.highlight(&code, lang) {
                    Some(highlighted) => format!(
                        r#"<pre><code class="language-{}">{}</code></pre>"#,
                        lang, highlighted
                    ),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl Default for CodeHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_known_language() {
        let highlighter = CodeHighlighter::new();
        let html = highlighter.highlight("let x = 1;", "rs");
        let html = html.expect("rust should be a known syntax");
        assert!(html.contains("<span"));
        assert!(html.contains("class="));
    }

    #[test]
    fn test_unknown_language_degrades() {
        let highlighter = CodeHighlighter::new();
        assert!(highlighter.highlight("whatever", "no-such-language").is_none());
    }

    #[test]
    fn test_patch_pass_rewrites_known_blocks() {
        let highlighter = CodeHighlighter::new();
        let html = r#"<p>intro</p><pre><code class="language-rs">let x = 1;</code></pre>"#;
        let patched = highlighter.highlight_code_blocks(html);
        assert!(patched.starts_with("<p>intro</p>"));
        assert!(patched.contains(r#"<code class="language-rs">"#));
        assert!(patched.contains("<span"));
    }

    #[test]
    fn test_patch_pass_leaves_unknown_blocks() {
        let highlighter = CodeHighlighter::new();
        let html = r#"<pre><code class="language-zzz">plain text</code></pre>"#;
        assert_eq!(highlighter.highlight_code_blocks(html), html);
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape_html("&lt;a&gt; &amp;&amp; &quot;b&quot;"), "<a> && \"b\"");
    }
}
