use comrak::{markdown_to_html, ComrakOptions};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EXTERNAL_LINK: Regex = Regex::new(r#"<a href="(https?://[^"]*)">"#)
        .expect("Invalid EXTERNAL_LINK regex pattern");
}

/// Convert markdown source to HTML.
///
/// Raw HTML in the source is passed through unchanged; display surfaces are
/// expected to run the result through [`crate::sanitize::sanitize_html`]
/// before trusting it.
pub fn to_html(src: &str) -> String {
    let opt = create_comrak_options();
    markdown_to_html(src, &opt)
}

/// Make absolute links open in a new tab without leaking the opener.
/// Relative links are left for the host to resolve.
pub fn patch_external_links(html: &str) -> String {
    EXTERNAL_LINK
        .replace_all(
            html,
            r#"<a href="$1" target="_blank" rel="noopener noreferrer">"#,
        )
        .into_owned()
}

fn create_comrak_options() -> ComrakOptions<'static> {
    let mut opt = ComrakOptions::default();

    // Extension options (GFM)
    opt.extension.strikethrough = true;
    opt.extension.table = true;
    opt.extension.autolink = true;
    opt.extension.tasklist = true;
    opt.extension.footnotes = true;

    // Parse options
    opt.parse.smart = true;

    // Render options
    opt.render.hardbreaks = true;
    // Raw HTML survives rendering; the denylist sanitizer is the trust
    // boundary before display.
    opt.render.unsafe_ = true;
    opt.render.escape = false;

    opt
}
