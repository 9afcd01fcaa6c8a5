use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;

use mdrender::highlight::CodeHighlighter;
use mdrender::outline::Heading;

use crate::scheduler::{RenderHook, Renderer, Sanitizer};

/// Default renderer: comrak markdown conversion, external-link decoration
/// and (optionally) syntect code-block highlighting.
pub struct MarkdownRenderer {
    highlighter: Option<CodeHighlighter>,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self { highlighter: None }
    }

    pub fn with_highlighting() -> Self {
        Self {
            highlighter: Some(CodeHighlighter::new()),
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&mut self, text: &str) -> Result<String> {
        let html = mdrender::to_html(text);
        let html = mdrender::markdown::patch_external_links(&html);
        Ok(match &self.highlighter {
            Some(highlighter) => highlighter.highlight_code_blocks(&html),
            None => html,
        })
    }
}

/// Default sanitizer: the mdrender denylist filter.
pub struct DenylistSanitizer;

impl Sanitizer for DenylistSanitizer {
    fn sanitize(&self, html: &str) -> String {
        mdrender::sanitize_html(html)
    }
}

/// Render hook that rebuilds the heading outline after every successful
/// publish. Clone a handle before handing the hook to the session to keep
/// reading the outline afterwards.
#[derive(Clone, Default)]
pub struct SharedOutline {
    headings: Rc<RefCell<Vec<Heading>>>,
}

impl SharedOutline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headings(&self) -> Vec<Heading> {
        self.headings.borrow().clone()
    }
}

impl RenderHook for SharedOutline {
    fn on_publish(&mut self, html: &str) -> Result<()> {
        *self.headings.borrow_mut() = mdrender::outline::extract(html);
        Ok(())
    }
}
