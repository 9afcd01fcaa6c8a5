use anyhow::Result;
use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

/// Fixed view shown for whitespace-only content; the renderer is not
/// invoked for it.
pub const PLACEHOLDER_HTML: &str = "<div class=\"preview-placeholder\">\
<h1>Welcome to Markpad</h1>\
<p>Start typing in the editor to see your content rendered here.</p>\
</div>";

/// View shown when the external renderer fails; carries the escaped reason.
pub fn fault_html(reason: &str) -> String {
    format!(
        "<div class=\"preview-fault\"><h3>Preview Error</h3><p>{}</p></div>",
        escape_text(reason)
    )
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// The external markdown renderer. May fail; failures are contained at the
/// job boundary and never reach the caller of the scheduling API.
pub trait Renderer {
    fn render(&mut self, text: &str) -> Result<String>;
}

impl<F> Renderer for F
where
    F: FnMut(&str) -> Result<String>,
{
    fn render(&mut self, text: &str) -> Result<String> {
        self(text)
    }
}

/// Post-render HTML filter applied before anything is published.
pub trait Sanitizer {
    fn sanitize(&self, html: &str) -> String;
}

impl<F> Sanitizer for F
where
    F: Fn(&str) -> String,
{
    fn sanitize(&self, html: &str) -> String {
        self(html)
    }
}

/// Display surface that accepts the published HTML.
pub trait PreviewSurface {
    fn publish(&mut self, html: &str);
}

/// Decorator invoked with freshly published HTML (outline rebuild and the
/// like). Hook errors are logged and never fail the render pipeline.
pub trait RenderHook {
    fn on_publish(&mut self, html: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Rendered,
    Faulted,
}

/// One render pass: the exact text captured when the debounce fired, plus a
/// monotonically increasing sequence number that decides publish precedence.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub seq: u64,
    pub text: String,
    pub state: JobState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Whitespace-only content; show the fixed placeholder.
    Placeholder,
    /// Sanitized HTML ready for display.
    Rendered(String),
    /// Renderer failure with a human-readable reason.
    Faulted(String),
}

/// Debounce timer plus publish-ordering state.
///
/// `request` has start-or-replace semantics: a burst of requests collapses
/// into a single job, fired `delay` after the last request. Completed jobs
/// are accepted in sequence order only — a slow older render arriving after
/// a newer one is discarded, which is also the cancellation substitute for
/// in-flight external render calls.
pub struct RenderScheduler {
    delay: Duration,
    deadline: Option<Instant>,
    next_seq: u64,
    newest_done: Option<u64>,
}

impl RenderScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            next_seq: 1,
            newest_done: None,
        }
    }

    /// Arm (or re-arm) the debounce deadline.
    pub fn request(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Arm the deadline at `now`, bypassing the debounce delay. Used for
    /// undo/redo restores; the job still flows through the normal
    /// take/complete path and the sequence guard.
    pub fn request_immediate(&mut self, now: Instant) {
        self.deadline = Some(now);
    }

    pub fn has_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// When the deadline is due: disarm it, allocate the next sequence
    /// number and capture `text` as the job snapshot.
    pub fn take_job(&mut self, now: Instant, text: String) -> Option<RenderJob> {
        if !self.is_due(now) {
            return None;
        }
        self.deadline = None;
        let seq = self.next_seq;
        self.next_seq += 1;
        Some(RenderJob {
            seq,
            text,
            state: JobState::Pending,
        })
    }

    /// Record a completed job. Returns false when a newer sequence already
    /// completed, in which case the result must be discarded unpublished.
    pub fn accept(&mut self, seq: u64) -> bool {
        if self.newest_done.is_some_and(|newest| seq <= newest) {
            return false;
        }
        self.newest_done = Some(seq);
        true
    }

    pub fn newest_completed(&self) -> Option<u64> {
        self.newest_done
    }
}

/// Run one job through the renderer and sanitizer. Renderer failures are
/// caught here and become a faulted outcome; they never propagate.
pub fn execute(
    job: &mut RenderJob,
    renderer: &mut dyn Renderer,
    sanitizer: &dyn Sanitizer,
) -> RenderOutcome {
    if job.text.trim().is_empty() {
        job.state = JobState::Rendered;
        return RenderOutcome::Placeholder;
    }
    match renderer.render(&job.text) {
        Ok(html) => {
            job.state = JobState::Rendered;
            RenderOutcome::Rendered(sanitizer.sanitize(&html))
        }
        Err(e) => {
            log::error!("Preview render error: {}", e);
            job.state = JobState::Faulted;
            RenderOutcome::Faulted(e.to_string())
        }
    }
}
