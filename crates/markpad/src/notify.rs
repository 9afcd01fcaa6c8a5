use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A non-blocking user-facing message with severity-based auto-expiry.
#[derive(Debug, Clone)]
pub struct Notification {
    pub content: String,
    pub severity: Severity,
    created_at: Instant,
    auto_clear_duration: Option<Duration>,
}

impl Notification {
    pub fn new(content: String, severity: Severity, now: Instant) -> Self {
        let auto_clear_duration = Self::default_duration_for(severity);
        Self {
            content,
            severity,
            created_at: now,
            auto_clear_duration,
        }
    }

    pub fn permanent(content: String, severity: Severity, now: Instant) -> Self {
        Self {
            content,
            severity,
            created_at: now,
            auto_clear_duration: None,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self.auto_clear_duration {
            Some(duration) => now.duration_since(self.created_at) > duration,
            None => false,
        }
    }

    fn default_duration_for(severity: Severity) -> Option<Duration> {
        match severity {
            Severity::Info => Some(Duration::from_secs(3)),
            Severity::Success => Some(Duration::from_secs(2)),
            Severity::Warning => Some(Duration::from_secs(5)),
            Severity::Error => Some(Duration::from_secs(7)),
        }
    }
}

/// Holds the latest user-facing message; the host renders it however it
/// likes (status line, toast). Time is injected so expiry is testable.
#[derive(Default)]
pub struct Notifier {
    current: Option<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, content: String, now: Instant) {
        self.current = Some(Notification::new(content, Severity::Info, now));
    }

    pub fn success(&mut self, content: String, now: Instant) {
        self.current = Some(Notification::new(content, Severity::Success, now));
    }

    pub fn warning(&mut self, content: String, now: Instant) {
        self.current = Some(Notification::new(content, Severity::Warning, now));
    }

    pub fn error(&mut self, content: String, now: Instant) {
        self.current = Some(Notification::new(content, Severity::Error, now));
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Drop the current message once its lifetime has elapsed.
    pub fn update(&mut self, now: Instant) {
        if let Some(ref message) = self.current {
            if message.is_expired(now) {
                self.current = None;
            }
        }
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    pub fn has_message(&self) -> bool {
        self.current.is_some()
    }
}
