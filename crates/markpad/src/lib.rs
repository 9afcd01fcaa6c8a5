// Markpad library exports

pub mod autosave;
pub mod buffer;
pub mod clock;
pub mod history;
pub mod notify;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod stats;
pub mod store;

pub use buffer::{StringBuffer, TextBuffer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use history::{HistoryLog, HistoryManager};
pub use notify::{Notification, Notifier, Severity};
pub use render::{DenylistSanitizer, MarkdownRenderer, SharedOutline};
pub use scheduler::{
    PreviewSurface, RenderHook, RenderJob, RenderOutcome, RenderScheduler, Renderer, Sanitizer,
};
pub use session::{markdown_session, EditSession, SessionDeps, SessionOptions};
pub use state::SessionState;
pub use stats::DocumentStats;
pub use store::{JsonFileStore, MemoryStore, SnapshotStore};
