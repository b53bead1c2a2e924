//! Host capabilities consumed by the scorer: document access, console
//! interception and the performance-entry timeline.
//!
//! The scorer never touches a live document directly. Hosts hand it a
//! [`PageInspector`] and a [`LogInterceptor`], which keeps scoring
//! deterministic under test.

pub mod console;
pub mod timeline;

pub use console::{ConsoleChannel, ConsoleLevel, ConsoleMessage, ConsoleSink, LogInterceptor};
pub use timeline::{EntryStream, PerformanceEntry, TimelineFeed};

use crate::signals::PageSignals;

/// Read access to the document being scored.
pub trait PageInspector: Send + Sync {
    /// Snapshot the document facts used for scoring.
    ///
    /// `elapsed_ms` is measured at call time; `console_errors` is left at zero
    /// and filled in by the scorer.
    fn snapshot(&self) -> PageSignals;
}

/// A fixed snapshot is its own inspector.
impl PageInspector for PageSignals {
    fn snapshot(&self) -> PageSignals {
        PageSignals {
            console_errors: 0,
            ..self.clone()
        }
    }
}
