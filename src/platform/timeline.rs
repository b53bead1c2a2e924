//! Performance-entry timeline: the subscription interface vitals are read from

use tokio::sync::mpsc;

/// A performance entry as delivered by the host's timeline
#[derive(Debug, Clone, PartialEq)]
pub enum PerformanceEntry {
    /// `largest-contentful-paint`; later entries supersede earlier ones
    LargestContentfulPaint { start_time: f64 },
    /// `first-input`
    FirstInput { start_time: f64, processing_start: f64 },
    /// `layout-shift`
    LayoutShift { value: f64, had_recent_input: bool },
    /// `paint`, e.g. `first-paint` or `first-contentful-paint`
    Paint { name: String, start_time: f64 },
}

/// Receiving half of a timeline subscription
pub type EntryStream = mpsc::UnboundedReceiver<PerformanceEntry>;

/// Host-side handle used to push entries into a subscription.
#[derive(Debug, Clone)]
pub struct TimelineFeed {
    tx: mpsc::UnboundedSender<PerformanceEntry>,
}

impl TimelineFeed {
    /// Create a feed and the stream its entries are delivered on.
    pub fn channel() -> (Self, EntryStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Push an entry. Returns `false` once the observer has gone away.
    pub fn push(&self, entry: PerformanceEntry) -> bool {
        self.tx.send(entry).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
