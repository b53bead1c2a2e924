//! Page console channel and the interception point used for error sampling

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Severity of a console message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Debug,
    Log,
    Info,
    Warn,
    Error,
}

/// Console message emitted by the page (or on its behalf, e.g. failed loads)
#[derive(Debug, Clone)]
pub struct ConsoleMessage {
    pub level: ConsoleLevel,
    /// Textual content of the message
    pub text: String,
    /// Optional source URL the message refers to
    pub source: Option<String>,
}

impl ConsoleMessage {
    pub fn new(level: ConsoleLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            source: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(ConsoleLevel::Error, text)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Receiver of console messages
pub type ConsoleSink = Arc<dyn Fn(&ConsoleMessage) + Send + Sync>;

/// A temporarily wrappable error-logging channel.
///
/// Implementors swap their current sink for one that counts error-level
/// messages and then forwards them to the original sink, and put the original
/// back on [`restore`](LogInterceptor::restore).
pub trait LogInterceptor: Send + Sync {
    /// Install the counting wrapper and return the sink it replaced.
    fn intercept_errors(&self, counter: Arc<AtomicUsize>) -> ConsoleSink;

    /// Reinstate a sink previously returned by `intercept_errors`.
    fn restore(&self, original: ConsoleSink);
}

/// Shared console channel for one page.
///
/// Clones share the same sink slot, so a clone handed to a background task
/// sees interceptions installed through any other clone.
#[derive(Clone)]
pub struct ConsoleChannel {
    sink: Arc<RwLock<ConsoleSink>>,
}

impl ConsoleChannel {
    pub fn new(sink: ConsoleSink) -> Self {
        Self {
            sink: Arc::new(RwLock::new(sink)),
        }
    }

    /// A channel whose sink forwards page messages to the `log` facade.
    pub fn logging() -> Self {
        Self::new(Arc::new(|msg: &ConsoleMessage| {
            let source = msg.source.as_deref().unwrap_or("-");
            match msg.level {
                ConsoleLevel::Error => log::error!(target: "page_console", "{} ({})", msg.text, source),
                ConsoleLevel::Warn => log::warn!(target: "page_console", "{} ({})", msg.text, source),
                ConsoleLevel::Info | ConsoleLevel::Log => {
                    log::info!(target: "page_console", "{} ({})", msg.text, source)
                }
                ConsoleLevel::Debug => log::debug!(target: "page_console", "{} ({})", msg.text, source),
            }
        }))
    }

    /// Deliver a message to whatever sink is currently installed.
    pub fn emit(&self, msg: &ConsoleMessage) {
        // Clone out of the lock so a sink may emit again without deadlocking.
        let sink = self.current();
        sink(msg);
    }

    /// The currently installed sink
    pub fn current(&self) -> ConsoleSink {
        self.sink.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn replace(&self, sink: ConsoleSink) -> ConsoleSink {
        let mut slot = self.sink.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *slot, sink)
    }
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::logging()
    }
}

impl std::fmt::Debug for ConsoleChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleChannel").finish_non_exhaustive()
    }
}

impl LogInterceptor for ConsoleChannel {
    fn intercept_errors(&self, counter: Arc<AtomicUsize>) -> ConsoleSink {
        let original = self.current();
        let forward = original.clone();
        let wrapper: ConsoleSink = Arc::new(move |msg: &ConsoleMessage| {
            if msg.level == ConsoleLevel::Error {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            forward(msg);
        });
        self.replace(wrapper);
        original
    }

    fn restore(&self, original: ConsoleSink) {
        self.replace(original);
    }
}
