//! The page heuristic scorer.
//!
//! A fixed point rubric over [`PageSignals`]:
//!
//! | category       | rule                                                          |
//! |----------------|---------------------------------------------------------------|
//! | SEO            | title 20, description 20, viewport 15, canonical 15, >10 meta 10, JSON-LD 20 |
//! | accessibility  | alt coverage x 40 (no images = 40), main 20, nav 20, h1 20    |
//! | performance    | 100, minus 30/20/10 past 3s/2s/1s elapsed, minus 5 per image over 800x600 |
//! | best practices | 100, minus 30 without https, minus 10 per console error in the sampling window |
//!
//! Nothing here fails: a missing feature just contributes nothing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::platform::{ConsoleSink, LogInterceptor, PageInspector};
use crate::signals::PageSignals;
use crate::vitals::VitalsSet;
use crate::ScoreSet;

/// Default console sampling window
pub const DEFAULT_SAMPLE_WINDOW: Duration = Duration::from_millis(1000);

const ALT_TEXT_POINTS: f64 = 40.0;
const META_TAG_THRESHOLD: usize = 10;
const OVERSIZED_IMAGE_PENALTY: i64 = 5;
const INSECURE_PENALTY: i64 = 30;
const CONSOLE_ERROR_PENALTY: i64 = 10;

/// Result of one scoring pass
#[derive(Debug, Clone)]
pub struct Analysis {
    pub scores: ScoreSet,
    /// Vitals observed so far; frequently all zero when scoring finishes
    pub vitals: VitalsSet,
    /// The snapshot the scores were computed from, error count included
    pub signals: PageSignals,
}

/// Runs scoring passes against injected page capabilities.
#[derive(Debug, Clone)]
pub struct Scorer {
    sample_window: Duration,
    vitals: Option<watch::Receiver<VitalsSet>>,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_WINDOW)
    }
}

impl Scorer {
    pub fn new(sample_window: Duration) -> Self {
        Self {
            sample_window,
            vitals: None,
        }
    }

    /// Attach a vitals feed; each pass copies whatever it holds at the end.
    pub fn with_vitals(mut self, vitals: watch::Receiver<VitalsSet>) -> Self {
        self.vitals = Some(vitals);
        self
    }

    pub fn sample_window(&self) -> Duration {
        self.sample_window
    }

    /// Snapshot the page, sample console errors for the configured window and
    /// score the result.
    pub async fn analyze<P, L>(&self, inspector: &P, interceptor: &L) -> Analysis
    where
        P: PageInspector + ?Sized,
        L: LogInterceptor + ?Sized,
    {
        self.analyze_with(inspector, interceptor, || {}).await
    }

    /// Like [`analyze`](Self::analyze), calling `on_window_open` once the
    /// interception is installed and before the window starts elapsing.
    /// Anything started from the hook that emits errors is counted from its
    /// first message.
    pub async fn analyze_with<P, L, F>(&self, inspector: &P, interceptor: &L, on_window_open: F) -> Analysis
    where
        P: PageInspector + ?Sized,
        L: LogInterceptor + ?Sized,
        F: FnOnce(),
    {
        let mut signals = inspector.snapshot();
        signals.console_errors = self.sample_console_errors(interceptor, on_window_open).await;

        let scores = score(&signals);
        let vitals = self
            .vitals
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or_default();

        log::debug!(
            "scored page: seo={} accessibility={} performance={} best_practices={} overall={} (errors={}, elapsed={:.0}ms)",
            scores.seo(),
            scores.accessibility(),
            scores.performance(),
            scores.best_practices(),
            scores.overall(),
            signals.console_errors,
            signals.elapsed_ms,
        );

        Analysis {
            scores,
            vitals,
            signals,
        }
    }

    async fn sample_console_errors<L, F>(&self, interceptor: &L, on_window_open: F) -> usize
    where
        L: LogInterceptor + ?Sized,
        F: FnOnce(),
    {
        let counter = Arc::new(AtomicUsize::new(0));
        let guard = Interception::install(interceptor, counter.clone());
        on_window_open();
        tokio::time::sleep(self.sample_window).await;
        drop(guard);
        counter.load(Ordering::SeqCst)
    }
}

/// Holds an error interception open; restores the original sink on drop, so
/// the channel is put back even if the scoring future is cancelled.
struct Interception<'a, L: LogInterceptor + ?Sized> {
    target: &'a L,
    original: Option<ConsoleSink>,
}

impl<'a, L: LogInterceptor + ?Sized> Interception<'a, L> {
    fn install(target: &'a L, counter: Arc<AtomicUsize>) -> Self {
        let original = target.intercept_errors(counter);
        Self {
            target,
            original: Some(original),
        }
    }
}

impl<L: LogInterceptor + ?Sized> Drop for Interception<'_, L> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            self.target.restore(original);
        }
    }
}

/// Score a snapshot. Pure; `signals.console_errors` is taken as given.
pub fn score(signals: &PageSignals) -> ScoreSet {
    ScoreSet::new(
        seo_score(signals),
        accessibility_score(signals),
        performance_score(signals),
        best_practices_score(signals),
    )
}

pub fn seo_score(signals: &PageSignals) -> i64 {
    let mut score = 0;
    if signals.has_title {
        score += 20;
    }
    if signals.has_meta_description {
        score += 20;
    }
    if signals.has_viewport {
        score += 15;
    }
    if signals.has_canonical {
        score += 15;
    }
    if signals.meta_tag_count > META_TAG_THRESHOLD {
        score += 10;
    }
    if signals.has_structured_data {
        score += 20;
    }
    score.min(100)
}

/// Alt-text points: coverage ratio times 40, full marks when there are no images.
pub fn alt_text_points(signals: &PageSignals) -> f64 {
    if signals.images.is_empty() {
        return ALT_TEXT_POINTS;
    }
    signals.images_with_alt() as f64 / signals.images.len() as f64 * ALT_TEXT_POINTS
}

pub fn accessibility_score(signals: &PageSignals) -> i64 {
    let mut score = alt_text_points(signals);
    for present in [signals.has_main, signals.has_nav, signals.has_h1] {
        if present {
            score += 20.0;
        }
    }
    (score.round() as i64).min(100)
}

pub fn performance_score(signals: &PageSignals) -> i64 {
    let mut score = 100;
    if signals.elapsed_ms > 3000.0 {
        score -= 30;
    } else if signals.elapsed_ms > 2000.0 {
        score -= 20;
    } else if signals.elapsed_ms > 1000.0 {
        score -= 10;
    }
    score -= signals.oversized_images() as i64 * OVERSIZED_IMAGE_PENALTY;
    score.max(0)
}

pub fn best_practices_score(signals: &PageSignals) -> i64 {
    let mut score = 100;
    // A secure page earns nothing extra.
    if !signals.secure {
        score -= INSECURE_PENALTY;
    }
    score -= signals.console_errors as i64 * CONSOLE_ERROR_PENALTY;
    score.max(0)
}
