//! Core Web Vitals: the measurement set and the observer that fills it in
//! from a performance-entry stream.
//!
//! Vitals arrive out of band. A scoring pass returns whatever has been seen
//! so far (often nothing), and the observer keeps publishing updates on a
//! watch channel for the caller to merge into its last-known report.

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::platform::{EntryStream, PerformanceEntry};

/// Paint entry name that carries first-contentful-paint
const FIRST_CONTENTFUL_PAINT: &str = "first-contentful-paint";

/// Web-vital measurements. Zero means "not yet observed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsSet {
    /// Largest contentful paint, ms
    pub largest_contentful_paint: f64,
    /// First input delay, ms
    pub first_input_delay: f64,
    /// Cumulative layout shift (unitless)
    pub cumulative_layout_shift: f64,
    /// First contentful paint, ms
    pub first_contentful_paint: f64,
}

impl VitalsSet {
    /// Fold one timeline entry into the set.
    pub fn record(&mut self, entry: &PerformanceEntry) {
        match entry {
            PerformanceEntry::LargestContentfulPaint { start_time } => {
                self.largest_contentful_paint = *start_time;
            }
            PerformanceEntry::FirstInput {
                start_time,
                processing_start,
            } => {
                self.first_input_delay = (processing_start - start_time).max(0.0);
            }
            PerformanceEntry::LayoutShift {
                value,
                had_recent_input,
            } => {
                if !had_recent_input {
                    self.cumulative_layout_shift += value;
                }
            }
            PerformanceEntry::Paint { name, start_time } => {
                if name == FIRST_CONTENTFUL_PAINT {
                    self.first_contentful_paint = *start_time;
                }
            }
        }
    }

    /// Overlay every observed (non-zero) value from `other`.
    pub fn merge(&mut self, other: &VitalsSet) {
        fn take(slot: &mut f64, value: f64) {
            if value != 0.0 {
                *slot = value;
            }
        }
        take(&mut self.largest_contentful_paint, other.largest_contentful_paint);
        take(&mut self.first_input_delay, other.first_input_delay);
        take(&mut self.cumulative_layout_shift, other.cumulative_layout_shift);
        take(&mut self.first_contentful_paint, other.first_contentful_paint);
    }

    pub fn is_empty(&self) -> bool {
        *self == VitalsSet::default()
    }
}

/// Spawn a task that folds `entries` into a [`VitalsSet`] and publishes each
/// update. The task ends when the entry stream closes.
pub fn observe(mut entries: EntryStream) -> (watch::Receiver<VitalsSet>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(VitalsSet::default());
    let handle = tokio::spawn(async move {
        let mut vitals = VitalsSet::default();
        while let Some(entry) = entries.recv().await {
            vitals.record(&entry);
            log::debug!("vitals updated from {:?}: {:?}", entry, vitals);
            if tx.send(vitals).is_err() {
                log::debug!("vitals receiver dropped; stopping observer");
                break;
            }
        }
    });
    (rx, handle)
}
