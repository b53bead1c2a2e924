//! Page facts consumed by the heuristic scorer.

use serde::Serialize;

/// Rendered size thresholds above which an image counts as oversized.
pub const OVERSIZED_IMAGE_WIDTH: f64 = 800.0;
pub const OVERSIZED_IMAGE_HEIGHT: f64 = 600.0;

/// A single `<img>` element as seen by the scorer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageSignal {
    /// Whether the image carries a non-empty (after trimming) `alt` attribute
    pub has_alt: bool,
    /// Rendered width in CSS pixels (0 when unknown)
    pub width: f64,
    /// Rendered height in CSS pixels (0 when unknown)
    pub height: f64,
}

impl ImageSignal {
    pub fn new(has_alt: bool, width: f64, height: f64) -> Self {
        Self {
            has_alt,
            width,
            height,
        }
    }

    /// Whether the bounding box exceeds 800x600 in either dimension.
    pub fn is_oversized(&self) -> bool {
        self.width > OVERSIZED_IMAGE_WIDTH || self.height > OVERSIZED_IMAGE_HEIGHT
    }
}

/// Read-only snapshot of the document facts a scoring pass looks at.
///
/// Absent features are simply `false` / zero; nothing here can be "invalid".
/// `console_errors` is filled in by the scorer after its sampling window and
/// is zero in snapshots returned by a [`PageInspector`](crate::platform::PageInspector).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageSignals {
    pub has_title: bool,
    pub has_meta_description: bool,
    pub has_viewport: bool,
    pub has_canonical: bool,
    pub meta_tag_count: usize,
    pub has_structured_data: bool,
    pub images: Vec<ImageSignal>,
    pub has_main: bool,
    pub has_nav: bool,
    pub has_h1: bool,
    /// Milliseconds since navigation start at the time of the snapshot
    pub elapsed_ms: f64,
    /// Served over a secure transport (https)
    pub secure: bool,
    pub console_errors: usize,
}

impl PageSignals {
    /// Number of images with non-empty alt text
    pub fn images_with_alt(&self) -> usize {
        self.images.iter().filter(|i| i.has_alt).count()
    }

    pub fn oversized_images(&self) -> usize {
        self.images.iter().filter(|i| i.is_oversized()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_checks_either_dimension() {
        assert!(ImageSignal::new(true, 801.0, 10.0).is_oversized());
        assert!(ImageSignal::new(true, 10.0, 601.0).is_oversized());
        assert!(!ImageSignal::new(true, 800.0, 600.0).is_oversized());
        assert!(!ImageSignal::default().is_oversized());
    }

    #[test]
    fn counts_alt_and_oversized_images() {
        let signals = PageSignals {
            images: vec![
                ImageSignal::new(true, 1024.0, 768.0),
                ImageSignal::new(false, 100.0, 100.0),
                ImageSignal::new(true, 0.0, 0.0),
            ],
            ..Default::default()
        };
        assert_eq!(signals.images_with_alt(), 2);
        assert_eq!(signals.oversized_images(), 1);
    }
}
