//! Text rendering of reports: grades, metric formatting and the score panel.

use std::fmt::{self, Write};

use crate::{Report, ScoreSource};

/// Qualitative band for a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl Grade {
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Grade::Excellent,
            70..=89 => Grade::Good,
            50..=69 => Grade::Average,
            _ => Grade::NeedsImprovement,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::Excellent => "Excellent",
            Grade::Good => "Good",
            Grade::Average => "Average",
            Grade::NeedsImprovement => "Needs Improvement",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unit a vital is displayed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Millis,
    Unitless,
}

/// Format a vital for display; unobserved (zero) values render as `-`.
pub fn format_metric(value: f64, unit: MetricUnit) -> String {
    if value == 0.0 || !value.is_finite() {
        return "-".to_string();
    }
    match unit {
        MetricUnit::Millis if value < 1000.0 => format!("{}ms", value.round()),
        MetricUnit::Millis => format!("{:.1}s", value / 1000.0),
        MetricUnit::Unitless => format!("{:.3}", value),
    }
}

/// Render the score panel for a report.
pub fn render_text(report: &Report) -> String {
    let s = &report.scores;
    let v = &report.vitals;
    let overall = s.overall();
    let source = match report.source {
        ScoreSource::Remote => "PageSpeed Insights",
        ScoreSource::Local => "local analysis",
    };

    let mut out = String::new();
    let _ = writeln!(out, "SEO Score for {}", report.url);
    let _ = writeln!(out, "  {}/100  {}", overall, Grade::from_score(overall));
    let _ = writeln!(out);
    for (label, value) in [
        ("Performance", s.performance()),
        ("Accessibility", s.accessibility()),
        ("Best Practices", s.best_practices()),
        ("SEO", s.seo()),
    ] {
        let _ = writeln!(out, "  {:<16}{:>3}", label, value);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Core Web Vitals");
    for (label, value, unit) in [
        ("LCP", v.largest_contentful_paint, MetricUnit::Millis),
        ("FID", v.first_input_delay, MetricUnit::Millis),
        ("CLS", v.cumulative_layout_shift, MetricUnit::Unitless),
        ("FCP", v.first_contentful_paint, MetricUnit::Millis),
    ] {
        let _ = writeln!(out, "  {:<16}{:>8}", label, format_metric(value, unit));
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Source: {}  Last updated: {}",
        source,
        report.updated_at.format("%H:%M:%S")
    );
    out
}

/// Render the view shown when no data could be produced.
pub fn render_error(message: &str) -> String {
    format!("Unable to fetch SEO data: {}\n", message)
}
