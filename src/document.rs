//! HTML-backed page inspector.
//!
//! Fetches a page, parses it once with `scraper` and keeps only the facts
//! the scorer needs. The parsed tree is not retained; `scraper::Html` is not
//! `Send`, and a snapshot is all the scorer ever asks for.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::from_http;
use crate::platform::{ConsoleChannel, ConsoleMessage, PageInspector};
use crate::signals::{ImageSignal, PageSignals};
use crate::{Error, Result, TrackerConfig};

/// How many sub-resource checks run at once
const PROBE_CONCURRENCY: usize = 8;

/// Kind of linked resource a page pulls in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Script,
    Stylesheet,
    Image,
}

/// A sub-resource referenced by the page, resolved against the page URL
#[derive(Debug, Clone, PartialEq)]
pub struct Subresource {
    pub kind: ResourceKind,
    pub url: Url,
}

/// A parsed page: the scoring facts plus what is needed to time and probe it.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    url: Url,
    signals: PageSignals,
    subresources: Vec<Subresource>,
    navigation_start: Instant,
}

impl HtmlDocument {
    /// Parse markup served from `url`. Navigation start is taken as now.
    pub fn parse(html: &str, url: Url) -> Self {
        let document = Html::parse_document(html);

        let title = first_text(&document, "title");
        let images = select_all(&document, "img")
            .into_iter()
            .map(image_signal)
            .collect();

        let signals = PageSignals {
            has_title: title.map(|t| !t.trim().is_empty()).unwrap_or(false),
            has_meta_description: exists(&document, "meta[name=\"description\"]"),
            has_viewport: exists(&document, "meta[name=\"viewport\"]"),
            has_canonical: exists(&document, "link[rel=\"canonical\"]"),
            meta_tag_count: select_all(&document, "meta").len(),
            has_structured_data: exists(&document, "script[type=\"application/ld+json\"]"),
            images,
            has_main: exists(&document, "main"),
            has_nav: exists(&document, "nav"),
            has_h1: exists(&document, "h1"),
            elapsed_ms: 0.0,
            secure: url.scheme() == "https",
            console_errors: 0,
        };

        let subresources = collect_subresources(&document, &url);

        Self {
            url,
            signals,
            subresources,
            navigation_start: Instant::now(),
        }
    }

    /// Override the instant elapsed page time is measured from.
    pub fn with_navigation_start(mut self, start: Instant) -> Self {
        self.navigation_start = start;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn subresources(&self) -> &[Subresource] {
        &self.subresources
    }

    /// Time since navigation start
    pub fn elapsed(&self) -> Duration {
        self.navigation_start.elapsed()
    }
}

impl PageInspector for HtmlDocument {
    fn snapshot(&self) -> PageSignals {
        PageSignals {
            elapsed_ms: self.elapsed().as_secs_f64() * 1000.0,
            ..self.signals.clone()
        }
    }
}

/// Fetch and parse a page. Navigation start is the moment the request goes out.
pub async fn load(client: &Client, url: &str, config: &TrackerConfig) -> Result<HtmlDocument> {
    let started = Instant::now();

    let mut request = client.get(url);
    for (name, value) in &config.headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let resp = request
        .send()
        .await
        .map_err(|e| Error::LoadError(format!("Failed to fetch {}: {}", url, from_http(e, config.timeout_ms))))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::LoadError(format!("{} returned HTTP {}", url, status)));
    }

    let final_url = resp.url().clone();
    let body = resp
        .text()
        .await
        .map_err(|e| Error::LoadError(format!("Failed to read response body: {}", e)))?;

    log::debug!("fetched {} ({} bytes) in {:?}", final_url, body.len(), started.elapsed());

    Ok(HtmlDocument::parse(&body, final_url).with_navigation_start(started))
}

/// Request every sub-resource and report failures on the page console the way
/// a browser does ("Failed to load resource"). Each failure is emitted as soon
/// as its request settles, so a slow resource does not hold back the others.
/// Returns the failure count.
pub async fn probe_resources(client: Client, resources: Vec<Subresource>, console: ConsoleChannel) -> usize {
    stream::iter(resources)
        .map(|resource| {
            let client = client.clone();
            async move {
                let outcome = match client.get(resource.url.clone()).send().await {
                    Ok(resp) if resp.status().is_success() => None,
                    Ok(resp) => Some(format!("the server responded with a status of {}", resp.status())),
                    Err(e) => Some(e.without_url().to_string()),
                };
                (resource, outcome)
            }
        })
        .buffer_unordered(PROBE_CONCURRENCY)
        .fold(0, |failed, (resource, outcome)| {
            let failed = match outcome {
                Some(reason) => {
                    console.emit(
                        &ConsoleMessage::error(format!("Failed to load resource: {}", reason))
                            .with_source(resource.url.as_str()),
                    );
                    failed + 1
                }
                None => failed,
            };
            async move { failed }
        })
        .await
}

fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn exists(document: &Html, css: &str) -> bool {
    !select_all(document, css).is_empty()
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    select_all(document, css)
        .into_iter()
        .next()
        .map(|n| n.text().collect::<String>())
}

fn image_signal(img: ElementRef<'_>) -> ImageSignal {
    let el = img.value();
    let has_alt = el.attr("alt").map(|a| !a.trim().is_empty()).unwrap_or(false);
    let style = el.attr("style").unwrap_or("");
    // Inline style wins over the presentational attributes.
    let width = style_length(style, "width")
        .or_else(|| el.attr("width").and_then(css_length))
        .unwrap_or(0.0);
    let height = style_length(style, "height")
        .or_else(|| el.attr("height").and_then(css_length))
        .unwrap_or(0.0);
    ImageSignal::new(has_alt, width, height)
}

/// Parse a pixel length ("640", "640px"). Relative units are unknown.
fn css_length(value: &str) -> Option<f64> {
    let v = value.trim();
    let v = v.strip_suffix("px").unwrap_or(v).trim();
    v.parse::<f64>().ok().filter(|n| n.is_finite() && *n >= 0.0)
}

fn style_length(style: &str, property: &str) -> Option<f64> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case(property))
        .and_then(|(_, value)| css_length(value))
}

fn collect_subresources(document: &Html, base: &Url) -> Vec<Subresource> {
    let sources = [
        ("script[src]", "src", ResourceKind::Script),
        ("link[rel=\"stylesheet\"][href]", "href", ResourceKind::Stylesheet),
        ("img[src]", "src", ResourceKind::Image),
    ];

    let mut out: Vec<Subresource> = Vec::new();
    for (css, attr, kind) in sources {
        for node in select_all(document, css) {
            let Some(href) = node.value().attr(attr) else { continue };
            let Ok(url) = base.join(href.trim()) else { continue };
            if !matches!(url.scheme(), "http" | "https") {
                continue;
            }
            if out.iter().any(|r| r.url == url) {
                continue;
            }
            out.push(Subresource { kind, url });
        }
    }
    out
}
