use criterion::{criterion_group, criterion_main, Criterion};

use seoscore::document::HtmlDocument;
use seoscore::platform::PageInspector;
use seoscore::scorer;

fn sample_page(images: usize) -> String {
    let mut body = String::new();
    for i in 0..images {
        body.push_str(&format!(
            "<img src=\"/img/{i}.jpg\" alt=\"image {i}\" width=\"{}\" height=\"400\">",
            300 + i * 10
        ));
    }
    format!(
        "<html><head><title>Bench</title><meta name=\"description\" content=\"d\">\
         <link rel=\"canonical\" href=\"https://example.com/\"></head>\
         <body><nav></nav><main><h1>Bench</h1>{}</main></body></html>",
        body
    )
}

fn bench_parse_document(c: &mut Criterion) {
    let html = sample_page(200);
    let url = url::Url::parse("https://example.com/").unwrap();
    c.bench_function("parse_document_200_images", |b| {
        b.iter(|| HtmlDocument::parse(&html, url.clone()))
    });
}

fn bench_score_signals(c: &mut Criterion) {
    let doc = HtmlDocument::parse(&sample_page(200), url::Url::parse("https://example.com/").unwrap());
    let signals = doc.snapshot();
    c.bench_function("score_signals", |b| b.iter(|| scorer::score(&signals)));
}

criterion_group!(benches, bench_parse_document, bench_score_signals);
criterion_main!(benches);
