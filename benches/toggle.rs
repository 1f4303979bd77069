//! Benchmarks for the activate/restore cycle.
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};

use fovea::dom::parse_html_bytes;
use fovea::{Config, Engine, MemoryBackend};

const ARTICLE: &[u8] = include_bytes!("../tests/fixtures/article.html");

/// A long page built by repeating the fixture's body.
fn long_page() -> Vec<u8> {
    let article = String::from_utf8_lossy(ARTICLE);
    let (head, rest) = article.split_once("<body").unwrap();
    let body_start = rest.find('>').unwrap() + 1;
    let body_end = rest.find("</body>").unwrap();
    let content = &rest[body_start..body_end];

    let mut page = format!("{head}<body{}", &rest[..body_start]);
    for _ in 0..200 {
        page.push_str(content);
    }
    page.push_str("</body></html>");
    page.into_bytes()
}

fn bench_toggle(c: &mut Criterion) {
    let page = long_page();

    c.bench_function("parse", |b| b.iter(|| parse_html_bytes(&page)));

    c.bench_function("toggle_cycle", |b| {
        let mut doc = parse_html_bytes(&page);
        let mut engine = Engine::new(Config::default(), MemoryBackend::new()).unwrap();
        engine.initialize(&mut doc);
        b.iter(|| {
            engine.toggle(&mut doc);
            engine.toggle(&mut doc)
        })
    });

    c.bench_function("transform_html", |b| {
        let html = String::from_utf8_lossy(&page).into_owned();
        let config = Config::default();
        b.iter(|| fovea::transform_html(&html, &config).unwrap())
    });
}

criterion_group!(benches, bench_toggle);
criterion_main!(benches);
