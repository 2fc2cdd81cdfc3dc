//! Document rewriting benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio_core::rewrite::{self, DocumentJob, LinkMap, RewriteContext};
use folio_core::Platform;

fn chapter(paragraphs: usize) -> String {
    let mut body = String::from("<html><head><title>Bench</title></head><body>\n<h1>Bench</h1>\n");
    for i in 0..paragraphs {
        if i % 10 == 0 {
            body.push_str(&format!(
                "<p>Paragraph {i}<a epub:type=\"noteref\" href=\"#n{i}\">{i}</a></p>\n"
            ));
        } else {
            body.push_str(&format!("<p>Paragraph {i} of plain running text.</p>\n"));
        }
    }
    for i in (0..paragraphs).step_by(10) {
        body.push_str(&format!("<aside epub:type=\"footnote\" id=\"n{i}\">Note {i}</aside>\n"));
    }
    body.push_str("</body></html>");
    body
}

fn rewrite_benchmark(c: &mut Criterion) {
    let source = chapter(500);
    let links = LinkMap::new();
    let ctx = RewriteContext {
        renderer: Platform::Duokan.renderer(),
        language: "en",
        fallback_title: "Chapter",
        links: &links,
        allow_fallback: true,
    };

    c.bench_function("prepare", |b| {
        b.iter(|| rewrite::prepare(black_box(source.as_bytes()), true))
    });

    let prepared = match rewrite::prepare(source.as_bytes(), true) {
        Ok(prepared) => prepared,
        Err(e) => panic!("benchmark chapter failed to scan: {e}"),
    };
    c.bench_function("rewrite", |b| {
        b.iter(|| {
            let job = DocumentJob {
                original_path: "OEBPS/Text/bench.xhtml",
                source: &source,
                body: &prepared.body,
                sequence: 1,
                first_footnote: 1,
            };
            rewrite::rewrite(black_box(&job), &ctx)
        })
    });
}

criterion_group!(benches, rewrite_benchmark);
criterion_main!(benches);
