use criterion::{Criterion, criterion_group, criterion_main};
use pre_highlight_engine::payload::{ScopeStyle, TokenEntry, build_payload};

fn generate_entries(lines: usize) -> (String, Vec<TokenEntry>) {
    let line = "let value = compute(42); // note\n";
    let text = line.repeat(lines);
    let mut entries = Vec::with_capacity(lines * 5);
    for i in 0..lines {
        let base = i * line.len();
        entries.push(TokenEntry::new("keyword", base, base + 3).with_style(Some(ScopeStyle::color("#d73a49"))));
        entries.push(TokenEntry::new("variable", base + 4, base + 9));
        entries.push(TokenEntry::new("function", base + 12, base + 19).with_style(Some(ScopeStyle::color("#6f42c1"))));
        entries.push(TokenEntry::new("number", base + 20, base + 22).with_style(Some(ScopeStyle::color("#005cc5"))));
        entries.push(TokenEntry::new("comment", base + 25, base + 32).with_style(Some(ScopeStyle::color("#6a737d"))));
    }
    (text, entries)
}

fn bench_build_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload");
    group.sample_size(10);

    let (text, entries) = generate_entries(500);

    group.bench_function("build_with_styles", |b| {
        b.iter(|| {
            let payload = build_payload(
                std::hint::black_box(&entries),
                &text,
                "js",
                "custom",
                "hl",
                true,
            );
            std::hint::black_box(payload)
        });
    });

    group.bench_function("build_without_styles", |b| {
        b.iter(|| {
            let payload = build_payload(
                std::hint::black_box(&entries),
                &text,
                "js",
                "custom",
                "hl",
                false,
            );
            std::hint::black_box(payload)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_build_payload);
criterion_main!(benches);
