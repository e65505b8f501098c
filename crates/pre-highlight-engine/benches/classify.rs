use criterion::{Criterion, criterion_group, criterion_main};
use pre_highlight_engine::classify::{ScopeClassifier, ScopeMode, ScopeQuery};

fn sample_tokens() -> Vec<(&'static str, Vec<String>, &'static str)> {
    let chain = |scopes: &[&str]| scopes.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    vec![
        ("rust", chain(&["keyword.other.fn.rust", "meta.function.rust", "source.rust"]), "fn"),
        ("rust", chain(&["entity.name.function.rust", "meta.function.rust", "source.rust"]), "main"),
        ("rust", chain(&["string.quoted.double.rust", "source.rust"]), "\"hello\""),
        ("bash", chain(&["variable.other.special.shell", "source.shell"]), "$1"),
        ("bash", chain(&["string.unquoted.argument.shell", "source.shell"]), "--force"),
        ("python", chain(&["storage.type.string.python", "string.quoted.single.python"]), "f"),
        ("yaml", chain(&["entity.name.tag.yaml", "source.yaml"]), "name"),
        ("hcl", chain(&["variable.declaration.hcl", "source.hcl"]), "region"),
        ("sql", chain(&["constant.language.sql", "source.sql"]), "NULL"),
        ("js", chain(&["variable.other.readwrite.js", "source.js"]), "value"),
    ]
}

fn bench_keyword_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    group.sample_size(10);

    let tokens = sample_tokens();
    let classifier = ScopeClassifier::default();

    group.bench_function("keyword_warm_cache", |b| {
        b.iter(|| {
            for (lang, scopes, text) in &tokens {
                let query = ScopeQuery::new(scopes, text);
                let label = classifier.classify(&query, lang, ScopeMode::Keyword, None);
                std::hint::black_box(label);
            }
        });
    });

    group.bench_function("keyword_cold_cache", |b| {
        b.iter(|| {
            classifier.clear_cache();
            for (lang, scopes, text) in &tokens {
                let query = ScopeQuery::new(scopes, text);
                let label = classifier.classify(&query, lang, ScopeMode::Keyword, None);
                std::hint::black_box(label);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_keyword_classification);
criterion_main!(benches);
