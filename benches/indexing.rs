//! Benchmarks for the two analysis passes and symbol lookup.
//!
//! Run with `cargo bench --bench indexing`.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use phpantom_core::{ParsedDocument, SymbolStore, SymbolTable, read_references};

/// A namespace of `count` classes, each with a few typed methods and some
/// branching method bodies.
fn generate_classes(count: usize) -> String {
    let mut code = String::from("<?php\nnamespace Bench;\n\nuse Bench\\Support\\Helper;\n\n");
    for i in 0..count {
        let parent = if i > 0 {
            format!(" extends Model{}", i - 1)
        } else {
            String::new()
        };
        code.push_str(&format!(
            r#"class Model{i}{parent}
{{
    private array $items = [];

    /** @return Model{i} */
    public function with(int $value): static
    {{
        $this->items[] = $value;
        return $this;
    }}

    public function total(): int
    {{
        $sum = 0;
        foreach ($this->items as $item) {{
            if ($item > 10) {{
                $sum = $sum + $item;
            }} else {{
                $label = 'small';
            }}
        }}
        $helper = new Helper();
        $copy = $this->with($sum)->total();
        return strlen((string) $sum);
    }}
}}

"#
        ));
    }
    code
}

fn bench_declarations(c: &mut Criterion) {
    let mut group = c.benchmark_group("declarations");
    for size in [10, 50, 200] {
        let document = ParsedDocument::new("file:///bench.php", generate_classes(size));
        group.throughput(Throughput::Bytes(document.text().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &document, |b, document| {
            b.iter(|| black_box(SymbolTable::create(black_box(document))));
        });
    }
    group.finish();
}

fn bench_references(c: &mut Criterion) {
    let mut group = c.benchmark_group("references");
    for size in [10, 50, 200] {
        let document = ParsedDocument::new("file:///bench.php", generate_classes(size));
        let mut store = SymbolStore::with_builtins();
        store
            .add(SymbolTable::create(&document))
            .expect("fresh store");
        group.throughput(Throughput::Bytes(document.text().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &document, |b, document| {
            b.iter(|| black_box(read_references(black_box(document), &store)));
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut store = SymbolStore::with_builtins();
    for file in 0..20 {
        let document = ParsedDocument::new(format!("file:///bench{file}.php"), generate_classes(25));
        store
            .add(SymbolTable::create(&document))
            .expect("distinct uris");
    }

    let mut group = c.benchmark_group("lookup");
    group.bench_function("find", |b| {
        b.iter(|| black_box(store.find(black_box("Bench\\Model12"), |_| true).len()));
    });
    group.bench_function("match_iterator", |b| {
        b.iter(|| black_box(store.match_iterator(black_box("mod"), |_| true).take(50).count()));
    });
    group.finish();
}

criterion_group!(benches, bench_declarations, bench_references, bench_lookup);
criterion_main!(benches);
