use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use orbit_dom::{Document, MemoryDocument, PatchContext, PlainDirectives, Props, VNode, diff, h, text};

fn build_list(count: usize, tick: usize) -> VNode {
    let children = (0..count)
        .map(|i| {
            let class = if (i + tick) % 2 == 0 { "even" } else { "odd" };
            h("li", Props::new().set("class", class), vec![text(format!("item {i}"))])
        })
        .collect();
    h("ul", (), children)
}

fn bench_diff_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_list");
    group.sample_size(20);
    let directives = PlainDirectives::new();
    for &count in &[50usize, 200usize, 1000usize] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut doc = MemoryDocument::new();
            let root = doc.root();
            let mut old = None;
            let mut tick = 0;
            b.iter(|| {
                tick += 1;
                let mut ctx = PatchContext::new(&mut doc, &directives);
                let _ = diff(&mut old, Some(build_list(count, tick)), root, &mut ctx);
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().without_plots();
    targets = bench_diff_list
}
criterion_main!(benches);
