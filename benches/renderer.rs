use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use query_fanout::config::LayoutConfig;
use query_fanout::dataset::read_rows;
use query_fanout::ir::{KNOWN_CATEGORIES, Locale, SubqueryRow};
use query_fanout::layout::compute_layout;
use query_fanout::render::{build_scene, render_svg};
use query_fanout::theme::Theme;
use std::hint::black_box;

fn synthetic_rows(per_category: usize, extra_categories: usize) -> Vec<SubqueryRow> {
    let mut rows = Vec::new();
    let extra: Vec<String> = (0..extra_categories).map(|i| format!("extra-{i}")).collect();
    let categories = KNOWN_CATEGORIES
        .iter()
        .copied()
        .chain(extra.iter().map(String::as_str));
    for (idx, category) in categories.enumerate() {
        // Uneven counts so wedge spans differ.
        for n in 0..(per_category + idx % 3) {
            rows.push(SubqueryRow::new(
                "green tea health benefits",
                Locale::En,
                category,
                format!("green tea {category} follow-up question {n}"),
            ));
        }
    }
    rows
}

fn fixture_rows() -> Vec<SubqueryRow> {
    let csv = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/green_tea_fanout.csv"
    ));
    read_rows(csv.as_bytes()).expect("fixture parse failed")
}

fn fast_config() -> LayoutConfig {
    LayoutConfig {
        fast_text_metrics: true,
        ..LayoutConfig::default()
    }
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let theme = Theme::fanout_default();
    let config = fast_config();
    for (name, rows) in [
        ("fixture", fixture_rows()),
        ("8x8", synthetic_rows(8, 0)),
        ("8x32", synthetic_rows(32, 0)),
        ("40x16", synthetic_rows(16, 32)),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &rows, |b, rows| {
            b.iter(|| {
                let layout = compute_layout(black_box(rows), &theme, &config).expect("layout");
                black_box(layout.wedges.len());
            });
        });
    }
    group.finish();
}

fn bench_scene(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene");
    let theme = Theme::fanout_default();
    let config = fast_config();
    let layout = compute_layout(&synthetic_rows(8, 0), &theme, &config).expect("layout");
    for size in [1000u32, 2000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let scene = build_scene(black_box(&layout), size, size, &theme, &config)
                    .expect("scene");
                black_box(scene.labels.len());
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end_svg");
    let theme = Theme::fanout_default();
    let config = fast_config();
    for (name, rows) in [("fixture", fixture_rows()), ("8x32", synthetic_rows(32, 0))] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &rows, |b, rows| {
            b.iter(|| {
                let layout = compute_layout(black_box(rows), &theme, &config).expect("layout");
                let scene = build_scene(&layout, 2000, 2000, &theme, &config).expect("scene");
                let svg = render_svg(&scene);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_layout, bench_scene, bench_end_to_end
);
criterion_main!(benches);
