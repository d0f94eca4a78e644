use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pie_labeller::config::{LayoutConfig, ResolutionStrategy};
use pie_labeller::ir::ChartData;
use pie_labeller::layout::{ApproximateMetrics, compute_label_layout};
use pie_labeller::parser::parse_chart;
use pie_labeller::render::render_svg;
use pie_labeller::theme::Theme;
use std::hint::black_box;

/// One dominant slice followed by `small` thin ones, the usual crowding case.
fn crowded_pie_source(small: usize) -> String {
    let mut out = String::from("pie title Crowded\n");
    out.push_str("  \"Dominant share\" : 500\n");
    for i in 0..small {
        out.push_str(&format!("  \"Item {}\" : {}\n", i, 1 + i % 7));
    }
    out
}

fn even_pie_source(slices: usize) -> String {
    let mut out = String::from("pie\n");
    for i in 0..slices {
        out.push_str(&format!("  \"Segment {}\" : 10\n", i));
    }
    out
}

fn inputs() -> Vec<(&'static str, ChartData)> {
    [
        ("even_4", even_pie_source(4)),
        ("even_16", even_pie_source(16)),
        ("crowded_12", crowded_pie_source(12)),
        ("crowded_40", crowded_pie_source(40)),
    ]
    .into_iter()
    .map(|(name, source)| (name, parse_chart(&source).expect("parse failed").chart))
    .collect()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, source) in [("even_16", even_pie_source(16)), ("crowded_40", crowded_pie_source(40))] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &source, |b, data| {
            b.iter(|| {
                let parsed = parse_chart(black_box(data)).expect("parse failed");
                black_box(parsed.chart.slices.len());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let theme = Theme::mermaid_default();
    for (group_name, strategy) in [
        ("layout_two_phase", ResolutionStrategy::TwoPhase),
        ("layout_descending_order", ResolutionStrategy::DescendingOrder),
    ] {
        let mut group = c.benchmark_group(group_name);
        let config = LayoutConfig {
            strategy,
            ..LayoutConfig::default()
        };
        for (name, chart) in inputs() {
            group.bench_with_input(BenchmarkId::from_parameter(name), &chart, |b, chart| {
                b.iter(|| {
                    let layout = compute_label_layout(black_box(chart), &config, &theme, &ApproximateMetrics);
                    black_box(layout.outer.len());
                });
            });
        }
        group.finish();
    }
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_svg");
    let theme = Theme::mermaid_default();
    let config = LayoutConfig::default();
    for (name, chart) in inputs() {
        let layout = compute_label_layout(&chart, &config, &theme, &ApproximateMetrics);
        group.bench_with_input(BenchmarkId::from_parameter(name), &layout, |b, data| {
            b.iter(|| {
                let svg = render_svg(black_box(data), &theme, &Default::default());
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_parse, bench_layout, bench_render
);
criterion_main!(benches);
