use pie_labeller::config::{LayoutConfig, ResolutionStrategy};
use pie_labeller::layout::placement::{detect_apex_labels, place_initial_labels, place_label_along_label_radius};
use pie_labeller::layout::resolve::resolve_collisions;
use pie_labeller::layout::{Diagnostics, Label, LabelLayout, PieContext, PieGeometry, pie_geometry};
use pie_labeller::{ApproximateMetrics, ChartData, TextMeasure, Theme, compute_label_layout, parse_chart, render_svg};

fn chart(values: &[f32]) -> ChartData {
    let mut chart = ChartData::new();
    for (idx, value) in values.iter().enumerate() {
        chart.push_slice(format!("Slice {idx}"), *value);
    }
    chart
}

fn run(data: &ChartData, config: &LayoutConfig) -> LabelLayout {
    compute_label_layout(data, config, &Theme::mermaid_default(), &ApproximateMetrics)
}

/// Every overlapping pair among the visible labels, outer and inner alike.
fn overlapping_pairs(layout: &LabelLayout) -> Vec<(usize, usize)> {
    let visible: Vec<&Label> = layout
        .outer
        .iter()
        .filter(|label| label.label_shown)
        .chain(&layout.inner)
        .collect();
    let mut pairs = Vec::new();
    for (i, a) in visible.iter().enumerate() {
        for b in &visible[i + 1..] {
            if a.intersects(b, 0.0) {
                pairs.push((a.id, b.id));
            }
        }
    }
    pairs
}

fn fixed_size_label(id: usize, angle: f32, value: f32, geometry: &PieGeometry) -> Label {
    let mut label = Label::new(
        id,
        format!("Slice {id}"),
        value,
        value / 100.0,
        angle,
        "#000000",
        "sans-serif",
        12.0,
        1.0,
        geometry.center,
        geometry.outer_radius,
    );
    label.width = 40.0;
    label.height = 12.0;
    label.line_height = 12.0;
    label.text_lines = vec![label.text.clone()];
    label
}

fn sample_charts() -> Vec<ChartData> {
    vec![
        chart(&[40.0, 30.0, 20.0, 10.0]),
        chart(&[5.0, 1.0, 1.0, 1.0, 1.0, 1.0, 20.0]),
        chart(&[3.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 50.0]),
        chart(&[2.0, 2.0, 2.0, 2.0, 2.0, 190.0]),
        chart(&[12.0, 11.0, 10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]),
    ]
}

#[test]
fn every_slice_is_accounted_for() {
    for strategy in [ResolutionStrategy::TwoPhase, ResolutionStrategy::DescendingOrder] {
        let config = LayoutConfig {
            strategy,
            ..LayoutConfig::default()
        };
        for data in sample_charts() {
            let layout = run(&data, &config);
            let mut ids: Vec<usize> = layout
                .outer
                .iter()
                .chain(&layout.inner)
                .chain(&layout.dropped)
                .map(|label| label.id)
                .collect();
            ids.sort_unstable();
            let expected: Vec<usize> = (0..data.slices.len()).collect();
            assert_eq!(ids, expected, "{strategy:?}");
            assert!(layout.dropped.iter().all(|label| !label.label_shown));
        }
    }
}

#[test]
fn successful_layouts_have_no_collisions_and_respect_line_angle() {
    let config = LayoutConfig::default();
    for data in sample_charts() {
        let layout = run(&data, &config);
        if layout.diagnostics.error.is_some() {
            continue;
        }
        assert!(overlapping_pairs(&layout).is_empty(), "{:?}", overlapping_pairs(&layout));
        for label in layout.outer.iter().filter(|label| label.label_shown) {
            assert!(
                label.label_line_angle() <= layout.max_line_angle + 1e-3,
                "label {} line angle {} over {}",
                label.id,
                label.label_line_angle(),
                layout.max_line_angle
            );
        }
    }
}

#[test]
fn labels_keep_their_angular_order_within_a_quadrant() {
    let config = LayoutConfig::default();
    for data in sample_charts() {
        let layout = run(&data, &config);
        if layout.diagnostics.error.is_some() {
            continue;
        }
        let shown: Vec<&Label> = layout.outer.iter().filter(|label| label.label_shown).collect();
        for (i, a) in shown.iter().enumerate() {
            for b in &shown[i + 1..] {
                if a.segment_quadrant() != b.segment_quadrant() {
                    continue;
                }
                let (ya, yb) = (a.line_connector_coord.1, b.line_connector_coord.1);
                // ids grow clockwise: downward on the right, upward on the left
                let ordered = match a.segment_quadrant() {
                    1 | 2 => ya <= yb + 1e-3,
                    _ => ya + 1e-3 >= yb,
                };
                assert!(ordered, "labels {} and {} swapped: {ya} vs {yb}", a.id, b.id);
            }
        }
    }
}

#[test]
fn resolving_a_resolved_set_changes_nothing() {
    let config = LayoutConfig::default();
    let geometry = pie_geometry(&config);
    let mut ctx = PieContext::new(geometry, config.labels.lift_off_angle, config.labels.outer_padding);
    ctx.max_font_size = 12.0;
    let mut labels: Vec<Label> = [20.0, 24.0, 28.0, 32.0, 200.0]
        .iter()
        .enumerate()
        .map(|(id, &angle)| fixed_size_label(id, angle, 10.0 - id as f32, &geometry))
        .collect();
    detect_apex_labels(&mut labels, &mut ctx);
    place_initial_labels(&mut labels, &mut ctx);

    let mut diagnostics = Diagnostics::default();
    let first = resolve_collisions(labels, &mut ctx, &config, &mut diagnostics);
    assert!(diagnostics.error.is_none());
    assert_eq!(first.outer.len(), 5);

    let mut again = Diagnostics::default();
    let second = resolve_collisions(first.outer.clone(), &mut ctx, &config, &mut again);
    assert!(again.error.is_none());
    assert_eq!(again.resolution_iterations, 1);
    assert!(second.removed.is_empty());
    let coords = |labels: &[Label]| {
        labels
            .iter()
            .map(|label| (label.id, label.top_left_coord, label.line_connector_coord))
            .collect::<Vec<_>>()
    };
    assert_eq!(coords(&first.outer), coords(&second.outer));
}

#[test]
fn running_out_of_remedies_keeps_a_label_and_reports_it() {
    let mut config = LayoutConfig::default();
    config.labels.max_line_angle = 5.0;
    config.labels.max_line_angle_ceiling = 5.0;
    config.stages.initial_cluster_spacing = false;
    let geometry = pie_geometry(&config);
    let mut ctx = PieContext::new(geometry, config.labels.lift_off_angle, config.labels.outer_padding);
    ctx.max_font_size = 12.0;

    let mut labels = vec![
        fixed_size_label(0, 30.0, 10.0, &geometry),
        fixed_size_label(1, 210.0, 1.0, &geometry),
    ];
    for label in labels.iter_mut() {
        place_label_along_label_radius(label, &ctx, 0.0);
    }
    // pushed sideways off its radial line, so no remedy can fix its line angle
    labels[0].translate(30.0, 0.0);

    let mut diagnostics = Diagnostics::default();
    let resolution = resolve_collisions(labels, &mut ctx, &config, &mut diagnostics);
    let error = diagnostics.error.as_deref().unwrap_or_default();
    assert!(error.contains("exhausted"), "{error}");
    assert_eq!(diagnostics.top_lifts, 1);
    assert_eq!(diagnostics.removed_labels, 1);
    assert_eq!(diagnostics.resolution_iterations, 3);
    assert_eq!(resolution.outer.len(), 1);
    assert_eq!(resolution.outer[0].id, 0);
    assert_eq!(resolution.removed.len(), 1);
    assert!(!resolution.removed[0].label_shown);
}

#[test]
fn evenly_spread_slices_resolve_untouched() {
    for strategy in [ResolutionStrategy::TwoPhase, ResolutionStrategy::DescendingOrder] {
        let config = LayoutConfig {
            strategy,
            ..LayoutConfig::default()
        };
        let layout = run(&chart(&[1.0, 1.0, 1.0, 1.0]), &config);
        assert_eq!(layout.outer.len(), 4, "{strategy:?}");
        assert!(layout.dropped.is_empty());
        assert!(layout.diagnostics.error.is_none());
        assert!(layout.min_proportion.is_none());
        assert!(!layout.top_is_lifted && !layout.bottom_is_lifted);
    }
}

#[test]
fn crowded_top_apex_is_lifted() {
    let mut config = LayoutConfig::default();
    config.canvas.width = 600.0;
    config.canvas.height = 360.0;
    config.data.start_angle = 80.2;
    let mut data = ChartData::new();
    data.push_slice("Alpha slice", 1.0);
    data.push_slice("Beta slice", 1.0);
    data.push_slice("Everything else", 98.0);

    let layout = run(&data, &config);
    assert!(layout.top_is_lifted);
}

#[test]
fn label_taller_than_canvas_is_dropped_with_error() {
    let mut config = LayoutConfig::default();
    config.canvas.width = 200.0;
    config.canvas.height = 40.0;
    config.labels.max_lines = 10;
    let mut data = ChartData::new();
    data.push_slice(vec!["word"; 30].join(" "), 1.0);

    let layout = run(&data, &config);
    assert!(layout.outer.is_empty());
    assert!(layout.inner.is_empty());
    assert_eq!(layout.dropped.len(), 1);
    assert!(layout.diagnostics.error.is_some());
}

#[test]
fn fonts_shrink_before_labels_are_dropped() {
    let mut config = LayoutConfig::default();
    config.canvas.height = 37.0;
    let mut data = ChartData::new();
    data.push_slice("a<br>b<br>c", 1.0);

    let layout = run(&data, &config);
    assert!(layout.diagnostics.font_scale_applied);
    assert_eq!(layout.diagnostics.preprocess_dropped, 0);
    let label = layout
        .outer
        .iter()
        .chain(&layout.dropped)
        .find(|label| label.id == 0)
        .unwrap();
    assert_eq!(label.font_size, 11.0);
    assert_eq!(label.text_lines.len(), 3);
}

#[test]
fn layout_is_deterministic() {
    let config = LayoutConfig::default();
    for data in sample_charts() {
        let first = run(&data, &config);
        let second = run(&data, &config);
        let coords = |layout: &LabelLayout| {
            layout
                .outer
                .iter()
                .map(|label| (label.id, label.top_left_coord, label.line_connector_coord))
                .collect::<Vec<_>>()
        };
        assert_eq!(coords(&first), coords(&second));
        assert_eq!(first.diagnostics.resolution_iterations, second.diagnostics.resolution_iterations);
    }
}

#[test]
fn measurement_is_a_pure_function_of_its_inputs() {
    let text = "Quarterly revenue by region and product line";
    let first = ApproximateMetrics.wrap_and_measure(text, 12.0, "sans-serif", 80.0, 3, 1.0);
    let second = ApproximateMetrics.wrap_and_measure(text, 12.0, "sans-serif", 80.0, 3, 1.0);
    assert_eq!(first, second);
    assert!(first.lines.len() <= 3);
}

#[test]
fn descending_strategy_hides_what_it_drops() {
    let config = LayoutConfig {
        strategy: ResolutionStrategy::DescendingOrder,
        ..LayoutConfig::default()
    };
    let mut values = vec![1.0; 40];
    values.push(400.0);
    let layout = run(&chart(&values), &config);
    assert_eq!(layout.outer.len() + layout.dropped.len(), 41);
    assert!(layout.outer.iter().all(|label| label.label_shown));
    assert!(layout.dropped.iter().all(|label| !label.label_shown));
    assert!(overlapping_pairs(&layout).is_empty(), "{:?}", overlapping_pairs(&layout));
    if let Some(min_proportion) = layout.min_proportion {
        assert!(min_proportion > 0.0 && min_proportion <= 1.0);
    }
}

#[test]
fn descending_strategy_never_leaves_overlaps() {
    let config = LayoutConfig {
        strategy: ResolutionStrategy::DescendingOrder,
        ..LayoutConfig::default()
    };
    let mut tied = vec![20.0; 6];
    tied.extend([1.0; 24]);
    let mut tiered = vec![50.0];
    tiered.extend([10.0; 8]);
    tiered.extend([1.0; 8]);

    for values in [tied, tiered] {
        let layout = run(&chart(&values), &config);
        let mut ids: Vec<usize> = layout.outer.iter().chain(&layout.dropped).map(|label| label.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..values.len()).collect::<Vec<_>>());
        assert!(!layout.outer.is_empty());
        assert!(overlapping_pairs(&layout).is_empty(), "{:?}", overlapping_pairs(&layout));
        assert!(layout.diagnostics.error.is_none(), "{:?}", layout.diagnostics.error);
        if layout.dropped.len() > layout.diagnostics.preprocess_dropped {
            assert!(layout.min_proportion.is_some());
        }
    }
}

#[test]
fn donut_hole_takes_overflow_labels() {
    let mut values = vec![60.0];
    values.extend([1.0; 12]);
    let data = chart(&values);
    for ratio in [0.6, 0.85] {
        let mut config = LayoutConfig::default();
        config.pie.inner_radius_ratio = ratio;
        config.labels.inner_labels = true;
        let layout = run(&data, &config);
        assert!(layout.diagnostics.error.is_none(), "{ratio}: {:?}", layout.diagnostics.error);
        assert!(!layout.inner.is_empty(), "{ratio}");
        assert_eq!(layout.diagnostics.inner_relocations, layout.inner.len());
        assert!(layout.inner.iter().all(|label| label.label_shown));
        assert!(overlapping_pairs(&layout).is_empty(), "{ratio}: {:?}", overlapping_pairs(&layout));
        let mut ids: Vec<usize> = layout
            .outer
            .iter()
            .chain(&layout.inner)
            .chain(&layout.dropped)
            .map(|label| label.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..values.len()).collect::<Vec<_>>());
    }
}

#[test]
fn pie_source_renders_end_to_end() {
    let input = "pie showData title Pets\n\"Dogs\" : 386\n\"Cats\" : 85\n\"Rats\" : 15\n";
    let parsed = parse_chart(input).unwrap();
    let mut config = LayoutConfig::default();
    config.data.show_data = parsed.chart.show_data;
    let theme = Theme::mermaid_default();
    let layout = compute_label_layout(&parsed.chart, &config, &theme, &ApproximateMetrics);
    assert_eq!(layout.title.as_deref(), Some("Pets"));
    assert!(layout.outer.iter().any(|label| label.text == "Dogs [386]"));
    let svg = render_svg(&layout, &theme, &Default::default());
    assert!(svg.contains("Dogs [386]"));
}
